//! Domain models for the back-office service.

mod case;
mod company;
mod email_log;
mod invoice;
mod line_item;
mod template;

pub use case::{
    distribution_key, next_auftragsnummer, Case, CaseListParams, CaseListResponse, CreateCase,
    DashboardData, UpdateCase,
};
pub use company::{
    Company, CreateUser, Feature, PlanTier, Role, UpdateCompany, UpdateUser, User,
};
pub use email_log::{CreateEmailLog, EmailLog};
pub use invoice::{
    build_invoice_number, CreateInvoice, Invoice, InvoiceStatus, InvoiceType, ProtocolEvent,
    UpdateInvoice, ZAHLUNGSZIEL_DAYS,
};
pub use line_item::{Category, CategoryTotal, CreateLineItem, LineItem, UpdateLineItem};
pub use template::{
    relayout_chain, CreatePlaceholderInstance, CreateTemplate, PlaceholderInstance, Template,
    UpdatePlaceholderInstance, UpdateTemplate, CHAIN_GAP,
};
