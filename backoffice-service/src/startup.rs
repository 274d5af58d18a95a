use crate::config::BackofficeConfig;
use crate::handlers::{cases, company, email_logs, health, invoices, templates};
use crate::middleware::{auth_middleware, track_metrics};
use crate::services::{Database, JwtService};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use std::future::IntoFuture;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: BackofficeConfig,
    pub db: Database,
    pub jwt: JwtService,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: BackofficeConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to PostgreSQL: {}", e);
            e
        })?;
        db.run_migrations().await.map_err(|e| {
            tracing::error!("Failed to run migrations: {}", e);
            e
        })?;

        let jwt = JwtService::new(&config.auth.jwt_secret);

        let state = AppState {
            config: config.clone(),
            db,
            jwt,
        };

        let app = router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

/// The full application router. Probes and metrics stay outside the
/// authentication layer; everything under /api passes through it.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/api/sterbefall/",
            get(cases::list_cases).post(cases::create_case),
        )
        .route("/api/sterbefall/dashboard_data/", get(cases::dashboard_data))
        .route(
            "/api/sterbefall/:id/",
            get(cases::get_case)
                .put(cases::update_case)
                .patch(cases::update_case)
                .delete(cases::delete_case),
        )
        .route("/api/sterbefall/:id/rechnung/", get(cases::case_invoices))
        .route("/api/sterbefall/:id/pdfs/", get(cases::case_pdfs))
        .route(
            "/api/sterbefall/:id/pdfs/:template_id/",
            get(cases::case_pdf_detail),
        )
        .route(
            "/api/rechnung/",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/api/rechnung/:id/",
            get(invoices::get_invoice)
                .put(invoices::update_invoice)
                .patch(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route(
            "/api/rechnung/:id/change_status/",
            post(invoices::change_status),
        )
        .route(
            "/api/rechnung/:id/create_korrektur/",
            post(invoices::create_korrektur),
        )
        .route(
            "/api/rechnung/:id/herunterladen/",
            post(invoices::herunterladen),
        )
        .route(
            "/api/rechnung/:id/add_standard_positions/",
            post(invoices::add_standard_positions),
        )
        .route(
            "/api/rechnung/:id/positionen/",
            get(invoices::list_positions).post(invoices::create_position),
        )
        .route(
            "/api/rechnung/:id/positionen/:pos_id/",
            get(invoices::get_position)
                .put(invoices::update_position)
                .patch(invoices::update_position)
                .delete(invoices::delete_position),
        )
        .route(
            "/api/rechnungspositionen/category_summary/:year/",
            get(invoices::category_summary),
        )
        .route(
            "/api/vorlagen/",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/api/vorlagen/:id/",
            get(templates::get_template)
                .put(templates::update_template)
                .patch(templates::update_template)
                .delete(templates::delete_template),
        )
        .route(
            "/api/platzhalter/",
            get(templates::list_placeholders).post(templates::create_placeholder),
        )
        .route(
            "/api/platzhalter/:id/",
            get(templates::get_placeholder)
                .put(templates::update_placeholder)
                .patch(templates::update_placeholder)
                .delete(templates::delete_placeholder),
        )
        .route("/api/emaillogs/", post(email_logs::create_email_log))
        .route(
            "/api/emaillogs/:document_name/",
            get(email_logs::list_email_logs),
        )
        .route(
            "/api/company/",
            get(company::get_company)
                .put(company::update_company)
                .patch(company::update_company),
        )
        .route(
            "/api/users/",
            get(company::list_users).post(company::create_user),
        )
        .route(
            "/api/users/:id/",
            get(company::get_user)
                .put(company::update_user)
                .patch(company::update_user)
                .delete(company::delete_user),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics_endpoint))
        .merge(api)
        .layer(middleware::from_fn(track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
