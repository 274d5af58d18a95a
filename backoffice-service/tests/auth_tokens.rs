//! Token verification and tenant context resolution.

use backoffice_service::middleware::TenantContext;
use backoffice_service::services::{AccessTokenClaims, JwtService};
use chrono::{Duration, Utc};
use uuid::Uuid;

fn claims() -> AccessTokenClaims {
    let now = Utc::now();
    AccessTokenClaims {
        sub: Uuid::new_v4(),
        username: "emustermann".to_string(),
        first_name: Some("Erika".to_string()),
        last_name: Some("Mustermann".to_string()),
        role: Some("GESCHAEFTSFUEHRER".to_string()),
        company_id: Uuid::new_v4(),
        company_name: Some("Bestattungen Mustermann".to_string()),
        exp: (now + Duration::minutes(30)).timestamp(),
        iat: now.timestamp(),
    }
}

#[test]
fn a_valid_token_yields_the_tenant_context() {
    let service = JwtService::new("integration-secret");
    let claims = claims();
    let company_id = claims.company_id;

    let token = service.encode_token(&claims).unwrap();
    let decoded = service.validate_access_token(&token).unwrap();
    let ctx = TenantContext::from(decoded);

    assert_eq!(ctx.company_id, company_id);
    assert_eq!(ctx.username, "emustermann");
    assert_eq!(ctx.actor(), "Erika Mustermann");
}

#[test]
fn a_tampered_token_is_rejected() {
    let service = JwtService::new("integration-secret");
    let token = service.encode_token(&claims()).unwrap();

    let mut tampered = token.clone();
    tampered.pop();
    tampered.push(if token.ends_with('A') { 'B' } else { 'A' });

    assert!(service.validate_access_token(&tampered).is_err());
}

#[test]
fn context_without_names_falls_back_to_the_username() {
    let service = JwtService::new("integration-secret");
    let mut claims = claims();
    claims.first_name = None;
    claims.last_name = None;

    let token = service.encode_token(&claims).unwrap();
    let ctx = TenantContext::from(service.validate_access_token(&token).unwrap());

    assert_eq!(ctx.actor(), "emustermann");
}
