//! Scenario tests for the business rules that do not need a database.

use backoffice_service::models::{
    build_invoice_number, next_auftragsnummer, relayout_chain, Feature, InvoiceStatus,
    InvoiceType, PlaceholderInstance, PlanTier,
};
use uuid::Uuid;

#[test]
fn order_numbers_restart_each_year() {
    // A busy December in year 24...
    let mut last = None;
    for expected in [24001, 24002, 24003] {
        let next = next_auftragsnummer(24, last);
        assert_eq!(next, expected);
        last = Some(next);
    }

    // ...and the first case of year 25 starts over at 1. The previous
    // year's numbers are outside the new year's band, so the query that
    // feeds `last_for_year` reports None.
    assert_eq!(next_auftragsnummer(25, None), 25001);
}

#[test]
fn invoice_and_offer_sequences_are_independent() {
    // First invoice and first offer on case 24007 both carry the plain
    // number, only with different prefixes.
    assert_eq!(
        build_invoice_number(InvoiceType::Rechnung, 24007, 0),
        "R24007"
    );
    assert_eq!(
        build_invoice_number(InvoiceType::Angebot, 24007, 0),
        "A24007"
    );

    // A correction on the invoice side does not advance the offer side.
    assert_eq!(
        build_invoice_number(InvoiceType::Rechnung, 24007, 1),
        "R24007/2"
    );
    assert_eq!(
        build_invoice_number(InvoiceType::Angebot, 24007, 1),
        "A24007/2"
    );
}

#[test]
fn lifecycle_draft_open_paid() {
    let draft = InvoiceStatus::Entwurf;
    let open = InvoiceStatus::Offen;
    let paid = InvoiceStatus::Bezahlt;
    let cancelled = InvoiceStatus::Storniert;

    assert!(draft.can_transition_to(open));
    assert!(open.can_transition_to(paid));

    // No shortcut from draft to paid, no way back from open to draft,
    // and nothing leaves the terminal states.
    assert!(!draft.can_transition_to(paid));
    assert!(!open.can_transition_to(draft));
    assert!(!paid.can_transition_to(open));
    assert!(!cancelled.can_transition_to(draft));
}

#[test]
fn status_values_are_never_guessed() {
    assert_eq!(InvoiceStatus::parse("BEZAHLT"), Some(InvoiceStatus::Bezahlt));
    assert_eq!(InvoiceStatus::parse("bezahlt"), None);
    assert_eq!(InvoiceStatus::parse(""), None);
    assert_eq!(InvoiceType::parse("GUTSCHRIFT"), None);
}

fn chained(x: f64, width: f64, position: i32) -> PlaceholderInstance {
    PlaceholderInstance {
        id: Uuid::new_v4(),
        company_id: Uuid::new_v4(),
        vorlage_id: Uuid::new_v4(),
        platzhalter_key: "nachname".to_string(),
        name: None,
        page_number: 1,
        x_position: x,
        y_position: 700.0,
        width,
        font_size: 11,
        font_color: "black".to_string(),
        bold: false,
        chain_id: Some("kopfzeile".to_string()),
        chain_position: Some(position),
    }
}

#[test]
fn widening_one_link_pushes_the_rest_of_the_chain() {
    let mut chain = vec![
        chained(10.0, 40.0, 0),
        chained(60.0, 30.0, 1),
        chained(100.0, 20.0, 2),
    ];

    // Already laid out: 10+40+10 = 60, 60+30+10 = 100.
    assert!(relayout_chain(&mut chain).is_empty());

    // The first placeholder grows; everything after it moves right.
    chain[0].width = 55.0;
    let changed = relayout_chain(&mut chain);

    assert_eq!(chain[0].x_position, 10.0);
    assert_eq!(chain[1].x_position, 75.0);
    assert_eq!(chain[2].x_position, 115.0);
    assert_eq!(changed, vec![chain[1].id, chain[2].id]);
}

#[test]
fn plan_tiers_form_a_strict_ladder() {
    for feature in Feature::ALL {
        // Anything Trial has, Basic has; anything Basic has, Premium has.
        if PlanTier::Trial.allows(feature) {
            assert!(PlanTier::Basic.allows(feature));
        }
        if PlanTier::Basic.allows(feature) {
            assert!(PlanTier::Premium.allows(feature));
        }
    }

    assert!(!PlanTier::Trial.allows(Feature::EmailLog));
    assert!(!PlanTier::Basic.allows(Feature::Dashboard));
    assert!(PlanTier::Premium.allows(Feature::Dashboard));
}

#[test]
fn plan_tier_wire_values_round_trip() {
    for tier in [PlanTier::Trial, PlanTier::Basic, PlanTier::Premium] {
        assert_eq!(PlanTier::parse(tier.as_str()), Some(tier));
    }
    assert_eq!(PlanTier::parse("FREE"), None);
}
