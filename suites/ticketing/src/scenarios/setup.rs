//! Event setup: ticket types.

use crate::responses::{TicketTypeCreated, decode};
use api_chain_core::RequestTemplate;
use api_chain_runtime::{Assertion, Capture, TestCase};
use serde_json::json;

/// Organisation member creates a VIP ticket type with a box-office-only tier.
///
/// Each tier name carries its own `{{$timestamp}}`.
#[must_use]
pub fn create_vip_box_office_ticket_type() -> TestCase {
    let body = json!({
        "name": "VIP_{{$timestamp}}_With_Box_Office",
        "capacity": 100,
        "start_date": "1982-02-01T02:22:00",
        "end_date": "9999-01-10T02:22:00",
        "price_in_cents": 2500,
        "limit_per_person": 0,
        "sold_out_behavior": "ShowSoldOut",
        "is_private": false,
        "ticket_pricing": [
            {
                "name": "Test_{{$timestamp}}",
                "price_in_cents": 3000,
                "start_date": "1982-02-01T02:22:00",
                "end_date": "2022-02-01T02:22:00"
            },
            {
                "name": "Test_{{$timestamp}}_late_bird",
                "price_in_cents": 4000,
                "start_date": "2022-02-01T02:22:00",
                "end_date": "9999-01-10T02:22:00"
            },
            {
                "name": "Test_{{$timestamp}}_box_office_only",
                "price_in_cents": 8000,
                "is_box_office_only": true,
                "start_date": "2022-02-01T02:22:00",
                "end_date": "9999-01-10T02:22:00"
            }
        ]
    });

    TestCase::new(
        "OrgMember - create tickets - VIP - Box office Only",
        RequestTemplate::post("/events/{{last_event_id}}/ticket_types")
            .bearer("{{org_member_token}}")
            .json(body),
    )
    .assert(Assertion::status(201))
    .capture(Capture::extract(
        "ticket type id",
        &["last_ticket_type_id"],
        |response| {
            let created: TicketTypeCreated = decode(response).map_err(|e| e.to_string())?;
            Ok(vec![("last_ticket_type_id".to_string(), created.id)])
        },
    ))
}
