//! # Ticketing Suite
//!
//! Chained integration scenarios for the ticketing API.
//!
//! The suite expects a baseline environment that already holds an event and
//! the tokens it acts with:
//!
//! | Key | Used by |
//! |---|---|
//! | `last_event_id` | ticket type and code creation |
//! | `org_member_token` | ticket type and code creation |
//! | `user_token` | ticket index |
//!
//! Running it leaves `last_ticket_type_id`, `last_code_id`, the two clamped
//! redemption codes and `ticket1_id`..`ticket4_id` in the environment.

use api_chain_runtime::TestCase;

pub mod responses;
pub mod scenarios;

/// Keys the suite reads but never writes.
pub const BASELINE_KEYS: [&str; 3] = ["last_event_id", "org_member_token", "user_token"];

/// Every scenario, in pipeline order.
#[must_use]
pub fn suite() -> Vec<TestCase> {
    vec![
        scenarios::setup::create_vip_box_office_ticket_type(),
        scenarios::codes::create_discount_percentage_clamped(),
        scenarios::codes::create_discount_absolute_clamped(),
        scenarios::transfers::user_ticket_index(),
    ]
}
