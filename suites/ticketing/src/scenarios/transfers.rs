//! Ticket transfers.

use crate::responses::{TicketIndex, decode};
use api_chain_core::RequestTemplate;
use api_chain_runtime::{Assertion, Capture, TestCase};

/// Environment keys for the first four tickets of the user's first event.
pub const TICKET_KEYS: [&str; 4] = ["ticket1_id", "ticket2_id", "ticket3_id", "ticket4_id"];

/// User lists their tickets and remembers the first four for later transfers.
#[must_use]
pub fn user_ticket_index() -> TestCase {
    TestCase::new(
        "User - Ticket - Index",
        RequestTemplate::get("/tickets?query=").bearer("{{user_token}}"),
    )
    .assert(Assertion::status(200))
    .capture(Capture::extract(
        "first four tickets of the first event",
        &TICKET_KEYS,
        |response| {
            let index: TicketIndex = decode(response).map_err(|e| e.to_string())?;
            let ids = index
                .first_ticket_ids(TICKET_KEYS.len())
                .map_err(|e| e.to_string())?;
            Ok(TICKET_KEYS
                .iter()
                .zip(ids)
                .map(|(key, id)| ((*key).to_string(), id.to_string()))
                .collect())
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_chain_runtime::Failure;
    use api_chain_testing::CaseTest;
    use serde_json::json;

    #[tokio::test]
    async fn test_captures_first_four_ticket_ids() {
        CaseTest::new(user_ticket_index())
            .given_env("user_token", "U1")
            .when_responding(
                200,
                json!({"data": [[
                    {"id": "EV1"},
                    [{"id": "T1"}, {"id": "T2"}, {"id": "T3"}, {"id": "T4"}, {"id": "T5"}]
                ]]}),
            )
            .then_report(|report| assert!(report.passed(), "{report:?}"))
            .then_store(|store| {
                assert_eq!(store.get("ticket1_id"), Some("T1"));
                assert_eq!(store.get("ticket4_id"), Some("T4"));
            })
            .then_request(|request| {
                assert_eq!(request.path, "/tickets?query=");
                assert_eq!(request.header("Authorization"), Some("Bearer U1"));
                assert_eq!(request.body, None);
            })
            .run()
            .await;
    }

    #[tokio::test]
    async fn test_short_ticket_list_is_a_capture_failure() {
        CaseTest::new(user_ticket_index())
            .given_env("user_token", "U1")
            .when_responding(200, json!({"data": [[{"id": "EV1"}, [{"id": "T1"}]]]}))
            .then_report(|report| {
                assert!(matches!(
                    report.failures(),
                    [Failure::Capture { reason, .. }] if reason.contains("expected at least 4")
                ));
            })
            .then_store(|store| assert!(!store.contains("ticket1_id")))
            .run()
            .await;
    }

    #[tokio::test]
    async fn test_flat_list_is_a_decode_failure() {
        CaseTest::new(user_ticket_index())
            .given_env("user_token", "U1")
            .when_responding(200, json!({"data": [{"id": "T1"}]}))
            .then_report(|report| {
                assert!(matches!(
                    report.failures(),
                    [Failure::Capture { key, .. }] if key == "ticket1_id, ticket2_id, ticket3_id, ticket4_id"
                ));
            })
            .run()
            .await;
    }
}
