//! Discount codes.
//!
//! The server is expected to accept out-of-range discounts as given; the
//! cases only check that every field is echoed back.

use crate::responses::{CodeResponse, decode};
use api_chain_core::RequestTemplate;
use api_chain_runtime::{Assertion, Capture, TestCase};
use serde_json::{Value, json};

const START_DATE: &str = "2018-01-01T12:00:00";
const END_DATE: &str = "2059-01-01T12:00:00";

fn discount_body(suffix: &str, extra: &[(&str, Value)]) -> Value {
    let mut body = json!({
        "name": "Discount Tickets",
        "code_type": "Discount",
        "redemption_codes": [format!("RedeemDiscountCode{{{{$timestamp}}}}_{suffix}")],
        "max_uses": 10,
        "start_date": START_DATE,
        "end_date": END_DATE,
        "ticket_type_ids": ["{{last_ticket_type_id}}"]
    });
    if let Value::Object(fields) = &mut body {
        for (key, value) in extra {
            fields.insert((*key).to_string(), value.clone());
        }
    }
    body
}

fn create_discount(name: &str, body: Value) -> TestCase {
    TestCase::new(
        name,
        RequestTemplate::post("/events/{{last_event_id}}/codes")
            .bearer("{{org_member_token}}")
            .json(body),
    )
    .assert(Assertion::status(201))
    .assert(Assertion::json_eq("$.name", "Discount Tickets"))
    .assert(Assertion::json_eq("$.max_uses", 10))
    .assert(Assertion::json_eq("$.code_type", "Discount"))
    .assert(Assertion::json_eq("$.start_date", START_DATE))
    .assert(Assertion::json_eq("$.end_date", END_DATE))
    .assert(Assertion::json_eq_var("$.ticket_type_ids[0]", "last_ticket_type_id"))
    .assert(Assertion::custom("response decodes as a code", |response| {
        decode::<CodeResponse>(response)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }))
    .capture(Capture::path("last_code_id", "$.id"))
}

/// Percentage discount above 100.
#[must_use]
pub fn create_discount_percentage_clamped() -> TestCase {
    create_discount(
        "OrgMember - create discount percentage clamped",
        discount_body(
            "percentage_clamped",
            &[("discount_as_percentage", json!(110))],
        ),
    )
    .assert(Assertion::json_eq("$.discount_as_percentage", 110))
    .capture(Capture::path(
        "discount_percentage_redemption_code_clamped",
        "$.redemption_codes[0]",
    ))
}

/// Absolute discount larger than the ticket price.
#[must_use]
pub fn create_discount_absolute_clamped() -> TestCase {
    create_discount(
        "OrgMember - create discount absolute clamped",
        discount_body(
            "absolute_clamped",
            &[
                ("discount_in_cents", json!(9999)),
                ("max_tickets_per_user", json!(2)),
            ],
        ),
    )
    .assert(Assertion::json_eq("$.discount_in_cents", 9999))
    .assert(Assertion::json_eq("$.max_tickets_per_user", 2))
    .capture(Capture::path(
        "discount_redemption_code_clamped",
        "$.redemption_codes[0]",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_chain_runtime::Failure;
    use api_chain_testing::CaseTest;

    fn echo(extra: &[(&str, Value)]) -> Value {
        let mut body = json!({
            "id": "C1",
            "name": "Discount Tickets",
            "code_type": "Discount",
            "redemption_codes": ["RedeemDiscountCode1735689600000_percentage_clamped"],
            "max_uses": 10,
            "start_date": START_DATE,
            "end_date": END_DATE,
            "ticket_type_ids": ["TT1"]
        });
        if let Value::Object(fields) = &mut body {
            for (key, value) in extra {
                fields.insert((*key).to_string(), value.clone());
            }
        }
        body
    }

    #[tokio::test]
    async fn test_percentage_clamped_echo_passes() {
        CaseTest::new(create_discount_percentage_clamped())
            .given_env("last_event_id", "EV1")
            .given_env("org_member_token", "OM1")
            .given_env("last_ticket_type_id", "TT1")
            .when_responding(201, echo(&[("discount_as_percentage", json!(110))]))
            .then_report(|report| assert!(report.passed(), "{report:?}"))
            .then_store(|store| {
                assert_eq!(store.get("last_code_id"), Some("C1"));
                assert_eq!(
                    store.get("discount_percentage_redemption_code_clamped"),
                    Some("RedeemDiscountCode1735689600000_percentage_clamped")
                );
            })
            .then_request(|request| {
                assert_eq!(request.path, "/events/EV1/codes");
                let body = request.body.clone().unwrap_or_default();
                assert!(body.contains("RedeemDiscountCode1735689600000_percentage_clamped"));
                assert!(body.contains(r#""ticket_type_ids":["TT1"]"#));
            })
            .run()
            .await;
    }

    #[tokio::test]
    async fn test_clamped_value_fails_but_still_captures() {
        CaseTest::new(create_discount_percentage_clamped())
            .given_env("last_event_id", "EV1")
            .given_env("org_member_token", "OM1")
            .given_env("last_ticket_type_id", "TT1")
            .when_responding(201, echo(&[("discount_as_percentage", json!(100))]))
            .then_report(|report| {
                assert_eq!(
                    report.failures(),
                    &[Failure::Assertion {
                        description: "$.discount_as_percentage should equal 110".to_string(),
                        expected: "110".to_string(),
                        actual: "100".to_string(),
                    }]
                );
            })
            .then_store(|store| assert_eq!(store.get("last_code_id"), Some("C1")))
            .run()
            .await;
    }

    #[tokio::test]
    async fn test_absolute_clamped_checks_ticket_type() {
        CaseTest::new(create_discount_absolute_clamped())
            .given_env("last_event_id", "EV1")
            .given_env("org_member_token", "OM1")
            .given_env("last_ticket_type_id", "TT2")
            .when_responding(
                201,
                echo(&[
                    ("discount_in_cents", json!(9999)),
                    ("max_tickets_per_user", json!(2)),
                ]),
            )
            .then_report(|report| {
                assert_eq!(report.failures().len(), 1);
                assert!(matches!(
                    &report.failures()[0],
                    Failure::Assertion { expected, actual, .. } if expected == "TT2" && actual == "TT1"
                ));
            })
            .run()
            .await;
    }
}
