//! Typed response schemas.
//!
//! Captures decode through these instead of walking raw JSON, so a response
//! that changes shape fails with a decode error naming the field.

use api_chain_runtime::CapturedResponse;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Errors from reading a typed response.
#[derive(Error, Debug)]
pub enum ResponseError {
    /// The body did not match the schema.
    #[error("Unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),

    /// The ticket index has fewer tickets than needed.
    #[error("Ticket index lists {found} ticket(s) for the first event, expected at least {expected}")]
    TooFewTickets {
        /// Tickets needed
        expected: usize,
        /// Tickets present
        found: usize,
    },
}

/// Decode a response body into a schema.
///
/// # Errors
///
/// Returns [`ResponseError::Decode`] when the body does not match `T`.
pub fn decode<T: DeserializeOwned>(response: &CapturedResponse) -> Result<T, ResponseError> {
    Ok(response.decode()?)
}

/// `POST /events/{id}/ticket_types` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketTypeCreated {
    /// New ticket type id
    pub id: String,
}

/// `POST /events/{id}/codes` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeResponse {
    /// Code id
    pub id: String,
    /// Display name
    pub name: String,
    /// `Discount` or `Access`
    pub code_type: String,
    /// Redemption strings
    pub redemption_codes: Vec<String>,
    /// Redemption cap
    pub max_uses: u32,
    /// Percentage discount, if any
    #[serde(default)]
    pub discount_as_percentage: Option<u32>,
    /// Absolute discount, if any
    #[serde(default)]
    pub discount_in_cents: Option<u32>,
    /// Per-user ticket cap
    #[serde(default)]
    pub max_tickets_per_user: Option<u32>,
    /// Validity start
    pub start_date: String,
    /// Validity end
    pub end_date: String,
    /// Ticket types the code applies to
    pub ticket_type_ids: Vec<String>,
}

/// A ticket in the user's ticket index.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketSummary {
    /// Ticket id
    pub id: String,
}

/// `GET /tickets` response: `data` is a list of `[event, [ticket, ...]]` pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketIndex {
    /// Event/ticket groups
    pub data: Vec<(Value, Vec<TicketSummary>)>,
}

impl TicketIndex {
    /// Tickets of the first event group.
    #[must_use]
    pub fn first_event_tickets(&self) -> &[TicketSummary] {
        self.data
            .first()
            .map(|(_, tickets)| tickets.as_slice())
            .unwrap_or_default()
    }

    /// Ids of the first `count` tickets of the first event.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::TooFewTickets`] if the group is shorter.
    pub fn first_ticket_ids(&self, count: usize) -> Result<Vec<&str>, ResponseError> {
        let tickets = self.first_event_tickets();
        if tickets.len() < count {
            return Err(ResponseError::TooFewTickets {
                expected: count,
                found: tickets.len(),
            });
        }
        Ok(tickets[..count].iter().map(|t| t.id.as_str()).collect())
    }
}
