use async_trait::async_trait;

use crate::domain::ticket::{Classification, NewTicket, Ticket, TicketFilter, TicketId, TicketPatch};
use crate::error::AppResult;

/// Remote ticket backend. Every call is independent; nothing here orders or
/// retries requests.
#[async_trait]
pub trait TicketService: Send + Sync {
    async fn create(&self, ticket: &NewTicket) -> AppResult<Ticket>;
    async fn classify(&self, description: &str) -> AppResult<Classification>;
    async fn list(&self, filter: &TicketFilter) -> AppResult<Vec<Ticket>>;
    async fn update(&self, id: &TicketId, patch: &TicketPatch) -> AppResult<Ticket>;
}
