pub mod form;
pub mod list;

pub use form::{ClassifyRequest, DraftEdit, TicketFormController};
pub use list::{RefreshRequest, SelectionEdit, TicketListController, UpdateRequest};

use crate::domain::ticket::Ticket;

/// Notification from the form or the modal that the backend's ticket set has
/// changed and the list should be refetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketEvent {
    Created(Ticket),
    Updated(Ticket),
}
