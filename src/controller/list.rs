use tracing::{debug, error, warn};

use crate::controller::TicketEvent;
use crate::domain::ticket::{Priority, Status, Ticket, TicketFilter, TicketId, TicketPatch};
use crate::error::{AppError, AppResult};

/// In-progress edit of one ticket. Never written back into the list; the
/// list only changes through a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub id: TicketId,
    pub status: Status,
    pub priority: Option<Priority>,
}

impl Selection {
    fn from_ticket(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id.clone(),
            status: ticket.status,
            priority: ticket.priority,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Modal {
    #[default]
    Closed,
    Editing(Selection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEdit {
    Status(Status),
    Priority(Priority),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub seq: u64,
    pub filter: TicketFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub id: TicketId,
    pub patch: TicketPatch,
}

#[derive(Debug, Default)]
pub struct TicketListController {
    tickets: Vec<Ticket>,
    modal: Modal,
    filter: TicketFilter,
    issued_seq: u64,
    applied_seq: u64,
    saving: bool,
    save_failure: Option<AppError>,
    refresh_failure: Option<AppError>,
}

impl TicketListController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn selection(&self) -> Option<&Selection> {
        match &self.modal {
            Modal::Editing(selection) => Some(selection),
            Modal::Closed => None,
        }
    }

    pub fn filter(&self) -> &TicketFilter {
        &self.filter
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// User-facing message for the last update failure, kept until the next
    /// successful save.
    pub fn notice(&self) -> Option<String> {
        self.save_failure
            .as_ref()
            .map(|err| format!("Could not update ticket: {err}"))
    }

    pub fn take_save_failure(&mut self) -> Option<AppError> {
        self.save_failure.take()
    }

    /// Error from the newest refresh if it failed; the snapshot shown is then
    /// older than the last request.
    pub fn take_refresh_failure(&mut self) -> Option<AppError> {
        self.refresh_failure.take()
    }

    pub fn find(&self, id: &TicketId) -> Option<&Ticket> {
        self.tickets.iter().find(|ticket| &ticket.id == id)
    }

    pub fn refresh(&mut self) -> RefreshRequest {
        self.issued_seq += 1;
        debug!(seq = self.issued_seq, "refresh issued");
        RefreshRequest {
            seq: self.issued_seq,
            filter: self.filter.clone(),
        }
    }

    pub fn set_filter(&mut self, filter: TicketFilter) -> RefreshRequest {
        self.filter = filter;
        self.refresh()
    }

    pub fn handle_event(&mut self, event: TicketEvent) -> RefreshRequest {
        match &event {
            TicketEvent::Created(ticket) => debug!(id = %ticket.id, "ticket created"),
            TicketEvent::Updated(ticket) => debug!(id = %ticket.id, "ticket updated"),
        }
        self.refresh()
    }

    /// Applies a list response unless a later-issued refresh already landed.
    pub fn refresh_resolved(&mut self, seq: u64, result: AppResult<Vec<Ticket>>) {
        if seq <= self.applied_seq {
            debug!(seq, applied = self.applied_seq, "discarding stale refresh");
            return;
        }

        match result {
            Ok(tickets) => {
                self.applied_seq = seq;
                self.tickets = tickets;
                if seq == self.issued_seq {
                    self.refresh_failure = None;
                }
            }
            Err(err) => {
                warn!(seq, error = %err, "refresh failed; keeping previous snapshot");
                if seq == self.issued_seq {
                    self.refresh_failure = Some(err);
                }
            }
        }
    }

    /// Opens the modal on `ticket`, dropping any unsaved selection.
    pub fn open(&mut self, ticket: &Ticket) {
        if let Modal::Editing(previous) = &self.modal {
            debug!(id = %previous.id, "discarding unsaved selection");
        }
        self.modal = Modal::Editing(Selection::from_ticket(ticket));
    }

    pub fn open_by_id(&mut self, id: &TicketId) -> AppResult<()> {
        let ticket = self
            .find(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("ticket {id} is not in the current list")))?;
        self.open(&ticket);
        Ok(())
    }

    pub fn edit_selection(&mut self, edit: SelectionEdit) -> bool {
        let Modal::Editing(selection) = &mut self.modal else {
            return false;
        };
        match edit {
            SelectionEdit::Status(status) => selection.status = status,
            SelectionEdit::Priority(priority) => selection.priority = Some(priority),
        }
        true
    }

    pub fn cancel(&mut self) {
        self.modal = Modal::Closed;
    }

    pub fn save(&mut self) -> Option<UpdateRequest> {
        if self.saving {
            return None;
        }
        let selection = self.selection()?;
        let request = UpdateRequest {
            id: selection.id.clone(),
            patch: TicketPatch {
                status: Some(selection.status),
                priority: selection.priority,
            },
        };
        self.saving = true;
        Some(request)
    }

    pub fn save_resolved(
        &mut self,
        id: &TicketId,
        result: AppResult<Ticket>,
    ) -> Option<RefreshRequest> {
        self.saving = false;

        match result {
            Ok(ticket) => {
                self.save_failure = None;
                if self.selection().is_some_and(|selection| &selection.id == id) {
                    self.modal = Modal::Closed;
                }
                Some(self.handle_event(TicketEvent::Updated(ticket)))
            }
            Err(err) => {
                error!(id = %id, error = %err, "ticket update failed; selection kept for retry");
                self.save_failure = Some(err);
                None
            }
        }
    }
}
