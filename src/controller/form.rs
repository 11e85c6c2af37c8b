use tracing::{debug, error, warn};

use crate::controller::TicketEvent;
use crate::domain::ticket::{Category, Classification, NewTicket, Priority, Ticket, TicketDraft};
use crate::error::{AppError, AppResult};

pub const DEFAULT_MIN_CLASSIFY_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftEdit {
    Title(String),
    Description(String),
    Category(Option<Category>),
    Priority(Option<Priority>),
}

/// A classification the form wants issued. `generation` ties the eventual
/// response to the draft it was requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyRequest {
    pub generation: u64,
    pub description: String,
}

#[derive(Debug)]
pub struct TicketFormController {
    draft: TicketDraft,
    generation: u64,
    classifications_in_flight: usize,
    submitting: bool,
    failure: Option<AppError>,
    min_classify_chars: usize,
}

impl TicketFormController {
    pub fn new(min_classify_chars: usize) -> Self {
        Self {
            draft: TicketDraft::default(),
            generation: 0,
            classifications_in_flight: 0,
            submitting: false,
            failure: None,
            min_classify_chars,
        }
    }

    pub fn draft(&self) -> &TicketDraft {
        &self.draft
    }

    pub fn is_classifying(&self) -> bool {
        self.classifications_in_flight > 0
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// User-facing message for the last create failure, kept until the next
    /// successful submit.
    pub fn notice(&self) -> Option<String> {
        self.failure
            .as_ref()
            .map(|err| format!("Could not create ticket: {err}"))
    }

    pub fn take_failure(&mut self) -> Option<AppError> {
        self.failure.take()
    }

    pub fn edit(&mut self, edit: DraftEdit) {
        match edit {
            DraftEdit::Title(title) => self.draft.title = title,
            DraftEdit::Description(description) => self.draft.description = description,
            DraftEdit::Category(category) => self.draft.category = category,
            DraftEdit::Priority(priority) => self.draft.priority = priority,
        }
    }

    /// Called when the description field loses focus.
    pub fn description_blurred(&mut self) -> Option<ClassifyRequest> {
        let description = self.draft.description.trim();
        if description.is_empty() {
            return None;
        }
        if description.chars().count() < self.min_classify_chars {
            debug!(
                chars = description.chars().count(),
                min = self.min_classify_chars,
                "description too short to classify"
            );
            return None;
        }

        self.classifications_in_flight += 1;
        Some(ClassifyRequest {
            generation: self.generation,
            description: description.to_string(),
        })
    }

    pub fn classification_resolved(&mut self, generation: u64, result: AppResult<Classification>) {
        self.classifications_in_flight = self.classifications_in_flight.saturating_sub(1);

        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                "discarding classification for a cleared draft"
            );
            return;
        }
        if self.submitting {
            debug!("discarding classification that resolved during submission");
            return;
        }

        match result {
            Ok(suggestion) => {
                if let Some(category) = suggestion.category {
                    self.draft.category = Some(category);
                }
                if let Some(priority) = suggestion.priority {
                    self.draft.priority = Some(priority);
                }
            }
            Err(err) => warn!(error = %err, "classification failed; keeping current fields"),
        }
    }

    pub fn submit(&mut self) -> AppResult<NewTicket> {
        if self.submitting {
            return Err(AppError::Validation(
                "a submission is already in progress".to_string(),
            ));
        }
        if self.draft.title.trim().is_empty() {
            return Err(AppError::Validation("title is required".to_string()));
        }
        if self.draft.description.trim().is_empty() {
            return Err(AppError::Validation("description is required".to_string()));
        }

        self.submitting = true;
        Ok(NewTicket {
            title: self.draft.title.trim().to_string(),
            description: self.draft.description.trim().to_string(),
            category: self.draft.category,
            priority: self.draft.priority,
        })
    }

    pub fn creation_resolved(&mut self, result: AppResult<Ticket>) -> Option<TicketEvent> {
        self.submitting = false;

        match result {
            Ok(ticket) => {
                self.draft = TicketDraft::default();
                self.generation += 1;
                self.failure = None;
                Some(TicketEvent::Created(ticket))
            }
            Err(err) => {
                error!(error = %err, "ticket creation failed; draft kept for retry");
                self.failure = Some(err);
                None
            }
        }
    }
}

impl Default for TicketFormController {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CLASSIFY_CHARS)
    }
}
