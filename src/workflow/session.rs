use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, error};

use crate::context::AppContext;
use crate::controller::{
    ClassifyRequest, DraftEdit, RefreshRequest, SelectionEdit, TicketFormController,
    TicketListController, UpdateRequest,
};
use crate::domain::ticket::{Classification, NewTicket, Ticket, TicketFilter, TicketId};
use crate::error::{AppError, AppResult};
use crate::services::TicketService;

/// User intent delivered to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    EditDraft(DraftEdit),
    BlurDescription,
    Submit,
    Refresh,
    SetFilter(TicketFilter),
    Open(TicketId),
    EditSelection(SelectionEdit),
    Cancel,
    Save,
}

/// A finished backend call, routed back to the controller that issued it.
enum Completion {
    Classified {
        generation: u64,
        result: AppResult<Classification>,
    },
    Created(AppResult<Ticket>),
    Listed {
        seq: u64,
        result: AppResult<Vec<Ticket>>,
    },
    Updated {
        id: TicketId,
        result: AppResult<Ticket>,
    },
}

/// Event loop tying the form and list controllers to the backend.
///
/// Backend calls run as spawned tasks; their results come back over a channel
/// and are applied one at a time by [`Session::process_next`], so controller
/// state is only ever touched from the task that owns the session.
pub struct Session {
    service: Arc<dyn TicketService>,
    form: TicketFormController,
    list: TicketListController,
    pending: usize,
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,
}

impl Session {
    pub fn new(service: Arc<dyn TicketService>, min_classify_chars: usize) -> Self {
        let (completions_tx, completions_rx) = unbounded_channel();
        Self {
            service,
            form: TicketFormController::new(min_classify_chars),
            list: TicketListController::new(),
            pending: 0,
            completions_tx,
            completions_rx,
        }
    }

    pub fn from_context(ctx: &AppContext) -> Self {
        Self::new(Arc::clone(&ctx.tickets), ctx.config.min_classify_chars)
    }

    pub fn form(&self) -> &TicketFormController {
        &self.form
    }

    pub fn list(&self) -> &TicketListController {
        &self.list
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn take_create_failure(&mut self) -> Option<AppError> {
        self.form.take_failure()
    }

    pub fn take_save_failure(&mut self) -> Option<AppError> {
        self.list.take_save_failure()
    }

    pub fn take_refresh_failure(&mut self) -> Option<AppError> {
        self.list.take_refresh_failure()
    }

    pub fn dispatch(&mut self, action: Action) -> AppResult<()> {
        match action {
            Action::EditDraft(edit) => self.form.edit(edit),
            Action::BlurDescription => {
                if let Some(request) = self.form.description_blurred() {
                    self.spawn_classify(request);
                }
            }
            Action::Submit => {
                let ticket = self.form.submit()?;
                self.spawn_create(ticket);
            }
            Action::Refresh => {
                let request = self.list.refresh();
                self.spawn_refresh(request);
            }
            Action::SetFilter(filter) => {
                let request = self.list.set_filter(filter);
                self.spawn_refresh(request);
            }
            Action::Open(id) => self.list.open_by_id(&id)?,
            Action::EditSelection(edit) => {
                if !self.list.edit_selection(edit) {
                    return Err(AppError::Validation(
                        "no ticket is open for editing".to_string(),
                    ));
                }
            }
            Action::Cancel => self.list.cancel(),
            Action::Save => {
                let request = self.list.save().ok_or_else(|| {
                    AppError::Validation(
                        "nothing to save: no ticket open or a save is in progress".to_string(),
                    )
                })?;
                self.spawn_update(request);
            }
        }
        Ok(())
    }

    /// Waits for one outstanding backend call and applies it. Returns `false`
    /// when nothing is pending.
    pub async fn process_next(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        let Some(completion) = self.completions_rx.recv().await else {
            return false;
        };
        self.pending -= 1;
        self.apply(completion);
        true
    }

    /// Processes completions until no backend call is outstanding, including
    /// refreshes triggered along the way.
    pub async fn settle(&mut self) {
        while self.process_next().await {}
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Classified { generation, result } => {
                self.form.classification_resolved(generation, result);
            }
            Completion::Created(result) => {
                if let Some(event) = self.form.creation_resolved(result) {
                    let request = self.list.handle_event(event);
                    self.spawn_refresh(request);
                }
            }
            Completion::Listed { seq, result } => self.list.refresh_resolved(seq, result),
            Completion::Updated { id, result } => {
                if let Some(request) = self.list.save_resolved(&id, result) {
                    self.spawn_refresh(request);
                }
            }
        }
    }

    fn spawn_classify(&mut self, request: ClassifyRequest) {
        let service = Arc::clone(&self.service);
        let generation = request.generation;
        self.spawn(
            async move { service.classify(&request.description).await },
            move |result| Completion::Classified { generation, result },
        );
    }

    fn spawn_create(&mut self, ticket: NewTicket) {
        let service = Arc::clone(&self.service);
        self.spawn(
            async move { service.create(&ticket).await },
            Completion::Created,
        );
    }

    fn spawn_refresh(&mut self, request: RefreshRequest) {
        let service = Arc::clone(&self.service);
        let seq = request.seq;
        self.spawn(
            async move { service.list(&request.filter).await },
            move |result| Completion::Listed { seq, result },
        );
    }

    fn spawn_update(&mut self, request: UpdateRequest) {
        let service = Arc::clone(&self.service);
        let id = request.id.clone();
        self.spawn(
            async move { service.update(&request.id, &request.patch).await },
            move |result| Completion::Updated { id, result },
        );
    }

    /// Runs `call` on its own task. A completion is always delivered, even
    /// when the call panics, so `pending` cannot leak.
    fn spawn<T, F, C>(&mut self, call: F, complete: C)
    where
        T: Send + 'static,
        F: Future<Output = AppResult<T>> + Send + 'static,
        C: FnOnce(AppResult<T>) -> Completion + Send + 'static,
    {
        self.pending += 1;
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = match tokio::spawn(call).await {
                Ok(result) => result,
                Err(err) => {
                    error!(error = %err, "backend task aborted");
                    Err(AppError::Server(format!("backend call aborted: {err}")))
                }
            };
            if completions.send(complete(result)).is_err() {
                debug!("session dropped before backend call finished");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::list::Modal;
    use crate::domain::ticket::{Category, Priority, Status, TicketDraft};
    use crate::test_utils::{GatedTickets, InMemoryTickets, PanickingTickets, sample_ticket};

    const INVOICE: &str = "My invoice is wrong and I was overcharged twice";

    fn fill_draft(session: &mut Session) {
        session
            .dispatch(Action::EditDraft(DraftEdit::Title("Billing issue".to_string())))
            .unwrap();
        session
            .dispatch(Action::EditDraft(DraftEdit::Description(INVOICE.to_string())))
            .unwrap();
    }

    #[tokio::test]
    async fn create_classify_update_round_trip() {
        let backend = Arc::new(InMemoryTickets::new());
        let mut session = Session::new(backend.clone(), 10);
        session.dispatch(Action::Refresh).unwrap();
        session.settle().await;
        assert!(session.list().tickets().is_empty());

        fill_draft(&mut session);
        session.dispatch(Action::BlurDescription).unwrap();
        session.settle().await;
        assert_eq!(session.form().draft().category, Some(Category::Billing));
        assert_eq!(session.form().draft().priority, Some(Priority::High));

        session.dispatch(Action::Submit).unwrap();
        session.settle().await;
        assert_eq!(session.form().draft(), &TicketDraft::default());
        assert_eq!(backend.list_calls(), 2);

        let created = session.list().tickets()[0].clone();
        assert_eq!(created.title, "Billing issue");
        assert_eq!(created.category, Some(Category::Billing));
        assert_eq!(created.status, Status::Open);

        session.dispatch(Action::Open(created.id.clone())).unwrap();
        session
            .dispatch(Action::EditSelection(SelectionEdit::Status(Status::Resolved)))
            .unwrap();
        session
            .dispatch(Action::EditSelection(SelectionEdit::Priority(Priority::Low)))
            .unwrap();
        session.dispatch(Action::Save).unwrap();
        session.settle().await;

        assert_eq!(session.list().modal(), &Modal::Closed);
        let updated = &session.list().tickets()[0];
        assert_eq!(updated.status, Status::Resolved);
        assert_eq!(updated.priority, Some(Priority::Low));
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.description, created.description);
        assert_eq!(updated.category, created.category);
    }

    #[tokio::test]
    async fn stale_refresh_never_replaces_newer_snapshot() {
        let backend = Arc::new(GatedTickets::new());
        let first = backend.gate_list();
        let second = backend.gate_list();
        let mut session = Session::new(backend.clone(), 10);

        session.dispatch(Action::Refresh).unwrap();
        tokio::task::yield_now().await;
        session.dispatch(Action::Refresh).unwrap();
        tokio::task::yield_now().await;

        second
            .send(Ok(vec![sample_ticket("2", Status::Open, None)]))
            .unwrap();
        assert!(session.process_next().await);
        first
            .send(Ok(vec![sample_ticket("1", Status::Open, None)]))
            .unwrap();
        assert!(session.process_next().await);

        assert_eq!(session.pending(), 0);
        assert_eq!(session.list().tickets().len(), 1);
        assert_eq!(session.list().tickets()[0].id.as_str(), "2");
    }

    #[tokio::test]
    async fn submit_does_not_wait_for_classification() {
        let backend = Arc::new(GatedTickets::new());
        let classify = backend.gate_classify();
        let create = backend.gate_create();
        let refresh = backend.gate_list();
        let mut session = Session::new(backend.clone(), 10);

        fill_draft(&mut session);
        session.dispatch(Action::BlurDescription).unwrap();
        tokio::task::yield_now().await;
        session.dispatch(Action::Submit).unwrap();
        assert!(session.form().is_classifying());

        create
            .send(Ok(sample_ticket("1", Status::Open, None)))
            .unwrap();
        assert!(session.process_next().await);
        assert_eq!(session.form().draft(), &TicketDraft::default());

        classify
            .send(Ok(Classification {
                category: Some(Category::Billing),
                priority: Some(Priority::High),
            }))
            .unwrap();
        refresh
            .send(Ok(vec![sample_ticket("1", Status::Open, None)]))
            .unwrap();
        session.settle().await;

        assert_eq!(session.form().draft(), &TicketDraft::default());
        assert!(!session.form().is_classifying());
        assert_eq!(session.list().tickets().len(), 1);
    }

    #[tokio::test]
    async fn failed_create_keeps_draft_and_skips_refresh() {
        let backend = Arc::new(GatedTickets::new());
        let create = backend.gate_create();
        let mut session = Session::new(backend.clone(), 10);
        fill_draft(&mut session);
        let before = session.form().draft().clone();

        session.dispatch(Action::Submit).unwrap();
        create
            .send(Err(AppError::Network("connection reset".to_string())))
            .unwrap();
        session.settle().await;

        assert_eq!(session.form().draft(), &before);
        assert!(session.form().notice().is_some());
        assert_eq!(session.pending(), 0);
        assert_eq!(backend.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn validation_failure_makes_no_request() {
        let backend = Arc::new(GatedTickets::new());
        let mut session = Session::new(backend.clone(), 10);

        let result = session.dispatch(Action::Submit);

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(session.pending(), 0);
        assert!(backend.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_modal_open() {
        let backend = Arc::new(GatedTickets::new());
        let mount = backend.gate_list();
        let update = backend.gate_update();
        let mut session = Session::new(backend.clone(), 10);

        session.dispatch(Action::Refresh).unwrap();
        mount
            .send(Ok(vec![sample_ticket("7", Status::Open, Some(Priority::Medium))]))
            .unwrap();
        session.settle().await;

        session.dispatch(Action::Open(TicketId::new("7"))).unwrap();
        session
            .dispatch(Action::EditSelection(SelectionEdit::Status(Status::Closed)))
            .unwrap();
        session.dispatch(Action::Save).unwrap();
        update
            .send(Err(AppError::NotFound("ticket 7".to_string())))
            .unwrap();
        session.settle().await;

        let selection = session.list().selection().unwrap();
        assert_eq!(selection.status, Status::Closed);
        assert!(session.list().notice().is_some());
        assert_eq!(session.list().tickets()[0].status, Status::Open);

        let patched = backend.patched.lock().unwrap();
        assert_eq!(patched.len(), 1);
        assert_eq!(patched[0].1.status, Some(Status::Closed));
        assert_eq!(patched[0].1.priority, Some(Priority::Medium));
    }

    #[tokio::test]
    async fn cancel_discards_edits_without_a_request() {
        let backend = Arc::new(InMemoryTickets::new());
        let mut session = Session::new(backend.clone(), 10);
        fill_draft(&mut session);
        session.dispatch(Action::Submit).unwrap();
        session.settle().await;
        let before = session.list().tickets().to_vec();
        let id = before[0].id.clone();

        session.dispatch(Action::Open(id)).unwrap();
        session
            .dispatch(Action::EditSelection(SelectionEdit::Status(Status::Closed)))
            .unwrap();
        session.dispatch(Action::Cancel).unwrap();

        assert_eq!(session.list().modal(), &Modal::Closed);
        assert_eq!(session.pending(), 0);
        assert!(session.dispatch(Action::Save).is_err());
        session.dispatch(Action::Refresh).unwrap();
        session.settle().await;
        assert_eq!(session.list().tickets(), before.as_slice());
    }

    #[tokio::test]
    async fn panicking_backend_call_still_settles() {
        let mut session = Session::new(Arc::new(PanickingTickets), 10);
        fill_draft(&mut session);
        let before = session.form().draft().clone();

        session.dispatch(Action::Submit).unwrap();
        session.settle().await;

        assert_eq!(session.pending(), 0);
        assert!(!session.form().is_submitting());
        assert_eq!(session.form().draft(), &before);
        assert!(matches!(
            session.take_create_failure(),
            Some(AppError::Server(_))
        ));
    }

    #[tokio::test]
    async fn editing_without_open_ticket_is_rejected() {
        let mut session = Session::new(Arc::new(GatedTickets::new()), 10);
        assert!(matches!(
            session.dispatch(Action::EditSelection(SelectionEdit::Status(Status::Closed))),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            session.dispatch(Action::Save),
            Err(AppError::Validation(_))
        ));
    }
}
