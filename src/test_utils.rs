use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::domain::ticket::{
    Category, Classification, NewTicket, Priority, Status, Ticket, TicketFilter, TicketId,
    TicketPatch,
};
use crate::error::{AppError, AppResult};
use crate::services::TicketService;

pub fn sample_ticket(id: &str, status: Status, priority: Option<Priority>) -> Ticket {
    Ticket {
        id: TicketId::new(id),
        title: format!("Ticket {id}"),
        description: "Something stopped working".to_string(),
        category: Some(Category::General),
        priority,
        status,
    }
}

/// Backend stand-in that keeps tickets in memory and classifies by keyword.
#[derive(Default)]
pub struct InMemoryTickets {
    tickets: Mutex<Vec<Ticket>>,
    next_id: AtomicU64,
    list_calls: AtomicUsize,
}

impl InMemoryTickets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TicketService for InMemoryTickets {
    async fn create(&self, ticket: &NewTicket) -> AppResult<Ticket> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = Ticket {
            id: TicketId::new(id.to_string()),
            title: ticket.title.clone(),
            description: ticket.description.clone(),
            category: ticket.category,
            priority: ticket.priority,
            status: Status::Open,
        };
        self.tickets.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn classify(&self, description: &str) -> AppResult<Classification> {
        let lowered = description.to_lowercase();
        if lowered.contains("invoice") || lowered.contains("charged") {
            Ok(Classification {
                category: Some(Category::Billing),
                priority: Some(Priority::High),
            })
        } else {
            Ok(Classification::default())
        }
    }

    async fn list(&self, filter: &TicketFilter) -> AppResult<Vec<Ticket>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let tickets = self.tickets.lock().unwrap();
        Ok(tickets
            .iter()
            .filter(|ticket| filter.status.is_none_or(|status| ticket.status == status))
            .cloned()
            .collect())
    }

    async fn update(&self, id: &TicketId, patch: &TicketPatch) -> AppResult<Ticket> {
        let mut tickets = self.tickets.lock().unwrap();
        let ticket = tickets
            .iter_mut()
            .find(|ticket| &ticket.id == id)
            .ok_or_else(|| AppError::NotFound(format!("ticket {id}")))?;
        if let Some(status) = patch.status {
            ticket.status = status;
        }
        if let Some(priority) = patch.priority {
            ticket.priority = Some(priority);
        }
        Ok(ticket.clone())
    }
}

type Gate<T> = Mutex<VecDeque<oneshot::Receiver<AppResult<T>>>>;

/// Backend stand-in whose every response is released by the test, so
/// completion order is fully controlled.
#[derive(Default)]
pub struct GatedTickets {
    creates: Gate<Ticket>,
    classifications: Gate<Classification>,
    lists: Gate<Vec<Ticket>>,
    updates: Gate<Ticket>,
    pub created: Mutex<Vec<NewTicket>>,
    pub patched: Mutex<Vec<(TicketId, TicketPatch)>>,
}

impl GatedTickets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gate_create(&self) -> oneshot::Sender<AppResult<Ticket>> {
        Self::gate(&self.creates)
    }

    pub fn gate_classify(&self) -> oneshot::Sender<AppResult<Classification>> {
        Self::gate(&self.classifications)
    }

    pub fn gate_list(&self) -> oneshot::Sender<AppResult<Vec<Ticket>>> {
        Self::gate(&self.lists)
    }

    pub fn gate_update(&self) -> oneshot::Sender<AppResult<Ticket>> {
        Self::gate(&self.updates)
    }

    fn gate<T>(queue: &Gate<T>) -> oneshot::Sender<AppResult<T>> {
        let (sender, receiver) = oneshot::channel();
        queue.lock().unwrap().push_back(receiver);
        sender
    }

    async fn wait<T>(queue: &Gate<T>, operation: &str) -> AppResult<T> {
        let receiver = queue.lock().unwrap().pop_front();
        match receiver {
            Some(receiver) => receiver
                .await
                .unwrap_or_else(|_| Err(AppError::Network(format!("{operation} gate dropped")))),
            None => Err(AppError::Network(format!("no {operation} response scripted"))),
        }
    }
}

#[async_trait]
impl TicketService for GatedTickets {
    async fn create(&self, ticket: &NewTicket) -> AppResult<Ticket> {
        self.created.lock().unwrap().push(ticket.clone());
        Self::wait(&self.creates, "create").await
    }

    async fn classify(&self, _description: &str) -> AppResult<Classification> {
        Self::wait(&self.classifications, "classify").await
    }

    async fn list(&self, _filter: &TicketFilter) -> AppResult<Vec<Ticket>> {
        Self::wait(&self.lists, "list").await
    }

    async fn update(&self, id: &TicketId, patch: &TicketPatch) -> AppResult<Ticket> {
        self.patched.lock().unwrap().push((id.clone(), patch.clone()));
        Self::wait(&self.updates, "update").await
    }
}

/// Backend stand-in whose every call panics.
pub struct PanickingTickets;

#[async_trait]
impl TicketService for PanickingTickets {
    async fn create(&self, _ticket: &NewTicket) -> AppResult<Ticket> {
        panic!("create exploded")
    }

    async fn classify(&self, _description: &str) -> AppResult<Classification> {
        panic!("classify exploded")
    }

    async fn list(&self, _filter: &TicketFilter) -> AppResult<Vec<Ticket>> {
        panic!("list exploded")
    }

    async fn update(&self, _id: &TicketId, _patch: &TicketPatch) -> AppResult<Ticket> {
        panic!("update exploded")
    }
}
