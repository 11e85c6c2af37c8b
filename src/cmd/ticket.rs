use clap::Args;

use crate::context::AppContext;
use crate::controller::{DraftEdit, SelectionEdit};
use crate::domain::ticket::{Category, Priority, Status, Ticket, TicketFilter, TicketId};
use crate::error::{AppError, AppResult};
use crate::workflow::session::{Action, Session};

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Short summary of the problem.
    #[arg(short, long)]
    pub title: String,
    /// Full description; also used to suggest a category and priority.
    #[arg(short, long)]
    pub description: String,
    /// billing, technical, account or general. Overrides the suggestion.
    #[arg(short, long)]
    pub category: Option<Category>,
    /// low, medium, high or critical. Overrides the suggestion.
    #[arg(short, long)]
    pub priority: Option<Priority>,
    /// Skip asking the backend for a suggestion.
    #[arg(long)]
    pub no_classify: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    /// Text to classify.
    pub description: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(short, long)]
    pub category: Option<Category>,
    #[arg(short, long)]
    pub priority: Option<Priority>,
    #[arg(short, long)]
    pub status: Option<Status>,
    /// Match against title and description.
    #[arg(long)]
    pub search: Option<String>,
    /// Print the tickets as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    pub id: TicketId,
    #[arg(short, long)]
    pub status: Option<Status>,
    #[arg(short, long)]
    pub priority: Option<Priority>,
}

pub async fn create(ctx: &AppContext, args: CreateArgs) -> AppResult<()> {
    let mut session = Session::from_context(ctx);
    session.dispatch(Action::Refresh)?;
    session.dispatch(Action::EditDraft(DraftEdit::Title(args.title)))?;
    session.dispatch(Action::EditDraft(DraftEdit::Description(args.description)))?;

    if !args.no_classify {
        session.dispatch(Action::BlurDescription)?;
        if session.form().is_classifying() {
            eprintln!("Classifying...");
        }
        session.settle().await;
        let draft = session.form().draft();
        println!(
            "Suggested: category {}, priority {}",
            label(draft.category),
            label(draft.priority)
        );
    }

    if args.category.is_some() {
        session.dispatch(Action::EditDraft(DraftEdit::Category(args.category)))?;
    }
    if args.priority.is_some() {
        session.dispatch(Action::EditDraft(DraftEdit::Priority(args.priority)))?;
    }

    session.dispatch(Action::Submit)?;
    session.settle().await;

    if let Some(notice) = session.form().notice() {
        eprintln!("{notice}");
    }
    if let Some(err) = session.take_create_failure() {
        if err.is_retryable() {
            eprintln!("Nothing was saved; run the same command again to retry.");
        }
        return Err(err);
    }

    println!("Ticket created.");
    match session.take_refresh_failure() {
        Some(err) => eprintln!("{}", stale_list_warning(&err)),
        None => print_tickets(session.list().tickets()),
    }
    Ok(())
}

pub async fn classify(ctx: &AppContext, args: ClassifyArgs) -> AppResult<()> {
    let mut session = Session::from_context(ctx);
    session.dispatch(Action::EditDraft(DraftEdit::Description(args.description)))?;
    session.dispatch(Action::BlurDescription)?;
    if session.pending() == 0 {
        return Err(AppError::Validation(format!(
            "description must be at least {} characters to classify",
            ctx.config.min_classify_chars
        )));
    }
    session.settle().await;

    let draft = session.form().draft();
    println!("Category: {}", label(draft.category));
    println!("Priority: {}", label(draft.priority));
    Ok(())
}

pub async fn list(ctx: &AppContext, args: ListArgs) -> AppResult<()> {
    let filter = TicketFilter {
        category: args.category,
        priority: args.priority,
        status: args.status,
        search: args.search,
    };

    let mut session = Session::from_context(ctx);
    session.dispatch(Action::SetFilter(filter))?;
    session.settle().await;
    if let Some(err) = session.take_refresh_failure() {
        return Err(err);
    }

    let tickets = session.list().tickets();
    if args.json {
        let json = serde_json::to_string_pretty(tickets)
            .map_err(|err| AppError::Server(format!("failed to encode tickets: {err}")))?;
        println!("{json}");
    } else {
        print_tickets(tickets);
    }
    Ok(())
}

pub async fn update(ctx: &AppContext, args: UpdateArgs) -> AppResult<()> {
    if args.status.is_none() && args.priority.is_none() {
        return Err(AppError::Validation(
            "pass --status and/or --priority to update a ticket".to_string(),
        ));
    }

    let mut session = Session::from_context(ctx);
    session.dispatch(Action::Refresh)?;
    session.settle().await;
    if let Some(err) = session.take_refresh_failure() {
        return Err(err);
    }

    session.dispatch(Action::Open(args.id.clone()))?;
    if let Some(status) = args.status {
        session.dispatch(Action::EditSelection(SelectionEdit::Status(status)))?;
    }
    if let Some(priority) = args.priority {
        session.dispatch(Action::EditSelection(SelectionEdit::Priority(priority)))?;
    }
    session.dispatch(Action::Save)?;
    session.settle().await;

    if let Some(notice) = session.list().notice() {
        eprintln!("{notice}");
    }
    if let Some(err) = session.take_save_failure() {
        if err.is_retryable() {
            eprintln!("The ticket was not changed; run the same command again to retry.");
        }
        return Err(err);
    }

    match session.list().find(&args.id) {
        Some(ticket) => {
            println!("Ticket {} updated.", ticket.id);
            print_tickets(std::slice::from_ref(ticket));
        }
        None => println!("Ticket {} updated.", args.id),
    }
    Ok(())
}

fn stale_list_warning(err: &AppError) -> String {
    format!("Warning: could not reload the ticket list ({err}); run `ticketdesk list` to see it.")
}

fn print_tickets(tickets: &[Ticket]) {
    if tickets.is_empty() {
        println!("No tickets yet");
        return;
    }
    for ticket in tickets {
        println!("{}", format_ticket(ticket));
    }
}

fn format_ticket(ticket: &Ticket) -> String {
    format!(
        "#{} {}\n    {}\n    {} | {} | {}",
        ticket.id,
        ticket.title,
        ticket.description,
        label(ticket.category),
        label(ticket.priority),
        ticket.status
    )
}

fn label<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| "-".to_string())
}
