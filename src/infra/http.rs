use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder, StatusCode,
    header::{ACCEPT, CONTENT_TYPE},
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::domain::ticket::{
    Classification, NewTicket, Ticket, TicketFilter, TicketId, TicketPatch,
};
use crate::error::{AppError, AppResult};
use crate::services::TicketService;

pub struct HttpTicketClient {
    http: Client,
    base_url: Url,
}

impl HttpTicketClient {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Configuration(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: Self::normalize_base(base_url)?,
        })
    }

    /// Relative joins drop the last path segment unless the base ends in `/`.
    fn normalize_base(base_url: &str) -> AppResult<Url> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(AppError::Configuration(
                "backend base URL not configured".to_string(),
            ));
        }
        let with_slash = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{trimmed}/")
        };
        Url::parse(&with_slash)
            .map_err(|err| AppError::Configuration(format!("invalid base URL '{trimmed}': {err}")))
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        self.base_url
            .join(path)
            .map_err(|err| AppError::Configuration(format!("invalid endpoint '{path}': {err}")))
    }

    fn ticket_endpoint(&self, id: &TicketId) -> AppResult<Url> {
        let mut url = self.endpoint("tickets/")?;
        url.path_segments_mut()
            .map_err(|_| AppError::Configuration("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(id.as_str())
            .push("");
        Ok(url)
    }

    fn with_json<B: Serialize + ?Sized>(request: RequestBuilder, body: &B) -> RequestBuilder {
        request
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(body)
    }

    async fn execute<T: DeserializeOwned>(request: RequestBuilder, action: &str) -> AppResult<T> {
        let response = request
            .send()
            .await
            .map_err(|err| AppError::Network(format!("failed to {action}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response>".to_string());
            return Err(status_error(status, action, &body));
        }

        response.json::<T>().await.map_err(|err| {
            if err.is_timeout() {
                AppError::Network(format!("timed out reading response to {action}: {err}"))
            } else {
                AppError::Server(format!("failed to parse response to {action}: {err}"))
            }
        })
    }
}

fn status_error(status: StatusCode, action: &str, body: &str) -> AppError {
    let message = format!("backend responded to {action} with {status}: {body}");
    if status == StatusCode::NOT_FOUND {
        AppError::NotFound(message)
    } else if status.is_client_error() {
        AppError::Validation(message)
    } else {
        AppError::Server(message)
    }
}

#[derive(Serialize)]
struct ClassifyBody<'a> {
    description: &'a str,
}

#[async_trait]
impl TicketService for HttpTicketClient {
    async fn create(&self, ticket: &NewTicket) -> AppResult<Ticket> {
        let url = self.endpoint("tickets/")?;
        debug!(%url, "creating ticket");
        Self::execute(
            Self::with_json(self.http.post(url), ticket),
            "create ticket",
        )
        .await
    }

    async fn classify(&self, description: &str) -> AppResult<Classification> {
        let url = self.endpoint("tickets/classify/")?;
        debug!(%url, chars = description.chars().count(), "classifying description");
        Self::execute(
            Self::with_json(self.http.post(url), &ClassifyBody { description }),
            "classify ticket",
        )
        .await
    }

    async fn list(&self, filter: &TicketFilter) -> AppResult<Vec<Ticket>> {
        let mut url = self.endpoint("tickets/")?;
        let pairs = filter.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        debug!(%url, "listing tickets");
        Self::execute(
            self.http.get(url).header(ACCEPT, "application/json"),
            "list tickets",
        )
        .await
    }

    async fn update(&self, id: &TicketId, patch: &TicketPatch) -> AppResult<Ticket> {
        let url = self.ticket_endpoint(id)?;
        debug!(%url, "updating ticket");
        Self::execute(
            Self::with_json(self.http.patch(url), patch),
            "update ticket",
        )
        .await
    }
}
