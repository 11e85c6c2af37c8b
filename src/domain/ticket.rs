use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;

/// Backend-assigned ticket identifier. The backend may send it as a number or
/// a string; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawTicketId", into = "String")]
pub struct TicketId(String);

impl TicketId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TicketId {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "ticket id must not be empty".to_string(),
            ));
        }
        Ok(Self::new(trimmed))
    }
}

impl From<TicketId> for String {
    fn from(id: TicketId) -> Self {
        id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTicketId {
    Number(u64),
    Text(String),
}

impl From<RawTicketId> for TicketId {
    fn from(raw: RawTicketId) -> Self {
        match raw {
            RawTicketId::Number(number) => TicketId(number.to_string()),
            RawTicketId::Text(text) => TicketId(text),
        }
    }
}

macro_rules! wire_enum {
    ($name:ident, $label:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_lowercase().as_str() {
                    $($wire => Ok($name::$variant),)+
                    other => Err(AppError::Validation(format!(
                        "unknown {} '{other}'",
                        $label
                    ))),
                }
            }
        }
    };
}

wire_enum!(Category, "category", {
    Billing => "billing",
    Technical => "technical",
    Account => "account",
    General => "general",
});

wire_enum!(Priority, "priority", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

wire_enum!(Status, "status", {
    Open => "open",
    InProgress => "in_progress",
    Resolved => "resolved",
    Closed => "closed",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub title: String,
    pub description: String,
    #[serde(default, with = "blank_enum")]
    pub category: Option<Category>,
    #[serde(default, with = "blank_enum")]
    pub priority: Option<Priority>,
    pub status: Status,
}

/// Client-side input for a ticket that does not exist yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketDraft {
    pub title: String,
    pub description: String,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
}

/// Body of `POST tickets/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    #[serde(with = "blank_enum")]
    pub category: Option<Category>,
    #[serde(with = "blank_enum")]
    pub priority: Option<Priority>,
}

/// Body of `PATCH tickets/{id}/`. Unset fields are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Classification {
    #[serde(default, rename = "suggested_category", with = "blank_enum")]
    pub category: Option<Category>,
    #[serde(default, rename = "suggested_priority", with = "blank_enum")]
    pub priority: Option<Priority>,
}

/// Server-side list filters; every unset field is omitted from the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub search: Option<String>,
}

impl TicketFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(category) = self.category {
            pairs.push(("category", category.as_str().to_string()));
        }
        if let Some(priority) = self.priority {
            pairs.push(("priority", priority.as_str().to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                pairs.push(("search", search.to_string()));
            }
        }
        pairs
    }
}

/// Optional enums travel as `""` when unset; `null` and a missing field are
/// accepted on the way in as well.
mod blank_enum {
    use super::*;

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(value) => value.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr<Err = AppError>,
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
