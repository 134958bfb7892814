/// NETWORK MEMBERS
///
/// A member is identified twice: by an internal numeric id and by a
/// human-readable business identifier (the "DIP ID"). Sponsorship edges point
/// at the business identifier, never at the internal id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Human-readable membership code, e.g. `DIP0001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BusinessId(String);

impl BusinessId {
    /// Parse a business identifier. Surrounding whitespace is dropped.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, MemberError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(MemberError::EmptyBusinessId);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(MemberError::InvalidBusinessId(trimmed.to_string()));
        }
        Ok(BusinessId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BusinessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BusinessId {
    type Error = MemberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        BusinessId::new(value)
    }
}

impl From<BusinessId> for String {
    fn from(id: BusinessId) -> Self {
        id.0
    }
}

impl std::str::FromStr for BusinessId {
    type Err = MemberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BusinessId::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Ordinary network member
    #[default]
    Member,
    /// Distribution point holding inventory
    Stockist,
}

/// A member of the sponsor network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Internal primary key
    pub internal_id: u64,
    /// Business identifier used as the sponsorship join key
    pub business_id: BusinessId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Business identifier of the direct sponsor, if any
    #[serde(default)]
    pub sponsor_id: Option<BusinessId>,
    #[serde(default)]
    pub role: MemberRole,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

impl Member {
    pub fn new(internal_id: u64, business_id: BusinessId, name: impl Into<String>) -> Self {
        Member {
            internal_id,
            business_id,
            name: name.into(),
            sponsor_id: None,
            role: MemberRole::Member,
            joined_at: None,
        }
    }

    pub fn with_sponsor(mut self, sponsor: BusinessId) -> Self {
        self.sponsor_id = Some(sponsor);
        self
    }

    pub fn with_role(mut self, role: MemberRole) -> Self {
        self.role = role;
        self
    }

    pub fn is_stockist(&self) -> bool {
        matches!(self.role, MemberRole::Stockist)
    }

    /// A root member has no sponsor
    pub fn is_root(&self) -> bool {
        self.sponsor_id.is_none()
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MemberError {
    #[error("Business identifier is empty")]
    EmptyBusinessId,
    #[error("Business identifier contains whitespace: {0}")]
    InvalidBusinessId(String),
}
