use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::role::{Period, Role};
use crate::flows::states::SessionState;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One user's in-progress lookup flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub state: SessionState,
    pub role: Option<Role>,
    pub period: Option<Period>,
    pub raw_identifier: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn start(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            state: SessionState::AwaitingRole,
            role: None,
            period: None,
            raw_identifier: None,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn advance(&mut self, state: SessionState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}
