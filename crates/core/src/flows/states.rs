use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    AwaitingRole,
    AwaitingPeriod,
    AwaitingIdentifier,
    Completed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    Started,
    RoleChosen,
    RoleUnrecognized,
    PeriodChosen,
    PeriodUnrecognized,
    IdentifierMalformed,
    IdentifierAccepted,
    LookupRetryable,
    LookupCompleted,
    CancelRequested,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionAction {
    PromptRole,
    StoreRole,
    PromptPeriod,
    StorePeriod,
    PromptIdentifier,
    RunLookup,
    ReportRetryableFailure,
    EmitResult,
    DiscardSession,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: SessionState,
    pub to: SessionState,
    pub event: SessionEvent,
    pub actions: Vec<SessionAction>,
}
