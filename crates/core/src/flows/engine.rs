use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::flows::states::{SessionAction, SessionEvent, SessionState, TransitionOutcome};

pub trait FlowDefinition {
    fn name(&self) -> &'static str;
    fn initial_state(&self) -> SessionState;
    fn transition(
        &self,
        current: &SessionState,
        event: &SessionEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// role -> period -> identifier -> result.
#[derive(Clone, Debug, Default)]
pub struct SalaryLookupFlow;

impl FlowDefinition for SalaryLookupFlow {
    fn name(&self) -> &'static str {
        "salary_lookup"
    }

    fn initial_state(&self) -> SessionState {
        SessionState::AwaitingRole
    }

    fn transition(
        &self,
        current: &SessionState,
        event: &SessionEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_salary_lookup(current, event)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn flow_name(&self) -> &'static str {
        self.flow.name()
    }

    pub fn initial_state(&self) -> SessionState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &SessionState,
        event: &SessionEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &SessionState,
        event: &SessionEvent,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit.user_id.clone(),
                        audit.correlation_id.clone(),
                        "session.transition_applied",
                        AuditCategory::Session,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("flow", self.flow.name())
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.user_id.clone(),
                        audit.correlation_id.clone(),
                        "session.transition_rejected",
                        AuditCategory::Session,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("flow", self.flow.name())
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FlowEngine<SalaryLookupFlow> {
    fn default() -> Self {
        Self::new(SalaryLookupFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: SessionState, event: SessionEvent },
}

fn transition_salary_lookup(
    current: &SessionState,
    event: &SessionEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use SessionAction::{
        DiscardSession, EmitResult, PromptIdentifier, PromptPeriod, PromptRole,
        ReportRetryableFailure, RunLookup, StorePeriod, StoreRole,
    };
    use SessionEvent::{
        CancelRequested, IdentifierAccepted, IdentifierMalformed, LookupCompleted,
        LookupRetryable, PeriodChosen, PeriodUnrecognized, RoleChosen, RoleUnrecognized, Started,
    };
    use SessionState::{AwaitingIdentifier, AwaitingPeriod, AwaitingRole, Completed};

    let (to, actions) = match (current, event) {
        (_, Started) => (AwaitingRole, vec![PromptRole]),
        (Completed, _) => {
            return Err(FlowTransitionError::InvalidTransition { state: *current, event: *event });
        }
        (_, CancelRequested) => (Completed, vec![DiscardSession]),
        (AwaitingRole, RoleChosen) => (AwaitingPeriod, vec![StoreRole, PromptPeriod]),
        (AwaitingRole, RoleUnrecognized) => (AwaitingRole, vec![PromptRole]),
        (AwaitingPeriod, PeriodChosen) => (AwaitingIdentifier, vec![StorePeriod, PromptIdentifier]),
        (AwaitingPeriod, PeriodUnrecognized) => (AwaitingPeriod, vec![PromptPeriod]),
        (AwaitingIdentifier, IdentifierMalformed) => (AwaitingIdentifier, vec![PromptIdentifier]),
        (AwaitingIdentifier, IdentifierAccepted) => (AwaitingIdentifier, vec![RunLookup]),
        (AwaitingIdentifier, LookupRetryable) => {
            (AwaitingIdentifier, vec![ReportRetryableFailure])
        }
        (AwaitingIdentifier, LookupCompleted) => (Completed, vec![EmitResult, DiscardSession]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition { state: *current, event: *event });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event, actions })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::domain::session::UserId;
    use crate::flows::engine::{FlowDefinition, FlowEngine, FlowTransitionError, SalaryLookupFlow};
    use crate::flows::states::{SessionAction, SessionEvent, SessionState};

    #[test]
    fn happy_path_walks_role_period_identifier() {
        let engine = FlowEngine::new(SalaryLookupFlow);
        let mut state = engine.initial_state();

        for (event, expected) in [
            (SessionEvent::RoleChosen, SessionState::AwaitingPeriod),
            (SessionEvent::PeriodChosen, SessionState::AwaitingIdentifier),
            (SessionEvent::IdentifierAccepted, SessionState::AwaitingIdentifier),
            (SessionEvent::LookupCompleted, SessionState::Completed),
        ] {
            state = engine.apply(&state, &event).expect("transition should apply").to;
            assert_eq!(state, expected);
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn unrecognized_input_stays_on_the_same_step() {
        let engine = FlowEngine::default();

        let role = engine
            .apply(&SessionState::AwaitingRole, &SessionEvent::RoleUnrecognized)
            .expect("retry role");
        assert_eq!(role.to, SessionState::AwaitingRole);
        assert_eq!(role.actions, vec![SessionAction::PromptRole]);

        let period = engine
            .apply(&SessionState::AwaitingPeriod, &SessionEvent::PeriodUnrecognized)
            .expect("retry period");
        assert_eq!(period.to, SessionState::AwaitingPeriod);

        let identifier = engine
            .apply(&SessionState::AwaitingIdentifier, &SessionEvent::IdentifierMalformed)
            .expect("retry identifier");
        assert_eq!(identifier.to, SessionState::AwaitingIdentifier);
        assert_eq!(identifier.actions, vec![SessionAction::PromptIdentifier]);
    }

    #[test]
    fn retryable_lookup_failure_keeps_awaiting_identifier() {
        let outcome = FlowEngine::default()
            .apply(&SessionState::AwaitingIdentifier, &SessionEvent::LookupRetryable)
            .expect("transient failure is a valid transition");

        assert_eq!(outcome.to, SessionState::AwaitingIdentifier);
        assert_eq!(outcome.actions, vec![SessionAction::ReportRetryableFailure]);
    }

    #[test]
    fn start_and_cancel_are_accepted_from_every_live_state() {
        let engine = FlowEngine::default();
        for state in [
            SessionState::AwaitingRole,
            SessionState::AwaitingPeriod,
            SessionState::AwaitingIdentifier,
        ] {
            assert_eq!(
                engine.apply(&state, &SessionEvent::Started).expect("restart").to,
                SessionState::AwaitingRole
            );
            assert_eq!(
                engine.apply(&state, &SessionEvent::CancelRequested).expect("cancel").to,
                SessionState::Completed
            );
        }
        assert_eq!(
            engine.apply(&SessionState::Completed, &SessionEvent::Started).expect("restart").to,
            SessionState::AwaitingRole
        );
    }

    #[test]
    fn out_of_order_step_is_rejected() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(&SessionState::AwaitingIdentifier, &SessionEvent::RoleChosen)
            .expect_err("role button while awaiting identifier");

        assert!(matches!(
            error,
            FlowTransitionError::InvalidTransition {
                state: SessionState::AwaitingIdentifier,
                event: SessionEvent::RoleChosen
            }
        ));
        assert!(engine.apply(&SessionState::AwaitingRole, &SessionEvent::IdentifierAccepted).is_err());
        assert!(engine.apply(&SessionState::Completed, &SessionEvent::CancelRequested).is_err());
    }

    #[test]
    fn replay_is_deterministic_for_same_event_sequence() {
        let engine = FlowEngine::default();
        let events = [
            SessionEvent::RoleUnrecognized,
            SessionEvent::RoleChosen,
            SessionEvent::PeriodChosen,
            SessionEvent::IdentifierMalformed,
            SessionEvent::IdentifierAccepted,
            SessionEvent::LookupRetryable,
            SessionEvent::IdentifierAccepted,
            SessionEvent::LookupCompleted,
        ];

        let run = |engine: &FlowEngine<SalaryLookupFlow>| {
            let mut state = engine.initial_state();
            let mut actions = Vec::new();
            for event in &events {
                let outcome = engine.apply(&state, event).expect("deterministic run");
                actions.push(outcome.actions);
                state = outcome.to;
            }
            (state, actions)
        };

        assert_eq!(run(&engine), run(&engine));
        assert_eq!(engine.flow_name(), SalaryLookupFlow.name());
    }

    #[test]
    fn transitions_emit_audit_events() {
        let engine = FlowEngine::default();
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(Some(UserId::new("U42")), "req-42", "conversation");

        engine
            .apply_with_audit(&SessionState::AwaitingRole, &SessionEvent::RoleChosen, &sink, &audit)
            .expect("transition should succeed");
        let _ = engine.apply_with_audit(
            &SessionState::AwaitingRole,
            &SessionEvent::LookupCompleted,
            &sink,
            &audit,
        );

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "session.transition_applied");
        assert_eq!(events[0].correlation_id, "req-42");
        assert_eq!(events[0].user_id.as_ref().map(UserId::as_str), Some("U42"));
        assert_eq!(events[1].event_type, "session.transition_rejected");
    }
}
