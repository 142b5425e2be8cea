//! Drives one user's lookup conversation: session bookkeeping around the flow
//! engine, and the lookup pipeline once an identifier arrives.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::identifier::IDENTIFIER_EXAMPLE;
use crate::domain::role::{Period, Role};
use crate::domain::session::{Session, UserId};
use crate::errors::{ApplicationError, DomainError, ErrorClass};
use crate::flows::engine::{FlowEngine, FlowTransitionError, SalaryLookupFlow};
use crate::flows::states::{SessionEvent, SessionState, TransitionOutcome};
use crate::flows::store::SessionStore;
use crate::lookup::{LookupError, LookupPipeline, LookupReport, LookupRequest};

const ACTOR: &str = "conversation";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    PromptRole { retry: bool },
    PromptPeriod { role: Role, retry: bool },
    PromptIdentifier { role: Role, period: Period, retry: bool },
    Report(LookupReport),
    NotFound { message: String },
    Failure { class: ErrorClass, message: String, correlation_id: String },
    RestartRequired,
    Cancelled,
    /// A lookup finished after its session was cancelled or restarted.
    Superseded,
}

impl Reply {
    pub fn text(&self) -> String {
        match self {
            Self::PromptRole { retry } => {
                let prompt = "Choose your role: Administrator or Field Staff.";
                if *retry {
                    format!("That role is not recognized. {prompt}")
                } else {
                    prompt.to_owned()
                }
            }
            Self::PromptPeriod { role, retry } => {
                let prompt = format!(
                    "Role: {role}. Choose the period: {} or {}.",
                    Period::Current,
                    Period::Previous
                );
                if *retry {
                    format!("That period is not recognized. {prompt}")
                } else {
                    prompt
                }
            }
            Self::PromptIdentifier { role, period, retry } => {
                let prompt = format!(
                    "{role}, {period}. Enter your hire date and personnel number as DDMMYYYY-NNNN, for example {IDENTIFIER_EXAMPLE}."
                );
                if *retry {
                    format!("That identifier is not in the expected format. {prompt}")
                } else {
                    prompt
                }
            }
            Self::Report(report) => report.render(),
            Self::NotFound { message } | Self::Failure { message, .. } => message.clone(),
            Self::RestartRequired => {
                "There is no lookup in progress for this step. Send /bonus to start again."
                    .to_owned()
            }
            Self::Cancelled => "Lookup cancelled. Send /bonus to start again.".to_owned(),
            Self::Superseded => String::new(),
        }
    }

    /// Nothing should be posted back to the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}

/// Entry points a transport calls for one user.
#[async_trait]
pub trait Conversation: Send + Sync {
    async fn start(&self, user_id: &UserId, correlation_id: &str) -> Reply;
    async fn cancel(&self, user_id: &UserId, correlation_id: &str) -> Reply;
    async fn select_role(&self, user_id: &UserId, label: &str, correlation_id: &str) -> Reply;
    async fn select_period(&self, user_id: &UserId, label: &str, correlation_id: &str) -> Reply;
    async fn submit_identifier(&self, user_id: &UserId, raw: &str, correlation_id: &str) -> Reply;
    /// Free text, routed by the current session state.
    async fn handle_text(&self, user_id: &UserId, text: &str, correlation_id: &str) -> Reply;
    async fn active_sessions(&self) -> usize;
}

pub struct ConversationService {
    engine: FlowEngine<SalaryLookupFlow>,
    store: Arc<dyn SessionStore>,
    pipeline: LookupPipeline,
    audit: Arc<dyn AuditSink>,
}

impl ConversationService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        pipeline: LookupPipeline,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self { engine: FlowEngine::default(), store, pipeline, audit }
    }

    fn audit_context(user_id: &UserId, correlation_id: &str) -> AuditContext {
        AuditContext::new(Some(user_id.clone()), correlation_id, ACTOR)
    }

    fn transition(
        &self,
        state: SessionState,
        event: SessionEvent,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.engine.apply_with_audit(&state, &event, self.audit.as_ref(), audit)
    }

    async fn restart_required(&self, audit: &AuditContext, step: &'static str) -> Reply {
        info!(
            event_name = "session.missing",
            correlation_id = %audit.correlation_id,
            step,
            "input arrived without an active session"
        );
        self.audit.emit(
            AuditEvent::new(
                audit.user_id.clone(),
                audit.correlation_id.clone(),
                "session.input_without_session",
                AuditCategory::Ingress,
                audit.actor.clone(),
                AuditOutcome::Rejected,
            )
            .with_metadata("step", step),
        );
        Reply::RestartRequired
    }

    async fn protocol_violation(
        &self,
        user_id: &UserId,
        audit: &AuditContext,
        error: FlowTransitionError,
    ) -> Reply {
        self.store.remove(user_id).await;
        let failure = ApplicationError::from(DomainError::from(error));
        let class = failure.class();
        let failure = failure.into_interface(audit.correlation_id.clone());
        warn!(
            event_name = "session.protocol_violation",
            correlation_id = failure.correlation_id(),
            class = class.as_str(),
            error = %failure,
            "out-of-order input discarded the session"
        );
        Reply::RestartRequired
    }

    fn failure_reply(error: LookupError, correlation_id: &str) -> Reply {
        let message = error.user_message();
        let failure = ApplicationError::from(error);
        let class = failure.class();
        let failure = failure.into_interface(correlation_id);
        warn!(
            event_name = "lookup.failure_reported",
            correlation_id = failure.correlation_id(),
            class = class.as_str(),
            error = %failure,
            "lookup failed"
        );
        Reply::Failure { class, message, correlation_id: failure.correlation_id().to_owned() }
    }

    fn record_lookup(&self, audit: &AuditContext, result: &Result<LookupReport, LookupError>) {
        let event = match result {
            Ok(report) => AuditEvent::new(
                audit.user_id.clone(),
                audit.correlation_id.clone(),
                "lookup.completed",
                AuditCategory::Lookup,
                audit.actor.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("role", report.role.as_str())
            .with_metadata("period", report.period.as_str())
            .with_metadata("sheet", report.sheet.clone()),
            Err(error) => {
                let outcome = match error.class() {
                    ErrorClass::NotFound => AuditOutcome::Rejected,
                    _ => AuditOutcome::Failed,
                };
                AuditEvent::new(
                    audit.user_id.clone(),
                    audit.correlation_id.clone(),
                    "lookup.failed",
                    AuditCategory::Lookup,
                    audit.actor.clone(),
                    outcome,
                )
                .with_metadata("class", error.class().as_str())
                .with_metadata("error", error.to_string())
            }
        };
        self.audit.emit(event);
    }
}

#[async_trait]
impl Conversation for ConversationService {
    async fn start(&self, user_id: &UserId, correlation_id: &str) -> Reply {
        let audit = Self::audit_context(user_id, correlation_id);
        let state = match self.store.get(user_id).await {
            Some(session) => session.state,
            None => SessionState::Completed,
        };
        if let Err(error) = self.transition(state, SessionEvent::Started, &audit) {
            return self.protocol_violation(user_id, &audit, error).await;
        }

        self.store.put(Session::start(user_id.clone())).await;
        info!(
            event_name = "session.started",
            correlation_id,
            user_id = %user_id,
            "lookup session started"
        );
        Reply::PromptRole { retry: false }
    }

    async fn cancel(&self, user_id: &UserId, correlation_id: &str) -> Reply {
        let audit = Self::audit_context(user_id, correlation_id);
        if let Some(session) = self.store.remove(user_id).await {
            if let Err(error) = self.transition(session.state, SessionEvent::CancelRequested, &audit)
            {
                warn!(event_name = "session.cancel_rejected", correlation_id, error = %error);
            }
        }
        info!(event_name = "session.cancelled", correlation_id, user_id = %user_id, "lookup cancelled");
        Reply::Cancelled
    }

    async fn select_role(&self, user_id: &UserId, label: &str, correlation_id: &str) -> Reply {
        let audit = Self::audit_context(user_id, correlation_id);
        let Some(mut session) = self.store.get(user_id).await else {
            return self.restart_required(&audit, "role").await;
        };

        let role = Role::from_label(label);
        let event =
            if role.is_some() { SessionEvent::RoleChosen } else { SessionEvent::RoleUnrecognized };
        let outcome = match self.transition(session.state, event, &audit) {
            Ok(outcome) => outcome,
            Err(error) => return self.protocol_violation(user_id, &audit, error).await,
        };

        let Some(role) = role else {
            return Reply::PromptRole { retry: true };
        };
        session.role = Some(role);
        session.advance(outcome.to);
        self.store.put(session).await;
        Reply::PromptPeriod { role, retry: false }
    }

    async fn select_period(&self, user_id: &UserId, label: &str, correlation_id: &str) -> Reply {
        let audit = Self::audit_context(user_id, correlation_id);
        let Some(mut session) = self.store.get(user_id).await else {
            return self.restart_required(&audit, "period").await;
        };

        let period = Period::from_label(label);
        let event = if period.is_some() {
            SessionEvent::PeriodChosen
        } else {
            SessionEvent::PeriodUnrecognized
        };
        let outcome = match self.transition(session.state, event, &audit) {
            Ok(outcome) => outcome,
            Err(error) => return self.protocol_violation(user_id, &audit, error).await,
        };
        let Some(role) = session.role else {
            return self
                .protocol_violation(
                    user_id,
                    &audit,
                    FlowTransitionError::InvalidTransition { state: session.state, event },
                )
                .await;
        };

        let Some(period) = period else {
            return Reply::PromptPeriod { role, retry: true };
        };
        session.period = Some(period);
        session.advance(outcome.to);
        self.store.put(session).await;
        Reply::PromptIdentifier { role, period, retry: false }
    }

    async fn submit_identifier(&self, user_id: &UserId, raw: &str, correlation_id: &str) -> Reply {
        let audit = Self::audit_context(user_id, correlation_id);
        let Some(mut session) = self.store.get(user_id).await else {
            return self.restart_required(&audit, "identifier").await;
        };

        let parsed = LookupPipeline::parse(raw);
        let event = if parsed.is_ok() {
            SessionEvent::IdentifierAccepted
        } else {
            SessionEvent::IdentifierMalformed
        };
        if let Err(error) = self.transition(session.state, event, &audit) {
            return self.protocol_violation(user_id, &audit, error).await;
        }
        let (Some(role), Some(period)) = (session.role, session.period) else {
            return self
                .protocol_violation(
                    user_id,
                    &audit,
                    FlowTransitionError::InvalidTransition { state: session.state, event },
                )
                .await;
        };
        let identifier = match parsed {
            Ok(identifier) => identifier,
            Err(_) => return Reply::PromptIdentifier { role, period, retry: true },
        };

        session.raw_identifier = Some(raw.trim().to_owned());
        session.advance(SessionState::AwaitingIdentifier);
        let started_at = session.started_at;
        self.store.put(session).await;

        let result = self.pipeline.run(&LookupRequest { role, period, identifier }).await;
        self.record_lookup(&audit, &result);

        let still_current = self.store.get(user_id).await.is_some_and(|current| {
            current.started_at == started_at && current.state == SessionState::AwaitingIdentifier
        });
        if !still_current {
            info!(
                event_name = "session.lookup_superseded",
                correlation_id,
                user_id = %user_id,
                "lookup result discarded after the session changed"
            );
            return Reply::Superseded;
        }

        let (event, reply) = match result {
            Ok(report) => (SessionEvent::LookupCompleted, Reply::Report(report)),
            Err(error) if error.class().keeps_session() => {
                (SessionEvent::LookupRetryable, Self::failure_reply(error, correlation_id))
            }
            Err(error) if error.class() == ErrorClass::NotFound => {
                (SessionEvent::LookupCompleted, Reply::NotFound { message: error.user_message() })
            }
            Err(error) => {
                (SessionEvent::LookupCompleted, Self::failure_reply(error, correlation_id))
            }
        };

        match self.transition(SessionState::AwaitingIdentifier, event, &audit) {
            Ok(outcome) if outcome.to.is_terminal() => {
                self.store.remove(user_id).await;
            }
            Ok(_) => {}
            Err(error) => return self.protocol_violation(user_id, &audit, error).await,
        }
        reply
    }

    async fn handle_text(&self, user_id: &UserId, text: &str, correlation_id: &str) -> Reply {
        let command = text.trim().trim_start_matches('/').to_lowercase();
        match command.as_str() {
            "start" | "restart" => return self.start(user_id, correlation_id).await,
            "cancel" => return self.cancel(user_id, correlation_id).await,
            _ => {}
        }

        let state = self.store.get(user_id).await.map(|session| session.state);
        match state {
            Some(SessionState::AwaitingRole) => self.select_role(user_id, text, correlation_id).await,
            Some(SessionState::AwaitingPeriod) => {
                self.select_period(user_id, text, correlation_id).await
            }
            Some(SessionState::AwaitingIdentifier) => {
                self.submit_identifier(user_id, text, correlation_id).await
            }
            Some(SessionState::Completed) | None => {
                let audit = Self::audit_context(user_id, correlation_id);
                self.restart_required(&audit, "text").await
            }
        }
    }

    async fn active_sessions(&self) -> usize {
        self.store.len().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::{Conversation, ConversationService, Reply};
    use crate::audit::InMemoryAuditSink;
    use crate::config::{ReportConfig, SheetsConfig};
    use crate::domain::role::{Period, Role};
    use crate::domain::session::UserId;
    use crate::errors::{ApplicationError, DomainError, ErrorClass};
    use crate::flows::states::SessionState;
    use crate::flows::store::{InMemorySessionStore, SessionStore};
    use crate::lookup::{LookupPipeline, ReportColumns};
    use crate::sheets::{InMemorySheetSource, SheetFetchError, SheetRef, SheetSource, SheetTable};

    struct Harness {
        service: ConversationService,
        store: Arc<InMemorySessionStore>,
        source: Arc<InMemorySheetSource>,
        audit: InMemoryAuditSink,
    }

    fn roster() -> SheetTable {
        SheetTable::from_rows(vec![
            vec!["Name", "Unit", "Office", "Personnel", "Role", "Hired"],
            vec!["", "", "", "9224", "", "13.10.2025"],
            vec!["", "", "", "4321", "", "01.01.2024"],
        ])
    }

    fn admin_sheet() -> SheetTable {
        SheetTable::from_rows(vec![
            vec!["October", "", ""],
            vec!["Табельный номер", "Bonus", "Plan"],
            vec!["9224", "1500", ""],
        ])
    }

    fn workbook() -> InMemorySheetSource {
        InMemorySheetSource::new()
            .with_table(SheetRef::name("Список сотрудников"), roster())
            .with_table(SheetRef::name("Администраторы"), admin_sheet())
    }

    fn report_config() -> ReportConfig {
        ReportConfig {
            columns: ReportColumns {
                administrator: vec!["Bonus".to_owned(), "Plan".to_owned()],
                field_staff: vec!["Bonus".to_owned()],
            },
            show_elapsed: false,
        }
    }

    /// Holds the first fetch until released.
    struct GatedSheetSource {
        inner: InMemorySheetSource,
        armed: AtomicBool,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl SheetSource for GatedSheetSource {
        async fn fetch(&self, sheet: &SheetRef) -> Result<SheetTable, SheetFetchError> {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.fetch(sheet).await
        }
    }

    fn harness() -> Harness {
        let source = Arc::new(workbook());
        let store = Arc::new(InMemorySessionStore::new());
        let audit = InMemoryAuditSink::default();
        let pipeline =
            LookupPipeline::new(source.clone(), &SheetsConfig::default(), &report_config());
        let service =
            ConversationService::new(store.clone(), pipeline, Arc::new(audit.clone()));
        Harness { service, store, source, audit }
    }

    fn user() -> UserId {
        UserId::new("U100")
    }

    async fn state_of(harness: &Harness) -> Option<SessionState> {
        harness.store.get(&user()).await.map(|session| session.state)
    }

    #[tokio::test]
    async fn full_flow_by_free_text_produces_report_and_clears_session() {
        let h = harness();

        assert_eq!(h.service.start(&user(), "c1").await, Reply::PromptRole { retry: false });
        assert_eq!(
            h.service.handle_text(&user(), "Администратор", "c2").await,
            Reply::PromptPeriod { role: Role::Administrator, retry: false }
        );
        assert_eq!(
            h.service.handle_text(&user(), "Настоящий месяц", "c3").await,
            Reply::PromptIdentifier {
                role: Role::Administrator,
                period: Period::Current,
                retry: false
            }
        );

        let reply = h.service.handle_text(&user(), " 13102025-9224 ", "c4").await;
        let Reply::Report(report) = reply else {
            panic!("expected a report, got {reply:?}");
        };
        assert_eq!(report.personnel_number, "9224");
        assert!(report.render().contains("Bonus: 1500\nPlan: 0"));
        assert_eq!(state_of(&h).await, None);
        assert_eq!(h.service.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn restart_mid_flow_returns_to_role_selection() {
        let h = harness();
        h.service.start(&user(), "c1").await;
        h.service.select_role(&user(), "administrator", "c2").await;
        assert_eq!(state_of(&h).await, Some(SessionState::AwaitingPeriod));

        assert_eq!(h.service.start(&user(), "c3").await, Reply::PromptRole { retry: false });
        assert_eq!(h.service.start(&user(), "c4").await, Reply::PromptRole { retry: false });
        let session = h.store.get(&user()).await.expect("session should exist");
        assert_eq!(session.state, SessionState::AwaitingRole);
        assert_eq!(session.role, None);
        assert_eq!(h.service.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn unrecognized_labels_prompt_again_without_advancing() {
        let h = harness();
        h.service.start(&user(), "c1").await;

        assert_eq!(
            h.service.handle_text(&user(), "manager", "c2").await,
            Reply::PromptRole { retry: true }
        );
        assert_eq!(state_of(&h).await, Some(SessionState::AwaitingRole));

        h.service.handle_text(&user(), "sfu", "c3").await;
        assert_eq!(
            h.service.handle_text(&user(), "next year", "c4").await,
            Reply::PromptPeriod { role: Role::FieldStaff, retry: true }
        );
        assert_eq!(state_of(&h).await, Some(SessionState::AwaitingPeriod));
    }

    #[tokio::test]
    async fn malformed_identifier_reprompts_and_keeps_session() {
        let h = harness();
        h.service.start(&user(), "c1").await;
        h.service.select_role(&user(), "admin", "c2").await;
        h.service.select_period(&user(), "current", "c3").await;

        for raw in ["abc", "1110202512450", "11102025-"] {
            assert_eq!(
                h.service.submit_identifier(&user(), raw, "c4").await,
                Reply::PromptIdentifier {
                    role: Role::Administrator,
                    period: Period::Current,
                    retry: true
                }
            );
        }
        assert_eq!(state_of(&h).await, Some(SessionState::AwaitingIdentifier));
        assert_eq!(h.source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn unknown_identity_is_a_single_not_found_reply() {
        let h = harness();
        h.service.start(&user(), "c1").await;
        h.service.select_role(&user(), "admin", "c2").await;
        h.service.select_period(&user(), "current", "c3").await;

        let reply = h.service.submit_identifier(&user(), "13102025-5555", "c4").await;
        assert!(matches!(reply, Reply::NotFound { .. }));
        assert!(!reply.text().contains("Bonus"));
        assert_eq!(state_of(&h).await, None);
    }

    #[tokio::test]
    async fn unreachable_roster_is_retryable_and_keeps_session() {
        let h = harness();
        h.source.remove(&SheetRef::name("Список сотрудников"));
        h.service.start(&user(), "c1").await;
        h.service.select_role(&user(), "admin", "c2").await;
        h.service.select_period(&user(), "current", "c3").await;

        let reply = h.service.submit_identifier(&user(), "13102025-9224", "c4").await;
        assert!(matches!(
            &reply,
            Reply::Failure { class: ErrorClass::TransientFetch, correlation_id, .. }
                if correlation_id == "c4"
        ));
        assert!(reply.text().starts_with("The spreadsheet is temporarily unavailable"));
        assert_eq!(state_of(&h).await, Some(SessionState::AwaitingIdentifier));

        h.source.insert(SheetRef::name("Список сотрудников"), roster());
        let reply = h.service.submit_identifier(&user(), "13102025-9224", "c5").await;
        assert!(matches!(reply, Reply::Report(_)));
    }

    #[tokio::test]
    async fn missing_personnel_column_ends_the_session_as_data_integrity() {
        let h = harness();
        h.source.insert(
            SheetRef::name("Администраторы"),
            SheetTable::from_rows(vec![vec!["October"], vec!["Number", "Bonus"], vec!["9224", "1"]]),
        );
        h.service.start(&user(), "c1").await;
        h.service.select_role(&user(), "admin", "c2").await;
        h.service.select_period(&user(), "current", "c3").await;

        let reply = h.service.submit_identifier(&user(), "13102025-9224", "c4").await;
        assert!(matches!(reply, Reply::Failure { class: ErrorClass::DataIntegrity, .. }));
        assert_eq!(state_of(&h).await, None);
    }

    #[tokio::test]
    async fn lookup_finishing_after_restart_is_superseded() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let source = Arc::new(GatedSheetSource {
            inner: workbook(),
            armed: AtomicBool::new(true),
            entered: entered.clone(),
            release: release.clone(),
        });
        let store = Arc::new(InMemorySessionStore::new());
        let pipeline = LookupPipeline::new(source, &SheetsConfig::default(), &report_config());
        let service = Arc::new(ConversationService::new(
            store.clone(),
            pipeline,
            Arc::new(InMemoryAuditSink::default()),
        ));
        service.start(&user(), "c1").await;
        service.select_role(&user(), "admin", "c2").await;
        service.select_period(&user(), "current", "c3").await;

        let pending = {
            let service = service.clone();
            tokio::spawn(
                async move { service.submit_identifier(&user(), "13102025-9224", "c4").await },
            )
        };
        entered.notified().await;
        assert_eq!(service.start(&user(), "c5").await, Reply::PromptRole { retry: false });
        release.notify_one();

        let reply = pending.await.expect("lookup task should finish");
        assert_eq!(reply, Reply::Superseded);
        let state = store.get(&user()).await.map(|session| session.state);
        assert_eq!(state, Some(SessionState::AwaitingRole));
    }

    #[tokio::test]
    async fn out_of_order_button_is_a_protocol_violation() {
        let h = harness();
        h.service.start(&user(), "c1").await;
        h.service.select_role(&user(), "admin", "c2").await;
        h.service.select_period(&user(), "current", "c3").await;

        assert_eq!(
            h.service.select_role(&user(), "sfu", "c4").await,
            Reply::RestartRequired
        );
        assert_eq!(state_of(&h).await, None);

        let rejected = h
            .audit
            .events()
            .into_iter()
            .filter(|event| event.event_type == "session.transition_rejected")
            .count();
        assert_eq!(rejected, 1);
    }

    #[tokio::test]
    async fn input_without_session_requires_restart() {
        let h = harness();

        assert_eq!(h.service.select_period(&user(), "current", "c1").await, Reply::RestartRequired);
        assert_eq!(
            h.service.submit_identifier(&user(), "13102025-9224", "c2").await,
            Reply::RestartRequired
        );
        assert_eq!(h.service.handle_text(&user(), "hello", "c3").await, Reply::RestartRequired);
        assert_eq!(h.service.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn cancel_removes_the_session_and_is_idempotent() {
        let h = harness();
        h.service.start(&user(), "c1").await;
        h.service.select_role(&user(), "admin", "c2").await;

        assert_eq!(h.service.handle_text(&user(), "cancel", "c3").await, Reply::Cancelled);
        assert_eq!(state_of(&h).await, None);
        assert_eq!(h.service.cancel(&user(), "c4").await, Reply::Cancelled);
    }

    #[tokio::test]
    async fn sessions_are_independent_per_user() {
        let h = harness();
        let other = UserId::new("U200");
        h.service.start(&user(), "c1").await;
        h.service.start(&other, "c2").await;
        h.service.select_role(&user(), "admin", "c3").await;

        assert_eq!(state_of(&h).await, Some(SessionState::AwaitingPeriod));
        let other_state = h.store.get(&other).await.map(|session| session.state);
        assert_eq!(other_state, Some(SessionState::AwaitingRole));
        assert_eq!(h.service.active_sessions().await, 2);
    }

    #[test]
    fn prompts_render_plain_text() {
        assert!(Reply::PromptRole { retry: true }.text().starts_with("That role is not recognized."));
        assert!(Reply::PromptIdentifier {
            role: Role::FieldStaff,
            period: Period::Previous,
            retry: false
        }
        .text()
        .contains("13102025-9224"));
        assert!(Reply::Superseded.is_silent());
        assert!(Reply::Superseded.text().is_empty());
    }
}
