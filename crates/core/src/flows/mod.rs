pub mod conversation;
pub mod engine;
pub mod states;
pub mod store;

pub use conversation::{Conversation, ConversationService, Reply};
pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, SalaryLookupFlow};
pub use states::{SessionAction, SessionEvent, SessionState, TransitionOutcome};
pub use store::{InMemorySessionStore, SessionStore};
