pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod lookup;
pub mod sheets;

pub use audit::{AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use domain::identifier::{HireDate, Identifier, PersonnelNumber};
pub use domain::role::{Period, Role};
pub use domain::session::{Session, UserId};
pub use errors::{ApplicationError, DomainError, ErrorClass, InterfaceError};
pub use flows::{Conversation, ConversationService, InMemorySessionStore, Reply, SessionStore};
pub use lookup::{LookupError, LookupPipeline, LookupReport, LookupRequest};
pub use sheets::{SheetFetchError, SheetRef, SheetSource, SheetTable};
