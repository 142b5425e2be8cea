use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{flows::FlowTransitionError, lookup::LookupError};

/// How a failure is reported to the user and whether the session survives it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    MalformedInput,
    ProtocolViolation,
    TransientFetch,
    DataIntegrity,
    NotFound,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedInput => "malformed_input",
            Self::ProtocolViolation => "protocol_violation",
            Self::TransientFetch => "transient_fetch",
            Self::DataIntegrity => "data_integrity",
            Self::NotFound => "not_found",
        }
    }

    /// Whether the session keeps waiting for another identifier after this failure.
    pub fn keeps_session(&self) -> bool {
        matches!(self, Self::MalformedInput | Self::TransientFetch)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl ApplicationError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Domain(DomainError::FlowTransition(_)) => ErrorClass::ProtocolViolation,
            Self::Domain(DomainError::MalformedInput(_)) => ErrorClass::MalformedInput,
            Self::Integration(_) => ErrorClass::TransientFetch,
            Self::Configuration(_) => ErrorClass::DataIntegrity,
            Self::NotFound(_) => ErrorClass::NotFound,
        }
    }
}

impl From<LookupError> for ApplicationError {
    fn from(value: LookupError) -> Self {
        match value.class() {
            ErrorClass::MalformedInput => {
                Self::Domain(DomainError::MalformedInput(value.to_string()))
            }
            ErrorClass::TransientFetch => Self::Integration(value.to_string()),
            ErrorClass::NotFound => Self::NotFound(value.to_string()),
            ErrorClass::DataIntegrity | ErrorClass::ProtocolViolation => {
                Self::Configuration(value.to_string())
            }
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "No matching record was found.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(DomainError::FlowTransition(_))
            | ApplicationError::Domain(DomainError::MalformedInput(_)) => Self::BadRequest {
                message: "domain validation failed".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::NotFound(message) => {
                Self::NotFound { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, ErrorClass, InterfaceError};
    use crate::flows::states::{SessionEvent, SessionState};
    use crate::flows::FlowTransitionError;
    use crate::lookup::LookupError;
    use crate::sheets::SheetFetchError;

    #[test]
    fn flow_transition_error_is_a_protocol_violation() {
        let error = ApplicationError::from(DomainError::from(
            FlowTransitionError::InvalidTransition {
                state: SessionState::AwaitingIdentifier,
                event: SessionEvent::RoleChosen,
            },
        ));

        assert_eq!(error.class(), ErrorClass::ProtocolViolation);
        let interface = error.into_interface("req-1");
        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref correlation_id, .. } if correlation_id == "req-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn lookup_errors_map_onto_application_layers() {
        let transient = ApplicationError::from(LookupError::RosterUnavailable {
            sheet: "Список сотрудников".to_owned(),
            source: SheetFetchError::Timeout { sheet: "Список сотрудников".to_owned() },
        });
        assert!(matches!(transient, ApplicationError::Integration(_)));
        assert_eq!(transient.class(), ErrorClass::TransientFetch);

        let missing = ApplicationError::from(LookupError::RecordNotFound {
            sheet: "СФУ".to_owned(),
            personnel_number: "9224".to_owned(),
        });
        assert_eq!(missing.class(), ErrorClass::NotFound);

        let schema = ApplicationError::from(LookupError::MissingColumn {
            sheet: "СФУ".to_owned(),
            column: "Табельный номер".to_owned(),
        });
        assert_eq!(schema.class(), ErrorClass::DataIntegrity);

        let malformed = ApplicationError::from(LookupError::MalformedIdentifier("abc".to_owned()));
        assert_eq!(malformed.class(), ErrorClass::MalformedInput);
    }

    #[test]
    fn integration_error_maps_to_service_unavailable() {
        let interface =
            ApplicationError::Integration("sheet timed out".to_owned()).into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(interface.correlation_id(), "req-3");
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface = ApplicationError::Configuration("missing personnel column".to_owned())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn only_retryable_classes_keep_the_session() {
        assert!(ErrorClass::TransientFetch.keeps_session());
        assert!(ErrorClass::MalformedInput.keeps_session());
        assert!(!ErrorClass::NotFound.keeps_session());
        assert!(!ErrorClass::DataIntegrity.keeps_session());
        assert!(!ErrorClass::ProtocolViolation.keeps_session());
    }
}
