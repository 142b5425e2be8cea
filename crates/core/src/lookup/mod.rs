//! Two-stage record lookup: roster identity check, then period-sheet retrieval
//! and projection into a report.

pub mod report;
pub mod resolver;
pub mod roster;

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::{ReportConfig, SheetsConfig};
use crate::domain::identifier::{Identifier, IDENTIFIER_EXAMPLE};
use crate::domain::role::{Period, Role};
use crate::errors::ErrorClass;
use crate::sheets::{SheetFetchError, SheetSource};

pub use report::{project, ReportColumns, ReportFormatter, ReportLine};
pub use resolver::{PeriodRecord, PeriodSheet, RecordResolver, SheetRouting};
pub use roster::{normalize_roster_date, IdentityVerifier, RosterEntry, RosterLayout};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("identifier `{0}` does not match DDMMYYYY-NNNN (for example {IDENTIFIER_EXAMPLE})")]
    MalformedIdentifier(String),
    #[error("roster sheet `{sheet}` is unavailable: {source}")]
    RosterUnavailable {
        sheet: String,
        #[source]
        source: SheetFetchError,
    },
    #[error("personnel number {personnel_number} with hire date {hire_date} is not on the roster")]
    IdentityNotFound { personnel_number: String, hire_date: String },
    #[error("period sheet `{sheet}` is unavailable: {source}")]
    SheetUnavailable {
        sheet: String,
        #[source]
        source: SheetFetchError,
    },
    #[error("sheet `{sheet}` has no header row at index {header_row}")]
    MissingHeaderRow { sheet: String, header_row: usize },
    #[error("sheet `{sheet}` has no `{column}` column")]
    MissingColumn { sheet: String, column: String },
    #[error("no data for personnel number {personnel_number} on sheet `{sheet}`")]
    RecordNotFound { sheet: String, personnel_number: String },
}

impl LookupError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MalformedIdentifier(_) => ErrorClass::MalformedInput,
            Self::RosterUnavailable { .. } | Self::SheetUnavailable { .. } => {
                ErrorClass::TransientFetch
            }
            Self::MissingHeaderRow { .. } | Self::MissingColumn { .. } => ErrorClass::DataIntegrity,
            Self::IdentityNotFound { .. } | Self::RecordNotFound { .. } => ErrorClass::NotFound,
        }
    }

    /// Message safe to show to the person who asked.
    pub fn user_message(&self) -> String {
        match self {
            Self::MalformedIdentifier(_) => format!(
                "The identifier must look like DDMMYYYY-NNNN, for example {IDENTIFIER_EXAMPLE}."
            ),
            Self::IdentityNotFound { .. } => format!(
                "This identifier was not found in the employee roster. Check the hire date and personnel number (format DDMMYYYY-NNNN, for example {IDENTIFIER_EXAMPLE})."
            ),
            Self::RecordNotFound { personnel_number, sheet } => {
                format!("No data for personnel number {personnel_number} on sheet `{sheet}`.")
            }
            Self::RosterUnavailable { .. } | Self::SheetUnavailable { .. } => {
                "The spreadsheet is temporarily unavailable. Please send your identifier again in a moment."
                    .to_owned()
            }
            Self::MissingHeaderRow { .. } | Self::MissingColumn { .. } => {
                "The spreadsheet layout does not match the bot configuration. Please contact the sheet owner."
                    .to_owned()
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupRequest {
    pub role: Role,
    pub period: Period,
    pub identifier: Identifier,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LookupReport {
    pub role: Role,
    pub period: Period,
    pub personnel_number: String,
    pub hire_date: String,
    pub sheet: String,
    pub lines: Vec<ReportLine>,
    pub elapsed_ms: Option<u64>,
}

impl LookupReport {
    pub fn render(&self) -> String {
        let mut output = vec![
            format!(
                "Report for {} (personnel number {}, period: {})",
                self.role, self.personnel_number, self.period
            ),
            format!("Hire date: {}", self.hire_date),
            String::new(),
        ];
        output.extend(self.lines.iter().map(ReportLine::render));
        if let Some(elapsed_ms) = self.elapsed_ms {
            output.push(String::new());
            output.push(format!("Lookup time: {elapsed_ms} ms"));
        }
        output.join("\n")
    }
}

/// Parse -> verify -> resolve -> format. Every run reads the sheets afresh.
pub struct LookupPipeline {
    source: Arc<dyn SheetSource>,
    verifier: IdentityVerifier,
    resolver: RecordResolver,
    formatter: ReportFormatter,
    show_elapsed: bool,
}

impl LookupPipeline {
    pub fn new(source: Arc<dyn SheetSource>, sheets: &SheetsConfig, report: &ReportConfig) -> Self {
        Self {
            source,
            verifier: IdentityVerifier::new(sheets.roster.clone()),
            resolver: RecordResolver::new(sheets.routing.clone(), sheets.personnel_header.clone()),
            formatter: ReportFormatter::new(report.columns.clone()),
            show_elapsed: report.show_elapsed,
        }
    }

    pub fn parse(raw: &str) -> Result<Identifier, LookupError> {
        Identifier::parse(raw).ok_or_else(|| LookupError::MalformedIdentifier(raw.trim().to_owned()))
    }

    pub async fn run_raw(
        &self,
        role: Role,
        period: Period,
        raw_identifier: &str,
    ) -> Result<LookupReport, LookupError> {
        let identifier = Self::parse(raw_identifier)?;
        self.run(&LookupRequest { role, period, identifier }).await
    }

    pub async fn run(&self, request: &LookupRequest) -> Result<LookupReport, LookupError> {
        let started = Instant::now();
        let identifier = &request.identifier;

        let entry = self.verifier.verify(self.source.as_ref(), identifier).await?;
        info!(
            event_name = "lookup.identity.verified",
            personnel_number = %entry.personnel_number,
            roster_row = entry.row_number,
            "identity verified against roster"
        );

        let record = self
            .resolver
            .resolve(self.source.as_ref(), request.role, request.period, &identifier.personnel_number)
            .await?;
        let lines = self.formatter.lines(request.role, &record);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            event_name = "lookup.record.resolved",
            personnel_number = %record.personnel_number,
            sheet = %record.sheet,
            sheet_row = record.row_number,
            elapsed_ms,
            "period record resolved"
        );

        Ok(LookupReport {
            role: request.role,
            period: request.period,
            personnel_number: identifier.personnel_number.to_string(),
            hire_date: identifier.hire_date.to_string(),
            sheet: record.sheet.to_string(),
            lines,
            elapsed_ms: self.show_elapsed.then_some(elapsed_ms),
        })
    }
}
