use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::identifier::{Identifier, PersonnelNumber};
use crate::lookup::LookupError;
use crate::sheets::{strip_whitespace, SheetRef, SheetSource, SheetTable};

pub const DEFAULT_ROSTER_SHEET: &str = "Список сотрудников";
const CANONICAL_DATE_FORMAT: &str = "%d.%m.%Y";
/// Format, field separator, position of the year field and its digit count.
/// Four-digit years are tried before two-digit ones.
const ROSTER_DATE_FORMATS: [(&str, char, usize, usize); 4] = [
    ("%d.%m.%Y", '.', 2, 4),
    ("%Y-%m-%d", '-', 0, 4),
    ("%d/%m/%Y", '/', 2, 4),
    ("%d.%m.%y", '.', 2, 2),
];

/// Where the roster keeps its identity columns. Positions are 0-based.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterLayout {
    pub sheet: SheetRef,
    pub header_row: usize,
    pub personnel_column: usize,
    pub hire_date_column: usize,
}

impl Default for RosterLayout {
    fn default() -> Self {
        Self {
            sheet: SheetRef::name(DEFAULT_ROSTER_SHEET),
            header_row: 0,
            personnel_column: 3,
            hire_date_column: 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub personnel_number: PersonnelNumber,
    pub hire_date: String,
    pub row_number: usize,
}

#[derive(Clone, Debug, Default)]
pub struct IdentityVerifier {
    layout: RosterLayout,
}

impl IdentityVerifier {
    pub fn new(layout: RosterLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &RosterLayout {
        &self.layout
    }

    /// Fetches the roster and checks the identifier against it. An unreachable
    /// roster never verifies anyone.
    pub async fn verify(
        &self,
        source: &dyn SheetSource,
        identifier: &Identifier,
    ) -> Result<RosterEntry, LookupError> {
        let table = source.fetch(&self.layout.sheet).await.map_err(|source| {
            LookupError::RosterUnavailable { sheet: self.layout.sheet.to_string(), source }
        })?;

        self.find(&table, identifier).ok_or_else(|| LookupError::IdentityNotFound {
            personnel_number: identifier.personnel_number.to_string(),
            hire_date: identifier.hire_date.to_string(),
        })
    }

    /// First roster row whose personnel number and normalized hire date both match.
    pub fn find(&self, table: &SheetTable, identifier: &Identifier) -> Option<RosterEntry> {
        let expected_number = identifier.personnel_number.as_str();
        let expected_date = identifier.hire_date.to_string();

        let entry = table.rows_below(self.layout.header_row).find_map(|(row_number, row)| {
            let number = row.get(self.layout.personnel_column).map(|cell| strip_whitespace(cell))?;
            if number != expected_number {
                return None;
            }
            let hire_date = normalize_roster_date(
                row.get(self.layout.hire_date_column).map(String::as_str).unwrap_or_default(),
            );
            (hire_date == expected_date).then(|| RosterEntry {
                personnel_number: PersonnelNumber(number),
                hire_date,
                row_number,
            })
        });

        debug!(
            event_name = "lookup.roster.scanned",
            rows = table.len(),
            matched = entry.is_some(),
            "roster scan finished"
        );
        entry
    }
}

/// Renders a roster date cell as `DD.MM.YYYY`, or returns the trimmed cell
/// unchanged when no known shape applies.
pub fn normalize_roster_date(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let first_token = trimmed.split_whitespace().next().unwrap_or(trimmed);
    for candidate in [trimmed, first_token] {
        if let Some(date) = parse_known_shape(candidate) {
            return date.format(CANONICAL_DATE_FORMAT).to_string();
        }
    }

    if let Some(digits) = first_eight_digit_run(trimmed) {
        return format!("{}.{}.{}", &digits[0..2], &digits[2..4], &digits[4..8]);
    }

    trimmed.to_owned()
}

fn parse_known_shape(candidate: &str) -> Option<NaiveDate> {
    ROSTER_DATE_FORMATS
        .iter()
        .filter(|(_, separator, year_field, year_digits)| {
            let year = candidate.split(*separator).nth(*year_field);
            year.is_some_and(|year| year.len() == *year_digits)
        })
        .find_map(|(format, ..)| NaiveDate::parse_from_str(candidate, format).ok())
}

fn first_eight_digit_run(value: &str) -> Option<&str> {
    let bytes = value.as_bytes();
    let mut run_start = None;
    for (index, byte) in bytes.iter().enumerate() {
        if byte.is_ascii_digit() {
            let start = *run_start.get_or_insert(index);
            if index + 1 - start == 8 {
                return Some(&value[start..=index]);
            }
        } else {
            run_start = None;
        }
    }
    None
}
