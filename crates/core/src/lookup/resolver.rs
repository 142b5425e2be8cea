use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::identifier::PersonnelNumber;
use crate::domain::role::{Period, Role};
use crate::lookup::LookupError;
use crate::sheets::{strip_whitespace, HeaderMap, SheetRef, SheetSource, SheetTable};

pub const DEFAULT_PERSONNEL_HEADER: &str = "Табельный номер";
const DEFAULT_PERIOD_HEADER_ROW: usize = 1;

/// A period sheet and the 0-based index of its header row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSheet {
    pub sheet: SheetRef,
    pub header_row: usize,
}

impl PeriodSheet {
    pub fn named(name: &str) -> Self {
        Self { sheet: SheetRef::name(name), header_row: DEFAULT_PERIOD_HEADER_ROW }
    }
}

/// Static (role, period) -> sheet table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRouting {
    pub administrator_current: PeriodSheet,
    pub administrator_previous: PeriodSheet,
    pub field_staff_current: PeriodSheet,
    pub field_staff_previous: PeriodSheet,
}

impl Default for SheetRouting {
    fn default() -> Self {
        Self {
            administrator_current: PeriodSheet::named("Администраторы"),
            administrator_previous: PeriodSheet::named("Администраторы_prev."),
            field_staff_current: PeriodSheet::named("СФУ"),
            field_staff_previous: PeriodSheet::named("СФУ_prev."),
        }
    }
}

impl SheetRouting {
    pub fn sheet_for(&self, role: Role, period: Period) -> &PeriodSheet {
        match (role, period) {
            (Role::Administrator, Period::Current) => &self.administrator_current,
            (Role::Administrator, Period::Previous) => &self.administrator_previous,
            (Role::FieldStaff, Period::Current) => &self.field_staff_current,
            (Role::FieldStaff, Period::Previous) => &self.field_staff_previous,
        }
    }

    pub fn sheet_for_mut(&mut self, role: Role, period: Period) -> &mut PeriodSheet {
        match (role, period) {
            (Role::Administrator, Period::Current) => &mut self.administrator_current,
            (Role::Administrator, Period::Previous) => &mut self.administrator_previous,
            (Role::FieldStaff, Period::Current) => &mut self.field_staff_current,
            (Role::FieldStaff, Period::Previous) => &mut self.field_staff_previous,
        }
    }
}

/// A period-sheet row addressed by header name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeriodRecord {
    pub personnel_number: PersonnelNumber,
    pub sheet: SheetRef,
    pub row_number: usize,
    fields: HashMap<String, String>,
}

impl PeriodRecord {
    pub fn from_row(
        header: &HeaderMap,
        row: &[String],
        personnel_number: PersonnelNumber,
        sheet: SheetRef,
        row_number: usize,
    ) -> Self {
        let fields = header
            .names()
            .filter_map(|name| {
                let position = header.position(name)?;
                let value = row.get(position).map(|cell| cell.trim().to_owned()).unwrap_or_default();
                Some((name.to_owned(), value))
            })
            .collect();
        Self { personnel_number, sheet, row_number, fields }
    }

    /// `None` when the column does not exist in the sheet at all.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name.trim()).map(String::as_str)
    }
}

#[derive(Clone, Debug)]
pub struct RecordResolver {
    routing: SheetRouting,
    personnel_header: String,
}

impl Default for RecordResolver {
    fn default() -> Self {
        Self::new(SheetRouting::default(), DEFAULT_PERSONNEL_HEADER)
    }
}

impl RecordResolver {
    pub fn new(routing: SheetRouting, personnel_header: impl Into<String>) -> Self {
        Self { routing, personnel_header: personnel_header.into() }
    }

    pub fn routing(&self) -> &SheetRouting {
        &self.routing
    }

    pub async fn resolve(
        &self,
        source: &dyn SheetSource,
        role: Role,
        period: Period,
        personnel_number: &PersonnelNumber,
    ) -> Result<PeriodRecord, LookupError> {
        let target = self.routing.sheet_for(role, period);
        let table = source.fetch(&target.sheet).await.map_err(|source| {
            LookupError::SheetUnavailable { sheet: target.sheet.to_string(), source }
        })?;
        self.find(target, &table, personnel_number)
    }

    /// First row below the header whose personnel cell matches; later duplicates are ignored.
    pub fn find(
        &self,
        target: &PeriodSheet,
        table: &SheetTable,
        personnel_number: &PersonnelNumber,
    ) -> Result<PeriodRecord, LookupError> {
        let header = table.header(target.header_row).ok_or_else(|| {
            LookupError::MissingHeaderRow {
                sheet: target.sheet.to_string(),
                header_row: target.header_row,
            }
        })?;
        let column = header.position(&self.personnel_header).ok_or_else(|| {
            LookupError::MissingColumn {
                sheet: target.sheet.to_string(),
                column: self.personnel_header.clone(),
            }
        })?;

        let found = table.rows_below(target.header_row).find(|(_, row)| {
            row.get(column).is_some_and(|cell| strip_whitespace(cell) == personnel_number.as_str())
        });

        debug!(
            event_name = "lookup.period_sheet.scanned",
            sheet = %target.sheet,
            rows = table.len(),
            matched = found.is_some(),
            "period sheet scan finished"
        );

        let (row_number, row) = found.ok_or_else(|| LookupError::RecordNotFound {
            sheet: target.sheet.to_string(),
            personnel_number: personnel_number.to_string(),
        })?;

        Ok(PeriodRecord::from_row(
            &header,
            row,
            personnel_number.clone(),
            target.sheet.clone(),
            row_number,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{PeriodSheet, RecordResolver, SheetRouting};
    use crate::domain::identifier::PersonnelNumber;
    use crate::domain::role::{Period, Role};
    use crate::lookup::LookupError;
    use crate::sheets::{InMemorySheetSource, SheetRef, SheetTable};

    fn number(value: &str) -> PersonnelNumber {
        PersonnelNumber(value.to_owned())
    }

    fn admin_sheet() -> SheetTable {
        SheetTable::from_rows(vec![
            vec!["October payout", "", ""],
            vec!["Табельный номер", "Bonus", "Plan"],
            vec!["9 224", "1500", "80%"],
            vec!["9224", "9999", "1%"],
            vec!["12450", "", "100%"],
        ])
    }

    #[test]
    fn routing_covers_every_role_and_period() {
        let routing = SheetRouting::default();
        let mut sheets = Vec::new();
        for role in Role::ALL {
            for period in Period::ALL {
                sheets.push(routing.sheet_for(role, period).sheet.clone());
            }
        }
        sheets.sort_by_key(ToString::to_string);
        sheets.dedup();
        assert_eq!(sheets.len(), 4);
    }

    #[test]
    fn first_matching_row_wins_when_numbers_repeat() {
        let resolver = RecordResolver::default();
        let record = resolver
            .find(&PeriodSheet::named("Администраторы"), &admin_sheet(), &number("9224"))
            .expect("record should resolve");

        assert_eq!(record.row_number, 3);
        assert_eq!(record.field("Bonus"), Some("1500"));
        assert_eq!(record.field("Plan"), Some("80%"));
        assert_eq!(record.field("Missing"), None);
    }

    #[test]
    fn missing_personnel_column_is_a_schema_error() {
        let resolver = RecordResolver::default();
        let target = PeriodSheet { sheet: SheetRef::name("Администраторы"), header_row: 0 };

        let error = resolver
            .find(&target, &admin_sheet(), &number("9224"))
            .expect_err("first row is not the header");
        assert!(matches!(error, LookupError::MissingColumn { ref column, .. } if column == "Табельный номер"));
    }

    #[test]
    fn missing_header_row_is_a_schema_error() {
        let resolver = RecordResolver::default();
        let table = SheetTable::from_rows(vec![vec!["only one row"]]);

        let error = resolver
            .find(&PeriodSheet::named("СФУ"), &table, &number("9224"))
            .expect_err("header row is out of range");
        assert!(matches!(error, LookupError::MissingHeaderRow { header_row: 1, .. }));
    }

    #[test]
    fn unknown_number_is_not_found() {
        let resolver = RecordResolver::default();
        let error = resolver
            .find(&PeriodSheet::named("Администраторы"), &admin_sheet(), &number("7777"))
            .expect_err("number is absent");
        assert!(matches!(error, LookupError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn resolve_fetches_the_routed_sheet_each_time() {
        let resolver = RecordResolver::default();
        let source = InMemorySheetSource::new()
            .with_table(SheetRef::name("Администраторы_prev."), admin_sheet());

        for _ in 0..2 {
            let record = resolver
                .resolve(&source, Role::Administrator, Period::Previous, &number("12450"))
                .await
                .expect("record should resolve");
            assert_eq!(record.field("Bonus"), Some(""));
        }
        assert_eq!(source.fetch_count(), 2);

        let error = resolver
            .resolve(&source, Role::FieldStaff, Period::Current, &number("12450"))
            .await
            .expect_err("field staff sheet is not loaded");
        assert!(matches!(error, LookupError::SheetUnavailable { .. }));
    }
}
