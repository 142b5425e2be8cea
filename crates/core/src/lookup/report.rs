use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::role::Role;
use crate::lookup::resolver::PeriodRecord;

pub const MISSING_VALUE: &str = "0";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportColumns {
    pub administrator: Vec<String>,
    pub field_staff: Vec<String>,
}

impl ReportColumns {
    pub fn for_role(&self, role: Role) -> &[String] {
        match role {
            Role::Administrator => &self.administrator,
            Role::FieldStaff => &self.field_staff,
        }
    }
}

impl Default for ReportColumns {
    fn default() -> Self {
        Self {
            administrator: owned(&[
                "Кол-во сим-карт",
                "Бонус за UCELL",
                "Кол-во лимитов с коэффом",
                "План по лимитам",
                "Выполнение плана по лимитам",
                "Бонус за лимиты",
                "Кол-во банковских карт",
                "План по банковским картам",
                "Выполнение плана по банковским картам",
                "Бонус за банковским картам",
                "SLA приёмки",
                "Понижающий коэффициент SLA",
                "Ошибочное оформление возвратов",
                "Понижающий коэффициент возвратов",
                "Результат ВЧЛ",
                "ВЧЛ",
                "Бонус за ВЧЛ",
                "Стабильность",
                "Общая сумма бонуса",
                "Бонус + доп. начисления на руки",
                "Гросс итог бонуса",
                "Бонус + доп. начисления в гроссе",
            ]),
            field_staff: owned(&[
                "Кол-во сим-карт",
                "План UCELL",
                "Выполнение плана по UCELL",
                "Бонус за UCELL",
                "Банковские карты факт",
                "План по банковским картам",
                "Выполнение плана по банковским картам",
                "Бонус за банковские карты",
                "Банковские карты",
                "Ошибочные оформления бк",
                "Результат ВЧЛ",
                "ВЧЛ",
                "Бонус за ВЧЛ",
                "Общая сумма бонуса",
                "Бонус + доп. начисления на руки",
                "Гросс итог бонуса",
                "Бонус + доп. начисления в гроссе",
            ]),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLine {
    pub column: String,
    pub value: String,
}

impl ReportLine {
    pub fn render(&self) -> String {
        format!("{}: {}", self.column, self.value)
    }
}

/// Projects a record onto a fixed, ordered column list. Columns outside the
/// list never appear; empty or absent cells render as `0`.
pub fn project(columns: &[String], record: &PeriodRecord) -> Vec<ReportLine> {
    columns
        .iter()
        .map(|column| {
            let value = match record.field(column) {
                Some(value) if !value.trim().is_empty() => value.trim().to_owned(),
                Some(_) => MISSING_VALUE.to_owned(),
                None => {
                    warn!(
                        event_name = "lookup.report.column_missing",
                        sheet = %record.sheet,
                        column = %column,
                        "report column is absent from the sheet"
                    );
                    MISSING_VALUE.to_owned()
                }
            };
            ReportLine { column: column.clone(), value }
        })
        .collect()
}

#[derive(Clone, Debug, Default)]
pub struct ReportFormatter {
    columns: ReportColumns,
}

impl ReportFormatter {
    pub fn new(columns: ReportColumns) -> Self {
        Self { columns }
    }

    pub fn lines(&self, role: Role, record: &PeriodRecord) -> Vec<ReportLine> {
        project(self.columns.for_role(role), record)
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::{project, ReportColumns, ReportFormatter};
    use crate::domain::identifier::PersonnelNumber;
    use crate::domain::role::Role;
    use crate::lookup::resolver::PeriodRecord;
    use crate::sheets::{HeaderMap, SheetRef};

    fn record(header: &[&str], row: &[&str]) -> PeriodRecord {
        let header = HeaderMap::from_cells(&header.iter().map(|cell| cell.to_string()).collect::<Vec<_>>());
        let row: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
        PeriodRecord::from_row(&header, &row, PersonnelNumber("9224".to_owned()), SheetRef::name("test"), 3)
    }

    #[test]
    fn empty_and_absent_columns_render_as_zero() {
        let record = record(&["Personnel", "A"], &["9224", ""]);
        let lines: Vec<String> =
            project(&["A".to_owned(), "B".to_owned()], &record).iter().map(|line| line.render()).collect();

        assert_eq!(lines, vec!["A: 0", "B: 0"]);
    }

    #[test]
    fn projection_keeps_configured_order_and_drops_extra_columns() {
        let record = record(&["Personnel", "Extra", "B", "A"], &["9224", "secret", " 20 ", "10"]);
        let lines: Vec<String> =
            project(&["A".to_owned(), "B".to_owned()], &record).iter().map(|line| line.render()).collect();

        assert_eq!(lines, vec!["A: 10", "B: 20"]);
    }

    #[test]
    fn short_rows_fill_trailing_columns_with_zero() {
        let record = record(&["Personnel", "A", "B"], &["9224", "5"]);
        let lines: Vec<String> =
            project(&["B".to_owned(), "A".to_owned()], &record).iter().map(|line| line.render()).collect();

        assert_eq!(lines, vec!["B: 0", "A: 5"]);
    }

    #[test]
    fn formatter_selects_columns_by_role() {
        let columns = ReportColumns {
            administrator: vec!["A".to_owned()],
            field_staff: vec!["B".to_owned()],
        };
        let formatter = ReportFormatter::new(columns);
        let record = record(&["Personnel", "A", "B"], &["9224", "1", "2"]);

        assert_eq!(formatter.lines(Role::Administrator, &record)[0].render(), "A: 1");
        assert_eq!(formatter.lines(Role::FieldStaff, &record)[0].render(), "B: 2");
        assert_eq!(ReportColumns::default().for_role(Role::FieldStaff).len(), 17);
        assert_eq!(ReportColumns::default().for_role(Role::Administrator).len(), 22);
    }
}
