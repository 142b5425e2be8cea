use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    FieldStaff,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Current,
    Previous,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Administrator, Role::FieldStaff];

    /// Machine value carried by buttons and CLI arguments.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::FieldStaff => "field_staff",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Administrator => "Administrator",
            Self::FieldStaff => "Field Staff",
        }
    }

    /// Accepts machine values, short aliases and the workbook's own labels.
    pub fn from_label(label: &str) -> Option<Self> {
        match normalize_label(label).as_str() {
            "administrator" | "admin" | "администратор" => Some(Self::Administrator),
            "field_staff" | "field staff" | "sfu" | "сфу" => Some(Self::FieldStaff),
            _ => None,
        }
    }
}

impl Period {
    pub const ALL: [Period; 2] = [Period::Current, Period::Previous];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Previous => "previous",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Current => "Current month",
            Self::Previous => "Previous payout",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match normalize_label(label).as_str() {
            "current" | "current month" | "настоящий месяц" => Some(Self::Current),
            "previous" | "prev" | "previous payout" | "предыдущая зарплата" => {
                Some(Self::Previous)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{Period, Role};

    #[test]
    fn role_labels_accept_machine_values_and_workbook_labels() {
        assert_eq!(Role::from_label("administrator"), Some(Role::Administrator));
        assert_eq!(Role::from_label(" Admin "), Some(Role::Administrator));
        assert_eq!(Role::from_label("Администратор"), Some(Role::Administrator));
        assert_eq!(Role::from_label("СФУ"), Some(Role::FieldStaff));
        assert_eq!(Role::from_label("field_staff"), Some(Role::FieldStaff));
        assert_eq!(Role::from_label("manager"), None);
        assert_eq!(Role::from_label(""), None);
    }

    #[test]
    fn period_labels_collapse_whitespace_and_case() {
        assert_eq!(Period::from_label("CURRENT"), Some(Period::Current));
        assert_eq!(Period::from_label("Настоящий   месяц"), Some(Period::Current));
        assert_eq!(Period::from_label("prev"), Some(Period::Previous));
        assert_eq!(Period::from_label("Предыдущая зарплата"), Some(Period::Previous));
        assert_eq!(Period::from_label("next"), None);
    }

    #[test]
    fn machine_values_round_trip_through_labels() {
        for role in Role::ALL {
            assert_eq!(Role::from_label(role.as_str()), Some(role));
        }
        for period in Period::ALL {
            assert_eq!(Period::from_label(period.as_str()), Some(period));
        }
    }
}
