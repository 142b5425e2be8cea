use std::fmt;

use serde::{Deserialize, Serialize};

pub const IDENTIFIER_EXAMPLE: &str = "13102025-9224";
const DATE_DIGITS: usize = 8;
const MIN_PERSONNEL_DIGITS: usize = 4;
const MAX_PERSONNEL_DIGITS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HireDate {
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

impl fmt::Display for HireDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}.{:04}", self.day, self.month, self.year)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonnelNumber(pub String);

impl PersonnelNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonnelNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Employee identifier typed by the user: `DDMMYYYY-NNNN` or `DDMMYYYY-NNNNN`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub hire_date: HireDate,
    pub personnel_number: PersonnelNumber,
}

impl Identifier {
    /// Returns `None` for anything that is not exactly the identifier shape.
    /// Only the shape is checked; impossible dates never match a roster row.
    pub fn parse(input: &str) -> Option<Self> {
        let (date, number) = input.trim().split_once('-')?;

        if date.len() != DATE_DIGITS || !date.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        if !(MIN_PERSONNEL_DIGITS..=MAX_PERSONNEL_DIGITS).contains(&number.len())
            || !number.bytes().all(|byte| byte.is_ascii_digit())
        {
            return None;
        }

        let hire_date = HireDate {
            day: date[0..2].parse().ok()?,
            month: date[2..4].parse().ok()?,
            year: date[4..8].parse().ok()?,
        };

        Some(Self { hire_date, personnel_number: PersonnelNumber(number.to_owned()) })
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}{:02}{:04}-{}",
            self.hire_date.day, self.hire_date.month, self.hire_date.year, self.personnel_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{HireDate, Identifier};

    #[test]
    fn well_formed_identifier_yields_date_and_number() {
        let identifier = Identifier::parse("13102025-9224").expect("identifier should parse");

        assert_eq!(identifier.hire_date.to_string(), "13.10.2025");
        assert_eq!(identifier.personnel_number.as_str(), "9224");
        assert_eq!(identifier.hire_date, HireDate { day: 13, month: 10, year: 2025 });
    }

    #[test]
    fn five_digit_personnel_numbers_are_accepted() {
        let identifier = Identifier::parse(" 01022024-12450\n").expect("identifier should parse");

        assert_eq!(identifier.hire_date.to_string(), "01.02.2024");
        assert_eq!(identifier.personnel_number.as_str(), "12450");
        assert_eq!(identifier.to_string(), "01022024-12450");
    }

    #[test]
    fn malformed_identifiers_yield_no_match() {
        for input in [
            "abc",
            "",
            "1110202512450",
            "11102025-",
            "-9224",
            "1110202-9224",
            "111020255-9224",
            "11102025-922",
            "11102025-922456",
            "11102025 - 9224",
            "11.10.2025-9224",
            "11102025-92a4",
            "11102025-9224-1",
            "١١١٠٢٠٢٥-9224",
        ] {
            assert_eq!(Identifier::parse(input), None, "`{input}` should not parse");
        }
    }
}
