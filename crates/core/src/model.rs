#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Date;

pub const CI_DIGITS: usize = 10;
pub const RUC_DIGITS: usize = 13;
pub const ADULT_AGE_YEARS: i32 = 18;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

pub fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(value))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    pub name: String,
    pub last_name: String,
    pub ci: String,
}

/// A validated census record. Conditional fields are `None` whenever their
/// controlling flag is off; worker counts are fully populated whenever
/// `has_workers` is on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registrant {
    pub name: String,
    pub last_name: String,
    pub ci: String,
    #[serde(with = "iso_date")]
    pub date_of_birth: Date,
    pub has_ruc: bool,
    pub ruc_number: Option<String>,
    pub gender: Gender,
    pub has_farm: bool,
    pub farm_ha: Option<f64>,
    pub farm_name: Option<String>,
    pub crops: Vec<String>,
    pub has_workers: bool,
    pub total_workers: Option<u32>,
    pub men_workers: Option<u32>,
    pub woman_workers: Option<u32>,
    pub over18_workers: Option<u32>,
    pub under18_workers: Option<u32>,
    pub minor_workers_occupation: Option<String>,
    pub has_pregnant_workers: bool,
    pub pregnant_workers: Option<u32>,
    pub pregnant_workers_occupation: Option<String>,
    pub family: Vec<FamilyMember>,
}

impl Registrant {
    /// Renders the record back into the camelCase payload shape accepted by
    /// [`crate::Validator::validate`].
    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn date_of_birth_iso(&self) -> String {
        format_iso_date(self.date_of_birth)
    }
}

pub fn format_iso_date(date: Date) -> String {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    date.format(&format)
        .unwrap_or_else(|_| date.to_string())
}

pub fn parse_iso_date(value: &str) -> Option<Date> {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(value.trim(), &format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn gender_parse_is_case_insensitive() {
        assert_eq!(Gender::parse(" Female "), Some(Gender::Female));
        assert_eq!(Gender::parse("OTHER"), Some(Gender::Other));
        assert_eq!(Gender::parse("unknown"), None);
    }

    #[test]
    fn digit_strings() {
        assert!(is_digits("0102030405", CI_DIGITS));
        assert!(!is_digits("010203040", CI_DIGITS));
        assert!(!is_digits("01020304a5", CI_DIGITS));
        assert!(is_digits("0102030405001", RUC_DIGITS));
    }

    #[test]
    fn iso_dates_round_trip_through_text() {
        let day = date!(1984 - 02 - 29);
        assert_eq!(format_iso_date(day), "1984-02-29");
        assert_eq!(parse_iso_date("1984-02-29"), Some(day));
        assert_eq!(parse_iso_date("1984-02-30"), None);
    }
}
