#![forbid(unsafe_code)]

pub mod model;
pub mod validate;

pub use model::{FamilyMember, Gender, Registrant};
pub use validate::{ValidationError, Validator, Violations};

pub mod ids {
    use serde::{Deserialize, Serialize};

    /// Store-assigned identifier of a registrant (`users.id`).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RegistrantId(i64);

    impl RegistrantId {
        pub fn get(self) -> i64 {
            self.0
        }

        pub fn try_new(value: i64) -> Result<Self, RegistrantIdError> {
            if value <= 0 {
                return Err(RegistrantIdError::NotPositive);
            }
            Ok(Self(value))
        }

        pub fn parse(value: &str) -> Result<Self, RegistrantIdError> {
            let raw = value.trim();
            if raw.is_empty() {
                return Err(RegistrantIdError::Empty);
            }
            let value = raw
                .parse::<i64>()
                .map_err(|_| RegistrantIdError::NotNumeric)?;
            Self::try_new(value)
        }
    }

    impl std::fmt::Display for RegistrantId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum RegistrantIdError {
        Empty,
        NotNumeric,
        NotPositive,
    }

    impl RegistrantIdError {
        pub fn message(&self) -> &'static str {
            match self {
                Self::Empty => "registrant id must not be empty",
                Self::NotNumeric => "registrant id must be an integer",
                Self::NotPositive => "registrant id must be positive",
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn registrant_id_parsing() {
            assert_eq!(RegistrantId::parse("").unwrap_err(), RegistrantIdError::Empty);
            assert_eq!(
                RegistrantId::parse("abc").unwrap_err(),
                RegistrantIdError::NotNumeric
            );
            assert_eq!(
                RegistrantId::parse("0").unwrap_err(),
                RegistrantIdError::NotPositive
            );
            assert_eq!(RegistrantId::parse(" 42 ").unwrap().get(), 42);
        }
    }
}
