#![forbid(unsafe_code)]

//! Declarative validation of raw registrant payloads.
//!
//! Evaluation runs in fixed phases: the raw object is read into a typed
//! [`Candidate`](candidate::Candidate), the unconditional rule table runs, the
//! candidate is normalized (dependent fields of inactive sections are cleared),
//! and finally the conditional rule table runs against the normalized candidate.
//! Every applicable rule runs before anything is reported.

mod candidate;
mod rules;

use crate::model::Registrant;
use candidate::Candidate;
use rules::RuleContext;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use time::{Date, OffsetDateTime};

/// Field path used for violations that concern the payload as a whole.
pub const PAYLOAD_FIELD: &str = "payload";

/// Field path → human-readable reasons, ordered by path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Violations(BTreeMap<String, Vec<String>>);

impl Violations {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of offending fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn reasons(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        let reason = reason.into();
        let reasons = self.0.entry(field.into()).or_default();
        if !reasons.contains(&reason) {
            reasons.push(reason);
        }
    }
}

impl std::fmt::Display for Violations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, reasons) in self.iter() {
            for reason in reasons {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                write!(f, "{field}: {reason}")?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid registrant: {violations}")]
pub struct ValidationError {
    violations: Violations,
}

impl ValidationError {
    pub fn new(violations: Violations) -> Self {
        Self { violations }
    }

    pub fn violations(&self) -> &Violations {
        &self.violations
    }

    pub fn into_violations(self) -> Violations {
        self.violations
    }
}

/// Validates and normalizes registrant payloads relative to a reference date
/// (used by the age rule).
#[derive(Clone, Copy, Debug)]
pub struct Validator {
    today: Date,
}

impl Validator {
    pub fn new(today: Date) -> Self {
        Self { today }
    }

    pub fn today_utc() -> Self {
        Self::new(OffsetDateTime::now_utc().date())
    }

    pub fn reference_date(&self) -> Date {
        self.today
    }

    pub fn validate(&self, payload: &Value) -> Result<Registrant, ValidationError> {
        let mut violations = Violations::default();
        let Some(args) = payload.as_object() else {
            violations.push(PAYLOAD_FIELD, "The payload must be an object");
            return Err(ValidationError::new(violations));
        };

        let mut candidate = Candidate::read(args, &mut violations);
        let ctx = RuleContext {
            today: self.today,
            unreadable: violations.clone(),
        };

        rules::apply(rules::FIELD_RULES, &candidate, &ctx, &mut violations);
        rules::apply_family(&candidate, &mut violations);

        candidate.normalize();
        rules::apply(rules::CONDITIONAL_RULES, &candidate, &ctx, &mut violations);

        if !violations.is_empty() {
            return Err(ValidationError::new(violations));
        }

        candidate.into_registrant().ok_or_else(|| {
            violations.push(PAYLOAD_FIELD, "The record is incomplete");
            ValidationError::new(violations)
        })
    }
}
