#![forbid(unsafe_code)]

use super::Violations;
use crate::model::{FamilyMember, Gender, Registrant, parse_iso_date};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};

/// Typed but not yet validated view of a raw payload. Every field is optional so
/// that missing and malformed input can be reported per field.
#[derive(Clone, Debug, Default)]
pub(super) struct Candidate {
    pub(super) name: Option<String>,
    pub(super) last_name: Option<String>,
    pub(super) ci: Option<String>,
    pub(super) date_of_birth: Option<Date>,
    pub(super) has_ruc: Option<bool>,
    pub(super) ruc_number: Option<String>,
    pub(super) gender: Option<Gender>,
    pub(super) has_farm: Option<bool>,
    pub(super) farm_ha: Option<f64>,
    pub(super) farm_name: Option<String>,
    pub(super) crops: Vec<String>,
    pub(super) has_workers: Option<bool>,
    pub(super) total_workers: Option<u32>,
    pub(super) men_workers: Option<u32>,
    pub(super) woman_workers: Option<u32>,
    pub(super) over18_workers: Option<u32>,
    pub(super) under18_workers: Option<u32>,
    pub(super) minor_workers_occupation: Option<String>,
    pub(super) has_pregnant_workers: Option<bool>,
    pub(super) pregnant_workers: Option<u32>,
    pub(super) pregnant_workers_occupation: Option<String>,
    pub(super) family: Option<Vec<CandidateMember>>,
}

#[derive(Clone, Debug, Default)]
pub(super) struct CandidateMember {
    pub(super) name: Option<String>,
    pub(super) last_name: Option<String>,
    pub(super) ci: Option<String>,
}

impl Candidate {
    pub(super) fn read(args: &Map<String, Value>, violations: &mut Violations) -> Self {
        let mut reader = Reader {
            args,
            prefix: String::new(),
            violations,
        };
        Self {
            name: reader.string("name"),
            last_name: reader.string("lastName"),
            ci: reader.string("ci"),
            date_of_birth: reader.date("dateOfBirth"),
            has_ruc: reader.boolean("hasRuc"),
            ruc_number: reader.string("rucNumber"),
            gender: reader.gender("gender"),
            has_farm: reader.boolean("hasFarm"),
            farm_ha: reader.real("farmHa"),
            farm_name: reader.string("farmName"),
            crops: reader.crops("crops"),
            has_workers: reader.boolean("hasWorkers"),
            total_workers: reader.count("totalWorkers"),
            men_workers: reader.count("menWorkers"),
            woman_workers: reader.count("womanWorkers"),
            over18_workers: reader.count("over18Workers"),
            under18_workers: reader.count("under18Workers"),
            minor_workers_occupation: reader.string("minorWorkersOccupation"),
            has_pregnant_workers: reader.boolean("hasPregnantWorkers"),
            pregnant_workers: reader.count("pregnantWorkers"),
            pregnant_workers_occupation: reader.string("pregnantWorkersOccupation"),
            family: reader.family("family"),
        }
    }

    pub(super) fn has_ruc(&self) -> bool {
        self.has_ruc == Some(true)
    }

    pub(super) fn has_farm(&self) -> bool {
        self.has_farm == Some(true)
    }

    pub(super) fn has_workers(&self) -> bool {
        self.has_workers == Some(true)
    }

    pub(super) fn has_pregnant_workers(&self) -> bool {
        self.has_pregnant_workers == Some(true)
    }

    pub(super) fn has_minor_workers(&self) -> bool {
        self.under18_workers.unwrap_or(0) > 0
    }

    pub(super) fn has_pregnant_count(&self) -> bool {
        self.pregnant_workers.unwrap_or(0) > 0
    }

    /// Clears every field whose controlling condition is off and fills partial
    /// worker counts with zero when the workforce section is active.
    pub(super) fn normalize(&mut self) {
        if !self.has_ruc() {
            self.ruc_number = None;
        }

        if !self.has_farm() {
            self.farm_ha = None;
            self.farm_name = None;
            self.crops.clear();
        }

        if self.has_workers() {
            for count in [
                &mut self.men_workers,
                &mut self.woman_workers,
                &mut self.over18_workers,
                &mut self.under18_workers,
            ] {
                count.get_or_insert(0);
            }
        } else {
            self.total_workers = None;
            self.men_workers = None;
            self.woman_workers = None;
            self.over18_workers = None;
            self.under18_workers = None;
            self.has_pregnant_workers = self.has_pregnant_workers.map(|_| false);
        }

        if !self.has_minor_workers() {
            self.minor_workers_occupation = None;
        }

        if self.has_pregnant_workers() {
            self.pregnant_workers.get_or_insert(0);
        } else {
            self.pregnant_workers = None;
        }

        if !self.has_pregnant_count() {
            self.pregnant_workers_occupation = None;
        }
    }

    pub(super) fn into_registrant(self) -> Option<Registrant> {
        let family = self
            .family?
            .into_iter()
            .map(|member| {
                Some(FamilyMember {
                    name: member.name?,
                    last_name: member.last_name?,
                    ci: member.ci?,
                })
            })
            .collect::<Option<Vec<_>>>()?;

        Some(Registrant {
            name: self.name?,
            last_name: self.last_name?,
            ci: self.ci?,
            date_of_birth: self.date_of_birth?,
            has_ruc: self.has_ruc?,
            ruc_number: self.ruc_number,
            gender: self.gender?,
            has_farm: self.has_farm?,
            farm_ha: self.farm_ha,
            farm_name: self.farm_name,
            crops: self.crops,
            has_workers: self.has_workers?,
            total_workers: self.total_workers,
            men_workers: self.men_workers,
            woman_workers: self.woman_workers,
            over18_workers: self.over18_workers,
            under18_workers: self.under18_workers,
            minor_workers_occupation: self.minor_workers_occupation,
            has_pregnant_workers: self.has_pregnant_workers?,
            pregnant_workers: self.pregnant_workers,
            pregnant_workers_occupation: self.pregnant_workers_occupation,
            family,
        })
    }
}

struct Reader<'a, 'v> {
    args: &'a Map<String, Value>,
    prefix: String,
    violations: &'v mut Violations,
}

impl<'a> Reader<'a, '_> {
    fn path(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    fn reject(&mut self, key: &str, reason: String) {
        let path = self.path(key);
        self.violations.push(path, reason);
    }

    fn present(&self, key: &str) -> Option<&'a Value> {
        match self.args.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }

    /// Trimmed text; blank input counts as absent.
    fn string(&mut self, key: &str) -> Option<String> {
        match self.present(key)? {
            Value::String(raw) => {
                let trimmed = raw.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            _ => {
                self.reject(key, format!("{key} must be a string"));
                None
            }
        }
    }

    fn boolean(&mut self, key: &str) -> Option<bool> {
        match self.present(key)? {
            Value::Bool(value) => Some(*value),
            Value::String(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    None
                } else if raw.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if raw.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    self.reject(key, format!("{key} must be a boolean"));
                    None
                }
            }
            _ => {
                self.reject(key, format!("{key} must be a boolean"));
                None
            }
        }
    }

    fn count(&mut self, key: &str) -> Option<u32> {
        let parsed = match self.present(key)? {
            Value::Number(number) => number.as_u64().or_else(|| {
                number
                    .as_f64()
                    .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
                    .map(|v| v as u64)
            }),
            Value::String(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return None;
                }
                raw.parse::<u64>().ok()
            }
            _ => None,
        };
        match parsed.and_then(|v| u32::try_from(v).ok()) {
            Some(value) => Some(value),
            None => {
                self.reject(key, format!("{key} must be a non-negative whole number"));
                None
            }
        }
    }

    fn real(&mut self, key: &str) -> Option<f64> {
        let parsed = match self.present(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return None;
                }
                raw.parse::<f64>().ok()
            }
            _ => None,
        };
        match parsed.filter(|v| v.is_finite() && *v >= 0.0) {
            Some(value) => Some(value),
            None => {
                self.reject(key, format!("{key} must be a non-negative number"));
                None
            }
        }
    }

    /// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (as serialized by browsers).
    fn date(&mut self, key: &str) -> Option<Date> {
        let raw = match self.present(key)? {
            Value::String(raw) => raw.trim(),
            _ => {
                self.reject(key, format!("{key} must be a date (YYYY-MM-DD)"));
                return None;
            }
        };
        if raw.is_empty() {
            return None;
        }
        let parsed = parse_iso_date(raw)
            .or_else(|| OffsetDateTime::parse(raw, &Rfc3339).ok().map(|dt| dt.date()));
        if parsed.is_none() {
            self.reject(key, format!("{key} must be a date (YYYY-MM-DD)"));
        }
        parsed
    }

    fn gender(&mut self, key: &str) -> Option<Gender> {
        let raw = self.string(key)?;
        let parsed = Gender::parse(&raw);
        if parsed.is_none() {
            self.reject(key, format!("{key} must be one of: male, female, other"));
        }
        parsed
    }

    /// Crop names form a set: blanks are dropped and repeats collapse onto the
    /// first occurrence.
    fn crops(&mut self, key: &str) -> Vec<String> {
        let mut out = Vec::new();
        let Some(value) = self.present(key) else {
            return out;
        };
        let Some(items) = value.as_array() else {
            self.reject(key, format!("{key} must be a list of crop names"));
            return out;
        };
        for (index, item) in items.iter().enumerate() {
            match item {
                Value::String(raw) => {
                    let name = raw.trim();
                    if !name.is_empty() && !out.iter().any(|existing| existing == name) {
                        out.push(name.to_string());
                    }
                }
                Value::Null => {}
                _ => self.reject(
                    &format!("{key}[{index}]"),
                    "crop names must be strings".to_string(),
                ),
            }
        }
        out
    }

    fn family(&mut self, key: &str) -> Option<Vec<CandidateMember>> {
        let value = self.present(key)?;
        let Some(items) = value.as_array() else {
            self.reject(key, format!("{key} must be a list of family members"));
            return None;
        };
        let mut members = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let Some(obj) = item.as_object() else {
                self.reject(
                    &format!("{key}[{index}]"),
                    "family members must be objects".to_string(),
                );
                members.push(CandidateMember::default());
                continue;
            };
            let mut nested = Reader {
                args: obj,
                prefix: format!("{}{key}[{index}].", self.prefix),
                violations: &mut *self.violations,
            };
            members.push(CandidateMember {
                name: nested.string("name"),
                last_name: nested.string("lastName"),
                ci: nested.string("ci"),
            });
        }
        Some(members)
    }
}
