#![forbid(unsafe_code)]

//! Mapping between validated registrants and the rows of the three collections.

use super::collections::{ID_COLUMN, OWNER_COLUMN, Row, RowId};
use super::{RegistrantDetail, StoreError};
use census_core::ids::RegistrantId;
use census_core::model::parse_iso_date;
use census_core::{FamilyMember, Gender, Registrant};
use rusqlite::types::Value as SqlValue;
use std::collections::BTreeMap;
use time::Date;

pub(crate) const CREATED_AT_COLUMN: &str = "created_at_ms";
pub(crate) const UPDATED_AT_COLUMN: &str = "updated_at_ms";
pub(crate) const CROP_NAME_COLUMN: &str = "crop_name";

fn count(value: Option<u32>) -> Option<i64> {
    value.map(i64::from)
}

/// Root-record fields only; timestamps are stamped by the synchronizer.
pub(crate) fn registrant_row(record: &Registrant) -> Row {
    Row::new()
        .with("name", record.name.clone())
        .with("last_name", record.last_name.clone())
        .with("ci", record.ci.clone())
        .with("date_of_birth", record.date_of_birth_iso())
        .with("has_ruc", record.has_ruc)
        .with("ruc_number", record.ruc_number.clone())
        .with("gender", record.gender.as_str().to_string())
        .with("has_farm", record.has_farm)
        .with("farm_ha", record.farm_ha)
        .with("farm_name", record.farm_name.clone())
        .with("has_workers", record.has_workers)
        .with("total_workers", count(record.total_workers))
        .with("men_workers", count(record.men_workers))
        .with("woman_workers", count(record.woman_workers))
        .with("over18_workers", count(record.over18_workers))
        .with("under18_workers", count(record.under18_workers))
        .with(
            "minor_workers_occupation",
            record.minor_workers_occupation.clone(),
        )
        .with("has_pregnant_workers", record.has_pregnant_workers)
        .with("pregnant_workers", count(record.pregnant_workers))
        .with(
            "pregnant_workers_occupation",
            record.pregnant_workers_occupation.clone(),
        )
}

pub(crate) fn crop_rows(owner: RowId, crops: &[String]) -> Vec<Row> {
    crops
        .iter()
        .map(|name| {
            Row::new()
                .with(OWNER_COLUMN, owner.0)
                .with(CROP_NAME_COLUMN, name.clone())
        })
        .collect()
}

pub(crate) fn family_rows(owner: RowId, family: &[FamilyMember]) -> Vec<Row> {
    family
        .iter()
        .map(|member| {
            Row::new()
                .with(OWNER_COLUMN, owner.0)
                .with("name", member.name.clone())
                .with("last_name", member.last_name.clone())
                .with("ci", member.ci.clone())
        })
        .collect()
}

struct Columns<'r> {
    table: &'static str,
    row: &'r Row,
}

impl<'r> Columns<'r> {
    fn decode_err(&self, column: &str, reason: impl Into<String>) -> StoreError {
        StoreError::Decode {
            table: self.table,
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    fn optional_text(&self, column: &str) -> Result<Option<String>, StoreError> {
        match self.row.get(column) {
            None | Some(SqlValue::Null) => Ok(None),
            Some(SqlValue::Text(text)) => Ok(Some(text.clone())),
            Some(_) => Err(self.decode_err(column, "expected text")),
        }
    }

    fn text(&self, column: &str) -> Result<String, StoreError> {
        self.optional_text(column)?
            .ok_or_else(|| self.decode_err(column, "missing value"))
    }

    fn optional_integer(&self, column: &str) -> Result<Option<i64>, StoreError> {
        match self.row.get(column) {
            None | Some(SqlValue::Null) => Ok(None),
            Some(SqlValue::Integer(value)) => Ok(Some(*value)),
            Some(_) => Err(self.decode_err(column, "expected integer")),
        }
    }

    fn integer(&self, column: &str) -> Result<i64, StoreError> {
        self.optional_integer(column)?
            .ok_or_else(|| self.decode_err(column, "missing value"))
    }

    fn flag(&self, column: &str) -> Result<bool, StoreError> {
        Ok(self.integer(column)? != 0)
    }

    fn optional_count(&self, column: &str) -> Result<Option<u32>, StoreError> {
        self.optional_integer(column)?
            .map(|value| {
                u32::try_from(value).map_err(|_| self.decode_err(column, "count out of range"))
            })
            .transpose()
    }

    fn optional_real(&self, column: &str) -> Result<Option<f64>, StoreError> {
        match self.row.get(column) {
            None | Some(SqlValue::Null) => Ok(None),
            Some(SqlValue::Real(value)) => Ok(Some(*value)),
            Some(SqlValue::Integer(value)) => Ok(Some(*value as f64)),
            Some(_) => Err(self.decode_err(column, "expected number")),
        }
    }

    fn date(&self, column: &str) -> Result<Date, StoreError> {
        let raw = self.text(column)?;
        parse_iso_date(&raw).ok_or_else(|| self.decode_err(column, "expected YYYY-MM-DD"))
    }

    fn gender(&self, column: &str) -> Result<Gender, StoreError> {
        let raw = self.text(column)?;
        Gender::parse(&raw).ok_or_else(|| self.decode_err(column, format!("unknown gender {raw}")))
    }

    fn row_id(&self, column: &str) -> Result<RowId, StoreError> {
        self.integer(column).map(RowId)
    }
}

fn decode_member(row: &Row) -> Result<FamilyMember, StoreError> {
    let cols = Columns {
        table: "family_members",
        row,
    };
    Ok(FamilyMember {
        name: cols.text("name")?,
        last_name: cols.text("last_name")?,
        ci: cols.text("ci")?,
    })
}

fn decode_user(
    row: &Row,
    crops: Vec<String>,
    family: Vec<FamilyMember>,
) -> Result<RegistrantDetail, StoreError> {
    let cols = Columns {
        table: "users",
        row,
    };
    let id = RegistrantId::try_new(cols.integer(ID_COLUMN)?)
        .map_err(|err| cols.decode_err(ID_COLUMN, err.message()))?;
    let registrant = Registrant {
        name: cols.text("name")?,
        last_name: cols.text("last_name")?,
        ci: cols.text("ci")?,
        date_of_birth: cols.date("date_of_birth")?,
        has_ruc: cols.flag("has_ruc")?,
        ruc_number: cols.optional_text("ruc_number")?,
        gender: cols.gender("gender")?,
        has_farm: cols.flag("has_farm")?,
        farm_ha: cols.optional_real("farm_ha")?,
        farm_name: cols.optional_text("farm_name")?,
        crops,
        has_workers: cols.flag("has_workers")?,
        total_workers: cols.optional_count("total_workers")?,
        men_workers: cols.optional_count("men_workers")?,
        woman_workers: cols.optional_count("woman_workers")?,
        over18_workers: cols.optional_count("over18_workers")?,
        under18_workers: cols.optional_count("under18_workers")?,
        minor_workers_occupation: cols.optional_text("minor_workers_occupation")?,
        has_pregnant_workers: cols.flag("has_pregnant_workers")?,
        pregnant_workers: cols.optional_count("pregnant_workers")?,
        pregnant_workers_occupation: cols.optional_text("pregnant_workers_occupation")?,
        family,
    };
    Ok(RegistrantDetail {
        id,
        registrant,
        created_at_ms: cols.integer(CREATED_AT_COLUMN)?,
        updated_at_ms: cols.integer(UPDATED_AT_COLUMN)?,
    })
}

/// Joins child rows onto their owners. Output follows the order of `users`;
/// children keep the order they were given in.
pub(crate) fn assemble(
    users: &[Row],
    crops: &[Row],
    family: &[Row],
) -> Result<Vec<RegistrantDetail>, StoreError> {
    let mut crops_by_owner: BTreeMap<RowId, Vec<String>> = BTreeMap::new();
    for row in crops {
        let cols = Columns {
            table: "crops",
            row,
        };
        crops_by_owner
            .entry(cols.row_id(OWNER_COLUMN)?)
            .or_default()
            .push(cols.text(CROP_NAME_COLUMN)?);
    }

    let mut family_by_owner: BTreeMap<RowId, Vec<FamilyMember>> = BTreeMap::new();
    for row in family {
        let owner = Columns {
            table: "family_members",
            row,
        }
        .row_id(OWNER_COLUMN)?;
        family_by_owner
            .entry(owner)
            .or_default()
            .push(decode_member(row)?);
    }

    users
        .iter()
        .map(|row| {
            let id = Columns {
                table: "users",
                row,
            }
            .row_id(ID_COLUMN)?;
            decode_user(
                row,
                crops_by_owner.remove(&id).unwrap_or_default(),
                family_by_owner.remove(&id).unwrap_or_default(),
            )
        })
        .collect()
}
