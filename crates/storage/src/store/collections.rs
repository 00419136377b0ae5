#![forbid(unsafe_code)]

//! Relational-store seam consumed by the synchronizer: three named collections
//! addressed through insert / update / delete / select.

use super::StoreError;
pub use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params_from_iter};

pub const ID_COLUMN: &str = "id";
pub const OWNER_COLUMN: &str = "user_id";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Users,
    Crops,
    FamilyMembers,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Crops => "crops",
            Collection::FamilyMembers => "family_members",
        }
    }

    /// Children carry a `user_id` reference to their owning `users` row.
    pub fn is_owned(self) -> bool {
        !matches!(self, Collection::Users)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    All,
    Id(RowId),
    Owner(RowId),
}

/// Column → value pairs in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: impl Into<SqlValue>) {
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| name == column) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((column.to_string(), value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn id(&self) -> Option<RowId> {
        match self.get(ID_COLUMN) {
            Some(SqlValue::Integer(id)) => Some(RowId(*id)),
            _ => None,
        }
    }

    pub fn owner(&self) -> Option<RowId> {
        match self.get(OWNER_COLUMN) {
            Some(SqlValue::Integer(id)) => Some(RowId(*id)),
            _ => None,
        }
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.columns.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Each call is atomic on its own. Multi-call atomicity is the caller's business
/// (see `SqliteStore`, which runs whole sequences inside one transaction).
pub trait Collections {
    /// Whether deleting a `users` row also removes the rows it owns. When this is
    /// `false` the caller must delete children first.
    const CASCADES_OWNER_DELETE: bool;

    fn insert(&mut self, collection: Collection, rows: &[Row]) -> Result<Vec<RowId>, StoreError>;

    /// Returns the number of rows updated (0 when `id` does not exist).
    fn update(&mut self, collection: Collection, id: RowId, fields: &Row)
    -> Result<usize, StoreError>;

    /// Returns the number of rows removed.
    fn delete(&mut self, collection: Collection, filter: Filter) -> Result<usize, StoreError>;

    /// Rows ordered by id.
    fn select(&self, collection: Collection, filter: Filter) -> Result<Vec<Row>, StoreError>;
}

#[derive(Debug)]
pub struct SqliteCollections<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteCollections<'c> {
    /// Works on a plain connection or on a `Transaction` (via deref).
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn in_savepoint<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.conn.execute_batch("SAVEPOINT census_batch")?;
        match op(self.conn) {
            Ok(value) => {
                self.conn.execute_batch("RELEASE census_batch")?;
                Ok(value)
            }
            Err(err) => {
                self.conn
                    .execute_batch("ROLLBACK TO census_batch; RELEASE census_batch")?;
                Err(err)
            }
        }
    }
}

fn checked_identifier(name: &str) -> Result<&str, StoreError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidInput("invalid column name"))
    }
}

fn filter_clause(
    collection: Collection,
    filter: Filter,
) -> Result<(String, Option<i64>), StoreError> {
    match filter {
        Filter::All => Ok((String::new(), None)),
        Filter::Id(RowId(id)) => Ok((format!(" WHERE {ID_COLUMN}=?1"), Some(id))),
        Filter::Owner(RowId(owner)) => {
            if !collection.is_owned() {
                return Err(StoreError::InvalidInput("users rows have no owner"));
            }
            Ok((format!(" WHERE {OWNER_COLUMN}=?1"), Some(owner)))
        }
    }
}

impl Collections for SqliteCollections<'_> {
    // Enforced by `ON DELETE CASCADE` with `PRAGMA foreign_keys = ON`.
    const CASCADES_OWNER_DELETE: bool = true;

    fn insert(&mut self, collection: Collection, rows: &[Row]) -> Result<Vec<RowId>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        self.in_savepoint(|conn| {
            let mut ids = Vec::with_capacity(rows.len());
            for row in rows {
                if row.is_empty() {
                    return Err(StoreError::InvalidInput("cannot insert an empty row"));
                }
                let columns = row
                    .column_names()
                    .map(checked_identifier)
                    .collect::<Result<Vec<_>, _>>()?;
                let placeholders = (1..=columns.len())
                    .map(|index| format!("?{index}"))
                    .collect::<Vec<_>>()
                    .join(",");
                let sql = format!(
                    "INSERT INTO {}({}) VALUES ({placeholders})",
                    collection.table(),
                    columns.join(",")
                );
                conn.execute(&sql, params_from_iter(row.values()))?;
                ids.push(RowId(conn.last_insert_rowid()));
            }
            Ok(ids)
        })
    }

    fn update(
        &mut self,
        collection: Collection,
        id: RowId,
        fields: &Row,
    ) -> Result<usize, StoreError> {
        if fields.is_empty() {
            return Err(StoreError::InvalidInput("update needs at least one field"));
        }
        let assignments = fields
            .column_names()
            .enumerate()
            .map(|(index, name)| {
                checked_identifier(name).map(|name| format!("{name}=?{}", index + 1))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let sql = format!(
            "UPDATE {} SET {} WHERE {ID_COLUMN}=?{}",
            collection.table(),
            assignments.join(","),
            fields.len() + 1
        );
        let id_value = SqlValue::Integer(id.0);
        let params = fields.values().chain(std::iter::once(&id_value));
        Ok(self.conn.execute(&sql, params_from_iter(params))?)
    }

    fn delete(&mut self, collection: Collection, filter: Filter) -> Result<usize, StoreError> {
        let (clause, param) = filter_clause(collection, filter)?;
        let sql = format!("DELETE FROM {}{clause}", collection.table());
        Ok(self.conn.execute(&sql, params_from_iter(param))?)
    }

    fn select(&self, collection: Collection, filter: Filter) -> Result<Vec<Row>, StoreError> {
        let (clause, param) = filter_clause(collection, filter)?;
        let sql = format!(
            "SELECT * FROM {}{clause} ORDER BY {ID_COLUMN}",
            collection.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let names = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let rows = stmt.query_map(params_from_iter(param), |sql_row| {
            let mut row = Row::new();
            for (index, name) in names.iter().enumerate() {
                row.set(name, sql_row.get::<_, SqlValue>(index)?);
            }
            Ok(row)
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
