#![forbid(unsafe_code)]

mod collections;
mod error;
mod requests;
mod rows;
mod schema;
mod sync;
mod types;

pub use collections::{Collection, Collections, Filter, Row, RowId, SqlValue, SqliteCollections};
pub use error::{CensusError, PersistenceError, StoreError, SyncError};
pub use requests::*;
pub use sync::{CancelToken, SyncState, SyncStep, Synchronizer};
pub use types::*;

use census_core::Validator;
use census_core::ids::RegistrantId;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DB_FILE_NAME: &str = "census.db";

/// Registrant API over a single SQLite database. Every write runs its whole
/// synchronizer sequence inside one transaction.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;",
        )?;

        schema::preflight_gate(&conn)?;
        schema::install_schema(&conn, now_ms())?;

        tracing::debug!(dir = %storage_dir.display(), "census store opened");
        Ok(Self {
            conn,
            storage_dir: Some(storage_dir),
        })
    }

    /// A throwaway database; nothing survives the process.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::install_schema(&conn, now_ms())?;
        Ok(Self {
            conn,
            storage_dir: None,
        })
    }

    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    pub fn create_registrant(
        &mut self,
        request: CreateRegistrantRequest,
    ) -> Result<RegistrantId, CensusError> {
        let record = Validator::today_utc().validate(&request.payload)?;
        let now_ms = now_ms();

        let tx = self.conn.transaction().map_err(StoreError::from)?;
        let id = {
            let mut collections = SqliteCollections::new(&tx);
            Synchronizer::new(&mut collections, now_ms)
                .with_cancel(request.cancel)
                .create(&record)?
        };
        tx.commit().map_err(StoreError::from)?;

        tracing::info!(id = %id, "registrant created");
        Ok(id)
    }

    pub fn replace_registrant(
        &mut self,
        request: ReplaceRegistrantRequest,
    ) -> Result<(), CensusError> {
        let record = Validator::today_utc().validate(&request.payload)?;
        let now_ms = now_ms();

        let tx = self.conn.transaction().map_err(StoreError::from)?;
        {
            let mut collections = SqliteCollections::new(&tx);
            Synchronizer::new(&mut collections, now_ms)
                .with_cancel(request.cancel)
                .replace(request.id, &record)?;
        }
        tx.commit().map_err(StoreError::from)?;

        tracing::info!(id = %request.id, "registrant replaced");
        Ok(())
    }

    pub fn delete_registrant(&mut self, id: RegistrantId) -> Result<(), CensusError> {
        let tx = self.conn.transaction().map_err(StoreError::from)?;
        {
            let mut collections = SqliteCollections::new(&tx);
            Synchronizer::new(&mut collections, now_ms()).delete(id)?;
        }
        tx.commit().map_err(StoreError::from)?;

        tracing::info!(id = %id, "registrant deleted");
        Ok(())
    }

    pub fn get_registrant(&self, id: RegistrantId) -> Result<RegistrantDetail, CensusError> {
        let collections = SqliteCollections::new(&self.conn);
        let owner = RowId(id.get());
        let users = collections.select(Collection::Users, Filter::Id(owner))?;
        if users.is_empty() {
            return Err(CensusError::NotFound(id));
        }
        let crops = collections.select(Collection::Crops, Filter::Owner(owner))?;
        let family = collections.select(Collection::FamilyMembers, Filter::Owner(owner))?;
        rows::assemble(&users, &crops, &family)?
            .pop()
            .ok_or(CensusError::NotFound(id))
    }

    /// Every registrant with its crops and family members, ordered by id.
    pub fn list_registrants(&self) -> Result<Vec<RegistrantDetail>, CensusError> {
        let collections = SqliteCollections::new(&self.conn);
        let users = collections.select(Collection::Users, Filter::All)?;
        let crops = collections.select(Collection::Crops, Filter::All)?;
        let family = collections.select(Collection::FamilyMembers, Filter::All)?;
        Ok(rows::assemble(&users, &crops, &family)?)
    }

    pub fn crop_summary(&self) -> Result<Vec<CropCount>, CensusError> {
        let mut stmt = self.conn.prepare(
            "SELECT crop_name, COUNT(1) FROM crops \
             GROUP BY crop_name \
             ORDER BY crop_name ASC",
        ).map_err(StoreError::from)?;

        let mut rows = stmt.query([]).map_err(StoreError::from)?;
        let mut out = Vec::new();

        while let Some(row) = rows.next().map_err(StoreError::from)? {
            let count = row.get::<_, i64>(1).map_err(StoreError::from)?;
            out.push(CropCount {
                crop_name: row.get::<_, String>(0).map_err(StoreError::from)?,
                count: u64::try_from(count).unwrap_or(0),
            });
        }

        Ok(out)
    }
}

fn now_ms() -> i64 {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn info_logs_name_the_id_but_not_the_identity_card() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut store = SqliteStore::open_in_memory().expect("store");
        let payload = serde_json::json!({
            "name": "Rosa",
            "lastName": "Quishpe",
            "ci": "1712345678",
            "dateOfBirth": "1980-03-02",
            "hasRuc": false,
            "gender": "female",
            "hasFarm": false,
            "hasWorkers": false,
            "hasPregnantWorkers": false,
            "family": [{ "name": "Luis", "lastName": "Quishpe", "ci": "1711111111" }]
        });
        let id = tracing::subscriber::with_default(subscriber, || {
            store
                .create_registrant(CreateRegistrantRequest::new(payload))
                .expect("create")
        });

        let text = String::from_utf8(logs.0.lock().expect("log buffer").clone()).expect("utf8");
        assert!(text.contains("registrant created"), "logs: {text}");
        assert!(text.contains(&format!("id={id}")), "logs: {text}");
        assert!(!text.contains("1712345678"), "logs: {text}");
    }
}
