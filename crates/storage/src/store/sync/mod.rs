#![forbid(unsafe_code)]

//! Applies a validated registrant to the three collections as an ordered
//! sequence of steps.

use super::collections::{Collection, Collections, Filter, RowId};
use super::rows::{CREATED_AT_COLUMN, UPDATED_AT_COLUMN, crop_rows, family_rows, registrant_row};
use super::{PersistenceError, StoreError, SyncError};
use census_core::Registrant;
use census_core::ids::RegistrantId;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStep {
    InsertRegistrant,
    InsertFamily,
    InsertCrops,
    UpdateRegistrant,
    DeleteCrops,
    DeleteFamily,
    DeleteRegistrant,
}

impl SyncStep {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStep::InsertRegistrant => "insert_registrant",
            SyncStep::InsertFamily => "insert_family",
            SyncStep::InsertCrops => "insert_crops",
            SyncStep::UpdateRegistrant => "update_registrant",
            SyncStep::DeleteCrops => "delete_crops",
            SyncStep::DeleteFamily => "delete_family",
            SyncStep::DeleteRegistrant => "delete_registrant",
        }
    }
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncState {
    Validated,
    InProgress(SyncStep),
    Committed,
    /// Terminal. A failed synchronizer does not retry.
    Failed { step: SyncStep, cause: String },
}

impl SyncState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncState::Committed | SyncState::Failed { .. })
    }
}

/// Cooperative cancellation flag shared between a caller and a running
/// synchronizer.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One synchronizer runs one operation. Construct it once the payload has been
/// validated.
pub struct Synchronizer<'s, C: Collections> {
    collections: &'s mut C,
    cancel: Option<CancelToken>,
    state: SyncState,
    now_ms: i64,
}

impl<'s, C: Collections> Synchronizer<'s, C> {
    pub fn new(collections: &'s mut C, now_ms: i64) -> Self {
        Self {
            collections,
            cancel: None,
            state: SyncState::Validated,
            now_ms,
        }
    }

    pub fn with_cancel(mut self, cancel: Option<CancelToken>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// root → family → crops
    pub fn create(&mut self, record: &Registrant) -> Result<RegistrantId, SyncError> {
        self.ensure_fresh(SyncStep::InsertRegistrant)?;

        let root = registrant_row(record)
            .with(CREATED_AT_COLUMN, self.now_ms)
            .with(UPDATED_AT_COLUMN, self.now_ms);
        let ids = self.step(SyncStep::InsertRegistrant, |c| {
            c.insert(Collection::Users, std::slice::from_ref(&root))
        })?;
        let Some(owner) = ids.first().copied() else {
            return Err(self.fail(
                SyncStep::InsertRegistrant,
                StoreError::InvalidInput("insert returned no id"),
            ));
        };
        let id = self.registrant_id(SyncStep::InsertRegistrant, owner)?;

        let family = family_rows(owner, &record.family);
        self.step(SyncStep::InsertFamily, |c| {
            c.insert(Collection::FamilyMembers, &family)
        })?;

        if !record.crops.is_empty() {
            let crops = crop_rows(owner, &record.crops);
            self.step(SyncStep::InsertCrops, |c| c.insert(Collection::Crops, &crops))?;
        }

        self.commit();
        Ok(id)
    }

    /// root update → delete crops → delete family → insert crops → insert family
    pub fn replace(&mut self, id: RegistrantId, record: &Registrant) -> Result<(), SyncError> {
        self.ensure_fresh(SyncStep::UpdateRegistrant)?;
        let owner = RowId(id.get());

        let root = registrant_row(record).with(UPDATED_AT_COLUMN, self.now_ms);
        let updated = self.step(SyncStep::UpdateRegistrant, |c| {
            c.update(Collection::Users, owner, &root)
        })?;
        if updated == 0 {
            return Err(self.not_found(SyncStep::UpdateRegistrant, id));
        }

        self.step(SyncStep::DeleteCrops, |c| {
            c.delete(Collection::Crops, Filter::Owner(owner))
        })?;
        self.step(SyncStep::DeleteFamily, |c| {
            c.delete(Collection::FamilyMembers, Filter::Owner(owner))
        })?;

        if !record.crops.is_empty() {
            let crops = crop_rows(owner, &record.crops);
            self.step(SyncStep::InsertCrops, |c| c.insert(Collection::Crops, &crops))?;
        }

        let family = family_rows(owner, &record.family);
        self.step(SyncStep::InsertFamily, |c| {
            c.insert(Collection::FamilyMembers, &family)
        })?;

        self.commit();
        Ok(())
    }

    pub fn delete(&mut self, id: RegistrantId) -> Result<(), SyncError> {
        self.ensure_fresh(SyncStep::DeleteRegistrant)?;
        let owner = RowId(id.get());

        if !C::CASCADES_OWNER_DELETE {
            self.step(SyncStep::DeleteCrops, |c| {
                c.delete(Collection::Crops, Filter::Owner(owner))
            })?;
            self.step(SyncStep::DeleteFamily, |c| {
                c.delete(Collection::FamilyMembers, Filter::Owner(owner))
            })?;
        }

        let removed = self.step(SyncStep::DeleteRegistrant, |c| {
            c.delete(Collection::Users, Filter::Id(owner))
        })?;
        if removed == 0 {
            return Err(self.not_found(SyncStep::DeleteRegistrant, id));
        }

        self.commit();
        Ok(())
    }

    fn ensure_fresh(&mut self, step: SyncStep) -> Result<(), SyncError> {
        if self.state == SyncState::Validated {
            return Ok(());
        }
        Err(self.fail(
            step,
            StoreError::InvalidInput("synchronizer already ran an operation"),
        ))
    }

    fn step<T>(
        &mut self,
        step: SyncStep,
        op: impl FnOnce(&mut C) -> Result<T, StoreError>,
    ) -> Result<T, SyncError> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            tracing::warn!(step = %step, "registrant sync cancelled");
            self.state = SyncState::Failed {
                step,
                cause: "cancelled".to_string(),
            };
            return Err(SyncError::Cancelled { step });
        }

        tracing::debug!(step = %step, "registrant sync step");
        self.state = SyncState::InProgress(step);
        op(&mut *self.collections).map_err(|cause| self.fail(step, cause))
    }

    fn fail(&mut self, step: SyncStep, cause: StoreError) -> SyncError {
        tracing::warn!(step = %step, error = %cause, "registrant sync failed");
        self.state = SyncState::Failed {
            step,
            cause: cause.to_string(),
        };
        SyncError::Persistence(PersistenceError { step, cause })
    }

    fn not_found(&mut self, step: SyncStep, id: RegistrantId) -> SyncError {
        tracing::debug!(step = %step, id = %id, "registrant not found");
        self.state = SyncState::Failed {
            step,
            cause: format!("registrant {id} not found"),
        };
        SyncError::NotFound(id)
    }

    fn registrant_id(&mut self, step: SyncStep, row: RowId) -> Result<RegistrantId, SyncError> {
        RegistrantId::try_new(row.0)
            .map_err(|_| self.fail(step, StoreError::InvalidInput("store returned a bad id")))
    }

    fn commit(&mut self) {
        tracing::debug!("registrant sync committed");
        self.state = SyncState::Committed;
    }
}
