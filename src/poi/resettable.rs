//! Seal/dirty/reset/save state machine around a `PoiEntity`
//!
//! A sealed POI remembers a snapshot. The first divergence marks it dirty
//! (and emits `PoiEvent::Dirtied` once). A reset is bracketed by
//! `begin_reset`/`finish_reset`; the owner applies the restoring edits in
//! between while the `resetting` flag keeps them from re-dirtying it.

use crate::error::PoiError;

use super::entity::PoiEntity;
use super::kind::{PoiEdit, PoiEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealState {
    Unsealed,
    Clean,
    Dirty,
    Resetting,
}

#[derive(Debug, Clone)]
pub struct ResettablePoi {
    poi: PoiEntity,
    snapshot: Option<PoiEntity>,
    dirty: bool,
    resetting: bool,
}

impl ResettablePoi {
    pub fn new(source: &PoiEntity, seal: bool) -> Self {
        let poi = source.clone();
        Self {
            snapshot: seal.then(|| poi.clone()),
            poi,
            dirty: false,
            resetting: false,
        }
    }

    /// Capture the current values as the baseline. Only allowed once.
    pub fn seal(&mut self) -> Result<(), PoiError> {
        if self.snapshot.is_some() {
            return Err(PoiError::InvalidState("POI is already sealed"));
        }
        self.snapshot = Some(self.poi.clone());
        Ok(())
    }

    pub fn state(&self) -> SealState {
        match (&self.snapshot, self.resetting, self.dirty) {
            (None, _, _) => SealState::Unsealed,
            (Some(_), true, _) => SealState::Resetting,
            (Some(_), false, true) => SealState::Dirty,
            (Some(_), false, false) => SealState::Clean,
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_resetting(&self) -> bool {
        self.resetting
    }

    pub fn entity(&self) -> &PoiEntity {
        &self.poi
    }

    pub fn snapshot(&self) -> Option<&PoiEntity> {
        self.snapshot.as_ref()
    }

    /// Apply an edit and translate the changed attributes into events
    pub fn apply(&mut self, edit: PoiEdit) -> Result<Vec<PoiEvent>, PoiError> {
        let changed = self.poi.apply(edit)?;
        let mut events: Vec<PoiEvent> = changed.into_iter().map(PoiEvent::Changed).collect();
        if !events.is_empty() && self.is_sealed() && !self.resetting && !self.dirty {
            self.dirty = true;
            events.push(PoiEvent::Dirtied);
        }
        Ok(events)
    }

    /// Enter the resetting state and hand out the edits that restore the
    /// snapshot. `None` when there is nothing to restore.
    pub fn begin_reset(&mut self) -> Result<Option<Vec<PoiEdit>>, PoiError> {
        if self.resetting {
            return Err(PoiError::InvalidState("reentrant reset"));
        }
        if !self.dirty {
            return Ok(None);
        }
        let Some(snapshot) = &self.snapshot else {
            return Ok(None);
        };
        let edits = snapshot.edits();
        self.resetting = true;
        Ok(Some(edits))
    }

    pub fn finish_reset(&mut self) {
        self.resetting = false;
        self.dirty = false;
    }

    /// Promote the current values to the new snapshot. Returns whether
    /// anything was promoted.
    pub fn save(&mut self) -> Result<bool, PoiError> {
        if self.resetting {
            return Err(PoiError::InvalidState("save during reset"));
        }
        if !self.dirty {
            return Ok(false);
        }
        self.snapshot = Some(self.poi.clone());
        self.dirty = false;
        Ok(true)
    }
}
