/// Pending annotation for the active record
///
/// Keep/delete and rotation changes stay in memory until the Navigator
/// moves the cursor (or something asks for an explicit save). Rotation is
/// rate limited: after each applied step a settle timer is armed and further
/// requests are dropped until it fires.

use iced::task;
use log::debug;

use super::data::{DeleteAction, FileRecord, Marker, Rotation};
use super::error::Result;
use super::store::RecordStore;

/// What happened to a rotate request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateOutcome {
    /// The step was applied; schedule `settle` for this generation
    Applied(u64),
    /// Dropped: still settling, or nothing is active
    Ignored,
}

/// Re-armable lockout owned by the controller.
///
/// Each arm gets a new generation so a late callback from a replaced timer
/// can't release the current lock.
#[derive(Default)]
pub struct SettleTimer {
    generation: u64,
    armed: bool,
    handle: Option<task::Handle>,
}

impl SettleTimer {
    /// Only called while disarmed, so there is no handle to abort
    fn arm(&mut self) -> u64 {
        self.generation += 1;
        self.armed = true;
        self.generation
    }

    /// Abort the pending callback (if any) and release the lock
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.armed = false;
    }

    /// Keep `handle` if it belongs to the current arm, abort it otherwise
    fn attach(&mut self, generation: u64, handle: task::Handle) {
        if self.armed && generation == self.generation {
            self.handle = Some(handle);
        } else {
            handle.abort();
        }
    }

    fn settle(&mut self, generation: u64) -> bool {
        if self.armed && generation == self.generation {
            self.armed = false;
            self.handle = None;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl std::fmt::Debug for SettleTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettleTimer")
            .field("generation", &self.generation)
            .field("armed", &self.armed)
            .field("has_handle", &self.handle.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct AnnotationController {
    loaded: bool,
    delete_action: DeleteAction,
    rotation: Rotation,
    timer: SettleTimer,
}

impl AnnotationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take over the persisted state of a newly active record
    pub fn load_for(&mut self, record: &FileRecord) {
        self.loaded = true;
        self.delete_action = record.delete_action;
        self.rotation = record.rotation;
        debug!(
            "Loaded {} ({:?}, {}°)",
            record.filename,
            record.delete_action,
            record.rotation.degrees()
        );
    }

    /// Nothing is active anymore (empty folder)
    pub fn clear(&mut self) {
        self.loaded = false;
        self.delete_action = DeleteAction::Unset;
        self.rotation = Rotation::NONE;
        self.timer.cancel();
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn set_delete_action(&mut self, action: DeleteAction) {
        if self.loaded {
            self.delete_action = action;
        }
    }

    /// Add `delta_degrees` to the pending rotation unless still settling
    pub fn rotate(&mut self, delta_degrees: i32) -> RotateOutcome {
        if !self.loaded || self.timer.is_armed() {
            return RotateOutcome::Ignored;
        }

        self.rotation = self.rotation.rotated_by(delta_degrees);
        RotateOutcome::Applied(self.timer.arm())
    }

    /// Hand over the abort handle of the delayed callback armed for `generation`
    pub fn attach_timer(&mut self, generation: u64, handle: task::Handle) {
        self.timer.attach(generation, handle);
    }

    /// The settle callback for `generation` fired. Returns whether it released the lock.
    pub fn settle(&mut self, generation: u64) -> bool {
        self.timer.settle(generation)
    }

    pub fn is_settling(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn delete_action(&self) -> DeleteAction {
        self.delete_action
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn marker(&self) -> Marker {
        Marker::from(self.delete_action)
    }

    /// Persist the pending state for the given record
    pub fn save(&self, store: &RecordStore, folder: &str, filename: &str) -> Result<()> {
        store.update(folder, filename, self.delete_action, self.rotation)?;
        debug!(
            "💾 Saved {} ({:?}, {}°)",
            filename,
            self.delete_action,
            self.rotation.degrees()
        );
        Ok(())
    }
}
