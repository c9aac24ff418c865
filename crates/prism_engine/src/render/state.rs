//! Pipeline-state diffing

use super::backend::{GraphicsDevice, StateChange};

/// Last issued value of every state slot
///
/// Forwarding only changed slots keeps redundant driver calls out of the
/// draw loop.
#[derive(Debug, Default)]
pub struct StateTracker {
    current: [Option<StateChange>; StateChange::SLOTS],
    issued: u64,
    skipped: u64,
}

impl StateTracker {
    /// Tracker with every slot unknown
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `change` unless the slot already holds it; returns true when sent
    pub fn apply<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, change: StateChange) -> bool {
        let slot = &mut self.current[change.slot()];
        if slot.as_ref() == Some(&change) {
            self.skipped += 1;
            return false;
        }
        device.apply_state(&change);
        *slot = Some(change);
        self.issued += 1;
        true
    }

    /// Last value sent for the slot `change` belongs to
    pub fn current(&self, slot: usize) -> Option<&StateChange> {
        self.current.get(slot).and_then(Option::as_ref)
    }

    /// Forget every slot so the next change of each kind is sent
    pub fn reset(&mut self) {
        self.current = Default::default();
    }

    /// Changes forwarded to the device
    pub const fn issued(&self) -> u64 {
        self.issued
    }

    /// Changes dropped as redundant
    pub const fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::{CullFace, HeadlessDevice, Viewport};

    #[test]
    fn test_redundant_changes_dropped() {
        let mut device = HeadlessDevice::new();
        let mut tracker = StateTracker::new();
        assert!(tracker.apply(&mut device, StateChange::DepthTest(true)));
        assert!(!tracker.apply(&mut device, StateChange::DepthTest(true)));
        assert!(tracker.apply(&mut device, StateChange::DepthTest(false)));
        assert!(tracker.apply(&mut device, StateChange::Cull(Some(CullFace::Back))));
        assert_eq!(device.state_changes().len(), 3);
        assert_eq!((tracker.issued(), tracker.skipped()), (3, 1));
    }

    #[test]
    fn test_reset_reissues() {
        let mut device = HeadlessDevice::new();
        let mut tracker = StateTracker::new();
        let viewport = StateChange::Viewport(Viewport::new(0, 0, 10, 10));
        tracker.apply(&mut device, viewport.clone());
        tracker.reset();
        assert!(tracker.current(viewport.slot()).is_none());
        assert!(tracker.apply(&mut device, viewport));
    }
}
