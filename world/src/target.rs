//! Pursuit state owned by every agent, and the sentinel points agents may chase.

use glam::Vec2;
use tailchase_core::{AnchorId, TargetRef};

/// Squared distance under which an agent counts as arrived.
const ARRIVAL_EPSILON_SQ: f32 = 1.0e-4;

/// Direction and squared distance from an agent to the entity it pursues.
#[derive(Clone, Debug, Default)]
pub(crate) struct Target {
    reference: Option<TargetRef>,
    direction: Vec2,
    distance_sq: f32,
    at_destination: bool,
    reversed: bool,
}

impl Target {
    /// Entity currently pursued, if any.
    pub(crate) fn reference(&self) -> Option<TargetRef> {
        self.reference
    }

    /// Rebinds the pursued entity. The direction is refreshed on the next
    /// admitted direction update, not here.
    pub(crate) fn set_reference(&mut self, reference: Option<TargetRef>) {
        self.reference = reference;
    }

    /// Drops the reference if it points at `stale`. Returns whether it did.
    pub(crate) fn release(&mut self, stale: TargetRef) -> bool {
        if self.reference == Some(stale) {
            self.reference = None;
            self.hold();
            true
        } else {
            false
        }
    }

    pub(crate) fn direction(&self) -> Vec2 {
        self.direction
    }

    pub(crate) fn distance_sq(&self) -> f32 {
        self.distance_sq
    }

    pub(crate) fn at_destination(&self) -> bool {
        self.at_destination
    }

    pub(crate) fn reversed(&self) -> bool {
        self.reversed
    }

    pub(crate) fn set_reversed(&mut self, reversed: bool) {
        self.reversed = reversed;
    }

    /// Recomputes direction and squared distance from `from` towards `to`.
    pub(crate) fn update(&mut self, from: Vec2, to: Vec2) {
        let delta = to - from;
        self.distance_sq = delta.length_squared();
        if self.distance_sq < ARRIVAL_EPSILON_SQ {
            self.hold();
            return;
        }

        self.at_destination = false;
        let direction = delta.normalize_or_zero();
        self.direction = if self.reversed { -direction } else { direction };
    }

    /// Stops pursuit until the next successful update.
    pub(crate) fn hold(&mut self) {
        self.at_destination = true;
        self.direction = Vec2::ZERO;
    }
}

/// Arena of sentinel points such as the pointer marker and supernova cores.
#[derive(Clone, Debug, Default)]
pub(crate) struct Anchors {
    slots: Vec<Option<Vec2>>,
    free: Vec<u32>,
}

impl Anchors {
    /// Places a new anchor, reusing a released slot when one is available.
    pub(crate) fn create(&mut self, position: Vec2) -> AnchorId {
        if let Some(slot) = self.free.pop() {
            if let Some(vacant) = self.slots.get_mut(slot as usize) {
                *vacant = Some(position);
                return AnchorId::new(slot);
            }
        }
        let id = AnchorId::new(self.slots.len() as u32);
        self.slots.push(Some(position));
        id
    }

    pub(crate) fn position(&self, id: AnchorId) -> Option<Vec2> {
        self.slots.get(id.get() as usize).copied().flatten()
    }

    /// Moves a live anchor. Released anchors stay released.
    pub(crate) fn set_position(&mut self, id: AnchorId, position: Vec2) {
        if let Some(Some(slot)) = self.slots.get_mut(id.get() as usize) {
            *slot = position;
        }
    }

    pub(crate) fn release(&mut self, id: AnchorId) {
        if let Some(slot) = self.slots.get_mut(id.get() as usize) {
            if slot.take().is_some() {
                self.free.push(id.get());
            }
        }
    }
}
