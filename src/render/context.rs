use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, ForgeResult};
use crate::render::surface::Tab;

/// Steps a render unit moves through, in order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Idle,
    FrameSet,
    TextSet,
    ArtSet,
    RaritySet,
    CollectorInfoSet,
    Submitted,
    Completed,
    Failed,
}

impl UnitState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitState::Completed | UnitState::Failed)
    }

    fn allows(&self, next: UnitState) -> bool {
        use UnitState::*;
        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (*self, next),
            (Idle, FrameSet)
                | (FrameSet, TextSet)
                | (TextSet, ArtSet)
                | (TextSet, RaritySet)
                | (ArtSet, RaritySet)
                | (RaritySet, CollectorInfoSet)
                | (CollectorInfoSet, Submitted)
                | (Submitted, Completed)
        )
    }
}

/// Per-unit processing context.
///
/// Carries the creator's selected tab so step code never relies on whatever
/// the previous step happened to leave open.
#[derive(Debug, Clone)]
pub struct UnitContext {
    seq: u32,
    state: UnitState,
    tab: Option<Tab>,
}

impl UnitContext {
    pub fn new(seq: u32) -> Self {
        Self {
            seq,
            state: UnitState::Idle,
            tab: None,
        }
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn tab(&self) -> Option<Tab> {
        self.tab
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = Some(tab);
    }

    pub fn advance(&mut self, next: UnitState) -> ForgeResult<()> {
        if !self.state.allows(next) {
            return Err(ForgeError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(seq = self.seq, from = ?self.state, to = ?next, "step");
        self.state = next;
        Ok(())
    }

    /// Mark the unit failed, returning the step it failed after.
    pub fn fail(&mut self) -> UnitState {
        let last = self.state;
        if !self.state.is_terminal() {
            self.state = UnitState::Failed;
        }
        last
    }
}
