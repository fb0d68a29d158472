// ==========================================
// Space Stowage - Domain enums
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Item lifecycle state
// ==========================================
// Unplaced -> Stowed <-> Retrieved -> Waste -> Disposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemState {
    Unplaced,
    Stowed,
    Retrieved,
    Waste,
    Disposed,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Unplaced => "Unplaced",
            ItemState::Stowed => "Stowed",
            ItemState::Retrieved => "Retrieved",
            ItemState::Waste => "Waste",
            ItemState::Disposed => "Disposed",
        }
    }

    /// States from which an explicit place/confirm is allowed.
    pub fn is_placeable(&self) -> bool {
        matches!(
            self,
            ItemState::Unplaced | ItemState::Retrieved | ItemState::Stowed | ItemState::Waste
        )
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// Waste reason (Expired ranks over Depleted)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WasteReason {
    Expired,
    Depleted,
}

impl fmt::Display for WasteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WasteReason::Expired => write!(f, "Expired"),
            WasteReason::Depleted => write!(f, "Depleted"),
        }
    }
}

// ==========================================
// Step action for retrieval / rearrangement / return plans
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    Move,
    Remove,
    Place,
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepAction::Move => write!(f, "move"),
            StepAction::Remove => write!(f, "remove"),
            StepAction::Place => write!(f, "place"),
        }
    }
}
