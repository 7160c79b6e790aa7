//! Onboarding wizard progress: a linear, resumable state machine persisted per user.

use crate::error::{InventoryError, InvariantViolation};
use crate::models::inventory::{ContainerId, HouseholdId, ItemRef, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Welcome,
    RoomSetup,
    PhotoTour,
    FirstContainer,
    FirstItem,
    Complete,
}

impl OnboardingStep {
    pub const ALL: [OnboardingStep; 6] = [
        OnboardingStep::Welcome,
        OnboardingStep::RoomSetup,
        OnboardingStep::PhotoTour,
        OnboardingStep::FirstContainer,
        OnboardingStep::FirstItem,
        OnboardingStep::Complete,
    ];

    pub fn index(self) -> i32 {
        match self {
            OnboardingStep::Welcome => 0,
            OnboardingStep::RoomSetup => 1,
            OnboardingStep::PhotoTour => 2,
            OnboardingStep::FirstContainer => 3,
            OnboardingStep::FirstItem => 4,
            OnboardingStep::Complete => 5,
        }
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        Self::from_index(self.index() - 1)
    }

    /// The four middle steps may jump straight to `Complete`.
    pub fn can_skip(self) -> bool {
        matches!(
            self,
            OnboardingStep::RoomSetup
                | OnboardingStep::PhotoTour
                | OnboardingStep::FirstContainer
                | OnboardingStep::FirstItem
        )
    }

    pub fn is_terminal(self) -> bool {
        self == OnboardingStep::Complete
    }
}

/// Snapshot of what the user has entered so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardData {
    pub household_id: Option<HouseholdId>,
    pub household_name: Option<String>,
    pub rooms: Vec<String>,
    pub first_container_id: Option<ContainerId>,
    pub first_item: Option<ItemRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OnboardingProgress {
    pub user_id: UserId,
    pub current_step: OnboardingStep,
    pub completed_steps: BTreeSet<OnboardingStep>,
    pub data: WizardData,
}

impl OnboardingProgress {
    pub fn new(user_id: UserId) -> Self {
        OnboardingProgress {
            user_id,
            current_step: OnboardingStep::Welcome,
            completed_steps: BTreeSet::new(),
            data: WizardData::default(),
        }
    }

    /// Record that the user stands on `step` with `data`. The step must be the current
    /// one, the one just after or before it, or `Complete` from a skippable step.
    /// Applying the same save twice leaves the same state.
    pub fn save_at(&mut self, step: OnboardingStep, data: WizardData) -> Result<(), InventoryError> {
        let from = self.current_step;
        let allowed = !from.is_terminal()
            && (step == from
                || from.next() == Some(step)
                || from.previous() == Some(step)
                || (step.is_terminal() && from.can_skip()));
        if !allowed {
            return Err(illegal(from, "save"));
        }
        if step > from {
            self.completed_steps.insert(from);
        } else if step < from {
            self.forget_from(step);
        }
        self.current_step = step;
        self.data = data;
        Ok(())
    }

    pub fn advance(&mut self) -> Result<OnboardingStep, InventoryError> {
        let from = self.current_step;
        let next = from.next().ok_or_else(|| illegal(from, "advance"))?;
        self.completed_steps.insert(from);
        self.current_step = next;
        Ok(next)
    }

    pub fn back(&mut self) -> Result<OnboardingStep, InventoryError> {
        let from = self.current_step;
        if from.is_terminal() {
            return Err(illegal(from, "go back"));
        }
        let previous = from.previous().ok_or_else(|| illegal(from, "go back"))?;
        self.forget_from(previous);
        self.current_step = previous;
        Ok(previous)
    }

    pub fn skip(&mut self) -> Result<OnboardingStep, InventoryError> {
        let from = self.current_step;
        if !from.can_skip() {
            return Err(illegal(from, "skip"));
        }
        self.current_step = OnboardingStep::Complete;
        Ok(OnboardingStep::Complete)
    }

    // steps at or after `step` are no longer done once the user walks back to it
    fn forget_from(&mut self, step: OnboardingStep) {
        self.completed_steps.retain(|s| *s < step);
    }
}

fn illegal(from: OnboardingStep, action: &'static str) -> InventoryError {
    InvariantViolation::IllegalTransition { from, action }.into()
}
