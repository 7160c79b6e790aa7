//! Persistence and side effects of the onboarding wizard. Transition rules live in
//! `models::onboarding`; every accepted transition is upserted, keyed by user.

use log::info;
use serde_json::json;

use crate::db::store::InventoryStore;
use crate::error::{InventoryError, InventoryResult};
use crate::models::inventory::*;
use crate::models::onboarding::{OnboardingProgress, OnboardingStep, WizardData};
use crate::services::inventory::Inventory;

impl<S: InventoryStore> Inventory<S> {
    /// Stored progress, or a fresh `Welcome` record on first entry.
    pub fn resume_onboarding(&mut self, user_id: UserId) -> InventoryResult<OnboardingProgress> {
        if let Some(progress) = self.store.load_onboarding(user_id)? {
            return Ok(progress);
        }
        let progress = OnboardingProgress::new(user_id);
        self.store.save_onboarding(&progress)?;
        Ok(progress)
    }

    /// Idempotent: repeating the same save leaves the same record. The step may only be
    /// the current one or a neighbour of it; saving at `Complete` from a middle step
    /// finishes the wizard.
    pub fn save_onboarding_step(
        &mut self,
        user_id: UserId,
        step: OnboardingStep,
        data: WizardData,
    ) -> InventoryResult<OnboardingProgress> {
        let mut progress = self.resume_onboarding(user_id)?;
        progress.save_at(step, data)?;
        self.commit_onboarding(progress)
    }

    pub fn advance_onboarding(&mut self, user_id: UserId) -> InventoryResult<OnboardingProgress> {
        let mut progress = self.resume_onboarding(user_id)?;
        progress.advance()?;
        self.commit_onboarding(progress)
    }

    pub fn back_onboarding(&mut self, user_id: UserId) -> InventoryResult<OnboardingProgress> {
        let mut progress = self.resume_onboarding(user_id)?;
        progress.back()?;
        self.commit_onboarding(progress)
    }

    pub fn skip_onboarding(&mut self, user_id: UserId) -> InventoryResult<OnboardingProgress> {
        let mut progress = self.resume_onboarding(user_id)?;
        progress.skip()?;
        self.commit_onboarding(progress)
    }

    /// Throw away stored progress and start again at `Welcome`.
    pub fn reset_onboarding(&mut self, user_id: UserId) -> InventoryResult<OnboardingProgress> {
        self.store.delete_onboarding(user_id)?;
        self.resume_onboarding(user_id)
    }

    fn commit_onboarding(&mut self, progress: OnboardingProgress) -> InventoryResult<OnboardingProgress> {
        if !progress.current_step.is_terminal() {
            self.store.save_onboarding(&progress)?;
            return Ok(progress);
        }

        // Complete: clear the record and flag the household, when one was created.
        if let Some(household_id) = progress.data.household_id {
            let is_member = self
                .store
                .list_members(household_id)?
                .iter()
                .any(|m| m.user_id == progress.user_id);
            if !is_member {
                return Err(InventoryError::CrossTenantAccess);
            }
            self.store.set_onboarding_completed(household_id, true)?;
            let actor = Actor::new(progress.user_id, household_id, Role::Admin);
            self.audit(
                &actor,
                ActivityType::OnboardingCompleted,
                "Finished household setup".to_string(),
                None,
                json!({
                    "skipped": progress.completed_steps.len() < OnboardingStep::ALL.len() - 1,
                    "rooms": progress.data.rooms.len(),
                }),
            );
        }
        self.store.delete_onboarding(progress.user_id)?;
        info!("Onboarding finished for user {}", progress.user_id);
        Ok(progress)
    }
}
