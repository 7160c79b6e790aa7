//! Condition tracker for non-consumables. The log is append-only; an item's current
//! condition is the rating of its newest entry.

use serde_json::json;

use crate::db::store::InventoryStore;
use crate::error::{InventoryResult, InvariantViolation};
use crate::models::inventory::*;
use crate::services::inventory::Inventory;
use crate::services::items::money;
use crate::services::realtime::{ChangeOp, ChangeTable};
use crate::utils::non_blank;

/// Entry with the latest `logged_at`; equal timestamps fall back to the higher id.
pub fn current_condition(entries: &[ConditionLogEntry]) -> Option<&ConditionLogEntry> {
    entries.iter().max_by_key(|e| (e.logged_at, e.id))
}

impl<S: InventoryStore> Inventory<S> {
    pub fn log_condition(
        &mut self,
        actor: &Actor,
        item_id: NonConsumableId,
        report: &ConditionReport,
    ) -> InventoryResult<ConditionLogEntry> {
        Self::require_edit(actor)?;
        let item = self.non_consumable_for(actor, item_id)?;
        let report = ConditionReport {
            rating: report.rating,
            notes: report.notes.as_deref().and_then(non_blank).map(str::to_string),
            maintenance: report.maintenance.as_deref().and_then(non_blank).map(str::to_string),
            repair_cost: money(report.repair_cost, "repair cost")?,
            photo_urls: report
                .photo_urls
                .iter()
                .filter_map(|u| non_blank(u))
                .map(str::to_string)
                .collect(),
        };

        let entry = self.store.insert_condition_log(&item, actor.user_id, &report)?;
        self.publish(entry.household_id, ChangeTable::ConditionLogs, ChangeOp::Insert, entry.id.0, &entry);

        // Keep the cached column in line with the log, which may hold a later entry.
        let history = self.store.condition_logs(item_id)?;
        let rating = current_condition(&history).map_or(entry.rating, |e| e.rating);
        if item.condition != Some(rating) {
            let refreshed = self.store.update_non_consumable(&NonConsumable {
                condition: Some(rating),
                ..item.clone()
            })?;
            self.publish(
                refreshed.household_id,
                ChangeTable::NonConsumables,
                ChangeOp::Update,
                refreshed.id.0,
                &refreshed,
            );
        }

        self.audit(
            actor,
            ActivityType::ConditionLogged,
            format!("{} is now {:?}", item.name, entry.rating),
            Some(ItemRef::NonConsumable(item.id)),
            json!({
                "rating": entry.rating,
                "previous": item.condition,
                "repair_cost": entry.repair_cost,
                "photos": entry.photo_urls.len(),
            }),
        );
        Ok(entry)
    }

    /// Newest first.
    pub fn condition_history(&mut self, actor: &Actor, item_id: NonConsumableId) -> InventoryResult<Vec<ConditionLogEntry>> {
        self.non_consumable_for(actor, item_id)?;
        Ok(self.store.condition_logs(item_id)?)
    }

    /// From the log when it has entries, else the value set at creation.
    pub fn current_condition_of(
        &mut self,
        actor: &Actor,
        item_id: NonConsumableId,
    ) -> InventoryResult<Option<ConditionRating>> {
        let item = self.non_consumable_for(actor, item_id)?;
        let history = self.store.condition_logs(item_id)?;
        Ok(current_condition(&history).map(|e| e.rating).or(item.condition))
    }

    /// Only while nothing has been logged; afterwards the log owns the value.
    pub fn set_initial_condition(
        &mut self,
        actor: &Actor,
        item_id: NonConsumableId,
        rating: ConditionRating,
    ) -> InventoryResult<NonConsumable> {
        Self::require_edit(actor)?;
        let mut item = self.non_consumable_for(actor, item_id)?;
        if !self.store.condition_logs(item_id)?.is_empty() {
            return Err(InvariantViolation::ConditionIsLogged { item_id }.into());
        }
        item.condition = Some(rating);
        let item = self.store.update_non_consumable(&item)?;
        self.publish(item.household_id, ChangeTable::NonConsumables, ChangeOp::Update, item.id.0, &item);
        self.audit(
            actor,
            ActivityType::ItemUpdated,
            format!("Set condition of {} to {:?}", item.name, rating),
            Some(ItemRef::NonConsumable(item.id)),
            json!({ "fields": ["condition"] }),
        );
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(id: i64, minute: u32, rating: ConditionRating) -> ConditionLogEntry {
        ConditionLogEntry {
            id: ConditionLogId(id),
            household_id: HouseholdId(1),
            item_id: NonConsumableId(1),
            rating,
            notes: None,
            maintenance: None,
            repair_cost: None,
            photo_urls: Vec::new(),
            author_id: UserId(1),
            logged_at: Utc.with_ymd_and_hms(2025, 3, 1, 10, minute, 0).unwrap(),
        }
    }

    #[test]
    fn latest_timestamp_wins_regardless_of_order() {
        let entries = vec![
            entry(3, 0, ConditionRating::Good),
            entry(1, 30, ConditionRating::Poor),
            entry(2, 15, ConditionRating::Excellent),
        ];
        assert_eq!(current_condition(&entries).map(|e| e.rating), Some(ConditionRating::Poor));
    }

    #[test]
    fn equal_timestamps_fall_back_to_highest_id() {
        let entries = vec![
            entry(8, 5, ConditionRating::Fair),
            entry(9, 5, ConditionRating::Broken),
            entry(7, 5, ConditionRating::Good),
        ];
        assert_eq!(current_condition(&entries).map(|e| e.id), Some(ConditionLogId(9)));
    }

    #[test]
    fn empty_log_has_no_current_condition() {
        assert!(current_condition(&[]).is_none());
    }
}
