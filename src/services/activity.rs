//! Activity ledger: explicit appends and the recent-activity feed.

use log::debug;
use serde_json::Value;

use crate::db::store::InventoryStore;
use crate::error::InventoryResult;
use crate::models::inventory::*;
use crate::services::inventory::Inventory;
use crate::services::realtime::{ChangeOp, ChangeTable};

impl<S: InventoryStore> Inventory<S> {
    /// Append an entry on behalf of `actor`. The ledger records what it is given and fails
    /// only when the store does; unlike the audit writes made by other operations, that
    /// failure is returned to the caller.
    pub fn record_activity(
        &mut self,
        actor: &Actor,
        activity_type: ActivityType,
        description: &str,
        item: Option<ItemRef>,
        metadata: Option<Value>,
    ) -> InventoryResult<ActivityEntry> {
        let entry = self.store.insert_activity(&NewActivity {
            household_id: actor.household_id,
            actor_id: actor.user_id,
            activity_type,
            description: description.trim().to_string(),
            item,
            metadata: metadata.unwrap_or_else(|| Value::Object(Default::default())),
        })?;
        self.publish(
            entry.household_id,
            ChangeTable::ActivityLog,
            ChangeOp::Insert,
            entry.id.0,
            &entry,
        );
        Ok(entry)
    }

    /// Newest first. `limit` is clamped to the configured feed size.
    pub fn list_recent(&mut self, actor: &Actor, limit: usize) -> InventoryResult<Vec<ActivityEntry>> {
        let limit = limit.min(self.options.activity_feed_limit);
        let entries = self.store.recent_activity(actor.household_id, limit)?;
        debug!(
            "Activity: {} entr(ies) for household {} (limit {})",
            entries.len(),
            actor.household_id,
            limit
        );
        Ok(entries)
    }
}
