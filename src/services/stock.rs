//! Stock state engine.
//!
//! Status is a pure function of `(current_quantity, reorder_threshold)` and is never
//! stored. `adjust_quantity` is the only path that changes a quantity; it emits a restock
//! trigger whenever an item drops into a worse band (leaving `Ok` included).

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::store::InventoryStore;
use crate::error::{InventoryError, InventoryResult, InvariantViolation};
use crate::models::inventory::*;
use crate::services::inventory::Inventory;
use crate::services::realtime::{ChangeOp, ChangeTable};

/// A zero threshold disables tracking. Otherwise: empty is `Out`, at or below half the
/// threshold is `Critical`, at or below the threshold is `Low`.
pub fn stock_status(current_quantity: i32, reorder_threshold: i32) -> StockStatus {
    if reorder_threshold <= 0 {
        return StockStatus::Ok;
    }
    let current = i64::from(current_quantity);
    let threshold = i64::from(reorder_threshold);
    if current <= 0 {
        StockStatus::Out
    } else if current * 2 <= threshold {
        StockStatus::Critical
    } else if current <= threshold {
        StockStatus::Low
    } else {
        StockStatus::Ok
    }
}

/// True when `after` is a strictly worse band than `before`. Staying in a band or
/// recovering never triggers.
pub fn crosses_into_restock(before: StockStatus, after: StockStatus) -> bool {
    urgency(after) < urgency(before)
}

/// Units needed to bring the item back above its threshold.
pub fn suggested_restock_quantity(current_quantity: i32, reorder_threshold: i32) -> i32 {
    reorder_threshold
        .saturating_sub(current_quantity.max(0))
        .saturating_add(1)
        .max(1)
}

impl Consumable {
    pub fn stock_status(&self) -> StockStatus {
        stock_status(self.current_quantity, self.reorder_threshold)
    }
}

/// Notification for the shopping list. Acting on it is up to the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockTrigger {
    pub household_id: HouseholdId,
    pub item_id: ConsumableId,
    pub item_name: String,
    pub status: StockStatus,
    pub current_quantity: i32,
    pub suggested_quantity: i32,
}

impl RestockTrigger {
    fn for_item(item: &Consumable) -> Self {
        RestockTrigger {
            household_id: item.household_id,
            item_id: item.id,
            item_name: item.name.clone(),
            status: item.stock_status(),
            current_quantity: item.current_quantity,
            suggested_quantity: suggested_restock_quantity(item.current_quantity, item.reorder_threshold),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuantityAdjustment {
    pub item: Consumable,
    pub previous_quantity: i32,
    pub previous_status: StockStatus,
    pub status: StockStatus,
    pub restock: Option<RestockTrigger>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LowStockItem {
    pub item: Consumable,
    pub status: StockStatus,
    pub suggested_quantity: i32,
}

fn urgency(status: StockStatus) -> u8 {
    match status {
        StockStatus::Out => 0,
        StockStatus::Critical => 1,
        StockStatus::Low => 2,
        StockStatus::Ok => 3,
    }
}

impl<S: InventoryStore> Inventory<S> {
    /// Apply a signed delta. A result below zero is refused and the quantity is left as
    /// it was. Concurrent adjustments resolve last-write-wins at the store.
    pub fn adjust_quantity(&mut self, actor: &Actor, id: ConsumableId, delta: i32) -> InventoryResult<QuantityAdjustment> {
        Self::require_edit(actor)?;
        if delta == 0 {
            return Err(InventoryError::validation("quantity delta must not be zero"));
        }
        let item = self.consumable_for(actor, id)?;
        let previous_quantity = item.current_quantity;
        let next = previous_quantity
            .checked_add(delta)
            .ok_or_else(|| InventoryError::validation("quantity out of range"))?;
        if next < 0 {
            return Err(InvariantViolation::NegativeQuantity {
                current: previous_quantity,
                delta,
            }
            .into());
        }

        let previous_status = item.stock_status();
        let item = self.store.set_consumable_quantity(item.id, next)?;
        let status = item.stock_status();
        self.publish(item.household_id, ChangeTable::Consumables, ChangeOp::Update, item.id.0, &item);
        self.audit(
            actor,
            ActivityType::QuantityChanged,
            format!("{}: {} -> {}", item.name, previous_quantity, item.current_quantity),
            Some(ItemRef::Consumable(item.id)),
            json!({
                "old_quantity": previous_quantity,
                "new_quantity": item.current_quantity,
                "delta": delta,
                "status": status,
            }),
        );

        let restock = crosses_into_restock(previous_status, status).then(|| RestockTrigger::for_item(&item));
        if let Some(trigger) = &restock {
            debug!(
                "Stock: {} in household {} is {:?}, suggesting {}",
                trigger.item_name, trigger.household_id, trigger.status, trigger.suggested_quantity
            );
        }
        Ok(QuantityAdjustment {
            item,
            previous_quantity,
            previous_status,
            status,
            restock,
        })
    }

    pub fn get_stock_status(&mut self, actor: &Actor, id: ConsumableId) -> InventoryResult<StockStatus> {
        Ok(self.consumable_for(actor, id)?.stock_status())
    }

    /// Active consumables that need restocking, most urgent first.
    pub fn low_stock(&mut self, actor: &Actor) -> InventoryResult<Vec<LowStockItem>> {
        let mut out = self
            .store
            .list_consumables(actor.household_id)?
            .into_iter()
            .filter_map(|item| {
                let status = item.stock_status();
                (status != StockStatus::Ok).then(|| LowStockItem {
                    suggested_quantity: suggested_restock_quantity(item.current_quantity, item.reorder_threshold),
                    status,
                    item,
                })
            })
            .collect::<Vec<_>>();
        out.sort_by(|a, b| {
            urgency(a.status)
                .cmp(&urgency(b.status))
                .then_with(|| a.item.name.cmp(&b.item.name))
        });
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_covers_every_band() {
        assert_eq!(stock_status(0, 0), StockStatus::Ok);
        assert_eq!(stock_status(5, 0), StockStatus::Ok);
        assert_eq!(stock_status(0, 4), StockStatus::Out);
        assert_eq!(stock_status(1, 4), StockStatus::Critical);
        assert_eq!(stock_status(2, 4), StockStatus::Critical);
        assert_eq!(stock_status(3, 4), StockStatus::Low);
        assert_eq!(stock_status(4, 4), StockStatus::Low);
        assert_eq!(stock_status(5, 4), StockStatus::Ok);
    }

    #[test]
    fn odd_thresholds_round_critical_down() {
        // 2 * 1 <= 3 but 2 * 2 > 3
        assert_eq!(stock_status(1, 3), StockStatus::Critical);
        assert_eq!(stock_status(2, 3), StockStatus::Low);
        assert_eq!(stock_status(1, 1), StockStatus::Low);
    }

    #[test]
    fn classification_is_total_over_small_grid() {
        for threshold in 0..12 {
            for current in 0..30 {
                let status = stock_status(current, threshold);
                if threshold == 0 || current > threshold {
                    assert_eq!(status, StockStatus::Ok, "current={current} threshold={threshold}");
                } else {
                    assert_ne!(status, StockStatus::Ok, "current={current} threshold={threshold}");
                }
            }
        }
    }

    #[test]
    fn only_worsening_triggers() {
        assert!(crosses_into_restock(StockStatus::Ok, StockStatus::Low));
        assert!(crosses_into_restock(StockStatus::Ok, StockStatus::Out));
        assert!(crosses_into_restock(StockStatus::Low, StockStatus::Out));
        assert!(crosses_into_restock(StockStatus::Critical, StockStatus::Out));
        assert!(!crosses_into_restock(StockStatus::Low, StockStatus::Low));
        assert!(!crosses_into_restock(StockStatus::Out, StockStatus::Ok));
        assert!(!crosses_into_restock(StockStatus::Critical, StockStatus::Low));
        assert!(!crosses_into_restock(StockStatus::Ok, StockStatus::Ok));
    }

    #[test]
    fn suggestion_lifts_above_threshold() {
        assert_eq!(suggested_restock_quantity(2, 4), 3);
        assert_eq!(suggested_restock_quantity(0, 10), 11);
        assert_eq!(stock_status(2 + suggested_restock_quantity(2, 4), 4), StockStatus::Ok);
        assert_eq!(suggested_restock_quantity(9, 4), 1);
    }
}
