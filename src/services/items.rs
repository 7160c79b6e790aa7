//! Item CRUD for both kinds. Quantity and condition are not editable here: they move
//! through `adjust_quantity` and the condition log.

use serde_json::{Map, Value, json};

use crate::db::store::InventoryStore;
use crate::error::{InventoryError, InventoryResult};
use crate::models::inventory::*;
use crate::services::hierarchy::{optional_text, required_name};
use crate::services::inventory::Inventory;
use crate::services::realtime::{ChangeOp, ChangeTable};

fn non_negative_count(value: i32, field: &str) -> InventoryResult<i32> {
    if value < 0 {
        Err(InventoryError::validation(format!("{} cannot be negative", field)))
    } else {
        Ok(value)
    }
}

pub(crate) fn money(value: Option<f64>, field: &str) -> InventoryResult<Option<f64>> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err(InventoryError::validation(format!("{} must be a non-negative amount", field)))
        }
        other => Ok(other),
    }
}

/// Names of the fields a change set touches, for the ledger entry.
fn touched(fields: &[(&str, bool)]) -> Value {
    let names = fields
        .iter()
        .filter(|(_, set)| *set)
        .map(|(name, _)| Value::String(name.to_string()))
        .collect::<Vec<_>>();
    let mut map = Map::new();
    map.insert("fields".to_string(), Value::Array(names));
    Value::Object(map)
}

impl<S: InventoryStore> Inventory<S> {
    // =====================
    // Consumables
    // =====================

    /// Creation classifies stock but never emits a restock trigger.
    pub fn add_consumable(&mut self, actor: &Actor, input: &ConsumableInput) -> InventoryResult<Consumable> {
        Self::require_edit(actor)?;
        let input = ConsumableInput {
            placement: input.placement,
            name: required_name(&input.name, "item")?,
            brand: optional_text(input.brand.as_deref()),
            current_quantity: non_negative_count(input.current_quantity, "current quantity")?,
            reorder_threshold: non_negative_count(input.reorder_threshold, "reorder threshold")?,
            unit_cost: money(input.unit_cost, "unit cost")?,
            expiration_date: input.expiration_date,
        };
        self.check_placement(actor, &input.placement)?;
        let item = self.store.insert_consumable(actor.household_id, &input)?;
        self.publish(item.household_id, ChangeTable::Consumables, ChangeOp::Insert, item.id.0, &item);
        self.audit(
            actor,
            ActivityType::ItemAdded,
            format!("Added {} ({})", item.name, item.current_quantity),
            Some(ItemRef::Consumable(item.id)),
            json!({ "quantity": item.current_quantity, "reorder_threshold": item.reorder_threshold }),
        );
        Ok(item)
    }

    pub fn get_consumable(&mut self, actor: &Actor, id: ConsumableId) -> InventoryResult<Consumable> {
        self.consumable_for(actor, id)
    }

    pub fn list_consumables(&mut self, actor: &Actor) -> InventoryResult<Vec<Consumable>> {
        Ok(self.store.list_consumables(actor.household_id)?)
    }

    pub fn update_consumable(
        &mut self,
        actor: &Actor,
        id: ConsumableId,
        changes: &ConsumableChanges,
    ) -> InventoryResult<Consumable> {
        Self::require_edit(actor)?;
        let mut item = self.consumable_for(actor, id)?;
        if let Some(name) = &changes.name {
            item.name = required_name(name, "item")?;
        }
        if let Some(brand) = &changes.brand {
            item.brand = optional_text(brand.as_deref());
        }
        if let Some(threshold) = changes.reorder_threshold {
            item.reorder_threshold = non_negative_count(threshold, "reorder threshold")?;
        }
        if let Some(cost) = changes.unit_cost {
            item.unit_cost = money(cost, "unit cost")?;
        }
        if let Some(date) = changes.expiration_date {
            item.expiration_date = date;
        }
        let item = self.store.update_consumable(&item)?;
        self.publish(item.household_id, ChangeTable::Consumables, ChangeOp::Update, item.id.0, &item);
        self.audit(
            actor,
            ActivityType::ItemUpdated,
            format!("Updated {}", item.name),
            Some(ItemRef::Consumable(item.id)),
            touched(&[
                ("name", changes.name.is_some()),
                ("brand", changes.brand.is_some()),
                ("reorder_threshold", changes.reorder_threshold.is_some()),
                ("unit_cost", changes.unit_cost.is_some()),
                ("expiration_date", changes.expiration_date.is_some()),
            ]),
        );
        Ok(item)
    }

    pub fn delete_consumable(&mut self, actor: &Actor, id: ConsumableId) -> InventoryResult<()> {
        Self::require_edit(actor)?;
        let mut item = self.consumable_for(actor, id)?;
        item.is_active = false;
        let item = self.store.update_consumable(&item)?;
        self.publish(item.household_id, ChangeTable::Consumables, ChangeOp::Delete, item.id.0, &item);
        self.audit(
            actor,
            ActivityType::ItemDeleted,
            format!("Removed {}", item.name),
            Some(ItemRef::Consumable(item.id)),
            json!({ "quantity": item.current_quantity }),
        );
        Ok(())
    }

    // =====================
    // Non-consumables
    // =====================

    pub fn add_non_consumable(&mut self, actor: &Actor, input: &NonConsumableInput) -> InventoryResult<NonConsumable> {
        Self::require_edit(actor)?;
        let input = NonConsumableInput {
            placement: input.placement,
            name: required_name(&input.name, "item")?,
            brand: optional_text(input.brand.as_deref()),
            model: optional_text(input.model.as_deref()),
            serial_number: optional_text(input.serial_number.as_deref()),
            condition: input.condition,
            purchase_date: input.purchase_date,
            purchase_price: money(input.purchase_price, "purchase price")?,
            warranty_expiration: input.warranty_expiration,
        };
        self.check_placement(actor, &input.placement)?;
        let item = self.store.insert_non_consumable(actor.household_id, &input)?;
        self.publish(item.household_id, ChangeTable::NonConsumables, ChangeOp::Insert, item.id.0, &item);
        self.audit(
            actor,
            ActivityType::ItemAdded,
            format!("Added {}", item.name),
            Some(ItemRef::NonConsumable(item.id)),
            json!({ "condition": item.condition }),
        );
        Ok(item)
    }

    pub fn get_non_consumable(&mut self, actor: &Actor, id: NonConsumableId) -> InventoryResult<NonConsumable> {
        self.non_consumable_for(actor, id)
    }

    pub fn list_non_consumables(&mut self, actor: &Actor) -> InventoryResult<Vec<NonConsumable>> {
        Ok(self.store.list_non_consumables(actor.household_id)?)
    }

    pub fn update_non_consumable(
        &mut self,
        actor: &Actor,
        id: NonConsumableId,
        changes: &NonConsumableChanges,
    ) -> InventoryResult<NonConsumable> {
        Self::require_edit(actor)?;
        let mut item = self.non_consumable_for(actor, id)?;
        if let Some(name) = &changes.name {
            item.name = required_name(name, "item")?;
        }
        if let Some(brand) = &changes.brand {
            item.brand = optional_text(brand.as_deref());
        }
        if let Some(model) = &changes.model {
            item.model = optional_text(model.as_deref());
        }
        if let Some(serial) = &changes.serial_number {
            item.serial_number = optional_text(serial.as_deref());
        }
        if let Some(date) = changes.purchase_date {
            item.purchase_date = date;
        }
        if let Some(price) = changes.purchase_price {
            item.purchase_price = money(price, "purchase price")?;
        }
        if let Some(date) = changes.warranty_expiration {
            item.warranty_expiration = date;
        }
        let item = self.store.update_non_consumable(&item)?;
        self.publish(item.household_id, ChangeTable::NonConsumables, ChangeOp::Update, item.id.0, &item);
        self.audit(
            actor,
            ActivityType::ItemUpdated,
            format!("Updated {}", item.name),
            Some(ItemRef::NonConsumable(item.id)),
            touched(&[
                ("name", changes.name.is_some()),
                ("brand", changes.brand.is_some()),
                ("model", changes.model.is_some()),
                ("serial_number", changes.serial_number.is_some()),
                ("purchase_date", changes.purchase_date.is_some()),
                ("purchase_price", changes.purchase_price.is_some()),
                ("warranty_expiration", changes.warranty_expiration.is_some()),
            ]),
        );
        Ok(item)
    }

    pub fn delete_non_consumable(&mut self, actor: &Actor, id: NonConsumableId) -> InventoryResult<()> {
        Self::require_edit(actor)?;
        let mut item = self.non_consumable_for(actor, id)?;
        item.is_active = false;
        let item = self.store.update_non_consumable(&item)?;
        self.publish(item.household_id, ChangeTable::NonConsumables, ChangeOp::Delete, item.id.0, &item);
        self.audit(
            actor,
            ActivityType::ItemDeleted,
            format!("Removed {}", item.name),
            Some(ItemRef::NonConsumable(item.id)),
            Value::Object(Map::new()),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_rejects_negative_and_nan() {
        assert!(money(Some(-0.5), "unit cost").is_err());
        assert!(money(Some(f64::NAN), "unit cost").is_err());
        assert_eq!(money(Some(3.25), "unit cost").expect("valid"), Some(3.25));
        assert_eq!(money(None, "unit cost").expect("valid"), None);
    }

    #[test]
    fn touched_lists_only_set_fields() {
        let v = touched(&[("name", true), ("brand", false), ("unit_cost", true)]);
        assert_eq!(v, json!({ "fields": ["name", "unit_cost"] }));
    }
}
