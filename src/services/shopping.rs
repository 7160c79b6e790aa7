//! Shopping lists: the consumer of restock triggers.

use chrono::Utc;
use log::debug;
use serde_json::json;

use crate::db::store::InventoryStore;
use crate::error::{InventoryError, InventoryResult};
use crate::models::inventory::*;
use crate::services::hierarchy::{optional_text, required_name};
use crate::services::inventory::Inventory;
use crate::services::realtime::{ChangeOp, ChangeTable};
use crate::services::stock::RestockTrigger;

impl<S: InventoryStore> Inventory<S> {
    fn shopping_list_for(&mut self, actor: &Actor, id: ShoppingListId) -> InventoryResult<ShoppingList> {
        let list = self
            .store
            .find_shopping_list(id)?
            .ok_or_else(|| InventoryError::not_found("shopping_list", id.0))?;
        Self::require_tenant(actor, list.household_id)?;
        Ok(list)
    }

    pub fn create_shopping_list(&mut self, actor: &Actor, name: &str) -> InventoryResult<ShoppingList> {
        Self::require_edit(actor)?;
        let name = required_name(name, "shopping list")?;
        let list = self.store.insert_shopping_list(actor.household_id, &name)?;
        self.audit(
            actor,
            ActivityType::ListCreated,
            format!("Created shopping list {}", list.name),
            None,
            json!({ "list_id": list.id }),
        );
        Ok(list)
    }

    pub fn add_list_item(
        &mut self,
        actor: &Actor,
        list_id: ShoppingListId,
        input: &ListItemInput,
    ) -> InventoryResult<ListItem> {
        Self::require_edit(actor)?;
        let list = self.shopping_list_for(actor, list_id)?;
        if input.quantity <= 0 {
            return Err(InventoryError::validation("list item quantity must be positive"));
        }
        let input = ListItemInput {
            name: required_name(&input.name, "list item")?,
            quantity: input.quantity,
            notes: optional_text(input.notes.as_deref()),
        };
        self.insert_list_entry(actor, &list, &input)
    }

    /// Records who bought it and when. Marking an already purchased entry is a no-op.
    pub fn mark_purchased(&mut self, actor: &Actor, id: ListItemId) -> InventoryResult<ListItem> {
        Self::require_edit(actor)?;
        let mut entry = self
            .store
            .find_list_item(id)?
            .ok_or_else(|| InventoryError::not_found("list_item", id.0))?;
        Self::require_tenant(actor, entry.household_id)?;
        if entry.purchased {
            return Ok(entry);
        }
        entry.purchased = true;
        entry.purchased_by = Some(actor.user_id);
        entry.purchased_at = Some(Utc::now());
        let entry = self.store.update_list_item(&entry)?;
        self.publish(entry.household_id, ChangeTable::ShoppingListItems, ChangeOp::Update, entry.id.0, &entry);
        self.audit(
            actor,
            ActivityType::ListItemPurchased,
            format!("Bought {} x{}", entry.name, entry.quantity),
            None,
            json!({ "list_id": entry.list_id, "list_item_id": entry.id }),
        );
        Ok(entry)
    }

    /// Oldest first.
    pub fn list_items(&mut self, actor: &Actor, list_id: ShoppingListId) -> InventoryResult<Vec<ListItem>> {
        self.shopping_list_for(actor, list_id)?;
        Ok(self.store.list_items(list_id)?)
    }

    /// Add the trigger's item unless an unpurchased entry with the same name (ignoring
    /// case) is already on the list. Returns the new entry, or `None` when deduplicated.
    pub fn apply_restock_trigger(
        &mut self,
        actor: &Actor,
        list_id: ShoppingListId,
        trigger: &RestockTrigger,
    ) -> InventoryResult<Option<ListItem>> {
        Self::require_edit(actor)?;
        Self::require_tenant(actor, trigger.household_id)?;
        let list = self.shopping_list_for(actor, list_id)?;
        let wanted = trigger.item_name.trim().to_lowercase();
        let pending = self
            .store
            .list_items(list.id)?
            .into_iter()
            .any(|e| !e.purchased && e.name.trim().to_lowercase() == wanted);
        if pending {
            debug!("Shopping: {} already pending on list {}", trigger.item_name, list.id);
            return Ok(None);
        }
        let input = ListItemInput {
            name: trigger.item_name.clone(),
            quantity: trigger.suggested_quantity.max(1),
            notes: Some(format!("Restock: {:?}, {} left", trigger.status, trigger.current_quantity)),
        };
        self.insert_list_entry(actor, &list, &input).map(Some)
    }

    fn insert_list_entry(&mut self, actor: &Actor, list: &ShoppingList, input: &ListItemInput) -> InventoryResult<ListItem> {
        let entry = self.store.insert_list_item(list, input)?;
        self.publish(entry.household_id, ChangeTable::ShoppingListItems, ChangeOp::Insert, entry.id.0, &entry);
        self.audit(
            actor,
            ActivityType::ListItemAdded,
            format!("Added {} x{} to {}", entry.name, entry.quantity, list.name),
            None,
            json!({ "list_id": list.id, "list_item_id": entry.id }),
        );
        Ok(entry)
    }
}
