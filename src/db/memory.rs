//! In-process `InventoryStore` backed by ordered maps.
//!
//! Used by the test suite and by `seed-demo --dry-run`. Semantics match `PgStore`:
//! ids are assigned from per-table sequences, timestamps come from `Utc::now()`, list
//! queries return active rows only, and the activity feed is newest first.

use chrono::Utc;
use std::collections::BTreeMap;

use crate::db::store::{InventoryStore, ItemScope, PurgeCounts, StoreResult};
use crate::error::StoreError;
use crate::models::inventory::*;
use crate::models::onboarding::OnboardingProgress;

#[derive(Debug, Default)]
struct Sequences {
    household: i64,
    location: i64,
    container: i64,
    consumable: i64,
    non_consumable: i64,
    condition_log: i64,
    activity: i64,
    shopping_list: i64,
    list_item: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    seq: Sequences,
    households: BTreeMap<HouseholdId, Household>,
    members: BTreeMap<(HouseholdId, UserId), Member>,
    locations: BTreeMap<LocationId, Location>,
    containers: BTreeMap<ContainerId, Container>,
    consumables: BTreeMap<ConsumableId, Consumable>,
    non_consumables: BTreeMap<NonConsumableId, NonConsumable>,
    condition_logs: BTreeMap<ConditionLogId, ConditionLogEntry>,
    activity: BTreeMap<ActivityId, ActivityEntry>,
    shopping_lists: BTreeMap<ShoppingListId, ShoppingList>,
    list_items: BTreeMap<ListItemId, ListItem>,
    onboarding: BTreeMap<UserId, OnboardingProgress>,
    failing_activity_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Make every activity ledger write fail as if the table were unreachable.
    pub fn fail_activity_writes(&mut self, fail: bool) {
        self.failing_activity_writes = fail;
    }

    /// Number of ledger rows for a household, including ones beyond any feed limit.
    pub fn activity_count(&self, household_id: HouseholdId) -> usize {
        self.activity.values().filter(|a| a.household_id == household_id).count()
    }

    fn missing(table: &str, id: i64) -> StoreError {
        StoreError::Corrupt(format!("{} row {} vanished during update", table, id))
    }
}

impl InventoryStore for MemoryStore {
    fn insert_household(&mut self, name: &str) -> StoreResult<Household> {
        let now = Utc::now();
        let household = Household {
            id: HouseholdId(next(&mut self.seq.household)),
            name: name.to_string(),
            onboarding_completed: false,
            created_at: now,
            updated_at: now,
        };
        self.households.insert(household.id, household.clone());
        Ok(household)
    }

    fn find_household(&mut self, id: HouseholdId) -> StoreResult<Option<Household>> {
        Ok(self.households.get(&id).cloned())
    }

    fn set_onboarding_completed(&mut self, id: HouseholdId, completed: bool) -> StoreResult<()> {
        if let Some(h) = self.households.get_mut(&id) {
            h.onboarding_completed = completed;
            h.updated_at = Utc::now();
        }
        Ok(())
    }

    fn purge_household(&mut self, id: HouseholdId) -> StoreResult<PurgeCounts> {
        fn drain<K: Ord, V>(map: &mut BTreeMap<K, V>, owned: impl Fn(&V) -> bool) -> usize {
            let before = map.len();
            map.retain(|_, v| !owned(v));
            before - map.len()
        }

        let counts = PurgeCounts {
            list_items: drain(&mut self.list_items, |r| r.household_id == id),
            shopping_lists: drain(&mut self.shopping_lists, |r| r.household_id == id),
            condition_logs: drain(&mut self.condition_logs, |r| r.household_id == id),
            activity: drain(&mut self.activity, |r| r.household_id == id),
            consumables: drain(&mut self.consumables, |r| r.household_id == id),
            non_consumables: drain(&mut self.non_consumables, |r| r.household_id == id),
            containers: drain(&mut self.containers, |r| r.household_id == id),
            locations: drain(&mut self.locations, |r| r.household_id == id),
            members: drain(&mut self.members, |r| r.household_id == id),
            onboarding: drain(&mut self.onboarding, |p| p.data.household_id == Some(id)),
        };
        self.households.remove(&id);
        Ok(counts)
    }

    fn upsert_member(&mut self, household_id: HouseholdId, user_id: UserId, role: Role) -> StoreResult<Member> {
        let member = self
            .members
            .entry((household_id, user_id))
            .and_modify(|m| m.role = role)
            .or_insert_with(|| Member {
                household_id,
                user_id,
                role,
                joined_at: Utc::now(),
            });
        Ok(member.clone())
    }

    fn delete_member(&mut self, household_id: HouseholdId, user_id: UserId) -> StoreResult<bool> {
        Ok(self.members.remove(&(household_id, user_id)).is_some())
    }

    fn list_members(&mut self, household_id: HouseholdId) -> StoreResult<Vec<Member>> {
        let mut out = self
            .members
            .values()
            .filter(|m| m.household_id == household_id)
            .cloned()
            .collect::<Vec<_>>();
        out.sort_by_key(|m| (m.joined_at, m.user_id));
        Ok(out)
    }

    fn insert_location(&mut self, household_id: HouseholdId, input: &LocationInput) -> StoreResult<Location> {
        let now = Utc::now();
        let location = Location {
            id: LocationId(next(&mut self.seq.location)),
            household_id,
            name: input.name.clone(),
            description: input.description.clone(),
            is_primary: input.is_primary,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.locations.insert(location.id, location.clone());
        Ok(location)
    }

    fn find_location(&mut self, id: LocationId) -> StoreResult<Option<Location>> {
        Ok(self.locations.get(&id).cloned())
    }

    fn list_locations(&mut self, household_id: HouseholdId) -> StoreResult<Vec<Location>> {
        let mut out = self
            .locations
            .values()
            .filter(|l| l.household_id == household_id && l.is_active)
            .cloned()
            .collect::<Vec<_>>();
        out.sort_by(|a, b| {
            b.is_primary
                .cmp(&a.is_primary)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(out)
    }

    fn update_location(&mut self, location: &Location) -> StoreResult<Location> {
        let slot = self
            .locations
            .get_mut(&location.id)
            .ok_or_else(|| Self::missing("locations", location.id.0))?;
        *slot = Location {
            updated_at: Utc::now(),
            ..location.clone()
        };
        Ok(slot.clone())
    }

    fn insert_container(&mut self, location: &Location, input: &ContainerInput) -> StoreResult<Container> {
        let now = Utc::now();
        let container = Container {
            id: ContainerId(next(&mut self.seq.container)),
            household_id: location.household_id,
            location_id: location.id,
            name: input.name.clone(),
            container_type: input.container_type,
            capacity_note: input.capacity_note.clone(),
            photo_url: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.containers.insert(container.id, container.clone());
        Ok(container)
    }

    fn find_container(&mut self, id: ContainerId) -> StoreResult<Option<Container>> {
        Ok(self.containers.get(&id).cloned())
    }

    fn list_containers(&mut self, location_id: LocationId) -> StoreResult<Vec<Container>> {
        let mut out = self
            .containers
            .values()
            .filter(|c| c.location_id == location_id && c.is_active)
            .cloned()
            .collect::<Vec<_>>();
        out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    fn update_container(&mut self, container: &Container) -> StoreResult<Container> {
        let slot = self
            .containers
            .get_mut(&container.id)
            .ok_or_else(|| Self::missing("containers", container.id.0))?;
        *slot = Container {
            updated_at: Utc::now(),
            ..container.clone()
        };
        Ok(slot.clone())
    }

    fn deactivate_containers(&mut self, location_id: LocationId) -> StoreResult<Vec<Container>> {
        let now = Utc::now();
        let mut before = Vec::new();
        for c in self.containers.values_mut() {
            if c.location_id == location_id && c.is_active {
                before.push(c.clone());
                c.is_active = false;
                c.photo_url = None;
                c.updated_at = now;
            }
        }
        Ok(before)
    }

    fn insert_consumable(&mut self, household_id: HouseholdId, input: &ConsumableInput) -> StoreResult<Consumable> {
        let now = Utc::now();
        let item = Consumable {
            id: ConsumableId(next(&mut self.seq.consumable)),
            household_id,
            placement: input.placement,
            name: input.name.clone(),
            brand: input.brand.clone(),
            current_quantity: input.current_quantity,
            reorder_threshold: input.reorder_threshold,
            unit_cost: input.unit_cost,
            expiration_date: input.expiration_date,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.consumables.insert(item.id, item.clone());
        Ok(item)
    }

    fn find_consumable(&mut self, id: ConsumableId) -> StoreResult<Option<Consumable>> {
        Ok(self.consumables.get(&id).cloned())
    }

    fn list_consumables(&mut self, household_id: HouseholdId) -> StoreResult<Vec<Consumable>> {
        let mut out = self
            .consumables
            .values()
            .filter(|i| i.household_id == household_id && i.is_active)
            .cloned()
            .collect::<Vec<_>>();
        out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    fn update_consumable(&mut self, item: &Consumable) -> StoreResult<Consumable> {
        let slot = self
            .consumables
            .get_mut(&item.id)
            .ok_or_else(|| Self::missing("consumables", item.id.0))?;
        *slot = Consumable {
            current_quantity: slot.current_quantity,
            updated_at: Utc::now(),
            ..item.clone()
        };
        Ok(slot.clone())
    }

    fn set_consumable_quantity(&mut self, id: ConsumableId, quantity: i32) -> StoreResult<Consumable> {
        let slot = self
            .consumables
            .get_mut(&id)
            .ok_or_else(|| Self::missing("consumables", id.0))?;
        slot.current_quantity = quantity;
        slot.updated_at = Utc::now();
        Ok(slot.clone())
    }

    fn insert_non_consumable(
        &mut self,
        household_id: HouseholdId,
        input: &NonConsumableInput,
    ) -> StoreResult<NonConsumable> {
        let now = Utc::now();
        let item = NonConsumable {
            id: NonConsumableId(next(&mut self.seq.non_consumable)),
            household_id,
            placement: input.placement,
            name: input.name.clone(),
            brand: input.brand.clone(),
            model: input.model.clone(),
            serial_number: input.serial_number.clone(),
            condition: input.condition,
            purchase_date: input.purchase_date,
            purchase_price: input.purchase_price,
            warranty_expiration: input.warranty_expiration,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.non_consumables.insert(item.id, item.clone());
        Ok(item)
    }

    fn find_non_consumable(&mut self, id: NonConsumableId) -> StoreResult<Option<NonConsumable>> {
        Ok(self.non_consumables.get(&id).cloned())
    }

    fn list_non_consumables(&mut self, household_id: HouseholdId) -> StoreResult<Vec<NonConsumable>> {
        let mut out = self
            .non_consumables
            .values()
            .filter(|i| i.household_id == household_id && i.is_active)
            .cloned()
            .collect::<Vec<_>>();
        out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    fn update_non_consumable(&mut self, item: &NonConsumable) -> StoreResult<NonConsumable> {
        let slot = self
            .non_consumables
            .get_mut(&item.id)
            .ok_or_else(|| Self::missing("non_consumables", item.id.0))?;
        *slot = NonConsumable {
            updated_at: Utc::now(),
            ..item.clone()
        };
        Ok(slot.clone())
    }

    fn count_active_items(&mut self, scope: ItemScope) -> StoreResult<i64> {
        let in_scope = |placement: &Placement| match scope {
            ItemScope::Location(id) => placement.location_id == id,
            ItemScope::Container(id) => placement.container_id == Some(id),
        };
        let consumables = self
            .consumables
            .values()
            .filter(|i| i.is_active && in_scope(&i.placement))
            .count();
        let non_consumables = self
            .non_consumables
            .values()
            .filter(|i| i.is_active && in_scope(&i.placement))
            .count();
        Ok((consumables + non_consumables) as i64)
    }

    fn insert_condition_log(
        &mut self,
        item: &NonConsumable,
        author_id: UserId,
        report: &ConditionReport,
    ) -> StoreResult<ConditionLogEntry> {
        let entry = ConditionLogEntry {
            id: ConditionLogId(next(&mut self.seq.condition_log)),
            household_id: item.household_id,
            item_id: item.id,
            rating: report.rating,
            notes: report.notes.clone(),
            maintenance: report.maintenance.clone(),
            repair_cost: report.repair_cost,
            photo_urls: report.photo_urls.clone(),
            author_id,
            logged_at: Utc::now(),
        };
        self.condition_logs.insert(entry.id, entry.clone());
        Ok(entry)
    }

    fn condition_logs(&mut self, item_id: NonConsumableId) -> StoreResult<Vec<ConditionLogEntry>> {
        let mut out = self
            .condition_logs
            .values()
            .filter(|e| e.item_id == item_id)
            .cloned()
            .collect::<Vec<_>>();
        out.sort_by(|a, b| b.logged_at.cmp(&a.logged_at).then_with(|| b.id.cmp(&a.id)));
        Ok(out)
    }

    fn insert_activity(&mut self, activity: &NewActivity) -> StoreResult<ActivityEntry> {
        if self.failing_activity_writes {
            return Err(StoreError::Unavailable("activity_log".to_string()));
        }
        let entry = ActivityEntry {
            id: ActivityId(next(&mut self.seq.activity)),
            household_id: activity.household_id,
            actor_id: activity.actor_id,
            activity_type: activity.activity_type,
            description: activity.description.clone(),
            item: activity.item,
            metadata: activity.metadata.clone(),
            created_at: Utc::now(),
        };
        self.activity.insert(entry.id, entry.clone());
        Ok(entry)
    }

    fn recent_activity(&mut self, household_id: HouseholdId, limit: usize) -> StoreResult<Vec<ActivityEntry>> {
        // ids ascend with insertion, so walking the map backwards is newest first
        Ok(self
            .activity
            .values()
            .rev()
            .filter(|a| a.household_id == household_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn insert_shopping_list(&mut self, household_id: HouseholdId, name: &str) -> StoreResult<ShoppingList> {
        let list = ShoppingList {
            id: ShoppingListId(next(&mut self.seq.shopping_list)),
            household_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.shopping_lists.insert(list.id, list.clone());
        Ok(list)
    }

    fn find_shopping_list(&mut self, id: ShoppingListId) -> StoreResult<Option<ShoppingList>> {
        Ok(self.shopping_lists.get(&id).cloned())
    }

    fn insert_list_item(&mut self, list: &ShoppingList, input: &ListItemInput) -> StoreResult<ListItem> {
        let item = ListItem {
            id: ListItemId(next(&mut self.seq.list_item)),
            household_id: list.household_id,
            list_id: list.id,
            name: input.name.clone(),
            quantity: input.quantity,
            notes: input.notes.clone(),
            purchased: false,
            purchased_by: None,
            purchased_at: None,
            created_at: Utc::now(),
        };
        self.list_items.insert(item.id, item.clone());
        Ok(item)
    }

    fn find_list_item(&mut self, id: ListItemId) -> StoreResult<Option<ListItem>> {
        Ok(self.list_items.get(&id).cloned())
    }

    fn update_list_item(&mut self, item: &ListItem) -> StoreResult<ListItem> {
        let slot = self
            .list_items
            .get_mut(&item.id)
            .ok_or_else(|| Self::missing("shopping_list_items", item.id.0))?;
        *slot = item.clone();
        Ok(slot.clone())
    }

    fn list_items(&mut self, list_id: ShoppingListId) -> StoreResult<Vec<ListItem>> {
        Ok(self
            .list_items
            .values()
            .filter(|i| i.list_id == list_id)
            .cloned()
            .collect())
    }

    fn load_onboarding(&mut self, user_id: UserId) -> StoreResult<Option<OnboardingProgress>> {
        Ok(self.onboarding.get(&user_id).cloned())
    }

    fn save_onboarding(&mut self, progress: &OnboardingProgress) -> StoreResult<()> {
        self.onboarding.insert(progress.user_id, progress.clone());
        Ok(())
    }

    fn delete_onboarding(&mut self, user_id: UserId) -> StoreResult<bool> {
        Ok(self.onboarding.remove(&user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kitchen(store: &mut MemoryStore) -> (Household, Location) {
        let household = store.insert_household("Smiths").expect("household");
        let location = store
            .insert_location(
                household.id,
                &LocationInput {
                    name: "Kitchen".into(),
                    ..LocationInput::default()
                },
            )
            .expect("location");
        (household, location)
    }

    #[test]
    fn counts_only_active_items_in_scope() {
        let mut store = MemoryStore::new();
        let (household, location) = kitchen(&mut store);
        let input = ConsumableInput {
            placement: Placement::in_location(location.id),
            name: "Rice".into(),
            brand: None,
            current_quantity: 1,
            reorder_threshold: 0,
            unit_cost: None,
            expiration_date: None,
        };
        let rice = store.insert_consumable(household.id, &input).expect("insert");
        assert_eq!(store.count_active_items(ItemScope::Location(location.id)).unwrap(), 1);

        let mut retired = rice.clone();
        retired.is_active = false;
        store.update_consumable(&retired).expect("update");
        assert_eq!(store.count_active_items(ItemScope::Location(location.id)).unwrap(), 0);
    }

    #[test]
    fn stale_metadata_write_keeps_stored_quantity() {
        let mut store = MemoryStore::new();
        let (household, location) = kitchen(&mut store);
        let input = ConsumableInput {
            placement: Placement::in_location(location.id),
            name: "Coffee".into(),
            brand: None,
            current_quantity: 5,
            reorder_threshold: 3,
            unit_cost: None,
            expiration_date: None,
        };
        let read_earlier = store.insert_consumable(household.id, &input).expect("insert");
        store.set_consumable_quantity(read_earlier.id, 2).expect("adjust");

        let mut renamed = read_earlier.clone();
        renamed.name = "Decaf".into();
        let stored = store.update_consumable(&renamed).expect("update");
        assert_eq!(stored.name, "Decaf");
        assert_eq!(stored.current_quantity, 2);
    }

    #[test]
    fn purge_removes_only_the_target_household() {
        let mut store = MemoryStore::new();
        let (smiths, _) = kitchen(&mut store);
        let (joneses, _) = kitchen(&mut store);
        let counts = store.purge_household(smiths.id).expect("purge");
        assert_eq!(counts.locations, 1);
        assert!(store.find_household(smiths.id).unwrap().is_none());
        assert_eq!(store.list_locations(joneses.id).unwrap().len(), 1);
    }

    #[test]
    fn purge_clears_wizard_records_pointing_at_the_household() {
        use crate::models::onboarding::{OnboardingStep, WizardData};

        let mut store = MemoryStore::new();
        let (smiths, _) = kitchen(&mut store);
        let (joneses, _) = kitchen(&mut store);
        for (user, household) in [(UserId(1), smiths.id), (UserId(2), joneses.id)] {
            let mut progress = OnboardingProgress::new(user);
            progress
                .save_at(
                    OnboardingStep::RoomSetup,
                    WizardData {
                        household_id: Some(household),
                        ..WizardData::default()
                    },
                )
                .expect("save");
            store.save_onboarding(&progress).expect("store");
        }

        let counts = store.purge_household(smiths.id).expect("purge");
        assert_eq!(counts.onboarding, 1);
        assert!(store.load_onboarding(UserId(1)).unwrap().is_none());
        assert!(store.load_onboarding(UserId(2)).unwrap().is_some());
    }

    #[test]
    fn deactivating_containers_clears_photos() {
        let mut store = MemoryStore::new();
        let (_, location) = kitchen(&mut store);
        let mut shelf = store
            .insert_container(
                &location,
                &ContainerInput {
                    name: "Top shelf".into(),
                    container_type: ContainerType::Shelf,
                    capacity_note: None,
                },
            )
            .expect("container");
        shelf.photo_url = Some("https://photos.example/shelf.jpg".into());
        store.update_container(&shelf).expect("update");

        let before = store.deactivate_containers(location.id).expect("deactivate");
        assert_eq!(before.len(), 1);
        assert!(before[0].photo_url.is_some());
        let after = store.find_container(shelf.id).unwrap().expect("row kept");
        assert!(!after.is_active);
        assert!(after.photo_url.is_none());
    }
}
