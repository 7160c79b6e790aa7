//! The persistence seam. Services talk to this trait; `PgStore` backs it with PostgreSQL
//! and `MemoryStore` with in-process maps.
//!
//! Every method is a single atomic write or read. Business rules live in the services,
//! not here: the store never checks roles, tenancy or containment.

use crate::error::StoreError;
use crate::models::inventory::*;
use crate::models::onboarding::OnboardingProgress;

pub type StoreResult<T> = Result<T, StoreError>;

/// Which active items to count when checking a delete.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ItemScope {
    Location(LocationId),
    Container(ContainerId),
}

/// Rows removed by an administrative purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeCounts {
    pub locations: usize,
    pub containers: usize,
    pub consumables: usize,
    pub non_consumables: usize,
    pub condition_logs: usize,
    pub activity: usize,
    pub shopping_lists: usize,
    pub list_items: usize,
    pub members: usize,
    /// Wizard records whose snapshot points at the household.
    pub onboarding: usize,
}

pub trait InventoryStore {
    // households & members
    fn insert_household(&mut self, name: &str) -> StoreResult<Household>;
    fn find_household(&mut self, id: HouseholdId) -> StoreResult<Option<Household>>;
    fn set_onboarding_completed(&mut self, id: HouseholdId, completed: bool) -> StoreResult<()>;
    /// Hard delete of the household and every row it owns.
    fn purge_household(&mut self, id: HouseholdId) -> StoreResult<PurgeCounts>;

    fn upsert_member(&mut self, household_id: HouseholdId, user_id: UserId, role: Role) -> StoreResult<Member>;
    fn delete_member(&mut self, household_id: HouseholdId, user_id: UserId) -> StoreResult<bool>;
    fn list_members(&mut self, household_id: HouseholdId) -> StoreResult<Vec<Member>>;

    // locations
    fn insert_location(&mut self, household_id: HouseholdId, input: &LocationInput) -> StoreResult<Location>;
    fn find_location(&mut self, id: LocationId) -> StoreResult<Option<Location>>;
    fn list_locations(&mut self, household_id: HouseholdId) -> StoreResult<Vec<Location>>;
    fn update_location(&mut self, location: &Location) -> StoreResult<Location>;

    // containers
    fn insert_container(&mut self, location: &Location, input: &ContainerInput) -> StoreResult<Container>;
    fn find_container(&mut self, id: ContainerId) -> StoreResult<Option<Container>>;
    fn list_containers(&mut self, location_id: LocationId) -> StoreResult<Vec<Container>>;
    fn update_container(&mut self, container: &Container) -> StoreResult<Container>;
    /// Soft-delete every active container of a location and drop their photo references.
    /// Returns the containers as they were before the update.
    fn deactivate_containers(&mut self, location_id: LocationId) -> StoreResult<Vec<Container>>;

    // items
    fn insert_consumable(&mut self, household_id: HouseholdId, input: &ConsumableInput) -> StoreResult<Consumable>;
    fn find_consumable(&mut self, id: ConsumableId) -> StoreResult<Option<Consumable>>;
    fn list_consumables(&mut self, household_id: HouseholdId) -> StoreResult<Vec<Consumable>>;
    /// Writes metadata, placement and `is_active`. `current_quantity` is left as stored.
    fn update_consumable(&mut self, item: &Consumable) -> StoreResult<Consumable>;
    fn set_consumable_quantity(&mut self, id: ConsumableId, quantity: i32) -> StoreResult<Consumable>;

    fn insert_non_consumable(
        &mut self,
        household_id: HouseholdId,
        input: &NonConsumableInput,
    ) -> StoreResult<NonConsumable>;
    fn find_non_consumable(&mut self, id: NonConsumableId) -> StoreResult<Option<NonConsumable>>;
    fn list_non_consumables(&mut self, household_id: HouseholdId) -> StoreResult<Vec<NonConsumable>>;
    fn update_non_consumable(&mut self, item: &NonConsumable) -> StoreResult<NonConsumable>;

    /// Active items of both kinds placed in the scope.
    fn count_active_items(&mut self, scope: ItemScope) -> StoreResult<i64>;

    // condition log
    fn insert_condition_log(
        &mut self,
        item: &NonConsumable,
        author_id: UserId,
        report: &ConditionReport,
    ) -> StoreResult<ConditionLogEntry>;
    /// Newest first (timestamp, then id).
    fn condition_logs(&mut self, item_id: NonConsumableId) -> StoreResult<Vec<ConditionLogEntry>>;

    // activity ledger
    fn insert_activity(&mut self, activity: &NewActivity) -> StoreResult<ActivityEntry>;
    /// Newest first, at most `limit` rows.
    fn recent_activity(&mut self, household_id: HouseholdId, limit: usize) -> StoreResult<Vec<ActivityEntry>>;

    // shopping lists
    fn insert_shopping_list(&mut self, household_id: HouseholdId, name: &str) -> StoreResult<ShoppingList>;
    fn find_shopping_list(&mut self, id: ShoppingListId) -> StoreResult<Option<ShoppingList>>;
    fn insert_list_item(&mut self, list: &ShoppingList, input: &ListItemInput) -> StoreResult<ListItem>;
    fn find_list_item(&mut self, id: ListItemId) -> StoreResult<Option<ListItem>>;
    fn update_list_item(&mut self, item: &ListItem) -> StoreResult<ListItem>;
    /// Oldest first.
    fn list_items(&mut self, list_id: ShoppingListId) -> StoreResult<Vec<ListItem>>;

    // onboarding
    fn load_onboarding(&mut self, user_id: UserId) -> StoreResult<Option<OnboardingProgress>>;
    fn save_onboarding(&mut self, progress: &OnboardingProgress) -> StoreResult<()>;
    fn delete_onboarding(&mut self, user_id: UserId) -> StoreResult<bool>;
}
