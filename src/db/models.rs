//! Diesel row structs and their conversion into domain types.
//!
//! Enum columns are plain text holding the serde name of the variant; conversion
//! failures surface as `StoreError::Corrupt` rather than panics.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;

use crate::db::store::StoreResult;
use crate::error::StoreError;
use crate::models::inventory::*;
use crate::models::onboarding::{OnboardingProgress, OnboardingStep, WizardData};
use crate::schema;
use crate::utils::{decode_json, parse_serde_enum, serde_enum_name};

fn column_enum<T: serde::de::DeserializeOwned>(table: &str, column: &str, value: &str) -> StoreResult<T> {
    parse_serde_enum(value).map_err(|e| StoreError::Corrupt(format!("{}.{}: {}", table, column, e)))
}

fn enum_column<T: serde::Serialize>(value: &T) -> String {
    serde_enum_name(value).unwrap_or_default()
}

// =====================
// households / members
// =====================

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::households)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HouseholdRow {
    pub id: i64,
    pub name: String,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::households)]
pub struct NewHouseholdRow<'a> {
    pub name: &'a str,
}

impl From<HouseholdRow> for Household {
    fn from(row: HouseholdRow) -> Self {
        Household {
            id: HouseholdId(row.id),
            name: row.name,
            onboarding_completed: row.onboarding_completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schema::household_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MemberRow {
    pub household_id: i64,
    pub user_id: i64,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::household_members)]
pub struct NewMemberRow {
    pub household_id: i64,
    pub user_id: i64,
    pub role: String,
}

impl MemberRow {
    pub fn into_domain(self) -> StoreResult<Member> {
        Ok(Member {
            household_id: HouseholdId(self.household_id),
            user_id: UserId(self.user_id),
            role: column_enum("household_members", "role", &self.role)?,
            joined_at: self.joined_at,
        })
    }
}

impl NewMemberRow {
    pub fn new(household_id: HouseholdId, user_id: UserId, role: Role) -> Self {
        NewMemberRow {
            household_id: household_id.0,
            user_id: user_id.0,
            role: enum_column(&role),
        }
    }
}

// =====================
// locations
// =====================

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::locations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LocationRow {
    pub id: i64,
    pub household_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_primary: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::locations)]
pub struct NewLocationRow<'a> {
    pub household_id: i64,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub is_primary: bool,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = schema::locations)]
#[diesel(treat_none_as_null = true)]
pub struct LocationChangeset<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub is_primary: bool,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<LocationRow> for Location {
    fn from(row: LocationRow) -> Self {
        Location {
            id: LocationId(row.id),
            household_id: HouseholdId(row.household_id),
            name: row.name,
            description: row.description,
            is_primary: row.is_primary,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl<'a> NewLocationRow<'a> {
    pub fn new(household_id: HouseholdId, input: &'a LocationInput) -> Self {
        NewLocationRow {
            household_id: household_id.0,
            name: &input.name,
            description: input.description.as_deref(),
            is_primary: input.is_primary,
        }
    }
}

impl<'a> LocationChangeset<'a> {
    pub fn new(location: &'a Location) -> Self {
        LocationChangeset {
            name: &location.name,
            description: location.description.as_deref(),
            is_primary: location.is_primary,
            is_active: location.is_active,
            updated_at: Utc::now(),
        }
    }
}

// =====================
// containers
// =====================

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::containers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ContainerRow {
    pub id: i64,
    pub household_id: i64,
    pub location_id: i64,
    pub name: String,
    pub container_type: String,
    pub capacity_note: Option<String>,
    pub photo_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::containers)]
pub struct NewContainerRow<'a> {
    pub household_id: i64,
    pub location_id: i64,
    pub name: &'a str,
    pub container_type: String,
    pub capacity_note: Option<&'a str>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = schema::containers)]
#[diesel(treat_none_as_null = true)]
pub struct ContainerChangeset<'a> {
    pub location_id: i64,
    pub name: &'a str,
    pub container_type: String,
    pub capacity_note: Option<&'a str>,
    pub photo_url: Option<&'a str>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl ContainerRow {
    pub fn into_domain(self) -> StoreResult<Container> {
        Ok(Container {
            id: ContainerId(self.id),
            household_id: HouseholdId(self.household_id),
            location_id: LocationId(self.location_id),
            container_type: column_enum("containers", "container_type", &self.container_type)?,
            name: self.name,
            capacity_note: self.capacity_note,
            photo_url: self.photo_url,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl<'a> NewContainerRow<'a> {
    pub fn new(location: &Location, input: &'a ContainerInput) -> Self {
        NewContainerRow {
            household_id: location.household_id.0,
            location_id: location.id.0,
            name: &input.name,
            container_type: enum_column(&input.container_type),
            capacity_note: input.capacity_note.as_deref(),
        }
    }
}

impl<'a> ContainerChangeset<'a> {
    pub fn new(container: &'a Container) -> Self {
        ContainerChangeset {
            location_id: container.location_id.0,
            name: &container.name,
            container_type: enum_column(&container.container_type),
            capacity_note: container.capacity_note.as_deref(),
            photo_url: container.photo_url.as_deref(),
            is_active: container.is_active,
            updated_at: Utc::now(),
        }
    }
}

// =====================
// consumables
// =====================

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::consumables)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ConsumableRow {
    pub id: i64,
    pub household_id: i64,
    pub location_id: i64,
    pub container_id: Option<i64>,
    pub name: String,
    pub brand: Option<String>,
    pub current_quantity: i32,
    pub reorder_threshold: i32,
    pub unit_cost: Option<f64>,
    pub expiration_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::consumables)]
pub struct NewConsumableRow<'a> {
    pub household_id: i64,
    pub location_id: i64,
    pub container_id: Option<i64>,
    pub name: &'a str,
    pub brand: Option<&'a str>,
    pub current_quantity: i32,
    pub reorder_threshold: i32,
    pub unit_cost: Option<f64>,
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = schema::consumables)]
#[diesel(treat_none_as_null = true)]
pub struct ConsumableChangeset<'a> {
    pub location_id: i64,
    pub container_id: Option<i64>,
    pub name: &'a str,
    pub brand: Option<&'a str>,
    pub reorder_threshold: i32,
    pub unit_cost: Option<f64>,
    pub expiration_date: Option<NaiveDate>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<ConsumableRow> for Consumable {
    fn from(row: ConsumableRow) -> Self {
        Consumable {
            id: ConsumableId(row.id),
            household_id: HouseholdId(row.household_id),
            placement: Placement {
                location_id: LocationId(row.location_id),
                container_id: row.container_id.map(ContainerId),
            },
            name: row.name,
            brand: row.brand,
            current_quantity: row.current_quantity,
            reorder_threshold: row.reorder_threshold,
            unit_cost: row.unit_cost,
            expiration_date: row.expiration_date,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl<'a> NewConsumableRow<'a> {
    pub fn new(household_id: HouseholdId, input: &'a ConsumableInput) -> Self {
        NewConsumableRow {
            household_id: household_id.0,
            location_id: input.placement.location_id.0,
            container_id: input.placement.container_id.map(|c| c.0),
            name: &input.name,
            brand: input.brand.as_deref(),
            current_quantity: input.current_quantity,
            reorder_threshold: input.reorder_threshold,
            unit_cost: input.unit_cost,
            expiration_date: input.expiration_date,
        }
    }
}

impl<'a> ConsumableChangeset<'a> {
    pub fn new(item: &'a Consumable) -> Self {
        ConsumableChangeset {
            location_id: item.placement.location_id.0,
            container_id: item.placement.container_id.map(|c| c.0),
            name: &item.name,
            brand: item.brand.as_deref(),
            reorder_threshold: item.reorder_threshold,
            unit_cost: item.unit_cost,
            expiration_date: item.expiration_date,
            is_active: item.is_active,
            updated_at: Utc::now(),
        }
    }
}

// =====================
// non-consumables
// =====================

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::non_consumables)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NonConsumableRow {
    pub id: i64,
    pub household_id: i64,
    pub location_id: i64,
    pub container_id: Option<i64>,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub condition: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub warranty_expiration: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::non_consumables)]
pub struct NewNonConsumableRow<'a> {
    pub household_id: i64,
    pub location_id: i64,
    pub container_id: Option<i64>,
    pub name: &'a str,
    pub brand: Option<&'a str>,
    pub model: Option<&'a str>,
    pub serial_number: Option<&'a str>,
    pub condition: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub warranty_expiration: Option<NaiveDate>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = schema::non_consumables)]
#[diesel(treat_none_as_null = true)]
pub struct NonConsumableChangeset<'a> {
    pub location_id: i64,
    pub container_id: Option<i64>,
    pub name: &'a str,
    pub brand: Option<&'a str>,
    pub model: Option<&'a str>,
    pub serial_number: Option<&'a str>,
    pub condition: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub warranty_expiration: Option<NaiveDate>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl NonConsumableRow {
    pub fn into_domain(self) -> StoreResult<NonConsumable> {
        let condition = match self.condition.as_deref() {
            Some(c) => Some(column_enum("non_consumables", "condition", c)?),
            None => None,
        };
        Ok(NonConsumable {
            id: NonConsumableId(self.id),
            household_id: HouseholdId(self.household_id),
            placement: Placement {
                location_id: LocationId(self.location_id),
                container_id: self.container_id.map(ContainerId),
            },
            name: self.name,
            brand: self.brand,
            model: self.model,
            serial_number: self.serial_number,
            condition,
            purchase_date: self.purchase_date,
            purchase_price: self.purchase_price,
            warranty_expiration: self.warranty_expiration,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl<'a> NewNonConsumableRow<'a> {
    pub fn new(household_id: HouseholdId, input: &'a NonConsumableInput) -> Self {
        NewNonConsumableRow {
            household_id: household_id.0,
            location_id: input.placement.location_id.0,
            container_id: input.placement.container_id.map(|c| c.0),
            name: &input.name,
            brand: input.brand.as_deref(),
            model: input.model.as_deref(),
            serial_number: input.serial_number.as_deref(),
            condition: input.condition.as_ref().map(enum_column),
            purchase_date: input.purchase_date,
            purchase_price: input.purchase_price,
            warranty_expiration: input.warranty_expiration,
        }
    }
}

impl<'a> NonConsumableChangeset<'a> {
    pub fn new(item: &'a NonConsumable) -> Self {
        NonConsumableChangeset {
            location_id: item.placement.location_id.0,
            container_id: item.placement.container_id.map(|c| c.0),
            name: &item.name,
            brand: item.brand.as_deref(),
            model: item.model.as_deref(),
            serial_number: item.serial_number.as_deref(),
            condition: item.condition.as_ref().map(enum_column),
            purchase_date: item.purchase_date,
            purchase_price: item.purchase_price,
            warranty_expiration: item.warranty_expiration,
            is_active: item.is_active,
            updated_at: Utc::now(),
        }
    }
}

// =====================
// condition_logs
// =====================

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::condition_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ConditionLogRow {
    pub id: i64,
    pub household_id: i64,
    pub item_id: i64,
    pub rating: String,
    pub notes: Option<String>,
    pub maintenance: Option<String>,
    pub repair_cost: Option<f64>,
    pub photo_urls: Vec<String>,
    pub author_id: i64,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::condition_logs)]
pub struct NewConditionLogRow<'a> {
    pub household_id: i64,
    pub item_id: i64,
    pub rating: String,
    pub notes: Option<&'a str>,
    pub maintenance: Option<&'a str>,
    pub repair_cost: Option<f64>,
    pub photo_urls: Vec<String>,
    pub author_id: i64,
}

impl ConditionLogRow {
    pub fn into_domain(self) -> StoreResult<ConditionLogEntry> {
        Ok(ConditionLogEntry {
            id: ConditionLogId(self.id),
            household_id: HouseholdId(self.household_id),
            item_id: NonConsumableId(self.item_id),
            rating: column_enum("condition_logs", "rating", &self.rating)?,
            notes: self.notes,
            maintenance: self.maintenance,
            repair_cost: self.repair_cost,
            photo_urls: self.photo_urls,
            author_id: UserId(self.author_id),
            logged_at: self.logged_at,
        })
    }
}

impl<'a> NewConditionLogRow<'a> {
    pub fn new(item: &NonConsumable, author_id: UserId, report: &'a ConditionReport) -> Self {
        NewConditionLogRow {
            household_id: item.household_id.0,
            item_id: item.id.0,
            rating: enum_column(&report.rating),
            notes: report.notes.as_deref(),
            maintenance: report.maintenance.as_deref(),
            repair_cost: report.repair_cost,
            photo_urls: report.photo_urls.clone(),
            author_id: author_id.0,
        }
    }
}

// =====================
// activity_log
// =====================

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::activity_log)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ActivityRow {
    pub id: i64,
    pub household_id: i64,
    pub actor_id: i64,
    pub activity_type: String,
    pub description: String,
    pub item_kind: Option<String>,
    pub item_id: Option<i64>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::activity_log)]
pub struct NewActivityRow<'a> {
    pub household_id: i64,
    pub actor_id: i64,
    pub activity_type: String,
    pub description: &'a str,
    pub item_kind: Option<String>,
    pub item_id: Option<i64>,
    pub metadata: Value,
}

impl ActivityRow {
    pub fn into_domain(self) -> StoreResult<ActivityEntry> {
        let item = match (self.item_kind.as_deref(), self.item_id) {
            (Some(kind), Some(id)) => Some(ItemRef::from_parts(
                column_enum("activity_log", "item_kind", kind)?,
                id,
            )),
            _ => None,
        };
        Ok(ActivityEntry {
            id: ActivityId(self.id),
            household_id: HouseholdId(self.household_id),
            actor_id: UserId(self.actor_id),
            activity_type: column_enum("activity_log", "activity_type", &self.activity_type)?,
            description: self.description,
            item,
            metadata: self.metadata,
            created_at: self.created_at,
        })
    }
}

impl<'a> NewActivityRow<'a> {
    pub fn new(activity: &'a NewActivity) -> Self {
        NewActivityRow {
            household_id: activity.household_id.0,
            actor_id: activity.actor_id.0,
            activity_type: enum_column(&activity.activity_type),
            description: &activity.description,
            item_kind: activity.item.as_ref().map(|i| enum_column(&i.kind())),
            item_id: activity.item.as_ref().map(ItemRef::raw_id),
            metadata: activity.metadata.clone(),
        }
    }
}

// =====================
// shopping lists
// =====================

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::shopping_lists)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ShoppingListRow {
    pub id: i64,
    pub household_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::shopping_lists)]
pub struct NewShoppingListRow<'a> {
    pub household_id: i64,
    pub name: &'a str,
}

impl From<ShoppingListRow> for ShoppingList {
    fn from(row: ShoppingListRow) -> Self {
        ShoppingList {
            id: ShoppingListId(row.id),
            household_id: HouseholdId(row.household_id),
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::shopping_list_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ListItemRow {
    pub id: i64,
    pub household_id: i64,
    pub list_id: i64,
    pub name: String,
    pub quantity: i32,
    pub notes: Option<String>,
    pub purchased: bool,
    pub purchased_by: Option<i64>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::shopping_list_items)]
pub struct NewListItemRow<'a> {
    pub household_id: i64,
    pub list_id: i64,
    pub name: &'a str,
    pub quantity: i32,
    pub notes: Option<&'a str>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = schema::shopping_list_items)]
#[diesel(treat_none_as_null = true)]
pub struct ListItemChangeset<'a> {
    pub name: &'a str,
    pub quantity: i32,
    pub notes: Option<&'a str>,
    pub purchased: bool,
    pub purchased_by: Option<i64>,
    pub purchased_at: Option<DateTime<Utc>>,
}

impl From<ListItemRow> for ListItem {
    fn from(row: ListItemRow) -> Self {
        ListItem {
            id: ListItemId(row.id),
            household_id: HouseholdId(row.household_id),
            list_id: ShoppingListId(row.list_id),
            name: row.name,
            quantity: row.quantity,
            notes: row.notes,
            purchased: row.purchased,
            purchased_by: row.purchased_by.map(UserId),
            purchased_at: row.purchased_at,
            created_at: row.created_at,
        }
    }
}

impl<'a> NewListItemRow<'a> {
    pub fn new(list: &ShoppingList, input: &'a ListItemInput) -> Self {
        NewListItemRow {
            household_id: list.household_id.0,
            list_id: list.id.0,
            name: &input.name,
            quantity: input.quantity,
            notes: input.notes.as_deref(),
        }
    }
}

impl<'a> ListItemChangeset<'a> {
    pub fn new(item: &'a ListItem) -> Self {
        ListItemChangeset {
            name: &item.name,
            quantity: item.quantity,
            notes: item.notes.as_deref(),
            purchased: item.purchased,
            purchased_by: item.purchased_by.map(|u| u.0),
            purchased_at: item.purchased_at,
        }
    }
}

// =====================
// onboarding_progress
// =====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schema::onboarding_progress)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OnboardingRow {
    pub user_id: i64,
    pub current_step: i32,
    pub completed_steps: Vec<i32>,
    pub data: Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = schema::onboarding_progress)]
pub struct OnboardingUpsertRow {
    pub user_id: i64,
    pub current_step: i32,
    pub completed_steps: Vec<i32>,
    pub data: Value,
    pub updated_at: DateTime<Utc>,
}

impl OnboardingRow {
    pub fn into_domain(self) -> StoreResult<OnboardingProgress> {
        let step = |index: i32| {
            OnboardingStep::from_index(index)
                .ok_or_else(|| StoreError::Corrupt(format!("onboarding_progress: step index {}", index)))
        };
        let current_step = step(self.current_step)?;
        let completed_steps = self.completed_steps.into_iter().map(step).collect::<StoreResult<_>>()?;
        let data: WizardData =
            decode_json(self.data).map_err(|e| StoreError::Corrupt(format!("onboarding_progress.data: {}", e)))?;
        Ok(OnboardingProgress {
            user_id: UserId(self.user_id),
            current_step,
            completed_steps,
            data,
        })
    }
}

impl OnboardingUpsertRow {
    pub fn new(progress: &OnboardingProgress) -> StoreResult<Self> {
        let data = serde_json::to_value(&progress.data)
            .map_err(|e| StoreError::Corrupt(format!("onboarding_progress.data: {}", e)))?;
        Ok(OnboardingUpsertRow {
            user_id: progress.user_id.0,
            current_step: progress.current_step.index(),
            completed_steps: progress.completed_steps.iter().map(|s| s.index()).collect(),
            data,
            updated_at: Utc::now(),
        })
    }
}
