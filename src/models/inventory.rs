//! Domain types for the household inventory.
//!
//! Notes
//! - Ids are `i64` newtypes matching the `BIGSERIAL` keys in the database.
//! - Enums serialize as snake_case strings; the same names are stored in text columns.
//! - Date/time fields use `chrono` (`DateTime<Utc>` for instants, `NaiveDate` for calendar dates).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =====================
// Scalar ID newtype wrappers
// =====================

macro_rules! id_newtype {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub i64);

            impl core::fmt::Display for $name {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

id_newtype!(
    HouseholdId,
    UserId,
    LocationId,
    ContainerId,
    ConsumableId,
    NonConsumableId,
    ConditionLogId,
    ActivityId,
    ShoppingListId,
    ListItemId,
);

// =====================
// Identity
// =====================

/// Role supplied by the identity provider. The core only derives capabilities from it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Employee,
    Viewer,
}

impl Role {
    pub fn can_edit(self) -> bool {
        matches!(self, Role::Admin | Role::Manager | Role::Employee)
    }

    pub fn can_manage_members(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// The acting household member for one request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub household_id: HouseholdId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, household_id: HouseholdId, role: Role) -> Self {
        Actor {
            user_id,
            household_id,
            role,
        }
    }
}

// =====================
// Enums
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerType {
    Shelf,
    Cabinet,
    Drawer,
    Box,
    Closet,
    Bin,
    Rack,
    Other,
}

/// Ordered best to worst.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionRating {
    Excellent,
    Good,
    Fair,
    Poor,
    Broken,
}

/// Derived from `(current_quantity, reorder_threshold)`; never stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Ok,
    Low,
    Critical,
    Out,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    ItemAdded,
    ItemUpdated,
    ItemDeleted,
    ItemMoved,
    QuantityChanged,
    ConditionLogged,
    LocationAdded,
    LocationUpdated,
    LocationDeleted,
    ContainerAdded,
    ContainerUpdated,
    ContainerDeleted,
    MemberJoined,
    MemberRemoved,
    ListCreated,
    ListItemAdded,
    ListItemPurchased,
    OnboardingCompleted,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Consumable,
    NonConsumable,
}

/// Reference to either item kind, as recorded in the activity ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
    Consumable(ConsumableId),
    NonConsumable(NonConsumableId),
}

impl ItemRef {
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemRef::Consumable(_) => ItemKind::Consumable,
            ItemRef::NonConsumable(_) => ItemKind::NonConsumable,
        }
    }

    pub fn raw_id(&self) -> i64 {
        match self {
            ItemRef::Consumable(id) => id.0,
            ItemRef::NonConsumable(id) => id.0,
        }
    }

    pub fn from_parts(kind: ItemKind, id: i64) -> Self {
        match kind {
            ItemKind::Consumable => ItemRef::Consumable(ConsumableId(id)),
            ItemKind::NonConsumable => ItemRef::NonConsumable(NonConsumableId(id)),
        }
    }
}

// =====================
// Storage hierarchy
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Household {
    pub id: HouseholdId,
    pub name: String,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub household_id: HouseholdId,
    pub user_id: UserId,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub household_id: HouseholdId,
    pub name: String,
    pub description: Option<String>,
    pub is_primary: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInput {
    pub name: String,
    pub description: Option<String>,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_primary: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub household_id: HouseholdId,
    pub location_id: LocationId,
    pub name: String,
    pub container_type: ContainerType,
    pub capacity_note: Option<String>,
    pub photo_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerInput {
    pub name: String,
    pub container_type: ContainerType,
    pub capacity_note: Option<String>,
}

/// Containers keep their location; items move, containers are recreated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerChanges {
    pub name: Option<String>,
    pub container_type: Option<ContainerType>,
    pub capacity_note: Option<Option<String>>,
}

/// Where an item lives. The container, when present, must sit in `location_id`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub location_id: LocationId,
    pub container_id: Option<ContainerId>,
}

impl Placement {
    pub fn in_location(location_id: LocationId) -> Self {
        Placement {
            location_id,
            container_id: None,
        }
    }

    pub fn in_container(location_id: LocationId, container_id: ContainerId) -> Self {
        Placement {
            location_id,
            container_id: Some(container_id),
        }
    }
}

// =====================
// Items
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consumable {
    pub id: ConsumableId,
    pub household_id: HouseholdId,
    pub placement: Placement,
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumableInput {
    pub placement: Placement,
    pub name: String,
    pub brand: Option<String>,
    pub current_quantity: i32,
    pub reorder_threshold: i32,
    pub unit_cost: Option<f64>,
    pub expiration_date: Option<NaiveDate>,
}

/// Editable consumable fields. Quantity is deliberately absent: it only moves through
/// `adjust_quantity`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumableChanges {
    pub name: Option<String>,
    pub brand: Option<Option<String>>,
    pub reorder_threshold: Option<i32>,
    pub unit_cost: Option<Option<f64>>,
    pub expiration_date: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonConsumable {
    pub id: NonConsumableId,
    pub household_id: HouseholdId,
    pub placement: Placement,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    /// Cached copy of the newest condition log rating.
    pub condition: Option<ConditionRating>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub warranty_expiration: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonConsumableInput {
    pub placement: Placement,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub condition: Option<ConditionRating>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub warranty_expiration: Option<NaiveDate>,
}

/// Editable non-consumable fields. Condition is absent: it is derived from the log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NonConsumableChanges {
    pub name: Option<String>,
    pub brand: Option<Option<String>>,
    pub model: Option<Option<String>>,
    pub serial_number: Option<Option<String>>,
    pub purchase_date: Option<Option<NaiveDate>>,
    pub purchase_price: Option<Option<f64>>,
    pub warranty_expiration: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionLogEntry {
    pub id: ConditionLogId,
    pub household_id: HouseholdId,
    pub item_id: NonConsumableId,
    pub rating: ConditionRating,
    pub notes: Option<String>,
    pub maintenance: Option<String>,
    pub repair_cost: Option<f64>,
    pub photo_urls: Vec<String>,
    pub author_id: UserId,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionReport {
    pub rating: ConditionRating,
    pub notes: Option<String>,
    pub maintenance: Option<String>,
    pub repair_cost: Option<f64>,
    pub photo_urls: Vec<String>,
}

impl ConditionReport {
    pub fn rating(rating: ConditionRating) -> Self {
        ConditionReport {
            rating,
            notes: None,
            maintenance: None,
            repair_cost: None,
            photo_urls: Vec::new(),
        }
    }
}

// =====================
// Activity ledger
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: ActivityId,
    pub household_id: HouseholdId,
    pub actor_id: UserId,
    pub activity_type: ActivityType,
    pub description: String,
    pub item: Option<ItemRef>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewActivity {
    pub household_id: HouseholdId,
    pub actor_id: UserId,
    pub activity_type: ActivityType,
    pub description: String,
    pub item: Option<ItemRef>,
    pub metadata: Value,
}

// =====================
// Shopping lists
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: ShoppingListId,
    pub household_id: HouseholdId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: ListItemId,
    pub household_id: HouseholdId,
    pub list_id: ShoppingListId,
    pub name: String,
    pub quantity: i32,
    pub notes: Option<String>,
    pub purchased: bool,
    pub purchased_by: Option<UserId>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItemInput {
    pub name: String,
    pub quantity: i32,
    pub notes: Option<String>,
}
