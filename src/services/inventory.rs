//! The service facade: one `Inventory` per client session, owning its store handle and
//! sharing the realtime bus with every other session.
//!
//! Operations are split across the sibling modules (`hierarchy`, `stock`, `condition`,
//! `activity`, `onboarding`, `shopping`) as further `impl` blocks on this type. Shared
//! access checks, the best-effort audit write and change publication live here.

use log::warn;
use serde::Serialize;
use serde_json::Value;

use crate::db::store::InventoryStore;
use crate::error::{InventoryError, InventoryResult};
use crate::models::inventory::*;
use crate::services::photos::{NoPhotoStorage, PhotoStorage};
use crate::services::realtime::{ChangeOp, ChangeTable, RealtimeBus};

pub const DEFAULT_ACTIVITY_FEED_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryOptions {
    /// Upper bound for `list_recent`.
    pub activity_feed_limit: usize,
    /// Whether the administrative hard delete is enabled at all.
    pub allow_data_purge: bool,
}

impl Default for InventoryOptions {
    fn default() -> Self {
        InventoryOptions {
            activity_feed_limit: DEFAULT_ACTIVITY_FEED_LIMIT,
            allow_data_purge: false,
        }
    }
}

pub struct Inventory<S: InventoryStore> {
    pub(crate) store: S,
    pub(crate) bus: RealtimeBus,
    pub(crate) photos: Box<dyn PhotoStorage>,
    pub(crate) options: InventoryOptions,
}

impl<S: InventoryStore> Inventory<S> {
    pub fn new(store: S, bus: RealtimeBus) -> Self {
        Inventory {
            store,
            bus,
            photos: Box::new(NoPhotoStorage),
            options: InventoryOptions::default(),
        }
    }

    pub fn with_photo_storage(mut self, photos: impl PhotoStorage + 'static) -> Self {
        self.photos = Box::new(photos);
        self
    }

    pub fn with_options(mut self, options: InventoryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn bus(&self) -> &RealtimeBus {
        &self.bus
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // =====================
    // Access checks
    // =====================

    pub(crate) fn require_edit(actor: &Actor) -> InventoryResult<()> {
        if actor.role.can_edit() {
            Ok(())
        } else {
            Err(InventoryError::PermissionDenied)
        }
    }

    pub(crate) fn require_member_admin(actor: &Actor) -> InventoryResult<()> {
        if actor.role.can_manage_members() {
            Ok(())
        } else {
            Err(InventoryError::PermissionDenied)
        }
    }

    pub(crate) fn require_tenant(actor: &Actor, household_id: HouseholdId) -> InventoryResult<()> {
        if actor.household_id == household_id {
            Ok(())
        } else {
            Err(InventoryError::CrossTenantAccess)
        }
    }

    /// Active location owned by the actor's household.
    pub(crate) fn location_for(&mut self, actor: &Actor, id: LocationId) -> InventoryResult<Location> {
        let location = self
            .store
            .find_location(id)?
            .ok_or_else(|| InventoryError::not_found("location", id.0))?;
        Self::require_tenant(actor, location.household_id)?;
        if !location.is_active {
            return Err(InventoryError::not_found("location", id.0));
        }
        Ok(location)
    }

    pub(crate) fn container_for(&mut self, actor: &Actor, id: ContainerId) -> InventoryResult<Container> {
        let container = self
            .store
            .find_container(id)?
            .ok_or_else(|| InventoryError::not_found("container", id.0))?;
        Self::require_tenant(actor, container.household_id)?;
        if !container.is_active {
            return Err(InventoryError::not_found("container", id.0));
        }
        Ok(container)
    }

    pub(crate) fn consumable_for(&mut self, actor: &Actor, id: ConsumableId) -> InventoryResult<Consumable> {
        let item = self
            .store
            .find_consumable(id)?
            .ok_or_else(|| InventoryError::not_found("consumable", id.0))?;
        Self::require_tenant(actor, item.household_id)?;
        if !item.is_active {
            return Err(InventoryError::not_found("consumable", id.0));
        }
        Ok(item)
    }

    pub(crate) fn non_consumable_for(&mut self, actor: &Actor, id: NonConsumableId) -> InventoryResult<NonConsumable> {
        let item = self
            .store
            .find_non_consumable(id)?
            .ok_or_else(|| InventoryError::not_found("non_consumable", id.0))?;
        Self::require_tenant(actor, item.household_id)?;
        if !item.is_active {
            return Err(InventoryError::not_found("non_consumable", id.0));
        }
        Ok(item)
    }

    /// Check that `placement` names an active location of the actor's household and, when a
    /// container is given, that the container sits in that location.
    pub(crate) fn check_placement(&mut self, actor: &Actor, placement: &Placement) -> InventoryResult<()> {
        self.location_for(actor, placement.location_id)?;
        if let Some(container_id) = placement.container_id {
            let container = self.container_for(actor, container_id)?;
            if container.location_id != placement.location_id {
                return Err(crate::error::InvariantViolation::InvalidPlacement {
                    location_id: placement.location_id,
                    container_id,
                }
                .into());
            }
        }
        Ok(())
    }

    // =====================
    // Side effects
    // =====================

    pub(crate) fn publish<T: Serialize>(
        &self,
        household_id: HouseholdId,
        table: ChangeTable,
        op: ChangeOp,
        row_id: i64,
        row: &T,
    ) {
        self.bus.publish_row(household_id, table, op, row_id, row);
    }

    /// Ledger write that accompanies a business mutation. The mutation already happened,
    /// so a failing ledger is logged and otherwise ignored.
    pub(crate) fn audit(
        &mut self,
        actor: &Actor,
        activity_type: ActivityType,
        description: String,
        item: Option<ItemRef>,
        metadata: Value,
    ) {
        let activity = NewActivity {
            household_id: actor.household_id,
            actor_id: actor.user_id,
            activity_type,
            description,
            item,
            metadata,
        };
        match self.store.insert_activity(&activity) {
            Ok(entry) => self.publish(
                entry.household_id,
                ChangeTable::ActivityLog,
                ChangeOp::Insert,
                entry.id.0,
                &entry,
            ),
            Err(e) => warn!(
                "Activity: dropped {:?} entry for household {}: {}",
                activity.activity_type, activity.household_id, e
            ),
        }
    }
}
