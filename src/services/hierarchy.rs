//! Storage hierarchy: households, members, locations, containers and item placement.
//!
//! Deletes are soft (`is_active = false`) and refuse to orphan anything: a container or
//! location that still holds active items stays. Deleting a location takes its (empty)
//! containers and their photos with it.

use log::{info, warn};
use serde_json::json;

use crate::db::store::{InventoryStore, ItemScope, PurgeCounts};
use crate::error::{InventoryError, InventoryResult, InvariantViolation};
use crate::models::inventory::*;
use crate::services::inventory::Inventory;
use crate::services::realtime::{ChangeOp, ChangeTable};
use crate::utils::non_blank;

pub(crate) fn required_name(value: &str, what: &str) -> InventoryResult<String> {
    non_blank(value)
        .map(str::to_string)
        .ok_or_else(|| InventoryError::validation(format!("{} name is required", what)))
}

pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value.and_then(non_blank).map(str::to_string)
}

impl<S: InventoryStore> Inventory<S> {
    // =====================
    // Households & members
    // =====================

    /// Sign-up path: creates the household with `founder` as its admin.
    pub fn create_household(&mut self, founder: UserId, name: &str) -> InventoryResult<Household> {
        let name = required_name(name, "household")?;
        let household = self.store.insert_household(&name)?;
        self.store.upsert_member(household.id, founder, Role::Admin)?;
        let actor = Actor::new(founder, household.id, Role::Admin);
        self.audit(
            &actor,
            ActivityType::MemberJoined,
            format!("Created household {}", household.name),
            None,
            json!({ "user_id": founder, "role": Role::Admin }),
        );
        info!("Created household {} ({})", household.id, household.name);
        Ok(household)
    }

    pub fn get_household(&mut self, actor: &Actor) -> InventoryResult<Household> {
        self.store
            .find_household(actor.household_id)?
            .ok_or_else(|| InventoryError::not_found("household", actor.household_id.0))
    }

    pub fn add_member(&mut self, actor: &Actor, user_id: UserId, role: Role) -> InventoryResult<Member> {
        Self::require_member_admin(actor)?;
        let member = self.store.upsert_member(actor.household_id, user_id, role)?;
        self.audit(
            actor,
            ActivityType::MemberJoined,
            format!("Added member {} as {:?}", user_id, role),
            None,
            json!({ "user_id": user_id, "role": role }),
        );
        Ok(member)
    }

    pub fn remove_member(&mut self, actor: &Actor, user_id: UserId) -> InventoryResult<()> {
        Self::require_member_admin(actor)?;
        if !self.store.delete_member(actor.household_id, user_id)? {
            return Err(InventoryError::not_found("member", user_id.0));
        }
        self.audit(
            actor,
            ActivityType::MemberRemoved,
            format!("Removed member {}", user_id),
            None,
            json!({ "user_id": user_id }),
        );
        Ok(())
    }

    pub fn list_members(&mut self, actor: &Actor) -> InventoryResult<Vec<Member>> {
        Ok(self.store.list_members(actor.household_id)?)
    }

    /// Administrative hard delete of the actor's household. Needs the purge switch and the
    /// admin role; closes the household's realtime channel afterwards.
    pub fn purge_household(&mut self, actor: &Actor) -> InventoryResult<PurgeCounts> {
        if !self.options.allow_data_purge {
            warn!("Refusing purge of household {}: data purge disabled", actor.household_id);
            return Err(InventoryError::PermissionDenied);
        }
        Self::require_member_admin(actor)?;
        self.get_household(actor)?;
        let counts = self.store.purge_household(actor.household_id)?;
        self.bus.close_household(actor.household_id);
        info!("Purged household {}: {:?}", actor.household_id, counts);
        Ok(counts)
    }

    // =====================
    // Locations
    // =====================

    pub fn create_location(&mut self, actor: &Actor, input: &LocationInput) -> InventoryResult<Location> {
        Self::require_edit(actor)?;
        let input = LocationInput {
            name: required_name(&input.name, "location")?,
            description: optional_text(input.description.as_deref()),
            is_primary: input.is_primary,
        };
        if input.is_primary {
            self.demote_primary(actor.household_id, None)?;
        }
        let location = self.store.insert_location(actor.household_id, &input)?;
        self.publish(location.household_id, ChangeTable::Locations, ChangeOp::Insert, location.id.0, &location);
        self.audit(
            actor,
            ActivityType::LocationAdded,
            format!("Added location {}", location.name),
            None,
            json!({ "location_id": location.id }),
        );
        Ok(location)
    }

    pub fn update_location(
        &mut self,
        actor: &Actor,
        id: LocationId,
        changes: &LocationChanges,
    ) -> InventoryResult<Location> {
        Self::require_edit(actor)?;
        let mut location = self.location_for(actor, id)?;
        if let Some(name) = &changes.name {
            location.name = required_name(name, "location")?;
        }
        if let Some(description) = &changes.description {
            location.description = optional_text(description.as_deref());
        }
        if let Some(is_primary) = changes.is_primary {
            if is_primary && !location.is_primary {
                self.demote_primary(location.household_id, Some(location.id))?;
            }
            location.is_primary = is_primary;
        }
        let location = self.store.update_location(&location)?;
        self.publish(location.household_id, ChangeTable::Locations, ChangeOp::Update, location.id.0, &location);
        self.audit(
            actor,
            ActivityType::LocationUpdated,
            format!("Updated location {}", location.name),
            None,
            json!({ "location_id": location.id }),
        );
        Ok(location)
    }

    /// Active locations, primary first.
    pub fn list_locations(&mut self, actor: &Actor) -> InventoryResult<Vec<Location>> {
        Ok(self.store.list_locations(actor.household_id)?)
    }

    /// Soft-delete a location with no active items. Its containers are deactivated and
    /// their photos removed from storage.
    pub fn delete_location(&mut self, actor: &Actor, id: LocationId) -> InventoryResult<()> {
        Self::require_edit(actor)?;
        let mut location = self.location_for(actor, id)?;
        let active_items = self.store.count_active_items(ItemScope::Location(id))?;
        if active_items > 0 {
            return Err(InvariantViolation::LocationNotEmpty {
                location_id: id,
                active_items,
            }
            .into());
        }

        let removed = self.store.deactivate_containers(id)?;
        for container in &removed {
            if let Some(url) = &container.photo_url {
                self.discard_photo(url);
            }
            let gone = Container {
                is_active: false,
                photo_url: None,
                ..container.clone()
            };
            self.publish(gone.household_id, ChangeTable::Containers, ChangeOp::Delete, gone.id.0, &gone);
        }

        location.is_active = false;
        location.is_primary = false;
        let location = self.store.update_location(&location)?;
        self.publish(location.household_id, ChangeTable::Locations, ChangeOp::Delete, location.id.0, &location);
        self.audit(
            actor,
            ActivityType::LocationDeleted,
            format!("Deleted location {}", location.name),
            None,
            json!({ "location_id": location.id, "containers_removed": removed.len() }),
        );
        Ok(())
    }

    fn demote_primary(&mut self, household_id: HouseholdId, keep: Option<LocationId>) -> InventoryResult<()> {
        let current = self.store.list_locations(household_id)?;
        for mut location in current.into_iter().filter(|l| l.is_primary && Some(l.id) != keep) {
            location.is_primary = false;
            let location = self.store.update_location(&location)?;
            self.publish(household_id, ChangeTable::Locations, ChangeOp::Update, location.id.0, &location);
        }
        Ok(())
    }

    // =====================
    // Containers
    // =====================

    pub fn create_container(
        &mut self,
        actor: &Actor,
        location_id: LocationId,
        input: &ContainerInput,
    ) -> InventoryResult<Container> {
        Self::require_edit(actor)?;
        let location = self.location_for(actor, location_id)?;
        let input = ContainerInput {
            name: required_name(&input.name, "container")?,
            container_type: input.container_type,
            capacity_note: optional_text(input.capacity_note.as_deref()),
        };
        let container = self.store.insert_container(&location, &input)?;
        self.publish(container.household_id, ChangeTable::Containers, ChangeOp::Insert, container.id.0, &container);
        self.audit(
            actor,
            ActivityType::ContainerAdded,
            format!("Added {} to {}", container.name, location.name),
            None,
            json!({ "container_id": container.id, "location_id": location.id }),
        );
        Ok(container)
    }

    pub fn update_container(
        &mut self,
        actor: &Actor,
        id: ContainerId,
        changes: &ContainerChanges,
    ) -> InventoryResult<Container> {
        Self::require_edit(actor)?;
        let mut container = self.container_for(actor, id)?;
        if let Some(name) = &changes.name {
            container.name = required_name(name, "container")?;
        }
        if let Some(container_type) = changes.container_type {
            container.container_type = container_type;
        }
        if let Some(note) = &changes.capacity_note {
            container.capacity_note = optional_text(note.as_deref());
        }
        let container = self.store.update_container(&container)?;
        self.container_updated(actor, &container, "Updated");
        Ok(container)
    }

    /// Upload a photo for a container and keep only the returned URL. A replaced photo is
    /// removed from storage on a best-effort basis.
    pub fn attach_container_photo(
        &mut self,
        actor: &Actor,
        id: ContainerId,
        file_name: &str,
        bytes: &[u8],
    ) -> InventoryResult<Container> {
        Self::require_edit(actor)?;
        let mut container = self.container_for(actor, id)?;
        let file_name = non_blank(file_name)
            .ok_or_else(|| InventoryError::validation("photo file name is required"))?;
        if bytes.is_empty() {
            return Err(InventoryError::validation("photo is empty"));
        }
        let path = format!("households/{}/containers/{}/{}", container.household_id, container.id, file_name);
        let url = self.photos.upload(&path, bytes)?;
        if let Some(previous) = container.photo_url.replace(url)
            && container.photo_url.as_deref() != Some(previous.as_str())
        {
            self.discard_photo(&previous);
        }
        let container = self.store.update_container(&container)?;
        self.container_updated(actor, &container, "Attached a photo to");
        Ok(container)
    }

    /// Active containers of one location.
    pub fn list_containers(&mut self, actor: &Actor, location_id: LocationId) -> InventoryResult<Vec<Container>> {
        self.location_for(actor, location_id)?;
        Ok(self.store.list_containers(location_id)?)
    }

    pub fn delete_container(&mut self, actor: &Actor, id: ContainerId) -> InventoryResult<()> {
        Self::require_edit(actor)?;
        let mut container = self.container_for(actor, id)?;
        let active_items = self.store.count_active_items(ItemScope::Container(id))?;
        if active_items > 0 {
            return Err(InvariantViolation::ContainerNotEmpty {
                container_id: id,
                active_items,
            }
            .into());
        }
        if let Some(url) = container.photo_url.take() {
            self.discard_photo(&url);
        }
        container.is_active = false;
        let container = self.store.update_container(&container)?;
        self.publish(container.household_id, ChangeTable::Containers, ChangeOp::Delete, container.id.0, &container);
        self.audit(
            actor,
            ActivityType::ContainerDeleted,
            format!("Deleted container {}", container.name),
            None,
            json!({ "container_id": container.id, "location_id": container.location_id }),
        );
        Ok(())
    }

    fn container_updated(&mut self, actor: &Actor, container: &Container, verb: &str) {
        self.publish(container.household_id, ChangeTable::Containers, ChangeOp::Update, container.id.0, container);
        self.audit(
            actor,
            ActivityType::ContainerUpdated,
            format!("{} container {}", verb, container.name),
            None,
            json!({ "container_id": container.id }),
        );
    }

    fn discard_photo(&mut self, url: &str) {
        if let Err(e) = self.photos.remove(url) {
            warn!("Photo storage: could not remove {}: {}", url, e);
        }
    }

    // =====================
    // Placement
    // =====================

    /// Move an item. The container, when given, must belong to the location.
    pub fn place_item(&mut self, actor: &Actor, item: ItemRef, placement: Placement) -> InventoryResult<Placement> {
        Self::require_edit(actor)?;
        self.check_placement(actor, &placement)?;
        let (name, from) = match item {
            ItemRef::Consumable(id) => {
                let mut row = self.consumable_for(actor, id)?;
                let from = row.placement;
                row.placement = placement;
                let row = self.store.update_consumable(&row)?;
                self.publish(row.household_id, ChangeTable::Consumables, ChangeOp::Update, row.id.0, &row);
                (row.name, from)
            }
            ItemRef::NonConsumable(id) => {
                let mut row = self.non_consumable_for(actor, id)?;
                let from = row.placement;
                row.placement = placement;
                let row = self.store.update_non_consumable(&row)?;
                self.publish(row.household_id, ChangeTable::NonConsumables, ChangeOp::Update, row.id.0, &row);
                (row.name, from)
            }
        };
        self.audit(
            actor,
            ActivityType::ItemMoved,
            format!("Moved {}", name),
            Some(item),
            json!({ "from": from, "to": placement }),
        );
        Ok(placement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(required_name("  Garage ", "location").expect("name"), "Garage");
        let err = required_name(" ", "container").unwrap_err();
        assert_eq!(err.to_string(), "validation error: container name is required");
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" top shelf ")).as_deref(), Some("top shelf"));
    }
}
