#![allow(dead_code)]

use household_inventory::db::memory::MemoryStore;
use household_inventory::models::inventory::*;
use household_inventory::services::photos::MemoryPhotoStorage;
use household_inventory::{Inventory, InventoryOptions, RealtimeBus};

pub const OWNER: UserId = UserId(100);

pub struct Home {
    pub inventory: Inventory<MemoryStore>,
    pub photos: MemoryPhotoStorage,
    pub admin: Actor,
    pub kitchen: Location,
    pub pantry: Container,
}

impl Home {
    pub fn actor(&self, user: i64, role: Role) -> Actor {
        Actor::new(UserId(user), self.admin.household_id, role)
    }

    pub fn pantry_placement(&self) -> Placement {
        Placement::in_container(self.kitchen.id, self.pantry.id)
    }

    pub fn add_supply(&mut self, name: &str, quantity: i32, threshold: i32) -> Consumable {
        let input = supply(name, quantity, threshold, self.pantry_placement());
        self.inventory.add_consumable(&self.admin, &input).expect("add consumable")
    }

    pub fn add_equipment(&mut self, name: &str, condition: Option<ConditionRating>) -> NonConsumable {
        let input = equipment(name, condition, Placement::in_location(self.kitchen.id));
        self.inventory.add_non_consumable(&self.admin, &input).expect("add non-consumable")
    }
}

pub fn home_with(bus: RealtimeBus, options: InventoryOptions) -> Home {
    let photos = MemoryPhotoStorage::new("https://photos.test");
    let mut inventory = Inventory::new(MemoryStore::new(), bus)
        .with_photo_storage(photos.clone())
        .with_options(options);
    let household = inventory.create_household(OWNER, "Smiths").expect("household");
    let admin = Actor::new(OWNER, household.id, Role::Admin);
    let kitchen = inventory
        .create_location(
            &admin,
            &LocationInput {
                name: "Kitchen".into(),
                ..LocationInput::default()
            },
        )
        .expect("kitchen");
    let pantry = inventory
        .create_container(
            &admin,
            kitchen.id,
            &ContainerInput {
                name: "Pantry".into(),
                container_type: ContainerType::Shelf,
                capacity_note: None,
            },
        )
        .expect("pantry");
    Home {
        inventory,
        photos,
        admin,
        kitchen,
        pantry,
    }
}

pub fn home() -> Home {
    home_with(RealtimeBus::default(), InventoryOptions::default())
}

pub fn supply(name: &str, quantity: i32, threshold: i32, placement: Placement) -> ConsumableInput {
    ConsumableInput {
        placement,
        name: name.into(),
        brand: None,
        current_quantity: quantity,
        reorder_threshold: threshold,
        unit_cost: None,
        expiration_date: None,
    }
}

pub fn equipment(name: &str, condition: Option<ConditionRating>, placement: Placement) -> NonConsumableInput {
    NonConsumableInput {
        placement,
        name: name.into(),
        brand: None,
        model: None,
        serial_number: None,
        condition,
        purchase_date: None,
        purchase_price: None,
        warranty_expiration: None,
    }
}
