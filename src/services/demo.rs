//! Reproducible demo household, built through the public service operations so the
//! ledger, realtime events and shopping list look like real use.

use chrono::{Duration, Utc};
use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::db::store::InventoryStore;
use crate::error::InventoryResult;
use crate::models::inventory::*;
use crate::models::onboarding::{OnboardingStep, WizardData};
use crate::services::inventory::Inventory;

const DEMO_SEED: u64 = 0x5EED_CAFE_F00D_0001u64;
const CONSUMPTION_DAYS: usize = 21;

const ROOMS: [(&str, &[(&str, ContainerType)]); 4] = [
    ("Kitchen", &[("Pantry Shelf", ContainerType::Shelf), ("Spice Drawer", ContainerType::Drawer)]),
    ("Bathroom", &[("Vanity Cabinet", ContainerType::Cabinet)]),
    ("Garage", &[("Tool Rack", ContainerType::Rack), ("Camping Bin", ContainerType::Bin)]),
    ("Hallway", &[("Coat Closet", ContainerType::Closet)]),
];

/// (room, container, name, brand, threshold, daily use probability)
const SUPPLIES: [(usize, usize, &str, &str, i32, f64); 7] = [
    (0, 0, "Olive Oil", "Casa Verde", 1, 0.15),
    (0, 0, "Pasta", "Fratelli", 3, 0.35),
    (0, 0, "Coffee Beans", "Morning Ritual", 2, 0.55),
    (0, 1, "Black Pepper", "Spice Co", 1, 0.05),
    (1, 0, "Toilet Paper", "Softly", 6, 0.6),
    (1, 0, "Toothpaste", "Brightsmile", 2, 0.2),
    (2, 1, "AA Batteries", "Everlast", 4, 0.1),
];

/// (room, container, name, brand, model)
const EQUIPMENT: [(usize, usize, &str, &str, &str); 4] = [
    (0, 0, "Stand Mixer", "KitchenPro", "KP-500"),
    (2, 0, "Cordless Drill", "Torqueman", "TD-18"),
    (2, 1, "Two-person Tent", "Trailhead", "Ridge 2"),
    (3, 0, "Vacuum Cleaner", "Whirlwind", "WV-9"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemoSummary {
    pub household_id: Option<HouseholdId>,
    pub locations: usize,
    pub containers: usize,
    pub consumables: usize,
    pub non_consumables: usize,
    pub adjustments: usize,
    pub restock_entries: usize,
    pub condition_entries: usize,
}

pub fn run<S: InventoryStore>(inventory: &mut Inventory<S>, founder: UserId) -> InventoryResult<DemoSummary> {
    let mut rng = SmallRng::seed_from_u64(DEMO_SEED);
    let mut summary = DemoSummary::default();

    let household = inventory.create_household(founder, "Demo Household")?;
    let actor = Actor::new(founder, household.id, Role::Admin);
    summary.household_id = Some(household.id);
    info!("Demo: seeding household {} for user {}", household.id, founder);

    let mut wizard = WizardData {
        household_id: Some(household.id),
        household_name: Some(household.name.clone()),
        ..WizardData::default()
    };
    inventory.save_onboarding_step(founder, OnboardingStep::RoomSetup, wizard.clone())?;

    let mut containers = Vec::with_capacity(ROOMS.len());
    for (index, (room, shelves)) in ROOMS.iter().enumerate() {
        let location = inventory.create_location(
            &actor,
            &LocationInput {
                name: room.to_string(),
                description: None,
                is_primary: index == 0,
            },
        )?;
        wizard.rooms.push(location.name.clone());
        summary.locations += 1;

        let mut ids = Vec::with_capacity(shelves.len());
        for (name, container_type) in shelves.iter() {
            let container = inventory.create_container(
                &actor,
                location.id,
                &ContainerInput {
                    name: name.to_string(),
                    container_type: *container_type,
                    capacity_note: None,
                },
            )?;
            ids.push(Placement::in_container(location.id, container.id));
            summary.containers += 1;
        }
        containers.push(ids);
    }
    wizard.first_container_id = containers.first().and_then(|c| c.first()).and_then(|p| p.container_id);
    for step in [OnboardingStep::PhotoTour, OnboardingStep::FirstContainer, OnboardingStep::FirstItem] {
        inventory.save_onboarding_step(founder, step, wizard.clone())?;
    }

    let today = Utc::now().date_naive();
    let mut supplies = Vec::with_capacity(SUPPLIES.len());
    for (room, shelf, name, brand, threshold, use_rate) in SUPPLIES.iter() {
        let quantity = *threshold + rng.random_range(2..=8);
        let expires_in = rng.random_range(30..=540);
        let item = inventory.add_consumable(
            &actor,
            &ConsumableInput {
                placement: containers[*room][*shelf],
                name: name.to_string(),
                brand: Some(brand.to_string()),
                current_quantity: quantity,
                reorder_threshold: *threshold,
                unit_cost: Some((rng.random_range(1.0..=25.0_f64) * 100.0).round() / 100.0),
                expiration_date: Some(today + Duration::days(expires_in)),
            },
        )?;
        summary.consumables += 1;
        supplies.push((item.id, *use_rate));
    }
    if let Some((first, _)) = supplies.first() {
        wizard.first_item = Some(ItemRef::Consumable(*first));
    }
    inventory.save_onboarding_step(founder, OnboardingStep::Complete, wizard)?;

    let list = inventory.create_shopping_list(&actor, "Groceries")?;
    for _day in 0..CONSUMPTION_DAYS {
        for (id, use_rate) in supplies.iter() {
            if !rng.random_bool(*use_rate) {
                continue;
            }
            let current = inventory.get_consumable(&actor, *id)?.current_quantity;
            if current == 0 {
                continue;
            }
            let used = rng.random_range(1..=current.min(2));
            let adjustment = inventory.adjust_quantity(&actor, *id, -used)?;
            summary.adjustments += 1;
            if let Some(trigger) = adjustment.restock
                && inventory.apply_restock_trigger(&actor, list.id, &trigger)?.is_some()
            {
                summary.restock_entries += 1;
            }
        }
    }

    for (room, shelf, name, brand, model) in EQUIPMENT.iter() {
        let item = inventory.add_non_consumable(
            &actor,
            &NonConsumableInput {
                placement: containers[*room][*shelf],
                name: name.to_string(),
                brand: Some(brand.to_string()),
                model: Some(model.to_string()),
                serial_number: Some(format!("SN-{:06}", rng.random_range(0..1_000_000))),
                condition: Some(ConditionRating::Excellent),
                purchase_date: Some(today - Duration::days(rng.random_range(90..=1500))),
                purchase_price: Some(rng.random_range(40.0..=450.0_f64).round()),
                warranty_expiration: None,
            },
        )?;
        summary.non_consumables += 1;

        let mut rating = ConditionRating::Excellent;
        for _ in 0..rng.random_range(0..=3) {
            rating = wear(rating, &mut rng);
            let mut report = ConditionReport::rating(rating);
            if rating >= ConditionRating::Poor {
                report.maintenance = Some("Needs servicing".to_string());
                report.repair_cost = Some(rng.random_range(10.0..=80.0_f64).round());
            }
            inventory.log_condition(&actor, item.id, &report)?;
            summary.condition_entries += 1;
        }
    }

    info!(
        "Demo: complete (locations={}, containers={}, consumables={}, non_consumables={}, adjustments={}, restock_entries={}, condition_entries={})",
        summary.locations,
        summary.containers,
        summary.consumables,
        summary.non_consumables,
        summary.adjustments,
        summary.restock_entries,
        summary.condition_entries
    );
    Ok(summary)
}

/// Condition drifts one step worse at a time, sometimes not at all.
fn wear(rating: ConditionRating, rng: &mut SmallRng) -> ConditionRating {
    if !rng.random_bool(0.6) {
        return rating;
    }
    match rating {
        ConditionRating::Excellent => ConditionRating::Good,
        ConditionRating::Good => ConditionRating::Fair,
        ConditionRating::Fair => ConditionRating::Poor,
        ConditionRating::Poor | ConditionRating::Broken => ConditionRating::Broken,
    }
}
