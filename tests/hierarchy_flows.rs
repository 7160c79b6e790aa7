mod common;

use common::{equipment, home, home_with, supply};
use household_inventory::models::inventory::*;
use household_inventory::models::onboarding::{OnboardingStep, WizardData};
use household_inventory::{InventoryError, InventoryOptions, InventoryStore, InvariantViolation, RealtimeBus};

fn garage(home: &mut common::Home) -> (Location, Container) {
    let admin = home.admin;
    let garage = home
        .inventory
        .create_location(
            &admin,
            &LocationInput {
                name: "Garage".into(),
                ..LocationInput::default()
            },
        )
        .expect("garage");
    let rack = home
        .inventory
        .create_container(
            &admin,
            garage.id,
            &ContainerInput {
                name: "Tool Rack".into(),
                container_type: ContainerType::Rack,
                capacity_note: Some("two shelves".into()),
            },
        )
        .expect("rack");
    (garage, rack)
}

#[test]
fn container_from_another_location_is_invalid_placement() {
    let mut home = home();
    let admin = home.admin;
    let (_, rack) = garage(&mut home);
    let towels = home.add_supply("Paper Towels", 4, 2);

    let err = home
        .inventory
        .place_item(&admin, ItemRef::Consumable(towels.id), Placement::in_container(home.kitchen.id, rack.id))
        .unwrap_err();
    assert_eq!(
        err.invariant(),
        Some(&InvariantViolation::InvalidPlacement {
            location_id: home.kitchen.id,
            container_id: rack.id
        })
    );

    // creation applies the same rule
    let input = supply("Nails", 100, 10, Placement::in_container(home.kitchen.id, rack.id));
    assert!(matches!(
        home.inventory.add_consumable(&admin, &input).unwrap_err().invariant(),
        Some(InvariantViolation::InvalidPlacement { .. })
    ));
}

#[test]
fn moving_an_item_updates_placement_and_ledger() {
    let mut home = home();
    let admin = home.admin;
    let (garage, rack) = garage(&mut home);
    let drill = home.add_equipment("Drill", Some(ConditionRating::Good));

    let target = Placement::in_container(garage.id, rack.id);
    home.inventory
        .place_item(&admin, ItemRef::NonConsumable(drill.id), target)
        .expect("move");
    assert_eq!(home.inventory.get_non_consumable(&admin, drill.id).expect("drill").placement, target);
    let moved = home.inventory.list_recent(&admin, 1).expect("feed");
    assert_eq!(moved[0].activity_type, ActivityType::ItemMoved);
    assert_eq!(moved[0].item, Some(ItemRef::NonConsumable(drill.id)));
}

#[test]
fn empty_location_deletes_and_takes_containers_and_photos() {
    let mut home = home();
    let admin = home.admin;
    let (garage, rack) = garage(&mut home);
    let with_photo = home
        .inventory
        .attach_container_photo(&admin, rack.id, "rack.jpg", b"jpeg-bytes")
        .expect("photo");
    let url = with_photo.photo_url.clone().expect("url");
    assert!(home.photos.contains(&url));

    home.inventory.delete_location(&admin, garage.id).expect("delete");

    assert!(!home.photos.contains(&url));
    let stored = home.inventory.store_mut().find_container(rack.id).expect("find").expect("row");
    assert!(!stored.is_active);
    assert!(stored.photo_url.is_none());
    assert!(matches!(
        home.inventory.list_containers(&admin, garage.id),
        Err(InventoryError::NotFound { entity: "location", .. })
    ));
    assert!(home.inventory.list_locations(&admin).expect("locations").iter().all(|l| l.id != garage.id));
}

#[test]
fn location_with_active_items_is_not_deleted() {
    let mut home = home();
    let admin = home.admin;
    let loose = home
        .inventory
        .add_consumable(&admin, &supply("Matches", 3, 1, Placement::in_location(home.kitchen.id)))
        .expect("matches");

    let err = home.inventory.delete_location(&admin, home.kitchen.id).unwrap_err();
    assert_eq!(
        err.invariant(),
        Some(&InvariantViolation::LocationNotEmpty {
            location_id: home.kitchen.id,
            active_items: 1
        })
    );
    assert!(home.inventory.list_containers(&admin, home.kitchen.id).expect("containers").len() == 1);

    // soft-deleted items no longer block
    home.inventory.delete_consumable(&admin, loose.id).expect("delete item");
    home.inventory.delete_location(&admin, home.kitchen.id).expect("delete location");
}

#[test]
fn container_with_active_items_is_not_deleted() {
    let mut home = home();
    let admin = home.admin;
    let rice = home.add_supply("Rice", 2, 1);

    let err = home.inventory.delete_container(&admin, home.pantry.id).unwrap_err();
    assert!(matches!(
        err.invariant(),
        Some(InvariantViolation::ContainerNotEmpty { active_items: 1, .. })
    ));

    home.inventory
        .place_item(&admin, ItemRef::Consumable(rice.id), Placement::in_location(home.kitchen.id))
        .expect("move out");
    home.inventory.delete_container(&admin, home.pantry.id).expect("delete");
    assert!(home.inventory.list_containers(&admin, home.kitchen.id).expect("containers").is_empty());
}

#[test]
fn other_households_are_off_limits() {
    let mut home = home();
    let admin = home.admin;
    let towels = home.add_supply("Paper Towels", 4, 2);

    let neighbours = home.inventory.create_household(UserId(900), "Joneses").expect("household");
    let stranger = Actor::new(UserId(900), neighbours.id, Role::Admin);

    assert!(matches!(
        home.inventory.adjust_quantity(&stranger, towels.id, -1),
        Err(InventoryError::CrossTenantAccess)
    ));
    assert!(matches!(
        home.inventory.delete_location(&stranger, home.kitchen.id),
        Err(InventoryError::CrossTenantAccess)
    ));
    let err = home
        .inventory
        .add_consumable(&stranger, &supply("Soap", 1, 0, home.pantry_placement()))
        .unwrap_err();
    assert_eq!(err.to_string(), "access denied");
    assert!(home.inventory.list_consumables(&stranger).expect("own list").is_empty());
    assert_eq!(home.inventory.get_consumable(&admin, towels.id).expect("item").current_quantity, 4);
}

#[test]
fn viewers_cannot_edit_and_only_admins_manage_members() {
    let mut home = home();
    let viewer = home.actor(7, Role::Viewer);
    let manager = home.actor(8, Role::Manager);
    let admin = home.admin;

    assert!(matches!(
        home.inventory
            .create_location(&viewer, &LocationInput { name: "Attic".into(), ..LocationInput::default() }),
        Err(InventoryError::PermissionDenied)
    ));
    assert!(home.inventory.list_locations(&viewer).is_ok());
    assert!(matches!(
        home.inventory.add_member(&manager, UserId(9), Role::Employee),
        Err(InventoryError::PermissionDenied)
    ));

    home.inventory.add_member(&admin, UserId(9), Role::Employee).expect("add");
    let members = home.inventory.list_members(&admin).expect("members");
    assert_eq!(members.len(), 2);
    home.inventory.remove_member(&admin, UserId(9)).expect("remove");
    assert!(matches!(
        home.inventory.remove_member(&admin, UserId(9)),
        Err(InventoryError::NotFound { entity: "member", .. })
    ));
}

#[test]
fn missing_and_deleted_rows_are_not_found() {
    let mut home = home();
    let admin = home.admin;
    assert!(matches!(
        home.inventory.get_consumable(&admin, ConsumableId(404)),
        Err(InventoryError::NotFound { entity: "consumable", id: 404 })
    ));
    let mixer = home
        .inventory
        .add_non_consumable(&admin, &equipment("Mixer", None, home.pantry_placement()))
        .expect("mixer");
    home.inventory.delete_non_consumable(&admin, mixer.id).expect("delete");
    assert!(matches!(
        home.inventory.get_non_consumable(&admin, mixer.id),
        Err(InventoryError::NotFound { .. })
    ));
}

#[test]
fn validation_rejects_blank_names_and_negative_counts() {
    let mut home = home();
    let admin = home.admin;
    let err = home
        .inventory
        .add_consumable(&admin, &supply("   ", 1, 1, home.pantry_placement()))
        .unwrap_err();
    assert!(matches!(err, InventoryError::Validation(_)));
    let err = home
        .inventory
        .add_consumable(&admin, &supply("Soap", -1, 1, home.pantry_placement()))
        .unwrap_err();
    assert_eq!(err.to_string(), "validation error: current quantity cannot be negative");
}

#[test]
fn single_primary_location() {
    let mut home = home();
    let admin = home.admin;
    let first = home
        .inventory
        .create_location(&admin, &LocationInput { name: "Basement".into(), is_primary: true, ..LocationInput::default() })
        .expect("basement");
    let second = home
        .inventory
        .create_location(&admin, &LocationInput { name: "Loft".into(), is_primary: true, ..LocationInput::default() })
        .expect("loft");
    let locations = home.inventory.list_locations(&admin).expect("locations");
    assert_eq!(locations[0].id, second.id);
    assert_eq!(locations.iter().filter(|l| l.is_primary).count(), 1);

    home.inventory
        .update_location(&admin, first.id, &LocationChanges { is_primary: Some(true), ..LocationChanges::default() })
        .expect("update");
    let primary = home.inventory.list_locations(&admin).expect("locations");
    assert_eq!(primary[0].id, first.id);
    assert!(!primary[1..].iter().any(|l| l.is_primary));
}

#[test]
fn purge_is_gated_by_configuration_and_role() {
    let mut home = home();
    let admin = home.admin;
    assert!(matches!(home.inventory.purge_household(&admin), Err(InventoryError::PermissionDenied)));

    let bus = RealtimeBus::default();
    let mut home = home_with(
        bus.clone(),
        InventoryOptions {
            allow_data_purge: true,
            ..InventoryOptions::default()
        },
    );
    let admin = home.admin;
    home.add_supply("Tea", 3, 1);
    let mut sub = bus.subscribe(admin.household_id);
    let manager = home.actor(5, Role::Manager);
    assert!(matches!(home.inventory.purge_household(&manager), Err(InventoryError::PermissionDenied)));

    let wizard = WizardData {
        household_id: Some(admin.household_id),
        ..WizardData::default()
    };
    home.inventory
        .save_onboarding_step(admin.user_id, OnboardingStep::RoomSetup, wizard)
        .expect("wizard");

    let counts = home.inventory.purge_household(&admin).expect("purge");
    assert_eq!(counts.locations, 1);
    assert_eq!(counts.containers, 1);
    assert_eq!(counts.consumables, 1);
    assert_eq!(counts.members, 1);
    assert!(counts.activity > 0);
    assert_eq!(counts.onboarding, 1);
    assert!(home.inventory.store_mut().load_onboarding(admin.user_id).expect("load").is_none());
    assert!(matches!(
        home.inventory.get_household(&admin),
        Err(InventoryError::NotFound { entity: "household", .. })
    ));
    assert_eq!(bus.subscriber_count(admin.household_id), 0);
    assert!(sub.recv().is_none());
}
