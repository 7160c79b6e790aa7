mod common;

use common::home;
use household_inventory::InvariantViolation;
use household_inventory::models::inventory::*;

#[test]
fn creation_classifies_without_triggering() {
    let mut home = home();
    let towels = home.add_supply("Paper Towels", 2, 3);
    assert_eq!(towels.stock_status(), StockStatus::Low);
    let admin = home.admin;
    assert_eq!(
        home.inventory.get_stock_status(&admin, towels.id).expect("status"),
        StockStatus::Low
    );
    let feed = home.inventory.list_recent(&admin, 10).expect("feed");
    assert!(feed.iter().all(|e| e.activity_type != ActivityType::QuantityChanged));
}

#[test]
fn leaving_ok_triggers_exactly_once() {
    let mut home = home();
    let admin = home.admin;
    let item = home.add_supply("Paper Towels", 5, 3);
    assert_eq!(item.stock_status(), StockStatus::Ok);

    let adjusted = home.inventory.adjust_quantity(&admin, item.id, -3).expect("adjust");
    assert_eq!(adjusted.item.current_quantity, 2);
    assert_eq!(adjusted.status, StockStatus::Low);
    let trigger = adjusted.restock.expect("trigger");
    assert_eq!(trigger.item_name, "Paper Towels");
    assert_eq!(trigger.suggested_quantity, 2);

    // still low: no second trigger
    let again = home.inventory.adjust_quantity(&admin, item.id, 1).expect("adjust");
    assert_eq!(again.status, StockStatus::Low);
    assert!(again.restock.is_none());
}

#[test]
fn running_out_triggers_and_refuses_negative() {
    let mut home = home();
    let admin = home.admin;
    let item = home.add_supply("Paper Towels", 2, 3);

    let out = home.inventory.adjust_quantity(&admin, item.id, -2).expect("adjust");
    assert_eq!(out.item.current_quantity, 0);
    assert_eq!(out.status, StockStatus::Out);
    assert!(out.restock.is_some());

    let err = home.inventory.adjust_quantity(&admin, item.id, -1).unwrap_err();
    assert_eq!(
        err.invariant(),
        Some(&InvariantViolation::NegativeQuantity { current: 0, delta: -1 })
    );
    assert_eq!(home.inventory.get_consumable(&admin, item.id).expect("item").current_quantity, 0);
}

#[test]
fn every_adjustment_is_ledgered_with_old_and_new() {
    let mut home = home();
    let admin = home.admin;
    let item = home.add_supply("Rice", 10, 2);
    home.inventory.adjust_quantity(&admin, item.id, -4).expect("adjust");
    home.inventory.adjust_quantity(&admin, item.id, 7).expect("adjust");

    let changes = home
        .inventory
        .list_recent(&admin, 50)
        .expect("feed")
        .into_iter()
        .filter(|e| e.activity_type == ActivityType::QuantityChanged)
        .collect::<Vec<_>>();
    assert_eq!(changes.len(), 2);
    // newest first
    assert_eq!(changes[0].metadata["old_quantity"], 6);
    assert_eq!(changes[0].metadata["new_quantity"], 13);
    assert_eq!(changes[0].metadata["delta"], 7);
    assert_eq!(changes[1].metadata["delta"], -4);
    assert_eq!(changes[0].item, Some(ItemRef::Consumable(item.id)));
}

#[test]
fn zero_threshold_never_triggers() {
    let mut home = home();
    let admin = home.admin;
    let item = home.add_supply("Candles", 3, 0);
    let out = home.inventory.adjust_quantity(&admin, item.id, -3).expect("adjust");
    assert_eq!(out.status, StockStatus::Ok);
    assert!(out.restock.is_none());
}

#[test]
fn low_stock_orders_by_urgency() {
    let mut home = home();
    let admin = home.admin;
    home.add_supply("Tea", 2, 3);
    home.add_supply("Flour", 0, 2);
    home.add_supply("Sugar", 1, 4);
    home.add_supply("Salt", 9, 2);

    let low = home.inventory.low_stock(&admin).expect("low stock");
    let names = low.iter().map(|l| l.item.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["Flour", "Sugar", "Tea"]);
    assert_eq!(low[0].suggested_quantity, 3);
}

#[test]
fn quantity_is_not_editable_through_update() {
    let mut home = home();
    let admin = home.admin;
    let item = home.add_supply("Oats", 4, 1);
    let updated = home
        .inventory
        .update_consumable(
            &admin,
            item.id,
            &ConsumableChanges {
                reorder_threshold: Some(6),
                brand: Some(Some("Hearty".into())),
                ..ConsumableChanges::default()
            },
        )
        .expect("update");
    assert_eq!(updated.current_quantity, 4);
    assert_eq!(updated.stock_status(), StockStatus::Low);
    assert_eq!(updated.brand.as_deref(), Some("Hearty"));
}

#[test]
fn restock_trigger_lands_on_shopping_list_once() {
    let mut home = home();
    let admin = home.admin;
    let item = home.add_supply("Paper Towels", 5, 3);
    let list = home.inventory.create_shopping_list(&admin, "Weekly").expect("list");

    let first = home.inventory.adjust_quantity(&admin, item.id, -3).expect("adjust");
    let trigger = first.restock.expect("trigger");
    let entry = home
        .inventory
        .apply_restock_trigger(&admin, list.id, &trigger)
        .expect("apply")
        .expect("new entry");
    assert_eq!(entry.quantity, 2);

    // worsening again yields a trigger, but the pending entry absorbs it
    let second = home.inventory.adjust_quantity(&admin, item.id, -2).expect("adjust");
    let mut trigger = second.restock.expect("trigger");
    trigger.item_name = "paper towels".into();
    assert!(home.inventory.apply_restock_trigger(&admin, list.id, &trigger).expect("apply").is_none());

    // once bought, a new trigger adds a fresh entry
    let bought = home.inventory.mark_purchased(&admin, entry.id).expect("purchase");
    assert!(bought.purchased);
    assert_eq!(bought.purchased_by, Some(admin.user_id));
    assert!(bought.purchased_at.is_some());
    assert!(home.inventory.apply_restock_trigger(&admin, list.id, &trigger).expect("apply").is_some());
    assert_eq!(home.inventory.list_items(&admin, list.id).expect("items").len(), 2);
}
