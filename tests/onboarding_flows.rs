use household_inventory::db::memory::MemoryStore;
use household_inventory::models::inventory::*;
use household_inventory::models::onboarding::{OnboardingStep, WizardData};
use household_inventory::{Inventory, InventoryError, InventoryStore, InvariantViolation, RealtimeBus};

const NEW_USER: UserId = UserId(31);

fn inventory() -> Inventory<MemoryStore> {
    Inventory::new(MemoryStore::new(), RealtimeBus::default())
}

/// Save each step from `RoomSetup` up to `target`, the way the wizard UI does.
fn walk_to(inv: &mut Inventory<MemoryStore>, target: OnboardingStep, data: &WizardData) {
    for step in OnboardingStep::ALL[1..].iter().copied().filter(|s| *s <= target) {
        inv.save_onboarding_step(NEW_USER, step, data.clone()).expect("save");
    }
}

#[test]
fn first_entry_starts_at_welcome() {
    let mut inv = inventory();
    let progress = inv.resume_onboarding(NEW_USER).expect("resume");
    assert_eq!(progress.current_step, OnboardingStep::Welcome);
    assert!(progress.completed_steps.is_empty());
    assert_eq!(inv.resume_onboarding(NEW_USER).expect("resume"), progress);
}

#[test]
fn saving_the_same_step_twice_is_idempotent() {
    let data = WizardData {
        household_name: Some("Smiths".into()),
        rooms: vec!["Kitchen".into(), "Garage".into()],
        ..WizardData::default()
    };

    let mut once = inventory();
    walk_to(&mut once, OnboardingStep::PhotoTour, &data);
    let mut twice = inventory();
    walk_to(&mut twice, OnboardingStep::PhotoTour, &data);
    twice
        .save_onboarding_step(NEW_USER, OnboardingStep::PhotoTour, data)
        .expect("save");

    let a = once.resume_onboarding(NEW_USER).expect("resume");
    let b = twice.resume_onboarding(NEW_USER).expect("resume");
    assert_eq!(a, b);
    assert_eq!(b.current_step, OnboardingStep::PhotoTour);
    assert_eq!(b.data.rooms.len(), 2);
}

#[test]
fn back_and_forward_are_persisted() {
    let mut inv = inventory();
    inv.advance_onboarding(NEW_USER).expect("advance");
    inv.advance_onboarding(NEW_USER).expect("advance");
    let back = inv.back_onboarding(NEW_USER).expect("back");
    assert_eq!(back.current_step, OnboardingStep::RoomSetup);
    assert_eq!(inv.resume_onboarding(NEW_USER).expect("resume").current_step, OnboardingStep::RoomSetup);
}

#[test]
fn illegal_transitions_are_rejected() {
    let mut inv = inventory();
    for err in [
        inv.back_onboarding(NEW_USER).unwrap_err(),
        inv.skip_onboarding(NEW_USER).unwrap_err(),
    ] {
        assert!(matches!(
            err.invariant(),
            Some(InvariantViolation::IllegalTransition {
                from: OnboardingStep::Welcome,
                ..
            })
        ));
    }
    assert_eq!(inv.resume_onboarding(NEW_USER).expect("resume").current_step, OnboardingStep::Welcome);
}

#[test]
fn completing_clears_progress_and_marks_household() {
    let mut inv = inventory();
    let household = inv.create_household(NEW_USER, "Smiths").expect("household");
    let data = WizardData {
        household_id: Some(household.id),
        household_name: Some("Smiths".into()),
        ..WizardData::default()
    };
    inv.save_onboarding_step(NEW_USER, OnboardingStep::RoomSetup, data)
        .expect("save");

    let done = inv.skip_onboarding(NEW_USER).expect("skip");
    assert_eq!(done.current_step, OnboardingStep::Complete);
    assert!(inv.store_mut().load_onboarding(NEW_USER).expect("load").is_none());

    let actor = Actor::new(NEW_USER, household.id, Role::Admin);
    assert!(inv.get_household(&actor).expect("household").onboarding_completed);
    let latest = inv.list_recent(&actor, 1).expect("feed").remove(0);
    assert_eq!(latest.activity_type, ActivityType::OnboardingCompleted);
}

#[test]
fn completing_for_someone_elses_household_is_refused() {
    let mut inv = inventory();
    let household = inv.create_household(UserId(1), "Joneses").expect("household");
    let data = WizardData {
        household_id: Some(household.id),
        ..WizardData::default()
    };
    walk_to(&mut inv, OnboardingStep::FirstItem, &data);
    assert!(matches!(
        inv.advance_onboarding(NEW_USER),
        Err(InventoryError::CrossTenantAccess)
    ));
    let owner = Actor::new(UserId(1), household.id, Role::Admin);
    assert!(!inv.get_household(&owner).expect("household").onboarding_completed);
    assert_eq!(
        inv.resume_onboarding(NEW_USER).expect("resume").current_step,
        OnboardingStep::FirstItem
    );
}

#[test]
fn reset_starts_over() {
    let mut inv = inventory();
    walk_to(&mut inv, OnboardingStep::FirstContainer, &WizardData::default());
    let fresh = inv.reset_onboarding(NEW_USER).expect("reset");
    assert_eq!(fresh.current_step, OnboardingStep::Welcome);
    assert!(fresh.completed_steps.is_empty());
}

#[test]
fn saves_cannot_jump_across_steps() {
    let mut inv = inventory();
    let household = inv.create_household(NEW_USER, "Smiths").expect("household");
    let data = WizardData {
        household_id: Some(household.id),
        ..WizardData::default()
    };

    let err = inv
        .save_onboarding_step(NEW_USER, OnboardingStep::Complete, data.clone())
        .unwrap_err();
    assert!(matches!(
        err.invariant(),
        Some(InvariantViolation::IllegalTransition {
            from: OnboardingStep::Welcome,
            ..
        })
    ));
    let actor = Actor::new(NEW_USER, household.id, Role::Admin);
    assert!(!inv.get_household(&actor).expect("household").onboarding_completed);

    walk_to(&mut inv, OnboardingStep::FirstItem, &data);
    assert!(
        inv.save_onboarding_step(NEW_USER, OnboardingStep::Welcome, data.clone())
            .is_err()
    );
    let stored = inv.resume_onboarding(NEW_USER).expect("resume");
    assert_eq!(stored.current_step, OnboardingStep::FirstItem);
    assert!(!stored.completed_steps.contains(&OnboardingStep::FirstItem));

    let back = inv
        .save_onboarding_step(NEW_USER, OnboardingStep::FirstContainer, data)
        .expect("one step back");
    assert!(!back.completed_steps.contains(&OnboardingStep::FirstContainer));
}
