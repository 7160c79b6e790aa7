//! PostgreSQL-backed `InventoryStore` using Diesel.

use chrono::Utc;
use diesel::PgConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use log::{debug, info};

use crate::db::models::*;
use crate::db::store::{InventoryStore, ItemScope, PurgeCounts, StoreResult};
use crate::error::StoreError;
use crate::models::inventory::*;
use crate::models::onboarding::OnboardingProgress;
use crate::schema;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub struct PgStore {
    conn: PgConnection,
}

impl PgStore {
    pub fn connect(database_url: &str) -> StoreResult<Self> {
        let conn = PgConnection::establish(database_url)?;
        Ok(PgStore { conn })
    }

    pub fn from_connection(conn: PgConnection) -> Self {
        PgStore { conn }
    }

    /// Apply pending migrations, returning the versions that were applied.
    pub fn run_migrations(&mut self) -> StoreResult<Vec<String>> {
        let applied = self
            .conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        let names = applied.iter().map(|v| v.to_string()).collect::<Vec<_>>();
        if names.is_empty() {
            info!("Database schema is up to date; no migrations were applied");
        } else {
            info!("Applied {} database migration(s): {}", names.len(), names.join(", "));
        }
        Ok(names)
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl InventoryStore for PgStore {
    fn insert_household(&mut self, name: &str) -> StoreResult<Household> {
        use schema::households::dsl as H;

        let row = diesel::insert_into(H::households)
            .values(&NewHouseholdRow { name })
            .returning(HouseholdRow::as_returning())
            .get_result(&mut self.conn)?;
        Ok(row.into())
    }

    fn find_household(&mut self, id: HouseholdId) -> StoreResult<Option<Household>> {
        use schema::households::dsl as H;

        let row = H::households
            .find(id.0)
            .select(HouseholdRow::as_select())
            .first(&mut self.conn)
            .optional()?;
        Ok(row.map(Household::from))
    }

    fn set_onboarding_completed(&mut self, id: HouseholdId, completed: bool) -> StoreResult<()> {
        use schema::households::dsl as H;

        diesel::update(H::households.find(id.0))
            .set((H::onboarding_completed.eq(completed), H::updated_at.eq(Utc::now())))
            .execute(&mut self.conn)?;
        Ok(())
    }

    fn purge_household(&mut self, id: HouseholdId) -> StoreResult<PurgeCounts> {
        use schema::activity_log::dsl as A;
        use schema::condition_logs::dsl as CL;
        use schema::consumables::dsl as CO;
        use schema::containers::dsl as C;
        use schema::household_members::dsl as M;
        use schema::households::dsl as H;
        use schema::locations::dsl as L;
        use schema::non_consumables::dsl as NC;
        use schema::onboarding_progress::dsl as O;
        use schema::shopping_list_items::dsl as LI;
        use schema::shopping_lists::dsl as SL;

        let hid = id.0;
        let counts = self.conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let counts = PurgeCounts {
                list_items: diesel::delete(LI::shopping_list_items.filter(LI::household_id.eq(hid))).execute(conn)?,
                shopping_lists: diesel::delete(SL::shopping_lists.filter(SL::household_id.eq(hid))).execute(conn)?,
                condition_logs: diesel::delete(CL::condition_logs.filter(CL::household_id.eq(hid))).execute(conn)?,
                activity: diesel::delete(A::activity_log.filter(A::household_id.eq(hid))).execute(conn)?,
                consumables: diesel::delete(CO::consumables.filter(CO::household_id.eq(hid))).execute(conn)?,
                non_consumables: diesel::delete(NC::non_consumables.filter(NC::household_id.eq(hid)))
                    .execute(conn)?,
                containers: diesel::delete(C::containers.filter(C::household_id.eq(hid))).execute(conn)?,
                locations: diesel::delete(L::locations.filter(L::household_id.eq(hid))).execute(conn)?,
                members: diesel::delete(M::household_members.filter(M::household_id.eq(hid))).execute(conn)?,
                onboarding: diesel::delete(
                    O::onboarding_progress.filter(O::data.retrieve_as_text("household_id").eq(hid.to_string())),
                )
                .execute(conn)?,
            };
            diesel::delete(H::households.find(hid)).execute(conn)?;
            Ok(counts)
        })?;
        debug!("Purged household {}: {:?}", hid, counts);
        Ok(counts)
    }

    fn upsert_member(&mut self, household_id: HouseholdId, user_id: UserId, role: Role) -> StoreResult<Member> {
        use schema::household_members::dsl as M;

        let new_row = NewMemberRow::new(household_id, user_id, role);
        let row = diesel::insert_into(M::household_members)
            .values(&new_row)
            .on_conflict((M::household_id, M::user_id))
            .do_update()
            .set(M::role.eq(new_row.role.clone()))
            .returning(MemberRow::as_returning())
            .get_result(&mut self.conn)?;
        row.into_domain()
    }

    fn delete_member(&mut self, household_id: HouseholdId, user_id: UserId) -> StoreResult<bool> {
        use schema::household_members::dsl as M;

        let deleted = diesel::delete(
            M::household_members
                .filter(M::household_id.eq(household_id.0))
                .filter(M::user_id.eq(user_id.0)),
        )
        .execute(&mut self.conn)?;
        Ok(deleted > 0)
    }

    fn list_members(&mut self, household_id: HouseholdId) -> StoreResult<Vec<Member>> {
        use schema::household_members::dsl as M;

        M::household_members
            .filter(M::household_id.eq(household_id.0))
            .order((M::joined_at.asc(), M::user_id.asc()))
            .select(MemberRow::as_select())
            .load(&mut self.conn)?
            .into_iter()
            .map(MemberRow::into_domain)
            .collect()
    }

    fn insert_location(&mut self, household_id: HouseholdId, input: &LocationInput) -> StoreResult<Location> {
        use schema::locations::dsl as L;

        let row = diesel::insert_into(L::locations)
            .values(&NewLocationRow::new(household_id, input))
            .returning(LocationRow::as_returning())
            .get_result(&mut self.conn)?;
        Ok(row.into())
    }

    fn find_location(&mut self, id: LocationId) -> StoreResult<Option<Location>> {
        use schema::locations::dsl as L;

        let row = L::locations
            .find(id.0)
            .select(LocationRow::as_select())
            .first(&mut self.conn)
            .optional()?;
        Ok(row.map(Location::from))
    }

    fn list_locations(&mut self, household_id: HouseholdId) -> StoreResult<Vec<Location>> {
        use schema::locations::dsl as L;

        let rows = L::locations
            .filter(L::household_id.eq(household_id.0))
            .filter(L::is_active.eq(true))
            .order((L::is_primary.desc(), L::name.asc(), L::id.asc()))
            .select(LocationRow::as_select())
            .load(&mut self.conn)?;
        Ok(rows.into_iter().map(Location::from).collect())
    }

    fn update_location(&mut self, location: &Location) -> StoreResult<Location> {
        use schema::locations::dsl as L;

        let row = diesel::update(L::locations.find(location.id.0))
            .set(&LocationChangeset::new(location))
            .returning(LocationRow::as_returning())
            .get_result(&mut self.conn)?;
        Ok(row.into())
    }

    fn insert_container(&mut self, location: &Location, input: &ContainerInput) -> StoreResult<Container> {
        use schema::containers::dsl as C;

        diesel::insert_into(C::containers)
            .values(&NewContainerRow::new(location, input))
            .returning(ContainerRow::as_returning())
            .get_result(&mut self.conn)?
            .into_domain()
    }

    fn find_container(&mut self, id: ContainerId) -> StoreResult<Option<Container>> {
        use schema::containers::dsl as C;

        C::containers
            .find(id.0)
            .select(ContainerRow::as_select())
            .first(&mut self.conn)
            .optional()?
            .map(ContainerRow::into_domain)
            .transpose()
    }

    fn list_containers(&mut self, location_id: LocationId) -> StoreResult<Vec<Container>> {
        use schema::containers::dsl as C;

        C::containers
            .filter(C::location_id.eq(location_id.0))
            .filter(C::is_active.eq(true))
            .order((C::name.asc(), C::id.asc()))
            .select(ContainerRow::as_select())
            .load(&mut self.conn)?
            .into_iter()
            .map(ContainerRow::into_domain)
            .collect()
    }

    fn update_container(&mut self, container: &Container) -> StoreResult<Container> {
        use schema::containers::dsl as C;

        diesel::update(C::containers.find(container.id.0))
            .set(&ContainerChangeset::new(container))
            .returning(ContainerRow::as_returning())
            .get_result(&mut self.conn)?
            .into_domain()
    }

    fn deactivate_containers(&mut self, location_id: LocationId) -> StoreResult<Vec<Container>> {
        use schema::containers::dsl as C;

        let rows = self.conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let active = C::containers
                .filter(C::location_id.eq(location_id.0))
                .filter(C::is_active.eq(true))
                .select(ContainerRow::as_select())
                .load(conn)?;
            diesel::update(
                C::containers
                    .filter(C::location_id.eq(location_id.0))
                    .filter(C::is_active.eq(true)),
            )
            .set((
                C::is_active.eq(false),
                C::photo_url.eq(None::<String>),
                C::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
            Ok(active)
        })?;
        rows.into_iter().map(ContainerRow::into_domain).collect()
    }

    fn insert_consumable(&mut self, household_id: HouseholdId, input: &ConsumableInput) -> StoreResult<Consumable> {
        use schema::consumables::dsl as CO;

        let row = diesel::insert_into(CO::consumables)
            .values(&NewConsumableRow::new(household_id, input))
            .returning(ConsumableRow::as_returning())
            .get_result(&mut self.conn)?;
        Ok(row.into())
    }

    fn find_consumable(&mut self, id: ConsumableId) -> StoreResult<Option<Consumable>> {
        use schema::consumables::dsl as CO;

        let row = CO::consumables
            .find(id.0)
            .select(ConsumableRow::as_select())
            .first(&mut self.conn)
            .optional()?;
        Ok(row.map(Consumable::from))
    }

    fn list_consumables(&mut self, household_id: HouseholdId) -> StoreResult<Vec<Consumable>> {
        use schema::consumables::dsl as CO;

        let rows = CO::consumables
            .filter(CO::household_id.eq(household_id.0))
            .filter(CO::is_active.eq(true))
            .order((CO::name.asc(), CO::id.asc()))
            .select(ConsumableRow::as_select())
            .load(&mut self.conn)?;
        Ok(rows.into_iter().map(Consumable::from).collect())
    }

    fn update_consumable(&mut self, item: &Consumable) -> StoreResult<Consumable> {
        use schema::consumables::dsl as CO;

        let row = diesel::update(CO::consumables.find(item.id.0))
            .set(&ConsumableChangeset::new(item))
            .returning(ConsumableRow::as_returning())
            .get_result(&mut self.conn)?;
        Ok(row.into())
    }

    fn set_consumable_quantity(&mut self, id: ConsumableId, quantity: i32) -> StoreResult<Consumable> {
        use schema::consumables::dsl as CO;

        let row = diesel::update(CO::consumables.find(id.0))
            .set((CO::current_quantity.eq(quantity), CO::updated_at.eq(Utc::now())))
            .returning(ConsumableRow::as_returning())
            .get_result(&mut self.conn)?;
        Ok(row.into())
    }

    fn insert_non_consumable(
        &mut self,
        household_id: HouseholdId,
        input: &NonConsumableInput,
    ) -> StoreResult<NonConsumable> {
        use schema::non_consumables::dsl as NC;

        diesel::insert_into(NC::non_consumables)
            .values(&NewNonConsumableRow::new(household_id, input))
            .returning(NonConsumableRow::as_returning())
            .get_result(&mut self.conn)?
            .into_domain()
    }

    fn find_non_consumable(&mut self, id: NonConsumableId) -> StoreResult<Option<NonConsumable>> {
        use schema::non_consumables::dsl as NC;

        NC::non_consumables
            .find(id.0)
            .select(NonConsumableRow::as_select())
            .first(&mut self.conn)
            .optional()?
            .map(NonConsumableRow::into_domain)
            .transpose()
    }

    fn list_non_consumables(&mut self, household_id: HouseholdId) -> StoreResult<Vec<NonConsumable>> {
        use schema::non_consumables::dsl as NC;

        NC::non_consumables
            .filter(NC::household_id.eq(household_id.0))
            .filter(NC::is_active.eq(true))
            .order((NC::name.asc(), NC::id.asc()))
            .select(NonConsumableRow::as_select())
            .load(&mut self.conn)?
            .into_iter()
            .map(NonConsumableRow::into_domain)
            .collect()
    }

    fn update_non_consumable(&mut self, item: &NonConsumable) -> StoreResult<NonConsumable> {
        use schema::non_consumables::dsl as NC;

        diesel::update(NC::non_consumables.find(item.id.0))
            .set(&NonConsumableChangeset::new(item))
            .returning(NonConsumableRow::as_returning())
            .get_result(&mut self.conn)?
            .into_domain()
    }

    fn count_active_items(&mut self, scope: ItemScope) -> StoreResult<i64> {
        use schema::consumables::dsl as CO;
        use schema::non_consumables::dsl as NC;

        let conn = &mut self.conn;
        let (consumables, non_consumables): (i64, i64) = match scope {
            ItemScope::Location(id) => (
                CO::consumables
                    .filter(CO::location_id.eq(id.0))
                    .filter(CO::is_active.eq(true))
                    .count()
                    .get_result(conn)?,
                NC::non_consumables
                    .filter(NC::location_id.eq(id.0))
                    .filter(NC::is_active.eq(true))
                    .count()
                    .get_result(conn)?,
            ),
            ItemScope::Container(id) => (
                CO::consumables
                    .filter(CO::container_id.eq(id.0))
                    .filter(CO::is_active.eq(true))
                    .count()
                    .get_result(conn)?,
                NC::non_consumables
                    .filter(NC::container_id.eq(id.0))
                    .filter(NC::is_active.eq(true))
                    .count()
                    .get_result(conn)?,
            ),
        };
        Ok(consumables + non_consumables)
    }

    fn insert_condition_log(
        &mut self,
        item: &NonConsumable,
        author_id: UserId,
        report: &ConditionReport,
    ) -> StoreResult<ConditionLogEntry> {
        use schema::condition_logs::dsl as CL;

        diesel::insert_into(CL::condition_logs)
            .values(&NewConditionLogRow::new(item, author_id, report))
            .returning(ConditionLogRow::as_returning())
            .get_result(&mut self.conn)?
            .into_domain()
    }

    fn condition_logs(&mut self, item_id: NonConsumableId) -> StoreResult<Vec<ConditionLogEntry>> {
        use schema::condition_logs::dsl as CL;

        CL::condition_logs
            .filter(CL::item_id.eq(item_id.0))
            .order((CL::logged_at.desc(), CL::id.desc()))
            .select(ConditionLogRow::as_select())
            .load(&mut self.conn)?
            .into_iter()
            .map(ConditionLogRow::into_domain)
            .collect()
    }

    fn insert_activity(&mut self, activity: &NewActivity) -> StoreResult<ActivityEntry> {
        use schema::activity_log::dsl as A;

        diesel::insert_into(A::activity_log)
            .values(&NewActivityRow::new(activity))
            .returning(ActivityRow::as_returning())
            .get_result(&mut self.conn)?
            .into_domain()
    }

    fn recent_activity(&mut self, household_id: HouseholdId, limit: usize) -> StoreResult<Vec<ActivityEntry>> {
        use schema::activity_log::dsl as A;

        A::activity_log
            .filter(A::household_id.eq(household_id.0))
            .order((A::created_at.desc(), A::id.desc()))
            .limit(sql_limit(limit))
            .select(ActivityRow::as_select())
            .load(&mut self.conn)?
            .into_iter()
            .map(ActivityRow::into_domain)
            .collect()
    }

    fn insert_shopping_list(&mut self, household_id: HouseholdId, name: &str) -> StoreResult<ShoppingList> {
        use schema::shopping_lists::dsl as SL;

        let row = diesel::insert_into(SL::shopping_lists)
            .values(&NewShoppingListRow {
                household_id: household_id.0,
                name,
            })
            .returning(ShoppingListRow::as_returning())
            .get_result(&mut self.conn)?;
        Ok(row.into())
    }

    fn find_shopping_list(&mut self, id: ShoppingListId) -> StoreResult<Option<ShoppingList>> {
        use schema::shopping_lists::dsl as SL;

        let row = SL::shopping_lists
            .find(id.0)
            .select(ShoppingListRow::as_select())
            .first(&mut self.conn)
            .optional()?;
        Ok(row.map(ShoppingList::from))
    }

    fn insert_list_item(&mut self, list: &ShoppingList, input: &ListItemInput) -> StoreResult<ListItem> {
        use schema::shopping_list_items::dsl as LI;

        let row = diesel::insert_into(LI::shopping_list_items)
            .values(&NewListItemRow::new(list, input))
            .returning(ListItemRow::as_returning())
            .get_result(&mut self.conn)?;
        Ok(row.into())
    }

    fn find_list_item(&mut self, id: ListItemId) -> StoreResult<Option<ListItem>> {
        use schema::shopping_list_items::dsl as LI;

        let row = LI::shopping_list_items
            .find(id.0)
            .select(ListItemRow::as_select())
            .first(&mut self.conn)
            .optional()?;
        Ok(row.map(ListItem::from))
    }

    fn update_list_item(&mut self, item: &ListItem) -> StoreResult<ListItem> {
        use schema::shopping_list_items::dsl as LI;

        let row = diesel::update(LI::shopping_list_items.find(item.id.0))
            .set(&ListItemChangeset::new(item))
            .returning(ListItemRow::as_returning())
            .get_result(&mut self.conn)?;
        Ok(row.into())
    }

    fn list_items(&mut self, list_id: ShoppingListId) -> StoreResult<Vec<ListItem>> {
        use schema::shopping_list_items::dsl as LI;

        let rows = LI::shopping_list_items
            .filter(LI::list_id.eq(list_id.0))
            .order((LI::created_at.asc(), LI::id.asc()))
            .select(ListItemRow::as_select())
            .load(&mut self.conn)?;
        Ok(rows.into_iter().map(ListItem::from).collect())
    }

    fn load_onboarding(&mut self, user_id: UserId) -> StoreResult<Option<OnboardingProgress>> {
        use schema::onboarding_progress::dsl as O;

        O::onboarding_progress
            .find(user_id.0)
            .select(OnboardingRow::as_select())
            .first(&mut self.conn)
            .optional()?
            .map(OnboardingRow::into_domain)
            .transpose()
    }

    fn save_onboarding(&mut self, progress: &OnboardingProgress) -> StoreResult<()> {
        use schema::onboarding_progress::dsl as O;

        let row = OnboardingUpsertRow::new(progress)?;
        diesel::insert_into(O::onboarding_progress)
            .values(&row)
            .on_conflict(O::user_id)
            .do_update()
            .set(&row)
            .execute(&mut self.conn)?;
        Ok(())
    }

    fn delete_onboarding(&mut self, user_id: UserId) -> StoreResult<bool> {
        use schema::onboarding_progress::dsl as O;

        let deleted = diesel::delete(O::onboarding_progress.find(user_id.0)).execute(&mut self.conn)?;
        Ok(deleted > 0)
    }
}
