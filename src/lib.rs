pub mod models {
    pub mod inventory;
    pub mod onboarding;
}

pub mod config;
pub mod db {
    pub mod memory;
    pub mod models;
    pub mod pg;
    pub mod store;
}
pub mod error;
pub mod schema;
pub mod utils;
pub mod services {
    pub mod activity;
    pub mod condition;
    pub mod demo;
    pub mod hierarchy;
    pub mod inventory;
    pub mod items;
    pub mod onboarding;
    pub mod photos;
    pub mod realtime;
    pub mod shopping;
    pub mod stock;
}

pub use crate::db::store::InventoryStore;
pub use crate::error::{InventoryError, InventoryResult, InvariantViolation, StoreError};
pub use crate::services::inventory::{Inventory, InventoryOptions};
pub use crate::services::realtime::RealtimeBus;
