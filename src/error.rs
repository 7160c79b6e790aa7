//! Error taxonomy for the inventory core.
//!
//! Validation and invariant errors carry enough detail to correct the input. Tenant and
//! permission errors are deliberately terse so they never reveal whether an id exists in
//! another household.

use crate::models::inventory::{ContainerId, LocationId, NonConsumableId};
use crate::models::onboarding::OnboardingStep;
use core::fmt;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failures of the backing store (database unreachable, query failed, bad row).
#[derive(Debug)]
pub enum StoreError {
    Connection(String),
    Query(diesel::result::Error),
    Migration(String),
    /// A stored row could not be decoded into its domain type.
    Corrupt(String),
    /// Injected or detected outage of a store component.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Connection(e) => write!(f, "connection error: {}", e),
            StoreError::Query(e) => write!(f, "query error: {}", e),
            StoreError::Migration(e) => write!(f, "migration error: {}", e),
            StoreError::Corrupt(e) => write!(f, "corrupt row: {}", e),
            StoreError::Unavailable(e) => write!(f, "store unavailable: {}", e),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Query(e) => Some(e),
            _ => None,
        }
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(value: diesel::result::Error) -> Self {
        StoreError::Query(value)
    }
}

impl From<diesel::ConnectionError> for StoreError {
    fn from(value: diesel::ConnectionError) -> Self {
        StoreError::Connection(value.to_string())
    }
}

/// Business rules the core refuses to break.
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    NegativeQuantity { current: i32, delta: i32 },
    InvalidPlacement { location_id: LocationId, container_id: ContainerId },
    ContainerNotEmpty { container_id: ContainerId, active_items: i64 },
    LocationNotEmpty { location_id: LocationId, active_items: i64 },
    ConditionIsLogged { item_id: NonConsumableId },
    IllegalTransition { from: OnboardingStep, action: &'static str },
}

impl Display for InvariantViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::NegativeQuantity { current, delta } => {
                write!(f, "quantity {} cannot be adjusted by {} below zero", current, delta)
            }
            InvariantViolation::InvalidPlacement {
                location_id,
                container_id,
            } => write!(f, "container {} is not in location {}", container_id, location_id),
            InvariantViolation::ContainerNotEmpty {
                container_id,
                active_items,
            } => write!(f, "container {} still holds {} active item(s)", container_id, active_items),
            InvariantViolation::LocationNotEmpty {
                location_id,
                active_items,
            } => write!(f, "location {} still holds {} active item(s)", location_id, active_items),
            InvariantViolation::ConditionIsLogged { item_id } => {
                write!(f, "condition of item {} is derived from its condition log", item_id)
            }
            InvariantViolation::IllegalTransition { from, action } => {
                write!(f, "cannot {} from onboarding step {:?}", action, from)
            }
        }
    }
}

#[derive(Debug)]
pub enum InventoryError {
    /// Missing or malformed input.
    Validation(String),
    Invariant(InvariantViolation),
    CrossTenantAccess,
    PermissionDenied,
    NotFound { entity: &'static str, id: i64 },
    /// Store or bus unavailable; safe to retry.
    Infrastructure(StoreError),
}

impl InventoryError {
    pub fn validation(message: impl Into<String>) -> Self {
        InventoryError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        InventoryError::NotFound { entity, id }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, InventoryError::Infrastructure(_))
    }

    pub fn invariant(&self) -> Option<&InvariantViolation> {
        match self {
            InventoryError::Invariant(v) => Some(v),
            _ => None,
        }
    }
}

impl Display for InventoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InventoryError::Validation(m) => write!(f, "validation error: {}", m),
            InventoryError::Invariant(v) => write!(f, "invariant violation: {}", v),
            InventoryError::CrossTenantAccess => write!(f, "access denied"),
            InventoryError::PermissionDenied => write!(f, "permission denied"),
            InventoryError::NotFound { entity, id } => write!(f, "{} {} not found", entity, id),
            InventoryError::Infrastructure(e) => write!(f, "infrastructure error: {}", e),
        }
    }
}

impl Error for InventoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InventoryError::Infrastructure(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for InventoryError {
    fn from(value: StoreError) -> Self {
        InventoryError::Infrastructure(value)
    }
}

impl From<InvariantViolation> for InventoryError {
    fn from(value: InvariantViolation) -> Self {
        InventoryError::Invariant(value)
    }
}

pub type InventoryResult<T> = Result<T, InventoryError>;
