//! Player catalog entries

use crate::credits::Credits;
use crate::error::CatalogError;
use rust_decimal::Decimal;
use scoring_engine::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Player represents one entry of the draftable catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub team: String,
    pub role: Role,
    pub price: Credits,
    pub photo_url: Option<String>,
    pub total_points: Option<Decimal>,
    pub average_points: Option<Decimal>,
}

impl Player {
    /// Create a new catalog entry with a fresh id
    pub fn new(name: impl Into<String>, team: impl Into<String>, role: Role, price: Credits) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            team: team.into(),
            role,
            price,
            photo_url: None,
            total_points: None,
            average_points: None,
        }
    }

    /// Inclusive listing price bounds, C$ 0.50 to C$ 10.00
    pub fn price_range() -> (Credits, Credits) {
        (Credits::from_cents(50), Credits::from_cents(1000))
    }

    /// Check the fields an admin must provide before the player is listed
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::MissingField("name"));
        }
        if self.team.trim().is_empty() {
            return Err(CatalogError::MissingField("team"));
        }

        let (min, max) = Self::price_range();
        if self.price < min || self.price > max {
            return Err(CatalogError::InvalidPrice { price: self.price, min, max });
        }

        Ok(())
    }
}
