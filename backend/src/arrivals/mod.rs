//! Demand generation for deterministic request creation.
//!
//! Generates automatic item requests from per-zone demand profiles. Used by
//! the scenario harness to drive the engine without an external requester.
//!
//! # Key Principles
//!
//! 1. **Determinism**: same seed + same profiles → same requests, ids included
//! 2. **Per-Zone Profiles**: each zone has its own rate, item mix and destinations
//! 3. **Poisson Arrivals**: request count per tick follows a Poisson distribution
//!
//! # Example
//!
//! ```
//! use courier_logistics_core::arrivals::{DemandGenerator, DemandProfile, QuantityDistribution, WeightedItem};
//! use courier_logistics_core::{BlockPos, Priority, RngManager, WarehouseLocation};
//!
//! let profile = DemandProfile {
//!     zone: 1,
//!     rate_per_tick: 0.5,
//!     items: vec![WeightedItem { item_id: "wood".to_string(), weight: 1.0 }],
//!     quantity: QuantityDistribution::Uniform { min: 1, max: 16 },
//!     priority: Priority::Normal,
//!     destinations: vec![WarehouseLocation::new(1, "overworld", BlockPos::new(9, 64, 0))],
//! };
//! let generator = DemandGenerator::new(vec![profile]).unwrap();
//!
//! let mut rng = RngManager::new(42);
//! let requests = generator.generate(0, &mut rng);
//! assert!(requests.iter().all(|r| r.item_id() == "wood"));
//! ```

use crate::models::item::ItemId;
use crate::models::location::{WarehouseLocation, ZoneId};
use crate::models::request::{ItemRequest, Priority, RequestType};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Builder;

/// An item a profile may request, with its relative frequency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedItem {
    pub item_id: ItemId,
    pub weight: f64,
}

/// How many units each generated request asks for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuantityDistribution {
    Fixed { quantity: u32 },
    /// Uniform between min and max (inclusive)
    Uniform { min: u32, max: u32 },
}

/// Demand configuration for one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandProfile {
    pub zone: ZoneId,

    /// Expected requests per tick (Poisson λ)
    pub rate_per_tick: f64,

    pub items: Vec<WeightedItem>,

    pub quantity: QuantityDistribution,

    #[serde(default)]
    pub priority: Priority,

    /// Picked uniformly for each request
    pub destinations: Vec<WarehouseLocation>,
}

#[derive(Debug, Error, PartialEq)]
pub enum DemandProfileError {
    #[error("zone {zone}: rate_per_tick must be finite and >= 0, got {rate}")]
    InvalidRate { zone: ZoneId, rate: f64 },

    #[error("zone {zone}: no item with a positive weight")]
    NoItems { zone: ZoneId },

    #[error("zone {zone}: no destinations")]
    NoDestinations { zone: ZoneId },

    #[error("zone {zone}: destination {destination} lies in another zone")]
    ForeignDestination {
        zone: ZoneId,
        destination: WarehouseLocation,
    },

    #[error("zone {zone}: invalid quantity range {min}..={max}")]
    InvalidQuantity { zone: ZoneId, min: u32, max: u32 },
}

impl DemandProfile {
    fn validate(&self) -> Result<(), DemandProfileError> {
        let zone = self.zone;
        if !self.rate_per_tick.is_finite() || self.rate_per_tick < 0.0 {
            return Err(DemandProfileError::InvalidRate {
                zone,
                rate: self.rate_per_tick,
            });
        }
        if !self.items.iter().any(|item| item.weight > 0.0 && !item.item_id.is_empty()) {
            return Err(DemandProfileError::NoItems { zone });
        }
        if self.destinations.is_empty() {
            return Err(DemandProfileError::NoDestinations { zone });
        }
        if let Some(foreign) = self.destinations.iter().find(|d| d.zone != zone) {
            return Err(DemandProfileError::ForeignDestination {
                zone,
                destination: foreign.clone(),
            });
        }
        let (min, max) = match self.quantity {
            QuantityDistribution::Fixed { quantity } => (quantity, quantity),
            QuantityDistribution::Uniform { min, max } => (min, max),
        };
        if min == 0 || min > max {
            return Err(DemandProfileError::InvalidQuantity { zone, min, max });
        }
        Ok(())
    }
}

/// Generator for automatic requests across all zones.
#[derive(Debug, Clone)]
pub struct DemandGenerator {
    profiles: Vec<DemandProfile>,
}

impl DemandGenerator {
    /// Validate and wrap the profiles; they are sampled in the given order
    pub fn new(profiles: Vec<DemandProfile>) -> Result<Self, DemandProfileError> {
        for profile in &profiles {
            profile.validate()?;
        }
        Ok(Self { profiles })
    }

    pub fn profiles(&self) -> &[DemandProfile] {
        &self.profiles
    }

    /// Generate this tick's requests for every zone
    pub fn generate(&self, tick: usize, rng: &mut RngManager) -> Vec<ItemRequest> {
        let mut requests = Vec::new();
        for profile in &self.profiles {
            let count = rng.poisson(profile.rate_per_tick);
            for _ in 0..count {
                if let Some(request) = self.sample_request(profile, tick, rng) {
                    requests.push(request);
                }
            }
        }
        requests
    }

    fn sample_request(
        &self,
        profile: &DemandProfile,
        tick: usize,
        rng: &mut RngManager,
    ) -> Option<ItemRequest> {
        let weights: Vec<f64> = profile.items.iter().map(|item| item.weight).collect();
        let item = &profile.items[rng.pick_weighted(&weights)?];

        let quantity = match profile.quantity {
            QuantityDistribution::Fixed { quantity } => quantity,
            QuantityDistribution::Uniform { min, max } => {
                rng.range(i64::from(min), i64::from(max) + 1) as u32
            }
        };

        let index = rng.range(0, profile.destinations.len() as i64) as usize;
        let destination = profile.destinations[index].clone();

        let mut id_bytes = [0u8; 16];
        id_bytes[..8].copy_from_slice(&rng.next().to_be_bytes());
        id_bytes[8..].copy_from_slice(&rng.next().to_be_bytes());
        let id = Builder::from_random_bytes(id_bytes).into_uuid();

        // Profile validation rules out every constructor error
        ItemRequest::new(profile.zone, item.item_id.clone(), quantity, destination, tick)
            .ok()
            .map(|request| {
                request
                    .with_id(id)
                    .with_priority(profile.priority)
                    .with_request_type(RequestType::Automatic)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::location::BlockPos;

    fn profile(rate: f64) -> DemandProfile {
        DemandProfile {
            zone: 1,
            rate_per_tick: rate,
            items: vec![
                WeightedItem {
                    item_id: "wood".to_string(),
                    weight: 3.0,
                },
                WeightedItem {
                    item_id: "iron".to_string(),
                    weight: 1.0,
                },
            ],
            quantity: QuantityDistribution::Uniform { min: 2, max: 8 },
            priority: Priority::High,
            destinations: vec![
                WarehouseLocation::new(1, "overworld", BlockPos::new(9, 64, 0)),
                WarehouseLocation::new(1, "overworld", BlockPos::new(-9, 64, 0)),
            ],
        }
    }

    #[test]
    fn test_generation_deterministic() {
        let generator = DemandGenerator::new(vec![profile(2.0)]).unwrap();

        let mut rng1 = RngManager::new(42);
        let mut rng2 = RngManager::new(42);
        for tick in 0..20 {
            let a = generator.generate(tick, &mut rng1);
            let b = generator.generate(tick, &mut rng2);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_generated_requests_follow_profile() {
        let generator = DemandGenerator::new(vec![profile(5.0)]).unwrap();
        let mut rng = RngManager::new(7);

        let requests: Vec<ItemRequest> = (0..10).flat_map(|t| generator.generate(t, &mut rng)).collect();
        assert!(!requests.is_empty());
        for request in &requests {
            assert!((2..=8).contains(&request.quantity()));
            assert_eq!(request.zone(), 1);
            assert_eq!(request.priority(), Priority::High);
            assert_eq!(request.request_type(), RequestType::Automatic);
        }
    }

    #[test]
    fn test_zero_rate_generates_nothing() {
        let generator = DemandGenerator::new(vec![profile(0.0)]).unwrap();
        let mut rng = RngManager::new(1);
        assert!(generator.generate(0, &mut rng).is_empty());
    }

    #[test]
    fn test_invalid_profiles_rejected() {
        let mut foreign = profile(1.0);
        foreign.destinations[0].zone = 2;
        assert!(matches!(
            DemandGenerator::new(vec![foreign]),
            Err(DemandProfileError::ForeignDestination { .. })
        ));

        let mut empty_range = profile(1.0);
        empty_range.quantity = QuantityDistribution::Uniform { min: 5, max: 2 };
        assert!(DemandGenerator::new(vec![empty_range]).is_err());

        let mut no_items = profile(1.0);
        no_items.items.clear();
        assert_eq!(
            DemandGenerator::new(vec![no_items]).unwrap_err(),
            DemandProfileError::NoItems { zone: 1 }
        );
    }
}
