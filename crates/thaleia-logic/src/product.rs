//! Buildable products and the building catalog.
//!
//! The scheduler only needs a unit cost from whatever it builds, so it works
//! against the [`Buildable`] trait. [`BuildingType`] and [`BuildingCatalog`]
//! are the data-driven implementation used by the game and the harness.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Something a colony can produce.
pub trait Buildable {
    /// Industrial points needed to produce one unit. Must be positive.
    fn unit_cost(&self) -> u32;

    /// Display name.
    fn name(&self) -> &str;
}

/// A building kind from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingType {
    pub id: String,
    pub name: String,
    /// Industrial points per building.
    pub unit_cost: u32,
}

impl BuildingType {
    pub fn new(id: impl Into<String>, name: impl Into<String>, unit_cost: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_cost,
        }
    }
}

impl Buildable for BuildingType {
    fn unit_cost(&self) -> u32 {
        self.unit_cost
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered list of every building kind a colony may queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingCatalog {
    types: Vec<BuildingType>,
}

impl BuildingCatalog {
    pub fn new(types: Vec<BuildingType>) -> Self {
        Self { types }
    }

    /// The four building kinds available at game start.
    pub fn standard() -> Self {
        Self::new(vec![
            BuildingType::new("factory", "Factory", 1000),
            BuildingType::new("laboratory", "Laboratory", 800),
            BuildingType::new("mine", "Mine", 600),
            BuildingType::new("shipyard", "Shipyard", 2400),
        ])
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn get(&self, id: &str) -> Option<&BuildingType> {
        self.types.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildingType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Check the catalog for entries the scheduler cannot use.
    /// Returns a human-readable description of every problem found.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();
        for t in &self.types {
            if t.id.is_empty() {
                problems.push(format!("building '{}' has an empty id", t.name));
            }
            if t.name.trim().is_empty() {
                problems.push(format!("building '{}' has an empty name", t.id));
            }
            if t.unit_cost == 0 {
                problems.push(format!("building '{}' has zero unit cost", t.id));
            }
            if !seen.insert(t.id.as_str()) {
                problems.push(format!("building id '{}' is listed twice", t.id));
            }
        }
        problems
    }
}
