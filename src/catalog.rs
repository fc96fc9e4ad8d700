//! Route Catalog
//!
//! Read-only collection of route records keyed by route key. The catalog is
//! loaded once (from a JSON data file or the bundled default) and preserves
//! the order in which routes appear in the source file; every query that
//! returns several routes keeps that order.

use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::models::parcours::RawParcours;
use crate::models::{Difficulty, RouteRecord};
use crate::{Result, WayGoError};

const BUNDLED_CATALOG: &str = include_str!("../data/parcours.json");

/// Static set of routes
#[derive(Debug, Clone, Default)]
pub struct RouteCatalog {
    records: Vec<RouteRecord>,
    index: HashMap<String, usize>,
}

impl RouteCatalog {
    /// Catalog shipped with the crate
    pub fn bundled() -> Result<Self> {
        Self::from_json_str(BUNDLED_CATALOG)
    }

    /// Load a catalog data file
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(WayGoError::catalog(format!(
                "catalog file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&content)?;
        info!("Loaded {} routes from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Load from the given path, or fall back to the bundled catalog
    pub fn load_or_bundled(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                debug!("No catalog path configured, using bundled catalog");
                Self::bundled()
            }
        }
    }

    /// Parse a JSON object mapping route key to route fields
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Map<String, Value> = serde_json::from_str(json)?;
        let mut records = Vec::with_capacity(entries.len());

        for (key, value) in entries {
            let raw: RawParcours = serde_json::from_value(value)
                .map_err(|e| WayGoError::catalog(format!("route '{key}': {e}")))?;
            records.push(raw.into_record(key)?);
        }

        Ok(Self::from_records(records))
    }

    #[must_use]
    pub fn from_records(records: Vec<RouteRecord>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.key.clone(), i))
            .collect();
        Self { records, index }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[RouteRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteRecord> {
        self.records.iter()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RouteRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// Like [`get`](Self::get) but reports a missing key as an error
    pub fn require(&self, key: &str) -> Result<&RouteRecord> {
        self.get(key).ok_or_else(|| WayGoError::route_not_found(key))
    }

    #[must_use]
    pub fn by_difficulty(&self, difficulty: Difficulty) -> Vec<&RouteRecord> {
        self.records
            .iter()
            .filter(|r| r.difficulty == difficulty)
            .collect()
    }

    /// Routes whose length lies in `[min_km, max_km]`
    #[must_use]
    pub fn by_distance_range(&self, min_km: f64, max_km: f64) -> Vec<&RouteRecord> {
        self.records
            .iter()
            .filter(|r| r.distance_km >= min_km && r.distance_km <= max_km)
            .collect()
    }

    /// Distinct cities in first-seen order
    #[must_use]
    pub fn cities(&self) -> Vec<&str> {
        let mut cities: Vec<&str> = Vec::new();
        for record in &self.records {
            if !cities.contains(&record.city.as_str()) {
                cities.push(&record.city);
            }
        }
        cities
    }
}

impl<'a> IntoIterator for &'a RouteCatalog {
    type Item = &'a RouteRecord;
    type IntoIter = std::slice::Iter<'a, RouteRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
