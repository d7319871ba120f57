//! Offline catalog of Bangladeshi locations with the district → thana → gram
//! cascading filter.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::WeatherError;
use crate::types::Coordinates;

const EMBEDDED_DATASET: &str = include_str!("../data/bangladesh_locations.json");

pub const MIN_SEARCH_CHARS: usize = 2;
pub const MAX_SEARCH_RESULTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub district: String,
    pub thana: String,
    #[serde(default)]
    pub gram: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn coordinates(&self) -> Result<Coordinates, WeatherError> {
        Ok(Coordinates::new(self.latitude, self.longitude)?)
    }

    /// `name, district[, thana]`, thana omitted when it repeats the name.
    pub fn search_label(&self) -> String {
        if self.thana == self.name {
            format!("{}, {}", self.name, self.district)
        } else {
            format!("{}, {}, {}", self.name, self.district, self.thana)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub label: String,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopularLocation {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

impl PopularLocation {
    pub fn coordinates(&self) -> Result<Coordinates, WeatherError> {
        Ok(Coordinates::new(self.latitude, self.longitude)?)
    }
}

pub const POPULAR_LOCATIONS: [PopularLocation; 5] = [
    PopularLocation { name: "Dhaka", latitude: 23.8103, longitude: 90.4125 },
    PopularLocation { name: "Chittagong", latitude: 22.3569, longitude: 91.7832 },
    PopularLocation { name: "Sylhet", latitude: 24.8949, longitude: 91.8687 },
    PopularLocation { name: "Khulna", latitude: 22.8456, longitude: 89.5403 },
    PopularLocation { name: "Rajshahi", latitude: 24.3745, longitude: 88.6042 },
];

/// Immutable list of locations, loaded once. Duplicates are kept.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    locations: Vec<Location>,
}

impl Catalog {
    /// Catalog compiled into the binary.
    pub fn embedded() -> Result<Self, WeatherError> {
        Self::from_json(EMBEDDED_DATASET)
    }

    pub fn from_json(raw: &str) -> Result<Self, WeatherError> {
        let locations: Vec<Location> = serde_json::from_str(raw)?;
        tracing::debug!("Loaded {} catalog locations", locations.len());
        Ok(Self { locations })
    }

    pub fn from_locations(locations: Vec<Location>) -> Self {
        Self { locations }
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn districts(&self) -> Vec<String> {
        self.locations
            .iter()
            .map(|l| l.district.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn thanas(&self, district: &str) -> Vec<String> {
        self.locations
            .iter()
            .filter(|l| l.district == district)
            .map(|l| l.thana.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn grams(&self, district: &str, thana: &str) -> Vec<String> {
        self.locations
            .iter()
            .filter(|l| l.district == district && l.thana == thana)
            .filter_map(|l| l.gram.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// First entry matching all three levels. `gram: None` matches the
    /// thana-level entry that carries no gram.
    pub fn resolve(&self, district: &str, thana: &str, gram: Option<&str>) -> Option<&Location> {
        self.locations
            .iter()
            .find(|l| l.district == district && l.thana == thana && l.gram.as_deref() == gram)
    }

    /// Case-insensitive substring search over name, district and thana.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let needle = query.trim().to_lowercase();
        if needle.chars().count() < MIN_SEARCH_CHARS {
            return Vec::new();
        }

        self.locations
            .iter()
            .filter(|l| {
                l.name.to_lowercase().contains(&needle)
                    || l.district.to_lowercase().contains(&needle)
                    || l.thana.to_lowercase().contains(&needle)
            })
            .take(MAX_SEARCH_RESULTS)
            .map(|l| SearchHit {
                label: l.search_label(),
                location: l.clone(),
            })
            .collect()
    }
}

/// Current district/thana/gram picks.
///
/// Changing a level always clears every level below it, even when the old
/// value would still be valid under the new parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeSelection {
    district: Option<String>,
    thana: Option<String>,
    gram: Option<String>,
}

impl CascadeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn district(&self) -> Option<&str> {
        self.district.as_deref()
    }

    pub fn thana(&self) -> Option<&str> {
        self.thana.as_deref()
    }

    pub fn gram(&self) -> Option<&str> {
        self.gram.as_deref()
    }

    pub fn set_district(&mut self, district: Option<String>) {
        self.district = district.filter(|d| !d.is_empty());
        self.thana = None;
        self.gram = None;
    }

    /// Ignored until a district is chosen.
    pub fn set_thana(&mut self, thana: Option<String>) {
        if self.district.is_none() {
            return;
        }
        self.thana = thana.filter(|t| !t.is_empty());
        self.gram = None;
    }

    /// Ignored until a thana is chosen.
    pub fn set_gram(&mut self, gram: Option<String>) {
        if self.thana.is_none() {
            return;
        }
        self.gram = gram.filter(|g| !g.is_empty());
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Options for the next unfilled level.
    pub fn options(&self, catalog: &Catalog) -> Vec<String> {
        match (&self.district, &self.thana) {
            (None, _) => catalog.districts(),
            (Some(d), None) => catalog.thanas(d),
            (Some(d), Some(t)) => catalog.grams(d, t),
        }
    }

    /// The catalog entry for the current picks, once district and thana are set.
    pub fn resolve<'a>(&self, catalog: &'a Catalog) -> Option<&'a Location> {
        let district = self.district.as_deref()?;
        let thana = self.thana.as_deref()?;
        catalog.resolve(district, thana, self.gram.as_deref())
    }

    /// `gram, thana, district`, skipping levels not yet chosen.
    pub fn label(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.gram, &self.thana, &self.district]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}
