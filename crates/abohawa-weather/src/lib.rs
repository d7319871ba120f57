//! Weather data for Bangladeshi locations
//!
//! Provides the offline location catalog, an Open-Meteo client with
//! Nominatim reverse geocoding, a short-TTL result cache and the WMO
//! weather code table.

pub mod cache;
pub mod catalog;
pub mod client;
pub mod condition;
pub mod error;
pub mod geocode;
pub mod types;

pub use cache::{CacheKey, Clock, ManualClock, ResultCache, SystemClock};
pub use catalog::{CascadeSelection, Catalog, Location, PopularLocation, SearchHit, POPULAR_LOCATIONS};
pub use client::{WeatherApi, WeatherClient, WeatherClientConfig};
pub use condition::{resolve, ConditionCategory, ConditionInfo};
pub use error::{ValidationError, WeatherError};
pub use types::*;
