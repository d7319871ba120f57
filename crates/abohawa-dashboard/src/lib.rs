//! Weather dashboard controller
//!
//! Drives catalog selection, cached client calls and unit preferences
//! behind a command interface any front-end can call.

pub mod controller;
pub mod prefs;
pub mod view;

#[cfg(test)]
mod testing;

pub use controller::{
    Dashboard, DashboardBuilder, DashboardEvent, DashboardSettings, DashboardState, LoadOutcome,
    Phase, PopularTemperature, Selection,
};
pub use prefs::{PreferenceStore, Preferences, SavedLocation};
pub use view::{DashboardView, ForecastRow};
