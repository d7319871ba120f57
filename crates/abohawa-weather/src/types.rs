use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a stored Celsius value into this unit.
    pub fn convert(self, celsius: f64) -> f64 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius_to_fahrenheit(celsius),
        }
    }

    /// Convert and round to the nearest whole degree for display.
    pub fn display_degrees(self, celsius: f64) -> i64 {
        self.convert(celsius).round() as i64
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Celsius => Self::Fahrenheit,
            Self::Fahrenheit => Self::Celsius,
        }
    }

    /// Parse loose user input ("c", "celsius", "F", ...).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "c" | "celsius" => Some(Self::Celsius),
            "f" | "fahrenheit" => Some(Self::Fahrenheit),
            _ => None,
        }
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build a coordinate pair, rejecting anything outside the WGS84 range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        validate_coordinates(latitude, longitude)?;
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// `"23.81, 90.41"`, used wherever no place name is known.
    pub fn label(&self) -> String {
        format!("{:.2}, {:.2}", self.latitude, self.longitude)
    }
}

pub fn validate_coordinates(lat: f64, lon: f64) -> Result<(), ValidationError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::InvalidLatitude(lat));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(ValidationError::InvalidLongitude(lon));
    }
    Ok(())
}

/// Which upstream query a cached payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryKind {
    Current,
    Forecast,
    ReverseGeocode,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Forecast => "forecast",
            Self::ReverseGeocode => "reverse-geocode",
        }
    }
}

/// Current conditions captured at one fetch. Temperatures are Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    /// km/h
    pub wind_speed: f64,
    /// Degrees, 0 = north
    pub wind_direction: f64,
    pub condition_code: i32,
    /// Location-local wall clock time.
    pub sunrise: Option<NaiveDateTime>,
    pub sunset: Option<NaiveDateTime>,
    /// Seconds east of UTC.
    pub timezone_offset: i32,
}

impl WeatherSnapshot {
    /// Day or night at the snapshot's location at `now`.
    pub fn time_of_day(&self, now: DateTime<Utc>) -> TimeOfDay {
        let local = now.naive_utc() + chrono::Duration::seconds(self.timezone_offset.into());
        TimeOfDay::from_hour(local.hour())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub max_temp: f64,
    pub min_temp: f64,
    pub condition_code: i32,
}

impl ForecastDay {
    /// `Today` for the first row, abbreviated weekday otherwise.
    pub fn day_label(&self, index: usize) -> &'static str {
        if index == 0 {
            return "Today";
        }
        match self.date.weekday() {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        }
    }
}

/// Ordered daily forecast, one entry per day starting today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSnapshot {
    pub days: Vec<ForecastDay>,
}

/// A geocoding search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub name: String,
    pub country: Option<String>,
    pub admin1: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl PlaceCandidate {
    pub fn label(&self) -> String {
        match &self.country {
            Some(country) if !country.is_empty() => format!("{}, {}", self.name, country),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Day,
    Night,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        if (6..18).contains(&hour) {
            Self::Day
        } else {
            Self::Night
        }
    }
}

/// 8-point compass label for a wind bearing in degrees.
pub fn wind_direction_label(degrees: f64) -> &'static str {
    const DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    if !degrees.is_finite() {
        return "N";
    }
    let index = (degrees / 45.0).round().rem_euclid(8.0) as usize;
    DIRECTIONS[index % 8]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_freezing_and_boiling_points() {
        assert_eq!(TemperatureUnit::Fahrenheit.display_degrees(0.0), 32);
        assert_eq!(TemperatureUnit::Fahrenheit.display_degrees(100.0), 212);
        assert_eq!(TemperatureUnit::Celsius.display_degrees(31.6), 32);
    }

    #[test]
    fn test_unit_parse_and_toggle() {
        assert_eq!(TemperatureUnit::parse(" F "), Some(TemperatureUnit::Fahrenheit));
        assert_eq!(TemperatureUnit::parse("celsius"), Some(TemperatureUnit::Celsius));
        assert_eq!(TemperatureUnit::parse("kelvin"), None);
        assert_eq!(TemperatureUnit::Celsius.toggled(), TemperatureUnit::Fahrenheit);
    }

    #[test]
    fn test_coordinates_reject_out_of_range() {
        assert!(Coordinates::new(23.8103, 90.4125).is_ok());
        assert!(Coordinates::new(-90.0, 180.0).is_ok());
        assert_eq!(
            Coordinates::new(90.5, 0.0).unwrap_err(),
            ValidationError::InvalidLatitude(90.5)
        );
        assert_eq!(
            Coordinates::new(0.0, -181.0).unwrap_err(),
            ValidationError::InvalidLongitude(-181.0)
        );
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_coordinate_label_uses_two_decimals() {
        let coords = Coordinates::new(23.8103, 90.4125).unwrap();
        assert_eq!(coords.label(), "23.81, 90.41");
    }

    #[test]
    fn test_wind_direction_label() {
        assert_eq!(wind_direction_label(0.0), "N");
        assert_eq!(wind_direction_label(44.0), "NE");
        assert_eq!(wind_direction_label(180.0), "S");
        assert_eq!(wind_direction_label(350.0), "N");
        assert_eq!(wind_direction_label(-90.0), "W");
    }

    #[test]
    fn test_time_of_day_boundaries() {
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(6), TimeOfDay::Day);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Day);
        assert_eq!(TimeOfDay::from_hour(18), TimeOfDay::Night);
    }

    #[test]
    fn test_time_of_day_uses_location_offset() {
        use chrono::TimeZone;

        let snapshot = WeatherSnapshot {
            temperature: 28.0,
            feels_like: 30.0,
            humidity: 70.0,
            wind_speed: 5.0,
            wind_direction: 90.0,
            condition_code: 0,
            sunrise: None,
            sunset: None,
            timezone_offset: 6 * 3600,
        };
        // 11:00 UTC is 17:00 in Dhaka, 13:00 UTC is 19:00
        let afternoon = Utc.with_ymd_and_hms(2026, 10, 18, 11, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2026, 10, 18, 13, 0, 0).unwrap();
        assert_eq!(snapshot.time_of_day(afternoon), TimeOfDay::Day);
        assert_eq!(snapshot.time_of_day(evening), TimeOfDay::Night);
    }

    #[test]
    fn test_forecast_day_labels() {
        let day = ForecastDay {
            date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            max_temp: 31.0,
            min_temp: 24.0,
            condition_code: 3,
        };
        assert_eq!(day.day_label(0), "Today");
        assert_eq!(day.day_label(1), "Mon");
    }
}
