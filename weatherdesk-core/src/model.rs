use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Server-assigned identity of a saved location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub u64);

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for LocationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(LocationId)
    }
}

/// A location the user saved, as persisted by the remote collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub id: LocationId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SavedLocation {
    /// Build a record from a create response; the body must carry the assigned id.
    pub(crate) fn from_created(body: serde_json::Value) -> Result<Self> {
        if body.get("id").is_none_or(|id| id.is_null()) {
            return Err(Error::Parse("create response did not include an id".into()));
        }

        serde_json::from_value(body)
            .map_err(|e| Error::Parse(format!("invalid saved location in response: {e}")))
    }
}

/// A saved location that has not been created remotely yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocationDraft {
    pub name: String,
    pub city: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LocationDraft {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("location name must not be empty".into()));
        }
        if self.city.trim().is_empty() {
            return Err(Error::Validation("city must not be empty".into()));
        }
        Ok(())
    }
}

/// Partial update of a saved location. Also used to read the update response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LocationChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.city.is_none() && self.country.is_none() && self.notes.is_none()
    }

    /// Overwrite every field that is set here. The id is never touched.
    pub fn apply_to(&self, location: &mut SavedLocation) {
        if let Some(name) = &self.name {
            location.name = name.clone();
        }
        if let Some(city) = &self.city {
            location.city = city.clone();
        }
        if let Some(country) = &self.country {
            location.country = country.clone();
        }
        if let Some(notes) = &self.notes {
            location.notes = Some(notes.clone());
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::Validation("no changes given".into()));
        }
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(Error::Validation("location name must not be empty".into()));
        }
        if self.city.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(Error::Validation("city must not be empty".into()));
        }
        Ok(())
    }
}

/// Current weather for a city, built fresh for every lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city_name: String,
    pub country_code: String,
    pub condition_main: String,
    pub condition_description: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub wind_speed: f64,
}

impl WeatherSnapshot {
    /// Prefill a draft for the "save this location" action.
    pub fn to_draft(&self) -> LocationDraft {
        LocationDraft {
            name: format!("Weather in {}", self.city_name),
            city: self.city_name.clone(),
            country: self.country_code.clone(),
            notes: Some(format!(
                "Temp: {}°C, Weather: {}",
                self.temperature_c, self.condition_description
            )),
        }
    }
}

impl fmt::Display for WeatherSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}, {}", self.city_name, self.country_code)?;
        writeln!(f, "Weather: {} - {}", self.condition_main, self.condition_description)?;
        writeln!(
            f,
            "Temperature: {}°C (Feels like: {}°C)",
            self.temperature_c, self.feels_like_c
        )?;
        writeln!(f, "Humidity: {}%", self.humidity_pct)?;
        write!(f, "Wind: {} m/s", self.wind_speed)
    }
}
