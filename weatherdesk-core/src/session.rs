use anyhow::{Context, anyhow};

use crate::{
    config::{Config, MISSING_API_KEY},
    error::{Error, Result},
    http::{HttpClient, RequestTrace},
    model::SavedLocation,
    sync::LocationSyncService,
    weather::WeatherLookup,
};

/// Lookup and sync wired to one shared [`HttpClient`], so both feed the same
/// diagnostics trace.
#[derive(Debug)]
pub struct Session {
    http: HttpClient,
    weather: Option<WeatherLookup>,
    locations: LocationSyncService,
}

impl Session {
    /// Build a session from config. A missing API key only disables weather lookups.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = HttpClient::with_timeout(config.timeout()).context("Failed to build HTTP client")?;

        let weather = match config.weather_api_key() {
            Ok(key) => Some(
                WeatherLookup::new(http.clone(), &config.weather.base_url, key)
                    .context("Invalid weather configuration")?,
            ),
            Err(_) => None,
        };

        let locations = LocationSyncService::new(http.clone(), &config.locations.base_url)
            .context("Invalid locations configuration")?;

        Ok(Self { http, weather, locations })
    }

    pub fn weather(&self) -> anyhow::Result<&WeatherLookup> {
        self.weather.as_ref().ok_or_else(|| anyhow!(MISSING_API_KEY))
    }

    pub fn locations(&self) -> &LocationSyncService {
        &self.locations
    }

    pub fn locations_mut(&mut self) -> &mut LocationSyncService {
        &mut self.locations
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn last_trace(&self) -> Option<RequestTrace> {
        self.http.last_trace()
    }

    /// Save the weather result currently on display as a new location.
    pub async fn save_current_weather(&self) -> Result<SavedLocation> {
        let snapshot = self
            .weather
            .as_ref()
            .and_then(WeatherLookup::current)
            .ok_or_else(|| Error::Validation("no weather result to save".into()))?;

        self.locations.create(&snapshot.to_draft()).await
    }
}
