//! Current-weather lookup against the OpenWeather API.

use parking_lot::RwLock;
use reqwest::Url;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    error::{Error, Result},
    http::HttpClient,
    model::WeatherSnapshot,
};

pub const OPENWEATHER_CURRENT_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Fetches current weather and keeps the result of the newest lookup for display.
///
/// A lookup started while another is pending supersedes it: the older one
/// still returns its result to its caller but never reaches [`current`].
///
/// [`current`]: WeatherLookup::current
#[derive(Debug)]
pub struct WeatherLookup {
    http: HttpClient,
    base_url: Url,
    api_key: String,
    generation: AtomicU64,
    current: RwLock<Option<WeatherSnapshot>>,
}

impl WeatherLookup {
    pub fn new(http: HttpClient, base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Validation(format!("invalid weather URL '{base_url}': {e}")))?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            generation: AtomicU64::new(0),
            current: RwLock::new(None),
        })
    }

    pub async fn fetch_weather(&self, city_name: &str) -> Result<WeatherSnapshot> {
        let city = city_name.trim();
        if city.is_empty() {
            return Err(Error::Validation("Please enter a city name".into()));
        }

        let generation = self.begin();

        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("q", city)
            .append_pair("units", "metric")
            .append_pair("appid", &self.api_key);

        let res = self.http.get(url).await?;
        if !res.is_success() {
            return Err(res.into_remote_error("Failed to fetch weather data"));
        }

        let parsed: OwCurrentResponse = serde_json::from_value(res.json()?)
            .map_err(|e| Error::Parse(format!("unexpected OpenWeather payload: {e}")))?;
        let snapshot = parsed.into_snapshot();

        self.publish(generation, &snapshot);
        Ok(snapshot)
    }

    /// Snapshot of the newest completed lookup, if it is still on display.
    pub fn current(&self) -> Option<WeatherSnapshot> {
        self.current.read().clone()
    }

    /// Drop the displayed snapshot and ignore any lookup still in flight.
    pub fn clear(&self) {
        self.begin();
    }

    fn begin(&self) -> u64 {
        let mut current = self.current.write();
        *current = None;
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn publish(&self, generation: u64, snapshot: &WeatherSnapshot) {
        let mut current = self.current.write();
        if self.generation.load(Ordering::SeqCst) == generation {
            *current = Some(snapshot.clone());
        } else {
            tracing::debug!(city = %snapshot.city_name, "discarding superseded weather lookup");
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    #[serde(default)]
    sys: OwSys,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

impl OwCurrentResponse {
    fn into_snapshot(self) -> WeatherSnapshot {
        let (condition_main, condition_description) = self
            .weather
            .into_iter()
            .next()
            .map(|w| (w.main, w.description))
            .unwrap_or_else(|| ("Unknown".to_string(), "Unknown".to_string()));

        WeatherSnapshot {
            city_name: self.name,
            country_code: self.sys.country,
            condition_main,
            condition_description,
            temperature_c: self.main.temp,
            feels_like_c: self.main.feels_like,
            humidity_pct: self.main.humidity,
            wind_speed: self.wind.speed,
        }
    }
}
