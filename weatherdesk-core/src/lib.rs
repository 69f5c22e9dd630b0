//! Core library for `weatherdesk`.
//!
//! This crate defines:
//! - A JSON HTTP client that keeps a redacted trace of the last call
//! - Current-weather lookup
//! - The saved-locations list and its sync with a remote REST collection
//! - Configuration and the error taxonomy shared by all of the above
//!
//! It is used by `weatherdesk-cli`, but can also be driven by other front ends.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod http;
pub mod model;
pub mod session;
pub mod store;
pub mod sync;
pub mod weather;

pub use config::Config;
pub use error::{Error, Result};
pub use http::{HttpClient, HttpResponse, RequestTrace};
pub use model::{LocationChanges, LocationDraft, LocationId, SavedLocation, WeatherSnapshot};
pub use session::Session;
pub use store::LocationStore;
pub use sync::{LocationSyncService, OpState, SyncEvent, SyncObserver, SyncOp};
pub use weather::WeatherLookup;
