use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, Text};
use std::sync::Arc;
use weatherdesk_core::{
    Config, LocationChanges, LocationDraft, LocationId, OpState, SavedLocation, Session, SyncEvent,
    SyncObserver, SyncOp, diagnostics,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherdesk", version, about = "Weather lookup and saved locations")]
pub struct Cli {
    /// Print method, URL, status and body of the last request.
    #[arg(long, global = true)]
    pub trace: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the weather API key and service endpoints.
    Configure,

    /// Show current weather for a city.
    Show {
        city: String,

        /// Also save the city as a new location.
        #[arg(long)]
        save: bool,
    },

    /// List saved locations.
    List,

    /// Save a new location.
    Save {
        #[arg(long)]
        name: String,
        #[arg(long)]
        city: String,
        #[arg(long, default_value = "")]
        country: String,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Change fields of a saved location.
    Update {
        id: LocationId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a saved location.
    Delete {
        id: LocationId,

        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        // Configure must work even when the stored config is unusable.
        if let Command::Configure = self.command {
            return configure();
        }

        let config = Config::load()?;
        tracing::debug!(
            weather = %config.weather.base_url,
            locations = %config.locations.base_url,
            "loaded configuration"
        );
        let mut session = Session::from_config(&config)?;
        session.locations_mut().subscribe(Arc::new(Progress));

        let result = self.command.execute(&session).await;

        if self.trace {
            match session.last_trace() {
                Some(trace) => eprintln!("\n{}", diagnostics::render(&trace)),
                None => eprintln!("\nNo request was made."),
            }
        }

        result
    }
}

impl Command {
    async fn execute(self, session: &Session) -> anyhow::Result<()> {
        let locations = session.locations();

        match self {
            Command::Configure => configure()?,
            Command::Show { city, save } => {
                let snapshot = session.weather()?.fetch_weather(&city).await.map_err(report)?;
                println!("{snapshot}");

                if save {
                    let saved = session.save_current_weather().await.map_err(report)?;
                    println!("\nSaved as location #{}", saved.id);
                }
            }
            Command::List => {
                let all = locations.refresh_all().await.map_err(report)?;
                if all.is_empty() {
                    println!("No saved locations.");
                }
                for location in &all {
                    print_location(location);
                }
            }
            Command::Save { name, city, country, notes } => {
                let draft = LocationDraft { name, city, country, notes };
                let saved = locations.create(&draft).await.map_err(report)?;
                print_location(&saved);
            }
            Command::Update { id, name, city, country, notes } => {
                let changes = LocationChanges { name, city, country, notes };
                locations.refresh_all().await.map_err(report)?;
                let updated = locations.update(id, &changes).await.map_err(report)?;
                print_location(&updated);
            }
            Command::Delete { id, yes } => {
                locations.refresh_all().await.map_err(report)?;
                let label = locations
                    .get(id)
                    .map(|l| format!("'{}' (#{id})", l.name))
                    .unwrap_or_else(|| format!("#{id}"));

                if !yes {
                    let confirmed = Confirm::new(&format!("Delete location {label}?"))
                        .with_default(false)
                        .prompt()?;
                    if !confirmed {
                        println!("Cancelled.");
                        return Ok(());
                    }
                }

                locations.delete(id).await.map_err(report)?;
                println!("Deleted location {label}.");
            }
        }

        Ok(())
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:").without_confirmation().prompt()?;
    if !api_key.trim().is_empty() {
        config.set_weather_api_key(api_key.trim().to_string());
    }

    config.weather.base_url =
        Text::new("Weather endpoint:").with_default(&config.weather.base_url).prompt()?;
    config.locations.base_url =
        Text::new("Saved locations endpoint:").with_default(&config.locations.base_url).prompt()?;

    config.save()?;
    let path = Config::config_file_path().context("Saved, but could not resolve config path")?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

/// Status lines on stderr while a change is sent to the server.
struct Progress;

impl SyncObserver for Progress {
    fn on_event(&self, event: &SyncEvent) {
        if let Some(line) = progress_line(event) {
            eprintln!("{line}");
        }
    }
}

fn progress_line(event: &SyncEvent) -> Option<String> {
    if event.state != OpState::InFlight {
        return None;
    }
    let target = event.id.map(|id| format!(" #{id}")).unwrap_or_default();
    match event.op {
        SyncOp::Create => Some("Saving location...".to_string()),
        SyncOp::Update => Some(format!("Updating location{target}...")),
        SyncOp::Delete => Some(format!("Deleting location{target}...")),
        SyncOp::Refresh => None,
    }
}

fn print_location(location: &SavedLocation) {
    println!("#{} {} | {}, {}", location.id, location.name, location.city, location.country);
    if let Some(notes) = &location.notes {
        println!("    {notes}");
    }
}

/// Lead with the user-facing message; keep the detail as the cause.
fn report(err: weatherdesk_core::Error) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}
