use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use chrono::Utc;
use std::{sync::Arc, time::Duration};

use skycast_core::{
    Config, ConfiguredCoordinates, FileStore, GoogleGeocoder, HttpJsonClient, LocationResolver,
    Persistence, ProviderId, ReqwestClient, WeatherStore, provider_from_config,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Track the weather in the cities you care about")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key for a provider ("openweather" or "google").
    Configure {
        provider: String,
    },

    /// Show the city you are in.
    Locate {
        /// Forget the saved location and resolve it again.
        #[arg(long)]
        forget: bool,
    },

    /// Search for cities by name.
    Search {
        query: String,

        /// Pick one of the results and start tracking it.
        #[arg(long)]
        add: bool,
    },

    /// Track a city by name.
    Add {
        name: String,
    },

    /// Stop tracking a city, by id or name.
    Remove {
        city: String,
    },

    /// Show all tracked cities.
    List,

    /// Re-fetch weather for every tracked city.
    Refresh,

    /// Current weather and hourly forecast for one city.
    Detail {
        name: String,
    },
}

/// Everything a command needs, wired from config.
struct App {
    store: Arc<WeatherStore>,
    resolver: LocationResolver,
}

impl App {
    fn load() -> anyhow::Result<Self> {
        let config = Config::load()?.with_env_overrides();

        let http: Arc<dyn HttpJsonClient> = Arc::new(
            ReqwestClient::new(Duration::from_secs(config.endpoints.timeout_secs))
                .context("Failed to set up HTTP client")?,
        );

        let data_dir = Config::data_dir()?;
        let persistence = Persistence::new(Arc::new(FileStore::new(data_dir)));

        let store = Arc::new(WeatherStore::new(
            provider_from_config(&config, http.clone()),
            persistence.clone(),
        ));

        let geocoder = GoogleGeocoder::new(
            config.provider_api_key(ProviderId::Google).map(str::to_owned),
            config.endpoints.geocoding_base_url.clone(),
            http,
        );
        let resolver = LocationResolver::new(
            persistence,
            Arc::new(ConfiguredCoordinates::from_config(&config.location)),
            Arc::new(geocoder),
        );

        Ok(Self { store, resolver })
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let now = Utc::now();

        match self.command {
            Command::Configure { provider } => configure(&provider)?,
            Command::Locate { forget } => {
                let app = App::load()?;
                if forget {
                    app.resolver.forget().await?;
                }
                println!("{}", render::location_line(&app.resolver.resolve().await));
            }
            Command::Search { query, add } => {
                let app = App::load()?;
                let found = app.store.search_cities(&query).await?;
                if !add {
                    print!("{}", render::suggestions(&found));
                    return Ok(());
                }
                if found.is_empty() {
                    bail!("No cities match '{query}'");
                }

                let labels: Vec<String> = found.iter().map(|s| s.query()).collect();
                let picked = inquire::Select::new("Track which city?", labels)
                    .raw_prompt()
                    .context("City selection cancelled")?;
                let city = app.store.select_suggestion(&found[picked.index]).await?;
                print!("{}", render::city_card(&city, now));
            }
            Command::Add { name } => {
                let app = App::load()?;
                let city = app.store.fetch_weather(&name).await?;
                if !app.store.add_city(city.clone()) {
                    println!("{} is already tracked.", city.name);
                }
                print!("{}", render::city_card(&city, now));
            }
            Command::Remove { city } => {
                let app = App::load()?;
                let id = app.store.find_by_name(&city).map(|c| c.id).unwrap_or(city);
                if !app.store.remove_city(&id) {
                    bail!("No tracked city matches '{id}'");
                }
                println!("Removed {id}.");
            }
            Command::List => {
                let app = App::load()?;
                let (location, _) =
                    tokio::join!(app.resolver.resolve(), app.store.hydrate_missing());
                println!("{}\n", render::location_line(&location));
                print!("{}", render::city_list(&app.store.snapshot(), now));
            }
            Command::Refresh => {
                let app = App::load()?;
                app.store.refresh_all().await;
                print!("{}", render::city_list(&app.store.snapshot(), now));
            }
            Command::Detail { name } => {
                let app = App::load()?;
                let (weather, forecast) = app.store.load_detail(&name).await;
                let city = weather?;
                print!("{}", render::city_card(&city, now));
                println!("\nHourly Temperature Forecast");
                match forecast {
                    Ok(points) => print!("{}", render::forecast_chart(&points)),
                    Err(e) => println!("{e}"),
                }
            }
        }

        Ok(())
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = inquire::Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }

    config.upsert_provider_api_key(id, api_key);
    config.save()?;

    println!("Saved {id} credentials to {}", Config::config_file_path()?.display());
    Ok(())
}
