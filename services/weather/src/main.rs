//! Weather Service - Main Entry Point
//!
//! Prints the current conditions for a coordinate pair.

use anyhow::Context;
use clap::Parser;
use rust_common::{TracingConfig, init_tracing};
use tracing::info;
use weather_service::{Config, WeatherClient};

/// Print the current weather summary for a location.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about)]
struct Args {
    /// Latitude in decimal degrees
    #[arg(long, default_value_t = 53.5511, allow_hyphen_values = true)]
    lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, default_value_t = 9.9937, allow_hyphen_values = true)]
    lon: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_env().context("loading configuration")?;

    let mut tracing_config = TracingConfig::default()
        .with_service_name("weather-service")
        .with_log_level(config.log_level.clone());
    if config.log_json {
        tracing_config = tracing_config.with_json_output();
    }
    init_tracing(&tracing_config)?;

    let client = WeatherClient::new(&config)?;
    let forecast = client
        .fetch_weather(args.lat, args.lon)
        .await
        .with_context(|| format!("fetching forecast for {},{}", args.lat, args.lon))?;

    info!(lat = args.lat, lon = args.lon, summary = %forecast.summary, "Forecast fetched");
    println!("{}", forecast.summary);
    Ok(())
}
