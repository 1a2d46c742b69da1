//! Weather Service - reads current conditions from the upstream weather API.
//!
//! The service is the consumer side of the `weather-service` → `weather-api`
//! contract. Responses are decoded through the tolerant reader, so only
//! `currently.summary` has to keep its name and type upstream.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod forecast;

pub use client::WeatherClient;
pub use config::{Config, ConfigError};
pub use error::WeatherError;
pub use forecast::WeatherResponse;
