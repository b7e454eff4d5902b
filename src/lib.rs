//! `OnTym` - sustainable packaging marketplace backend
//!
//! This library provides air-quality driven packaging recommendations,
//! a proxy to a generative AI assistant, and the buyer/supplier marketplace
//! (accounts, product listings, community posts) behind an axum HTTP API.

pub mod ai;
pub mod air_quality;
pub mod api;
pub mod config;
pub mod error;
pub mod marketplace;
pub mod models;
pub mod recommendation;
pub mod session;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use ai::{GeminiClient, LanguageModel};
pub use air_quality::{AirQualityProvider, OpenWeatherClient};
pub use config::OnTymConfig;
pub use error::OnTymError;
pub use models::{AiRecommendation, AirQualityReading, Coordinates, PackagingOption, Pollutant};
pub use recommendation::{RecommendationProxy, RecommendationSelector, RuleTable};
pub use session::{BuyerDashboard, SessionContext, SupplierDashboard};
pub use state::{AppState, SharedState};
pub use store::Store;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, OnTymError>;
