//! Data models for the `OnTym` service
//!
//! This module contains the core domain models organized by concern:
//! - Location: coordinates for provider lookups
//! - Air quality: pollutant readings and the AQI bucket
//! - Packaging: rule-table rows and effectiveness ratings
//! - Assistant: AI recommendation and conversation turns
//! - User / listing: marketplace records kept in the store

pub mod air_quality;
pub mod assistant;
pub mod listing;
pub mod location;
pub mod packaging;
pub mod user;

// Re-export all public types for convenient access
pub use air_quality::{AirQualityReading, Aqi, Pollutant};
pub use assistant::{AiRecommendation, ChatRole, ChatTurn};
pub use listing::{Comment, Post, Product};
pub use location::Coordinates;
pub use packaging::{Effectiveness, PackagingOption};
pub use user::{BuyerProfile, IndustrySize, Profile, Role, SupplierProfile, SupplyScale, User};
