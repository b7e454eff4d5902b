//! Application state shared by every handler

use std::sync::Arc;

use anyhow::Context;

use crate::Result;
use crate::ai::{GeminiClient, LanguageModel};
use crate::air_quality::{AirQualityProvider, OpenWeatherClient};
use crate::config::OnTymConfig;
use crate::marketplace::{Accounts, Blog, Catalog};
use crate::recommendation::{RecommendationProxy, RecommendationSelector, RuleTable};
use crate::store::Store;

pub type SharedState = Arc<AppState>;

/// Every service, wired once at startup
pub struct AppState {
    pub config: OnTymConfig,
    pub selector: Arc<RecommendationSelector>,
    pub proxy: RecommendationProxy,
    pub air_quality: Arc<dyn AirQualityProvider>,
    pub accounts: Accounts,
    pub catalog: Catalog,
    pub blog: Blog,
    _store: Arc<Store>,
}

impl AppState {
    /// Open the store at the configured path and build the production clients
    pub fn from_config(config: OnTymConfig) -> anyhow::Result<Self> {
        let store = Store::open(&config.store.path)
            .with_context(|| format!("Failed to open store at {}", config.store.path))?;
        Ok(Self::builder(config, store).build()?)
    }

    #[must_use]
    pub fn builder(config: OnTymConfig, store: Store) -> AppStateBuilder {
        AppStateBuilder {
            config,
            store,
            language_model: None,
            air_quality: None,
        }
    }

    #[must_use]
    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}

/// Builds an [`AppState`], letting tests swap in their own backends
pub struct AppStateBuilder {
    config: OnTymConfig,
    store: Store,
    language_model: Option<Arc<dyn LanguageModel>>,
    air_quality: Option<Arc<dyn AirQualityProvider>>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn language_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.language_model = Some(model);
        self
    }

    #[must_use]
    pub fn air_quality(mut self, provider: Arc<dyn AirQualityProvider>) -> Self {
        self.air_quality = Some(provider);
        self
    }

    pub fn build(self) -> Result<AppState> {

        let language_model = match self.language_model {
            Some(model) => model,
            None => Arc::new(GeminiClient::new(&self.config.ai)?),
        };
        let air_quality = match self.air_quality {
            Some(provider) => provider,
            None => Arc::new(OpenWeatherClient::new(&self.config.air_quality)?),
        };

        let table = RuleTable::standard();
        let selector = RecommendationSelector::new(table.clone(), &self.config.recommendation);
        let proxy = RecommendationProxy::new(language_model, table);

        Ok(AppState {
            selector: Arc::new(selector),
            proxy,
            air_quality,
            accounts: Accounts::new(&self.store),
            catalog: Catalog::new(&self.store),
            blog: Blog::new(&self.store),
            _store: Arc::new(self.store),
            config: self.config,
        })
    }
}
