//! Signed-in session and the role-specific dashboard flows
//!
//! A [`SessionContext`] is an ordinary value owned by whoever drives the UI and
//! handed to dashboards explicitly. Dashboards keep their own snapshot state;
//! they never reach into a global.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::air_quality::AirQualityProvider;
use crate::marketplace::{Catalog, ProductDraft, ProductView};
use crate::models::{
    AiRecommendation, AirQualityReading, Coordinates, PackagingOption, Pollutant, Product, Role,
    User,
};
use crate::recommendation::{Evaluation, RecommendationProxy, RecommendationSelector};
use crate::state::AppState;
use crate::{OnTymError, Result};

/// Identity of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            role: user.role(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    user: Option<SessionUser>,
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&mut self, user: &User) {
        info!(user_id = %user.id, "Signed in");
        self.user = Some(SessionUser::from(user));
    }

    pub fn sign_out(&mut self) {
        if let Some(user) = self.user.take() {
            info!(user_id = %user.id, "Signed out");
        }
    }

    #[must_use]
    pub fn current_user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn require_role(&self, role: Role) -> Result<&SessionUser> {
        let user = self
            .user
            .as_ref()
            .ok_or_else(|| OnTymError::forbidden("Please sign in first"))?;
        if user.role != role {
            return Err(OnTymError::forbidden(format!(
                "This page is only available to {role} accounts"
            )));
        }
        Ok(user)
    }
}

/// State of the AI recommendation panel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AiPanel {
    Idle,
    Ready { recommendation: AiRecommendation },
    Failed { message: String },
}

/// Result of an AI request that completed without error
#[derive(Debug, Clone, PartialEq)]
pub enum AiOutcome {
    /// The reply was the latest and is now shown
    Applied(AiRecommendation),
    /// A newer request was issued while this one was in flight; reply discarded
    Superseded,
}

/// Snapshot of everything the buyer dashboard renders
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerView {
    pub reading: Option<AirQualityReading>,
    pub flagged_pollutants: Vec<Pollutant>,
    pub recommendations: Vec<PackagingOption>,
    pub ai: AiPanel,
}

/// Outcome of [`BuyerDashboard::refresh_and_recommend`]. The local result is
/// always present; the AI half may have failed on its own.
#[derive(Debug)]
pub struct CombinedRefresh {
    pub evaluation: Evaluation,
    pub ai: Result<AiOutcome>,
}

#[derive(Debug)]
struct BuyerState {
    reading: Option<AirQualityReading>,
    evaluation: Option<Evaluation>,
    ai: AiPanel,
}

pub struct BuyerDashboard {
    user: SessionUser,
    air_quality: Arc<dyn AirQualityProvider>,
    selector: Arc<RecommendationSelector>,
    proxy: RecommendationProxy,
    catalog: Catalog,
    state: Mutex<BuyerState>,
    latest_request: AtomicU64,
}

impl BuyerDashboard {
    /// Open the dashboard for a buyer session
    pub fn open(session: &SessionContext, app: &AppState) -> Result<Self> {
        let user = session.require_role(Role::Buyer)?.clone();
        Ok(Self {
            user,
            air_quality: Arc::clone(&app.air_quality),
            selector: Arc::clone(&app.selector),
            proxy: app.proxy.clone(),
            catalog: app.catalog.clone(),
            state: Mutex::new(BuyerState {
                reading: None,
                evaluation: None,
                ai: AiPanel::Idle,
            }),
            latest_request: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn user(&self) -> &SessionUser {
        &self.user
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut BuyerState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Fetch a fresh reading and recompute the local recommendations.
    /// The AI panel is left as it is.
    #[instrument(skip(self, label), fields(user = %self.user.id))]
    pub async fn refresh_air_quality(
        &self,
        coordinates: Coordinates,
        label: Option<&str>,
    ) -> Result<Evaluation> {
        let reading = self.air_quality.current(coordinates, label).await?;
        let evaluation = self.selector.evaluate(&reading);

        debug!(options = evaluation.options.len(), "Local recommendations updated");
        self.with_state(|state| {
            state.reading = Some(reading);
            state.evaluation = Some(evaluation.clone());
        });
        Ok(evaluation)
    }

    /// Ask the AI proxy for a recommendation based on the current reading.
    ///
    /// Fails fast with a validation error when no reading is loaded yet. Only
    /// the most recently issued request may update the panel.
    #[instrument(skip(self, description), fields(user = %self.user.id))]
    pub async fn request_ai_recommendation(&self, description: &str) -> Result<AiOutcome> {
        if description.trim().is_empty() {
            return Err(OnTymError::validation("Description is required"));
        }
        let reading = self
            .with_state(|state| state.reading.clone())
            .ok_or_else(|| {
                OnTymError::validation("Air quality data is not available yet")
            })?;

        let token = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.proxy.recommend(description, Some(&reading)).await;

        self.with_state(|state| {
            if self.latest_request.load(Ordering::SeqCst) != token {
                debug!(token, "Discarding stale AI reply");
                return Ok(AiOutcome::Superseded);
            }
            match result {
                Ok(recommendation) => {
                    state.ai = AiPanel::Ready {
                        recommendation: recommendation.clone(),
                    };
                    Ok(AiOutcome::Applied(recommendation))
                }
                Err(err) => {
                    if !matches!(err, OnTymError::Validation { .. }) {
                        warn!("AI recommendation failed: {}", err);
                        state.ai = AiPanel::Failed {
                            message: err.user_message(),
                        };
                    }
                    Err(err)
                }
            }
        })
    }

    /// Fetch a reading, then compute the local selection and the AI
    /// recommendation concurrently
    #[instrument(skip(self, label, description), fields(user = %self.user.id))]
    pub async fn refresh_and_recommend(
        &self,
        coordinates: Coordinates,
        label: Option<&str>,
        description: &str,
    ) -> Result<CombinedRefresh> {
        let reading = self.air_quality.current(coordinates, label).await?;
        self.with_state(|state| state.reading = Some(reading.clone()));

        let local = async {
            let evaluation = self.selector.evaluate(&reading);
            self.with_state(|state| state.evaluation = Some(evaluation.clone()));
            evaluation
        };
        let (evaluation, ai) =
            futures::future::join(local, self.request_ai_recommendation(description)).await;

        Ok(CombinedRefresh { evaluation, ai })
    }

    #[must_use]
    pub fn view(&self) -> BuyerView {
        self.with_state(|state| {
            let (flagged_pollutants, recommendations) = match &state.evaluation {
                Some(evaluation) => (
                    evaluation.flagged_pollutants.iter().copied().collect(),
                    evaluation.options.clone(),
                ),
                None => (Vec::new(), Vec::new()),
            };
            BuyerView {
                reading: state.reading.clone(),
                flagged_pollutants,
                recommendations,
                ai: state.ai.clone(),
            }
        })
    }

    /// Marketplace listings, optionally narrowed to one category
    pub async fn browse_products(&self, category: Option<&str>) -> Result<Vec<ProductView>> {
        let products = self.catalog.by_category(category).await?;
        self.catalog.view(products).await
    }
}

pub struct SupplierDashboard {
    user: SessionUser,
    catalog: Catalog,
}

impl SupplierDashboard {
    pub fn open(session: &SessionContext, app: &AppState) -> Result<Self> {
        let user = session.require_role(Role::Supplier)?.clone();
        Ok(Self {
            user,
            catalog: app.catalog.clone(),
        })
    }

    #[must_use]
    pub fn user(&self) -> &SessionUser {
        &self.user
    }

    /// This supplier's listings, newest first
    pub async fn my_products(&self) -> Result<Vec<ProductView>> {
        let products = self.catalog.by_seller(&self.user.id).await?;
        self.catalog.view(products).await
    }

    pub async fn add_product(&self, draft: ProductDraft) -> Result<Product> {
        self.catalog.create(&self.user.id, draft).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::LanguageModel;
    use crate::config::OnTymConfig;
    use crate::marketplace::{Accounts, NewAccount};
    use crate::models::{
        Aqi, BuyerProfile, ChatTurn, IndustrySize, Profile, SupplierProfile, SupplyScale,
    };
    use crate::store::Store;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use tokio::sync::Notify;

    const REPLY_A: &str = r#"{"recommendedProduct":"Aluminum Packaging","reason":"a","environmentalImpact":"a"}"#;
    const REPLY_B: &str = r#"{"recommendedProduct":"Glass Packaging","reason":"b","environmentalImpact":"b"}"#;

    struct FixedAir;

    #[async_trait]
    impl AirQualityProvider for FixedAir {
        async fn current(&self, _: Coordinates, label: Option<&str>) -> Result<AirQualityReading> {
            let components = BTreeMap::from([
                (Pollutant::O3, 75.0),
                (Pollutant::No2, 20.0),
                (Pollutant::Pm10, 30.0),
                (Pollutant::Pm25, 10.0),
                (Pollutant::Co, 5.0),
            ]);
            Ok(AirQualityReading::new(
                Aqi::try_from(4u8)?,
                components,
                label.unwrap_or("here").to_string(),
            ))
        }
    }

    /// The "slow" request parks until released; every other request answers at once
    #[derive(Default)]
    struct GatedModel {
        entered: Notify,
        release: Notify,
        fail: bool,
    }

    #[async_trait]
    impl LanguageModel for GatedModel {
        async fn generate(&self, prompt: &str) -> Result<String> {
            if self.fail {
                return Err(OnTymError::upstream("503 from provider"));
            }
            if prompt.contains("Buyer Description: slow") {
                self.entered.notify_one();
                self.release.notified().await;
                return Ok(REPLY_A.to_string());
            }
            Ok(REPLY_B.to_string())
        }

        async fn converse(&self, _: &str, _: &[ChatTurn], _: &str) -> Result<String> {
            Ok(String::new())
        }
    }

    async fn app(model: Arc<GatedModel>) -> (AppState, User, User) {
        let store = Store::temporary().unwrap();
        let accounts = Accounts::new(&store);
        let buyer = accounts
            .register(NewAccount {
                username: "buyer".into(),
                email: "buyer@example.com".into(),
                password: "password1".into(),
                phone_number: None,
                profile: Profile::Buyer(BuyerProfile {
                    size_of_industry: IndustrySize::Large,
                    products_expected: vec![],
                    description: None,
                    location: "Delhi".into(),
                }),
            })
            .await
            .unwrap();
        let supplier = accounts
            .register(NewAccount {
                username: "supplier".into(),
                email: "supplier@example.com".into(),
                password: "password2".into(),
                phone_number: None,
                profile: Profile::Supplier(SupplierProfile {
                    scale_served: SupplyScale::All,
                    products_offered: vec![],
                    description: None,
                    location: None,
                }),
            })
            .await
            .unwrap();

        let state = AppState::builder(OnTymConfig::default(), store)
            .language_model(model)
            .air_quality(Arc::new(FixedAir))
            .build()
            .unwrap();
        (state, buyer, supplier)
    }

    fn session_for(user: &User) -> SessionContext {
        let mut session = SessionContext::new();
        session.sign_in(user);
        session
    }

    fn here() -> Coordinates {
        Coordinates::new(28.61, 77.21).unwrap()
    }

    #[tokio::test]
    async fn test_session_roles() {
        let (state, buyer, supplier) = app(Arc::default()).await;

        let mut session = SessionContext::new();
        assert!(BuyerDashboard::open(&session, &state).is_err());

        session.sign_in(&supplier);
        assert!(matches!(
            BuyerDashboard::open(&session, &state),
            Err(OnTymError::Forbidden { .. })
        ));
        assert!(SupplierDashboard::open(&session, &state).is_ok());

        session.sign_out();
        assert!(!session.is_signed_in());
        session.sign_in(&buyer);
        assert_eq!(session.current_user().unwrap().username, "buyer");
        assert!(BuyerDashboard::open(&session, &state).is_ok());
    }

    #[tokio::test]
    async fn test_ai_request_without_reading_fails_fast() {
        let (state, buyer, _) = app(Arc::default()).await;
        let dashboard = BuyerDashboard::open(&session_for(&buyer), &state).unwrap();

        let result = dashboard.request_ai_recommendation("Olive oil bottles").await;
        assert!(matches!(result, Err(OnTymError::Validation { .. })));
        assert_eq!(dashboard.view().ai, AiPanel::Idle);
    }

    #[tokio::test]
    async fn test_refresh_then_recommend() {
        let (state, buyer, _) = app(Arc::default()).await;
        let dashboard = BuyerDashboard::open(&session_for(&buyer), &state).unwrap();

        let evaluation = dashboard.refresh_air_quality(here(), Some("Delhi")).await.unwrap();
        assert_eq!(evaluation.options.len(), 4);
        assert_eq!(dashboard.view().ai, AiPanel::Idle);

        let outcome = dashboard.request_ai_recommendation("Olive oil").await.unwrap();
        assert!(matches!(outcome, AiOutcome::Applied(ref r) if r.recommended_product == "Glass Packaging"));

        let view = dashboard.view();
        assert_eq!(view.reading.unwrap().location, "Delhi");
        assert_eq!(view.flagged_pollutants, vec![Pollutant::O3]);
        assert!(matches!(view.ai, AiPanel::Ready { .. }));
    }

    #[tokio::test]
    async fn test_stale_reply_is_discarded() {
        let model = Arc::new(GatedModel::default());
        let (state, buyer, _) = app(model.clone()).await;
        let dashboard = BuyerDashboard::open(&session_for(&buyer), &state).unwrap();
        dashboard.refresh_air_quality(here(), None).await.unwrap();

        let slow = dashboard.request_ai_recommendation("slow");
        let fast = async {
            model.entered.notified().await;
            let outcome = dashboard.request_ai_recommendation("fast").await;
            model.release.notify_one();
            outcome
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow.unwrap(), AiOutcome::Superseded);
        assert!(matches!(fast.unwrap(), AiOutcome::Applied(_)));
        match dashboard.view().ai {
            AiPanel::Ready { recommendation } => {
                assert_eq!(recommendation.recommended_product, "Glass Packaging");
            }
            other => panic!("unexpected panel {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upstream_failure_keeps_local_recommendations() {
        let model = Arc::new(GatedModel {
            fail: true,
            ..GatedModel::default()
        });
        let (state, buyer, _) = app(model).await;
        let dashboard = BuyerDashboard::open(&session_for(&buyer), &state).unwrap();

        let combined = dashboard
            .refresh_and_recommend(here(), None, "Frozen fish")
            .await
            .unwrap();
        assert!(matches!(combined.ai, Err(OnTymError::Upstream { .. })));
        assert_eq!(combined.evaluation.options.len(), 4);

        let view = dashboard.view();
        assert_eq!(view.recommendations.len(), 4);
        match view.ai {
            AiPanel::Failed { message } => assert!(message.contains("try again later")),
            other => panic!("unexpected panel {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_supplier_dashboard_and_browsing() {
        let (state, buyer, supplier) = app(Arc::default()).await;
        let supplier_board = SupplierDashboard::open(&session_for(&supplier), &state).unwrap();

        for (name, category) in [("Jar", "Glass"), ("Tray", "Bagasse")] {
            supplier_board
                .add_product(ProductDraft {
                    name: name.into(),
                    description: "Sturdy".into(),
                    image_url: "https://img.example/p.png".into(),
                    category: category.into(),
                    price: 3.0,
                    quantity: 10,
                })
                .await
                .unwrap();
        }
        assert_eq!(supplier_board.my_products().await.unwrap().len(), 2);

        let buyer_board = BuyerDashboard::open(&session_for(&buyer), &state).unwrap();
        let glass = buyer_board.browse_products(Some("Glass")).await.unwrap();
        assert_eq!(glass.len(), 1);
        assert_eq!(glass[0].seller.username.as_deref(), Some("supplier"));
        assert_eq!(buyer_board.browse_products(None).await.unwrap().len(), 2);
    }
}
