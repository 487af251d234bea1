use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineSettings;
use crate::engine::lifecycle::LifecycleManager;
use crate::engine::orchestrator::DeliveryOrchestrator;
use crate::engine::proximity::ProximitySearch;
use crate::engine::rate_limit::{CounterStore, RateLimiter};
use crate::observability::metrics::Metrics;
use crate::store::{ActorDirectory, OrderStore};
use crate::upstream::{GeoResolver, PriceQuoter};

/// External collaborators the engine is wired against.
pub struct Collaborators {
    pub orders: Arc<dyn OrderStore>,
    pub actors: Arc<dyn ActorDirectory>,
    pub geo: Arc<dyn GeoResolver>,
    pub quoter: Arc<dyn PriceQuoter>,
    pub counters: Arc<dyn CounterStore>,
}

pub struct AppState {
    pub orders: Arc<dyn OrderStore>,
    pub actors: Arc<dyn ActorDirectory>,
    pub geo: Arc<dyn GeoResolver>,
    pub orchestrator: DeliveryOrchestrator,
    pub lifecycle: LifecycleManager,
    pub proximity: ProximitySearch,
    pub rate_limiter: RateLimiter,
    pub upstream_timeout: Duration,
    pub page_size: u32,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(settings: EngineSettings, collaborators: Collaborators) -> Self {
        let Collaborators {
            orders,
            actors,
            geo,
            quoter,
            counters,
        } = collaborators;

        Self {
            orchestrator: DeliveryOrchestrator::new(
                geo.clone(),
                quoter,
                orders.clone(),
                settings.upstream_timeout,
            ),
            lifecycle: LifecycleManager::new(orders.clone()),
            proximity: ProximitySearch::new(
                orders.clone(),
                settings.search_radius_km,
                settings.search_page_size,
            ),
            rate_limiter: RateLimiter::new(
                counters,
                settings.rate_limit_max_requests,
                settings.rate_limit_window,
            ),
            upstream_timeout: settings.upstream_timeout,
            page_size: settings.search_page_size,
            orders,
            actors,
            geo,
            metrics: Metrics::new(),
        }
    }
}
