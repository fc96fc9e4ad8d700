use std::time::Duration;

use async_trait::async_trait;
use rand::RngExt;
use tracing::{instrument, warn};

use super::{DirectionsFailure, DirectionsProvider, DirectionsRequest, DirectionsResult};
use crate::cache::PersistentCache;

/// Serves repeated requests from the persistent cache.
///
/// Only successful answers are stored; failures always reach the caller so
/// a retry goes back to the provider.
pub struct CachedDirectionsProvider<P> {
    inner: P,
    cache: PersistentCache,
    ttl: Duration,
}

impl<P: DirectionsProvider> CachedDirectionsProvider<P> {
    pub fn new(inner: P, cache: PersistentCache, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    fn jittered_ttl(&self) -> Duration {
        let jitter: f64 = rand::rng().random_range(0.9..1.1);
        self.ttl.mul_f64(jitter)
    }
}

#[async_trait]
impl<P: DirectionsProvider> DirectionsProvider for CachedDirectionsProvider<P> {
    #[instrument(skip_all)]
    async fn route(
        &self,
        request: &DirectionsRequest,
    ) -> Result<DirectionsResult, DirectionsFailure> {
        let key = request.cache_key();

        match self.cache.get::<DirectionsResult>(&key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => warn!("Directions cache read failed: {}", e),
        }

        let result = self.inner.route(request).await?;

        if let Err(e) = self.cache.put(&key, result.clone(), self.jittered_ttl()).await {
            warn!("Directions cache write failed: {}", e);
        }
        Ok(result)
    }
}
