//! Directions session of a single route view
//!
//! A session moves through `Idle -> Requesting -> Succeeded | Failed`.
//! Issuing a request while another one is in flight aborts the earlier one,
//! and an answer that arrives for anything but the latest request is dropped.
//! Closing the session aborts the in-flight request and freezes the state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{AbortHandle, AbortRegistration, Abortable};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{DirectionsProvider, DirectionsRequest, DirectionsResult};

/// Observable state of a directions session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DirectionsState {
    Idle,
    Requesting { generation: u64 },
    Succeeded { result: DirectionsResult },
    Failed { status: String, message: Option<String> },
    Closed,
}

impl DirectionsState {
    #[must_use]
    pub fn result(&self) -> Option<&DirectionsResult> {
        match self {
            DirectionsState::Succeeded { result } => Some(result),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_requesting(&self) -> bool {
        matches!(self, DirectionsState::Requesting { .. })
    }
}

#[derive(Default)]
struct Inflight {
    generation: u64,
    abort: Option<AbortHandle>,
    closed: bool,
}

/// Last-request-wins wrapper around a directions provider
pub struct DirectionsSession {
    provider: Arc<dyn DirectionsProvider>,
    state: watch::Sender<DirectionsState>,
    inflight: Mutex<Inflight>,
}

impl DirectionsSession {
    pub fn new(provider: Arc<dyn DirectionsProvider>) -> Self {
        let (state, _) = watch::channel(DirectionsState::Idle);
        Self {
            provider,
            state,
            inflight: Mutex::new(Inflight::default()),
        }
    }

    fn inflight(&self) -> MutexGuard<'_, Inflight> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state snapshot
    #[must_use]
    pub fn state(&self) -> DirectionsState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DirectionsState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn latest_result(&self) -> Option<DirectionsResult> {
        self.state.borrow().result().cloned()
    }

    /// Supersede whatever is in flight and publish `Requesting` right away.
    ///
    /// Returns `None` once the session is closed.
    fn begin(&self) -> Option<(u64, AbortRegistration)> {
        let mut inflight = self.inflight();
        if inflight.closed {
            debug!("Directions session closed, ignoring request");
            return None;
        }
        if let Some(previous) = inflight.abort.take() {
            debug!("Superseding directions request #{}", inflight.generation);
            previous.abort();
        }
        inflight.generation += 1;
        let (handle, registration) = AbortHandle::new_pair();
        inflight.abort = Some(handle);
        self.state.send_replace(DirectionsState::Requesting {
            generation: inflight.generation,
        });
        Some((inflight.generation, registration))
    }

    async fn complete(
        &self,
        generation: u64,
        registration: AbortRegistration,
        request: DirectionsRequest,
    ) -> Option<DirectionsState> {
        let provider = Arc::clone(&self.provider);
        let outcome = Abortable::new(provider.route(&request), registration).await;

        let Ok(outcome) = outcome else {
            debug!("Directions request #{} aborted", generation);
            return None;
        };

        let mut inflight = self.inflight();
        if inflight.closed || inflight.generation != generation {
            debug!("Discarding late answer for directions request #{}", generation);
            return None;
        }
        inflight.abort = None;

        let state = match outcome {
            Ok(result) => {
                info!(
                    "Directions ready: {} legs, {} m",
                    result.legs.len(),
                    result.total_distance_meters()
                );
                DirectionsState::Succeeded { result }
            }
            Err(failure) => {
                warn!("Directions request failed due to {}", failure.status);
                DirectionsState::Failed {
                    status: failure.status,
                    message: failure.message,
                }
            }
        };
        self.state.send_replace(state.clone());
        Some(state)
    }

    /// Run a request, superseding any request still in flight.
    ///
    /// Returns the resulting state, or `None` when this request was
    /// superseded by a newer one or the session was closed meanwhile.
    pub async fn request(&self, request: DirectionsRequest) -> Option<DirectionsState> {
        let (generation, registration) = self.begin()?;
        self.complete(generation, registration, request).await
    }

    /// Fire-and-forget variant of [`request`](Self::request).
    ///
    /// The session is already `Requesting` when this returns.
    pub fn spawn_request(
        self: &Arc<Self>,
        request: DirectionsRequest,
    ) -> JoinHandle<Option<DirectionsState>> {
        let started = self.begin();
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let (generation, registration) = started?;
            session.complete(generation, registration, request).await
        })
    }

    /// Abort anything in flight and refuse further requests
    pub fn close(&self) {
        let mut inflight = self.inflight();
        if inflight.closed {
            return;
        }
        inflight.closed = true;
        if let Some(handle) = inflight.abort.take() {
            handle.abort();
        }
        self.state.send_replace(DirectionsState::Closed);
        debug!("Directions session closed");
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inflight().closed
    }
}

impl Drop for DirectionsSession {
    fn drop(&mut self) {
        if let Some(handle) = self.inflight().abort.take() {
            handle.abort();
        }
    }
}
