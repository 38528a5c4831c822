//! Scoped stub interception.
//!
//! # Design
//! A stubbed call registers its canned response under its own call id
//! together with the exact method and URL it will request. The
//! registration lives in an `Interception` guard; dropping the guard
//! removes the entry, whether the call completed, failed or was aborted.
//! Lookups need both the id and a matching method/URL, so two calls to the
//! same endpoint never see each other's responses.
//!
//! The registry is an ordinary value. Tests that want to watch it share one
//! between calls; otherwise every call gets a fresh one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

#[derive(Debug, Clone)]
struct Route {
    method: HttpMethod,
    url: String,
    response: HttpResponse,
}

/// Registry of active stub interceptions.
#[derive(Debug, Clone, Default)]
pub struct StubRegistry {
    routes: Arc<Mutex<HashMap<Uuid, Route>>>,
}

impl StubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<Uuid, Route>> {
        self.routes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `response` for `request` on behalf of call `id`.
    pub fn register(&self, id: Uuid, request: &HttpRequest, response: HttpResponse) -> Interception {
        self.routes().insert(
            id,
            Route {
                method: request.method,
                url: request.url.clone(),
                response,
            },
        );
        tracing::trace!(call_id = %id, method = %request.method, url = %request.url, "stub registered");
        Interception {
            id,
            registry: self.clone(),
        }
    }

    /// The response registered by call `id`, if it matches `request`.
    pub fn intercept(&self, id: Uuid, request: &HttpRequest) -> Option<HttpResponse> {
        self.routes()
            .get(&id)
            .filter(|route| route.method == request.method && route.url == request.url)
            .map(|route| route.response.clone())
    }

    pub fn active(&self) -> usize {
        self.routes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active() == 0
    }

    fn deregister(&self, id: Uuid) {
        if self.routes().remove(&id).is_some() {
            tracing::trace!(call_id = %id, "stub removed");
        }
    }
}

/// Live registration; removes itself from the registry on drop.
#[derive(Debug)]
pub struct Interception {
    id: Uuid,
    registry: StubRegistry,
}

impl Drop for Interception {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}
