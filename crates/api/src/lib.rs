//! HTTP surface of the push service.
//!
//! Endpoints:
//! - GET    /health — Liveness
//! - GET    /api/vapid-public-key — Application server key for `pushManager.subscribe`
//! - POST   /api/subscriptions — Store a browser push subscription
//! - DELETE /api/subscriptions — Remove a subscription by endpoint
//! - GET    /api/subscription/check — Whether an endpoint is stored
//! - POST   /api/subscription/validate — Probe a stored subscription
//! - POST   /api/notifications/send — Send a message to every subscriber
//! - POST   /api/clear — Remove every subscription

pub mod routes;
pub mod state;
