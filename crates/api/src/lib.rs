//! RentPulse HTTP API: auth, listings, alerts, favorites, and property types.

pub mod middleware;
pub mod routes;
pub mod state;
