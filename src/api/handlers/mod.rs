//! API handlers for Ingresso.
//!
//! Each feature area owns its handlers plus any request/response types and
//! storage helpers it needs. The `auth` module also hosts the authorization
//! pipeline the other areas gate themselves with.

pub mod auth;
pub mod health;
pub mod me;
pub mod opportunities;
pub mod orders;
pub mod parking;
pub mod root;
pub mod tickets;
pub mod venues;
