//! Venue and event endpoints.
//!
//! Venues are the tenant boundary: staff and admin roles act within a venue,
//! while `super_admin` provisions venues themselves. Reads are public so the
//! catalog can be browsed anonymously; the listing widens for admins.

pub(crate) mod events;
mod slug;
mod storage;
pub(crate) mod types;
#[allow(clippy::module_inception)]
pub(crate) mod venues;

pub(super) const VENUE_SLUG_MIN: usize = 3;
pub(super) const VENUE_SLUG_MAX: usize = 48;

pub(crate) use storage::find_venue_by_slug;
