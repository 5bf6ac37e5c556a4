//! Storage and remote-service adapters for `dispatch-core`.
//!
//! - [`sqlite`] persists couriers, orders, assignment batches and
//!   optimization sessions, implementing every store trait.
//! - [`routing`] fetches road distance matrices over HTTP.

pub mod routing;
pub mod sqlite;
