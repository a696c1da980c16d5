//! Caller-facing facades.
//!
//! - `Database` - one authenticated connection and collection management
//! - `Collection` - document operations scoped to one collection
//!
//! Every operation is exactly one request/reply round trip.

pub mod collection;
pub mod database;

pub use collection::Collection;
pub use database::Database;
