//! # acorn-store-rs
//!
//! Async client driver for the Acorn JSON document store.
//!
//! The driver turns each logical operation into one message on a
//! message-oriented duplex transport (WebSocket by default) and resolves the
//! caller's future when the reply that follows it arrives. Requests on one
//! connection are strictly sequential.
//!
//! ## Example
//!
//! ```no_run
//! # use acorn_store_rs::*;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("acorn-store://127.0.0.1:9000/mydb/alice:secret").await?;
//!
//! let people = db.collection("people");
//! people.insert(r#"{"name":"alice"}"#).await?;
//!
//! // An empty condition matches every document
//! let all = people.retrieve("").await?;
//! println!("{}", all);
//!
//! people.update("name==alice", "age", "31").await?;
//! people.delete("name==alice").await?;
//!
//! db.close().await?;
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod client;
pub mod connection;
pub mod error;
pub mod transport;

// Re-export public API
pub use client::{Collection, Database};
pub use connection::{ConnectionBuilder, ConnectionParams};
pub use error::{AcornError, ConnectionError, ErrorKind, RequestError, TransportError};
