//! Connection management for Acorn databases.
//!
//! This module provides connection string parsing, the authentication
//! handshake, and the request/reply bridge that turns the transport's single
//! uncorrelated inbound stream into awaitable request results.
//!
//! # Example
//!
//! ```no_run
//! # use acorn_store_rs::connection::{ConnectionBuilder, ConnectionParams, Session};
//! # use acorn_store_rs::transport::MessageType;
//! # use std::str::FromStr;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Using ConnectionBuilder
//! let params = ConnectionBuilder::new()
//!     .host("localhost")
//!     .port(9000)
//!     .database("mydb")
//!     .username("alice")
//!     .password("secret")
//!     .connection_timeout(std::time::Duration::from_secs(10))
//!     .build()?;
//!
//! // Or parse from connection string
//! let params = ConnectionParams::from_str("acorn-store://localhost:9000/mydb/alice:secret")?;
//!
//! let session = Session::connect(params).await?;
//! let reply = session.issue(MessageType::UserGrants, "").await?;
//! println!("{}", reply.body());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod correlator;
pub mod handshake;
pub mod params;
pub mod router;
pub mod session;

pub use auth::Credentials;
pub use correlator::{Reply, RequestCorrelator};
pub use handshake::{Handshake, HandshakeOutcome, HandshakeState};
pub use params::{ConnectionBuilder, ConnectionParams};
pub use router::MessageRouter;
pub use session::{Session, SessionState};
