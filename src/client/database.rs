//! Database facade.
//!
//! This module provides the `Database` type, the caller-facing handle for one
//! authenticated connection and the collection-level operations on it.

use crate::client::Collection;
use crate::connection::params::ConnectionParams;
use crate::connection::session::Session;
use crate::error::{ConnectionError, RequestError};
use crate::transport::messages::{
    MessageType, CREATE_COLLECTION_SUCCESS, DELETE_COLLECTION_SUCCESS,
};
use crate::transport::TransportProtocol;
use std::str::FromStr;

/// Handle to one authenticated connection to an Acorn database.
///
/// Requests on a `Database` are answered strictly in order, one at a time.
/// Issuing a second request while another is still awaiting its reply fails
/// with [`RequestError::RequestInFlight`]; callers sharing a `Database`
/// across tasks must serialize their calls.
///
/// # Example
///
/// ```no_run
/// use acorn_store_rs::Database;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Database::connect("acorn-store://127.0.0.1:9000/mydb/alice:secret").await?;
///
/// let people = db.create_collection("people").await?;
/// people.insert(r#"{"name":"alice","age":31}"#).await?;
///
/// println!("{}", db.list_collections().await?);
///
/// db.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Database {
    /// Authenticated session
    session: Session,
    /// Connection string without the password (for display purposes)
    connection_string: String,
}

impl Database {
    /// Parse `url` and connect over WebSocket.
    ///
    /// # Arguments
    ///
    /// * `url` - Connection string in the format
    ///   `scheme://host:port/database/username:password[?param=value&...]`
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError` if the string is invalid, the server cannot
    /// be reached (`DialFailed`), or the credentials are refused (`Rejected`).
    pub async fn connect(url: &str) -> Result<Self, ConnectionError> {
        Self::connect_with_params(ConnectionParams::from_str(url)?).await
    }

    /// Connect over WebSocket with prepared parameters.
    ///
    /// # Errors
    ///
    /// See [`Database::connect`].
    pub async fn connect_with_params(params: ConnectionParams) -> Result<Self, ConnectionError> {
        Ok(Self::new(Session::connect(params).await?))
    }

    /// Connect over a caller-supplied transport.
    ///
    /// # Errors
    ///
    /// See [`Database::connect`].
    pub async fn connect_with_transport(
        params: ConnectionParams,
        transport: Box<dyn TransportProtocol>,
    ) -> Result<Self, ConnectionError> {
        Ok(Self::new(
            Session::connect_with_transport(params, transport).await?,
        ))
    }

    fn new(session: Session) -> Self {
        let params = session.params();
        let connection_string = format!(
            "acorn-store://{}/{}/{}",
            params.address(),
            params.database,
            params.username
        );
        Self {
            session,
            connection_string,
        }
    }

    /// Database name.
    pub fn name(&self) -> &str {
        &self.session.params().database
    }

    /// Connection parameters.
    pub fn params(&self) -> &ConnectionParams {
        self.session.params()
    }

    /// The connection string (without password).
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether the connection is still usable.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Number of requests answered on this connection.
    pub fn request_count(&self) -> u64 {
        self.session.request_count()
    }

    /// Names of the collections in the database, as the server's raw JSON array.
    ///
    /// The reply is returned verbatim; use [`Database::collection_names`] for a
    /// parsed list.
    ///
    /// # Errors
    ///
    /// Returns `RequestError` only if the request itself fails.
    pub async fn list_collections(&self) -> Result<String, RequestError> {
        let reply = self
            .session
            .issue(MessageType::Collections, self.name())
            .await?;
        Ok(reply.into_body())
    }

    /// Names of the collections in the database.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::InvalidJson` if the reply is not a JSON array of
    /// strings.
    pub async fn collection_names(&self) -> Result<Vec<String>, RequestError> {
        let raw = self.list_collections().await?;
        serde_json::from_str(&raw).map_err(|_| RequestError::InvalidJson { raw })
    }

    /// Grants of the connected user, as the server's raw JSON array.
    ///
    /// # Errors
    ///
    /// Returns `RequestError` only if the request itself fails.
    pub async fn list_user_grants(&self) -> Result<String, RequestError> {
        let reply = self.session.issue(MessageType::UserGrants, "").await?;
        Ok(reply.into_body())
    }

    /// Handle to a collection. Does not contact the server.
    pub fn collection(&self, name: &str) -> Collection<'_> {
        Collection::new(self, name.to_string())
    }

    /// Create a collection.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::CreateCollectionFailed` unless the server confirms.
    pub async fn create_collection(&self, name: &str) -> Result<Collection<'_>, RequestError> {
        let reply = self
            .session
            .issue(MessageType::CreateCollection, name)
            .await?;

        if reply.body() == CREATE_COLLECTION_SUCCESS {
            Ok(self.collection(name))
        } else {
            Err(RequestError::CreateCollectionFailed {
                collection: name.to_string(),
                database: self.name().to_string(),
            })
        }
    }

    /// Delete a collection and its documents.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::DeleteCollectionFailed` unless the server confirms.
    pub async fn delete_collection(&self, name: &str) -> Result<(), RequestError> {
        let reply = self
            .session
            .issue(MessageType::DeleteCollection, name)
            .await?;

        if reply.body() == DELETE_COLLECTION_SUCCESS {
            Ok(())
        } else {
            Err(RequestError::DeleteCollectionFailed {
                collection: name.to_string(),
                database: self.name().to_string(),
            })
        }
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError` if the transport fails to shut down.
    pub async fn close(self) -> Result<(), ConnectionError> {
        self.session.close().await
    }
}

impl std::fmt::Display for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Database({})", self.connection_string)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("connection_string", &self.connection_string)
            .field("session", &self.session)
            .finish()
    }
}
