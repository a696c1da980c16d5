//! Collection facade.
//!
//! Conditions and paths are passed through untouched; the server interprets
//! them with its own path syntax.

use serde::de::{DeserializeOwned, IgnoredAny};

use crate::client::Database;
use crate::error::RequestError;
use crate::transport::messages::{
    DeleteRequest, InsertRequest, MessageType, RetrieveRequest, UpdateRequest, DELETE_SUCCESS,
    INSERT_SUCCESS, UPDATE_SUCCESS,
};

/// Handle to one collection of a [`Database`].
///
/// Holds no server-side state; dropping it does not touch the collection.
#[derive(Debug, Clone)]
pub struct Collection<'a> {
    database: &'a Database,
    name: String,
}

impl<'a> Collection<'a> {
    pub(crate) fn new(database: &'a Database, name: String) -> Self {
        Self { database, name }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The database this collection belongs to.
    pub fn database(&self) -> &'a Database {
        self.database
    }

    /// Retrieve documents matching `condition`; an empty condition matches all.
    ///
    /// # Returns
    ///
    /// The result set as returned by the server (JSON).
    ///
    /// # Errors
    ///
    /// Returns `RequestError::InvalidJson` carrying the raw reply if the server
    /// answers with anything that is not valid JSON.
    pub async fn retrieve(&self, condition: &str) -> Result<String, RequestError> {
        let body = serde_json::to_string(&RetrieveRequest {
            collection_name: &self.name,
            condition,
        })?;
        let reply = self
            .database
            .session()
            .issue(MessageType::Retrieve, body)
            .await?
            .into_body();

        if serde_json::from_str::<IgnoredAny>(&reply).is_ok() {
            Ok(reply)
        } else {
            Err(RequestError::InvalidJson { raw: reply })
        }
    }

    /// Retrieve documents and deserialize the result set.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::InvalidJson` if the reply is not JSON or does not
    /// have the shape of `T`.
    pub async fn retrieve_as<T: DeserializeOwned>(
        &self,
        condition: &str,
    ) -> Result<T, RequestError> {
        let raw = self.retrieve(condition).await?;
        serde_json::from_str(&raw).map_err(|_| RequestError::InvalidJson { raw })
    }

    /// Insert a JSON document.
    ///
    /// Identifier assignment and uniqueness are left to the server.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::InsertFailed` unless the server confirms.
    pub async fn insert(&self, document: &str) -> Result<(), RequestError> {
        let body = serde_json::to_string(&InsertRequest {
            collection_name: &self.name,
            document,
        })?;
        let reply = self.database.session().issue(MessageType::Insert, body).await?;

        if reply.body() == INSERT_SUCCESS {
            Ok(())
        } else {
            Err(RequestError::InsertFailed {
                document: document.to_string(),
                collection: self.name.clone(),
            })
        }
    }

    /// Set `path` to `value` (a JSON value) in documents matching `condition`.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::UpdateFailed` unless the server confirms.
    pub async fn update(
        &self,
        condition: &str,
        path: &str,
        value: &str,
    ) -> Result<(), RequestError> {
        let body = serde_json::to_string(&UpdateRequest {
            collection_name: &self.name,
            condition,
            path,
            value,
        })?;
        let reply = self.database.session().issue(MessageType::Update, body).await?;

        if reply.body() == UPDATE_SUCCESS {
            Ok(())
        } else {
            Err(RequestError::UpdateFailed {
                path: path.to_string(),
                collection: self.name.clone(),
                value: value.to_string(),
            })
        }
    }

    /// Delete documents matching `condition`.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::DeleteFailed` unless the server confirms.
    pub async fn delete(&self, condition: &str) -> Result<(), RequestError> {
        let body = serde_json::to_string(&DeleteRequest {
            collection_name: &self.name,
            condition,
        })?;
        let reply = self.database.session().issue(MessageType::Delete, body).await?;

        if reply.body() == DELETE_SUCCESS {
            Ok(())
        } else {
            Err(RequestError::DeleteFailed {
                collection: self.name.clone(),
                condition: condition.to_string(),
            })
        }
    }

    /// Create this collection on the server.
    ///
    /// # Errors
    ///
    /// See [`Database::create_collection`].
    pub async fn create(&self) -> Result<(), RequestError> {
        self.database.create_collection(&self.name).await.map(|_| ())
    }

    /// Delete this collection on the server.
    ///
    /// # Errors
    ///
    /// See [`Database::delete_collection`].
    pub async fn drop(&self) -> Result<(), RequestError> {
        self.database.delete_collection(&self.name).await
    }
}
