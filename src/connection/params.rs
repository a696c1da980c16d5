//! Connection parameter parsing and validation.
//!
//! This module handles parsing connection strings and building connection
//! parameters with validation.

use crate::error::{timeout_ms, ConnectionError};
use crate::transport::TransportParams;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Connection parameters for establishing a database connection.
#[derive(Clone)]
pub struct ConnectionParams {
    /// Server host address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Target database name
    pub database: String,

    /// Username for authentication
    pub username: String,

    /// Password for authentication (stored securely)
    password: String,

    /// Dial and handshake timeout
    pub connection_timeout: Duration,

    /// Reply deadline for a single request; `None` waits indefinitely
    pub request_timeout: Option<Duration>,

    /// Enable TLS/SSL encryption
    pub use_tls: bool,

    /// Additional connection attributes
    pub attributes: HashMap<String, String>,
}

impl ConnectionParams {
    /// Get the password (for internal use only, never logged).
    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// Create a new ConnectionBuilder.
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Transport-level parameters derived from these settings.
    pub fn transport_params(&self) -> TransportParams {
        TransportParams::new(self.host.clone(), self.port)
            .with_tls(self.use_tls)
            .with_timeout(timeout_ms(self.connection_timeout))
    }

    /// `host:port`, with IPv6 hosts bracketed.
    pub fn address(&self) -> String {
        self.transport_params().address()
    }
}

impl FromStr for ConnectionParams {
    type Err = ConnectionError;

    /// Parse a connection string in the format:
    /// `scheme://host:port/database/username:password[?param=value&...]`
    ///
    /// Credentials may not contain a raw `:` or `/`; percent-encode them
    /// (`%3A`, `%2F`) instead.
    ///
    /// # Examples
    ///
    /// ```
    /// # use acorn_store_rs::connection::ConnectionParams;
    /// # use std::str::FromStr;
    /// let params = ConnectionParams::from_str("acorn-store://127.0.0.1:9000/mydb/alice:secret")?;
    /// assert_eq!(params.address(), "127.0.0.1:9000");
    /// assert_eq!(params.database, "mydb");
    ///
    /// // With parameters
    /// let params = ConnectionParams::from_str(
    ///     "acorn-store://127.0.0.1:9000/mydb/alice:secret?timeout=10&request_timeout=60"
    /// )?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = s.trim();

        let (scheme, url) = url.split_once("://").ok_or_else(|| {
            ConnectionError::ParseError(
                "Connection string must start with '<scheme>://'".to_string(),
            )
        })?;
        if scheme.is_empty() {
            return Err(ConnectionError::ParseError(
                "Connection string scheme is empty".to_string(),
            ));
        }

        // Split into main part and query string
        let (main_part, query_string) = match url.split_once('?') {
            Some((main, query)) => (main, Some(query)),
            None => (url, None),
        };

        let params = parse_query_params(query_string)?;

        let segments: Vec<&str> = main_part.split('/').collect();
        let (host_port, database, auth) = match segments.as_slice() {
            [host_port, database, auth] => (*host_port, *database, *auth),
            [_, _, _, ..] => {
                return Err(ConnectionError::ParseError(
                    "Unexpected '/' after credentials; percent-encode '/' as %2F".to_string(),
                ))
            }
            _ => {
                return Err(ConnectionError::ParseError(
                    "Expected host:port/database/username:password".to_string(),
                ))
            }
        };

        let (host, port) = parse_host_port(host_port)?;
        let database = decode("database", database)?;
        let (username, password) = parse_auth(auth)?;

        let builder = ConnectionBuilder::new()
            .host(&host)
            .port(port)
            .database(&database)
            .username(&username)
            .password(&password);

        apply_query_params(builder, params)?.build()
    }
}

// Prevent password from being displayed in debug or display output
impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connection_timeout", &self.connection_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("use_tls", &self.use_tls)
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl fmt::Display for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConnectionParams {{ address: {}, database: {}, username: {}, use_tls: {} }}",
            self.address(),
            self.database,
            self.username,
            self.use_tls
        )
    }
}

/// Builder for constructing ConnectionParams with validation.
#[derive(Debug, Clone, Default)]
pub struct ConnectionBuilder {
    host: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    connection_timeout: Option<Duration>,
    request_timeout: Option<Option<Duration>>,
    use_tls: Option<bool>,
    attributes: HashMap<String, String>,
}

impl ConnectionBuilder {
    /// Create a new ConnectionBuilder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server host.
    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    /// Set the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the target database.
    pub fn database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }

    /// Set the username.
    pub fn username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Set the dial and handshake timeout.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = Some(timeout);
        self
    }

    /// Set the per-request reply deadline. `None` waits indefinitely.
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Enable or disable TLS/SSL.
    pub fn use_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = Some(use_tls);
        self
    }

    /// Add a custom connection attribute.
    pub fn attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    /// Build the ConnectionParams with validation.
    pub fn build(self) -> Result<ConnectionParams, ConnectionError> {
        let host = required("host", self.host)?;
        let database = required("database", self.database)?;
        let username = required("username", self.username)?;

        let port = self.port.ok_or_else(|| ConnectionError::InvalidParameter {
            parameter: "port".to_string(),
            message: "Port is required".to_string(),
        })?;
        if port == 0 {
            return Err(ConnectionError::InvalidParameter {
                parameter: "port".to_string(),
                message: "Port must be greater than 0".to_string(),
            });
        }

        let connection_timeout = self.connection_timeout.unwrap_or(Duration::from_secs(30));
        if connection_timeout.as_secs() > 300 {
            return Err(ConnectionError::InvalidParameter {
                parameter: "connection_timeout".to_string(),
                message: "Connection timeout cannot exceed 300 seconds".to_string(),
            });
        }

        Ok(ConnectionParams {
            host,
            port,
            database,
            username,
            password: self.password.unwrap_or_default(),
            connection_timeout,
            request_timeout: self
                .request_timeout
                .unwrap_or(Some(Duration::from_secs(300))),
            use_tls: self.use_tls.unwrap_or(false),
            attributes: self.attributes,
        })
    }
}

fn required(parameter: &str, value: Option<String>) -> Result<String, ConnectionError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        Some(_) => Err(ConnectionError::InvalidParameter {
            parameter: parameter.to_string(),
            message: format!("{} cannot be empty", parameter),
        }),
        None => Err(ConnectionError::InvalidParameter {
            parameter: parameter.to_string(),
            message: format!("{} is required", parameter),
        }),
    }
}

fn decode(what: &str, raw: &str) -> Result<String, ConnectionError> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|e| ConnectionError::ParseError(format!("Failed to decode {}: {}", what, e)))
}

/// Parse query parameters from URL query string.
fn parse_query_params(query: Option<&str>) -> Result<HashMap<String, String>, ConnectionError> {
    let mut params = HashMap::new();

    if let Some(query) = query {
        for pair in query.split('&') {
            if pair.is_empty() {
                continue;
            }

            let (key, value) = pair.split_once('=').ok_or_else(|| {
                ConnectionError::ParseError(format!("Invalid query parameter format: {}", pair))
            })?;

            params.insert(decode("key", key)?, decode("value", value)?);
        }
    }

    Ok(params)
}

/// Parse the credentials segment (username:password).
///
/// The raw segment must contain exactly one ':'.
fn parse_auth(auth: &str) -> Result<(String, String), ConnectionError> {
    let (user, pass) = auth.split_once(':').ok_or_else(|| {
        ConnectionError::ParseError("Credentials must be given as username:password".to_string())
    })?;
    if pass.contains(':') {
        return Err(ConnectionError::ParseError(
            "Unexpected ':' in password; percent-encode ':' as %3A".to_string(),
        ));
    }
    Ok((decode("username", user)?, decode("password", pass)?))
}

/// Parse host and port. The port is mandatory.
fn parse_host_port(host_port: &str) -> Result<(String, u16), ConnectionError> {
    // IPv6 address format [host]:port
    if let Some(rest) = host_port.strip_prefix('[') {
        let (host, port_part) = rest.split_once(']').ok_or_else(|| {
            ConnectionError::ParseError(format!("Unterminated IPv6 address: {}", host_port))
        })?;
        let port_str = port_part.strip_prefix(':').ok_or_else(|| {
            ConnectionError::ParseError(format!("Missing port in address: {}", host_port))
        })?;
        return Ok((host.to_string(), parse_port(port_str)?));
    }

    match host_port.split_once(':') {
        Some((host, port_str)) => Ok((host.to_string(), parse_port(port_str)?)),
        None => Err(ConnectionError::ParseError(format!(
            "Missing port in address: {}",
            host_port
        ))),
    }
}

fn parse_port(port_str: &str) -> Result<u16, ConnectionError> {
    port_str
        .parse()
        .map_err(|_| ConnectionError::ParseError(format!("Invalid port: {}", port_str)))
}

/// Apply query parameters to builder.
fn apply_query_params(
    mut builder: ConnectionBuilder,
    params: HashMap<String, String>,
) -> Result<ConnectionBuilder, ConnectionError> {
    for (key, value) in params {
        match key.as_str() {
            "timeout" | "connection_timeout" => {
                let secs = parse_secs(&key, &value)?;
                builder = builder.connection_timeout(Duration::from_secs(secs));
            }
            "request_timeout" => {
                let timeout = match parse_secs(&key, &value)? {
                    0 => None,
                    secs => Some(Duration::from_secs(secs)),
                };
                builder = builder.request_timeout(timeout);
            }
            "tls" | "use_tls" => {
                builder = builder.use_tls(parse_bool(&value)?);
            }
            _ => {
                builder = builder.attribute(&key, &value);
            }
        }
    }

    Ok(builder)
}

fn parse_secs(key: &str, value: &str) -> Result<u64, ConnectionError> {
    value.parse().map_err(|_| ConnectionError::InvalidParameter {
        parameter: key.to_string(),
        message: format!("Invalid timeout value: {}", value),
    })
}

/// Parse boolean value from string.
fn parse_bool(s: &str) -> Result<bool, ConnectionError> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConnectionError::InvalidParameter {
            parameter: "boolean".to_string(),
            message: format!("Invalid boolean value: {}", s),
        }),
    }
}
