//! Connection options.

use url::Url;

use crate::error::Error;
use crate::protocol::frame::DEFAULT_MAX_MESSAGE_LEN;
use crate::protocol::frontend::startup::PROTOCOL_VERSION_3_0;

/// Connection options.
#[derive(Debug, Clone)]
pub struct Opts {
    /// Hostname or IP address.
    ///
    /// Default: `""`
    pub host: String,

    /// Port number of the server.
    ///
    /// Default: `5432`
    pub port: u16,

    /// Username sent in the startup packet.
    ///
    /// Default: `""`
    pub user: String,

    /// Database name to use.
    ///
    /// Default: `None`
    pub database: Option<String>,

    /// Application name to report to the server.
    ///
    /// Default: `None`
    pub application_name: Option<String>,

    /// Additional startup parameters.
    ///
    /// Default: `[]`
    pub params: Vec<(String, String)>,

    /// Protocol version requested in the startup packet.
    ///
    /// Only 3.0 replies can be decoded: BackendKeyData must carry the fixed
    /// 8-byte layout and NegotiateProtocolVersion (`v`) is rejected as an
    /// unknown message. Other values are useful against servers or fakes
    /// that answer in the 3.0 format.
    ///
    /// Default: `196608` (3.0)
    pub protocol_version: i32,

    /// Number of parsed messages the background scanner may queue.
    ///
    /// Default: `64`
    pub channel_capacity: usize,

    /// Largest frame length accepted from the server.
    ///
    /// Default: `1 GiB`
    pub max_message_len: usize,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 5432,
            user: String::new(),
            database: None,
            application_name: None,
            params: Vec::new(),
            protocol_version: PROTOCOL_VERSION_3_0,
            channel_capacity: 64,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}

impl Opts {
    /// Startup parameters in the order they are sent.
    ///
    /// `user` is omitted when empty; `database` and `application_name` only
    /// when set.
    pub fn startup_params(&self) -> Vec<(&str, &str)> {
        let mut params = Vec::with_capacity(self.params.len() + 3);
        if !self.user.is_empty() {
            params.push(("user", self.user.as_str()));
        }
        if let Some(db) = &self.database {
            params.push(("database", db.as_str()));
        }
        if let Some(app) = &self.application_name {
            params.push(("application_name", app.as_str()));
        }
        for (name, value) in &self.params {
            params.push((name.as_str(), value.as_str()));
        }
        params
    }
}

impl TryFrom<&Url> for Opts {
    type Error = Error;

    /// Parse a connection URL.
    ///
    /// Format: `postgres://[user[:password]@]host[:port][/database][?param1=value1&..]`
    ///
    /// Supported query parameters:
    /// - `application_name`: application name
    /// - `channel_capacity`: scanner queue bound (positive integer)
    /// - `max_message_len`: largest accepted frame (positive integer)
    ///
    /// Any other parameter is forwarded to the server as a startup parameter.
    fn try_from(url: &Url) -> Result<Self, Self::Error> {
        if !["postgres", "postgresql", "pg"].contains(&url.scheme()) {
            return Err(Error::InvalidUsage(format!(
                "Invalid scheme: expected 'postgres://' or 'pg://', got '{}://'",
                url.scheme()
            )));
        }

        let mut opts = Opts {
            host: url.host_str().unwrap_or("localhost").to_string(),
            port: url.port().unwrap_or(5432),
            user: url.username().to_string(),
            database: url
                .path()
                .strip_prefix('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            ..Opts::default()
        };

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "application_name" => {
                    opts.application_name = Some(value.to_string());
                }
                "channel_capacity" => {
                    opts.channel_capacity = parse_positive("channel_capacity", &value)?;
                }
                "max_message_len" => {
                    opts.max_message_len = parse_positive("max_message_len", &value)?;
                }
                _ => {
                    opts.params.push((key.to_string(), value.to_string()));
                }
            }
        }

        Ok(opts)
    }
}

impl TryFrom<&str> for Opts {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let url = Url::parse(s).map_err(|e| Error::InvalidUsage(format!("Invalid URL: {}", e)))?;
        Self::try_from(&url)
    }
}

fn parse_positive(name: &str, value: &str) -> Result<usize, Error> {
    value
        .parse::<usize>()
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| Error::InvalidUsage(format!("Invalid {}: {}", name, value)))
}
