//! Connection settings.
//!
//! A [`ConnectionConfig`] can be built from four positional credentials,
//! from a string mapping with the keys `host`, `user`, `pass` and `name`,
//! by deserializing the same keys, or from prefixed environment variables.

use std::collections::HashMap;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default `MySQL` port.
pub const DEFAULT_PORT: u16 = 3306;

/// Default connection character set.
pub const DEFAULT_CHARSET: &str = "utf8mb4";

/// Character sets the connection may use. Text is always exchanged as UTF-8.
pub const UTF8_CHARSETS: &[&str] = &["utf8mb4", "utf8"];

/// Settings needed to open a [`Client`](crate::Client).
///
/// The password is kept as a [`SecretString`] and is redacted from `Debug`
/// output.
#[derive(Debug, Deserialize)]
#[serde(try_from = "RawConfig")]
pub struct ConnectionConfig {
    /// Server host name or address.
    pub host: String,
    /// Account name.
    pub user: String,
    /// Account password.
    pub pass: SecretString,
    /// Default database (schema).
    pub name: String,
    /// Server port.
    pub port: u16,
    /// Character set applied with `SET NAMES` after connecting.
    pub charset: String,
    /// Deadline for every statement; `None` waits indefinitely.
    pub statement_timeout: Option<Duration>,
}

impl ConnectionConfig {
    /// Builds a config from the four positional credentials, with the default
    /// port and charset and no statement timeout.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        pass: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            pass: SecretString::from(pass.into()),
            name: name.into(),
            port: DEFAULT_PORT,
            charset: DEFAULT_CHARSET.to_string(),
            statement_timeout: None,
        }
    }

    /// Builds a config from a mapping. `host`, `user`, `pass` and `name` are
    /// required; `port`, `charset` and `statement_timeout_ms` are optional.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] for an absent required key and
    /// [`ConfigError::InvalidSetting`] for an unparsable or invalid value.
    pub fn from_map<S: std::hash::BuildHasher>(
        map: &HashMap<String, String, S>,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| map.get(key).cloned())
    }

    /// Reads `<PREFIX>_HOST`, `<PREFIX>_USER`, `<PREFIX>_PASS`,
    /// `<PREFIX>_NAME` and optionally `<PREFIX>_PORT`, `<PREFIX>_CHARSET`,
    /// `<PREFIX>_STATEMENT_TIMEOUT_MS` from the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`from_map`](Self::from_map).
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| {
            std::env::var(format!("{prefix}_{}", key.to_ascii_uppercase())).ok()
        })
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::MissingKey(key));
        let raw = RawConfig {
            host: required("host")?,
            user: required("user")?,
            pass: required("pass")?,
            name: required("name")?,
            port: lookup("port")
                .map(|v| parse_setting("port", &v))
                .transpose()?,
            charset: lookup("charset"),
            statement_timeout_ms: lookup("statement_timeout_ms")
                .map(|v| parse_setting("statement_timeout_ms", &v))
                .transpose()?,
        };
        Self::try_from(raw)
    }

    /// Sets the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the character set applied after connecting.
    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Sets the per-statement deadline.
    #[must_use]
    pub const fn with_statement_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Checks the settings before any connection attempt.
    ///
    /// # Errors
    ///
    /// Rejects an empty host, user or database name, and a charset outside
    /// [`UTF8_CHARSETS`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [("host", &self.host), ("user", &self.user), ("name", &self.name)] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidSetting {
                    key,
                    reason: "must not be empty".to_string(),
                });
            }
        }
        if !UTF8_CHARSETS
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&self.charset))
        {
            return Err(ConfigError::InvalidSetting {
                key: "charset",
                reason: format!("{:?} is not a UTF-8 character set", self.charset),
            });
        }
        Ok(())
    }
}

fn parse_setting<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidSetting {
        key,
        reason: format!("cannot parse {value:?}"),
    })
}

/// Wire shape of [`ConnectionConfig`].
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    host: String,
    user: String,
    pass: String,
    name: String,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    charset: Option<String>,
    #[serde(default)]
    statement_timeout_ms: Option<u64>,
}

impl TryFrom<RawConfig> for ConnectionConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, ConfigError> {
        let config = Self::new(raw.host, raw.user, raw.pass, raw.name)
            .with_port(raw.port.unwrap_or(DEFAULT_PORT))
            .with_charset(raw.charset.unwrap_or_else(|| DEFAULT_CHARSET.to_string()))
            .with_statement_timeout(raw.statement_timeout_ms.map(Duration::from_millis));
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn positional_constructor_uses_defaults() {
        let config = ConnectionConfig::new("db.local", "app", "s3cret", "shop");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.charset, DEFAULT_CHARSET);
        assert!(config.statement_timeout.is_none());
        assert_eq!(config.pass.expose_secret(), "s3cret");
    }

    #[test]
    fn mapping_requires_all_four_keys() {
        let err = ConnectionConfig::from_map(&map(&[
            ("host", "h"),
            ("user", "u"),
            ("name", "n"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::MissingKey("pass"));
    }

    #[test]
    fn mapping_reads_optional_settings() {
        let config = ConnectionConfig::from_map(&map(&[
            ("host", "h"),
            ("user", "u"),
            ("pass", "p"),
            ("name", "n"),
            ("port", "3307"),
            ("statement_timeout_ms", "1500"),
        ]))
        .unwrap();
        assert_eq!(config.port, 3307);
        assert_eq!(config.statement_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = ConnectionConfig::from_map(&map(&[
            ("host", "h"),
            ("user", "u"),
            ("pass", "p"),
            ("name", "n"),
            ("port", "http"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { key: "port", .. }));
    }

    #[test]
    fn env_lookup_uses_prefixed_upper_case_keys() {
        let env = map(&[
            ("APP_DB_HOST", "h"),
            ("APP_DB_USER", "u"),
            ("APP_DB_PASS", "p"),
            ("APP_DB_NAME", "n"),
            ("APP_DB_CHARSET", "utf8"),
        ]);
        let config = ConnectionConfig::from_lookup(|key| {
            env.get(&format!("APP_DB_{}", key.to_ascii_uppercase())).cloned()
        })
        .unwrap();
        assert_eq!(config.charset, "utf8");
    }

    #[test]
    fn deserializes_from_mapping() {
        let config: ConnectionConfig = serde_json::from_str(
            r#"{"host":"h","user":"u","pass":"p","name":"n","charset":"utf8"}"#,
        )
        .unwrap();
        assert_eq!(config.charset, "utf8");
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn non_utf8_charsets_are_rejected() {
        for charset in ["latin1", "ascii", "utf16"] {
            let config = ConnectionConfig::new("h", "u", "p", "n").with_charset(charset);
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidSetting { key: "charset", .. })
            ));
        }
        let config = ConnectionConfig::new("h", "u", "p", "n").with_charset("UTF8MB4");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn charset_must_be_an_identifier() {
        let config = ConnectionConfig::new("h", "u", "p", "n").with_charset("utf8; DROP TABLE t");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSetting { key: "charset", .. })
        ));
    }

    #[test]
    fn debug_output_redacts_password() {
        let config = ConnectionConfig::new("h", "u", "hunter2", "n");
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
