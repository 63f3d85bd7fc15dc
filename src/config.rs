//! Provider configuration.
//!
//! Every field of [`ProviderConfig`] is optional; unset fields fall back to their
//! environment variable. [`ProviderConfig::resolve`] validates the result into a
//! [`ResolvedConfig`] the coordinator can build a client from.
//!
//! ```rust
//! use automq_reconciler::config::ProviderConfig;
//!
//! let config: ProviderConfig = serde_json::from_str(
//!     r#"{"host": "https://cmp.example.com", "token": "Bearer abc", "request_timeout": "30s"}"#,
//! )
//! .unwrap();
//! let resolved = config.resolve_with(|_| None).unwrap();
//! assert_eq!(resolved.host().as_str(), "https://cmp.example.com/");
//! assert_eq!(resolved.request_timeout().as_secs(), 30);
//! ```

use crate::client::Auth;
use crate::signer::{Credentials, Signer};
use crate::transport::DEFAULT_REQUEST_TIMEOUT;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const HOST_ENV: &str = "AUTOMQ_BYOC_HOST";
pub const TOKEN_ENV: &str = "AUTOMQ_TOKEN";
pub const ACCESS_KEY_ENV: &str = "AUTOMQ_BYOC_ACCESS_KEY_ID";
pub const SECRET_KEY_ENV: &str = "AUTOMQ_BYOC_SECRET_KEY";

/// Signing region used when none is configured.
pub const DEFAULT_REGION: &str = "private";
/// Signing service used when none is configured.
pub const DEFAULT_SERVICE: &str = "cmp";

/// Why a configuration could not be resolved.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("control plane host is required: set `host` or {}", HOST_ENV)]
    MissingHost,
    #[error("invalid control plane host {host:?}: {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: url::ParseError,
    },
    #[error(
        "credentials are required: set `token` ({}) or both `byoc_access_key` ({}) and `byoc_secret_key` ({})",
        TOKEN_ENV,
        ACCESS_KEY_ENV,
        SECRET_KEY_ENV
    )]
    MissingCredentials,
    #[error("`byoc_access_key` and `byoc_secret_key` must be set together (missing {missing})")]
    PartialCredentials { missing: &'static str },
    #[error("invalid request_timeout {value:?}: {reason}")]
    InvalidTimeout { value: String, reason: String },
}

/// User-facing provider configuration.
#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub host: Option<String>,
    pub token: Option<String>,
    pub byoc_access_key: Option<String>,
    pub byoc_secret_key: Option<String>,
    /// Human-readable per-request timeout (`"10s"`, `"1m"`).
    pub request_timeout: Option<String>,
    pub region: Option<String>,
    pub service: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("host", &self.host)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("byoc_access_key", &self.byoc_access_key)
            .field("byoc_secret_key", &self.byoc_secret_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("region", &self.region)
            .field("service", &self.service)
            .finish()
    }
}

/// How the resolved client authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum Authentication {
    Token(String),
    AccessKey { access_key_id: String, secret_key: String },
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authentication::Token(_) => f.write_str("Token(<redacted>)"),
            Authentication::AccessKey { access_key_id, .. } => f
                .debug_struct("AccessKey")
                .field("access_key_id", access_key_id)
                .finish_non_exhaustive(),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    host: Url,
    authentication: Authentication,
    request_timeout: Duration,
    region: String,
    service: String,
}

impl ResolvedConfig {
    /// Base URL, always ending with `/`.
    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn authentication(&self) -> &Authentication {
        &self.authentication
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Client authentication for this configuration.
    pub fn auth(&self) -> Auth {
        match &self.authentication {
            Authentication::Token(token) => Auth::Token(token.clone()),
            Authentication::AccessKey { access_key_id, secret_key } => Auth::Signed {
                signer: Signer::new(Credentials::new(access_key_id.clone(), secret_key.clone())),
                region: self.region.clone(),
                service: self.service.clone(),
            },
        }
    }
}

/// Explicit non-empty value, else the environment.
fn pick(explicit: &Option<String>, env: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    explicit
        .clone()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| env(key).filter(|v| !v.trim().is_empty()))
}

fn parse_host(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|source| ConfigError::InvalidHost { host: raw.to_string(), source })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

impl ProviderConfig {
    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve with an injected environment lookup.
    pub fn resolve_with<F>(&self, env: F) -> Result<ResolvedConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = pick(&self.host, &env, HOST_ENV).ok_or(ConfigError::MissingHost)?;
        let host = parse_host(&host)?;

        let token = pick(&self.token, &env, TOKEN_ENV);
        let access_key = pick(&self.byoc_access_key, &env, ACCESS_KEY_ENV);
        let secret_key = pick(&self.byoc_secret_key, &env, SECRET_KEY_ENV);

        let authentication = match (access_key, secret_key, token) {
            (Some(access_key_id), Some(secret_key), token) => {
                if token.is_some() {
                    tracing::debug!("both token and access key configured, signing requests");
                }
                Authentication::AccessKey { access_key_id, secret_key }
            }
            (Some(_), None, None) => {
                return Err(ConfigError::PartialCredentials { missing: "byoc_secret_key" })
            }
            (None, Some(_), None) => {
                return Err(ConfigError::PartialCredentials { missing: "byoc_access_key" })
            }
            (_, _, Some(token)) => Authentication::Token(token),
            (None, None, None) => return Err(ConfigError::MissingCredentials),
        };

        let request_timeout = match self.request_timeout.as_deref().filter(|v| !v.trim().is_empty()) {
            None => DEFAULT_REQUEST_TIMEOUT,
            Some(raw) => match humantime::parse_duration(raw) {
                Ok(d) if !d.is_zero() => d,
                Ok(_) => {
                    return Err(ConfigError::InvalidTimeout {
                        value: raw.to_string(),
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Err(e) => {
                    return Err(ConfigError::InvalidTimeout { value: raw.to_string(), reason: e.to_string() })
                }
            },
        };

        Ok(ResolvedConfig {
            host,
            authentication,
            request_timeout,
            region: self.region.clone().unwrap_or_else(|| DEFAULT_REGION.to_string()),
            service: self.service.clone().unwrap_or_else(|| DEFAULT_SERVICE.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn environment_fills_unset_fields() {
        let resolved = ProviderConfig::default()
            .resolve_with(env(&[(HOST_ENV, "https://cmp.example.com/api"), (TOKEN_ENV, "Bearer t")]))
            .unwrap();
        assert_eq!(resolved.host().as_str(), "https://cmp.example.com/api/");
        assert_eq!(resolved.authentication(), &Authentication::Token("Bearer t".into()));
        assert_eq!(resolved.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(resolved.region(), "private");
        assert_eq!(resolved.service(), "cmp");
    }

    #[test]
    fn explicit_values_win_over_environment() {
        let config = ProviderConfig {
            host: Some("https://explicit.example.com".into()),
            ..Default::default()
        };
        let resolved = config
            .resolve_with(env(&[(HOST_ENV, "https://env.example.com"), (TOKEN_ENV, "t")]))
            .unwrap();
        assert_eq!(resolved.host().host_str(), Some("explicit.example.com"));
    }

    #[test]
    fn access_key_takes_precedence_over_token() {
        let config = ProviderConfig {
            host: Some("https://cmp.example.com".into()),
            token: Some("Bearer t".into()),
            byoc_access_key: Some("AKID".into()),
            byoc_secret_key: Some("SECRET".into()),
            ..Default::default()
        };
        let resolved = config.resolve_with(|_| None).unwrap();
        assert!(matches!(resolved.authentication(), Authentication::AccessKey { .. }));
        assert!(matches!(resolved.auth(), Auth::Signed { .. }));
        assert!(!format!("{:?}", resolved).contains("SECRET"));
    }

    #[test]
    fn missing_pieces_are_reported() {
        let err = ProviderConfig::default().resolve_with(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingHost));

        let host_only = ProviderConfig { host: Some("https://cmp.example.com".into()), ..Default::default() };
        let err = host_only.resolve_with(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));
        assert!(err.to_string().contains(TOKEN_ENV));

        let half = ProviderConfig { byoc_access_key: Some("AKID".into()), ..host_only.clone() };
        let err = half.resolve_with(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::PartialCredentials { missing: "byoc_secret_key" }));

        let bad_host = ProviderConfig { host: Some("not a url".into()), token: Some("t".into()), ..Default::default() };
        assert!(matches!(bad_host.resolve_with(|_| None), Err(ConfigError::InvalidHost { .. })));
    }

    #[test]
    fn request_timeout_is_human_readable() {
        let config = ProviderConfig {
            host: Some("https://cmp.example.com".into()),
            token: Some("t".into()),
            request_timeout: Some("1m 30s".into()),
            ..Default::default()
        };
        assert_eq!(config.resolve_with(|_| None).unwrap().request_timeout(), Duration::from_secs(90));

        let zero = ProviderConfig { request_timeout: Some("0s".into()), ..config.clone() };
        assert!(matches!(zero.resolve_with(|_| None), Err(ConfigError::InvalidTimeout { .. })));
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = ProviderConfig {
            token: Some("Bearer very-secret".into()),
            byoc_secret_key: Some("hunter2".into()),
            ..Default::default()
        };
        let shown = format!("{:?}", config);
        assert!(!shown.contains("very-secret"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = serde_json::from_str::<ProviderConfig>(r#"{"hots": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("hots"));
    }
}
