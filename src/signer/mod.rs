//! `AUTOMQ-HMAC-SHA256` request signing.
//!
//! The canonical request is
//!
//! ```text
//! METHOD \n URI \n QUERY \n HEADERS \n \n SIGNED_HEADERS \n BODY_DIGEST
//! ```
//!
//! and the string to sign is `AUTOMQ-HMAC-SHA256 \n <time> \n <scope> \n hex(sha256(canonical))`
//! with scope `YYYYMMDD/<region>/<service>/cmp_request`. The signing key is derived by chaining
//! HMACs over the date, region, service and terminator, starting from `"AUTOMQ" + secret`.
//!
//! Two outputs are supported: an `Authorization` header ([`Signer::sign`]) or a presigned URL
//! carrying `X-Automq-*` query parameters ([`Signer::presign`]).
//!
//! ```rust
//! use automq_reconciler::clock::FixedWallClock;
//! use automq_reconciler::signer::{Credentials, Signer};
//! use automq_reconciler::transport::HttpRequest;
//! use reqwest::Method;
//!
//! let signer = Signer::new(Credentials::new("AKID", "SECRET"))
//!     .with_clock(FixedWallClock::epoch());
//! let mut req = HttpRequest::new(Method::GET, "https://cp.example.com/api/v1/instances/kf-1".parse().unwrap());
//! signer.sign(&mut req, None, "cmp", "private").unwrap();
//! assert!(req.headers.contains_key("authorization"));
//! ```

mod canonical;
mod rules;

use crate::clock::{SystemWallClock, WallClock};
use crate::transport::HttpRequest;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;
use std::time::Duration;

pub(crate) use canonical::escape_query;

type HmacSha256 = Hmac<Sha256>;

/// Algorithm label used in the authorization header and string to sign.
pub const AUTH_HEADER_PREFIX: &str = "AUTOMQ-HMAC-SHA256";
/// Prefix prepended to the secret when deriving the date key.
pub const SECRET_KEY_PREFIX: &str = "AUTOMQ";
/// Final component of the signing scope.
pub const SCOPE_TERMINATOR: &str = "cmp_request";
/// Body digest used when payload signing is disabled.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
/// `hex(sha256(""))`.
pub const EMPTY_STRING_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

pub const DATE_HEADER: &str = "x-automq-date";
pub const CONTENT_SHA256_HEADER: &str = "x-automq-content-sha256";

pub const ALGORITHM_QUERY: &str = "X-Automq-Algorithm";
pub const CREDENTIAL_QUERY: &str = "X-Automq-Credential";
pub const DATE_QUERY: &str = "X-Automq-Date";
pub const EXPIRES_QUERY: &str = "X-Automq-Expires";
pub const SIGNED_HEADERS_QUERY: &str = "X-Automq-SignedHeaders";
pub const SIGNATURE_QUERY: &str = "X-Automq-Signature";

const PRESIGN_QUERY_KEYS: &[&str] = &[
    ALGORITHM_QUERY,
    CREDENTIAL_QUERY,
    DATE_QUERY,
    EXPIRES_QUERY,
    SIGNED_HEADERS_QUERY,
    SIGNATURE_QUERY,
];

/// Failures while signing. HMAC and hashing cannot fail; body access can.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SignError {
    #[error("failed to seek request body: {0}")]
    Seek(#[source] std::io::Error),
    #[error("failed to read request body: {0}")]
    Read(#[source] std::io::Error),
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
    #[error("invalid header value for {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// Seekable request body.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Access key pair. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self { access_key_id: access_key_id.into(), secret_access_key: secret_access_key.into() }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Signer switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignerOptions {
    /// Keep `X-Automq-*` headers as headers when presigning.
    pub disable_header_hoisting: bool,
    /// Use the URI path as-is instead of escaping it.
    pub disable_uri_path_escaping: bool,
    /// Sign the literal `UNSIGNED-PAYLOAD` instead of the body hash.
    pub unsigned_payload: bool,
}

/// Everything computed while signing, useful for debugging signature mismatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningOutput {
    pub signature: String,
    pub signed_headers: String,
    pub credential_scope: String,
    pub canonical_request: String,
    pub string_to_sign: String,
}

/// Stateless request signer. Cheap to clone and safe to share.
#[derive(Clone)]
pub struct Signer {
    credentials: Credentials,
    options: SignerOptions,
    clock: Arc<dyn WallClock>,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("credentials", &self.credentials)
            .field("options", &self.options)
            .finish()
    }
}

struct SigningCtx<'a> {
    service: &'a str,
    region: &'a str,
    time: DateTime<Utc>,
    presign_for: Option<Duration>,
}

impl Signer {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials, options: SignerOptions::default(), clock: Arc::new(SystemWallClock) }
    }

    pub fn with_options(mut self, options: SignerOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the time source (tests pin it for reproducible signatures).
    pub fn with_clock<C: WallClock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Sign `req` in place, adding `X-Automq-Date` and `Authorization` headers.
    ///
    /// `body`, when given, is hashed from its current position and rewound afterwards.
    pub fn sign(
        &self,
        req: &mut HttpRequest,
        body: Option<&mut dyn ReadSeek>,
        service: &str,
        region: &str,
    ) -> Result<SigningOutput, SignError> {
        let ctx = SigningCtx { service, region, time: self.clock.now(), presign_for: None };
        self.sign_with(req, body, &ctx)
    }

    /// Rewrite the URL of `req` into a presigned URL valid for `expires`.
    ///
    /// The URL carries date, expiry, credential, signed headers and signature; the algorithm
    /// is implied and not sent.
    pub fn presign(
        &self,
        req: &mut HttpRequest,
        body: Option<&mut dyn ReadSeek>,
        service: &str,
        region: &str,
        expires: Duration,
    ) -> Result<SigningOutput, SignError> {
        let ctx = SigningCtx { service, region, time: self.clock.now(), presign_for: Some(expires) };
        self.sign_with(req, body, &ctx)
    }

    fn sign_with(
        &self,
        req: &mut HttpRequest,
        body: Option<&mut dyn ReadSeek>,
        ctx: &SigningCtx<'_>,
    ) -> Result<SigningOutput, SignError> {
        let mut query = canonical::parse_query(&req.url);
        strip_previous_signature(req, &mut query);

        let amz_date = format_time(&ctx.time);
        let credential_scope = format!(
            "{}/{}/{}/{}",
            ctx.time.format("%Y%m%d"),
            ctx.region,
            ctx.service,
            SCOPE_TERMINATOR
        );

        if let Some(expires) = ctx.presign_for {
            set_query(&mut query, DATE_QUERY, &amz_date);
            set_query(&mut query, EXPIRES_QUERY, &expires.as_secs().to_string());
            set_query(
                &mut query,
                CREDENTIAL_QUERY,
                &format!("{}/{}", self.credentials.access_key_id, credential_scope),
            );
        } else {
            req.headers.insert(HeaderName::from_static(DATE_HEADER), header_value(DATE_HEADER, &amz_date)?);
        }

        let body_digest = self.body_digest(req, body)?;

        let mut unsigned_headers = req.headers.clone();
        if ctx.presign_for.is_some() && !self.options.disable_header_hoisting {
            hoist_headers(&mut unsigned_headers, &mut query);
        }

        let host = match req.headers.get("host") {
            Some(v) => String::from_utf8_lossy(v.as_bytes()).into_owned(),
            None => canonical::url_authority(&req.url),
        };
        let headers = canonical::canonical_headers(&unsigned_headers, &host, rules::is_ignored);

        if ctx.presign_for.is_some() {
            set_query(&mut query, SIGNED_HEADERS_QUERY, &headers.signed);
        }

        let canonical_query = canonical::canonical_query(&query);
        let canonical_uri = canonical::canonical_uri(
            &req.url,
            req.opaque.as_deref(),
            !self.options.disable_uri_path_escaping,
        );
        let canonical_request = [
            req.method.as_str(),
            &canonical_uri,
            &canonical_query,
            &format!("{}\n", headers.canonical),
            &headers.signed,
            &body_digest,
        ]
        .join("\n");

        let string_to_sign = [
            AUTH_HEADER_PREFIX,
            &amz_date,
            &credential_scope,
            &hex::encode(Sha256::digest(canonical_request.as_bytes())),
        ]
        .join("\n");

        let key = self.derive_key(&ctx.time, ctx.region, ctx.service)?;
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

        if ctx.presign_for.is_some() {
            req.url.set_query(Some(&format!("{}&{}={}", canonical_query, SIGNATURE_QUERY, signature)));
        } else {
            if canonical_query.is_empty() {
                req.url.set_query(None);
            } else {
                req.url.set_query(Some(&canonical_query));
            }
            let auth = format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                AUTH_HEADER_PREFIX,
                self.credentials.access_key_id,
                credential_scope,
                headers.signed,
                signature
            );
            req.headers.insert(AUTHORIZATION, header_value("authorization", &auth)?);
        }

        Ok(SigningOutput {
            signature,
            signed_headers: headers.signed,
            credential_scope,
            canonical_request,
            string_to_sign,
        })
    }

    fn body_digest(
        &self,
        req: &mut HttpRequest,
        body: Option<&mut dyn ReadSeek>,
    ) -> Result<String, SignError> {
        if let Some(precomputed) = req.headers.get(CONTENT_SHA256_HEADER) {
            let digest = String::from_utf8_lossy(precomputed.as_bytes()).into_owned();
            if !digest.is_empty() {
                return Ok(digest);
            }
        }
        if self.options.unsigned_payload {
            req.headers.insert(
                HeaderName::from_static(CONTENT_SHA256_HEADER),
                HeaderValue::from_static(UNSIGNED_PAYLOAD),
            );
            return Ok(UNSIGNED_PAYLOAD.to_string());
        }
        match body {
            None => Ok(EMPTY_STRING_SHA256.to_string()),
            Some(reader) => hash_seekable(reader),
        }
    }

    fn derive_key(
        &self,
        time: &DateTime<Utc>,
        region: &str,
        service: &str,
    ) -> Result<[u8; 32], SignError> {
        let secret = format!("{}{}", SECRET_KEY_PREFIX, self.credentials.secret_access_key);
        let date = time.format("%Y%m%d").to_string();
        let k_date = hmac_sha256(secret.as_bytes(), date.as_bytes())?;
        let k_region = hmac_sha256(&k_date, region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, service.as_bytes())?;
        hmac_sha256(&k_service, SCOPE_TERMINATOR.as_bytes())
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; 32], SignError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| SignError::InvalidKey(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

fn hash_seekable(reader: &mut dyn ReadSeek) -> Result<String, SignError> {
    let start = reader.stream_position().map_err(SignError::Seek)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    let read_result = loop {
        match reader.read(&mut buf) {
            Ok(0) => break Ok(()),
            Ok(n) => hasher.update(&buf[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => break Err(SignError::Read(e)),
        }
    };
    reader.seek(SeekFrom::Start(start)).map_err(SignError::Seek)?;
    read_result?;
    Ok(hex::encode(hasher.finalize()))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, SignError> {
    HeaderValue::from_str(value)
        .map_err(|e| SignError::InvalidHeader { name: name.to_string(), reason: e.to_string() })
}

fn set_query(query: &mut canonical::QueryValues, key: &str, value: &str) {
    query.insert(key.to_string(), vec![value.to_string()]);
}

/// Remove markers left by an earlier signing pass so the request can be signed again.
fn strip_previous_signature(req: &mut HttpRequest, query: &mut canonical::QueryValues) {
    req.headers.remove(AUTHORIZATION);
    if query.contains_key(SIGNATURE_QUERY) {
        for key in PRESIGN_QUERY_KEYS {
            query.remove(*key);
        }
    }
}

/// Move hoistable headers from `headers` into `query`, keyed by canonical MIME name.
fn hoist_headers(headers: &mut reqwest::header::HeaderMap, query: &mut canonical::QueryValues) {
    let names: Vec<HeaderName> =
        headers.keys().filter(|n| rules::is_hoistable(n.as_str())).cloned().collect();
    for name in names {
        let values: Vec<String> = headers
            .get_all(&name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect();
        headers.remove(&name);
        query.insert(rules::canonical_mime_key(name.as_str()), values);
    }
}
