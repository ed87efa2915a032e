//! Credential catalogue, typed payload shapes, and persisted records.
//!
//! The catalogue is closed: every [`CredentialType`] maps to exactly one payload
//! struct, and [`CredentialPayload`] is the tagged union over those structs.
//! Payload structs reject unknown fields on deserialization.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::secret::Redacted;

/// Upper bound on the canonical serialized payload size in bytes.
pub const MAX_PAYLOAD_BYTES: usize = 4096;

/// Upper bound on a credential description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 512;

/// Default header name for webhook signatures when none is configured.
pub const DEFAULT_WEBHOOK_HEADER: &str = "X-Webhook-Signature";

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a credential row, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialId(pub Uuid);

impl CredentialId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CredentialId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CredentialId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

/// The closed set of third-party credential kinds a tenant can store.
///
/// Wire names (`GOOGLE_OAUTH`, ...) are the stable external contract used in
/// JSON and persistence. Slugs (`google-oauth`, ...) are used in URL paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CredentialType {
    #[serde(rename = "GOOGLE_OAUTH")]
    GoogleOAuth,
    #[serde(rename = "META_OAUTH")]
    MetaOAuth,
    #[serde(rename = "EMAIL_SMTP")]
    EmailSmtp,
    #[serde(rename = "AWS_S3")]
    AwsS3,
    #[serde(rename = "RAZORPAY")]
    Razorpay,
    #[serde(rename = "BILLDESK")]
    Billdesk,
    #[serde(rename = "GOOGLE_ADS")]
    GoogleAds,
    #[serde(rename = "META_ADS")]
    MetaAds,
    #[serde(rename = "SLACK")]
    Slack,
    #[serde(rename = "WEBHOOK_AUTH")]
    WebhookAuth,
}

impl CredentialType {
    /// Every credential type, in catalogue order.
    pub const ALL: [CredentialType; 10] = [
        CredentialType::GoogleOAuth,
        CredentialType::MetaOAuth,
        CredentialType::EmailSmtp,
        CredentialType::AwsS3,
        CredentialType::Razorpay,
        CredentialType::Billdesk,
        CredentialType::GoogleAds,
        CredentialType::MetaAds,
        CredentialType::Slack,
        CredentialType::WebhookAuth,
    ];

    /// Stable wire name, e.g. `EMAIL_SMTP`.
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialType::GoogleOAuth => "GOOGLE_OAUTH",
            CredentialType::MetaOAuth => "META_OAUTH",
            CredentialType::EmailSmtp => "EMAIL_SMTP",
            CredentialType::AwsS3 => "AWS_S3",
            CredentialType::Razorpay => "RAZORPAY",
            CredentialType::Billdesk => "BILLDESK",
            CredentialType::GoogleAds => "GOOGLE_ADS",
            CredentialType::MetaAds => "META_ADS",
            CredentialType::Slack => "SLACK",
            CredentialType::WebhookAuth => "WEBHOOK_AUTH",
        }
    }

    /// URL path slug, e.g. `email-smtp`.
    pub fn slug(&self) -> &'static str {
        match self {
            CredentialType::GoogleOAuth => "google-oauth",
            CredentialType::MetaOAuth => "meta-oauth",
            CredentialType::EmailSmtp => "email-smtp",
            CredentialType::AwsS3 => "aws-s3",
            CredentialType::Razorpay => "razorpay",
            CredentialType::Billdesk => "billdesk",
            CredentialType::GoogleAds => "google-ads",
            CredentialType::MetaAds => "meta-ads",
            CredentialType::Slack => "slack",
            CredentialType::WebhookAuth => "webhook-auth",
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses either the wire name (`EMAIL_SMTP`) or the slug (`email-smtp`).
/// Anything else is rejected.
impl FromStr for CredentialType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CredentialType::ALL
            .into_iter()
            .find(|t| t.as_str() == s || t.slug() == s)
            .ok_or_else(|| format!("unknown credential type: '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Payload shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoogleOAuthCredential {
    pub client_id: String,
    pub client_secret: Redacted,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetaOAuthCredential {
    pub app_id: String,
    pub app_secret: Redacted,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailSmtpCredential {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Redacted,
    pub from_name: String,
    pub from_email: String,
    #[serde(default)]
    pub tls: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsS3Credential {
    pub access_key_id: String,
    pub secret_access_key: Redacted,
    pub region: String,
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RazorpayCredential {
    pub key_id: String,
    pub key_secret: Redacted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BilldeskCredential {
    pub client_id: String,
    pub client_secret: Redacted,
    pub merchant_id: String,
    #[serde(default)]
    pub sandbox: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoogleAdsCredential {
    pub customer_id: String,
    pub developer_token: Redacted,
    pub refresh_token: Redacted,
    pub client_id: String,
    pub client_secret: Redacted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetaAdsCredential {
    pub access_token: Redacted,
    pub business_account_id: String,
    pub ad_account_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlackCredential {
    pub bot_token: Redacted,
    pub signing_secret: Redacted,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_channel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookAuthCredential {
    pub secret: Redacted,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,
}

impl WebhookAuthCredential {
    /// Header carrying the signature, falling back to [`DEFAULT_WEBHOOK_HEADER`].
    pub fn header_name(&self) -> &str {
        self.header_name.as_deref().unwrap_or(DEFAULT_WEBHOOK_HEADER)
    }
}

/// A decrypted credential: one variant per [`CredentialType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialPayload {
    GoogleOAuth(GoogleOAuthCredential),
    MetaOAuth(MetaOAuthCredential),
    EmailSmtp(EmailSmtpCredential),
    AwsS3(AwsS3Credential),
    Razorpay(RazorpayCredential),
    Billdesk(BilldeskCredential),
    GoogleAds(GoogleAdsCredential),
    MetaAds(MetaAdsCredential),
    Slack(SlackCredential),
    WebhookAuth(WebhookAuthCredential),
}

impl CredentialPayload {
    pub fn credential_type(&self) -> CredentialType {
        match self {
            CredentialPayload::GoogleOAuth(_) => CredentialType::GoogleOAuth,
            CredentialPayload::MetaOAuth(_) => CredentialType::MetaOAuth,
            CredentialPayload::EmailSmtp(_) => CredentialType::EmailSmtp,
            CredentialPayload::AwsS3(_) => CredentialType::AwsS3,
            CredentialPayload::Razorpay(_) => CredentialType::Razorpay,
            CredentialPayload::Billdesk(_) => CredentialType::Billdesk,
            CredentialPayload::GoogleAds(_) => CredentialType::GoogleAds,
            CredentialPayload::MetaAds(_) => CredentialType::MetaAds,
            CredentialPayload::Slack(_) => CredentialType::Slack,
            CredentialPayload::WebhookAuth(_) => CredentialType::WebhookAuth,
        }
    }

    /// Serialize the inner record (no type tag) to a JSON value.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            CredentialPayload::GoogleOAuth(c) => serde_json::to_value(c),
            CredentialPayload::MetaOAuth(c) => serde_json::to_value(c),
            CredentialPayload::EmailSmtp(c) => serde_json::to_value(c),
            CredentialPayload::AwsS3(c) => serde_json::to_value(c),
            CredentialPayload::Razorpay(c) => serde_json::to_value(c),
            CredentialPayload::Billdesk(c) => serde_json::to_value(c),
            CredentialPayload::GoogleAds(c) => serde_json::to_value(c),
            CredentialPayload::MetaAds(c) => serde_json::to_value(c),
            CredentialPayload::Slack(c) => serde_json::to_value(c),
            CredentialPayload::WebhookAuth(c) => serde_json::to_value(c),
        }
    }

    /// Deserialize a JSON value into the shape associated with `ty`.
    ///
    /// Fails on missing fields, wrong field types, or unknown fields.
    pub fn from_value(
        ty: CredentialType,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match ty {
            CredentialType::GoogleOAuth => Self::GoogleOAuth(serde_json::from_value(value)?),
            CredentialType::MetaOAuth => Self::MetaOAuth(serde_json::from_value(value)?),
            CredentialType::EmailSmtp => Self::EmailSmtp(serde_json::from_value(value)?),
            CredentialType::AwsS3 => Self::AwsS3(serde_json::from_value(value)?),
            CredentialType::Razorpay => Self::Razorpay(serde_json::from_value(value)?),
            CredentialType::Billdesk => Self::Billdesk(serde_json::from_value(value)?),
            CredentialType::GoogleAds => Self::GoogleAds(serde_json::from_value(value)?),
            CredentialType::MetaAds => Self::MetaAds(serde_json::from_value(value)?),
            CredentialType::Slack => Self::Slack(serde_json::from_value(value)?),
            CredentialType::WebhookAuth => Self::WebhookAuth(serde_json::from_value(value)?),
        })
    }

    /// Canonical byte form: a JSON object with keys in sorted order.
    ///
    /// Two equal payloads always produce identical bytes. This is the only
    /// form the cipher ever sees.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let value = self.to_value()?;
        let sorted: BTreeMap<String, serde_json::Value> = match value {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            other => {
                return serde_json::to_vec(&other);
            }
        };
        serde_json::to_vec(&sorted)
    }

    /// Inverse of [`canonical_bytes`](Self::canonical_bytes).
    pub fn from_canonical_bytes(
        ty: CredentialType,
        bytes: &[u8],
    ) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        Self::from_value(ty, value)
    }

    /// Check required fields the way the management surface expects them.
    pub fn validate(&self) -> Result<(), String> {
        fn required(field: &str, value: &str) -> Result<(), String> {
            if value.trim().is_empty() {
                Err(format!("{field} is required"))
            } else {
                Ok(())
            }
        }

        match self {
            CredentialPayload::GoogleOAuth(c) => {
                required("client_id", &c.client_id)?;
                required("client_secret", c.client_secret.expose())?;
                required("redirect_uri", &c.redirect_uri)
            }
            CredentialPayload::MetaOAuth(c) => {
                required("app_id", &c.app_id)?;
                required("app_secret", c.app_secret.expose())?;
                required("redirect_uri", &c.redirect_uri)
            }
            CredentialPayload::EmailSmtp(c) => {
                required("host", &c.host)?;
                required("username", &c.username)?;
                required("password", c.password.expose())?;
                required("from_name", &c.from_name)?;
                required("from_email", &c.from_email)?;
                if c.port == 0 {
                    return Err("port must be between 1 and 65535".to_string());
                }
                if !c.from_email.contains('@') {
                    return Err("from_email must be an email address".to_string());
                }
                Ok(())
            }
            CredentialPayload::AwsS3(c) => {
                required("access_key_id", &c.access_key_id)?;
                required("secret_access_key", c.secret_access_key.expose())?;
                required("region", &c.region)?;
                required("bucket", &c.bucket)
            }
            CredentialPayload::Razorpay(c) => {
                required("key_id", &c.key_id)?;
                required("key_secret", c.key_secret.expose())
            }
            CredentialPayload::Billdesk(c) => {
                required("client_id", &c.client_id)?;
                required("client_secret", c.client_secret.expose())?;
                required("merchant_id", &c.merchant_id)
            }
            CredentialPayload::GoogleAds(c) => {
                required("customer_id", &c.customer_id)?;
                required("developer_token", c.developer_token.expose())?;
                required("refresh_token", c.refresh_token.expose())?;
                required("client_id", &c.client_id)?;
                required("client_secret", c.client_secret.expose())
            }
            CredentialPayload::MetaAds(c) => {
                required("access_token", c.access_token.expose())?;
                required("business_account_id", &c.business_account_id)?;
                required("ad_account_id", &c.ad_account_id)
            }
            CredentialPayload::Slack(c) => {
                required("bot_token", c.bot_token.expose())?;
                required("signing_secret", c.signing_secret.expose())
            }
            CredentialPayload::WebhookAuth(c) => required("secret", c.secret.expose()),
        }
    }
}

// ---------------------------------------------------------------------------
// Typed access
// ---------------------------------------------------------------------------

/// Compile-time link between a payload struct and its [`CredentialType`].
///
/// Lets consumers fetch `ctx.get::<EmailSmtpCredential>()` instead of naming a
/// string key, so a misspelt key cannot silently return nothing.
pub trait CredentialKind: Sized + Send + Sync + 'static {
    const TYPE: CredentialType;

    fn from_payload(payload: &CredentialPayload) -> Option<&Self>;

    fn into_payload(self) -> CredentialPayload;
}

impl CredentialKind for GoogleOAuthCredential {
    const TYPE: CredentialType = CredentialType::GoogleOAuth;

    fn from_payload(payload: &CredentialPayload) -> Option<&Self> {
        match payload {
            CredentialPayload::GoogleOAuth(c) => Some(c),
            _ => None,
        }
    }

    fn into_payload(self) -> CredentialPayload {
        CredentialPayload::GoogleOAuth(self)
    }
}

impl CredentialKind for MetaOAuthCredential {
    const TYPE: CredentialType = CredentialType::MetaOAuth;

    fn from_payload(payload: &CredentialPayload) -> Option<&Self> {
        match payload {
            CredentialPayload::MetaOAuth(c) => Some(c),
            _ => None,
        }
    }

    fn into_payload(self) -> CredentialPayload {
        CredentialPayload::MetaOAuth(self)
    }
}

impl CredentialKind for EmailSmtpCredential {
    const TYPE: CredentialType = CredentialType::EmailSmtp;

    fn from_payload(payload: &CredentialPayload) -> Option<&Self> {
        match payload {
            CredentialPayload::EmailSmtp(c) => Some(c),
            _ => None,
        }
    }

    fn into_payload(self) -> CredentialPayload {
        CredentialPayload::EmailSmtp(self)
    }
}

impl CredentialKind for AwsS3Credential {
    const TYPE: CredentialType = CredentialType::AwsS3;

    fn from_payload(payload: &CredentialPayload) -> Option<&Self> {
        match payload {
            CredentialPayload::AwsS3(c) => Some(c),
            _ => None,
        }
    }

    fn into_payload(self) -> CredentialPayload {
        CredentialPayload::AwsS3(self)
    }
}

impl CredentialKind for RazorpayCredential {
    const TYPE: CredentialType = CredentialType::Razorpay;

    fn from_payload(payload: &CredentialPayload) -> Option<&Self> {
        match payload {
            CredentialPayload::Razorpay(c) => Some(c),
            _ => None,
        }
    }

    fn into_payload(self) -> CredentialPayload {
        CredentialPayload::Razorpay(self)
    }
}

impl CredentialKind for BilldeskCredential {
    const TYPE: CredentialType = CredentialType::Billdesk;

    fn from_payload(payload: &CredentialPayload) -> Option<&Self> {
        match payload {
            CredentialPayload::Billdesk(c) => Some(c),
            _ => None,
        }
    }

    fn into_payload(self) -> CredentialPayload {
        CredentialPayload::Billdesk(self)
    }
}

impl CredentialKind for GoogleAdsCredential {
    const TYPE: CredentialType = CredentialType::GoogleAds;

    fn from_payload(payload: &CredentialPayload) -> Option<&Self> {
        match payload {
            CredentialPayload::GoogleAds(c) => Some(c),
            _ => None,
        }
    }

    fn into_payload(self) -> CredentialPayload {
        CredentialPayload::GoogleAds(self)
    }
}

impl CredentialKind for MetaAdsCredential {
    const TYPE: CredentialType = CredentialType::MetaAds;

    fn from_payload(payload: &CredentialPayload) -> Option<&Self> {
        match payload {
            CredentialPayload::MetaAds(c) => Some(c),
            _ => None,
        }
    }

    fn into_payload(self) -> CredentialPayload {
        CredentialPayload::MetaAds(self)
    }
}

impl CredentialKind for SlackCredential {
    const TYPE: CredentialType = CredentialType::Slack;

    fn from_payload(payload: &CredentialPayload) -> Option<&Self> {
        match payload {
            CredentialPayload::Slack(c) => Some(c),
            _ => None,
        }
    }

    fn into_payload(self) -> CredentialPayload {
        CredentialPayload::Slack(self)
    }
}

impl CredentialKind for WebhookAuthCredential {
    const TYPE: CredentialType = CredentialType::WebhookAuth;

    fn from_payload(payload: &CredentialPayload) -> Option<&Self> {
        match payload {
            CredentialPayload::WebhookAuth(c) => Some(c),
            _ => None,
        }
    }

    fn into_payload(self) -> CredentialPayload {
        CredentialPayload::WebhookAuth(self)
    }
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// One persisted version of a tenant credential.
///
/// `encrypted_value` is the base64 envelope produced by the cipher. At most
/// one row per `(tenant_id, credential_type)` has `is_active = true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub id: CredentialId,
    pub tenant_id: String,
    pub credential_type: CredentialType,
    pub encrypted_value: String,
    pub description: String,
    pub is_active: bool,
    pub last_rotated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Whether `expires_at` lies at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// Project the record to metadata, dropping the ciphertext.
    pub fn metadata(&self) -> CredentialMetadata {
        CredentialMetadata {
            id: self.id.clone(),
            tenant_id: self.tenant_id.clone(),
            credential_type: self.credential_type,
            description: self.description.clone(),
            is_active: self.is_active,
            last_rotated_at: self.last_rotated_at,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Metadata about a stored credential (neither plaintext nor ciphertext).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialMetadata {
    pub id: CredentialId,
    pub tenant_id: String,
    pub credential_type: CredentialType,
    pub description: String,
    pub is_active: bool,
    pub last_rotated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
