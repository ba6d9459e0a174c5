//! Credentials and request signing
//!
//! Two modes are supported: HTTP Basic and OAuth 1.0a (HMAC-SHA1). Only the
//! signed mode may open the user stream.

use std::fmt;

use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use crate::error::{Result, StreamClientError};
use crate::request::StreamRequest;

type HmacSha1 = Hmac<Sha1>;

/// Stream credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Credentials {
    /// HTTP Basic authentication
    Basic { username: String, password: String },
    /// OAuth 1.0a signed requests
    #[serde(rename = "oauth")]
    OAuth {
        consumer_key: String,
        consumer_secret: String,
        access_token: String,
        access_token_secret: String,
    },
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn oauth(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Self {
        Self::OAuth {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: access_token.into(),
            access_token_secret: access_token_secret.into(),
        }
    }

    /// Whether these are signed (OAuth) credentials
    pub fn is_oauth(&self) -> bool {
        matches!(self, Self::OAuth { .. })
    }

    /// Check that every field is present
    pub fn validate(&self) -> Result<()> {
        let fields: Vec<(&str, &str)> = match self {
            Self::Basic { username, password } => {
                vec![("username", username.as_str()), ("password", password.as_str())]
            }
            Self::OAuth {
                consumer_key,
                consumer_secret,
                access_token,
                access_token_secret,
            } => vec![
                ("consumer_key", consumer_key.as_str()),
                ("consumer_secret", consumer_secret.as_str()),
                ("access_token", access_token.as_str()),
                ("access_token_secret", access_token_secret.as_str()),
            ],
        };

        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(StreamClientError::AuthValidation(format!(
                "missing {}",
                missing.join(", ")
            )))
        }
    }

    /// `Authorization` header value for `request`
    pub fn authorization(&self, request: &StreamRequest) -> Result<String> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp();
        self.authorization_with(request, &nonce, timestamp)
    }

    /// `Authorization` header value with a fixed nonce and timestamp
    pub fn authorization_with(
        &self,
        request: &StreamRequest,
        nonce: &str,
        timestamp: i64,
    ) -> Result<String> {
        match self {
            Self::Basic { username, password } => {
                let token = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                Ok(format!("Basic {}", token))
            }
            Self::OAuth {
                consumer_key,
                consumer_secret,
                access_token,
                access_token_secret,
            } => {
                let mut oauth_params = vec![
                    ("oauth_consumer_key", consumer_key.clone()),
                    ("oauth_nonce", nonce.to_string()),
                    ("oauth_signature_method", "HMAC-SHA1".to_string()),
                    ("oauth_timestamp", timestamp.to_string()),
                    ("oauth_token", access_token.clone()),
                    ("oauth_version", "1.0".to_string()),
                ];

                let signature =
                    oauth_signature(request, &oauth_params, consumer_secret, access_token_secret)?;
                oauth_params.push(("oauth_signature", signature));
                oauth_params.sort_by(|a, b| a.0.cmp(b.0));

                let header: Vec<String> = oauth_params
                    .iter()
                    .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
                    .collect();
                Ok(format!("OAuth {}", header.join(", ")))
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::OAuth {
                consumer_key,
                access_token,
                ..
            } => f
                .debug_struct("OAuth")
                .field("consumer_key", consumer_key)
                .field("access_token", access_token)
                .finish_non_exhaustive(),
        }
    }
}

/// RFC 3986 percent-encoding (unreserved characters kept)
fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn oauth_signature(
    request: &StreamRequest,
    oauth_params: &[(&str, String)],
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String> {
    let mut pairs: Vec<(String, String)> = request
        .params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .chain(oauth_params.iter().map(|(k, v)| (encode(k), encode(v))))
        .collect();
    pairs.sort();

    let param_string = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        request.method.as_str(),
        encode(&request.base_url()),
        encode(&param_string)
    );
    let signing_key = format!("{}&{}", encode(consumer_secret), encode(token_secret));

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .map_err(|e| StreamClientError::AuthValidation(format!("signing key rejected: {}", e)))?;
    mac.update(base_string.as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;

    #[test]
    fn test_validate_rejects_empty_fields() {
        let err = Credentials::basic("user", "").validate().unwrap_err();
        assert!(matches!(err, StreamClientError::AuthValidation(ref m) if m.contains("password")));

        let err = Credentials::oauth("ck", " ", "", "ts").validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("consumer_secret"));
        assert!(msg.contains("access_token"));

        assert!(Credentials::oauth("a", "b", "c", "d").validate().is_ok());
    }

    #[test]
    fn test_basic_header() {
        let request = StreamRequest::new(Method::Get, "https", "h", "/p");
        let header = Credentials::basic("Aladdin", "open sesame")
            .authorization(&request)
            .unwrap();
        assert_eq!(header, "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    }

    #[test]
    fn test_oauth_signature_known_vector() {
        let request = StreamRequest::new(
            Method::Post,
            "https",
            "api.twitter.com",
            "/1.1/statuses/update.json",
        )
        .with_param("include_entities", "true")
        .with_param("status", "Hello Ladies + Gentlemen, a signed OAuth request!");

        let credentials = Credentials::oauth(
            "xvz1evFS4wEEPTGEFPHBog",
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        );
        let header = credentials
            .authorization_with(&request, "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg", 1318622958)
            .unwrap();

        assert!(header.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\""));
        assert!(header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(header.contains("oauth_version=\"1.0\""));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", Credentials::oauth("ck", "very-secret", "at", "also-secret"));
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("also-secret"));
        let debug = format!("{:?}", Credentials::basic("u", "hunter2"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_credentials_from_toml_style_json() {
        let creds: Credentials = serde_json::from_str(
            r#"{"type":"oauth","consumer_key":"a","consumer_secret":"b","access_token":"c","access_token_secret":"d"}"#,
        )
        .unwrap();
        assert!(creds.is_oauth());
        let creds: Credentials =
            serde_json::from_str(r#"{"type":"basic","username":"u","password":"p"}"#).unwrap();
        assert!(!creds.is_oauth());
    }
}
