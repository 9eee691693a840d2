//! Turns the configured credential into an `Authorization` header value.
//!
//! Legacy mode uses the server key as-is. v1 mode signs a JWT assertion with
//! the service account key and trades it for an OAuth2 access token at the
//! token endpoint. Tokens are not cached: every send fetches a fresh one.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use super::ProviderError;
use crate::config::{ProviderCredential, ServiceAccountKey};

pub const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_MINUTES: i64 = 60;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug)]
pub enum BearerCredential {
    ServerKey(Secret<String>),
    AccessToken(Secret<String>),
}

impl BearerCredential {
    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        match self {
            BearerCredential::ServerKey(key) => format!("key={}", key.expose_secret()),
            BearerCredential::AccessToken(token) => format!("Bearer {}", token.expose_secret()),
        }
    }
}

pub async fn resolve(
    client: &Client,
    credential: &ProviderCredential,
    token_uri: &str,
) -> Result<BearerCredential, ProviderError> {
    match credential {
        ProviderCredential::ServerKey(key) => Ok(BearerCredential::ServerKey(Secret::new(
            key.expose_secret().clone(),
        ))),
        ProviderCredential::ServiceAccount(account) => {
            let assertion = sign_assertion(account, token_uri, Utc::now())?;
            let token = exchange_assertion(client, token_uri, &assertion).await?;
            Ok(BearerCredential::AccessToken(token))
        }
    }
}

/// RS256 assertion for the messaging scope, valid for one hour from `now`.
pub fn sign_assertion(
    account: &ServiceAccountKey,
    token_uri: &str,
    now: DateTime<Utc>,
) -> Result<String, ProviderError> {
    let claims = AssertionClaims {
        iss: &account.client_email,
        scope: MESSAGING_SCOPE,
        aud: token_uri,
        iat: now.timestamp(),
        exp: (now + Duration::minutes(ASSERTION_LIFETIME_MINUTES)).timestamp(),
    };

    let encoding_key = EncodingKey::from_rsa_pem(account.private_key.expose_secret().as_bytes())
        .map_err(|e| ProviderError::Credential(format!("Failed to parse private key: {}", e)))?;

    encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| ProviderError::Credential(format!("Failed to sign JWT assertion: {}", e)))
}

async fn exchange_assertion(
    client: &Client,
    token_uri: &str,
    assertion: &str,
) -> Result<Secret<String>, ProviderError> {
    let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)];

    let response = client
        .post(token_uri)
        .form(&params)
        .send()
        .await
        .map_err(|e| ProviderError::Transport(format!("Failed to reach token endpoint: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<TokenErrorResponse>(&body)
            .map(|e| match e.error_description {
                Some(description) => format!("{}: {}", e.error, description),
                None => e.error,
            })
            .unwrap_or_else(|_| "unrecognised error body".to_string());

        return Err(ProviderError::Credential(format!(
            "Token endpoint returned {}: {}",
            status, reason
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::Credential(format!("Failed to parse token response: {}", e)))?;

    tracing::debug!("Obtained FCM access token");

    Ok(Secret::new(token.access_token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    const PRIVATE_KEY: &str = include_str!("../../../tests/fixtures/service_account_key.pem");
    const PUBLIC_KEY: &str = include_str!("../../../tests/fixtures/service_account_key.pub.pem");
    const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

    #[derive(Debug, Deserialize)]
    struct DecodedClaims {
        iss: String,
        scope: String,
        aud: String,
        iat: i64,
        exp: i64,
    }

    fn account(private_key: &str) -> ServiceAccountKey {
        ServiceAccountKey {
            client_email: "relay@demo-project.iam.gserviceaccount.com".to_string(),
            private_key: Secret::new(private_key.to_string()),
            project_id: "demo-project".to_string(),
        }
    }

    #[test]
    fn assertion_is_rs256_signed_for_messaging_scope() {
        let now = Utc::now();
        let jwt = sign_assertion(&account(PRIVATE_KEY), TOKEN_URI, now).unwrap();

        let header = jsonwebtoken::decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[TOKEN_URI]);
        let decoded = decode::<DecodedClaims>(
            &jwt,
            &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap()
        .claims;

        assert_eq!(decoded.iss, "relay@demo-project.iam.gserviceaccount.com");
        assert_eq!(decoded.scope, MESSAGING_SCOPE);
        assert_eq!(decoded.aud, TOKEN_URI);
        assert_eq!(decoded.iat, now.timestamp());
        assert_eq!(decoded.exp - decoded.iat, 3600);
    }

    #[test]
    fn malformed_private_key_is_a_credential_error() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let err = sign_assertion(&account("not a pem"), TOKEN_URI, now).unwrap_err();
        assert!(matches!(err, ProviderError::Credential(_)));
    }

    #[tokio::test]
    async fn server_key_is_used_directly() {
        let credential = ProviderCredential::ServerKey(Secret::new("AAAA-secret".to_string()));
        // Unroutable token URI: legacy mode must never touch it.
        let bearer = resolve(&Client::new(), &credential, "http://127.0.0.1:9/token")
            .await
            .unwrap();

        assert_eq!(bearer.authorization(), "key=AAAA-secret");
    }

    #[test]
    fn access_token_uses_bearer_scheme() {
        let bearer = BearerCredential::AccessToken(Secret::new("ya29.token".to_string()));
        assert_eq!(bearer.authorization(), "Bearer ya29.token");
    }
}
