// src/services/auth.rs

//! Bearer token verification.
//!
//! Tokens are Firebase ID tokens checked with the Identity Toolkit
//! `accounts:lookup` call. Configured development tokens are matched first
//! and never leave the process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{AuthConfig, DevToken};
use crate::utils::{endpoint_url, http::send_json};

/// Identity behind a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub uid: String,
    pub email: String,
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub is_admin: bool,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedToken>;
}

/// Identity Toolkit verifier.
pub struct FirebaseVerifier {
    client: Client,
    endpoint: String,
    api_key: SecretString,
}

impl FirebaseVerifier {
    pub fn new(client: Client, endpoint: &str, api_key: SecretString) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    disabled: bool,
}

#[async_trait]
impl TokenVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let url = endpoint_url(
            &self.endpoint,
            "accounts:lookup",
            &[("key", self.api_key.expose_secret())],
        )?;
        let request = self.client.post(url).json(&json!({ "idToken": token }));

        let response: LookupResponse = send_json("identity-toolkit", request)
            .await
            .map_err(|e| match e {
                AppError::Upstream { message, .. } => {
                    AppError::unauthorized(format!("Token rejected: {message}"))
                }
                other => other,
            })?;

        let user = response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AppError::unauthorized("Token does not belong to any user"))?;
        if user.disabled {
            return Err(AppError::unauthorized("Account is disabled"));
        }

        Ok(VerifiedToken {
            uid: user.local_id,
            email: user.email.unwrap_or_default(),
        })
    }
}

/// Fixed tokens from the configuration.
pub struct DevTokenVerifier {
    tokens: HashMap<String, VerifiedToken>,
}

impl DevTokenVerifier {
    pub fn new(tokens: &[DevToken]) -> Self {
        Self {
            tokens: tokens
                .iter()
                .map(|t| {
                    (
                        t.token.clone(),
                        VerifiedToken {
                            uid: t.uid.clone(),
                            email: t.email.clone(),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn lookup(&self, token: &str) -> Option<VerifiedToken> {
        self.tokens.get(token).cloned()
    }
}

#[async_trait]
impl TokenVerifier for DevTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        self.lookup(token)
            .ok_or_else(|| AppError::unauthorized("Unknown token"))
    }
}

/// Turns bearer tokens into [`AuthUser`]s.
pub struct Authenticator {
    dev: DevTokenVerifier,
    remote: Option<Arc<dyn TokenVerifier>>,
    admin_emails: Vec<String>,
}

impl Authenticator {
    pub fn new(
        dev: DevTokenVerifier,
        remote: Option<Arc<dyn TokenVerifier>>,
        admin_emails: Vec<String>,
    ) -> Self {
        Self {
            dev,
            remote,
            admin_emails: admin_emails.iter().map(|e| e.trim().to_lowercase()).collect(),
        }
    }

    /// Build from configuration; remote verification needs the API key.
    pub fn from_config(config: &AuthConfig, client: Client, api_key: Option<SecretString>) -> Self {
        let remote = api_key.map(|key| {
            Arc::new(FirebaseVerifier::new(client, &config.endpoint, key)) as Arc<dyn TokenVerifier>
        });
        if remote.is_none() && config.dev_tokens.is_empty() {
            log::warn!("No {} set and no dev tokens configured; every authenticated request will be rejected", config.api_key_env);
        }
        Self::new(
            DevTokenVerifier::new(&config.dev_tokens),
            remote,
            config.admin_emails.clone(),
        )
    }

    pub fn is_admin(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        !email.is_empty() && self.admin_emails.contains(&email)
    }

    pub async fn authenticate(&self, token: &str) -> Result<AuthUser> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::unauthorized("Missing token"));
        }

        let verified = match self.dev.lookup(token) {
            Some(v) => v,
            None => match &self.remote {
                Some(remote) => remote.verify(token).await?,
                None => return Err(AppError::unauthorized("Invalid token")),
            },
        };

        Ok(AuthUser {
            is_admin: self.is_admin(&verified.email),
            uid: verified.uid,
            email: verified.email,
        })
    }
}
