//! Outbound contact-list synchronization.

use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::model::User;

/// Contact sync failures.
#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    /// Endpoint configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),
    /// Transport failure.
    #[error("Network error: {0}")]
    Network(String),
    /// The contact service answered with a failure status.
    #[error("Contact service returned {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
}

/// Pushes user profiles to an external contact list.
#[async_trait]
pub trait ContactSync: Send + Sync {
    /// Adds or refreshes `user`; `is_new_moderator` flags a fresh moderator
    /// position.
    async fn add_contact(&self, user: &User, is_new_moderator: bool) -> Result<(), ContactError>;
}

/// Used when no contact service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopContactSync;

#[async_trait]
impl ContactSync for NoopContactSync {
    async fn add_contact(&self, user: &User, is_new_moderator: bool) -> Result<(), ContactError> {
        debug!(username = %user.username, is_new_moderator, "contact sync disabled, skipping");
        Ok(())
    }
}

#[derive(Serialize)]
struct ContactPayload<'a> {
    contacts: [Contact<'a>; 1],
}

#[derive(Serialize)]
struct Contact<'a> {
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    username: &'a str,
    num_branches: i64,
    num_mod_positions: i64,
    is_new_moderator: bool,
}

/// Contact sync over HTTP: `PUT {base_url}contacts` with a JSON body.
pub struct HttpContactSync {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl HttpContactSync {
    /// Targets the service at `base_url`.
    #[must_use]
    pub fn new(base_url: Url, api_key: Option<SecretString>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl ContactSync for HttpContactSync {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn add_contact(&self, user: &User, is_new_moderator: bool) -> Result<(), ContactError> {
        let url = self
            .base_url
            .join("contacts")
            .map_err(|e| ContactError::Config(format!("Invalid URL join: {e}")))?;

        let payload = ContactPayload {
            contacts: [Contact {
                email: &user.email,
                first_name: &user.firstname,
                last_name: &user.lastname,
                username: &user.username,
                num_branches: user.num_branches,
                num_mod_positions: user.num_mod_positions,
                is_new_moderator,
            }],
        };

        let mut request = self.client.put(url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key.expose_secret()));
        }

        let res = request
            .send()
            .await
            .map_err(|e| ContactError::Network(e.to_string()))?;

        let status = res.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "contact synced");
            return Ok(());
        }
        let body = res.text().await.unwrap_or_default();
        Err(ContactError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
