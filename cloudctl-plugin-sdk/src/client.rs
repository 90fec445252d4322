//! Authenticated API client handed to concrete service implementations

use cloudctl_plugin_api::{CliConfig, Credentials, ServiceError};

/// Client for the cloud API, built from the active context.
///
/// Missing or expired credentials do not prevent construction; every call
/// that needs them fails with `Unauthorized` instead.
#[derive(Debug, Clone, Default)]
pub struct ApiClient {
    endpoint: Option<String>,
    credentials: Option<Credentials>,
}

impl ApiClient {
    pub fn new(endpoint: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            credentials: Some(credentials),
        }
    }

    /// Client with no credentials at all
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CliConfig) -> Self {
        match &config.context {
            Some(ctx) => Self {
                endpoint: Some(ctx.endpoint.clone()),
                credentials: ctx.credentials.clone(),
            },
            None => Self::anonymous(),
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Credentials valid right now
    pub fn authorize(&self) -> Result<&Credentials, ServiceError> {
        let creds = self.credentials.as_ref().ok_or_else(|| {
            ServiceError::unauthorized("no credentials in the active context; log in first")
        })?;

        if creds.is_expired() {
            let at = creds.expires_at.map(|at| at.to_rfc3339()).unwrap_or_default();
            return Err(ServiceError::unauthorized(format!(
                "credentials expired at {}; log in again",
                at
            )));
        }
        Ok(creds)
    }

    /// API key of the authenticated principal
    pub fn principal(&self) -> Result<String, ServiceError> {
        Ok(self.authorize()?.api_key.clone())
    }
}
