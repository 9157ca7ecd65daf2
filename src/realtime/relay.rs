use crate::config::RealtimeConfig;
use crate::error::FrontdeskError;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Short-lived credential for flows where the browser talks to the speech
/// endpoint directly.
#[derive(Debug, Clone, Serialize)]
pub struct EphemeralCredential {
    pub token: String,
    pub expires_at: i64,
    pub remote_session_id: String,
}

/// Proxy for the offer/answer exchange with the speech endpoint.
///
/// Each call is a single atomic request with service credentials attached;
/// nothing is cached and nothing is retried — negotiation is not idempotent
/// against a stateful remote session.
#[derive(Clone)]
pub struct NegotiationRelay {
    client: reqwest::Client,
    config: RealtimeConfig,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteSessionResponse {
    id: String,
    client_secret: ClientSecret,
}

#[derive(Debug, Deserialize)]
struct ClientSecret {
    value: String,
    expires_at: i64,
}

impl NegotiationRelay {
    pub fn new(config: RealtimeConfig, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            api_key,
        }
    }

    pub fn default_model(&self) -> &str {
        &self.config.model
    }

    fn api_key(&self) -> Result<&str, FrontdeskError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| FrontdeskError::Misconfigured("OPENAI_API_KEY is not set".to_string()))
    }

    /// Forward a session-description offer and return the remote's answer
    /// verbatim.
    pub async fn negotiate(&self, offer_sdp: &str, model: &str) -> Result<String, FrontdeskError> {
        let api_key = self.api_key()?;
        let url = format!("{}/realtime?model={}", self.config.api_base, model);

        info!("Forwarding SDP offer to speech endpoint (model={})", model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/sdp")
            .body(offer_sdp.to_string())
            .send()
            .await
            .map_err(|e| FrontdeskError::Upstream {
                status: 0,
                body: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!("Negotiation failed: {} {}", status, body);
            return Err(FrontdeskError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    /// Issue a short-lived scoped credential from the speech endpoint.
    pub async fn issue_credential(&self) -> Result<EphemeralCredential, FrontdeskError> {
        let api_key = self.api_key()?;
        let url = format!("{}/realtime/sessions", self.config.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&serde_json::json!({
                "model": self.config.model,
                "voice": self.config.voice,
            }))
            .send()
            .await
            .map_err(|e| FrontdeskError::Upstream {
                status: 0,
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Credential issuance failed: {} {}", status, body);
            return Err(FrontdeskError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let remote: RemoteSessionResponse =
            response.json().await.map_err(|e| FrontdeskError::Upstream {
                status: status.as_u16(),
                body: format!("malformed credential response: {}", e),
            })?;

        Ok(EphemeralCredential {
            token: remote.client_secret.value,
            expires_at: remote.client_secret.expires_at,
            remote_session_id: remote.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        let relay = NegotiationRelay::new(RealtimeConfig::default(), None);

        let err = relay.negotiate("v=0", "gpt-4o-realtime-preview-2024-10-01")
            .await
            .unwrap_err();
        assert!(matches!(err, FrontdeskError::Misconfigured(_)));

        let err = relay.issue_credential().await.unwrap_err();
        assert!(matches!(err, FrontdeskError::Misconfigured(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_surfaces_as_upstream_error() {
        let config = RealtimeConfig {
            api_base: "http://127.0.0.1:1/v1".to_string(),
            ..RealtimeConfig::default()
        };
        let relay = NegotiationRelay::new(config, Some("sk-test".to_string()));

        let err = relay.negotiate("v=0", "gpt-4o-realtime-preview-2024-10-01")
            .await
            .unwrap_err();
        assert!(matches!(err, FrontdeskError::Upstream { status: 0, .. }));
    }
}
