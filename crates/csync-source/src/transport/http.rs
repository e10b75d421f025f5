//! Blocking HTTP transport

use super::{Transport, parse_response, request_envelope};
use crate::{Error, Result};
use csync_binding::Element;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Connection settings for [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpTransportConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/content".to_string(),
            timeout_secs: 60,
            user_agent: format!("content-sync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Posts envelopes to the live server and waits for the reply.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(config: &HttpTransportConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn call(&self, request: &Element) -> Result<Element> {
        let method = request.local_name().to_string();
        let body = request_envelope(request)?;
        debug!(method = %method, url = %self.url, "Calling live server");

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", method.as_str())
            .body(body)
            .send()
            .map_err(Error::transport)?;
        let status = response.status();
        let text = response.text().map_err(Error::transport)?;

        // Fault envelopes arrive with an error status; anything else is a
        // transport failure.
        if !status.is_success() && !text.contains("Fault") {
            return Err(Error::transport(format!("HTTP {status} from {}", self.url)));
        }
        parse_response(&method, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_timeout() {
        let config = HttpTransportConfig::default();
        assert_eq!(config.timeout_secs, 60);
        assert!(config.user_agent.starts_with("content-sync/"));
    }

    #[test]
    fn unreachable_server_is_transport_error() {
        let config = HttpTransportConfig {
            url: "http://127.0.0.1:9/content".into(),
            timeout_secs: 2,
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        let err = transport.call(&Element::new("list")).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
