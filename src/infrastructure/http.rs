use crate::types::{ErrorRecord, FALLBACK_PATH, Result};

/// Stateless HTTP fallback to the collector.
///
/// One POST per record, fire-and-forget: the response status is inspected for
/// logging only and never drives a retry. This path runs alongside the
/// persistent channel for records that could not be confirmed sent, which
/// makes overall delivery at-least-once; the collector tolerates duplicates.
pub struct FallbackPoster {
    endpoint: String,
    client: reqwest::Client,
}

impl FallbackPoster {
    /// `base_endpoint` is the collector origin, e.g. `http://host:3000`.
    pub fn new(base_endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: base_endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Posts one record to the collector's fallback endpoint.
    pub async fn post(&self, record: &ErrorRecord) -> Result<()> {
        let url = format!("{}{}", self.endpoint, FALLBACK_PATH);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(record)
            .send()
            .await?;

        if response.status().is_success() {
            tracing::debug!("Fallback delivery accepted: {}", record.message);
        } else {
            tracing::warn!(
                "Fallback delivery for '{}' returned status {}",
                record.message,
                response.status()
            );
        }
        Ok(())
    }
}

/// Converts the configured collector endpoint to its WebSocket counterpart.
pub fn http_to_ws_endpoint(endpoint: &str) -> String {
    endpoint
        .replace("http://", "ws://")
        .replace("https://", "wss://")
}

/// Converts a WebSocket endpoint back to its HTTP origin (fallback base).
pub fn ws_to_http_endpoint(ws_endpoint: &str) -> String {
    ws_endpoint
        .replace("ws://", "http://")
        .replace("wss://", "https://")
        .split('?')
        .next()
        .unwrap_or(ws_endpoint)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_conversion() {
        assert_eq!(http_to_ws_endpoint("http://host:3000"), "ws://host:3000");
        assert_eq!(http_to_ws_endpoint("https://host"), "wss://host");
        assert_eq!(
            ws_to_http_endpoint("wss://host/socket?token=x"),
            "https://host/socket"
        );
    }
}
