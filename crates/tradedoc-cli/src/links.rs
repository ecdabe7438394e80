//! Reference-link lookup against a configured HTTP search endpoint.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use tradedoc_core::error::LookupError;
use tradedoc_core::lookup::{self, LinkLookup, LookupOutcome};
use tradedoc_core::models::config::LinkConfig;

/// Keys holding a link in search responses, in preference order.
const LINK_KEYS: [&str; 3] = ["url", "link", "href"];

/// Blocking HTTP link lookup. Must not be called from async code.
pub struct HttpLinkLookup {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpLinkLookup {
    /// Lookup for the configured endpoint, `None` when no endpoint is set.
    pub fn from_config(config: &LinkConfig) -> anyhow::Result<Option<Self>> {
        let Some(endpoint) = &config.endpoint else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("tradedoc/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Some(Self {
            client,
            endpoint: endpoint.clone(),
            api_key: config.api_key.clone(),
        }))
    }
}

impl LinkLookup for HttpLinkLookup {
    fn lookup(&self, name: &str) -> lookup::Result<LookupOutcome<String>> {
        let mut request = self.client.get(&self.endpoint).query(&[("q", name)]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| LookupError::Service(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Service(format!("endpoint answered {}", status)));
        }

        let body: Value = response
            .json()
            .map_err(|e| LookupError::Service(format!("invalid response: {}", e)))?;

        let link = find_link(&body);
        debug!("Link for {:?}: {:?}", name, link);
        Ok(link.into())
    }
}

/// First http(s) link in a JSON response, searched depth-first in
/// document order.
fn find_link(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            for key in LINK_KEYS {
                if let Some(Value::String(s)) = map.get(key) {
                    if is_http(s) {
                        return Some(s.clone());
                    }
                }
            }
            map.values().find_map(find_link)
        }
        Value::Array(items) => items.iter().find_map(find_link),
        _ => None,
    }
}

fn is_http(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}
