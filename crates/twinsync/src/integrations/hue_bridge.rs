//! Observer over the Hue bridge v1 REST API.

use std::cmp::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::asset::Asset;
use crate::asset::Population;
use crate::config::BridgeConfig;
use crate::monitor::ObserveError;
use crate::monitor::Observer;

pub struct HueBridge {
    client: Client,
    base: String,
}

impl HueBridge {
    pub fn new(config: &BridgeConfig) -> Result<Self, ObserveError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ObserveError::Request(e.to_string()))?;

        let address = config.address.trim_end_matches('/');
        let base = if address.contains("://") {
            format!("{}/api/{}", address, config.username)
        } else {
            format!("http://{}/api/{}", address, config.username)
        };

        Ok(Self { client, base })
    }

    async fn fetch(&self, resource: &str) -> Result<Vec<Asset>, ObserveError> {
        let url = format!("{}/{}", self.base, resource);
        let body: Value = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ObserveError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| ObserveError::Malformed(e.to_string()))?;

        let assets = parse_resources(body)?;
        debug!(count = assets.len(), "Fetched {}", resource);
        Ok(assets)
    }
}

#[async_trait]
impl Observer for HueBridge {
    async fn observe(&self) -> Result<Population, ObserveError> {
        let lights = self.fetch("lights").await?;
        let sensors = self.fetch("sensors").await?;
        Ok(Population { lights, sensors })
    }
}

/// Numeric ids in numeric order, then anything else in string order.
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Turn an id-keyed resource object into an ordered asset list. The bridge
/// answers failed requests with an array of `{"error": {...}}` entries.
fn parse_resources(body: Value) -> Result<Vec<Asset>, ObserveError> {
    let resources = match body {
        Value::Object(resources) => resources,
        Value::Array(entries) => {
            let descriptions: Vec<String> = entries
                .iter()
                .filter_map(|entry| entry.get("error"))
                .map(|error| {
                    error
                        .get("description")
                        .and_then(Value::as_str)
                        .map_or_else(|| error.to_string(), str::to_string)
                })
                .collect();
            if descriptions.is_empty() {
                return Err(ObserveError::Malformed("unexpected array response".to_string()));
            }
            return Err(ObserveError::Gateway(descriptions.join("; ")));
        }
        other => {
            return Err(ObserveError::Malformed(format!(
                "expected an object, got {}",
                other
            )))
        }
    };

    let mut entries: Vec<(String, Value)> = resources.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| compare_ids(a, b));

    entries
        .into_iter()
        .map(|(id, value)| {
            let Value::Object(mut fields) = value else {
                return Err(ObserveError::Malformed(format!("resource {} is not an object", id)));
            };
            fields.insert("id".to_string(), Value::String(id.clone()));
            serde_json::from_value(Value::Object(fields))
                .map_err(|e| ObserveError::Malformed(format!("resource {}: {}", id, e)))
        })
        .collect()
}
