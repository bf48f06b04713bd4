//! Wire format of observation events.
//!
//! Producers publish either a full snapshot (`{timestamp, lights, sensors}`)
//! or a change event (`{timestamp, changes}`). Consumers classify by shape:
//! there is no explicit discriminator on the wire.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::change::AssetChange;
use super::change::AssetChangeEvent;
use super::model::AssetSnapshot;

/// Either a full population observation or an incremental one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AssetObservationEvent {
    Snapshot(AssetSnapshot),
    Changes(AssetChangeEvent),
}

/// Errors decoding an incoming event payload
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is neither a snapshot nor a change event")]
    Unrecognized,
}

impl AssetObservationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            AssetObservationEvent::Snapshot(_) => "snapshot",
            AssetObservationEvent::Changes(_) => "change",
        }
    }

    /// Decode and classify a raw payload.
    pub fn from_slice(payload: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(payload)?;
        Self::from_value(value)
    }

    /// Classify a JSON document by shape.
    ///
    /// An object with a `lights` or `sensors` array is a snapshot; an object
    /// with a `changes` array is a change event. Individual change records
    /// that fail to parse are logged and dropped so one bad record does not
    /// lose the rest of the batch.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let Value::Object(mut body) = value else {
            return Err(DecodeError::Unrecognized);
        };

        let is_array = |v: Option<&Value>| v.is_some_and(Value::is_array);

        if is_array(body.get("lights")) || is_array(body.get("sensors")) {
            let snapshot: AssetSnapshot = serde_json::from_value(Value::Object(body))?;
            return Ok(AssetObservationEvent::Snapshot(snapshot));
        }

        if let Some(Value::Array(raw)) = body.remove("changes") {
            let timestamp = body
                .get("timestamp")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            let mut changes = Vec::with_capacity(raw.len());
            for (index, record) in raw.into_iter().enumerate() {
                match serde_json::from_value::<AssetChange>(record) {
                    Ok(change) if change.id.is_empty() => {
                        warn!(index, "Skipping change record with empty id");
                    }
                    Ok(change) => changes.push(change),
                    Err(e) => {
                        warn!(index, error = %e, "Skipping malformed change record");
                    }
                }
            }

            return Ok(AssetObservationEvent::Changes(AssetChangeEvent {
                timestamp,
                changes,
            }));
        }

        Err(DecodeError::Unrecognized)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl From<AssetSnapshot> for AssetObservationEvent {
    fn from(snapshot: AssetSnapshot) -> Self {
        AssetObservationEvent::Snapshot(snapshot)
    }
}

impl From<AssetChangeEvent> for AssetObservationEvent {
    fn from(event: AssetChangeEvent) -> Self {
        AssetObservationEvent::Changes(event)
    }
}
