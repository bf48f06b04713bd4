use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use super::model::deserialize_string_or_int;
use super::model::Asset;
use super::model::AssetKind;

/// Lifecycle transition of one asset between two observations.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChangeKind {
    Added,
    /// Records without an explicit `change` field are property updates.
    #[default]
    Updated,
    Removed,
}

/// Keep `null` distinct from "absent": with `#[serde(default)]` an absent
/// field stays `None`, a present `null` becomes `Some(Value::Null)`.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// One property that differs between two observations of an asset.
///
/// `None` on either side means the property did not exist there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyChange {
    pub property: String,

    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub old_value: Option<Value>,

    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub new_value: Option<Value>,
}

impl PropertyChange {
    pub fn new(
        property: impl Into<String>,
        old_value: Option<Value>,
        new_value: Option<Value>,
    ) -> Self {
        Self {
            property: property.into(),
            old_value,
            new_value,
        }
    }
}

/// One change record per asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetChange {
    #[serde(rename = "type")]
    pub kind: AssetKind,

    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub change: ChangeKind,

    /// Gateway device type, e.g. `ZLLPresence`
    #[serde(default, rename = "assetType", skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,

    #[serde(default, rename = "uniqueid", skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    /// Full state of a newly added asset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyChange>,
}

impl AssetChange {
    pub fn added(kind: AssetKind, id: String, name: String, state: Map<String, Value>) -> Self {
        Self {
            kind,
            id,
            name: Some(name),
            change: ChangeKind::Added,
            asset_type: None,
            unique_id: None,
            state: Some(state),
            properties: Vec::new(),
        }
    }

    pub fn updated(
        kind: AssetKind,
        id: String,
        name: String,
        properties: Vec<PropertyChange>,
    ) -> Self {
        Self {
            kind,
            id,
            name: Some(name),
            change: ChangeKind::Updated,
            asset_type: None,
            unique_id: None,
            state: None,
            properties,
        }
    }

    pub fn removed(kind: AssetKind, id: String, name: String) -> Self {
        Self {
            kind,
            id,
            name: Some(name),
            change: ChangeKind::Removed,
            asset_type: None,
            unique_id: None,
            state: None,
            properties: Vec::new(),
        }
    }

    /// Record what kind of device `asset` is, so a consumer can tell which
    /// node the change belongs to without the full population.
    pub fn describing(mut self, asset: &Asset) -> Self {
        self.asset_type = Some(asset.type_name.clone());
        self.unique_id = asset.unique_id().map(str::to_string);
        self
    }
}

/// An incremental observation: every asset that changed since the last poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetChangeEvent {
    #[serde(default)]
    pub timestamp: String,

    pub changes: Vec<AssetChange>,
}
