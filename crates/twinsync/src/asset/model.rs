use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Deserialize an identifier that can be either a string or an integer.
///
/// Gateways key their resources by strings such as `"12"`, but events that
/// went through other tooling sometimes carry the same id as a JSON number.
/// Both forms map to the same asset.
pub(crate) fn deserialize_string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct StringOrInt;

    impl de::Visitor<'_> for StringOrInt {
        type Value = String;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("string or integer")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_string<E>(self, v: String) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(StringOrInt)
}

/// The two kinds of asset a gateway reports.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AssetKind {
    Light,
    Sensor,
}

/// One device as reported by the gateway.
///
/// `state` holds the device-reported values (on/off, brightness, presence,
/// ...). Everything else the gateway sends about the device (`uniqueid`,
/// `modelid`, `config`, ...) is kept verbatim in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Gateway type string, e.g. "Extended color light" or "ZLLPresence"
    #[serde(rename = "type", default)]
    pub type_name: String,

    #[serde(default, deserialize_with = "deserialize_state")]
    pub state: Map<String, Value>,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// A missing or `null` state is the same as an empty one.
fn deserialize_state<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Asset {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            type_name: type_name.into(),
            state: Map::new(),
            attributes: Map::new(),
        }
    }

    pub fn with_state(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.state.insert(key.to_string(), value.into());
        self
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Look up a descriptive attribute as a string slice.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Hardware unique id, if the gateway reports one.
    pub fn unique_id(&self) -> Option<&str> {
        self.attribute_str("uniqueid")
    }

    /// Flatten the asset into one object: identity, descriptive attributes,
    /// then state. State wins on key collisions.
    pub fn merged(&self) -> Map<String, Value> {
        let mut out = self.attributes.clone();
        out.insert("id".to_string(), Value::String(self.id.clone()));
        out.insert("name".to_string(), Value::String(self.name.clone()));
        out.insert("type".to_string(), Value::String(self.type_name.clone()));
        for (k, v) in &self.state {
            out.insert(k.clone(), v.clone());
        }
        out
    }
}

/// The full set of devices seen in one observation.
///
/// This is also the document the snapshot store persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Population {
    #[serde(default)]
    pub lights: Vec<Asset>,

    #[serde(default)]
    pub sensors: Vec<Asset>,
}

impl Population {
    pub fn len(&self) -> usize {
        self.lights.len() + self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty() && self.sensors.is_empty()
    }
}

/// A full population observation at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    #[serde(default)]
    pub timestamp: String,

    #[serde(default)]
    pub lights: Vec<Asset>,

    #[serde(default)]
    pub sensors: Vec<Asset>,
}

impl AssetSnapshot {
    pub fn new(timestamp: String, population: Population) -> Self {
        Self {
            timestamp,
            lights: population.lights,
            sensors: population.sensors,
        }
    }
}

/// Current UTC time in the format events carry, e.g.
/// `2025-12-29T15:45:13.831Z`.
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_accepts_numeric_id() {
        let asset: Asset = serde_json::from_str(r#"{"id": 12, "name": "Hall"}"#).unwrap();
        assert_eq!(asset.id, "12");
        assert_eq!(asset.name, "Hall");
        assert!(asset.state.is_empty());
    }

    #[test]
    fn test_asset_keeps_unknown_fields() {
        let json = r#"{
            "id": "10",
            "name": "Hall sensor",
            "type": "ZLLPresence",
            "uniqueid": "00:17:88:01:03:29:b5:a3-02-0406",
            "config": {"battery": 90, "on": true},
            "state": {"presence": false, "lastupdated": "2025-01-01T00:00:00"}
        }"#;
        let asset: Asset = serde_json::from_str(json).unwrap();
        assert_eq!(asset.type_name, "ZLLPresence");
        assert_eq!(asset.unique_id(), Some("00:17:88:01:03:29:b5:a3-02-0406"));
        assert_eq!(asset.attributes["config"]["battery"], 90);
        assert_eq!(asset.state["presence"], false);

        let back = serde_json::to_value(&asset).unwrap();
        assert_eq!(back["uniqueid"], "00:17:88:01:03:29:b5:a3-02-0406");
        assert_eq!(back["type"], "ZLLPresence");
    }

    #[test]
    fn test_null_state_is_empty() {
        let asset: Asset = serde_json::from_str(r#"{"id": "1", "state": null}"#).unwrap();
        assert!(asset.state.is_empty());
    }

    #[test]
    fn test_merged_prefers_state() {
        let asset = Asset::new("1", "Desk", "Dimmable light")
            .with_attribute("modelid", "LWB010")
            .with_state("on", true)
            .with_state("name", "shadowed");
        let merged = asset.merged();
        assert_eq!(merged["modelid"], "LWB010");
        assert_eq!(merged["on"], true);
        assert_eq!(merged["name"], "shadowed");
        assert_eq!(merged["id"], "1");
    }

    #[test]
    fn test_asset_kind_names() {
        assert_eq!(AssetKind::Light.to_string(), "light");
        assert_eq!("sensor".parse::<AssetKind>().unwrap(), AssetKind::Sensor);
    }
}
