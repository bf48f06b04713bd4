//! Deterministic identities of Hue nodes and edges.
//!
//! Every id is a pure function of what the bridge reports, so mapping the
//! same device twice always addresses the same node.

use crate::asset::AssetKind;

pub const LIGHT_PREFIX: &str = "hue-light-";
pub const SENSOR_PREFIX: &str = "hue-sensor-";
pub const DEVICE_PREFIX: &str = "hue-motion-device-";

/// Unique-id suffixes of the channels of a Hue motion sensor: presence,
/// light level, temperature.
const CHANNEL_SUFFIXES: &[&str] = &["-02-0406", "-02-0400", "-02-0402"];

/// Characters allowed in a node id besides ASCII letters and digits.
const ALLOWED_PUNCTUATION: &str = "-.+%_#*?!(),=@$'";

pub fn node_id(kind: AssetKind, asset_id: &str) -> String {
    match kind {
        AssetKind::Light => format!("{}{}", LIGHT_PREFIX, asset_id),
        AssetKind::Sensor => format!("{}{}", SENSOR_PREFIX, asset_id),
    }
}

pub fn device_node_id(prefix: &str) -> String {
    format!("{}{}", DEVICE_PREFIX, prefix)
}

pub fn edge_id(source: &str, name: &str, target: &str) -> String {
    format!("{}-{}-{}", source, name, target)
}

/// Replace every character that may not appear in a node id with `-`.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || ALLOWED_PUNCTUATION.contains(c) {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Sanitized hardware prefix shared by the channels of one physical sensor,
/// e.g. `00:17:88:01:03:29:b5:a3-02-0406` gives `00-17-88-01-03-29-b5-a3`.
///
/// `None` if the unique id does not end in a known channel suffix.
pub fn device_prefix(unique_id: &str) -> Option<String> {
    CHANNEL_SUFFIXES
        .iter()
        .find_map(|suffix| unique_id.strip_suffix(suffix))
        .map(sanitize)
}

/// Whether a node id lies in the namespace this connector manages.
pub fn owns_node_id(id: &str) -> bool {
    [LIGHT_PREFIX, SENSOR_PREFIX, DEVICE_PREFIX]
        .iter()
        .any(|prefix| id.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ids() {
        assert_eq!(node_id(AssetKind::Light, "1"), "hue-light-1");
        assert_eq!(node_id(AssetKind::Sensor, "26"), "hue-sensor-26");
        assert_eq!(device_node_id("aa-bb"), "hue-motion-device-aa-bb");
        assert_eq!(
            edge_id("hue-motion-device-aa-bb", "hasSensor", "hue-sensor-3"),
            "hue-motion-device-aa-bb-hasSensor-hue-sensor-3"
        );
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("00:17:88:01"), "00-17-88-01");
        assert_eq!(sanitize("a.b+c%d_e#f*g?h!i(j)k,l=m@n$o'p"), "a.b+c%d_e#f*g?h!i(j)k,l=m@n$o'p");
        assert_eq!(sanitize("a b/c\\d~é"), "a-b-c-d--");
    }

    #[test]
    fn test_device_prefix() {
        assert_eq!(
            device_prefix("00:17:88:01:03:29:b5:a3-02-0406").as_deref(),
            Some("00-17-88-01-03-29-b5-a3")
        );
        assert_eq!(device_prefix("aa:bb-02-0400").as_deref(), Some("aa-bb"));
        assert_eq!(device_prefix("aa:bb-02-0402").as_deref(), Some("aa-bb"));
        assert_eq!(device_prefix("aa:bb-01-0406"), None);
        assert_eq!(device_prefix("aa:bb-02-0407"), None);
        assert_eq!(device_prefix("-02-0406").as_deref(), Some(""));
    }

    #[test]
    fn test_ownership() {
        assert!(owns_node_id("hue-light-4"));
        assert!(owns_node_id("hue-sensor-4"));
        assert!(owns_node_id("hue-motion-device-aa"));
        assert!(!owns_node_id("room-kitchen"));
        assert!(!owns_node_id("hue-bridge-1"));
    }
}
