//! Change detection between two observations of a device population.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;

use serde_json::Map;
use serde_json::Value;

use crate::asset::Asset;
use crate::asset::AssetChange;
use crate::asset::AssetKind;
use crate::asset::Population;
use crate::asset::PropertyChange;

/// State keys that change on every report without carrying meaning.
const IGNORED_KEYS: &[&str] = &["lastupdated"];

/// Compare two populations, lights first, then sensors.
pub fn diff_population(previous: &Population, current: &Population) -> Vec<AssetChange> {
    let mut changes = diff(AssetKind::Light, &previous.lights, &current.lights);
    changes.extend(diff(AssetKind::Sensor, &previous.sensors, &current.sensors));
    changes
}

/// Compare two lists of assets of one kind.
///
/// Added and updated records come out in `current` order, removed records in
/// `previous` order. If an id appears more than once in a list, only its
/// first occurrence counts.
pub fn diff(kind: AssetKind, previous: &[Asset], current: &[Asset]) -> Vec<AssetChange> {
    let previous_by_id = index_by_id(previous);
    let current_by_id = index_by_id(current);

    let mut changes = Vec::new();
    let mut seen = HashSet::new();

    for asset in current {
        if !seen.insert(asset.id.as_str()) {
            continue;
        }
        match previous_by_id.get(asset.id.as_str()) {
            None => changes.push(
                AssetChange::added(
                    kind,
                    asset.id.clone(),
                    asset.name.clone(),
                    asset.state.clone(),
                )
                .describing(asset),
            ),
            Some(prev) => {
                let properties = compare_states(&prev.state, &asset.state);
                if !properties.is_empty() {
                    changes.push(
                        AssetChange::updated(kind, asset.id.clone(), asset.name.clone(), properties)
                            .describing(asset),
                    );
                }
            }
        }
    }

    let mut seen = HashSet::new();
    for asset in previous {
        if !seen.insert(asset.id.as_str()) {
            continue;
        }
        if !current_by_id.contains_key(asset.id.as_str()) {
            changes.push(
                AssetChange::removed(kind, asset.id.clone(), asset.name.clone()).describing(asset),
            );
        }
    }

    changes
}

fn index_by_id(assets: &[Asset]) -> HashMap<&str, &Asset> {
    let mut map = HashMap::with_capacity(assets.len());
    for asset in assets {
        map.entry(asset.id.as_str()).or_insert(asset);
    }
    map
}

/// Property-level diff of two state objects, in key order.
pub fn compare_states(
    previous: &Map<String, Value>,
    current: &Map<String, Value>,
) -> Vec<PropertyChange> {
    let keys: BTreeSet<&String> = previous.keys().chain(current.keys()).collect();

    keys.into_iter()
        .filter(|key| !IGNORED_KEYS.contains(&key.as_str()))
        .filter_map(|key| {
            let old = previous.get(key);
            let new = current.get(key);
            let same = match (old, new) {
                (Some(a), Some(b)) => values_equal(a, b),
                (None, None) => true,
                _ => false,
            };
            (!same).then(|| PropertyChange::new(key.clone(), old.cloned(), new.cloned()))
        })
        .collect()
}

/// Structural equality as it would look once serialized: numbers compare by
/// value, so `1` and `1.0` are the same reading.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x.is_f64() || y.is_f64() {
                x.as_f64() == y.as_f64()
            } else {
                x == y
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::asset::ChangeKind;

    fn light(id: &str, on: bool, bri: u64) -> Asset {
        Asset::new(id, format!("Light {}", id), "Extended color light")
            .with_state("on", on)
            .with_state("bri", bri)
            .with_state("lastupdated", "2025-01-01T00:00:00")
    }

    fn population(lights: Vec<Asset>) -> Population {
        Population {
            lights,
            sensors: Vec::new(),
        }
    }

    #[test]
    fn test_identical_populations_have_no_changes() {
        let p = population(vec![light("1", true, 200), light("2", false, 0)]);
        assert!(diff_population(&p, &p).is_empty());
    }

    #[test]
    fn test_removed_asset() {
        let before = population(vec![
            light("1", true, 200),
            light("2", false, 0),
            light("3", true, 5),
        ]);
        let after = population(vec![light("1", true, 200), light("3", true, 5)]);

        let changes = diff_population(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, "2");
        assert_eq!(changes[0].change, ChangeKind::Removed);
        assert_eq!(changes[0].name.as_deref(), Some("Light 2"));
        assert_eq!(changes[0].asset_type.as_deref(), Some("Extended color light"));
    }

    #[test]
    fn test_added_asset_carries_state() {
        let before = population(vec![light("1", true, 200)]);
        let after = population(vec![light("1", true, 200), light("7", true, 10)]);

        let changes = diff_population(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change, ChangeKind::Added);
        assert_eq!(changes[0].state.as_ref().unwrap()["bri"], 10);
    }

    #[test]
    fn test_lastupdated_is_ignored() {
        let before = population(vec![light("1", true, 200)]);
        let mut moved = light("1", true, 200);
        moved
            .state
            .insert("lastupdated".to_string(), json!("2025-06-01T12:00:00"));
        let after = population(vec![moved]);

        assert!(diff_population(&before, &after).is_empty());
    }

    #[test]
    fn test_updated_lists_changed_properties() {
        let before = population(vec![light("1", true, 200)]);
        let after = population(vec![light("1", false, 120)]);

        let changes = diff_population(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change, ChangeKind::Updated);
        assert_eq!(
            changes[0].properties,
            vec![
                PropertyChange::new("bri", Some(json!(200)), Some(json!(120))),
                PropertyChange::new("on", Some(json!(true)), Some(json!(false))),
            ]
        );
    }

    #[test]
    fn test_property_missing_on_one_side() {
        let before = Map::new();
        let mut after = Map::new();
        after.insert("reachable".to_string(), json!(true));

        let changes = compare_states(&before, &after);
        assert_eq!(changes, vec![PropertyChange::new("reachable", None, Some(json!(true)))]);

        let changes = compare_states(&after, &before);
        assert_eq!(changes, vec![PropertyChange::new("reachable", Some(json!(true)), None)]);
    }

    #[test]
    fn test_null_is_a_value() {
        let mut before = Map::new();
        before.insert("ct".to_string(), Value::Null);
        let after = Map::new();

        let changes = compare_states(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old_value, Some(Value::Null));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        let mut before = Map::new();
        before.insert("xy".to_string(), json!([0.3, 1]));
        let mut after = Map::new();
        after.insert("xy".to_string(), json!([0.3, 1.0]));

        assert!(compare_states(&before, &after).is_empty());
    }

    #[test]
    fn test_order_follows_population() {
        let before = population(vec![light("9", true, 1), light("1", true, 1)]);
        let after = population(vec![light("3", true, 1), light("2", true, 1)]);

        let ids: Vec<_> = diff_population(&before, &after)
            .into_iter()
            .map(|c| (c.id, c.change))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("3".to_string(), ChangeKind::Added),
                ("2".to_string(), ChangeKind::Added),
                ("9".to_string(), ChangeKind::Removed),
                ("1".to_string(), ChangeKind::Removed),
            ]
        );
    }

    #[test]
    fn test_changes_describe_the_asset() {
        let sensor = |presence: bool| {
            Asset::new("10", "Presence", "ZLLPresence")
                .with_attribute("uniqueid", "aa:bb-02-0406")
                .with_state("presence", presence)
        };
        let before = Population {
            lights: Vec::new(),
            sensors: vec![sensor(false)],
        };
        let after = Population {
            lights: Vec::new(),
            sensors: vec![sensor(true)],
        };

        let changes = diff_population(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].asset_type.as_deref(), Some("ZLLPresence"));
        assert_eq!(changes[0].unique_id.as_deref(), Some("aa:bb-02-0406"));
    }

    #[test]
    fn test_sensors_follow_lights() {
        let before = Population::default();
        let after = Population {
            lights: vec![light("1", true, 1)],
            sensors: vec![Asset::new("10", "Presence", "ZLLPresence")],
        };

        let kinds: Vec<_> = diff_population(&before, &after)
            .into_iter()
            .map(|c| c.kind)
            .collect();
        assert_eq!(kinds, vec![AssetKind::Light, AssetKind::Sensor]);
    }
}
