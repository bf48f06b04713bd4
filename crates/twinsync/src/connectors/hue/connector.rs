use std::collections::HashSet;

use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use super::ids;
use super::models;
use crate::asset::Asset;
use crate::asset::AssetChange;
use crate::asset::AssetChangeEvent;
use crate::asset::AssetKind;
use crate::asset::AssetSnapshot;
use crate::asset::ChangeKind;
use crate::connectors::Connector;
use crate::connectors::Existing;
use crate::graph::Edge;
use crate::graph::GraphOperation;
use crate::graph::ModelCatalog;
use crate::graph::Node;
use crate::graph::PatchOp;

/// Sensor types that have no node of their own.
const SKIPPED_SENSOR_TYPES: &[&str] = &["Daylight", "ZLLSwitch"];

/// Descriptive fields collected into a light's `metadata` map.
const METADATA_KEYS: &[&str] = &[
    "name",
    "type",
    "modelid",
    "manufacturername",
    "productname",
    "uniqueid",
    "swversion",
    "swconfigid",
    "productid",
    "status",
];

const HAS_SENSOR: &str = "hasSensor";

/// The channels of a Hue motion sensor, in the order they are mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Presence,
    LightLevel,
    Temperature,
}

impl Channel {
    const ALL: [Channel; 3] = [Channel::Presence, Channel::LightLevel, Channel::Temperature];

    fn from_type_name(type_name: &str) -> Option<Self> {
        match type_name {
            "ZLLPresence" => Some(Channel::Presence),
            "ZLLLightLevel" => Some(Channel::LightLevel),
            "ZLLTemperature" => Some(Channel::Temperature),
            _ => None,
        }
    }

    fn model_id(self) -> &'static str {
        match self {
            Channel::Presence => models::PRESENCE_SENSOR,
            Channel::LightLevel => models::LIGHT_LEVEL_SENSOR,
            Channel::Temperature => models::TEMPERATURE_SENSOR,
        }
    }
}

/// The sensors of one physical unit.
struct SensorGroup<'a> {
    prefix: String,
    /// First member seen; describes the device as a whole
    representative: &'a Asset,
    channels: [Option<&'a Asset>; 3],
}

/// Group sensors by hardware prefix, in order of first appearance.
fn group_sensors(sensors: &[Asset]) -> Vec<SensorGroup<'_>> {
    let mut groups: Vec<SensorGroup<'_>> = Vec::new();

    for sensor in sensors {
        if SKIPPED_SENSOR_TYPES.contains(&sensor.type_name.as_str()) {
            debug!(id = %sensor.id, "Skipping {} sensor {:?}", sensor.type_name, sensor.name);
            continue;
        }
        let Some(prefix) = sensor.unique_id().and_then(ids::device_prefix) else {
            debug!(id = %sensor.id, "Sensor has no grouping unique id, dropping");
            continue;
        };

        let index = match groups.iter().position(|g| g.prefix == prefix) {
            Some(index) => index,
            None => {
                groups.push(SensorGroup {
                    prefix,
                    representative: sensor,
                    channels: [None; 3],
                });
                groups.len() - 1
            }
        };

        if let Some(channel) = Channel::from_type_name(&sensor.type_name) {
            let slot = &mut groups[index].channels[channel as usize];
            if slot.is_none() {
                *slot = Some(sensor);
            }
        }
    }

    groups
}

/// Maps Hue bridge observations onto the `dtmi:com:yzzx` catalog.
pub struct HueConnector {
    catalog: ModelCatalog,
    /// Properties a change may patch on any logical sensor
    sensor_properties: HashSet<String>,
}

impl Default for HueConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl HueConnector {
    pub fn new() -> Self {
        let catalog = models::catalog();
        let sensor_properties = Channel::ALL
            .iter()
            .flat_map(|c| catalog.properties(c.model_id()))
            .map(|(name, _)| name.to_string())
            .collect();
        Self {
            catalog,
            sensor_properties,
        }
    }

    /// Copy the properties `model_id` declares (inherited ones included)
    /// from `source`. A map-typed `metadata` property is filled with the
    /// descriptive fields, as strings.
    fn filter_properties(&self, model_id: &str, source: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, schema) in self.catalog.properties(model_id) {
            if name == "metadata" && schema.is_map() {
                let metadata: Map<String, Value> = METADATA_KEYS
                    .iter()
                    .filter_map(|key| match source.get(*key) {
                        None | Some(Value::Null) => None,
                        Some(Value::String(s)) => Some((key.to_string(), Value::String(s.clone()))),
                        Some(other) => Some((key.to_string(), Value::String(other.to_string()))),
                    })
                    .collect();
                out.insert(name.to_string(), Value::Object(metadata));
                continue;
            }
            if let Some(value) = source.get(name) {
                out.insert(name.to_string(), value.clone());
            }
        }
        out
    }

    fn upsert(&self, id: String, model_id: &str, source: &Map<String, Value>) -> GraphOperation {
        GraphOperation::UpsertNode(Node {
            id,
            model_id: model_id.to_string(),
            properties: self.filter_properties(model_id, source),
        })
    }

    fn device_source(group: &SensorGroup<'_>) -> Map<String, Value> {
        let device = group.representative;
        let mut source = Map::new();
        source.insert("name".to_string(), json!(device.name));
        source.insert("uniqueid".to_string(), json!(group.prefix));
        for key in ["modelid", "manufacturername", "productname", "swversion"] {
            if let Some(value) = device.attributes.get(key) {
                source.insert(key.to_string(), value.clone());
            }
        }
        if let Some(battery) = device.attributes.get("config").and_then(|c| c.get("battery")) {
            source.insert("battery".to_string(), battery.clone());
        }
        source
    }

    fn declares(&self, kind: AssetKind, property: &str) -> bool {
        match kind {
            AssetKind::Light => self
                .catalog
                .properties(models::HUE_LIGHT)
                .iter()
                .any(|(name, schema)| *name == property && !schema.is_map()),
            AssetKind::Sensor => self.sensor_properties.contains(property),
        }
    }

    /// False when the change describes a sensor that never gets a node of
    /// its own. Records without a description are assumed mappable.
    fn has_node(change: &AssetChange) -> bool {
        if change.kind != AssetKind::Sensor {
            return true;
        }
        let Some(type_name) = &change.asset_type else {
            return true;
        };
        Channel::from_type_name(type_name).is_some()
            && change
                .unique_id
                .as_deref()
                .and_then(ids::device_prefix)
                .is_some()
    }

    fn map_change(&self, change: &AssetChange) -> Option<GraphOperation> {
        let id = ids::node_id(change.kind, &change.id);
        if !Self::has_node(change) {
            debug!(
                node = %id,
                "Skipping change for {} sensor without a node",
                change.asset_type.as_deref().unwrap_or("unknown")
            );
            return None;
        }

        match change.change {
            ChangeKind::Updated => {
                let mut patch = Vec::with_capacity(change.properties.len());
                for property in &change.properties {
                    if !self.declares(change.kind, &property.property) {
                        debug!(node = %id, "Dropping undeclared property {}", property.property);
                        continue;
                    }
                    patch.push(match &property.new_value {
                        Some(value) => PatchOp::add(&property.property, value.clone()),
                        None => PatchOp::remove(&property.property),
                    });
                }
                if patch.is_empty() {
                    debug!(node = %id, "Change carries nothing to patch");
                    return None;
                }
                Some(GraphOperation::PatchNode { id, patch })
            }
            ChangeKind::Added => match change.kind {
                AssetKind::Light => {
                    let mut source = change.state.clone().unwrap_or_default();
                    if let Some(name) = &change.name {
                        source.insert("name".to_string(), json!(name));
                    }
                    Some(self.upsert(id, models::HUE_LIGHT, &source))
                }
                AssetKind::Sensor => {
                    debug!(node = %id, "Added sensor waits for the next snapshot to be grouped");
                    None
                }
            },
            ChangeKind::Removed => Some(GraphOperation::PatchNode {
                id,
                patch: vec![PatchOp::add("status", json!("removed"))],
            }),
        }
    }
}

impl Connector for HueConnector {
    fn key(&self) -> &'static str {
        "hue"
    }

    fn on_snapshot(
        &self,
        snapshot: &AssetSnapshot,
        existing: Existing<'_>,
    ) -> Vec<GraphOperation> {
        let mut ops = vec![GraphOperation::EnsureModels {
            models: self.catalog.models().to_vec(),
        }];
        let mut produced = HashSet::new();

        for light in &snapshot.lights {
            let id = ids::node_id(AssetKind::Light, &light.id);
            produced.insert(id.clone());
            ops.push(self.upsert(id, models::HUE_LIGHT, &light.merged()));
        }

        for group in group_sensors(&snapshot.sensors) {
            let device_id = ids::device_node_id(&group.prefix);
            produced.insert(device_id.clone());
            ops.push(self.upsert(
                device_id.clone(),
                models::MOTION_SENSOR_DEVICE,
                &Self::device_source(&group),
            ));

            for channel in Channel::ALL {
                let Some(sensor) = group.channels[channel as usize] else {
                    continue;
                };
                let id = ids::node_id(AssetKind::Sensor, &sensor.id);
                produced.insert(id.clone());
                ops.push(self.upsert(id.clone(), channel.model_id(), &sensor.merged()));
                ops.push(GraphOperation::UpsertEdge(Edge {
                    id: ids::edge_id(&device_id, HAS_SENSOR, &id),
                    name: HAS_SENSOR.to_string(),
                    source_node_id: device_id.clone(),
                    target_node_id: id,
                    properties: Map::new(),
                }));
            }
        }

        if let Some(node_ids) = existing.node_ids {
            for id in node_ids {
                if ids::owns_node_id(id) && !produced.contains(id) {
                    ops.push(GraphOperation::DeleteNode { id: id.clone() });
                }
            }
        }

        if let Some(model_ids) = existing.model_ids {
            let mut stale: Vec<(usize, &String)> = model_ids
                .iter()
                .filter(|id| !self.catalog.contains(id))
                .filter_map(|id| models::owned_family(id).map(|family| (family, id)))
                .collect();
            // Extenders before their bases.
            stale.sort_by(|a, b| b.0.cmp(&a.0));
            ops.extend(
                stale
                    .into_iter()
                    .map(|(_, id)| GraphOperation::DeleteModel { id: id.clone() }),
            );
        }

        ops
    }

    fn on_change(&self, event: &AssetChangeEvent) -> Vec<GraphOperation> {
        event
            .changes
            .iter()
            .filter(|change| {
                if change.id.is_empty() {
                    warn!("Skipping {} change without id", change.kind);
                    return false;
                }
                true
            })
            .filter_map(|change| self.map_change(change))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::PropertyChange;
    use crate::graph::summarize;

    fn snapshot(lights: Vec<Asset>, sensors: Vec<Asset>) -> AssetSnapshot {
        AssetSnapshot {
            timestamp: "2025-01-01T00:00:00Z".to_string(),
            lights,
            sensors,
        }
    }

    fn motion_channel(id: &str, type_name: &str, suffix: &str) -> Asset {
        Asset::new(id, format!("Hall {}", type_name), type_name)
            .with_attribute("uniqueid", format!("00:17:88:01:03:29:b5:a3-02-{}", suffix))
            .with_attribute("modelid", "SML001")
            .with_attribute("manufacturername", "Signify Netherlands B.V.")
            .with_attribute("productname", "Hue motion sensor")
            .with_attribute("swversion", "6.1.1.27575")
            .with_attribute("config", json!({"on": true, "battery": 90, "reachable": true}))
            .with_state("lastupdated", "2025-01-01T00:00:00")
    }

    fn motion_sensor() -> Vec<Asset> {
        vec![
            motion_channel("10", "ZLLPresence", "0406").with_state("presence", false),
            motion_channel("11", "ZLLLightLevel", "0400")
                .with_state("lightlevel", 9344)
                .with_state("dark", false)
                .with_state("daylight", true),
            motion_channel("12", "ZLLTemperature", "0402").with_state("temperature", 2150),
        ]
    }

    fn changes(changes: Vec<AssetChange>) -> AssetChangeEvent {
        AssetChangeEvent {
            timestamp: "2025-12-29T15:45:13.831Z".to_string(),
            changes,
        }
    }

    fn properties(op: &GraphOperation) -> &Map<String, Value> {
        match op {
            GraphOperation::UpsertNode(node) => &node.properties,
            other => panic!("expected UpsertNode, got {}", other),
        }
    }

    #[test]
    fn test_light_and_presence_sensor() {
        let snapshot = snapshot(
            vec![Asset::new("1", "", "").with_state("on", true)],
            vec![Asset::new("3", "Presence", "ZLLPresence")
                .with_attribute("uniqueid", "aa:bb-02-0406")
                .with_state("presence", true)],
        );

        let ops = HueConnector::new().on_snapshot(&snapshot, Existing::default());
        insta::assert_snapshot!(summarize(&ops), @"
        EnsureModels (7 models)
        UpsertNode hue-light-1 [dtmi:com:yzzx:HueLight;1] {metadata, on}
        UpsertNode hue-motion-device-aa-bb [dtmi:com:yzzx:HueMotionSensorDevice;1] {name, uniqueid}
        UpsertNode hue-sensor-3 [dtmi:com:yzzx:HuePresenceSensor;1] {name, presence, uniqueid}
        UpsertEdge hue-motion-device-aa-bb -hasSensor-> hue-sensor-3
        ");

        let GraphOperation::UpsertEdge(edge) = &ops[4] else {
            panic!("expected edge");
        };
        assert_eq!(edge.id, "hue-motion-device-aa-bb-hasSensor-hue-sensor-3");
    }

    #[test]
    fn test_snapshot_mapping_is_deterministic() {
        let mut sensors = motion_sensor();
        sensors.push(Asset::new("1", "Daylight", "Daylight"));
        let snapshot = snapshot(
            vec![
                Asset::new("1", "Desk", "Dimmable light").with_state("bri", 10),
                Asset::new("2", "Hall", "Extended color light").with_state("xy", json!([0.3, 0.3])),
            ],
            sensors,
        );

        let connector = HueConnector::new();
        assert_eq!(
            connector.on_snapshot(&snapshot, Existing::default()),
            connector.on_snapshot(&snapshot, Existing::default())
        );
    }

    #[test]
    fn test_node_id_ignores_state() {
        let connector = HueConnector::new();
        let a = connector.on_snapshot(
            &snapshot(vec![Asset::new("5", "Desk", "").with_state("on", true)], Vec::new()),
            Existing::default(),
        );
        let b = connector.on_snapshot(
            &snapshot(vec![Asset::new("5", "Desk", "").with_state("on", false)], Vec::new()),
            Existing::default(),
        );
        assert_eq!(a[1].target(), "hue-light-5");
        assert_eq!(a[1].target(), b[1].target());
        assert_ne!(a[1], b[1]);
    }

    #[test]
    fn test_motion_sensor_is_grouped() {
        let ops = HueConnector::new()
            .on_snapshot(&snapshot(Vec::new(), motion_sensor()), Existing::default());
        insta::assert_snapshot!(summarize(&ops), @"
        EnsureModels (7 models)
        UpsertNode hue-motion-device-00-17-88-01-03-29-b5-a3 [dtmi:com:yzzx:HueMotionSensorDevice;1] {battery, manufacturername, modelid, name, productname, swversion, uniqueid}
        UpsertNode hue-sensor-10 [dtmi:com:yzzx:HuePresenceSensor;1] {modelid, name, presence, swversion, uniqueid}
        UpsertEdge hue-motion-device-00-17-88-01-03-29-b5-a3 -hasSensor-> hue-sensor-10
        UpsertNode hue-sensor-11 [dtmi:com:yzzx:HueLightLevelSensor;1] {dark, daylight, lightlevel, modelid, name, swversion, uniqueid}
        UpsertEdge hue-motion-device-00-17-88-01-03-29-b5-a3 -hasSensor-> hue-sensor-11
        UpsertNode hue-sensor-12 [dtmi:com:yzzx:HueTemperatureSensor;1] {modelid, name, swversion, temperature, uniqueid}
        UpsertEdge hue-motion-device-00-17-88-01-03-29-b5-a3 -hasSensor-> hue-sensor-12
        ");

        let device = properties(&ops[1]);
        assert_eq!(device["uniqueid"], "00-17-88-01-03-29-b5-a3");
        assert_eq!(device["battery"], 90);
        assert_eq!(device["name"], "Hall ZLLPresence");

        let presence = properties(&ops[2]);
        assert_eq!(presence["uniqueid"], "00:17:88:01:03:29:b5:a3-02-0406");
        assert!(!presence.contains_key("lastupdated"));
    }

    #[test]
    fn test_skipped_and_ungroupable_sensors_are_dropped() {
        let sensors = vec![
            Asset::new("1", "Daylight", "Daylight").with_attribute("uniqueid", "aa-02-0406"),
            Asset::new("2", "Dimmer", "ZLLSwitch").with_attribute("uniqueid", "bb-02-fc00"),
            Asset::new("3", "Generic", "CLIPPresence"),
            Asset::new("4", "Other", "ZLLPresence").with_attribute("uniqueid", "cc-01-0406"),
        ];
        let ops = HueConnector::new()
            .on_snapshot(&snapshot(Vec::new(), sensors), Existing::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind(), "EnsureModels");
    }

    #[test]
    fn test_first_channel_of_a_kind_wins() {
        let sensors = vec![
            Asset::new("20", "First", "ZLLPresence").with_attribute("uniqueid", "dd-02-0406"),
            Asset::new("21", "Second", "ZLLPresence").with_attribute("uniqueid", "dd-02-0406"),
        ];
        let ops = HueConnector::new()
            .on_snapshot(&snapshot(Vec::new(), sensors), Existing::default());
        let targets: Vec<_> = ops.iter().map(GraphOperation::target).collect();
        assert_eq!(
            targets,
            vec![
                "models",
                "hue-motion-device-dd",
                "hue-sensor-20",
                "hue-motion-device-dd-hasSensor-hue-sensor-20",
            ]
        );
    }

    #[test]
    fn test_light_properties_are_filtered() {
        let light = Asset::new("7", "Desk", "Extended color light")
            .with_attribute("modelid", "LCT015")
            .with_attribute("swversion", "1.50.2_r30933")
            .with_attribute("capabilities", json!({"certified": true}))
            .with_state("on", true)
            .with_state("bri", 254)
            .with_state("alert", "none")
            .with_state("reachable", true)
            .with_state("lastupdated", "2025-01-01T00:00:00");

        let ops = HueConnector::new()
            .on_snapshot(&snapshot(vec![light], Vec::new()), Existing::default());
        let props = properties(&ops[1]);

        let keys: Vec<_> = props.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["bri", "metadata", "on", "reachable"]);
        assert_eq!(
            props["metadata"],
            json!({
                "name": "Desk",
                "type": "Extended color light",
                "modelid": "LCT015",
                "swversion": "1.50.2_r30933"
            })
        );
    }

    #[test]
    fn test_metadata_stringifies_values() {
        let light = Asset::new("7", "Desk", "").with_attribute("productid", 42);
        let ops = HueConnector::new()
            .on_snapshot(&snapshot(vec![light], Vec::new()), Existing::default());
        assert_eq!(properties(&ops[1])["metadata"]["productid"], "42");
    }

    #[test]
    fn test_stale_owned_nodes_are_deleted() {
        let snapshot = snapshot(vec![Asset::new("1", "Desk", "")], Vec::new());
        let existing = vec![
            "hue-light-1".to_string(),
            "hue-light-99".to_string(),
            "room-kitchen".to_string(),
            "hue-motion-device-zz".to_string(),
            "hue-sensor-4".to_string(),
        ];

        let ops = HueConnector::new().on_snapshot(
            &snapshot,
            Existing {
                node_ids: Some(&existing),
                model_ids: None,
            },
        );

        let deleted: Vec<_> = ops
            .iter()
            .filter(|op| op.kind() == "DeleteNode")
            .map(GraphOperation::target)
            .collect();
        assert_eq!(deleted, vec!["hue-light-99", "hue-motion-device-zz", "hue-sensor-4"]);
        assert!(ops.iter().all(|op| op.kind() != "DeleteModel"));
    }

    #[test]
    fn test_stale_owned_models_are_deleted() {
        let existing = vec![
            "dtmi:com:yzzx:HueLight;1".to_string(),
            "dtmi:com:yzzx:HueLight;0".to_string(),
            "dtmi:com:yzzx:HueLogicalSensor;0".to_string(),
            "dtmi:com:yzzx:Room;0".to_string(),
            "dtmi:com:yzzx:HuePresenceSensor;0".to_string(),
            "dtmi:com:other:Thing;1".to_string(),
        ];

        let ops = HueConnector::new().on_snapshot(
            &snapshot(Vec::new(), Vec::new()),
            Existing {
                node_ids: None,
                model_ids: Some(&existing),
            },
        );

        let deleted: Vec<_> = ops[1..].iter().map(GraphOperation::target).collect();
        assert_eq!(
            deleted,
            vec![
                "dtmi:com:yzzx:HuePresenceSensor;0",
                "dtmi:com:yzzx:HueLogicalSensor;0",
                "dtmi:com:yzzx:HueLight;0",
            ]
        );
    }

    #[test]
    fn test_without_existing_ids_nothing_is_deleted() {
        let ops = HueConnector::new()
            .on_snapshot(&snapshot(Vec::new(), motion_sensor()), Existing::default());
        assert!(ops
            .iter()
            .all(|op| op.kind() != "DeleteNode" && op.kind() != "DeleteModel"));
    }

    #[test]
    fn test_sensor_change_patches_node() {
        let event: AssetChangeEvent = serde_json::from_value(json!({
            "timestamp": "2025-12-29T15:45:13.831Z",
            "changes": [{
                "type": "sensor",
                "id": "26",
                "properties": [{"property": "lightlevel", "oldValue": 9344, "newValue": 8485}]
            }]
        }))
        .unwrap();

        let ops = HueConnector::new().on_change(&event);
        assert_eq!(
            ops,
            vec![GraphOperation::PatchNode {
                id: "hue-sensor-26".to_string(),
                patch: vec![PatchOp::add("lightlevel", json!(8485))],
            }]
        );
    }

    #[test]
    fn test_changes_for_sensors_without_nodes_are_dropped() {
        let updated = |asset: &Asset| {
            let flip = PropertyChange::new("daylight", Some(json!(false)), Some(json!(true)));
            AssetChange::updated(
                AssetKind::Sensor,
                asset.id.clone(),
                asset.name.clone(),
                vec![flip],
            )
            .describing(asset)
        };

        let daylight = Asset::new("1", "Daylight", "Daylight");
        let switch = Asset::new("2", "Dimmer", "ZLLSwitch")
            .with_attribute("uniqueid", "cc:dd-02-0406");
        let loose = Asset::new("5", "Loose", "ZLLLightLevel")
            .with_attribute("uniqueid", "no-channel-suffix");
        let grouped = Asset::new("11", "Hall", "ZLLLightLevel")
            .with_attribute("uniqueid", "aa:bb-02-0400");

        let event = changes(vec![
            updated(&daylight),
            updated(&switch),
            updated(&loose),
            AssetChange::removed(AssetKind::Sensor, "1".to_string(), "Daylight".to_string())
                .describing(&daylight),
            updated(&grouped),
        ]);

        let ops = HueConnector::new().on_change(&event);
        insta::assert_snapshot!(summarize(&ops), @"PatchNode hue-sensor-11 [add /daylight true]");
    }

    #[test]
    fn test_light_change_add_and_remove() {
        let event = changes(vec![AssetChange::updated(
            AssetKind::Light,
            "4".to_string(),
            "Porch".to_string(),
            vec![
                PropertyChange::new("bri", Some(json!(10)), Some(json!(200))),
                PropertyChange::new("ct", Some(json!(366)), None),
                PropertyChange::new("alert", Some(json!("none")), Some(json!("select"))),
            ],
        )]);

        let ops = HueConnector::new().on_change(&event);
        insta::assert_snapshot!(
            summarize(&ops),
            @"PatchNode hue-light-4 [add /bri 200; remove /ct]"
        );
    }

    #[test]
    fn test_lifecycle_changes() {
        let mut state = Map::new();
        state.insert("on".to_string(), json!(true));
        state.insert("bri".to_string(), json!(100));

        let event = changes(vec![
            AssetChange::added(AssetKind::Light, "8".to_string(), "Shed".to_string(), state),
            AssetChange::added(AssetKind::Sensor, "30".to_string(), "New".to_string(), Map::new()),
            AssetChange::removed(AssetKind::Sensor, "12".to_string(), "Old".to_string()),
            AssetChange::removed(AssetKind::Light, String::new(), "Nameless".to_string()),
        ]);

        let ops = HueConnector::new().on_change(&event);
        insta::assert_snapshot!(summarize(&ops), @r#"
        UpsertNode hue-light-8 [dtmi:com:yzzx:HueLight;1] {bri, metadata, on}
        PatchNode hue-sensor-12 [add /status "removed"]
        "#);

        assert_eq!(properties(&ops[0])["metadata"], json!({"name": "Shed"}));
    }
}
