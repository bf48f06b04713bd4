//! DTDL catalog of the Hue connector.

use crate::graph::GraphModel;
use crate::graph::ModelCatalog;
use crate::graph::Primitive;
use crate::graph::Schema;

pub const ROOM: &str = "dtmi:com:yzzx:Room;1";
pub const HUE_LIGHT: &str = "dtmi:com:yzzx:HueLight;1";
pub const LOGICAL_SENSOR: &str = "dtmi:com:yzzx:HueLogicalSensor;1";
pub const PRESENCE_SENSOR: &str = "dtmi:com:yzzx:HuePresenceSensor;1";
pub const LIGHT_LEVEL_SENSOR: &str = "dtmi:com:yzzx:HueLightLevelSensor;1";
pub const TEMPERATURE_SENSOR: &str = "dtmi:com:yzzx:HueTemperatureSensor;1";
pub const MOTION_SENSOR_DEVICE: &str = "dtmi:com:yzzx:HueMotionSensorDevice;1";

/// Unversioned ids of the models this connector owns, bases first.
///
/// Rooms are shared with other sources and never deleted from here.
pub const OWNED_FAMILIES: &[&str] = &[
    "dtmi:com:yzzx:HueLight",
    "dtmi:com:yzzx:HueLogicalSensor",
    "dtmi:com:yzzx:HuePresenceSensor",
    "dtmi:com:yzzx:HueLightLevelSensor",
    "dtmi:com:yzzx:HueTemperatureSensor",
    "dtmi:com:yzzx:HueMotionSensorDevice",
];

/// Position of a model id's family in `OWNED_FAMILIES`, if it is one of ours.
pub fn owned_family(model_id: &str) -> Option<usize> {
    let family = model_id.split_once(';').map_or(model_id, |(f, _)| f);
    OWNED_FAMILIES.iter().position(|f| *f == family)
}

pub fn catalog() -> ModelCatalog {
    ModelCatalog::new(vec![
        GraphModel::interface(ROOM, "Room")
            .property("id", Primitive::String)
            .property("name", Primitive::String),
        GraphModel::interface(HUE_LIGHT, "HueLight")
            .property("on", Primitive::Boolean)
            .property("bri", Primitive::Integer)
            .property("hue", Primitive::Integer)
            .property("sat", Primitive::Integer)
            .property("ct", Primitive::Integer)
            .property("xy", Schema::array_of(Primitive::Double))
            .property("colormode", Primitive::String)
            .property("reachable", Primitive::Boolean)
            .property("status", Primitive::String)
            .property("metadata", Schema::string_map())
            .writable_property("positionX", Primitive::Double)
            .writable_property("positionY", Primitive::Double)
            .relationship("locatedIn", ROOM),
        GraphModel::interface(LOGICAL_SENSOR, "HueLogicalSensor")
            .property("name", Primitive::String)
            .property("uniqueid", Primitive::String)
            .property("modelid", Primitive::String)
            .property("swversion", Primitive::String)
            .property("status", Primitive::String),
        GraphModel::interface(PRESENCE_SENSOR, "HuePresenceSensor")
            .extends(LOGICAL_SENSOR)
            .property("presence", Primitive::Boolean),
        GraphModel::interface(LIGHT_LEVEL_SENSOR, "HueLightLevelSensor")
            .extends(LOGICAL_SENSOR)
            .property("lightlevel", Primitive::Integer)
            .property("dark", Primitive::Boolean)
            .property("daylight", Primitive::Boolean),
        GraphModel::interface(TEMPERATURE_SENSOR, "HueTemperatureSensor")
            .extends(LOGICAL_SENSOR)
            // Hundredths of a degree Celsius, as the bridge reports it
            .property("temperature", Primitive::Integer),
        GraphModel::interface(MOTION_SENSOR_DEVICE, "HueMotionSensorDevice")
            .property("name", Primitive::String)
            .property("uniqueid", Primitive::String)
            .property("modelid", Primitive::String)
            .property("manufacturername", Primitive::String)
            .property("productname", Primitive::String)
            .property("swversion", Primitive::String)
            .property("battery", Primitive::Integer)
            .relationship("hasSensor", LOGICAL_SENSOR)
            .relationship("locatedIn", ROOM),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_model() {
        let catalog = catalog();
        let room: Vec<_> = catalog.properties(ROOM).into_iter().map(|(n, _)| n).collect();
        assert_eq!(room, vec!["id", "name"]);
    }

    #[test]
    fn test_located_in_targets_room() {
        let catalog = catalog();
        for id in [HUE_LIGHT, MOTION_SENSOR_DEVICE] {
            let model = catalog.get(id).unwrap();
            assert_eq!(model.relationship_target("locatedIn"), Some(ROOM));
        }
    }

    #[test]
    fn test_bases_precede_extenders() {
        let catalog = catalog();
        let ids: Vec<&str> = catalog.ids().collect();
        for (index, model) in catalog.models().iter().enumerate() {
            for base in &model.extends {
                let base_index = ids.iter().position(|id| id == base).unwrap();
                assert!(base_index < index, "{} comes after {}", base, model.id);
            }
        }
    }

    #[test]
    fn test_sensor_models_inherit_base_properties() {
        let catalog = catalog();
        let names: Vec<_> = catalog
            .properties(PRESENCE_SENSOR)
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(
            names,
            vec!["name", "uniqueid", "modelid", "swversion", "status", "presence"]
        );
    }

    #[test]
    fn test_owned_family() {
        assert_eq!(owned_family("dtmi:com:yzzx:HueLight;2"), Some(0));
        assert_eq!(owned_family("dtmi:com:yzzx:HueLightLevelSensor;1"), Some(3));
        assert_eq!(owned_family("dtmi:com:yzzx:Room;1"), None);
        assert_eq!(owned_family("dtmi:com:other:HueLight;1"), None);
        for id in catalog().ids().filter(|id| *id != ROOM) {
            assert!(owned_family(id).is_some(), "{} is not owned", id);
        }
    }
}
