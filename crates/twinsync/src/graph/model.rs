//! DTDL v3 interface definitions.

use serde::Deserialize;
use serde::Serialize;

pub const DTDL_CONTEXT: &str = "dtmi:dtdl:context;3";

/// Primitive DTDL schemas used by the catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Primitive {
    Boolean,
    Integer,
    Double,
    String,
    DateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub name: String,
    pub schema: Primitive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum ComplexSchema {
    Map {
        #[serde(rename = "mapKey")]
        map_key: MapEntry,
        #[serde(rename = "mapValue")]
        map_value: MapEntry,
    },
    Array {
        #[serde(rename = "elementSchema")]
        element_schema: Primitive,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Schema {
    Primitive(Primitive),
    Complex(ComplexSchema),
}

impl Schema {
    /// `map<string, string>`
    pub fn string_map() -> Self {
        Schema::Complex(ComplexSchema::Map {
            map_key: MapEntry {
                name: "key".to_string(),
                schema: Primitive::String,
            },
            map_value: MapEntry {
                name: "value".to_string(),
                schema: Primitive::String,
            },
        })
    }

    pub fn array_of(element_schema: Primitive) -> Self {
        Schema::Complex(ComplexSchema::Array { element_schema })
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Schema::Complex(ComplexSchema::Map { .. }))
    }
}

impl From<Primitive> for Schema {
    fn from(p: Primitive) -> Self {
        Schema::Primitive(p)
    }
}

/// One entry of an interface's `contents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum Content {
    Property {
        name: String,
        schema: Schema,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        writable: bool,
    },
    Relationship {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
}

impl Content {
    pub fn name(&self) -> &str {
        match self {
            Content::Property { name, .. } | Content::Relationship { name, .. } => name,
        }
    }
}

/// `extends` may be written as a single id or a list of ids.
fn deserialize_one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(id) => vec![id],
        OneOrMany::Many(ids) => ids,
    })
}

/// A DTDL interface: the schema of one node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphModel {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@type")]
    pub type_name: String,

    #[serde(rename = "@context")]
    pub context: String,

    #[serde(rename = "displayName")]
    pub display_name: String,

    #[serde(
        default,
        deserialize_with = "deserialize_one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub extends: Vec<String>,

    #[serde(default)]
    pub contents: Vec<Content>,
}

impl GraphModel {
    pub fn interface(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: "Interface".to_string(),
            context: DTDL_CONTEXT.to_string(),
            display_name: display_name.into(),
            extends: Vec::new(),
            contents: Vec::new(),
        }
    }

    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.extends.push(base.into());
        self
    }

    pub fn property(mut self, name: &str, schema: impl Into<Schema>) -> Self {
        self.contents.push(Content::Property {
            name: name.to_string(),
            schema: schema.into(),
            writable: false,
        });
        self
    }

    pub fn writable_property(mut self, name: &str, schema: impl Into<Schema>) -> Self {
        self.contents.push(Content::Property {
            name: name.to_string(),
            schema: schema.into(),
            writable: true,
        });
        self
    }

    pub fn relationship(mut self, name: &str, target: &str) -> Self {
        self.contents.push(Content::Relationship {
            name: name.to_string(),
            target: Some(target.to_string()),
        });
        self
    }

    /// Properties declared directly on this interface.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Schema)> {
        self.contents.iter().filter_map(|c| match c {
            Content::Property { name, schema, .. } => Some((name.as_str(), schema)),
            Content::Relationship { .. } => None,
        })
    }

    pub fn relationship_target(&self, name: &str) -> Option<&str> {
        self.contents.iter().find_map(|c| match c {
            Content::Relationship { name: n, target } if n == name => target.as_deref(),
            _ => None,
        })
    }
}

/// An ordered, self-contained set of interfaces.
///
/// Bases come before the interfaces that extend them, which is also the order
/// a graph store needs to create them in.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCatalog {
    models: Vec<GraphModel>,
}

impl ModelCatalog {
    pub fn new(models: Vec<GraphModel>) -> Self {
        Self { models }
    }

    pub fn models(&self) -> &[GraphModel] {
        &self.models
    }

    pub fn get(&self, id: &str) -> Option<&GraphModel> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.id.as_str())
    }

    /// All properties of a model, inherited ones first.
    ///
    /// Bases outside this catalog contribute nothing. Each base is visited
    /// once, so a malformed cycle cannot loop.
    pub fn properties(&self, id: &str) -> Vec<(&str, &Schema)> {
        let mut visited = Vec::new();
        let mut out = Vec::new();
        self.collect_properties(id, &mut visited, &mut out);
        out
    }

    fn collect_properties<'a>(
        &'a self,
        id: &str,
        visited: &mut Vec<&'a str>,
        out: &mut Vec<(&'a str, &'a Schema)>,
    ) {
        let Some(model) = self.get(id) else {
            return;
        };
        if visited.contains(&model.id.as_str()) {
            return;
        }
        visited.push(&model.id);

        for base in &model.extends {
            self.collect_properties(base, visited, out);
        }
        for (name, schema) in model.properties() {
            if !out.iter().any(|(n, _)| *n == name) {
                out.push((name, schema));
            }
        }
    }
}
