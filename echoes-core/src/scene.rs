//! Illustrations: opaque bitmap references or declarative vector scenes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// A scene illustration.
///
/// Serialized untagged: a bitmap is a bare string, a vector scene an
/// object. This is also the persisted cache format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Illustration {
    /// Opaque bitmap reference, usually a `data:` URI.
    Bitmap(String),
    Vector(VectorScene),
}

impl Illustration {
    pub fn as_vector(&self) -> Option<&VectorScene> {
        match self {
            Self::Vector(scene) => Some(scene),
            Self::Bitmap(_) => None,
        }
    }

    pub fn as_bitmap(&self) -> Option<&str> {
        match self {
            Self::Bitmap(reference) => Some(reference),
            Self::Vector(_) => None,
        }
    }
}

/// A minimal declarative illustration built from primitive shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorScene {
    pub view_box: String,
    pub background_color: String,
    pub elements: Vec<VectorElement>,
}

/// One shape in a vector scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorElement {
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    /// Shape attributes in their original spelling (`cx`, `stroke-width`, ...).
    #[serde(flatten)]
    pub attributes: BTreeMap<String, AttrValue>,
}

/// The closed set of shapes a scene may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rect,
    Circle,
    Ellipse,
    Line,
    Polyline,
    Polygon,
    Path,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rect => "rect",
            Self::Circle => "circle",
            Self::Ellipse => "ellipse",
            Self::Line => "line",
            Self::Polyline => "polyline",
            Self::Polygon => "polygon",
            Self::Path => "path",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "rect" => Self::Rect,
            "circle" => Self::Circle,
            "ellipse" => Self::Ellipse,
            "line" => Self::Line,
            "polyline" => Self::Polyline,
            "polygon" => Self::Polygon,
            "path" => Self::Path,
            _ => return None,
        })
    }
}

/// A shape attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Number(Number),
    Text(String),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl VectorScene {
    pub fn new(view_box: impl Into<String>, background_color: impl Into<String>) -> Self {
        Self {
            view_box: view_box.into(),
            background_color: background_color.into(),
            elements: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: VectorElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Validate untrusted JSON and build a scene from it.
    ///
    /// `viewBox` and `backgroundColor` must be non-empty strings and
    /// `elements` an array of objects whose `type` is a known shape and
    /// whose other attributes are strings or numbers.
    pub fn from_json(value: &Value) -> Result<Self, InvalidScene> {
        let object = value
            .as_object()
            .ok_or_else(|| InvalidScene("scene is not a JSON object".to_string()))?;

        let view_box = required_text(object, "viewBox")?;
        let background_color = required_text(object, "backgroundColor")?;
        let elements = object
            .get("elements")
            .and_then(Value::as_array)
            .ok_or_else(|| InvalidScene("'elements' is missing or not an array".to_string()))?
            .iter()
            .enumerate()
            .map(|(index, element)| parse_element(index, element))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            view_box,
            background_color,
            elements,
        })
    }
}

impl VectorElement {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Why a vector scene failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvalidScene(pub String);

fn required_text(object: &Map<String, Value>, field: &str) -> Result<String, InvalidScene> {
    match object.get(field) {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.clone()),
        Some(Value::String(_)) => Err(InvalidScene(format!("'{field}' is empty"))),
        Some(_) => Err(InvalidScene(format!("'{field}' is not a string"))),
        None => Err(InvalidScene(format!("'{field}' is missing"))),
    }
}

fn parse_element(index: usize, value: &Value) -> Result<VectorElement, InvalidScene> {
    let object = value
        .as_object()
        .ok_or_else(|| InvalidScene(format!("element {index} is not an object")))?;

    let kind = match object.get("type") {
        Some(Value::String(name)) => ShapeKind::from_name(name)
            .ok_or_else(|| InvalidScene(format!("element {index} has unknown type '{name}'")))?,
        _ => return Err(InvalidScene(format!("element {index} has no type"))),
    };

    let mut attributes = BTreeMap::new();
    for (name, value) in object {
        if name == "type" {
            continue;
        }
        let value = match value {
            Value::String(text) => AttrValue::Text(text.clone()),
            Value::Number(number) => AttrValue::Number(number.clone()),
            _ => {
                return Err(InvalidScene(format!(
                    "element {index} attribute '{name}' is not a string or number"
                )))
            }
        };
        attributes.insert(name.clone(), value);
    }

    Ok(VectorElement { kind, attributes })
}
