use serde::{Deserialize, Serialize};

use crate::expr::Expr;

/// A named 2D profile declared by a sketch. Profile names are unique across
/// the whole part and conventionally start with `profile:`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchProfile {
    pub name: String,
    pub profile: Profile,
}

/// Closed 2D profile geometry. Coordinates are in the sketch plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Profile {
    Rect { width: Expr, height: Expr },
    Circle { radius: Expr },
    Polygon { points: Vec<[Expr; 2]> },
    Path { segments: Vec<PathSegment> },
}

/// One segment of a `Profile::Path`. The path starts at the first segment's
/// implied origin and must close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PathSegment {
    LineTo {
        to: [Expr; 2],
    },
    ArcTo {
        to: [Expr; 2],
        radius: Expr,
        #[serde(default)]
        clockwise: bool,
    },
}

/// Reference to a declared profile by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileRef(pub String);

impl ProfileRef {
    pub fn new(name: impl Into<String>) -> Self {
        ProfileRef(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}
