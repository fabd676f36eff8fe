//! Relation types - typed, directed edges between content and media
//!
//! Two relation kinds are in use:
//! - `StructuralMirror`: content node → the media folder dedicated to it (1:1)
//! - `UsageLink`: content node → a media item referenced by its fields (1:N)

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The relation kinds the engine maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Content node → its mirrored media folder
    StructuralMirror,
    /// Content node → media item referenced from its fields
    UsageLink,
}

impl RelationKind {
    /// Alias used to identify the relation type in the store
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::StructuralMirror => "mediaSyncFolder",
            RelationKind::UsageLink => "mediaSyncUsage",
        }
    }

    pub fn all() -> &'static [RelationKind] {
        &[RelationKind::StructuralMirror, RelationKind::UsageLink]
    }

    /// The type definition that must exist before edges of this kind are created
    pub fn definition(&self) -> RelationType {
        match self {
            RelationKind::StructuralMirror => RelationType {
                alias: self.as_str().to_string(),
                name: "Content to mirrored media folder".to_string(),
                parent_object: ObjectType::Content,
                child_object: ObjectType::Media,
                bidirectional: false,
            },
            RelationKind::UsageLink => RelationType {
                alias: self.as_str().to_string(),
                name: "Content to media items it uses".to_string(),
                parent_object: ObjectType::Content,
                child_object: ObjectType::Media,
                bidirectional: false,
            },
        }
    }
}

impl FromStr for RelationKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mediasyncfolder" | "structural_mirror" | "mirror" | "folder" => Ok(RelationKind::StructuralMirror),
            "mediasyncusage" | "usage_link" | "usage" => Ok(RelationKind::UsageLink),
            _ => Err(crate::Error::UnknownRelationKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which tree a relation endpoint lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Content,
    Media,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Content => "content",
            ObjectType::Media => "media",
        }
    }
}

impl FromStr for ObjectType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "content" | "document" => Ok(ObjectType::Content),
            "media" => Ok(ObjectType::Media),
            _ => Err(crate::Error::UnknownRelationKind(format!("Unknown object type: {}", s))),
        }
    }
}

/// A relation type definition. Edges can only be created once their type exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationType {
    pub alias: String,
    pub name: String,
    pub parent_object: ObjectType,
    pub child_object: ObjectType,
    pub bidirectional: bool,
}

/// A persisted relation edge.
///
/// The store does not enforce uniqueness, so callers must be prepared for a
/// query that "should" return one edge to return zero or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Store-assigned identity, increasing in creation order
    pub id: i64,
    pub parent_id: NodeId,
    pub child_id: NodeId,
    pub kind: RelationKind,
}

impl Relation {
    pub fn is(&self, kind: RelationKind) -> bool {
        self.kind == kind
    }
}
