//! Node types - the shape shared by content and media items
//!
//! Both trees hold the same kind of record: an integer identity, a nullable
//! parent (null = root), a display name, a type alias and a bag of typed fields.
//! Media items additionally use the [`FILE_FIELD`] field to point at a stored
//! binary payload.

use serde::{Deserialize, Serialize};

/// Identity of a node within its tree.
pub type NodeId = i64;

/// Type alias of media folders.
pub const FOLDER_TYPE: &str = "Folder";

/// Field alias holding the storage path of a media item's binary payload.
pub const FILE_FIELD: &str = "file";

/// Editor kind used for the binary payload field.
pub const FILE_EDITOR: &str = "FileUpload";

/// A typed field on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field alias, unique within a node
    pub alias: String,
    /// Editor kind the field was declared with (drives extractor lookup)
    pub editor: String,
    /// Raw stored value
    #[serde(default)]
    pub value: Option<String>,
}

impl Field {
    pub fn new(alias: impl Into<String>, editor: impl Into<String>, value: Option<String>) -> Self {
        Self {
            alias: alias.into(),
            editor: editor.into(),
            value,
        }
    }

    /// Value as a string slice, treating blank values as absent.
    pub fn non_empty_value(&self) -> Option<&str> {
        self.value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// A persisted content or media node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub name: String,
    pub type_alias: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub trashed: bool,
    #[serde(default)]
    pub published: bool,
}

impl Node {
    /// Look up a field by alias
    pub fn field(&self, alias: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.alias == alias)
    }

    /// Non-empty value of a field, if present
    pub fn field_value(&self, alias: &str) -> Option<&str> {
        self.field(alias).and_then(Field::non_empty_value)
    }

    /// Set (or add) a field value, keeping the declared editor if the field exists
    pub fn set_field(&mut self, alias: &str, editor: &str, value: Option<String>) {
        match self.fields.iter_mut().find(|f| f.alias == alias) {
            Some(field) => field.value = value,
            None => self.fields.push(Field::new(alias, editor, value)),
        }
    }

    /// Whether this node is a media folder
    pub fn is_folder(&self) -> bool {
        self.type_alias.eq_ignore_ascii_case(FOLDER_TYPE)
    }

    /// Storage path of the binary payload, if the node carries one
    pub fn file_path(&self) -> Option<&str> {
        self.field_value(FILE_FIELD)
    }
}

/// A node that has been created but not yet persisted, so it has no identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDraft {
    pub parent_id: Option<NodeId>,
    pub name: String,
    pub type_alias: String,
    pub fields: Vec<Field>,
}

impl NodeDraft {
    pub fn new(name: impl Into<String>, parent_id: Option<NodeId>, type_alias: impl Into<String>) -> Self {
        Self {
            parent_id,
            name: name.into(),
            type_alias: type_alias.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style field addition
    pub fn with_field(mut self, alias: &str, editor: &str, value: impl Into<String>) -> Self {
        self.set_field(alias, editor, Some(value.into()));
        self
    }

    pub fn set_field(&mut self, alias: &str, editor: &str, value: Option<String>) {
        match self.fields.iter_mut().find(|f| f.alias == alias) {
            Some(field) => field.value = value,
            None => self.fields.push(Field::new(alias, editor, value)),
        }
    }

    /// Turn the draft into a node once the store has assigned an identity
    pub fn into_node(self, id: NodeId) -> Node {
        Node {
            id,
            parent_id: self.parent_id,
            name: self.name,
            type_alias: self.type_alias,
            fields: self.fields,
            trashed: false,
            published: false,
        }
    }
}

/// Base name of a stored file path (the part after the last `/`).
pub fn file_base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
