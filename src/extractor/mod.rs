//! Field Extractor Framework
//!
//! Each extractor reads the media ids referenced by one family of field
//! editors. The registry is built once from (editor kind → extractor names)
//! bindings; lookup is case-insensitive and fields no extractor handles are
//! skipped.

pub mod markup;
pub mod picker;

pub use markup::MarkupExtractor;
pub use picker::MediaPickerExtractor;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::node::{Field, Node, NodeId};
use crate::tree::TreeStore;
use crate::{Error, Result};

/// Binding name of the direct-reference picker extractor
pub const MEDIA_PICKER: &str = "media_picker";

/// Binding name of the markup-scanning extractor
pub const MARKUP: &str = "markup";

/// Reads referenced media ids out of field values.
pub trait MediaIdExtractor: Send + Sync {
    /// Name used in configuration bindings
    fn name(&self) -> &str;

    /// Editor kinds this extractor was bound to (upper-cased)
    fn editor_kinds(&self) -> &BTreeSet<String>;

    /// Check if this extractor reads fields of the given editor kind
    fn can_handle(&self, editor_kind: &str) -> bool {
        self.editor_kinds().contains(&editor_kind.to_uppercase())
    }

    /// Media ids referenced by a field value. Empty or absent values yield
    /// the empty set.
    fn extract(&self, value: Option<&str>) -> Result<BTreeSet<NodeId>>;
}

/// Registry of field extractors
#[derive(Default)]
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn MediaIdExtractor>>,
}

impl ExtractorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from configuration bindings.
    ///
    /// `media` is used by extractors that resolve paths to media ids.
    pub fn from_bindings(
        bindings: &BTreeMap<String, Vec<String>>,
        media: Arc<dyn TreeStore>,
    ) -> Result<Self> {
        let mut kinds_by_extractor: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        for (editor_kind, names) in bindings {
            for name in names {
                let name = match name.trim().to_lowercase().as_str() {
                    MEDIA_PICKER => MEDIA_PICKER,
                    MARKUP => MARKUP,
                    other => {
                        return Err(Error::Config(format!(
                            "unknown extractor '{}' bound to editor '{}'",
                            other, editor_kind
                        )));
                    }
                };
                kinds_by_extractor
                    .entry(name)
                    .or_default()
                    .insert(editor_kind.to_uppercase());
            }
        }

        let mut registry = Self::new();
        for (name, kinds) in kinds_by_extractor {
            match name {
                MEDIA_PICKER => registry.register(MediaPickerExtractor::new(kinds)),
                _ => registry.register(MarkupExtractor::new(kinds, media.clone())),
            }
        }
        Ok(registry)
    }

    /// Register an extractor
    pub fn register(&mut self, extractor: impl MediaIdExtractor + 'static) {
        self.extractors.push(Box::new(extractor));
    }

    /// Get all registered extractors
    pub fn extractors(&self) -> &[Box<dyn MediaIdExtractor>] {
        &self.extractors
    }

    /// Every extractor bound to the field's editor kind
    pub fn find_extractors<'a>(&'a self, editor_kind: &'a str) -> impl Iterator<Item = &'a dyn MediaIdExtractor> + 'a {
        self.extractors
            .iter()
            .filter(move |e| e.can_handle(editor_kind))
            .map(|e| e.as_ref())
    }

    /// Media ids referenced by one field
    pub fn extract_field(&self, field: &Field) -> Result<BTreeSet<NodeId>> {
        let mut ids = BTreeSet::new();
        for extractor in self.find_extractors(&field.editor) {
            ids.extend(extractor.extract(field.value.as_deref())?);
        }
        Ok(ids)
    }

    /// Union of the media ids referenced by all fields of a node
    pub fn extract_node(&self, node: &Node) -> Result<BTreeSet<NodeId>> {
        let mut ids = BTreeSet::new();
        for field in &node.fields {
            ids.extend(self.extract_field(field)?);
        }
        Ok(ids)
    }
}
