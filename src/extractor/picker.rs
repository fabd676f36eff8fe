//! Direct-reference extractor for media picker fields
//!
//! Picker values hold a media id, or a comma-separated list of ids for
//! multi-pickers.

use std::collections::BTreeSet;

use super::{MediaIdExtractor, MEDIA_PICKER};
use crate::Result;
use crate::node::NodeId;

pub struct MediaPickerExtractor {
    editor_kinds: BTreeSet<String>,
}

impl MediaPickerExtractor {
    pub fn new(editor_kinds: impl IntoIterator<Item = String>) -> Self {
        Self {
            editor_kinds: editor_kinds.into_iter().map(|k| k.to_uppercase()).collect(),
        }
    }
}

impl MediaIdExtractor for MediaPickerExtractor {
    fn name(&self) -> &str {
        MEDIA_PICKER
    }

    fn editor_kinds(&self) -> &BTreeSet<String> {
        &self.editor_kinds
    }

    fn extract(&self, value: Option<&str>) -> Result<BTreeSet<NodeId>> {
        let Some(value) = value else {
            return Ok(BTreeSet::new());
        };

        let mut ids = BTreeSet::new();
        for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.parse::<NodeId>() {
                Ok(id) if id > 0 => {
                    ids.insert(id);
                }
                _ => tracing::debug!(token, "ignoring non-id picker value"),
            }
        }
        Ok(ids)
    }
}
