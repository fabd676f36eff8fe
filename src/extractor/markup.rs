//! Markup extractor for rich-text fields
//!
//! Finds `href`/`src` attributes that point into the media library and
//! resolves each path to a media id through the media store. Prefixed
//! attributes such as `data-src` are not links and are skipped.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use super::{MediaIdExtractor, MARKUP};
use crate::Result;
use crate::node::NodeId;
use crate::tree::TreeStore;

/// Path segment that marks a link as a media link
const MEDIA_SEGMENT: &str = "/media/";

static LINK_ATTR: OnceLock<Regex> = OnceLock::new();

fn link_attr() -> &'static Regex {
    LINK_ATTR.get_or_init(|| {
        Regex::new(r#"(?i)(?:^|\s)(?:href|src)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("link attribute pattern is valid")
    })
}

pub struct MarkupExtractor {
    editor_kinds: BTreeSet<String>,
    media: Arc<dyn TreeStore>,
}

impl MarkupExtractor {
    pub fn new(editor_kinds: impl IntoIterator<Item = String>, media: Arc<dyn TreeStore>) -> Self {
        Self {
            editor_kinds: editor_kinds.into_iter().map(|k| k.to_uppercase()).collect(),
            media,
        }
    }
}

/// Media paths linked from a chunk of markup, in document order
pub fn media_links(markup: &str) -> Vec<String> {
    link_attr()
        .captures_iter(markup)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim())
        .filter(|link| link.to_lowercase().contains(MEDIA_SEGMENT))
        .map(normalize_link)
        .collect()
}

/// Reduce a link to the path the media store knows it by: absolute URLs lose
/// their scheme and host, and query strings and fragments are dropped.
fn normalize_link(link: &str) -> String {
    let without_origin = match link.find("://") {
        Some(scheme_end) => {
            let rest = &link[scheme_end + 3..];
            rest.find('/').map_or("/", |slash| &rest[slash..])
        }
        None => link,
    };
    let end = without_origin
        .find(|c: char| c == '?' || c == '#')
        .unwrap_or(without_origin.len());
    without_origin[..end].to_string()
}

impl MediaIdExtractor for MarkupExtractor {
    fn name(&self) -> &str {
        MARKUP
    }

    fn editor_kinds(&self) -> &BTreeSet<String> {
        &self.editor_kinds
    }

    fn extract(&self, value: Option<&str>) -> Result<BTreeSet<NodeId>> {
        let mut ids = BTreeSet::new();
        let Some(markup) = value.filter(|v| !v.trim().is_empty()) else {
            return Ok(ids);
        };

        for path in media_links(markup) {
            match self.media.get_by_path(&path)? {
                Some(item) => {
                    ids.insert(item.id);
                }
                None => tracing::debug!(path = %path, "media link does not resolve to an item"),
            }
        }
        Ok(ids)
    }
}
