//! Scenario scripts
//!
//! A scenario is a JSON list of content operations replayed through a
//! [`ContentHost`], so the engine can be exercised without a CMS. Steps name
//! the nodes they create with a `key`; later steps refer to them by key, and
//! string values may embed `{{key}}` (the node id) or `{{key:file}}` (the
//! stored file path of a media item).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::host::ContentHost;
use crate::node::{FILE_FIELD, FOLDER_TYPE, NodeDraft, NodeId};
use crate::tree::TreeStore;
use crate::{Error, Result};

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

fn placeholder() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*(?::\s*(file)\s*)?\}\}").expect("placeholder pattern is valid")
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub alias: String,
    pub editor: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// One host operation. `parent` and `target` are keys of earlier steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Create {
        key: String,
        name: String,
        #[serde(rename = "type")]
        type_alias: String,
        #[serde(default)]
        parent: Option<String>,
        #[serde(default)]
        fields: Vec<FieldSpec>,
    },
    Update {
        target: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        fields: Vec<FieldSpec>,
    },
    Publish {
        target: String,
    },
    Move {
        target: String,
        #[serde(default)]
        parent: Option<String>,
    },
    Copy {
        target: String,
        key: String,
        #[serde(default)]
        parent: Option<String>,
    },
    Trash {
        target: String,
    },
    Delete {
        target: String,
    },
    EmptyRecycleBin,
    /// Create a media item directly in the media tree (no notifications).
    /// Without `file` the item is a folder.
    CreateMedia {
        key: String,
        name: String,
        #[serde(default)]
        parent: Option<String>,
        #[serde(default)]
        file: Option<String>,
        #[serde(default)]
        content: Option<String>,
    },
}

impl Step {
    pub fn op(&self) -> &'static str {
        match self {
            Step::Create { .. } => "create",
            Step::Update { .. } => "update",
            Step::Publish { .. } => "publish",
            Step::Move { .. } => "move",
            Step::Copy { .. } => "copy",
            Step::Trash { .. } => "trash",
            Step::Delete { .. } => "delete",
            Step::EmptyRecycleBin => "empty_recycle_bin",
            Step::CreateMedia { .. } => "create_media",
        }
    }
}

/// What one step did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    /// Nodes the step created or acted on
    pub nodes: Vec<NodeId>,
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let contents = std::fs::read_to_string(path)?;
    parse_scenario(&contents)
}

pub fn parse_scenario(json: &str) -> Result<Scenario> {
    Ok(serde_json::from_str(json)?)
}

/// Replays scenario steps, remembering the node behind every key
pub struct ScenarioRunner<'a> {
    host: &'a ContentHost,
    media: &'a dyn TreeStore,
    keys: BTreeMap<String, NodeId>,
    files: BTreeMap<String, String>,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(host: &'a ContentHost, media: &'a dyn TreeStore) -> Self {
        Self {
            host,
            media,
            keys: BTreeMap::new(),
            files: BTreeMap::new(),
        }
    }

    /// Node ids by key
    pub fn keys(&self) -> &BTreeMap<String, NodeId> {
        &self.keys
    }

    pub fn id_of(&self, key: &str) -> Result<NodeId> {
        self.keys
            .get(key)
            .copied()
            .ok_or_else(|| Error::Scenario(format!("unknown key '{}'", key)))
    }

    fn parent_of(&self, key: Option<&str>) -> Result<Option<NodeId>> {
        key.map(|k| self.id_of(k)).transpose()
    }

    fn remember(&mut self, key: &str, id: NodeId) -> Result<()> {
        if self.keys.insert(key.to_string(), id).is_some() {
            return Err(Error::Scenario(format!("key '{}' is used twice", key)));
        }
        Ok(())
    }

    /// Replace `{{key}}` and `{{key:file}}` placeholders
    pub fn expand(&self, text: &str) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in placeholder().captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let key = &caps[1];
            let replacement = if caps.get(2).is_some() {
                self.files
                    .get(key)
                    .cloned()
                    .ok_or_else(|| Error::Scenario(format!("'{}' has no stored file", key)))?
            } else {
                self.id_of(key)?.to_string()
            };
            out.push_str(&text[last..whole.start()]);
            out.push_str(&replacement);
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    fn expand_field(&self, field: &FieldSpec) -> Result<Option<String>> {
        field.value.as_deref().map(|v| self.expand(v)).transpose()
    }

    /// Run every step in order, stopping at the first failure
    pub fn run(&mut self, scenario: &Scenario) -> Result<Vec<StepOutcome>> {
        let mut outcomes = Vec::with_capacity(scenario.steps.len());
        for (index, step) in scenario.steps.iter().enumerate() {
            tracing::debug!(step = index, op = step.op(), "running scenario step");
            let nodes = self
                .run_step(step)
                .map_err(|e| Error::Scenario(format!("step {} ({}): {}", index + 1, step.op(), e)))?;
            outcomes.push(StepOutcome { index, op: step.op(), nodes });
        }
        Ok(outcomes)
    }

    fn run_step(&mut self, step: &Step) -> Result<Vec<NodeId>> {
        match step {
            Step::Create { key, name, type_alias, parent, fields } => {
                let mut draft = NodeDraft::new(self.expand(name)?, self.parent_of(parent.as_deref())?, type_alias.as_str());
                for field in fields {
                    draft.set_field(&field.alias, &field.editor, self.expand_field(field)?);
                }
                let node = self.host.create(draft)?;
                self.remember(key, node.id)?;
                Ok(vec![node.id])
            }
            Step::Update { target, name, fields } => {
                let id = self.id_of(target)?;
                let mut node = self
                    .host
                    .content()
                    .get_by_id(id)?
                    .ok_or(Error::NodeNotFound { tree: self.host.content().kind(), id })?;
                if let Some(name) = name {
                    node.name = self.expand(name)?;
                }
                for field in fields {
                    node.set_field(&field.alias, &field.editor, self.expand_field(field)?);
                }
                self.host.save(&node)?;
                Ok(vec![id])
            }
            Step::Publish { target } => {
                let id = self.id_of(target)?;
                self.host.publish(id)?;
                Ok(vec![id])
            }
            Step::Move { target, parent } => {
                let id = self.id_of(target)?;
                self.host.move_node(id, self.parent_of(parent.as_deref())?)?;
                Ok(vec![id])
            }
            Step::Copy { target, key, parent } => {
                let id = self.id_of(target)?;
                let copy = self.host.copy(id, self.parent_of(parent.as_deref())?)?;
                self.remember(key, copy.id)?;
                Ok(vec![copy.id])
            }
            Step::Trash { target } => {
                let id = self.id_of(target)?;
                self.host.trash(id)?;
                Ok(vec![id])
            }
            Step::Delete { target } => self.host.delete(self.id_of(target)?),
            Step::EmptyRecycleBin => self.host.empty_recycle_bin(),
            Step::CreateMedia { key, name, parent, file, content } => {
                let parent_id = self.parent_of(parent.as_deref())?;
                let node = match file {
                    Some(file_name) => {
                        let mut draft = self.media.create_item(name, parent_id, "File")?;
                        let bytes = content.as_deref().unwrap_or(file_name.as_str()).as_bytes();
                        self.media.set_binary_field(&mut draft, FILE_FIELD, file_name, bytes)?;
                        self.media.insert(draft)?
                    }
                    None => {
                        let draft = self.media.create_item(name, parent_id, FOLDER_TYPE)?;
                        self.media.insert(draft)?
                    }
                };
                if let Some(path) = node.file_path() {
                    self.files.insert(key.clone(), path.to_string());
                }
                self.remember(key, node.id)?;
                Ok(vec![node.id])
            }
        }
    }
}
