use std::collections::BTreeSet;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

pub type IntentName = String;
pub type SlotName = String;
pub type EntityName = String;

pub const BEGINNING_PREFIX: &str = "B-";
pub const INSIDE_PREFIX: &str = "I-";
pub const OUTSIDE: &str = "O";

/// Position of a token relative to a labeled span.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BioTag {
    Out,
    Beginning,
    Inside,
}

impl Default for BioTag {
    fn default() -> Self {
        BioTag::Out
    }
}

/// One token of an utterance, as produced by the external tokenizer.
/// `start` and `end` are character offsets into the raw utterance; `tag`,
/// `slot` and `matched_entities` carry training annotations and entity
/// recognition results when available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub tag: BioTag,
    #[serde(default)]
    pub slot: Option<SlotName>,
    #[serde(default)]
    pub matched_entities: BTreeSet<EntityName>,
}

impl Token {
    pub fn new<T: Into<String>>(value: T, start: usize, end: usize) -> Self {
        Self {
            value: value.into(),
            start,
            end,
            tag: BioTag::Out,
            slot: None,
            matched_entities: BTreeSet::new(),
        }
    }

    /// Composite CRF label: the bare outside marker, or the BIO prefix
    /// combined with the slot name.
    pub fn label(&self) -> String {
        match (self.tag, self.slot.as_ref()) {
            (BioTag::Out, _) | (_, None) => OUTSIDE.to_string(),
            (BioTag::Beginning, Some(slot)) => format!("{}{}", BEGINNING_PREFIX, slot),
            (BioTag::Inside, Some(slot)) => format!("{}{}", INSIDE_PREFIX, slot),
        }
    }
}

/// One training or inference example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub tokens: Vec<Token>,
    pub intent: IntentName,
}

/// Declares which entity type fills which slot of an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub name: SlotName,
    pub entity: EntityName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDefinition {
    pub name: IntentName,
    pub slots: Vec<SlotDefinition>,
}

/// Externally supplied entity recognition result over character offsets of
/// the raw utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: EntityName,
    pub meta: EntityMeta,
    pub data: EntityData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMeta {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    pub value: Value,
}

/// One resolved slot instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub name: SlotName,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
}

/// A slot name maps to an array only when multiple beginning-tagged spans
/// share the same name within one utterance; the shape is decided at
/// assembly time rather than by runtime inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SlotEntry {
    Single(Slot),
    Multiple(Vec<Slot>),
}

/// Mapping from slot name to single or multi-valued slot, preserving
/// first-occurrence order of the tag sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlotCollection {
    entries: Vec<(SlotName, SlotEntry)>,
}

impl SlotCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SlotEntry> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, entry)| entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SlotEntry)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry))
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut SlotEntry> {
        self.entries
            .iter_mut()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, entry)| entry)
    }

    /// Assigns a fresh single slot under `name`, keeping the position of an
    /// already present entry.
    pub(crate) fn insert_single(&mut self, name: &str, slot: Slot) {
        match self.get_mut(name) {
            Some(entry) => *entry = SlotEntry::Single(slot),
            None => self.entries.push((name.to_string(), SlotEntry::Single(slot))),
        }
    }

    /// Extends an existing entry with one more slot instance, promoting a
    /// single slot into a two-element array. The entry must exist.
    pub(crate) fn push_additional(&mut self, name: &str, slot: Slot) {
        if let Some(entry) = self.get_mut(name) {
            match entry {
                SlotEntry::Single(_) => {
                    let previous = std::mem::replace(entry, SlotEntry::Multiple(vec![]));
                    if let SlotEntry::Single(first) = previous {
                        *entry = SlotEntry::Multiple(vec![first, slot]);
                    }
                }
                SlotEntry::Multiple(slots) => slots.push(slot),
            }
        }
    }
}

impl Serialize for SlotCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, entry) in &self.entries {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }
}

/// Slot name carried by a composite label, i.e. the characters after the
/// 2-character BIO prefix.
pub fn tag_name_to_slot_name(tag: &str) -> String {
    tag.chars().skip(2).collect()
}
