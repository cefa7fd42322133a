//! Typed inline annotations ("entities") attached to character ranges.
//!
//! The engine stores at most one entity per character. Each annotation kind
//! declares how it combines with existing coverage through [`OverlapRule`].

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smol_str::SmolStr;

use crate::types::{BlockKey, SpanRange};

/// Wire name of the translatable span kind.
pub const TRANSLATABLE_KIND: &str = "TRANSLATE_BLOCK_ENTITY";

/// Document-local entity identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(pub(crate) u32);

impl EntityKey {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a newly applied annotation interacts with coverage already present.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlapRule {
    /// A character carries at most one annotation of any kind; applying
    /// replaces whatever covered the range before.
    Exclusive,
}

/// Kind of an annotation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    /// Span the user marked for on-hover translation.
    Translatable,
    /// Any other kind found in a loaded document, kept verbatim.
    Other(SmolStr),
}

impl AnnotationKind {
    pub fn from_wire(name: &str) -> Self {
        match name {
            TRANSLATABLE_KIND => Self::Translatable,
            other => Self::Other(SmolStr::new(other)),
        }
    }

    pub fn wire_name(&self) -> &str {
        match self {
            Self::Translatable => TRANSLATABLE_KIND,
            Self::Other(name) => name.as_str(),
        }
    }

    pub fn overlap_rule(&self) -> OverlapRule {
        match self {
            Self::Translatable => OverlapRule::Exclusive,
            Self::Other(_) => OverlapRule::Exclusive,
        }
    }

    pub fn is_translatable(&self) -> bool {
        matches!(self, Self::Translatable)
    }
}

impl Serialize for AnnotationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_name())
    }
}

impl<'de> Deserialize<'de> for AnnotationKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = SmolStr::deserialize(deserializer)?;
        Ok(Self::from_wire(&name))
    }
}

/// How an entity's text may be edited while the entity stays attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mutability {
    #[default]
    Mutable,
    Immutable,
    Segmented,
}

/// An entity definition from the document's entity map.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub kind: AnnotationKind,
    pub mutability: Mutability,
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Entity {
    pub fn new(kind: AnnotationKind, mutability: Mutability) -> Self {
        Self {
            kind,
            mutability,
            data: serde_json::Map::new(),
        }
    }
}

/// A maximal run of characters in one block sharing the same entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    pub entity: EntityKey,
    pub kind: AnnotationKind,
    pub block: BlockKey,
    pub range: SpanRange,
}

/// Collapse per-character entity slots into maximal runs.
///
/// Yields `(entity, range)` for every run of identical, non-empty slots.
pub fn entity_runs(slots: &[Option<EntityKey>]) -> Vec<(EntityKey, SpanRange)> {
    let mut runs = Vec::new();
    let mut current: Option<(EntityKey, usize)> = None;

    for (idx, slot) in slots.iter().enumerate() {
        match (current, slot) {
            (Some((key, _)), Some(next)) if key == *next => {}
            (Some((key, start)), _) => {
                runs.push((key, SpanRange::new(start, idx)));
                current = slot.map(|k| (k, idx));
            }
            (None, Some(next)) => current = Some((*next, idx)),
            (None, None) => {}
        }
    }
    if let Some((key, start)) = current {
        runs.push((key, SpanRange::new(start, slots.len())));
    }
    runs
}
