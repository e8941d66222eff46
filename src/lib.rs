mod clustering;
mod config;
mod embedding;
pub mod errors;
mod extractor;
mod features;
mod ontology;
mod slot_utils;
mod tagger;
#[cfg(test)]
mod testutils;

pub use crate::clustering::{KMeansModel, KMeansWordClusterer, WordClusterer};
pub use crate::config::{CrfHyperparameters, ExtractorConfig};
pub use crate::embedding::{EmbeddingBackend, HashMapWordVectors, WordVectors};
pub use crate::errors::*;
pub use crate::extractor::SlotExtractor;
pub use crate::features::FeatureVectorizer;
pub use crate::ontology::{
    BioTag, Entity, EntityData, EntityMeta, IntentDefinition, Sequence, Slot, SlotCollection,
    SlotDefinition, SlotEntry, Token,
};
pub use crate::tagger::{CrfSequenceTagger, SequenceTagger};
