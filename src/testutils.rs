use std::collections::HashMap;
use std::fs;
use std::iter::FromIterator;
use std::path::Path;

use failure::{bail, format_err};
use itertools::Itertools;
use ndarray::Array1;

use crate::clustering::WordClusterer;
use crate::embedding::{EmbeddingBackend, HashMapWordVectors, WordVectors};
use crate::errors::*;
use crate::ontology::Sequence;
use crate::tagger::SequenceTagger;

/// Deterministic stand-in for the external embedding library: each corpus
/// word gets a vector derived from an FNV hash of the word and the component
/// index, so distinct words get distinct, reproducible vectors without any
/// actual training.
pub struct HashingEmbeddingBackend;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn hashed_vector(word: &str, dim: usize) -> Array1<f32> {
    Array1::from_iter((0..dim).map(|component| {
        let seed = fnv1a(format!("{}#{}", word, component).as_bytes());
        (seed % 1000) as f32 / 1000.0
    }))
}

impl EmbeddingBackend for HashingEmbeddingBackend {
    fn train(
        &self,
        corpus_path: &Path,
        model_path: &Path,
        dim: usize,
    ) -> Result<Box<dyn WordVectors>> {
        let corpus = fs::read_to_string(corpus_path)
            .map_err(|e| format_err!("Cannot read corpus file: {}", e))?;
        let words: Vec<String> = corpus
            .split_whitespace()
            .unique()
            .map(|word| word.to_string())
            .collect();
        fs::write(model_path, words.join("\n"))
            .map_err(|e| format_err!("Cannot write model file: {}", e))?;
        let values = words
            .into_iter()
            .map(|word| {
                let vector = hashed_vector(&word, dim);
                (word, vector)
            })
            .collect();
        Ok(Box::new(HashMapWordVectors::new(values)))
    }
}

/// Backend whose training always fails.
pub struct FailingEmbeddingBackend;

impl EmbeddingBackend for FailingEmbeddingBackend {
    fn train(
        &self,
        _corpus_path: &Path,
        _model_path: &Path,
        _dim: usize,
    ) -> Result<Box<dyn WordVectors>> {
        bail!("Embedding backend crashed")
    }
}

#[derive(Default)]
pub struct MockedWordClusterer {
    pub mocked_outputs: HashMap<String, String>,
}

impl WordClusterer for MockedWordClusterer {
    fn get_cluster(&self, word: &str) -> Option<String> {
        self.mocked_outputs.get(word).cloned()
    }
}

impl FromIterator<(String, String)> for MockedWordClusterer {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            mocked_outputs: HashMap::from_iter(iter),
        }
    }
}

/// Tagger returning canned label sequences keyed by the space-joined token
/// values of the input sequence.
#[derive(Default)]
pub struct MockedSequenceTagger {
    pub mocked_outputs: HashMap<String, Vec<String>>,
}

impl SequenceTagger for MockedSequenceTagger {
    fn tag(&self, sequence: &Sequence) -> Result<Vec<String>> {
        let key = sequence.tokens.iter().map(|token| &token.value).join(" ");
        self.mocked_outputs
            .get(&key)
            .cloned()
            .ok_or_else(|| format_err!("No mocked tags for '{}'", key))
    }
}

impl FromIterator<(String, Vec<String>)> for MockedSequenceTagger {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        Self {
            mocked_outputs: HashMap::from_iter(iter),
        }
    }
}
