use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use failure::ResultExt;
use itertools::Itertools;
use log::debug;
use ndarray::{Array1, ArrayView1};

use crate::errors::*;
use crate::ontology::Sequence;

pub const CORPUS_FILE_NAME: &str = "corpus.txt";
pub const EMBEDDING_MODEL_FILE_NAME: &str = "embeddings.bin";

/// Lookup over trained word vectors, keyed by lowercase word.
pub trait WordVectors: Send + Sync {
    fn vector(&self, word: &str) -> Option<ArrayView1<f32>>;
}

/// Capability of the external embedding library: train word vectors from a
/// whitespace-tokenized corpus file and persist the model artifact to
/// `model_path`. The artifact format is owned by the backend and opaque to
/// this crate; only the file's existence is part of the contract.
pub trait EmbeddingBackend: Send + Sync {
    fn train(
        &self,
        corpus_path: &Path,
        model_path: &Path,
        dim: usize,
    ) -> Result<Box<dyn WordVectors>>;
}

pub struct HashMapWordVectors {
    values: HashMap<String, Array1<f32>>,
}

impl HashMapWordVectors {
    pub fn new(values: HashMap<String, Array1<f32>>) -> Self {
        Self { values }
    }
}

impl WordVectors for HashMapWordVectors {
    fn vector(&self, word: &str) -> Option<ArrayView1<f32>> {
        self.values.get(word).map(|vector| vector.view())
    }
}

/// Canonicalized sentence form used to learn slot-context embeddings: each
/// annotated token is replaced by its slot name, other tokens are kept
/// verbatim; everything is lowercased.
pub fn canonicalized_sentence(sequence: &Sequence) -> String {
    sequence
        .tokens
        .iter()
        .map(|token| {
            token
                .slot
                .as_deref()
                .unwrap_or(&token.value)
                .to_lowercase()
        })
        .join(" ")
}

/// Writes the canonicalized corpus into the extractor's working directory and
/// trains word vectors through the embedding backend. A backend failure
/// propagates unmodified; no partial model is exposed.
pub fn train_word_vectors(
    backend: &dyn EmbeddingBackend,
    sequences: &[Sequence],
    workdir: &Path,
    dim: usize,
) -> Result<Box<dyn WordVectors>> {
    let corpus_path = workdir.join(CORPUS_FILE_NAME);
    let model_path = workdir.join(EMBEDDING_MODEL_FILE_NAME);

    let mut corpus_file = fs::File::create(&corpus_path)
        .with_context(|_| format!("Cannot create corpus file '{:?}'", corpus_path))?;
    for sequence in sequences {
        writeln!(corpus_file, "{}", canonicalized_sentence(sequence))?;
    }
    debug!(
        "Wrote {} canonicalized sentences to {:?}",
        sequences.len(),
        corpus_path
    );

    backend
        .train(&corpus_path, &model_path, dim)
        .with_context(|_| "Embedding backend failed to train word vectors")
        .map_err(|e| e.into())
}
