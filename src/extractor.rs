use std::sync::Arc;

use failure::ResultExt;
use itertools::Itertools;
use log::{debug, info};
use tempfile::TempDir;

use crate::clustering::KMeansWordClusterer;
use crate::config::ExtractorConfig;
use crate::embedding::{train_word_vectors, EmbeddingBackend, WordVectors};
use crate::errors::*;
use crate::features::FeatureVectorizer;
use crate::ontology::{Entity, IntentDefinition, Sequence, SlotCollection, Token};
use crate::slot_utils::assemble_slot_collection;
use crate::tagger::{CrfSequenceTagger, SequenceTagger};

pub const CRF_MODEL_FILE_NAME: &str = "slot_tagger.crfsuite";

/// Trainable slot extractor coordinating word embeddings, a derived word
/// clustering model and a CRF sequence tagger. Model artifacts live in a
/// working directory scoped to this instance and are removed when it is
/// dropped.
pub struct SlotExtractor {
    config: ExtractorConfig,
    embedding_backend: Box<dyn EmbeddingBackend>,
    workdir: TempDir,
    state: TrainingState,
}

enum TrainingState {
    Untrained,
    Trained(TrainedPipeline),
}

struct TrainedPipeline {
    tagger: Box<dyn SequenceTagger>,
}

// The intermediate training stages are plain data handed from one private
// step to the next inside `train`, so a partially trained extractor can
// never be observed from outside.
struct EmbeddingsReady {
    word_vectors: Box<dyn WordVectors>,
}

struct ClustersReady {
    word_clusterer: Arc<KMeansWordClusterer>,
}

impl SlotExtractor {
    pub fn new(
        embedding_backend: Box<dyn EmbeddingBackend>,
        config: ExtractorConfig,
    ) -> Result<Self> {
        let workdir = tempfile::Builder::new()
            .prefix("slot_extractor_")
            .tempdir()
            .with_context(|_| "Cannot create extractor working directory")?;
        Ok(Self {
            config,
            embedding_backend,
            workdir,
            state: TrainingState::Untrained,
        })
    }

    pub fn is_trained(&self) -> bool {
        match self.state {
            TrainingState::Trained(_) => true,
            TrainingState::Untrained => false,
        }
    }

    /// Trains the full pipeline: word embeddings, then the word clustering
    /// model, then the CRF tagger, strictly in that order. Any stage failure
    /// propagates and leaves the extractor untrained; the trained state is
    /// only entered once all three stages have succeeded.
    pub fn train(&mut self, sequences: &[Sequence]) -> Result<()> {
        if sequences.is_empty() {
            return Err(SlotExtractionError::EmptyTrainingCorpus.into());
        }
        let embeddings = self.train_embeddings(sequences)?;
        let clusters = self.cluster_word_vectors(embeddings, sequences)?;
        let pipeline = self.train_tagger(clusters, sequences)?;
        self.state = TrainingState::Trained(pipeline);
        info!("Slot extractor trained on {} sequences", sequences.len());
        Ok(())
    }

    fn train_embeddings(&self, sequences: &[Sequence]) -> Result<EmbeddingsReady> {
        let word_vectors = train_word_vectors(
            self.embedding_backend.as_ref(),
            sequences,
            self.workdir.path(),
            self.config.embedding_dim,
        )?;
        Ok(EmbeddingsReady { word_vectors })
    }

    fn cluster_word_vectors(
        &self,
        embeddings: EmbeddingsReady,
        sequences: &[Sequence],
    ) -> Result<ClustersReady> {
        let words: Vec<String> = sequences
            .iter()
            .flat_map(|sequence| sequence.tokens.iter())
            .map(|token| token.value.to_lowercase())
            .collect();
        let word_clusterer = KMeansWordClusterer::fit(
            embeddings.word_vectors,
            &words,
            self.config.cluster_count,
        )?;
        Ok(ClustersReady {
            word_clusterer: Arc::new(word_clusterer),
        })
    }

    fn train_tagger(
        &self,
        clusters: ClustersReady,
        sequences: &[Sequence],
    ) -> Result<TrainedPipeline> {
        let vectorizer = FeatureVectorizer::new(clusters.word_clusterer);
        let model_path = self.workdir.path().join(CRF_MODEL_FILE_NAME);
        debug!(
            "Training CRF tagger on intents [{}]",
            sequences.iter().map(|s| &s.intent).unique().join(", ")
        );
        let tagger =
            CrfSequenceTagger::train(sequences, vectorizer, &self.config.crf, &model_path)?;
        Ok(TrainedPipeline {
            tagger: Box::new(tagger),
        })
    }

    /// Most likely label sequence for an utterance. Fails with the
    /// not-trained error before `train` has completed; idempotent afterwards
    /// since inference never mutates the model.
    pub fn tag(&self, sequence: &Sequence) -> Result<Vec<String>> {
        match &self.state {
            TrainingState::Trained(pipeline) => pipeline.tagger.tag(sequence),
            TrainingState::Untrained => Err(SlotExtractionError::NotTrained.into()),
        }
    }

    /// Tags the tokenized utterance and reassembles the predictions into a
    /// slot collection, using the externally supplied entities to resolve
    /// normalized slot values.
    pub fn extract(
        &self,
        tokens: Vec<Token>,
        intent: &IntentDefinition,
        entities: &[Entity],
    ) -> Result<SlotCollection> {
        let sequence = Sequence {
            tokens,
            intent: intent.name.clone(),
        };
        let tags = self.tag(&sequence)?;
        Ok(assemble_slot_collection(
            &sequence.tokens,
            &tags,
            intent,
            entities,
        ))
    }
}

#[cfg(test)]
impl SlotExtractor {
    pub fn with_tagger(
        embedding_backend: Box<dyn EmbeddingBackend>,
        config: ExtractorConfig,
        tagger: Box<dyn SequenceTagger>,
    ) -> Result<Self> {
        let mut extractor = Self::new(embedding_backend, config)?;
        extractor.state = TrainingState::Trained(TrainedPipeline { tagger });
        Ok(extractor)
    }
}
