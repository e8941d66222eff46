use std::path::Path;
use std::sync::Mutex;

use crfsuite::{Algorithm, Attribute, GraphicalModel, Item, Model as CrfSuiteModel, Trainer as CrfSuiteTrainer};
use failure::{format_err, ResultExt};
use log::debug;

use crate::config::CrfHyperparameters;
use crate::errors::*;
use crate::features::FeatureVectorizer;
use crate::ontology::Sequence;

/// Capability producing the most likely label sequence for an utterance.
/// Kept behind a trait so tests can substitute a fake tagger.
pub trait SequenceTagger: Send + Sync {
    fn tag(&self, sequence: &Sequence) -> Result<Vec<String>>;
}

/// Conditional random field sequence tagger. An instance only exists once
/// training has completed and the model artifact has been loaded back, so a
/// "tag before train" state is unrepresentable at this level.
pub struct CrfSequenceTagger {
    model: Mutex<CrfSuiteModel>,
    vectorizer: FeatureVectorizer,
}

impl CrfSequenceTagger {
    pub fn train(
        sequences: &[Sequence],
        vectorizer: FeatureVectorizer,
        hyperparameters: &CrfHyperparameters,
        model_path: &Path,
    ) -> Result<Self> {
        let mut trainer = CrfSuiteTrainer::new(false);
        trainer.select(Algorithm::LBFGS, GraphicalModel::CRF1D)?;
        trainer.set("c1", &hyperparameters.c1.to_string())?;
        trainer.set("c2", &hyperparameters.c2.to_string())?;
        trainer.set("max_iterations", &hyperparameters.max_iterations.to_string())?;
        trainer.set("feature.possible_transitions", "1")?;
        trainer.set("feature.possible_states", "1")?;

        for sequence in sequences {
            let features = compute_features(&vectorizer, sequence);
            let labels: Vec<String> = sequence.tokens.iter().map(|token| token.label()).collect();
            trainer.append(&features, &labels, 0)?;
        }

        let model_file = model_path
            .to_str()
            .ok_or_else(|| format_err!("Invalid CRF model path: {:?}", model_path))?;
        trainer
            .train(model_file, -1)
            .with_context(|_| "CRF training failed")?;
        debug!("Trained CRF model persisted to '{}'", model_file);

        let model = CrfSuiteModel::from_file(model_file)
            .with_context(|_| format!("Cannot load trained CRF model from '{}'", model_file))?;
        Ok(Self {
            model: Mutex::new(model),
            vectorizer,
        })
    }
}

impl SequenceTagger for CrfSequenceTagger {
    fn tag(&self, sequence: &Sequence) -> Result<Vec<String>> {
        if sequence.tokens.is_empty() {
            return Ok(vec![]);
        }
        let features = compute_features(&self.vectorizer, sequence);
        let tags = self
            .model
            .lock()
            .map_err(|e| format_err!("Poisonous mutex: {}", e))?
            .tagger()?
            .tag(&features)?;
        Ok(tags)
    }
}

fn compute_features(vectorizer: &FeatureVectorizer, sequence: &Sequence) -> Vec<Item> {
    (0..sequence.tokens.len())
        .map(|token_index| {
            vectorizer
                .vectorize(sequence, token_index)
                .into_iter()
                .map(|feature| Attribute::new(feature, 1.0))
                .collect()
        })
        .collect()
}
