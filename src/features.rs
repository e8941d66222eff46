use std::sync::Arc;

use crate::clustering::WordClusterer;
use crate::ontology::{Sequence, Token};

pub const BOS_MARKER: &str = "bos";
pub const EOS_MARKER: &str = "eos";

/// Converts a token sequence into per-position sparse categorical features
/// over a 3-token context window. The output is positional:
/// `[prev..., current..., next...]`.
pub struct FeatureVectorizer {
    word_clusterer: Arc<dyn WordClusterer>,
}

impl FeatureVectorizer {
    pub fn new(word_clusterer: Arc<dyn WordClusterer>) -> Self {
        Self { word_clusterer }
    }

    pub fn vectorize(&self, sequence: &Sequence, token_index: usize) -> Vec<String> {
        let last_index = sequence.tokens.len().saturating_sub(1);
        let prev = if token_index == 0 {
            vec![BOS_MARKER.to_string()]
        } else {
            self.token_features(sequence, token_index - 1, -1)
        };
        let current = self.token_features(sequence, token_index, 0);
        let next = if token_index >= last_index {
            vec![EOS_MARKER.to_string()]
        } else {
            self.token_features(sequence, token_index + 1, 1)
        };
        prev.into_iter().chain(current).chain(next).collect()
    }

    fn token_features(&self, sequence: &Sequence, token_index: usize, offset: i32) -> Vec<String> {
        let token = &sequence.tokens[token_index];
        let mut features = vec![offset_feature("intent", offset, Some(&sequence.intent))];

        if is_all_lowercase(&token.value) {
            features.push(offset_feature("low", offset, None));
        }
        if is_all_uppercase(&token.value) {
            features.push(offset_feature("up", offset, None));
        }
        if is_title_case(&token.value) {
            features.push(offset_feature("title", offset, None));
        }

        if token.matched_entities.is_empty() {
            features.push(offset_feature("entity", offset, Some("none")));
        } else {
            for entity in &token.matched_entities {
                features.push(offset_feature("entity", offset, Some(entity)));
            }
        }

        // The center token never gets a cluster feature, so the tagger cannot
        // key on a token's own clustered identity
        if offset != 0 {
            if let Some(cluster) = self
                .word_clusterer
                .get_cluster(&token.value.to_lowercase())
            {
                features.push(offset_feature("cluster", offset, Some(&cluster)));
            }
        }
        features
    }
}

fn offset_feature(name: &str, offset: i32, value: Option<&str>) -> String {
    let key = if offset == 0 {
        name.to_string()
    } else {
        format!("{}[{:+}]", name, offset)
    };
    match value {
        Some(value) => format!("{}={}", key, value),
        None => key,
    }
}

fn is_all_lowercase(value: &str) -> bool {
    !value.is_empty() && value.chars().all(char::is_lowercase)
}

fn is_all_uppercase(value: &str) -> bool {
    !value.is_empty() && value.chars().all(char::is_uppercase)
}

fn is_title_case(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => {
            first.is_uppercase() && chars.next().map_or(true, |second| second.is_lowercase())
        }
        None => false,
    }
}
