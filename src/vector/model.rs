//! Paragraph vectors (PV-DBOW) trained with negative sampling.
//!
//! Each paragraph owns a vector that is trained to predict the words it
//! contains against a shared output layer. Inference freezes the output
//! layer and trains a fresh vector for unseen text the same way.
//!
//! Training and inference are single-threaded and seeded, so a given corpus
//! and [`VectorConfig`] always produce the same model and the same inferred
//! vectors.

use crate::config::VectorConfig;
use crate::error::PreprocessError;
use crate::vector::tokenize::tokenize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Exponent applied to word counts for the negative-sampling distribution.
const NEG_POWER: f64 = 0.75;

/// A trained paragraph-vector model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphModel {
    config: VectorConfig,
    /// Vocabulary in first-seen order.
    words: Vec<String>,
    counts: Vec<u64>,
    index: HashMap<String, usize>,
    /// One row per training paragraph, `vector_size` wide.
    doc_vectors: Vec<f32>,
    /// Output layer, one row per vocabulary word.
    syn1neg: Vec<f32>,
    /// Cumulative unigram^0.75 weights for drawing negative samples.
    cum_table: Vec<f64>,
}

impl ParagraphModel {
    /// Build the vocabulary from `paragraphs` and train one vector per
    /// paragraph.
    ///
    /// # Errors
    /// [`PreprocessError::EmptyCorpus`] when there are no paragraphs or no
    /// word survives `min_count`.
    pub fn fit(paragraphs: &[String], config: &VectorConfig) -> Result<Self, PreprocessError> {
        if paragraphs.is_empty() {
            return Err(PreprocessError::EmptyCorpus("no paragraphs to train on".into()));
        }

        let tokenized: Vec<Vec<String>> = paragraphs.iter().map(|p| tokenize(p)).collect();
        let (words, counts) = build_vocab(&tokenized, config.min_count);
        if words.is_empty() {
            return Err(PreprocessError::EmptyCorpus(format!(
                "no word occurs at least {} times",
                config.min_count
            )));
        }
        info!(
            "Building vocab from {} paragraphs: {} words",
            paragraphs.len(),
            words.len()
        );

        let index: HashMap<String, usize> =
            words.iter().enumerate().map(|(i, w)| (w.clone(), i)).collect();
        let docs: Vec<Vec<usize>> = tokenized
            .iter()
            .map(|toks| toks.iter().filter_map(|t| index.get(t).copied()).collect())
            .collect();

        let dim = config.vector_size;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut doc_vectors = vec![0.0f32; docs.len() * dim];
        for v in doc_vectors.iter_mut() {
            *v = (rng.gen::<f32>() - 0.5) / dim as f32;
        }

        let mut model = ParagraphModel {
            config: config.clone(),
            cum_table: cumulative_table(&counts),
            syn1neg: vec![0.0; words.len() * dim],
            words,
            counts,
            index,
            doc_vectors,
        };

        let total_steps = (config.epochs * docs.len()).max(1);
        let mut step = 0usize;
        let mut neu1e = vec![0.0f32; dim];
        for epoch in 0..config.epochs {
            for (d, doc) in docs.iter().enumerate() {
                let alpha = decayed_alpha(config, step, total_steps);
                step += 1;
                let vector = &mut model.doc_vectors[d * dim..(d + 1) * dim];
                for &word in doc {
                    sgd_step(
                        vector,
                        word,
                        alpha,
                        OutputLayer::Train(&mut model.syn1neg),
                        &Sampling {
                            cum_table: &model.cum_table,
                            negative: config.negative,
                        },
                        &mut rng,
                        &mut neu1e,
                    );
                }
            }
            debug!("epoch {}/{} done", epoch + 1, config.epochs);
        }

        Ok(model)
    }

    /// Infer a vector for `text` against the frozen output layer.
    ///
    /// Unknown words are ignored. Text without known words gets the seeded
    /// initial vector.
    pub fn infer(&self, text: &str) -> Vec<f32> {
        let dim = self.config.vector_size;
        let words: Vec<usize> = tokenize(text)
            .iter()
            .filter_map(|t| self.index.get(t).copied())
            .collect();

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut vector: Vec<f32> = (0..dim)
            .map(|_| (rng.gen::<f32>() - 0.5) / dim as f32)
            .collect();
        if words.is_empty() {
            return vector;
        }

        let sampling = Sampling {
            cum_table: &self.cum_table,
            negative: self.config.negative,
        };
        let mut neu1e = vec![0.0f32; dim];
        let epochs = self.config.epochs;
        for epoch in 0..epochs {
            let alpha = decayed_alpha(&self.config, epoch, epochs);
            for &word in &words {
                sgd_step(
                    &mut vector,
                    word,
                    alpha,
                    OutputLayer::Frozen(&self.syn1neg),
                    &sampling,
                    &mut rng,
                    &mut neu1e,
                );
            }
        }
        vector
    }

    /// Trained vector of the `i`-th training paragraph.
    pub fn doc_vector(&self, i: usize) -> Option<&[f32]> {
        let dim = self.config.vector_size;
        self.doc_vectors.get(i * dim..(i + 1) * dim)
    }

    pub fn doc_count(&self) -> usize {
        self.doc_vectors.len() / self.config.vector_size.max(1)
    }

    pub fn vocab_len(&self) -> usize {
        self.words.len()
    }

    /// Occurrences of `word` in the training corpus, if it is in the vocabulary.
    pub fn word_count(&self, word: &str) -> Option<u64> {
        self.index.get(word).map(|&i| self.counts[i])
    }

    pub fn vector_size(&self) -> usize {
        self.config.vector_size
    }

    pub fn config(&self) -> &VectorConfig {
        &self.config
    }

    /// Write the model to `path` (bincode).
    pub fn save(&self, path: &Path) -> Result<(), PreprocessError> {
        let write_err = |detail: String| PreprocessError::ModelWriteFailed {
            path: path.to_path_buf(),
            detail,
        };
        let data = bincode::serialize(self).map_err(|e| write_err(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }
        std::fs::write(path, data).map_err(|e| write_err(e.to_string()))?;
        info!(
            "Saved model ({} words, {} paragraphs) to {}",
            self.vocab_len(),
            self.doc_count(),
            path.display()
        );
        Ok(())
    }

    /// Read a model written by [`ParagraphModel::save`].
    pub fn load(path: &Path) -> Result<Self, PreprocessError> {
        let read_err = |detail: String| PreprocessError::ModelReadFailed {
            path: path.to_path_buf(),
            detail,
        };
        let data = std::fs::read(path).map_err(|e| read_err(e.to_string()))?;
        let model: ParagraphModel =
            bincode::deserialize(&data).map_err(|e| read_err(e.to_string()))?;

        let dim = model.config.vector_size;
        let consistent = dim > 0
            && model.words.len() == model.counts.len()
            && model.words.len() == model.cum_table.len()
            && model.syn1neg.len() == model.words.len() * dim
            && model.doc_vectors.len() % dim == 0;
        if !consistent {
            return Err(read_err("inconsistent layer sizes".into()));
        }
        debug!("Loaded model from {}", path.display());
        Ok(model)
    }
}

/// Count tokens and keep those seen at least `min_count` times, in
/// first-seen order.
fn build_vocab(docs: &[Vec<String>], min_count: usize) -> (Vec<String>, Vec<u64>) {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for token in docs.iter().flatten() {
        let c = counts.entry(token.as_str()).or_insert_with(|| {
            order.push(token.as_str());
            0
        });
        *c += 1;
    }
    order
        .into_iter()
        .filter(|w| counts[w] >= min_count as u64)
        .map(|w| (w.to_string(), counts[w]))
        .unzip()
}

fn cumulative_table(counts: &[u64]) -> Vec<f64> {
    let mut acc = 0.0;
    counts
        .iter()
        .map(|&c| {
            acc += (c as f64).powf(NEG_POWER);
            acc
        })
        .collect()
}

/// Linear decay from `alpha` to `min_alpha` over `total` steps.
fn decayed_alpha(config: &VectorConfig, step: usize, total: usize) -> f32 {
    let progress = step as f32 / total.max(1) as f32;
    config.alpha - (config.alpha - config.min_alpha) * progress
}

struct Sampling<'a> {
    cum_table: &'a [f64],
    negative: usize,
}

impl Sampling<'_> {
    fn draw(&self, rng: &mut StdRng) -> usize {
        let total = self.cum_table.last().copied().unwrap_or(0.0);
        let r = rng.gen::<f64>() * total;
        self.cum_table
            .partition_point(|&c| c <= r)
            .min(self.cum_table.len().saturating_sub(1))
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Output-layer weights (`syn1neg`), trainable during `fit` and read-only
/// during `infer`.
enum OutputLayer<'a> {
    Train(&'a mut [f32]),
    Frozen(&'a [f32]),
}

impl OutputLayer<'_> {
    fn row(&self, word: usize, dim: usize) -> &[f32] {
        match self {
            OutputLayer::Train(w) => &w[word * dim..(word + 1) * dim],
            OutputLayer::Frozen(w) => &w[word * dim..(word + 1) * dim],
        }
    }
}

/// One positive update for `target` plus `negative` sampled updates.
fn sgd_step(
    vector: &mut [f32],
    target: usize,
    alpha: f32,
    mut output: OutputLayer<'_>,
    sampling: &Sampling<'_>,
    rng: &mut StdRng,
    neu1e: &mut [f32],
) {
    let dim = vector.len();
    neu1e.iter_mut().for_each(|x| *x = 0.0);

    for d in 0..=sampling.negative {
        let (word, label) = if d == 0 {
            (target, 1.0)
        } else {
            let w = sampling.draw(rng);
            if w == target {
                continue;
            }
            (w, 0.0)
        };
        let row = output.row(word, dim);
        let f: f32 = vector.iter().zip(row).map(|(a, b)| a * b).sum();
        let g = (label - sigmoid(f)) * alpha;
        for (e, w) in neu1e.iter_mut().zip(row) {
            *e += g * w;
        }
        if let OutputLayer::Train(weights) = &mut output {
            let out = &mut weights[word * dim..(word + 1) * dim];
            for (w, v) in out.iter_mut().zip(vector.iter()) {
                *w += g * v;
            }
        }
    }

    for (v, e) in vector.iter_mut().zip(neu1e.iter()) {
        *v += e;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn corpus() -> Vec<String> {
        [
            "Our climate strategy targets net zero emissions by 2040.",
            "Scope 1 and scope 2 emissions fell by twelve percent.",
            "The board oversees climate risk and sustainability targets.",
            "Water usage at our plants decreased this year.",
            "We sourced renewable electricity for all offices.",
            "Employee safety incidents were the lowest on record.",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn small_config() -> VectorConfig {
        VectorConfig::builder()
            .vector_size(16)
            .epochs(10)
            .build()
            .unwrap()
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (na * nb)
    }

    #[test]
    fn fit_builds_vocab_and_doc_vectors() {
        let model = ParagraphModel::fit(&corpus(), &small_config()).unwrap();
        assert_eq!(model.doc_count(), 6);
        assert_eq!(model.vector_size(), 16);
        assert_eq!(model.word_count("emissions"), Some(2));
        assert_eq!(model.word_count("."), Some(6));
        assert!(model.doc_vector(5).is_some());
        assert!(model.doc_vector(6).is_none());
    }

    #[test]
    fn min_count_prunes_vocab() {
        let cfg = VectorConfig::builder().vector_size(8).min_count(2).build().unwrap();
        let model = ParagraphModel::fit(&corpus(), &cfg).unwrap();
        assert_eq!(model.word_count("Water"), None);
        assert_eq!(model.word_count("climate"), Some(2));
    }

    #[test]
    fn empty_corpus_is_an_error() {
        let err = ParagraphModel::fit(&[], &small_config()).unwrap_err();
        assert!(matches!(err, PreprocessError::EmptyCorpus(_)));

        let cfg = VectorConfig::builder().min_count(50).build().unwrap();
        let err = ParagraphModel::fit(&corpus(), &cfg).unwrap_err();
        assert!(matches!(err, PreprocessError::EmptyCorpus(_)));
    }

    #[test]
    fn training_is_deterministic() {
        let a = ParagraphModel::fit(&corpus(), &small_config()).unwrap();
        let b = ParagraphModel::fit(&corpus(), &small_config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn inference_is_deterministic_and_finite() {
        let model = ParagraphModel::fit(&corpus(), &small_config()).unwrap();
        let v1 = model.infer("Climate targets and emissions.");
        let v2 = model.infer("Climate targets and emissions.");
        assert_eq!(v1.len(), 16);
        assert_eq!(v1, v2);
        assert!(v1.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn inference_moves_known_text_only() {
        let model = ParagraphModel::fit(&corpus(), &small_config()).unwrap();
        let unknown = model.infer("zzz qqq");
        let also_unknown = model.infer("");
        // both fall back to the same seeded start vector
        assert_eq!(unknown, also_unknown);
        let known = model.infer("emissions");
        assert_ne!(known, unknown);
    }

    #[test]
    fn inferred_vector_is_comparable_to_training_vectors() {
        let cfg = VectorConfig::builder()
            .vector_size(24)
            .epochs(60)
            .alpha(0.05)
            .build()
            .unwrap();
        let texts = corpus();
        let model = ParagraphModel::fit(&texts, &cfg).unwrap();
        let inferred = model.infer(&texts[3]);
        let own = cosine(&inferred, model.doc_vector(3).unwrap());
        assert!(own.is_finite());
        assert!(own > -1.0 && own <= 1.0 + 1e-5);
    }

    #[test]
    fn save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("models").join("model.bin");
        let model = ParagraphModel::fit(&corpus(), &small_config()).unwrap();
        model.save(&path).unwrap();

        let loaded = ParagraphModel::load(&path).unwrap();
        assert_eq!(loaded, model);
        assert_eq!(loaded.infer("net zero"), model.infer("net zero"));
    }

    #[test]
    fn load_rejects_garbage() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("model.bin");
        std::fs::write(&path, b"not a model").unwrap();
        assert!(matches!(
            ParagraphModel::load(&path).unwrap_err(),
            PreprocessError::ModelReadFailed { .. }
        ));
        assert!(matches!(
            ParagraphModel::load(&tmp.path().join("missing.bin")).unwrap_err(),
            PreprocessError::ModelReadFailed { .. }
        ));
    }

    #[test]
    fn negative_sampling_stays_in_vocab() {
        let table = cumulative_table(&[1, 10, 100]);
        let sampling = Sampling {
            cum_table: &table,
            negative: 5,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [0usize; 3];
        for _ in 0..2000 {
            seen[sampling.draw(&mut rng)] += 1;
        }
        assert!(seen[2] > seen[1] && seen[1] > seen[0]);
    }

    #[test]
    fn alpha_decays_linearly() {
        let cfg = VectorConfig::default();
        assert_eq!(decayed_alpha(&cfg, 0, 10), cfg.alpha);
        let mid = decayed_alpha(&cfg, 5, 10);
        assert!(mid < cfg.alpha && mid > cfg.min_alpha);
    }

    #[test]
    fn frozen_output_layer_only_moves_the_vector() {
        let cum_table = cumulative_table(&[3, 2, 1]);
        let sampling = Sampling {
            cum_table: &cum_table,
            negative: 1,
        };
        let layer: Vec<f32> = (0..12).map(|i| i as f32 / 20.0).collect();
        let mut neu1e = vec![0.0f32; 4];

        let mut frozen_vec = vec![0.1f32; 4];
        let mut rng = StdRng::seed_from_u64(3);
        let before = layer.clone();
        sgd_step(
            &mut frozen_vec,
            1,
            0.05,
            OutputLayer::Frozen(&layer),
            &sampling,
            &mut rng,
            &mut neu1e,
        );
        assert_eq!(layer, before);
        assert_ne!(frozen_vec, vec![0.1f32; 4]);

        // Same draws with a trainable layer: identical vector, moved weights.
        let mut trained = layer.clone();
        let mut train_vec = vec![0.1f32; 4];
        let mut rng = StdRng::seed_from_u64(3);
        sgd_step(
            &mut train_vec,
            1,
            0.05,
            OutputLayer::Train(&mut trained),
            &sampling,
            &mut rng,
            &mut neu1e,
        );
        assert_eq!(train_vec, frozen_vec);
        assert_ne!(trained, layer);
    }

    #[test]
    fn inference_leaves_model_untouched() {
        let model = ParagraphModel::fit(&corpus(), &small_config()).unwrap();
        let snapshot = model.clone();
        let _ = model.infer("Climate targets and emissions.");
        assert_eq!(model, snapshot);
    }
}
