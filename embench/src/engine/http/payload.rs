//! Embeddings request bodies.
//!
//! Every request carries a fresh batch of fragments sampled from the corpus,
//! so that the endpoint can not serve repeated inputs from a cache.

use core::{
    fmt::{self, Display, Formatter},
    num::NonZero,
};
use std::sync::Arc;

use bytes::Bytes;
use clap::ValueEnum;
use rand::Rng;
use serde::Serialize;

use crate::Produce;

/// Kind of embeddings input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Short search queries.
    Query,
    /// Long document passages.
    Passage,
}

impl Mode {
    /// Returns the nominal number of tokens per corpus fragment.
    ///
    /// This is a convention used for corpus chunking and reporting, not a
    /// measured value.
    #[inline]
    pub const fn tokens_per_fragment(&self) -> usize {
        match self {
            Self::Query => 20,
            Self::Passage => 300,
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        match self {
            Self::Query => f.write_str("query"),
            Self::Passage => f.write_str("passage"),
        }
    }
}

/// Draws `batch_size` fragments uniformly at random from `corpus`, with
/// replacement.
///
/// # Panics
///
/// Panics if `corpus` is empty or `batch_size` is zero.
pub fn generate_batch<'a, R>(corpus: &'a [String], batch_size: usize, rng: &mut R) -> Vec<&'a str>
where
    R: Rng + ?Sized,
{
    assert!(!corpus.is_empty(), "corpus must not be empty");
    assert!(batch_size > 0, "batch size must be at least 1");

    (0..batch_size)
        .map(|_| corpus[rng.gen_range(0..corpus.len())].as_str())
        .collect()
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    input: Vec<&'a str>,
    model: &'a str,
    input_type: Mode,
    encoding_format: &'static str,
}

/// Produces JSON bodies for the embeddings endpoint.
#[derive(Debug)]
pub struct EmbeddingsPayload {
    corpus: Arc<[String]>,
    model: String,
    mode: Mode,
    batch_size: NonZero<usize>,
}

impl EmbeddingsPayload {
    /// # Panics
    ///
    /// Panics if `corpus` is empty.
    pub fn new(corpus: Arc<[String]>, model: String, mode: Mode, batch_size: NonZero<usize>) -> Self {
        assert!(!corpus.is_empty(), "corpus must not be empty");

        Self {
            corpus,
            model,
            mode,
            batch_size,
        }
    }
}

impl Produce for EmbeddingsPayload {
    type Item = Bytes;

    fn next(&self) -> Self::Item {
        let mut rng = rand::thread_rng();
        let req = EmbeddingsRequest {
            input: generate_batch(&self.corpus, self.batch_size.get(), &mut rng),
            model: &self.model,
            input_type: self.mode,
            encoding_format: "float",
        };

        let body = serde_json::to_vec(&req).expect("string-only JSON serialization never fails");

        Bytes::from(body)
    }
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};
    use serde_json::Value;

    use super::*;

    fn corpus(fragments: &[&str]) -> Arc<[String]> {
        fragments.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_singleton_corpus() {
        let corpus = vec!["only".to_string()];
        let mut rng = StdRng::seed_from_u64(1);

        let batch = generate_batch(&corpus, 1000, &mut rng);

        assert_eq!(1000, batch.len());
        assert!(batch.iter().all(|&v| v == "only"));
    }

    #[test]
    fn test_samples_from_corpus() {
        let corpus = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut rng = StdRng::seed_from_u64(42);

        let batch = generate_batch(&corpus, 300, &mut rng);

        assert_eq!(300, batch.len());
        assert!(batch.iter().all(|v| corpus.iter().any(|c| c == v)));
        // With 300 draws every fragment shows up, with overwhelming probability.
        for c in &corpus {
            assert!(batch.contains(&c.as_str()));
        }
    }

    #[test]
    #[should_panic(expected = "corpus must not be empty")]
    fn test_empty_corpus_panics() {
        generate_batch(&[], 1, &mut rand::thread_rng());
    }

    #[test]
    #[should_panic(expected = "batch size must be at least 1")]
    fn test_zero_batch_panics() {
        generate_batch(&["a".to_string()], 0, &mut rand::thread_rng());
    }

    #[test]
    fn test_payload_json() {
        let payload = EmbeddingsPayload::new(
            corpus(&["hello world"]),
            "bge-small".to_string(),
            Mode::Passage,
            NonZero::new(3).unwrap(),
        );

        let body: Value = serde_json::from_slice(&payload.next()).unwrap();

        assert_eq!("bge-small", body["model"]);
        assert_eq!("passage", body["input_type"]);
        assert_eq!("float", body["encoding_format"]);
        assert_eq!(3, body["input"].as_array().unwrap().len());
        assert_eq!("hello world", body["input"][0]);
    }

    #[test]
    fn test_tokens_per_fragment() {
        assert_eq!(20, Mode::Query.tokens_per_fragment());
        assert_eq!(300, Mode::Passage.tokens_per_fragment());
        assert_eq!("query", Mode::Query.to_string());
    }
}
