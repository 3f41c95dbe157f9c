const DEFAULT: usize = 384;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Text-to-vector mapping with asymmetric encode modes: stored documents
/// and incoming queries are prefixed differently before embedding, and all
/// vectors are L2-normalized.
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;
    fn model_name(&self) -> &str;
    fn embed_document(&self, text: &str) -> Vec<f32>;
    fn embed_query(&self, text: &str) -> Vec<f32>;
}

#[derive(Debug, Clone)]
pub struct HashedNgramEmbedder {
    dimensions: usize,
    model_name: String,
}

impl HashedNgramEmbedder {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            model_name: format!("hashed-ngram-{dimensions}"),
        }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

impl Default for HashedNgramEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIMENSIONS)
    }
}

impl Embedder for HashedNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn embed_document(&self, text: &str) -> Vec<f32> {
        self.embed(&format!("passage: {text}"))
    }

    fn embed_query(&self, text: &str) -> Vec<f32> {
        self.embed(&format!("query: {text}"))
    }
}

#[cfg(test)]
mod tests {
    use super::{Embedder, HashedNgramEmbedder};

    #[test]
    fn embedder_is_deterministic() {
        let embedder = HashedNgramEmbedder::default();
        let first = embedder.embed_document("Senior konsulent med Azure erfaring");
        let second = embedder.embed_document("Senior konsulent med Azure erfaring");
        assert_eq!(first, second);
    }

    #[test]
    fn embedder_outputs_expected_length() {
        let embedder = HashedNgramEmbedder::new(32);
        assert_eq!(embedder.embed_document("abc").len(), 32);
        assert_eq!(embedder.embed_query("abc").len(), 32);
    }

    #[test]
    fn document_and_query_modes_differ_for_the_same_text() {
        let embedder = HashedNgramEmbedder::default();
        let document = embedder.embed_document("enterprise architecture");
        let query = embedder.embed_query("enterprise architecture");
        assert_ne!(document, query);
    }

    #[test]
    fn vectors_are_normalized() {
        let embedder = HashedNgramEmbedder::default();
        let vector = embedder.embed_document("informasjonsarkitekt");
        let magnitude = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5);
    }
}
