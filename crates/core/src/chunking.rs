use crate::config::ChunkingConfig;
use crate::error::ConfigError;

/// Splits text into overlapping word windows of `chunk_size`, advancing by
/// `chunk_size - chunk_overlap`. A trailing window shorter than
/// `min_chunk_size` is dropped.
pub fn split_into_chunks(text: &str, config: &ChunkingConfig) -> Result<Vec<String>, ConfigError> {
    config.validate()?;

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= config.chunk_size {
        return Ok(vec![text.to_string()]);
    }

    let stride = config.chunk_size - config.chunk_overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + config.chunk_size).min(words.len());
        let window = &words[start..end];
        if window.len() >= config.min_chunk_size {
            chunks.push(window.join(" "));
        }
        start += stride;
    }

    Ok(chunks)
}
