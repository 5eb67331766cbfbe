//! Boundary-aware document chunking
//!
//! Splits text into overlapping windows, preferring to break at paragraph,
//! line, and sentence boundaries. Deterministic for identical input and
//! configuration.

/// Separator priority, highest first. The empty string means "split
/// anywhere" and is implied by the hard window edge.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// `chunk_overlap` is clamped below `chunk_size` so every step advances.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    /// Split `text` into chunks of at most `chunk_size` characters with
    /// `chunk_overlap` characters carried between neighbors. Empty or
    /// whitespace-only input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut chunks = Vec::new();

        if total == 0 {
            return chunks;
        }

        let mut start = 0;
        while start < total {
            let hard_end = (start + self.chunk_size).min(total);
            let mut end = hard_end;

            // Not at the document tail: pull the cut back to the latest
            // separator inside the window.
            if hard_end < total {
                let window: String = chars[start..hard_end].iter().collect();
                for sep in SEPARATORS {
                    if let Some(byte_pos) = window.rfind(sep) {
                        let cut = window[..byte_pos].chars().count() + sep.chars().count();
                        if cut > 0 {
                            end = start + cut;
                            break;
                        }
                    }
                }
            }

            if end <= start {
                end = (start + 1).min(total);
            }

            let chunk: String = chars[start..end].iter().collect();
            let trimmed = chunk.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }

            if end >= total {
                break;
            }

            let overlap = self.chunk_overlap.min(end - start);
            let next = end - overlap;
            start = if next > start { next } else { end };
        }

        chunks
    }
}
