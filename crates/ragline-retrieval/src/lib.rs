//! Ragline Retrieval - hybrid (vector + keyword) search over an
//! in-memory chunk index

pub mod chunker;
pub mod engine;
pub mod index;

pub use chunker::Chunker;
pub use engine::RetrievalEngine;
pub use index::{IndexedChunk, VectorIndex};
