//! Time-based chunking of audio sources under a byte-size ceiling.

mod materialize;
mod plan;

pub use materialize::{ChunkArtifact, Segmenter, SizePolicy};
pub use plan::{mb_to_bytes, ChunkPlan, ChunkSpec, PlanStatus, BYTES_PER_MB};
