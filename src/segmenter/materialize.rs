//! Write planned chunks to disk.

use super::plan::{ChunkPlan, ChunkSpec};
use crate::audio::{AudioCodec, AudioSource};
use crate::error::{Result, TranscribeError};
use crate::paths::chunk_artifact_path;
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

/// Chunks shorter than this are never split further, even when oversized.
const MIN_SPLIT_SECS: f64 = 1.0;

/// How strictly the ceiling is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizePolicy {
    /// Trust the uniform-bitrate estimate.
    #[default]
    Estimate,
    /// Measure each written chunk and re-split any that exceed the ceiling.
    Enforce,
}

/// A chunk written to local disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkArtifact {
    pub index: usize,
    pub spec: ChunkSpec,
    pub path: PathBuf,
}

pub struct Segmenter {
    codec: Arc<dyn AudioCodec>,
    ceiling_bytes: f64,
    policy: SizePolicy,
    output_dir: Option<PathBuf>,
}

impl Segmenter {
    pub fn new(codec: Arc<dyn AudioCodec>, ceiling_bytes: f64) -> Self {
        Self {
            codec,
            ceiling_bytes,
            policy: SizePolicy::Estimate,
            output_dir: None,
        }
    }

    pub fn with_policy(mut self, policy: SizePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Write artifacts here instead of next to the source.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn codec(&self) -> &Arc<dyn AudioCodec> {
        &self.codec
    }

    pub fn plan(&self, source: &AudioSource) -> Result<ChunkPlan> {
        ChunkPlan::for_source(source, self.ceiling_bytes)
    }

    /// Plan `source` and write every chunk, in order. The first write failure
    /// aborts the rest; files already written are left in place.
    pub async fn plan_and_materialize(&self, source: &AudioSource) -> Result<Vec<ChunkArtifact>> {
        let plan = self.plan(source)?;
        info!(
            "[segmenter] {}: {:.2}s, {} bytes, ceiling {:.0} bytes -> {} chunk(s)",
            source.path.display(),
            source.duration_secs,
            source.total_bytes,
            self.ceiling_bytes,
            plan.len()
        );
        let (_, artifacts) = self.materialize(source, &plan).await?;
        Ok(artifacts)
    }

    /// Write each chunk of `plan`. Under `SizePolicy::Enforce` the returned
    /// plan is `Validated` and may hold more specs than the input.
    pub async fn materialize(
        &self,
        source: &AudioSource,
        plan: &ChunkPlan,
    ) -> Result<(ChunkPlan, Vec<ChunkArtifact>)> {
        let dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| source.parent_dir());
        std::fs::create_dir_all(&dir).map_err(|e| TranscribeError::encode_failure(&dir, e))?;
        let stem = source.stem();
        let ext = self.codec.chunk_extension(source);

        let mut queue: VecDeque<ChunkSpec> = plan.specs().iter().cloned().collect();
        let mut written: Vec<(ChunkSpec, PathBuf)> = Vec::with_capacity(queue.len());

        while let Some(spec) = queue.pop_front() {
            let path = chunk_artifact_path(&dir, &stem, spec.start_secs, &ext);
            self.codec
                .extract(source, spec.start_secs, spec.end_secs, &path)
                .await?;
            debug!(
                "[segmenter] chunk {}: {:.3}..{:.3}s -> {}",
                spec.index,
                spec.start_secs,
                spec.end_secs,
                path.display()
            );

            if self.policy == SizePolicy::Enforce {
                let actual = std::fs::metadata(&path)
                    .map_err(|e| TranscribeError::encode_failure(&path, e))?
                    .len() as f64;
                if actual > self.ceiling_bytes {
                    if spec.duration_secs() >= 2.0 * MIN_SPLIT_SECS {
                        debug!(
                            "[segmenter] chunk {} is {} bytes over the ceiling, splitting",
                            spec.index,
                            actual - self.ceiling_bytes
                        );
                        let _ = std::fs::remove_file(&path);
                        let (first, second) = spec.halves();
                        queue.push_front(second);
                        queue.push_front(first);
                        continue;
                    }
                    warn!(
                        "[segmenter] chunk {} still {} bytes after splitting down to {:.3}s",
                        spec.index,
                        actual,
                        spec.duration_secs()
                    );
                }
            }
            written.push((spec, path));
        }

        let result_plan = match self.policy {
            SizePolicy::Estimate => plan.clone(),
            SizePolicy::Enforce => ChunkPlan::validated(
                written.iter().map(|(spec, _)| spec.clone()).collect(),
                self.ceiling_bytes,
            ),
        };
        let artifacts = result_plan
            .specs()
            .iter()
            .zip(written.into_iter())
            .map(|(spec, (_, path))| ChunkArtifact {
                index: spec.index,
                spec: spec.clone(),
                path,
            })
            .collect();
        Ok((result_plan, artifacts))
    }
}
