//! Chunk plan arithmetic.
//!
//! The source is treated as having a uniform average bitrate, so every chunk
//! but the last spans the same duration. Chunk sizes are estimates: a dense
//! passage can still produce a chunk larger than the ceiling.

use crate::audio::AudioSource;
use crate::error::{Result, TranscribeError};

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Convert a ceiling given in megabytes (MiB) to bytes.
pub fn mb_to_bytes(mb: f64) -> f64 {
    mb * BYTES_PER_MB
}

/// One contiguous time range of the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSpec {
    pub index: usize,
    pub start_secs: f64,
    pub end_secs: f64,
    pub estimated_bytes: f64,
}

impl ChunkSpec {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Split at the midpoint. Indices are left for the caller to renumber.
    pub(crate) fn halves(&self) -> (ChunkSpec, ChunkSpec) {
        let mid = self.start_secs + self.duration_secs() / 2.0;
        let half_bytes = self.estimated_bytes / 2.0;
        (
            ChunkSpec {
                index: self.index,
                start_secs: self.start_secs,
                end_secs: mid,
                estimated_bytes: half_bytes,
            },
            ChunkSpec {
                index: self.index,
                start_secs: mid,
                end_secs: self.end_secs,
                estimated_bytes: half_bytes,
            },
        )
    }
}

/// Whether chunk sizes were measured after materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatus {
    /// Sizes come from the uniform-bitrate estimate only.
    Estimated,
    /// Every materialized chunk was measured and re-split until it fit.
    Validated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPlan {
    specs: Vec<ChunkSpec>,
    ceiling_bytes: f64,
    status: PlanStatus,
}

impl ChunkPlan {
    /// Plan `ceil(total_bytes / ceiling_bytes)` chunks of equal duration, the
    /// last one ending exactly at `duration_secs`.
    pub fn estimate(duration_secs: f64, total_bytes: u64, ceiling_bytes: f64) -> Result<Self> {
        if !ceiling_bytes.is_finite() || ceiling_bytes <= 0.0 {
            return Err(TranscribeError::Config(format!(
                "chunk ceiling must be a positive size, got {} bytes",
                ceiling_bytes
            )));
        }
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(TranscribeError::Config(format!(
                "cannot plan chunks for duration {}",
                duration_secs
            )));
        }
        if total_bytes == 0 {
            return Err(TranscribeError::Config(
                "cannot plan chunks for an empty source".to_string(),
            ));
        }

        let total = total_bytes as f64;
        let total_chunks = (total / ceiling_bytes).ceil().max(1.0) as usize;
        let chunk_duration = duration_secs * (ceiling_bytes / total);

        let specs = (0..total_chunks)
            .map(|index| {
                let start_secs = index as f64 * chunk_duration;
                let end_secs = if index + 1 == total_chunks {
                    duration_secs
                } else {
                    ((index + 1) as f64 * chunk_duration).min(duration_secs)
                };
                ChunkSpec {
                    index,
                    start_secs,
                    end_secs,
                    estimated_bytes: total * (end_secs - start_secs) / duration_secs,
                }
            })
            .collect();

        Ok(Self {
            specs,
            ceiling_bytes,
            status: PlanStatus::Estimated,
        })
    }

    /// Plan for a probed source; rejects sources with no duration or no bytes.
    pub fn for_source(source: &AudioSource, ceiling_bytes: f64) -> Result<Self> {
        if !source.duration_secs.is_finite() || source.duration_secs <= 0.0 {
            return Err(TranscribeError::source_unreadable(
                &source.path,
                "zero or unknown duration",
            ));
        }
        if source.total_bytes == 0 {
            return Err(TranscribeError::source_unreadable(&source.path, "empty file"));
        }
        Self::estimate(source.duration_secs, source.total_bytes, ceiling_bytes)
    }

    /// Wrap specs whose sizes were measured. Renumbers indices in order.
    pub(crate) fn validated(mut specs: Vec<ChunkSpec>, ceiling_bytes: f64) -> Self {
        for (i, spec) in specs.iter_mut().enumerate() {
            spec.index = i;
        }
        Self {
            specs,
            ceiling_bytes,
            status: PlanStatus::Validated,
        }
    }

    pub fn specs(&self) -> &[ChunkSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn ceiling_bytes(&self) -> f64 {
        self.ceiling_bytes
    }

    pub fn status(&self) -> PlanStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_hundred_seconds_thirty_mb_ten_mb_ceiling() {
        let plan = ChunkPlan::estimate(100.0, 30 * 1024 * 1024, mb_to_bytes(10.0)).unwrap();
        let ranges: Vec<(f64, f64)> = plan
            .specs()
            .iter()
            .map(|s| (s.start_secs, s.end_secs))
            .collect();
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0].0, 0.0);
        assert!((ranges[0].1 - 100.0 / 3.0).abs() < EPS);
        assert!((ranges[1].1 - 200.0 / 3.0).abs() < EPS);
        assert_eq!(ranges[2].1, 100.0);
        assert_eq!(plan.status(), PlanStatus::Estimated);
    }

    #[test]
    fn test_source_below_ceiling_is_single_chunk() {
        let plan = ChunkPlan::estimate(42.5, 1_000, mb_to_bytes(25.0)).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.specs()[0].start_secs, 0.0);
        assert_eq!(plan.specs()[0].end_secs, 42.5);
        assert_eq!(plan.specs()[0].estimated_bytes, 1_000.0);
    }

    #[test]
    fn test_remainder_shortens_last_chunk() {
        // 25 bytes at a ceiling of 10 → 3 chunks of 4s, 4s, 2s.
        let plan = ChunkPlan::estimate(10.0, 25, 10.0).unwrap();
        let durations: Vec<f64> = plan.specs().iter().map(|s| s.duration_secs()).collect();
        assert_eq!(durations.len(), 3);
        assert!((durations[0] - 4.0).abs() < EPS);
        assert!((durations[1] - 4.0).abs() < EPS);
        assert!((durations[2] - 2.0).abs() < EPS);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(ChunkPlan::estimate(10.0, 100, 0.0).is_err());
        assert!(ChunkPlan::estimate(10.0, 100, -5.0).is_err());
        assert!(ChunkPlan::estimate(10.0, 100, f64::NAN).is_err());
        assert!(ChunkPlan::estimate(0.0, 100, 10.0).is_err());
        assert!(ChunkPlan::estimate(10.0, 0, 10.0).is_err());
    }

    #[test]
    fn test_for_source_flags_unreadable() {
        let source = AudioSource::new("x.mp3", 0.0, 10);
        let err = ChunkPlan::for_source(&source, 5.0).unwrap_err();
        assert!(matches!(err, TranscribeError::SourceUnreadable { .. }));

        let source = AudioSource::new("x.mp3", 3.0, 0);
        let err = ChunkPlan::for_source(&source, 5.0).unwrap_err();
        assert!(matches!(err, TranscribeError::SourceUnreadable { .. }));
    }

    #[test]
    fn test_halves_split_at_midpoint() {
        let spec = ChunkSpec {
            index: 4,
            start_secs: 10.0,
            end_secs: 20.0,
            estimated_bytes: 100.0,
        };
        let (a, b) = spec.halves();
        assert_eq!((a.start_secs, a.end_secs), (10.0, 15.0));
        assert_eq!((b.start_secs, b.end_secs), (15.0, 20.0));
        assert_eq!(a.estimated_bytes + b.estimated_bytes, 100.0);
    }

    #[test]
    fn test_validated_renumbers() {
        let spec = ChunkSpec {
            index: 0,
            start_secs: 0.0,
            end_secs: 2.0,
            estimated_bytes: 10.0,
        };
        let (a, b) = spec.halves();
        let plan = ChunkPlan::validated(vec![a, b], 10.0);
        assert_eq!(plan.status(), PlanStatus::Validated);
        let indices: Vec<usize> = plan.specs().iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    proptest! {
        #[test]
        fn prop_plan_is_contiguous_and_covers_source(
            duration in 0.5f64..20_000.0,
            total_bytes in 1u64..2_000_000_000,
            ceiling in 1_000.0f64..100_000_000.0,
        ) {
            let plan = ChunkPlan::estimate(duration, total_bytes, ceiling).unwrap();
            let expected = ((total_bytes as f64) / ceiling).ceil().max(1.0) as usize;
            prop_assert_eq!(plan.len(), expected);

            let specs = plan.specs();
            prop_assert_eq!(specs[0].start_secs, 0.0);
            prop_assert_eq!(specs[specs.len() - 1].end_secs, duration);

            let chunk_duration = duration * ceiling / total_bytes as f64;
            for (i, pair) in specs.windows(2).enumerate() {
                prop_assert_eq!(pair[0].end_secs, pair[1].start_secs);
                prop_assert_eq!(pair[0].index, i);
                let tolerance = 1e-9 * duration.max(1.0);
                prop_assert!((pair[0].duration_secs() - chunk_duration).abs() <= tolerance);
            }
            for spec in specs {
                prop_assert!(spec.start_secs < spec.end_secs);
                prop_assert!(spec.end_secs <= duration);
                prop_assert!(spec.estimated_bytes <= ceiling * (1.0 + 1e-9));
            }
        }

        #[test]
        fn prop_planning_is_idempotent(
            duration in 0.5f64..20_000.0,
            total_bytes in 1u64..2_000_000_000,
            ceiling in 1_000.0f64..100_000_000.0,
        ) {
            let first = ChunkPlan::estimate(duration, total_bytes, ceiling).unwrap();
            let second = ChunkPlan::estimate(duration, total_bytes, ceiling).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
