//! Per-identity sample buffering and at-most-once closure.
//!
//! Every tracked identity moves through OPEN (samples buffered) to EXPORTED
//! (terminal). Closure happens when the identity leaves the live-track set,
//! when its buffer reaches the sample quota, or at stream end. The closed
//! id is recorded as exported *before* the selected sample is handed out,
//! so no later frame can reopen or re-export it, whatever the export
//! outcome turns out to be.
use std::collections::HashSet;

use thiserror::Error;

use super::sample::Sample;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BufferError {
    #[error("samples per identity must be at least 1")]
    ZeroQuota,
}

/// Result of offering a sample to the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Stored; `count` is the identity's buffered sample count afterwards.
    Buffered { count: usize },
    /// The identity was already closed; the sample was discarded.
    AlreadyExported,
    /// The identity holds a full quota awaiting closure; the sample was discarded.
    QuotaFull,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClosureReason {
    /// No longer among the tracker's live tracks.
    Departed,
    /// Buffered samples reached the quota while still tracked.
    QuotaReached,
    /// Closed by the end-of-stream flush.
    Flushed,
}

#[derive(Clone, Debug)]
pub enum ClosureOutcome {
    /// The best sample, to be exported.
    Selected(Sample),
    /// The best sample has a zero-area crop; nothing can be exported.
    Degenerate { confidence: f64 },
}

/// An identity that has just transitioned to EXPORTED.
#[derive(Clone, Debug)]
pub struct ClosedIdentity {
    pub track_id: u32,
    pub reason: ClosureReason,
    pub sample_count: usize,
    pub outcome: ClosureOutcome,
}

#[derive(Debug)]
struct OpenEntry {
    track_id: u32,
    samples: Vec<Sample>,
}

/// Owns all buffered samples for one stream and the set of exported ids.
///
/// Open entries are kept in creation order; closures are reported in that
/// order.
#[derive(Debug)]
pub struct TrackBuffer {
    quota: usize,
    open: Vec<OpenEntry>,
    exported: HashSet<u32>,
}

impl TrackBuffer {
    pub fn new(samples_per_identity: usize) -> Result<Self, BufferError> {
        if samples_per_identity == 0 {
            return Err(BufferError::ZeroQuota);
        }
        Ok(Self {
            quota: samples_per_identity,
            open: Vec::new(),
            exported: HashSet::new(),
        })
    }

    /// Buffers `sample` for `track_id`, opening the identity on first use.
    pub fn append(&mut self, track_id: u32, sample: Sample) -> AppendOutcome {
        if self.exported.contains(&track_id) {
            return AppendOutcome::AlreadyExported;
        }

        let quota = self.quota;
        match self.open.iter_mut().find(|e| e.track_id == track_id) {
            Some(entry) if entry.samples.len() >= quota => AppendOutcome::QuotaFull,
            Some(entry) => {
                entry.samples.push(sample);
                AppendOutcome::Buffered {
                    count: entry.samples.len(),
                }
            }
            None => {
                self.open.push(OpenEntry {
                    track_id,
                    samples: vec![sample],
                });
                AppendOutcome::Buffered { count: 1 }
            }
        }
    }

    /// Closes every open identity that is absent from `live_ids` or has a
    /// full quota. Run once per frame, after that frame's appends.
    pub fn check_closures(&mut self, live_ids: &HashSet<u32>) -> Vec<ClosedIdentity> {
        let quota = self.quota;
        let (closing, remaining): (Vec<OpenEntry>, Vec<OpenEntry>) = std::mem::take(&mut self.open)
            .into_iter()
            .partition(|e| !live_ids.contains(&e.track_id) || e.samples.len() >= quota);
        self.open = remaining;

        closing
            .into_iter()
            .map(|entry| {
                let reason = if live_ids.contains(&entry.track_id) {
                    ClosureReason::QuotaReached
                } else {
                    ClosureReason::Departed
                };
                self.close(entry, reason)
            })
            .collect()
    }

    /// Closes every remaining open identity, in creation order.
    pub fn flush(&mut self) -> Vec<ClosedIdentity> {
        std::mem::take(&mut self.open)
            .into_iter()
            .map(|entry| self.close(entry, ClosureReason::Flushed))
            .collect()
    }

    pub fn open_ids(&self) -> Vec<u32> {
        self.open.iter().map(|e| e.track_id).collect()
    }

    pub fn sample_count(&self, track_id: u32) -> usize {
        self.open
            .iter()
            .find(|e| e.track_id == track_id)
            .map_or(0, |e| e.samples.len())
    }

    pub fn is_exported(&self, track_id: u32) -> bool {
        self.exported.contains(&track_id)
    }

    pub fn exported_count(&self) -> usize {
        self.exported.len()
    }

    fn close(&mut self, entry: OpenEntry, reason: ClosureReason) -> ClosedIdentity {
        self.exported.insert(entry.track_id);
        let sample_count = entry.samples.len();

        let outcome = match select_best(entry.samples) {
            Some(best) if !best.is_degenerate() => ClosureOutcome::Selected(best),
            Some(best) => ClosureOutcome::Degenerate {
                confidence: best.confidence,
            },
            None => ClosureOutcome::Degenerate { confidence: 0.0 },
        };

        ClosedIdentity {
            track_id: entry.track_id,
            reason,
            sample_count,
            outcome,
        }
    }
}

/// Highest-confidence sample; on ties the earliest one wins.
pub fn select_best(samples: Vec<Sample>) -> Option<Sample> {
    let mut best: Option<Sample> = None;
    for sample in samples {
        match best {
            Some(ref current) if sample.confidence <= current.confidence => {}
            _ => best = Some(sample),
        }
    }
    best
}
