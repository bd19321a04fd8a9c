//! Simplified ByteTrack multi-object tracker with track confirmation.
//!
//! Two-stage association: high-confidence detections are matched first,
//! then low-confidence detections fill remaining unmatched tracks. New
//! tracks start tentative and are confirmed after `min_hits` consecutive
//! matches; a tentative track that misses a single frame is dropped, a
//! confirmed one coasts on its last box for up to `max_lost` frames.
use std::collections::HashSet;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::identity_tracker::IdentityTracker;
use crate::detection::domain::track::Track;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::math::bbox_iou;

const HIGH_THRESH: f64 = 0.5;
const MATCH_THRESH: f64 = 0.3;

#[derive(Clone, Debug)]
struct TrackState {
    id: u32,
    bbox: [f64; 4],
    hits: usize,
    frames_lost: usize,
    matched: bool,
    confirmed: bool,
}

pub struct ByteTracker {
    tracks: Vec<TrackState>,
    next_id: u32,
    min_hits: usize,
    max_lost: usize,
}

impl ByteTracker {
    pub fn new(min_hits: usize, max_lost: usize) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            min_hits: min_hits.max(1),
            max_lost,
        }
    }

    pub fn step(&mut self, detections: &[Detection]) -> Vec<Track> {
        let boxes: Vec<[f64; 4]> = detections.iter().map(|d| d.bbox.to_ltrb()).collect();
        let (high, low) = split_by_confidence(detections);

        self.reset_match_flags();
        let num_existing = self.tracks.len();
        let matched_high = self.match_stage(&high, &boxes, false);
        self.match_stage(&low, &boxes, true);
        self.create_new_tracks(&high, &matched_high, &boxes);
        self.age_unmatched_tracks(num_existing);

        self.live_tracks()
    }

    fn reset_match_flags(&mut self) {
        for track in &mut self.tracks {
            track.matched = false;
        }
    }

    /// Greedily matches `dets` against tracks; with `unmatched_only` the
    /// tracks already claimed by an earlier stage are skipped.
    fn match_stage(
        &mut self,
        dets: &[usize],
        boxes: &[[f64; 4]],
        unmatched_only: bool,
    ) -> HashSet<usize> {
        let track_refs: Vec<(usize, [f64; 4])> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| !(unmatched_only && t.matched))
            .map(|(i, t)| (i, t.bbox))
            .collect();

        let mut matched_dets = HashSet::new();
        for (ti, di) in greedy_match(&track_refs, dets, boxes, MATCH_THRESH) {
            self.apply_match(ti, boxes[di]);
            matched_dets.insert(di);
        }
        matched_dets
    }

    fn apply_match(&mut self, track_idx: usize, bbox: [f64; 4]) {
        let min_hits = self.min_hits;
        let track = &mut self.tracks[track_idx];
        track.bbox = bbox;
        track.frames_lost = 0;
        track.matched = true;
        track.hits += 1;
        if track.hits >= min_hits {
            track.confirmed = true;
        }
    }

    fn create_new_tracks(&mut self, high: &[usize], matched: &HashSet<usize>, boxes: &[[f64; 4]]) {
        for di in high {
            if !matched.contains(di) {
                self.tracks.push(TrackState {
                    id: self.next_id,
                    bbox: boxes[*di],
                    hits: 1,
                    frames_lost: 0,
                    matched: true,
                    confirmed: self.min_hits <= 1,
                });
                self.next_id += 1;
            }
        }
    }

    fn age_unmatched_tracks(&mut self, num_existing: usize) {
        for track in self.tracks.iter_mut().take(num_existing) {
            if !track.matched {
                track.frames_lost += 1;
                track.hits = 0;
            }
        }
        let max_lost = self.max_lost;
        self.tracks.retain(|t| {
            if t.confirmed {
                t.frames_lost <= max_lost
            } else {
                t.frames_lost == 0
            }
        });
    }

    /// Every retained track, including confirmed tracks coasting on a stale box.
    fn live_tracks(&self) -> Vec<Track> {
        self.tracks
            .iter()
            .map(|t| Track {
                id: t.id,
                bbox: BoundingBox::from_ltrb(t.bbox[0], t.bbox[1], t.bbox[2], t.bbox[3]),
                confirmed: t.confirmed,
            })
            .collect()
    }
}

impl IdentityTracker for ByteTracker {
    fn update(
        &mut self,
        detections: &[Detection],
        _frame: &Frame,
    ) -> Result<Vec<Track>, Box<dyn std::error::Error>> {
        Ok(self.step(detections))
    }
}

fn split_by_confidence(detections: &[Detection]) -> (Vec<usize>, Vec<usize>) {
    (0..detections.len()).partition(|&i| detections[i].confidence >= HIGH_THRESH)
}

/// Greedy IoU matching: pairs sorted by descending IoU, each track/detection
/// used at most once.
fn greedy_match(
    tracks: &[(usize, [f64; 4])],
    dets: &[usize],
    boxes: &[[f64; 4]],
    thresh: f64,
) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    for (ti, bbox) in tracks {
        for di in dets {
            let score = bbox_iou(bbox, &boxes[*di]);
            if score >= thresh {
                pairs.push((*ti, *di, score));
            }
        }
    }
    pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut used_tracks = HashSet::new();
    let mut used_dets = HashSet::new();
    let mut matches = Vec::new();

    for (ti, di, _) in &pairs {
        if !used_tracks.contains(ti) && !used_dets.contains(di) {
            used_tracks.insert(*ti);
            used_dets.insert(*di);
            matches.push((*ti, *di));
        }
    }
    matches
}
