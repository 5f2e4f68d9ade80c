//! Per-room append-only stroke log with replay, undo, and clear.

use crate::dao::models::SegmentEntity;

/// Ordered log of committed strokes plus the current open stroke.
///
/// The flattened replay cache mirrors what a live viewer has seen and is used
/// to hydrate players who join mid-drawing. All mutations are in-memory only;
/// the drawing is lost on restart, which is an accepted tradeoff.
#[derive(Debug, Default)]
pub struct DrawingLog {
    strokes: Vec<Vec<SegmentEntity>>,
    open_stroke: Vec<SegmentEntity>,
    replay: Vec<SegmentEntity>,
}

impl DrawingLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment to the open stroke and the replay cache.
    pub fn append_segment(&mut self, segment: SegmentEntity) {
        self.open_stroke.push(segment.clone());
        self.replay.push(segment);
    }

    /// Commit the open stroke. Returns `false` when the open stroke was empty.
    pub fn commit_stroke(&mut self) -> bool {
        if self.open_stroke.is_empty() {
            return false;
        }
        self.strokes.push(std::mem::take(&mut self.open_stroke));
        true
    }

    /// Remove the most recently committed stroke. Returns `false` when there
    /// is nothing to undo.
    ///
    /// The replay cache is rebuilt from the surviving committed strokes, an
    /// O(total segments) pass. Segments of a still-open stroke drop out of the
    /// replay until that stroke is committed, matching what live viewers see
    /// after their canvases replay the undo.
    pub fn undo(&mut self) -> bool {
        if self.strokes.pop().is_none() {
            return false;
        }
        self.replay = self.strokes.iter().flatten().cloned().collect();
        true
    }

    /// Wipe committed strokes, the open stroke, and the replay cache.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.open_stroke.clear();
        self.replay.clear();
    }

    /// Flattened segment sequence a fresh viewer must replay.
    pub fn replay(&self) -> &[SegmentEntity] {
        &self.replay
    }

    /// Number of committed strokes.
    pub fn committed_strokes(&self) -> usize {
        self.strokes.len()
    }
}
