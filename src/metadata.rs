//! `JfifMetadata`: an ordered, `Vec`-backed list of segments, mirroring
//! the teacher's own preference for an owned `Vec<Segment>` over an
//! intrusive tree structure.

use crate::error::{Error, Result};
use crate::key::SegmentKey;
use crate::segments::{self, Segment};

/// An ordered sequence of JFIF segments. Order is caller-visible and
/// authoritative; there is no uniqueness constraint on keys.
#[derive(Debug, Clone, Default)]
pub struct JfifMetadata {
    segments: Vec<Segment>,
}

impl JfifMetadata {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut Vec<Segment> {
        &mut self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// All segments matching `key`, in position order.
    pub fn find_all<'a>(&'a self, key: &'a SegmentKey) -> impl Iterator<Item = &'a Segment> + 'a {
        self.segments.iter().filter(move |s| &s.key() == key)
    }

    /// The first segment matching `key`, and its index.
    pub fn find_first(&self, key: &SegmentKey) -> Option<(&Segment, usize)> {
        self.segments
            .iter()
            .enumerate()
            .find(|(_, s)| &s.key() == key)
            .map(|(i, s)| (s, i))
    }

    pub fn find_first_index(&self, key: &SegmentKey) -> Option<usize> {
        self.segments.iter().position(|s| &s.key() == key)
    }

    /// Scans from the end for the last segment whose key is in `keys`,
    /// and returns the index immediately after it. `SOI` is always
    /// implicitly included in `keys`, so any insertion always lands
    /// after a present `SOI`. Returns `0` if nothing in `keys` (plus
    /// SOI) is present.
    pub fn get_index_after(&self, keys: &[SegmentKey]) -> usize {
        let soi_key = segments::SOI_TEMPLATE.key();
        for (i, segment) in self.segments.iter().enumerate().rev() {
            let key = segment.key();
            if key == soi_key || keys.iter().any(|k| *k == key) {
                return i + 1;
            }
        }
        0
    }

    /// Inserts `segment` at `get_index_after(preceding_keys)`.
    pub fn insert(&mut self, segment: Segment, preceding_keys: &[SegmentKey]) {
        let index = self.get_index_after(preceding_keys);
        self.segments.insert(index, segment);
    }

    /// Removes every segment matching `key`; returns how many were
    /// removed.
    pub fn remove_all(&mut self, key: &SegmentKey) -> usize {
        let before = self.segments.len();
        self.segments.retain(|s| &s.key() != key);
        before - self.segments.len()
    }

    /// Removes the first segment matching `key`; returns whether one
    /// was found.
    pub fn remove_first(&mut self, key: &SegmentKey) -> bool {
        if let Some(index) = self.find_first_index(key) {
            self.segments.remove(index);
            true
        } else {
            false
        }
    }

    /// Finds or creates the (unique, by convention) segment at `key`.
    /// If absent, `make` constructs a fresh one and it's inserted at
    /// `get_index_after(preceding_keys)`. If present and `reposition` is
    /// true: when its current index is strictly before the target
    /// index, it's removed and reinserted immediately before the target
    /// position (accounting for the shift the removal causes); if it's
    /// already at or after the target, it's left alone.
    pub fn get_or_create(
        &mut self,
        key: &SegmentKey,
        reposition: bool,
        preceding_keys: &[SegmentKey],
        make: impl FnOnce() -> Segment,
    ) -> (usize, bool) {
        let target = self.get_index_after(preceding_keys);
        match self.find_first_index(key) {
            Some(index) => {
                if reposition && index < target {
                    let segment = self.segments.remove(index);
                    let new_index = target - 1;
                    self.segments.insert(new_index, segment);
                    (new_index, false)
                } else {
                    (index, false)
                }
            }
            None => {
                self.segments.insert(target, make());
                (target, true)
            }
        }
    }

    /// Borrow the segment at `index`, failing if it isn't the concrete
    /// variant the caller expects (mirrors `find_first`'s `TypeMismatch`
    /// behavior for callers that already know the index).
    pub fn expect_variant<'a, T>(
        &'a self,
        index: usize,
        key: &SegmentKey,
        project: impl FnOnce(&'a Segment) -> Option<T>,
    ) -> Result<T> {
        let segment = self
            .segments
            .get(index)
            .ok_or_else(|| Error::TypeMismatch {
                key: key.to_string(),
            })?;
        project(segment).ok_or_else(|| Error::TypeMismatch {
            key: key.to_string(),
        })
    }
}
