//! Wrap-aware indices into the closed-loop track

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An index into a closed-loop sequence of `len` waypoints.
///
/// All arithmetic wraps modulo `len`, so the index is always valid for the sequence it was
/// created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackIdx {
    idx: usize,
    len: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TrackIdx {
    /// Create a new index, wrapping `idx` into `[0, len)`.
    ///
    /// Returns `None` if `len` is zero.
    pub fn new(idx: usize, len: usize) -> Option<Self> {
        if len == 0 {
            return None;
        }

        Some(Self {
            idx: idx % len,
            len,
        })
    }

    /// The raw index into the sequence.
    pub fn get(self) -> usize {
        self.idx
    }

    /// Length of the sequence this index is for.
    pub fn len(self) -> usize {
        self.len
    }

    /// The following index.
    pub fn next(self) -> Self {
        self.advance(1)
    }

    /// The preceding index.
    pub fn prev(self) -> Self {
        Self {
            idx: (self.idx + self.len - 1) % self.len,
            len: self.len,
        }
    }

    /// Move `steps` indices forward around the loop.
    pub fn advance(self, steps: usize) -> Self {
        Self {
            idx: (self.idx + steps % self.len) % self.len,
            len: self.len,
        }
    }

    /// Number of forward steps needed to reach `other` from this index.
    ///
    /// `other` is wrapped into the sequence first.
    pub fn steps_to(self, other: usize) -> usize {
        let other = other % self.len;
        (other + self.len - self.idx) % self.len
    }

    /// Iterate over `count` consecutive raw indices starting at this one, wrapping around the
    /// end of the sequence.
    pub fn iter(self, count: usize) -> impl Iterator<Item = usize> {
        (0..count).map(move |k| self.advance(k).idx)
    }
}

impl From<TrackIdx> for usize {
    fn from(idx: TrackIdx) -> Self {
        idx.idx
    }
}
