use core::ops::Range;

/// A half-open range of an [`IndexArena`], tagged with the arena generation it was carved from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ArenaRange {
    start: u32,
    len: u32,
    generation: u32,
}

impl ArenaRange {
    /// The first arena slot of this range.
    #[inline]
    pub fn start(&self) -> usize {
        self.start as usize
    }

    /// One past the last arena slot of this range.
    #[inline]
    pub fn end(&self) -> usize {
        (self.start + self.len) as usize
    }

    /// The number of indices in this range.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Is this range empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The arena generation this range is valid for.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    #[inline]
    pub(crate) fn as_range(&self) -> Range<usize> {
        self.start()..self.end()
    }
}

/// A flat array of indices from which nodes carve contiguous ranges.
///
/// The content of an arena is only ever replaced as a whole, which bumps its generation. Ranges
/// from an older generation are rejected by debug assertions on access.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct IndexArena {
    data: Vec<u32>,
    generation: u32,
}

impl IndexArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole content of this arena, invalidating every previous range.
    pub fn replace(&mut self, data: Vec<u32>) {
        self.data = data;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Creates a range over `start..start + len` for the current generation.
    #[inline]
    pub fn range(&self, start: usize, len: usize) -> ArenaRange {
        assert!(start + len <= self.data.len());
        ArenaRange {
            start: start as u32,
            len: len as u32,
            generation: self.generation,
        }
    }

    /// An empty range for the current generation.
    #[inline]
    pub fn empty_range(&self) -> ArenaRange {
        ArenaRange {
            start: 0,
            len: 0,
            generation: self.generation,
        }
    }

    /// The indices covered by `range`.
    #[inline]
    pub fn get(&self, range: &ArenaRange) -> &[u32] {
        debug_assert_eq!(
            range.generation, self.generation,
            "arena range used after the arena was rebuilt"
        );
        &self.data[range.as_range()]
    }

    /// The whole content of this arena.
    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    /// The number of indices stored in this arena.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Is this arena empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The current generation of this arena.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}
