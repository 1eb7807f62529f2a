use core::ops::Range;

/// Contiguous groups described by a monotonic offsets array.
///
/// Group `i` covers `offsets[i]..offsets[i + 1]`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct OffsetIndices {
    offsets: Vec<u32>,
}

impl Default for OffsetIndices {
    fn default() -> Self {
        Self { offsets: vec![0] }
    }
}

impl OffsetIndices {
    /// Builds the offsets from the size of each group.
    pub fn from_sizes(sizes: impl IntoIterator<Item = u32>) -> Self {
        let mut offsets = vec![0];
        let mut total = 0;
        for size in sizes {
            total += size;
            offsets.push(total);
        }
        Self { offsets }
    }

    /// The number of groups.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Is there no group at all?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The sum of all group sizes.
    #[inline]
    pub fn total_size(&self) -> usize {
        self.offsets[self.offsets.len() - 1] as usize
    }

    /// The range covered by the `i`-th group.
    #[inline]
    pub fn range(&self, i: usize) -> Range<usize> {
        self.offsets[i] as usize..self.offsets[i + 1] as usize
    }

    /// The size of the `i`-th group.
    #[inline]
    pub fn size(&self, i: usize) -> usize {
        (self.offsets[i + 1] - self.offsets[i]) as usize
    }
}

/// A list of groups of indices, stored contiguously.
///
/// This is used for the vertex to face adjacency of a mesh.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct GroupedIndices {
    offsets: OffsetIndices,
    indices: Vec<u32>,
}

impl GroupedIndices {
    /// Groups `(group, value)` pairs by group, preserving the order of values within a group.
    pub fn from_pairs(group_count: usize, pairs: &[(u32, u32)]) -> Self {
        let mut sizes = vec![0u32; group_count];
        for (group, _) in pairs {
            sizes[*group as usize] += 1;
        }

        let offsets = OffsetIndices::from_sizes(sizes.iter().copied());
        let mut cursor: Vec<usize> = (0..group_count).map(|i| offsets.range(i).start).collect();
        let mut indices = vec![0; pairs.len()];

        for (group, value) in pairs {
            let slot = &mut cursor[*group as usize];
            indices[*slot] = *value;
            *slot += 1;
        }

        Self { offsets, indices }
    }

    /// The number of groups.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Is there no group at all?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// The indices of the `i`-th group.
    #[inline]
    pub fn group(&self, i: usize) -> &[u32] {
        &self.indices[self.offsets.range(i)]
    }
}
