//! Coarse cell → fine sample index mapping.
//!
//! An `IndexMapping` holds one index list per coarse cell. Index list `i`
//! names the positions, in a flat fine-resolution array, of the samples
//! assigned to cell `i`. The mapping is a trusted record of whatever the
//! builder (or a stored file) produced: it does not check index bounds or
//! that an index appears in only one cell. Bounds are checked when the
//! mapping is applied to an array, or up front via [`IndexMapping::validate_for_len`].

use crate::error::{RegridError, Result};

/// Per-coarse-cell lists of fine sample indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexMapping {
    cells: Vec<Vec<usize>>,
}

impl IndexMapping {
    /// Materialize a mapping from any nested iterable of indices.
    ///
    /// Order is preserved both across cells and within each cell.
    pub fn from_cells<I, C>(cells: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: IntoIterator<Item = usize>,
    {
        Self {
            cells: cells
                .into_iter()
                .map(|cell| cell.into_iter().collect())
                .collect(),
        }
    }

    /// Number of coarse cells.
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// True when the mapping has no cells at all.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Index list of one cell.
    pub fn cell(&self, cell: usize) -> Option<&[usize]> {
        self.cells.get(cell).map(Vec::as_slice)
    }

    /// Iterate over the index lists in cell order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[usize]> {
        self.cells.iter().map(Vec::as_slice)
    }

    /// All index lists.
    pub fn cells(&self) -> &[Vec<usize>] {
        &self.cells
    }

    /// Total number of indices across all cells.
    pub fn total_indices(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    /// Number of cells with an empty index list.
    pub fn empty_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_empty()).count()
    }

    /// Largest index referenced by any cell.
    pub fn max_index(&self) -> Option<usize> {
        self.cells.iter().flatten().copied().max()
    }

    /// Check every index against a fine array of length `len`.
    ///
    /// Reports the first offending index in cell order.
    pub fn validate_for_len(&self, len: usize) -> Result<()> {
        for (cell, indices) in self.cells.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i >= len) {
                return Err(RegridError::IndexOutOfRange { cell, index, len });
            }
        }
        Ok(())
    }

    /// Consume the mapping, returning the raw index lists.
    pub fn into_cells(self) -> Vec<Vec<usize>> {
        self.cells
    }
}

impl From<Vec<Vec<usize>>> for IndexMapping {
    fn from(cells: Vec<Vec<usize>>) -> Self {
        Self { cells }
    }
}

impl<C> FromIterator<C> for IndexMapping
where
    C: IntoIterator<Item = usize>,
{
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self::from_cells(iter)
    }
}
