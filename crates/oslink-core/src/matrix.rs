//! Compressed sparse coefficient matrices.
//!
//! The canonical problem stores its linear coefficients in compressed form,
//! either column major or row major. Both orientations share one type; the
//! translators ask for the orientation they need and conversion happens on
//! demand.

use crate::error::{OslinkError, OslinkResult};
use serde::{Deserialize, Serialize};

/// Orientation of the compressed storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixLayout {
    /// Entries grouped by column; `starts` has one slot per column plus one.
    ColumnMajor,
    /// Entries grouped by row; `starts` has one slot per row plus one.
    RowMajor,
}

/// A sparse matrix in compressed column or row form.
///
/// Invariants are checked at construction: `starts` begins at zero, never
/// decreases, ends at the entry count, and every minor index is in range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    layout: MatrixLayout,
    num_rows: usize,
    num_cols: usize,
    starts: Vec<usize>,
    indexes: Vec<usize>,
    values: Vec<f64>,
}

impl SparseMatrix {
    /// Builds a matrix from compressed arrays, validating their shape.
    pub fn new(
        layout: MatrixLayout,
        num_rows: usize,
        num_cols: usize,
        starts: Vec<usize>,
        indexes: Vec<usize>,
        values: Vec<f64>,
    ) -> OslinkResult<Self> {
        let (major, minor) = match layout {
            MatrixLayout::ColumnMajor => (num_cols, num_rows),
            MatrixLayout::RowMajor => (num_rows, num_cols),
        };
        if starts.len() != major + 1 {
            return Err(OslinkError::MalformedMatrix(format!(
                "expected {} start offsets, got {}",
                major + 1,
                starts.len()
            )));
        }
        if starts[0] != 0 {
            return Err(OslinkError::MalformedMatrix(format!(
                "start offsets must begin at 0, got {}",
                starts[0]
            )));
        }
        for w in starts.windows(2) {
            if w[1] < w[0] {
                return Err(OslinkError::MalformedMatrix(format!(
                    "start offsets decrease from {} to {}",
                    w[0], w[1]
                )));
            }
        }
        let nnz = *starts.last().unwrap_or(&0);
        if indexes.len() != nnz || values.len() != nnz {
            return Err(OslinkError::MalformedMatrix(format!(
                "start offsets declare {} entries but {} indexes and {} values given",
                nnz,
                indexes.len(),
                values.len()
            )));
        }
        if let Some(&bad) = indexes.iter().find(|&&ix| ix >= minor) {
            return Err(OslinkError::MalformedMatrix(format!(
                "entry index {bad} out of range for minor dimension {minor}"
            )));
        }
        Ok(SparseMatrix {
            layout,
            num_rows,
            num_cols,
            starts,
            indexes,
            values,
        })
    }

    /// An all-zero matrix of the given shape.
    pub fn empty(layout: MatrixLayout, num_rows: usize, num_cols: usize) -> Self {
        let major = match layout {
            MatrixLayout::ColumnMajor => num_cols,
            MatrixLayout::RowMajor => num_rows,
        };
        SparseMatrix {
            layout,
            num_rows,
            num_cols,
            starts: vec![0; major + 1],
            indexes: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Builds a matrix from `(row, col, value)` triplets.
    ///
    /// Triplets may be given in any order; duplicates on the same position
    /// are summed.
    pub fn from_triplets(
        layout: MatrixLayout,
        num_rows: usize,
        num_cols: usize,
        triplets: &[(usize, usize, f64)],
    ) -> OslinkResult<Self> {
        for &(r, c, _) in triplets {
            if r >= num_rows || c >= num_cols {
                return Err(OslinkError::MalformedMatrix(format!(
                    "triplet ({r}, {c}) out of range for a {num_rows}x{num_cols} matrix"
                )));
            }
        }
        let mut sorted: Vec<(usize, usize, f64)> = triplets.to_vec();
        match layout {
            MatrixLayout::ColumnMajor => sorted.sort_by_key(|&(r, c, _)| (c, r)),
            MatrixLayout::RowMajor => sorted.sort_by_key(|&(r, c, _)| (r, c)),
        }
        let mut merged: Vec<(usize, usize, f64)> = Vec::with_capacity(sorted.len());
        for &(r, c, v) in &sorted {
            if let Some(last) = merged.last_mut() {
                if last.0 == r && last.1 == c {
                    last.2 += v;
                    continue;
                }
            }
            merged.push((r, c, v));
        }

        let major = match layout {
            MatrixLayout::ColumnMajor => num_cols,
            MatrixLayout::RowMajor => num_rows,
        };
        let mut starts = vec![0usize; major + 1];
        let mut indexes = Vec::with_capacity(merged.len());
        let mut values = Vec::with_capacity(merged.len());
        for &(r, c, v) in &merged {
            let (maj, min) = match layout {
                MatrixLayout::ColumnMajor => (c, r),
                MatrixLayout::RowMajor => (r, c),
            };
            starts[maj + 1] += 1;
            indexes.push(min);
            values.push(v);
        }
        for i in 0..major {
            starts[i + 1] += starts[i];
        }
        SparseMatrix::new(layout, num_rows, num_cols, starts, indexes, values)
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns.
    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Storage orientation.
    pub fn layout(&self) -> MatrixLayout {
        self.layout
    }

    /// Entry indexes and values of one major slice (a column in column-major
    /// storage, a row in row-major storage).
    pub fn segment(&self, major: usize) -> (&[usize], &[f64]) {
        let lo = self.starts[major];
        let hi = self.starts[major + 1];
        (&self.indexes[lo..hi], &self.values[lo..hi])
    }

    /// The raw start offsets.
    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    /// The raw minor indexes.
    pub fn indexes(&self) -> &[usize] {
        &self.indexes
    }

    /// The raw entry values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// This matrix in column-major form, transposing the storage if needed.
    pub fn to_column_major(&self) -> SparseMatrix {
        self.converted(MatrixLayout::ColumnMajor)
    }

    /// This matrix in row-major form, transposing the storage if needed.
    pub fn to_row_major(&self) -> SparseMatrix {
        self.converted(MatrixLayout::RowMajor)
    }

    fn converted(&self, target: MatrixLayout) -> SparseMatrix {
        if self.layout == target {
            return self.clone();
        }
        let (old_major, new_major) = match target {
            MatrixLayout::ColumnMajor => (self.num_rows, self.num_cols),
            MatrixLayout::RowMajor => (self.num_cols, self.num_rows),
        };
        // counting transpose: one pass to size the slices, one to scatter
        let mut starts = vec![0usize; new_major + 1];
        for &ix in &self.indexes {
            starts[ix + 1] += 1;
        }
        for i in 0..new_major {
            starts[i + 1] += starts[i];
        }
        let mut cursor = starts.clone();
        let mut indexes = vec![0usize; self.nnz()];
        let mut values = vec![0f64; self.nnz()];
        for old in 0..old_major {
            for k in self.starts[old]..self.starts[old + 1] {
                let new = self.indexes[k];
                let at = cursor[new];
                indexes[at] = old;
                values[at] = self.values[k];
                cursor[new] += 1;
            }
        }
        SparseMatrix {
            layout: target,
            num_rows: self.num_rows,
            num_cols: self.num_cols,
            starts,
            indexes,
            values,
        }
    }

    /// All entries as `(row, col, value)` triplets in storage order.
    pub fn triplets(&self) -> Vec<(usize, usize, f64)> {
        let mut out = Vec::with_capacity(self.nnz());
        let major_dim = self.starts.len() - 1;
        for major in 0..major_dim {
            for k in self.starts[major]..self.starts[major + 1] {
                let minor = self.indexes[k];
                let (r, c) = match self.layout {
                    MatrixLayout::ColumnMajor => (minor, major),
                    MatrixLayout::RowMajor => (major, minor),
                };
                out.push((r, c, self.values[k]));
            }
        }
        out
    }
}
