// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Fixed-length resource count vectors and matrices
//!
//! Every elementwise operation is spelled out explicitly. Lengths are checked
//! once at the ledger's entry points; the arithmetic helpers here assume
//! equal lengths and, for subtraction, that the subtrahend is not larger.

use std::fmt;
use std::ops::Index;

use serde::{Serialize, Serializer};

/// One count per resource type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct ResourceVector(Vec<u32>);

impl ResourceVector {
    /// Create a vector of `len` zeros
    pub fn zeros(len: usize) -> Self {
        Self(vec![0; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.0.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// Elementwise `self <= other`. Vectors of different length never compare.
    pub fn le(&self, other: &ResourceVector) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a <= b)
    }

    /// Whether every component is zero
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0)
    }

    /// Elementwise `self += other`
    pub fn add_assign(&mut self, other: &ResourceVector) {
        debug_assert_eq!(self.len(), other.len());
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a += *b;
        }
    }

    /// Elementwise `self -= other`; requires `other.le(self)`
    pub fn sub_assign(&mut self, other: &ResourceVector) {
        debug_assert!(other.le(self));
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a -= *b;
        }
    }

    /// Elementwise saturating `self += other`, for work vectors whose only use
    /// is comparison against needs
    pub fn accumulate(&mut self, other: &ResourceVector) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a = a.saturating_add(*b);
        }
    }

    /// Elementwise `self - other`, or `None` if any component would go negative
    pub fn checked_sub(&self, other: &ResourceVector) -> Option<ResourceVector> {
        if !other.le(self) {
            return None;
        }
        Some(Self(self.0.iter().zip(&other.0).map(|(a, b)| a - b).collect()))
    }
}

impl From<Vec<u32>> for ResourceVector {
    fn from(values: Vec<u32>) -> Self {
        Self(values)
    }
}

impl From<&[u32]> for ResourceVector {
    fn from(values: &[u32]) -> Self {
        Self(values.to_vec())
    }
}

impl Index<usize> for ResourceVector {
    type Output = u32;

    fn index(&self, index: usize) -> &u32 {
        &self.0[index]
    }
}

impl fmt::Display for ResourceVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, "]")
    }
}

/// A `rows x cols` matrix of counts, stored row by row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    cols: usize,
    rows: Vec<ResourceVector>,
}

impl Matrix {
    /// Create a `rows x cols` matrix of zeros
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            rows: vec![ResourceVector::zeros(cols); rows],
        }
    }

    /// Build a matrix from nested rows, checking it is exactly `rows x cols`.
    ///
    /// On mismatch returns the offending shape: the row count if that is
    /// wrong, otherwise the length of the first ragged row.
    pub fn from_rows(values: Vec<Vec<u32>>, rows: usize, cols: usize) -> Result<Self, (usize, usize)> {
        if values.len() != rows {
            let found_cols = values.first().map_or(cols, Vec::len);
            return Err((values.len(), found_cols));
        }
        if let Some(ragged) = values.iter().find(|row| row.len() != cols) {
            return Err((rows, ragged.len()));
        }
        Ok(Self {
            cols,
            rows: values.into_iter().map(ResourceVector::from).collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Shape as `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols)
    }

    pub fn row(&self, index: usize) -> Option<&ResourceVector> {
        self.rows.get(index)
    }

    pub(crate) fn row_mut(&mut self, index: usize) -> Option<&mut ResourceVector> {
        self.rows.get_mut(index)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &ResourceVector> {
        self.rows.iter()
    }

    /// Sum of one column, widened so it cannot overflow
    pub fn column_sum(&self, col: usize) -> u64 {
        self.rows.iter().filter_map(|r| r.get(col)).map(u64::from).sum()
    }

    /// Row-wise `self - other`. On failure returns the first row where a
    /// component of `other` exceeds `self`.
    pub fn checked_sub(&self, other: &Matrix) -> Result<Matrix, usize> {
        let mut rows = Vec::with_capacity(self.rows.len());
        for (index, (a, b)) in self.rows.iter().zip(&other.rows).enumerate() {
            rows.push(a.checked_sub(b).ok_or(index)?);
        }
        Ok(Matrix { cols: self.cols, rows })
    }
}

impl Serialize for Matrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}
