//! Matrix type for 2D numeric data.

use super::Vector;
use crate::error::{BloomError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A 2D matrix of `f64` values (row-major storage).
///
/// Rows are observations, columns are features. Row order is significant:
/// the temporal split relies on it representing time.
///
/// # Examples
///
/// ```
/// use bloomcast::primitives::Matrix;
///
/// let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("6 = 2 * 3");
/// assert_eq!(m.shape(), (2, 3));
/// assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Creates a new matrix from row-major data.
    ///
    /// # Errors
    ///
    /// Returns an error if data length doesn't match rows * cols.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(BloomError::dimension_mismatch(
                "rows * cols",
                rows * cols,
                data.len(),
            ));
        }
        Ok(Self { data, rows, cols })
    }

    /// Creates a matrix from a slice of equally long rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows have different lengths.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(BloomError::dimension_mismatch("row length", cols, row.len()));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data,
            rows: rows.len(),
            cols,
        })
    }

    /// Creates a matrix of zeros.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Returns the shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Gets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Sets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// Returns a row as a slice.
    ///
    /// # Panics
    ///
    /// Panics if `row_idx` is out of bounds.
    #[must_use]
    pub fn row(&self, row_idx: usize) -> &[f64] {
        let start = row_idx * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Iterates over rows in storage order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact(0) panics, zero-width matrices yield empty rows instead
        let cols = self.cols;
        (0..self.rows).map(move |i| &self.data[i * cols..(i + 1) * cols])
    }

    /// Returns a column as a Vector.
    #[must_use]
    pub fn column(&self, col_idx: usize) -> Vector {
        (0..self.rows)
            .map(|row| self.data[row * self.cols + col_idx])
            .collect()
    }

    /// Returns the underlying data as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Copies a contiguous block of rows, preserving their order.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the row count.
    #[must_use]
    pub fn slice_rows(&self, range: Range<usize>) -> Self {
        let rows = range.len();
        let data = self.data[range.start * self.cols..range.end * self.cols].to_vec();
        Self {
            data,
            rows,
            cols: self.cols,
        }
    }

    /// Copies the rows at `indices`, in the order given.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &idx in indices {
            data.extend_from_slice(self.row(idx));
        }
        Self {
            data,
            rows: indices.len(),
            cols: self.cols,
        }
    }

    /// Prepends a column of ones (the intercept column of a design matrix).
    #[must_use]
    pub fn with_intercept_column(&self) -> Self {
        let mut data = Vec::with_capacity(self.rows * (self.cols + 1));
        for row in self.rows() {
            data.push(1.0);
            data.extend_from_slice(row);
        }
        Self {
            data,
            rows: self.rows,
            cols: self.cols + 1,
        }
    }

    /// Transposes the matrix.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut data = vec![0.0; self.rows * self.cols];
        for i in 0..self.rows {
            for j in 0..self.cols {
                data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        Self {
            data,
            rows: self.cols,
            cols: self.rows,
        }
    }

    /// Matrix-matrix multiplication.
    ///
    /// # Errors
    ///
    /// Returns an error if dimensions don't match.
    pub fn matmul(&self, other: &Self) -> Result<Self> {
        if self.cols != other.rows {
            return Err(BloomError::dimension_mismatch(
                "matmul inner dimension",
                self.cols,
                other.rows,
            ));
        }

        let mut result = vec![0.0; self.rows * other.cols];
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.get(i, k);
                for j in 0..other.cols {
                    result[i * other.cols + j] += a * other.get(k, j);
                }
            }
        }

        Ok(Self {
            data: result,
            rows: self.rows,
            cols: other.cols,
        })
    }

    /// Matrix-vector multiplication.
    ///
    /// # Errors
    ///
    /// Returns an error if dimensions don't match.
    pub fn matvec(&self, vec: &Vector) -> Result<Vector> {
        if self.cols != vec.len() {
            return Err(BloomError::dimension_mismatch(
                "matrix columns",
                self.cols,
                vec.len(),
            ));
        }

        Ok(self
            .rows()
            .map(|row| row.iter().zip(vec.iter()).map(|(a, b)| a * b).sum())
            .collect())
    }

    /// Solves the linear system Ax = b using Cholesky decomposition.
    ///
    /// The matrix must be symmetric positive definite.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is not square or not positive definite.
    pub fn cholesky_solve(&self, b: &Vector) -> Result<Vector> {
        if self.rows != self.cols {
            return Err(BloomError::DimensionMismatch {
                expected: "square matrix".to_string(),
                actual: format!("{}x{}", self.rows, self.cols),
            });
        }
        if self.rows != b.len() {
            return Err(BloomError::dimension_mismatch("matrix rows", self.rows, b.len()));
        }

        let n = self.rows;

        // A = L * L^T
        let mut l = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..=i {
                let mut sum = 0.0;
                if i == j {
                    for k in 0..j {
                        sum += l[j * n + k] * l[j * n + k];
                    }
                    let diag = self.get(j, j) - sum;
                    if diag <= 0.0 || !diag.is_finite() {
                        return Err(BloomError::SingularMatrix);
                    }
                    l[j * n + j] = diag.sqrt();
                } else {
                    for k in 0..j {
                        sum += l[i * n + k] * l[j * n + k];
                    }
                    l[i * n + j] = (self.get(i, j) - sum) / l[j * n + j];
                }
            }
        }

        // L * y = b
        let mut y = vec![0.0; n];
        for i in 0..n {
            let mut sum = 0.0;
            for j in 0..i {
                sum += l[i * n + j] * y[j];
            }
            y[i] = (b[i] - sum) / l[i * n + i];
        }

        // L^T * x = y
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut sum = 0.0;
            for j in (i + 1)..n {
                sum += l[j * n + i] * x[j];
            }
            x[i] = (y[i] - sum) / l[i * n + i];
        }

        Ok(Vector::from_vec(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matrix {
        Matrix::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("3x2")
    }

    #[test]
    fn test_from_vec_error() {
        let result = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(BloomError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_from_rows() {
        let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).expect("equal rows");
        assert_eq!(m.shape(), (2, 2));
        assert!((m.get(1, 0) - 3.0).abs() < 1e-12);

        let ragged = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]);
        assert!(ragged.is_err());
    }

    #[test]
    fn test_slice_rows_preserves_order() {
        let m = sample();
        let tail = m.slice_rows(1..3);
        assert_eq!(tail.shape(), (2, 2));
        assert_eq!(tail.row(0), &[3.0, 4.0]);
        assert_eq!(tail.row(1), &[5.0, 6.0]);
    }

    #[test]
    fn test_select_rows() {
        let m = sample();
        let picked = m.select_rows(&[2, 0]);
        assert_eq!(picked.as_slice(), &[5.0, 6.0, 1.0, 2.0]);
    }

    #[test]
    fn test_column() {
        let col = sample().column(1);
        assert_eq!(col.as_slice(), &[2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_transpose() {
        let t = sample().transpose();
        assert_eq!(t.shape(), (2, 3));
        assert_eq!(t.row(0), &[1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_matmul() {
        // 2x3 * 3x2 = 2x2
        let a = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("2x3");
        let b = Matrix::from_vec(3, 2, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]).expect("3x2");
        let c = a.matmul(&b).expect("compatible");
        assert_eq!(c.as_slice(), &[58.0, 64.0, 139.0, 154.0]);
        assert!(b.matmul(&b).is_err());
    }

    #[test]
    fn test_matvec() {
        let v = Vector::from_slice(&[1.0, 1.0]);
        let r = sample().matvec(&v).expect("compatible");
        assert_eq!(r.as_slice(), &[3.0, 7.0, 11.0]);
    }

    #[test]
    fn test_intercept_column() {
        let m = sample().with_intercept_column();
        assert_eq!(m.shape(), (3, 3));
        assert_eq!(m.row(2), &[1.0, 5.0, 6.0]);
    }

    #[test]
    fn test_cholesky_solve() {
        // [[4, 2], [2, 3]] x = [2, 1]  ->  x = [0.5, 0]
        let a = Matrix::from_vec(2, 2, vec![4.0, 2.0, 2.0, 3.0]).expect("2x2");
        let x = a
            .cholesky_solve(&Vector::from_slice(&[2.0, 1.0]))
            .expect("positive definite");
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_singular() {
        let a = Matrix::from_vec(2, 2, vec![1.0, 1.0, 1.0, 1.0]).expect("2x2");
        let result = a.cholesky_solve(&Vector::from_slice(&[1.0, 1.0]));
        assert!(matches!(result, Err(BloomError::SingularMatrix)));
    }
}
