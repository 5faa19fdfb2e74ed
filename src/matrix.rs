use crate::utils::ZeroOut;

use rand::Rng;
use rand_distr::Distribution;
use std::convert::TryFrom;
use std::ops::{AddAssign, Index, IndexMut};

/// A dense matrix of `rows` output neurons by `cols` input neurons.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMat")]
pub struct Mat {
    rows: usize,
    cols: usize,
    data: Vec<f64>, // row-major array
}

impl Mat {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Mat::filled(rows, cols, 0.0)
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Mat {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn random<D, R>(distribution: D, rows: usize, cols: usize, rng: &mut R) -> Self
    where
        D: Distribution<f64>,
        R: Rng + ?Sized,
    {
        Mat {
            rows,
            cols,
            data: distribution.sample_iter(rng).take(rows * cols).collect(),
        }
    }

    /// Builds a matrix from one `Vec` per output neuron.
    ///
    /// Returns `None` when the rows are ragged.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != cols) {
            return None;
        }
        Some(Mat {
            rows: rows.len(),
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn same_shape(&self, other: &Mat) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }

    /// The weights leading into output neuron `row`.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Computes `y = self * x`.
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.cols);
        assert_eq!(y.len(), self.rows);
        for (r, y) in y.iter_mut().enumerate() {
            *y = self.row(r).iter().zip(x).map(|(w, x)| w * x).sum();
        }
    }

    /// Computes `y = transpose(self) * x`.
    pub fn mul_vec_transposed(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.rows);
        assert_eq!(y.len(), self.cols);
        y.zero_out();
        for (r, &x) in x.iter().enumerate() {
            for (y, w) in y.iter_mut().zip(self.row(r)) {
                *y += w * x;
            }
        }
    }

    /// Rank-one update `self += x * transpose(y)`.
    pub fn add_outer(&mut self, x: &[f64], y: &[f64]) {
        assert_eq!(x.len(), self.rows);
        assert_eq!(y.len(), self.cols);
        for (row, &x) in self.data.chunks_mut(self.cols).zip(x) {
            for (w, y) in row.iter_mut().zip(y) {
                *w += x * y;
            }
        }
    }
}

/// Deserialized form of `Mat`, checked before it becomes one.
#[derive(Deserialize)]
struct RawMat {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<RawMat> for Mat {
    type Error = String;

    fn try_from(raw: RawMat) -> Result<Self, String> {
        if raw.data.len() != raw.rows * raw.cols {
            return Err(format!(
                "{}x{} matrix needs {} values, but got {}",
                raw.rows,
                raw.cols,
                raw.rows * raw.cols,
                raw.data.len()
            ));
        }
        Ok(Mat {
            rows: raw.rows,
            cols: raw.cols,
            data: raw.data,
        })
    }
}

impl Index<(usize, usize)> for Mat {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Mat {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.data[row * self.cols + col]
    }
}

impl<'a> AddAssign<&'a Mat> for Mat {
    fn add_assign(&mut self, other: &Mat) {
        debug_assert!(self.same_shape(other));
        for (l, r) in self.data.iter_mut().zip(other.data.iter()) {
            *l += *r;
        }
    }
}

impl ZeroOut for Mat {
    fn zero_out(&mut self) {
        self.data.zero_out();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Mat {
        Mat::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap()
    }

    #[test]
    fn ragged_rows() {
        assert!(Mat::from_rows(vec![vec![1.0], vec![1.0, 2.0]]).is_none());
    }

    #[test]
    fn indexing_is_row_major() {
        let m = sample();
        assert_eq!(m[(0, 2)], 3.0);
        assert_eq!(m[(1, 0)], 4.0);
        assert_eq!(m.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn products() {
        let m = sample();
        let mut y = [0.0; 2];
        m.mul_vec(&[1.0, 0.0, -1.0], &mut y);
        assert_eq!(y, [-2.0, -2.0]);

        let mut z = [9.0; 3];
        m.mul_vec_transposed(&[1.0, 1.0], &mut z);
        assert_eq!(z, [5.0, 7.0, 9.0]);
    }

    #[test]
    fn outer_and_add() {
        let mut m = Mat::zeros(2, 3);
        m.add_outer(&[1.0, 2.0], &[1.0, 0.0, -1.0]);
        assert_eq!(m.as_slice(), &[1.0, 0.0, -1.0, 2.0, 0.0, -2.0]);
        m += &sample();
        assert_eq!(m.row(1), &[6.0, 5.0, 4.0]);
        m.zero_out();
        assert_eq!(m, Mat::zeros(2, 3));
    }
}
