use std::fmt;
use std::ops::{Index, IndexMut};

/// Dense, row-major matrix of `f64`
#[derive(Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    pub rows: usize,
    pub cols: usize,
}

impl Matrix {
    /// # Panics
    ///
    /// Panics if `data` does not hold exactly `rows * cols` values
    pub fn new<T: Into<Vec<f64>>>(data: T, rows: usize, cols: usize) -> Matrix {
        let data = data.into();
        assert_eq!(
            data.len(),
            rows * cols,
            "{} values cannot fill a ({}, {}) matrix",
            data.len(),
            rows,
            cols
        );
        Matrix { data, rows, cols }
    }

    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix::new(vec![0.0; rows * cols], rows, cols)
    }

    pub fn identity(n: usize) -> Matrix {
        let mut eye = Matrix::zeros(n, n);
        (0..n).for_each(|i| eye[(i, i)] = 1.0);
        eye
    }

    /// Single column matrix
    pub fn col_vector(data: Vec<f64>) -> Matrix {
        let rows = data.len();
        Matrix::new(data, rows, 1)
    }

    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn col(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().skip(col).step_by(self.cols.max(1)).copied()
    }

    pub fn transpose(&self) -> Matrix {
        let data = (0..self.cols).flat_map(|col| self.col(col)).collect::<Vec<_>>();
        Matrix::new(data, self.cols, self.rows)
    }

    /// Matrix-vector product
    pub fn dotv(&self, rhs: &[f64]) -> Vec<f64> {
        assert_eq!(
            self.cols,
            rhs.len(),
            "lhs has shape ({},{}), rhs has length {}",
            self.rows,
            self.cols,
            rhs.len()
        );
        (0..self.rows)
            .map(|row| self.row(row).iter().zip(rhs).map(|(x, y)| x * y).sum())
            .collect()
    }

    pub fn dot(&self, rhs: &Matrix) -> Matrix {
        assert_eq!(
            self.cols, rhs.rows,
            "lhs has shape ({},{}), rhs has shape ({},{})",
            self.rows, self.cols, rhs.rows, rhs.cols
        );
        let rhs_t = rhs.transpose();
        let data = (0..self.rows)
            .flat_map(|row| (0..rhs.cols).map(move |col| (row, col)))
            .map(|(row, col)| {
                self.row(row)
                    .iter()
                    .zip(rhs_t.row(col))
                    .map(|(x, y)| x * y)
                    .sum::<f64>()
            })
            .collect::<Vec<_>>();
        Matrix::new(data, self.rows, rhs.cols)
    }

    /// New matrix made of the given columns, in the given order
    pub fn select_cols(&self, cols: &[usize]) -> Matrix {
        let data = (0..self.rows)
            .flat_map(|row| cols.iter().map(move |&col| self[(row, col)]))
            .collect::<Vec<_>>();
        Matrix::new(data, self.rows, cols.len())
    }

    /// Sum of each column
    pub fn col_sums(&self) -> Vec<f64> {
        (0..self.cols).map(|col| self.col(col).sum()).collect()
    }

    /// Largest absolute column sum (matrix 1-norm)
    pub fn norm1(&self) -> f64 {
        (0..self.cols)
            .map(|col| self.col(col).map(f64::abs).sum::<f64>())
            .fold(0.0, f64::max)
    }

    pub(super) fn swap_rows(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        let (lo, hi) = (i.min(j), i.max(j));
        let (head, tail) = self.data.split_at_mut(hi * self.cols);
        head[lo * self.cols..(lo + 1) * self.cols].swap_with_slice(&mut tail[..self.cols]);
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        &self.data[self.cols * row + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Self::Output {
        &mut self.data[self.cols * row + col]
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries((0..self.rows).map(|row| self.row(row)))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transpose() {
        let mat = Matrix::new(vec![1., 2., 3., 4., 5., 6.], 3, 2);
        assert_eq!(mat[(2, 0)], 5.);

        let t = mat.transpose();
        assert_eq!(t.shape(), (2, 3));
        assert_eq!(t.row(0), &[1., 3., 5.]);
        assert_eq!(t.row(1), &[2., 4., 6.]);
        assert_eq!(t.transpose(), mat);
    }

    #[test]
    fn products() {
        #[rustfmt::skip]
        let a = Matrix::new(vec![
            1., 0., 1.,
            2., 1., 1.,
            0., 1., 1.,
            1., 1., 2.,
        ], 4, 3);
        #[rustfmt::skip]
        let b = Matrix::new(vec![
            1., 2., 1.,
            2., 3., 1.,
            4., 2., 2.,
        ], 3, 3);

        #[rustfmt::skip]
        let expected = Matrix::new(vec![
            5., 4., 3.,
            8., 9., 5.,
            6., 5., 3.,
            11., 9., 6.,
        ], 4, 3);
        assert_eq!(a.dot(&b), expected);

        let d = Matrix::new(vec![1., 2., 3., 4., 5., 6.], 2, 3);
        assert_eq!(d.dotv(&[7., 9., 11.]), vec![58., 139.]);
        assert_eq!(
            d.dot(&Matrix::col_vector(vec![7., 9., 11.])),
            Matrix::col_vector(vec![58., 139.])
        );
    }

    #[test]
    fn columns() {
        let a = Matrix::new(vec![1., -2., 3., 4., 5., -6.], 2, 3);
        assert_eq!(a.col(1).collect::<Vec<_>>(), vec![-2., 5.]);
        assert_eq!(a.col_sums(), vec![5., 3., -3.]);
        assert_eq!(a.norm1(), 9.);
        assert_eq!(
            a.select_cols(&[2, 0]),
            Matrix::new(vec![3., 1., -6., 4.], 2, 2)
        );
    }

    #[test]
    fn row_swaps() {
        let mut a = Matrix::new(vec![1., 2., 3., 4., 5., 6.], 3, 2);
        a.swap_rows(2, 0);
        assert_eq!(a, Matrix::new(vec![5., 6., 3., 4., 1., 2.], 3, 2));
        a.swap_rows(1, 1);
        assert_eq!(a.row(1), &[3., 4.]);
    }
}
