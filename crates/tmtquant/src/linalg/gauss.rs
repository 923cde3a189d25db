//! Gauss-Jordan elimination with partial pivoting

use super::Matrix;

/// Pivots smaller than this, relative to the largest entry of `left`, make
/// the system singular
const EPS: f64 = 1e-12;

/// Augmented system `left · x = right`
#[derive(Debug)]
pub struct Gauss {
    pub left: Matrix,
    pub right: Matrix,
}

impl Gauss {
    /// Solve `left · x = right` for a square, full-rank `left`. Every column
    /// of `right` is solved for at once, so passing the identity yields the
    /// inverse. Returns `None` if `left` is singular.
    pub fn solve(left: Matrix, right: Matrix) -> Option<Matrix> {
        if left.rows != left.cols || left.rows != right.rows {
            return None;
        }
        let mut g = Gauss { left, right };
        match g.eliminate() {
            true => Some(g.right),
            false => None,
        }
    }

    /// Single right-hand side vector
    pub fn solve_vec(left: Matrix, right: &[f64]) -> Option<Vec<f64>> {
        Gauss::solve(left, Matrix::col_vector(right.to_vec())).map(|x| x.col(0).collect())
    }

    /// Reduce `left` to the identity, applying the same row operations to
    /// `right`. False if a column has no usable pivot.
    fn eliminate(&mut self) -> bool {
        let n = self.left.rows;
        let scale = (0..n)
            .flat_map(|i| self.left.row(i).iter().map(|x| x.abs()))
            .fold(0.0, f64::max);
        if n > 0 && !(scale.is_finite() && scale > 0.0) {
            return false;
        }

        for k in 0..n {
            let pivot = (k..n).max_by(|&a, &b| {
                self.left[(a, k)].abs().total_cmp(&self.left[(b, k)].abs())
            });
            let p = match pivot {
                Some(p) if self.left[(p, k)].abs() > EPS * scale => p,
                _ => return false,
            };
            self.left.swap_rows(k, p);
            self.right.swap_rows(k, p);

            let d = self.left[(k, k)];
            for j in 0..n {
                self.left[(k, j)] /= d;
            }
            for j in 0..self.right.cols {
                self.right[(k, j)] /= d;
            }
            self.left[(k, k)] = 1.0;

            for i in (0..n).filter(|&i| i != k) {
                let factor = self.left[(i, k)];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n {
                    self.left[(i, j)] -= factor * self.left[(k, j)];
                }
                for j in 0..self.right.cols {
                    self.right[(i, j)] -= factor * self.right[(k, j)];
                }
                self.left[(i, k)] = 0.0;
            }
        }
        true
    }
}
