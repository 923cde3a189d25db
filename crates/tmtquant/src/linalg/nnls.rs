//! Non-negative least squares, after Lawson & Hanson (1974), "Solving Least
//! Squares Problems", chapter 23.
//!
//! Finds `x >= 0` minimizing `||A·x - b||²`. The unconstrained subproblem on
//! the passive set is solved through the normal equations, which is adequate
//! for the small (at most 16 x 16), diagonally dominant mixing matrices used
//! for reporter ion correction.

use super::{Gauss, Matrix};

pub fn nnls(a: &Matrix, b: &[f64]) -> Vec<f64> {
    assert_eq!(
        a.rows,
        b.len(),
        "lhs has shape ({},{}), rhs has length {}",
        a.rows,
        a.cols,
        b.len()
    );
    let n = a.cols;
    let at = a.transpose();
    let tol = 10.0 * f64::EPSILON * a.norm1() * a.rows.max(n) as f64;
    let max_iter = 3 * n;

    let mut x = vec![0.0; n];
    let mut passive = vec![false; n];

    // Negative gradient of the objective
    let gradient = |x: &[f64]| -> Vec<f64> {
        let ax = a.dotv(x);
        let residual = b.iter().zip(&ax).map(|(b, ax)| b - ax).collect::<Vec<_>>();
        at.dotv(&residual)
    };

    let mut w = gradient(&x);
    let mut iter = 0;

    loop {
        // Most promising variable that is still clamped at zero
        let next = (0..n)
            .filter(|&j| !passive[j] && w[j] > tol)
            .max_by(|&i, &j| w[i].total_cmp(&w[j]));
        let t = match next {
            Some(t) => t,
            None => break,
        };
        passive[t] = true;

        loop {
            iter += 1;
            if iter > max_iter {
                log::debug!("nnls: iteration limit reached");
                return x;
            }

            let s = match passive_solution(a, b, &passive) {
                Some(s) => s,
                None => {
                    // Column t is collinear with the passive set
                    passive[t] = false;
                    return x;
                }
            };

            if (0..n).filter(|&j| passive[j]).all(|j| s[j] > 0.0) {
                x = s;
                break;
            }

            // Step from x towards s as far as feasibility allows
            let alpha = (0..n)
                .filter(|&j| passive[j] && s[j] <= 0.0)
                .map(|j| match x[j] - s[j] {
                    d if d > 0.0 => x[j] / d,
                    _ => 0.0,
                })
                .fold(f64::INFINITY, f64::min);

            for j in 0..n {
                x[j] += alpha * (s[j] - x[j]);
                if passive[j] && x[j] <= tol {
                    passive[j] = false;
                    x[j] = 0.0;
                }
            }
        }

        w = gradient(&x);
    }

    x
}

/// Unconstrained least squares restricted to the passive columns; entries
/// outside the passive set are zero
fn passive_solution(a: &Matrix, b: &[f64], passive: &[bool]) -> Option<Vec<f64>> {
    let cols = (0..a.cols).filter(|&j| passive[j]).collect::<Vec<_>>();
    let ap = a.select_cols(&cols);
    let apt = ap.transpose();
    let z = Gauss::solve_vec(apt.dot(&ap), &apt.dotv(b))?;

    let mut s = vec![0.0; a.cols];
    for (&j, z) in cols.iter().zip(z) {
        s[j] = z;
    }
    Some(s)
}

#[cfg(test)]
mod test {
    use super::super::all_close;
    use super::*;

    #[test]
    fn identity() {
        let b = [100.0, 0.0, 52.5, 1e6];
        let x = nnls(&Matrix::identity(4), &b);
        assert!(all_close(&x, &b, 1e-6), "{:?}", x);
    }

    #[test]
    fn recovers_nonnegative_solution() {
        #[rustfmt::skip]
        let a = Matrix::new(vec![
            0.9, 0.05, 0.0,
            0.1, 0.9, 0.05,
            0.0, 0.05, 0.95,
        ], 3, 3);
        let truth = [200.0, 50.0, 10.0];
        let b = a.dotv(&truth);
        let x = nnls(&a, &b);
        assert!(all_close(&x, &truth, 1e-6), "{:?}", x);
    }

    #[test]
    fn clamps_negative_components() {
        #[rustfmt::skip]
        let a = Matrix::new(vec![
            0.9, 0.1,
            0.1, 0.9,
        ], 2, 2);
        // The exact solution has a negative second component
        let b = [100.0, 0.0];
        let exact = Gauss::solve_vec(a.clone(), &b).unwrap();
        assert!(exact[1] < 0.0);

        let x = nnls(&a, &b);
        assert!(x.iter().all(|&v| v >= 0.0), "{:?}", x);
        assert_eq!(x[1], 0.0);
        // With x1 = 0 the least squares optimum is (0.9*100 + 0.1*0) / (0.81 + 0.01)
        assert!((x[0] - 90.0 / 0.82).abs() < 1e-6, "{:?}", x);
    }

    #[test]
    fn zero_observation() {
        let a = Matrix::new(vec![0.8, 0.2, 0.2, 0.8], 2, 2);
        assert_eq!(nnls(&a, &[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn overdetermined() {
        let a = Matrix::new(vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0], 3, 2);
        let x = nnls(&a, &[1.0, 2.0, 3.0]);
        assert!(all_close(&x, &[1.0, 2.0], 1e-9), "{:?}", x);
    }
}
