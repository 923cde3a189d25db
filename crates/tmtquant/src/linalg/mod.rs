//! Small dense linear algebra kernels used for isotopic impurity correction

pub mod gauss;
pub mod matrix;
pub mod nnls;

pub use gauss::Gauss;
pub use matrix::Matrix;
pub use nnls::nnls;

pub fn all_close(lhs: &[f64], rhs: &[f64], eps: f64) -> bool {
    lhs.len() == rhs.len() && lhs.iter().zip(rhs).all(|(l, r)| (l - r).abs() <= eps)
}
