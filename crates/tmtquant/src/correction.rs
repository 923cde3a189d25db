//! Isobaric cross-channel contamination correction
//!
//! Each observed reporter channel receives signal from its own label and
//! from isotopic impurities of neighbouring labels. With the contaminant
//! matrix `M` (rows are observed channels, columns are true channels,
//! normalised so each column sums to 1), the true intensities `x` of a PSM
//! satisfy `M · x = observed`.

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::linalg::{nnls, Gauss, Matrix};
use crate::quant::{QuantRow, QuantTable};
use crate::{Error, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionMethod {
    /// Non-negative least squares
    #[default]
    Nnls,
    /// Exact solution of the linear system; may yield negative intensities
    Exact,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContaminantMatrix {
    /// True (column) channel names
    pub channels: Vec<String>,
    /// Observed (row) channel names
    pub observed: Vec<String>,
    pub matrix: Matrix,
}

impl ContaminantMatrix {
    /// Read a comma-delimited matrix. The first row holds the true channel
    /// names (its first cell is ignored), and the first column holds the
    /// observed channel names.
    pub fn from_reader<R: std::io::Read>(rdr: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().from_reader(rdr);
        let channels = rdr
            .headers()?
            .iter()
            .skip(1)
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();

        let mut observed = Vec::new();
        let mut data = Vec::new();
        for record in rdr.records() {
            let record = record?;
            observed.push(record.get(0).unwrap_or_default().trim().to_string());
            for (value, channel) in record.iter().skip(1).zip(&channels) {
                let value = value.trim();
                data.push(value.parse::<f64>().map_err(|_| Error::InvalidField {
                    column: channel.clone(),
                    value: value.into(),
                })?);
            }
        }

        let matrix = Matrix::new(data, observed.len(), channels.len());
        Ok(ContaminantMatrix {
            channels,
            observed,
            matrix,
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Scale every column to sum to 1
    pub fn normalize(&self) -> Result<Matrix> {
        let sums = self.matrix.col_sums();
        if let Some(col) = sums.iter().position(|&s| s == 0.0 || !s.is_finite()) {
            return Err(Error::DegenerateMatrix(self.channels[col].clone()));
        }

        let mut normalized = self.matrix.clone();
        for row in 0..normalized.rows {
            for (col, sum) in sums.iter().enumerate() {
                normalized[(row, col)] /= sum;
            }
        }
        Ok(normalized)
    }
}

/// Produce a new table whose rows carry contaminant-corrected intensities,
/// solved from the raw reporter intensities of each row
pub fn correct(
    table: &QuantTable,
    contaminants: &ContaminantMatrix,
    method: CorrectionMethod,
) -> Result<QuantTable> {
    let n = table.reporters.len();
    let (rows, cols) = contaminants.matrix.shape();
    if cols != n {
        return Err(Error::DimensionMismatch {
            axis: "columns",
            expected: n,
            found: cols,
        });
    }
    if rows != n {
        return Err(Error::DimensionMismatch {
            axis: "rows",
            expected: n,
            found: rows,
        });
    }

    let normalized = contaminants.normalize()?;

    let solve: Box<dyn Fn(&[f64]) -> Vec<f64> + Sync> = match method {
        CorrectionMethod::Nnls => Box::new(move |observed: &[f64]| nnls(&normalized, observed)),
        CorrectionMethod::Exact => {
            // The same system is solved for every row, so invert once
            let inverse =
                Gauss::solve(normalized, Matrix::identity(n)).ok_or(Error::SingularMatrix)?;
            Box::new(move |observed: &[f64]| inverse.dotv(observed))
        }
    };

    let rows = table
        .rows
        .par_iter()
        .map(|row| QuantRow {
            corrected: Some(solve(&row.intensities)),
            ..row.clone()
        })
        .collect::<Vec<_>>();

    log::info!("corrected {} rows for reporter ion contamination", rows.len());

    Ok(QuantTable {
        reporters: table.reporters.clone(),
        rows,
        corrected: true,
    })
}
