//! Reporter ion quantification

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::psm::Psm;
use crate::spectrum::{Peak, SpectrumIndex};
use crate::tmt::column_name;

/// Header of the total spectrum intensity column
pub const SPECTRUM_INTENSITY: &str = "spectrum_int";
/// Suffix appended to reporter columns after contaminant correction
pub const CORRECTED_SUFFIX: &str = "_cor";

/// Which spectrum carries the reporter ions of an identified MS2 scan
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum QuantLevel {
    /// Reporters are read from the identified MS2 spectrum
    #[default]
    Ms2,
    /// Reporters are read from the synchronous-precursor MS3 spectrum
    /// acquired from the identified MS2 spectrum
    Ms3,
}

impl TryFrom<u8> for QuantLevel {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            2 => Ok(QuantLevel::Ms2),
            3 => Ok(QuantLevel::Ms3),
            _ => Err(format!("unsupported quantification level {}: expected 2 or 3", level)),
        }
    }
}

impl From<QuantLevel> for u8 {
    fn from(level: QuantLevel) -> u8 {
        match level {
            QuantLevel::Ms2 => 2,
            QuantLevel::Ms3 => 3,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantSettings {
    /// Decimal places reported intensities are rounded to
    pub digits: u32,
    pub level: QuantLevel,
}

impl Default for QuantSettings {
    fn default() -> Self {
        Self {
            digits: 2,
            level: QuantLevel::Ms2,
        }
    }
}

/// Reporter intensities of a single quantified PSM
#[derive(Clone, Debug, PartialEq)]
pub struct QuantRow {
    /// Position of the quantified PSM in the run-wide list of selected PSMs
    pub psm: usize,
    pub file_idx: usize,
    pub scan: u32,
    /// One intensity per reporter channel
    pub intensities: Vec<f64>,
    /// Summed intensity of every peak in the spectrum
    pub spectrum_intensity: f64,
    pub corrected: Option<Vec<f64>>,
}

impl QuantRow {
    /// Corrected intensities if correction was applied, raw intensities otherwise
    pub fn values(&self) -> &[f64] {
        self.corrected.as_deref().unwrap_or(&self.intensities)
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct QuantTable {
    pub reporters: Vec<f64>,
    pub rows: Vec<QuantRow>,
    pub corrected: bool,
}

impl QuantTable {
    pub fn new(reporters: Vec<f64>) -> Self {
        Self {
            reporters,
            rows: Vec::new(),
            corrected: false,
        }
    }

    /// `m<mass>` column names, in reporter order
    pub fn reporter_headers(&self) -> Vec<String> {
        self.reporters.iter().map(|&mass| column_name(mass)).collect()
    }

    /// `m<mass>_cor` column names, in reporter order
    pub fn corrected_headers(&self) -> Vec<String> {
        self.reporters
            .iter()
            .map(|&mass| format!("{}{}", column_name(mass), CORRECTED_SUFFIX))
            .collect()
    }

    /// Every quantification column, in output order
    pub fn headers(&self) -> Vec<String> {
        let mut headers = self.reporter_headers();
        headers.push(SPECTRUM_INTENSITY.into());
        if self.corrected {
            headers.extend(self.corrected_headers());
        }
        headers
    }

    /// Names of the channels returned by [`QuantRow::values`]
    pub fn channel_headers(&self) -> Vec<String> {
        match self.corrected {
            true => self.corrected_headers(),
            false => self.reporter_headers(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Round `x` to `digits` decimal places
pub fn round_to(x: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (x * factor).round() / factor
}

/// Sum the intensity of every peak falling strictly inside the
/// `r ± r * (ppm / 2) * 1e-6` window of each reporter `r`.
///
/// Returns the per-reporter intensities and the total intensity of the
/// spectrum, both rounded to `digits` decimals. A missing spectrum, or
/// non-finite peaks, contribute nothing.
pub fn quantify(
    peaks: Option<&[Peak]>,
    reporters: &[f64],
    ppm: f64,
    digits: u32,
) -> (Vec<f64>, f64) {
    let peaks = peaks.unwrap_or_default();
    let valid = || {
        peaks
            .iter()
            .filter(|peak| peak.mz.is_finite() && peak.intensity.is_finite())
    };

    let intensities = reporters
        .iter()
        .map(|&r| {
            let delta = r * (ppm / 2.0) * 1e-6;
            let (lo, hi) = (r - delta, r + delta);
            // `Sum` starts from -0.0, so an empty window would print as "-0.0"
            let sum = valid()
                .filter(|peak| lo < peak.mz && peak.mz < hi)
                .fold(0.0, |acc, peak| acc + peak.intensity);
            round_to(sum, digits)
        })
        .collect();

    let total = valid().fold(0.0, |acc, peak| acc + peak.intensity);
    (intensities, round_to(total, digits))
}

/// Quantify every PSM of one fraction against that fraction's spectra.
///
/// Reporter windows use the mass tolerance the index was built with.
/// `offset` is the position of `psms[0]` in the run-wide PSM list, so that
/// each [`QuantRow::psm`] points back into it. PSMs whose spectrum cannot be
/// located are logged and produce no row; the remaining rows keep the order
/// of `psms`.
pub fn quantify_fraction(
    index: &SpectrumIndex,
    psms: &[Psm],
    offset: usize,
    reporters: &[f64],
    settings: &QuantSettings,
) -> Vec<QuantRow> {
    psms.par_iter()
        .enumerate()
        .filter_map(|(ix, psm)| {
            let spectrum = match index.find_spectrum(psm.scan) {
                Some(spectrum) => spectrum,
                None => {
                    log::error!(
                        "fraction {}: scan {} is not an MS2 or MS3 spectrum of the spectral file, skipping",
                        psm.file_idx,
                        psm.scan
                    );
                    return None;
                }
            };

            let spectrum = match settings.level {
                QuantLevel::Ms2 => spectrum,
                QuantLevel::Ms3 => match index.find_ms3_for(psm.scan) {
                    Some(ms3) => ms3,
                    None => {
                        log::error!(
                            "fraction {}: no MS3 scan was acquired from scan {}, skipping",
                            psm.file_idx,
                            psm.scan
                        );
                        return None;
                    }
                },
            };

            let (intensities, spectrum_intensity) =
                quantify(Some(spectrum.peaks()), reporters, index.ppm(), settings.digits);

            Some(QuantRow {
                psm: offset + ix,
                file_idx: psm.file_idx,
                scan: psm.scan,
                intensities,
                spectrum_intensity,
                corrected: None,
            })
        })
        .collect()
}
