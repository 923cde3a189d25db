use fnv::FnvHashMap;
use serde::Serialize;

/// A centroided (or profile) data point
#[derive(PartialEq, PartialOrd, Copy, Clone, Default, Debug, Serialize)]
pub struct Peak {
    pub mz: f64,
    pub intensity: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Representation {
    #[default]
    Profile,
    Centroid,
}

#[derive(Default, Debug, Clone, Serialize)]
pub struct Precursor {
    pub mz: f64,
    pub intensity: Option<f64>,
    pub charge: Option<u8>,
    pub spectrum_ref: Option<String>,
}

impl Precursor {
    /// Scan number of the spectrum this precursor was selected from, taken from
    /// the `scan=<n>` token of a native id such as
    /// `controllerType=0 controllerNumber=1 scan=1234`
    pub fn scan(&self) -> Option<u32> {
        self.spectrum_ref
            .as_deref()?
            .split_whitespace()
            .find_map(|token| token.strip_prefix("scan="))
            .and_then(|scan| scan.parse().ok())
    }
}

/// A spectrum as it comes out of the spectral reader
#[derive(Default, Debug, Clone)]
pub struct RawSpectrum {
    pub ms_level: u8,
    /// Native id string
    pub id: String,
    pub precursors: Vec<Precursor>,
    /// Profile or Centroided data
    pub representation: Representation,
    /// Scan start time, in seconds
    pub scan_start_time: f64,
    /// Ion injection time
    pub ion_injection_time: f64,
    /// Total ion current
    pub total_ion_current: f64,
    /// M/z array
    pub mz: Vec<f64>,
    /// Intensity array
    pub intensity: Vec<f64>,
}

/// An indexed MS2 or MS3 spectrum
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// 1-based position of the spectrum within its file
    pub scan: u32,
    pub ms_level: u8,
    /// Retention time, in seconds
    pub retention_time: f64,
    pub peaks: Vec<Peak>,
    /// For MS3 scans, the MS2 scan that was fragmented
    pub precursor_scan: Option<u32>,
}

impl Spectrum {
    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }
}

/// The MS2 and MS3 spectra of one fraction, addressable by scan number.
///
/// Scan numbers are assigned by stream position, starting at 1, which matches
/// the numbering Crux uses when it reports PSMs. Spectra of every other MS
/// level still take up a position but are not stored. An MS3 precursor
/// reference is resolved through the native ids of the file, so it lands in
/// the same numbering.
#[derive(Debug, Default)]
pub struct SpectrumIndex {
    spectra: Vec<Spectrum>,
    scans: FnvHashMap<u32, usize>,
    // MS2 scan -> arena index of the MS3 scan derived from it
    ms3: FnvHashMap<u32, usize>,
    ppm: f64,
    profile: usize,
}

impl SpectrumIndex {
    pub fn build<I>(spectra: I, ppm: f64) -> Self
    where
        I: IntoIterator<Item = RawSpectrum>,
    {
        let mut index = SpectrumIndex {
            ppm,
            ..Default::default()
        };
        // native id -> scan
        let mut ids: FnvHashMap<String, u32> = FnvHashMap::default();
        let mut parents: Vec<(usize, Precursor)> = Vec::new();
        let mut total = 0;

        for (n, mut raw) in spectra.into_iter().enumerate() {
            let scan = n as u32 + 1;
            total += 1;
            if !raw.id.is_empty() {
                ids.entry(std::mem::take(&mut raw.id)).or_insert(scan);
            }
            if !matches!(raw.ms_level, 2 | 3) {
                continue;
            }
            if raw.representation == Representation::Profile {
                index.profile += 1;
            }

            let ix = index.spectra.len();
            if raw.ms_level == 3 {
                if let Some(precursor) = raw.precursors.first() {
                    parents.push((ix, precursor.clone()));
                }
            }
            index.scans.insert(scan, ix);
            index.spectra.push(Spectrum {
                scan,
                ms_level: raw.ms_level,
                retention_time: raw.scan_start_time,
                peaks: peaks(&raw),
                precursor_scan: None,
            });
        }

        // Parents are resolved once every id is known; the first MS3 acquired
        // from a scan wins
        for (ix, precursor) in parents {
            let parent = precursor
                .spectrum_ref
                .as_ref()
                .and_then(|id| ids.get(id).copied())
                .or_else(|| precursor.scan());
            match parent {
                Some(parent) => {
                    index.spectra[ix].precursor_scan = Some(parent);
                    index.ms3.entry(parent).or_insert(ix);
                }
                None => log::debug!(
                    "MS3 scan {} has no resolvable precursor reference",
                    index.spectra[ix].scan
                ),
            }
        }

        if index.profile > 0 {
            log::warn!(
                "{} MSn spectra are in profile mode, reporter ions will be summed over raw data points",
                index.profile
            );
        }
        log::info!(
            "parsed {} spectra, indexed {} MSn spectra",
            total,
            index.spectra.len()
        );
        index
    }

    pub fn find_spectrum(&self, scan: u32) -> Option<&Spectrum> {
        self.scans.get(&scan).map(|&ix| &self.spectra[ix])
    }

    /// Locate the MS3 scan acquired from the MS2 scan `scan`
    pub fn find_ms3_for(&self, scan: u32) -> Option<&Spectrum> {
        self.ms3.get(&scan).map(|&ix| &self.spectra[ix])
    }

    /// Mass tolerance (ppm) this fraction is quantified with
    pub fn ppm(&self) -> f64 {
        self.ppm
    }

    /// Number of indexed MS2 and MS3 spectra
    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }
}

fn peaks(raw: &RawSpectrum) -> Vec<Peak> {
    raw.mz
        .iter()
        .zip(raw.intensity.iter())
        .map(|(&mz, &intensity)| Peak { mz, intensity })
        .collect()
}
