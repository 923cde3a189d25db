//! Streaming mzML reader.
//!
//! Only what reporter ion quantification needs is extracted: MS level, scan
//! time, peak representation, precursor references and the m/z and intensity
//! arrays. Chromatograms and everything outside `<spectrum>` are ignored.

use async_compression::tokio::bufread::ZlibDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tokio::io::{AsyncBufRead, AsyncReadExt};

use crate::spectrum::{Precursor, RawSpectrum, Representation};

// Binary array encoding
const ZLIB_COMPRESSION: &[u8] = b"MS:1000574";
const NO_COMPRESSION: &[u8] = b"MS:1000576";
const FLOAT_64: &[u8] = b"MS:1000523";
const FLOAT_32: &[u8] = b"MS:1000521";
const MZ_ARRAY: &[u8] = b"MS:1000514";
const INTENSITY_ARRAY: &[u8] = b"MS:1000515";

// Spectrum
const MS_LEVEL: &[u8] = b"MS:1000511";
const CENTROID: &[u8] = b"MS:1000127";
const PROFILE: &[u8] = b"MS:1000128";
const TOTAL_ION_CURRENT: &[u8] = b"MS:1000285";

// Scan
const SCAN_START_TIME: &[u8] = b"MS:1000016";
const ION_INJECTION_TIME: &[u8] = b"MS:1000927";
const UNIT_MINUTE: &[u8] = b"UO:0000031";

// Selected ion
const SELECTED_ION_MZ: &[u8] = b"MS:1000744";
const SELECTED_ION_CHARGE: &[u8] = b"MS:1000041";
const SELECTED_ION_INTENSITY: &[u8] = b"MS:1000042";

#[derive(thiserror::Error, Debug)]
pub enum MzMLError {
    #[error("malformed mzML: <{0}> is missing attribute `{1}`")]
    MissingAttribute(String, &'static str),
    #[error("malformed mzML: cannot parse `{0}`")]
    InvalidValue(String),
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("utf8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("error decoding base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Element of a `<spectrum>` the reader is currently inside
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Section {
    Spectrum,
    Scan,
    Precursor,
    SelectedIon,
    BinaryDataArray,
    Binary,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ArrayKind {
    Mz,
    Intensity,
}

#[derive(Copy, Clone, Debug, Default)]
struct Encoding {
    zlib: bool,
    f32: bool,
    kind: Option<ArrayKind>,
}

/// Accession, value and unit of a `<cvParam>`
struct CvParam {
    accession: Vec<u8>,
    value: Option<String>,
    unit: Option<Vec<u8>>,
}

impl CvParam {
    fn from_event(ev: &BytesStart<'_>) -> Result<Self, MzMLError> {
        let accession = ev
            .try_get_attribute(b"accession")?
            .ok_or_else(|| MzMLError::MissingAttribute("cvParam".into(), "accession"))?
            .value
            .into_owned();
        let value = match ev.try_get_attribute(b"value")? {
            Some(attr) => Some(std::str::from_utf8(&attr.value)?.to_string()),
            None => None,
        };
        let unit = ev
            .try_get_attribute(b"unitAccession")?
            .map(|attr| attr.value.into_owned());
        Ok(CvParam {
            accession,
            value,
            unit,
        })
    }

    fn parse<T: std::str::FromStr>(&self) -> Result<T, MzMLError> {
        let value = self.value.as_deref().unwrap_or_default().trim();
        value
            .parse()
            .map_err(|_| MzMLError::InvalidValue(value.to_string()))
    }
}

/// Accumulates the spectrum currently being read
#[derive(Default)]
struct SpectrumBuilder {
    spectrum: RawSpectrum,
    precursor: Precursor,
    encoding: Encoding,
}

impl SpectrumBuilder {
    fn spectrum_cv(&mut self, cv: &CvParam) -> Result<(), MzMLError> {
        match cv.accession.as_slice() {
            MS_LEVEL => self.spectrum.ms_level = cv.parse()?,
            CENTROID => self.spectrum.representation = Representation::Centroid,
            PROFILE => self.spectrum.representation = Representation::Profile,
            TOTAL_ION_CURRENT => self.spectrum.total_ion_current = cv.parse()?,
            _ => {}
        }
        Ok(())
    }

    fn scan_cv(&mut self, cv: &CvParam) -> Result<(), MzMLError> {
        match cv.accession.as_slice() {
            SCAN_START_TIME => {
                let time: f64 = cv.parse()?;
                // Retention times are kept in seconds
                self.spectrum.scan_start_time = match cv.unit.as_deref() {
                    Some(UNIT_MINUTE) => time * 60.0,
                    _ => time,
                };
            }
            ION_INJECTION_TIME => self.spectrum.ion_injection_time = cv.parse()?,
            _ => {}
        }
        Ok(())
    }

    fn selected_ion_cv(&mut self, cv: &CvParam) -> Result<(), MzMLError> {
        match cv.accession.as_slice() {
            SELECTED_ION_MZ => self.precursor.mz = cv.parse()?,
            SELECTED_ION_CHARGE => self.precursor.charge = Some(cv.parse()?),
            SELECTED_ION_INTENSITY => self.precursor.intensity = Some(cv.parse()?),
            _ => {}
        }
        Ok(())
    }

    fn array_cv(&mut self, cv: &CvParam) {
        match cv.accession.as_slice() {
            ZLIB_COMPRESSION => self.encoding.zlib = true,
            NO_COMPRESSION => self.encoding.zlib = false,
            FLOAT_64 => self.encoding.f32 = false,
            FLOAT_32 => self.encoding.f32 = true,
            MZ_ARRAY => self.encoding.kind = Some(ArrayKind::Mz),
            INTENSITY_ARRAY => self.encoding.kind = Some(ArrayKind::Intensity),
            _ => {}
        }
    }

    fn finish_precursor(&mut self) {
        let precursor = std::mem::take(&mut self.precursor);
        self.spectrum.precursors.push(precursor);
    }

    fn finish(&mut self) -> RawSpectrum {
        let spectrum = std::mem::take(&mut self.spectrum);
        if spectrum.mz.len() != spectrum.intensity.len() {
            log::warn!(
                "spectrum {}: m/z and intensity arrays differ in length",
                spectrum.id
            );
        }
        spectrum
    }
}

/// Decode a base64 `<binary>` payload into little-endian floats
async fn decode_array(text: &str, encoding: Encoding) -> Result<Vec<f64>, MzMLError> {
    let decoded = base64::decode(text.trim().as_bytes())?;
    let bytes = match encoding.zlib {
        true => {
            let mut inflated = Vec::with_capacity(decoded.len() * 4);
            ZlibDecoder::new(decoded.as_slice())
                .read_to_end(&mut inflated)
                .await?;
            inflated
        }
        false => decoded,
    };

    let array = match encoding.f32 {
        true => bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        false => bytes
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect(),
    };
    Ok(array)
}

/// Streaming mzML parser.
///
/// Every `<spectrum>` element is returned, in file order, regardless of MS
/// level: downstream scan numbering depends on the position of each spectrum.
#[derive(Default)]
pub struct MzMLReader {}

impl MzMLReader {
    pub async fn parse<B: AsyncBufRead + Unpin>(
        &self,
        b: B,
    ) -> Result<Vec<RawSpectrum>, MzMLError> {
        let mut reader = Reader::from_reader(b);
        let mut buf = Vec::new();

        let mut section = None;
        let mut builder = SpectrumBuilder::default();
        let mut spectra = Vec::new();

        loop {
            match reader.read_event_into_async(&mut buf).await? {
                Event::Start(ev) => {
                    section = match (ev.name().into_inner(), section) {
                        (b"spectrum", _) => {
                            let id = ev.try_get_attribute(b"id")?.ok_or_else(|| {
                                MzMLError::MissingAttribute("spectrum".into(), "id")
                            })?;
                            builder.spectrum.id = std::str::from_utf8(&id.value)?.to_string();
                            Some(Section::Spectrum)
                        }
                        (b"scan", Some(Section::Spectrum)) => Some(Section::Scan),
                        (b"precursor", Some(Section::Spectrum)) => {
                            // spectrumRef is optional
                            if let Some(r) = ev.try_get_attribute(b"spectrumRef")? {
                                builder.precursor.spectrum_ref =
                                    Some(std::str::from_utf8(&r.value)?.to_string());
                            }
                            Some(Section::Precursor)
                        }
                        (b"selectedIon", Some(Section::Precursor)) => Some(Section::SelectedIon),
                        (b"binaryDataArray", Some(Section::Spectrum)) => {
                            builder.encoding = Encoding::default();
                            Some(Section::BinaryDataArray)
                        }
                        (b"binary", Some(Section::BinaryDataArray)) => Some(Section::Binary),
                        _ => section,
                    };
                }
                Event::Empty(ev) if ev.name().into_inner() == b"cvParam" => {
                    let cv = CvParam::from_event(&ev)?;
                    match section {
                        Some(Section::Spectrum) => builder.spectrum_cv(&cv)?,
                        Some(Section::Scan) => builder.scan_cv(&cv)?,
                        Some(Section::SelectedIon) => builder.selected_ion_cv(&cv)?,
                        Some(Section::BinaryDataArray) => builder.array_cv(&cv),
                        _ => {}
                    }
                }
                Event::Text(text) if section == Some(Section::Binary) => {
                    let raw = text.unescape()?;
                    // Empty arrays, and arrays of other kinds, are skipped
                    match builder.encoding.kind {
                        Some(kind) if !raw.trim().is_empty() => {
                            let array = decode_array(&raw, builder.encoding).await?;
                            match kind {
                                ArrayKind::Mz => builder.spectrum.mz = array,
                                ArrayKind::Intensity => builder.spectrum.intensity = array,
                            }
                        }
                        _ => {}
                    }
                }
                Event::End(ev) => {
                    section = match (section, ev.name().into_inner()) {
                        (Some(Section::Binary), b"binary") => Some(Section::BinaryDataArray),
                        (Some(Section::BinaryDataArray), b"binaryDataArray") => {
                            Some(Section::Spectrum)
                        }
                        (Some(Section::SelectedIon), b"selectedIon") => Some(Section::Precursor),
                        (Some(Section::Precursor), b"precursor") => {
                            builder.finish_precursor();
                            Some(Section::Spectrum)
                        }
                        (Some(Section::Scan), b"scan") => Some(Section::Spectrum),
                        (_, b"spectrum") => {
                            spectra.push(builder.finish());
                            None
                        }
                        _ => section,
                    };
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(spectra)
    }
}
