pub mod correction;
pub mod linalg;
pub mod mzml;
pub mod protein;
pub mod psm;
pub mod psm_id;
pub mod quant;
pub mod spectrum;
pub mod tmt;

use std::path::Path;

use async_compression::tokio::bufread::GzipDecoder;
use tokio::io::{AsyncBufRead, BufReader};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unsupported TMT multiplex level {0}: expected one of 0, 2, 6, 10, 11, 16")]
    UnsupportedMultiplex(u8),
    #[error("spectral source not found: {0}")]
    SpectralSourceNotFound(String),
    #[error("contaminant matrix has {found} {axis}, but there are {expected} reporter channels")]
    DimensionMismatch {
        axis: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("contaminant matrix column `{0}` sums to zero and cannot be normalized")]
    DegenerateMatrix(String),
    #[error("contaminant matrix is singular, try the non-negative least squares solver")]
    SingularMatrix,
    #[error("malformed PSM identifier `{0}`")]
    MalformedPsmId(String),
    #[error("identification table is missing column `{0}`")]
    MissingColumn(String),
    #[error("invalid value `{value}` in column `{column}`")]
    InvalidField { column: String, value: String },
    #[error("identification table layout not recognised: expected a `file_idx` or `PSMId` column")]
    UnknownIdLayout,
    #[error("canonical parsimony requires a protein group resolver")]
    MissingResolver,
    #[error("MzML error: {0}")]
    MzML(#[from] mzml::MzMLError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Does the path end in "gz" or "gzip"?
fn gzip_heuristic(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("gzip"),
        None => false,
    }
}

async fn open(path: &Path) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|_| Error::SpectralSourceNotFound(path.display().to_string()))?;
    let reader = BufReader::new(file);
    if gzip_heuristic(path) {
        Ok(Box::new(BufReader::new(GzipDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Read every spectrum of an mzML file, in file order
pub fn read_mzml<P: AsRef<Path>>(path: P) -> Result<Vec<spectrum::RawSpectrum>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::SpectralSourceNotFound(path.display().to_string()));
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let reader = open(path).await?;
        mzml::MzMLReader::default()
            .parse(reader)
            .await
            .map_err(Error::MzML)
    })
}
