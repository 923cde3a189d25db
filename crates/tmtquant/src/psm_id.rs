//! Parsing of composite PSM identifiers written by standalone Percolator
//!
//! When Percolator is run on a Comet `.pin` file, the identification table has
//! no `file_idx`/`scan`/`charge` columns. Everything is packed into `PSMId`
//! instead, e.g. `20180416_StemCell_TMT_Block6_F7_10234_2_1`. The layout
//! depends on the tool and version that wrote the `.pin` file, so each
//! supported layout is a separate [`PsmIdFormat`].

use crate::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum PsmIdFormat {
    /// Comet 2017+ `.pin`: `<source>_<scan>_<charge>_<rank>`, where `<source>`
    /// is the spectral file stem and may itself contain underscores
    #[default]
    CometPinV1,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PsmId<'a> {
    /// Spectral file stem the PSM was identified in
    pub source: &'a str,
    pub scan: u32,
    pub charge: u8,
    pub rank: u32,
}

impl PsmIdFormat {
    pub fn parse<'a>(&self, id: &'a str) -> Result<PsmId<'a>, Error> {
        match self {
            PsmIdFormat::CometPinV1 => {
                let malformed = || Error::MalformedPsmId(id.to_string());
                let mut fields = id.rsplitn(4, '_');
                let rank = fields.next().ok_or_else(malformed)?;
                let charge = fields.next().ok_or_else(malformed)?;
                let scan = fields.next().ok_or_else(malformed)?;
                let source = fields.next().filter(|s| !s.is_empty()).ok_or_else(malformed)?;

                Ok(PsmId {
                    source,
                    scan: scan.parse().map_err(|_| malformed())?,
                    charge: charge.parse().map_err(|_| malformed())?,
                    rank: rank.parse().map_err(|_| malformed())?,
                })
            }
        }
    }
}

/// Strip single-residue flanks from a Percolator peptide: `K.PEPTIDEK.R` becomes
/// `PEPTIDEK`. Sequences without flanks are returned unchanged.
pub fn strip_flanks(peptide: &str) -> &str {
    let bytes = peptide.as_bytes();
    let n = bytes.len();
    if n >= 4 && bytes[1] == b'.' && bytes[n - 2] == b'.' {
        &peptide[2..n - 2]
    } else {
        peptide
    }
}
