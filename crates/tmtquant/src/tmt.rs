//! TMT reporter ion catalog

use serde::{Deserialize, Serialize};

use crate::Error;

/// Calibrated reporter ion m/z values, in canonical channel order
pub const REPORTERS: [f64; 16] = [
    126.127726, // 126
    127.124761, // 127N
    127.131081, // 127C
    128.128116, // 128N
    128.134436, // 128C
    129.131471, // 129N
    129.137790, // 129C
    130.134825, // 130N
    130.141145, // 130C
    131.138180, // 131N
    131.144499, // 131C (11-plex)
    132.141535, // 132N (Pro)
    132.147855, // 132C (Pro)
    133.144890, // 133N (Pro)
    133.141210, // 133C (Pro)
    134.148245, // 134C (Pro)
];

const TMT6: [usize; 6] = [0, 2, 4, 5, 8, 9];

/// Supported TMT kits
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Isobaric {
    Tmt0,
    Tmt2,
    Tmt6,
    Tmt10,
    Tmt11,
    Tmt16,
}

impl TryFrom<u8> for Isobaric {
    type Error = Error;

    fn try_from(plex: u8) -> Result<Self, Self::Error> {
        match plex {
            0 => Ok(Isobaric::Tmt0),
            2 => Ok(Isobaric::Tmt2),
            6 => Ok(Isobaric::Tmt6),
            10 => Ok(Isobaric::Tmt10),
            11 => Ok(Isobaric::Tmt11),
            16 => Ok(Isobaric::Tmt16),
            // TMTpro 18-plex needs two reporter masses that are not in the
            // calibrated table yet
            _ => Err(Error::UnsupportedMultiplex(plex)),
        }
    }
}

impl From<Isobaric> for u8 {
    fn from(value: Isobaric) -> Self {
        match value {
            Isobaric::Tmt0 => 0,
            Isobaric::Tmt2 => 2,
            Isobaric::Tmt6 => 6,
            Isobaric::Tmt10 => 10,
            Isobaric::Tmt11 => 11,
            Isobaric::Tmt16 => 16,
        }
    }
}

impl Isobaric {
    pub fn reporter_masses(&self) -> Vec<f64> {
        match self {
            Isobaric::Tmt0 => REPORTERS[..1].to_vec(),
            Isobaric::Tmt2 => vec![REPORTERS[0], REPORTERS[2]],
            Isobaric::Tmt6 => TMT6.iter().map(|&ix| REPORTERS[ix]).collect(),
            Isobaric::Tmt10 => REPORTERS[..10].to_vec(),
            Isobaric::Tmt11 => REPORTERS[..11].to_vec(),
            Isobaric::Tmt16 => REPORTERS.to_vec(),
        }
    }

    /// Output column names, one per reporter ion
    pub fn headers(&self) -> Vec<String> {
        self.reporter_masses().into_iter().map(column_name).collect()
    }
}

/// Reporter masses for a multiplex level, in output column order
pub fn reporters_for(plex: u8) -> Result<Vec<f64>, Error> {
    Isobaric::try_from(plex).map(|tmt| tmt.reporter_masses())
}

/// `m` followed by the shortest decimal representation of the mass
pub fn column_name(mass: f64) -> String {
    format!("m{}", mass)
}
