//! Identification tables and PSM selection

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::psm_id::{strip_flanks, PsmIdFormat};
use crate::{Error, Result};

pub const FILE_IDX: &str = "file_idx";
pub const SCAN: &str = "scan";
pub const CHARGE: &str = "charge";
pub const Q_VALUE: &str = "percolator q-value";
pub const SEQUENCE: &str = "sequence";
pub const PROTEIN_ID: &str = "protein id";

const PSM_ID: &str = "PSMId";
const STANDALONE_Q_VALUE: &str = "q-value";
const PEPTIDE: &str = "peptide";
const PROTEIN_IDS: &str = "proteinIds";

/// How peptides shared between proteins are handled
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Parsimony {
    /// Only PSMs mapping to a single protein are used
    Unique,
    /// Every PSM is used; a shared peptide counts towards its full protein list
    #[default]
    All,
    /// PSMs are assigned to protein groups by a [`crate::protein::ProteinGroupResolver`]
    Canonical,
}

impl FromStr for Parsimony {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unique" => Ok(Parsimony::Unique),
            "all" => Ok(Parsimony::All),
            "canonical" => Ok(Parsimony::Canonical),
            _ => Err(format!(
                "unknown parsimony mode `{}`, expected unique, all or canonical",
                s
            )),
        }
    }
}

/// A peptide-spectrum match, in the same shape whichever table it came from
#[derive(Clone, Debug, PartialEq)]
pub struct Psm {
    /// Fraction (spectral file) index
    pub file_idx: usize,
    pub scan: u32,
    pub q_value: f64,
    pub sequence: String,
    /// Comma-separated protein accessions
    pub proteins: String,
    pub charge: Option<u8>,
    /// Row of the identification table, aligned with [`IdTable::headers`]
    pub fields: Vec<String>,
}

impl Psm {
    /// Does this PSM map to exactly one protein?
    pub fn is_unique(&self) -> bool {
        !self.proteins.contains(',')
    }
}

/// Crux `percolator.target.psms.txt`
#[derive(Debug, Clone)]
pub struct StandardIdTable {
    pub headers: Vec<String>,
    pub rows: Vec<csv::StringRecord>,
}

/// Standalone Percolator output, where fraction, scan and charge are encoded
/// in the `PSMId` column and proteins spill over into trailing columns
#[derive(Debug, Clone)]
pub struct StandaloneIdTable {
    pub headers: Vec<String>,
    pub rows: Vec<csv::StringRecord>,
    pub format: PsmIdFormat,
}

#[derive(Debug, Clone)]
pub enum IdTable {
    Standard(StandardIdTable),
    Standalone(StandaloneIdTable),
}

fn column(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| Error::MissingColumn(name.into()))
}

fn parse_field<T: FromStr>(record: &csv::StringRecord, ix: usize, name: &str) -> Result<T> {
    let value = record.get(ix).unwrap_or_default().trim();
    value.parse().map_err(|_| Error::InvalidField {
        column: name.into(),
        value: value.into(),
    })
}

impl IdTable {
    /// Read a tab-delimited identification table, detecting its layout from
    /// the header row
    pub fn from_reader<R: std::io::Read>(rdr: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(rdr);

        let headers = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();
        let rows = rdr
            .records()
            .collect::<std::result::Result<Vec<_>, csv::Error>>()?;

        if headers.iter().any(|h| h == FILE_IDX) {
            Ok(IdTable::Standard(StandardIdTable { headers, rows }))
        } else if headers.iter().any(|h| h == PSM_ID) {
            Ok(IdTable::Standalone(StandaloneIdTable {
                headers,
                rows,
                format: PsmIdFormat::default(),
            }))
        } else {
            Err(Error::UnknownIdLayout)
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Column names of [`Psm::fields`] once normalized
    pub fn headers(&self) -> Vec<String> {
        match self {
            IdTable::Standard(t) => t.headers.clone(),
            IdTable::Standalone(t) => {
                let mut headers = t.headers.clone();
                headers.extend(
                    [FILE_IDX, SCAN, CHARGE, SEQUENCE, PROTEIN_ID]
                        .iter()
                        .map(|s| s.to_string()),
                );
                headers
            }
        }
    }

    /// Spectral file stems named in a standalone table, sorted; their position
    /// is the fraction index. `None` for Crux tables.
    pub fn sources(&self) -> Result<Option<Vec<String>>> {
        match self {
            IdTable::Standard(_) => Ok(None),
            IdTable::Standalone(t) => t.sources().map(Some),
        }
    }

    pub fn into_psms(self) -> Result<Vec<Psm>> {
        match self {
            IdTable::Standard(t) => t.into_psms(),
            IdTable::Standalone(t) => t.into_psms(),
        }
    }
}

impl StandardIdTable {
    pub fn into_psms(self) -> Result<Vec<Psm>> {
        let file_idx = column(&self.headers, FILE_IDX)?;
        let scan = column(&self.headers, SCAN)?;
        let q_value = column(&self.headers, Q_VALUE)?;
        let proteins = column(&self.headers, PROTEIN_ID)?;
        let sequence = column(&self.headers, SEQUENCE).ok();
        let charge = column(&self.headers, CHARGE).ok();

        self.rows
            .iter()
            .map(|row| {
                Ok(Psm {
                    file_idx: parse_field(row, file_idx, FILE_IDX)?,
                    scan: parse_field(row, scan, SCAN)?,
                    q_value: parse_field(row, q_value, Q_VALUE)?,
                    sequence: sequence
                        .and_then(|ix| row.get(ix))
                        .unwrap_or_default()
                        .to_string(),
                    proteins: row.get(proteins).unwrap_or_default().to_string(),
                    charge: charge.and_then(|ix| row.get(ix)?.trim().parse().ok()),
                    fields: row.iter().map(String::from).collect(),
                })
            })
            .collect()
    }
}

impl StandaloneIdTable {
    pub fn sources(&self) -> Result<Vec<String>> {
        let psm_id = column(&self.headers, PSM_ID)?;
        let mut sources = BTreeSet::new();
        for row in &self.rows {
            let id = self.format.parse(row.get(psm_id).unwrap_or_default())?;
            sources.insert(id.source.to_string());
        }
        Ok(sources.into_iter().collect())
    }

    pub fn into_psms(self) -> Result<Vec<Psm>> {
        let psm_id = column(&self.headers, PSM_ID)?;
        let q_value = column(&self.headers, STANDALONE_Q_VALUE)?;
        let peptide = column(&self.headers, PEPTIDE)?;
        let proteins = column(&self.headers, PROTEIN_IDS)?;

        let sources = self.sources()?;

        self.rows
            .iter()
            .map(|row| {
                let id = self.format.parse(row.get(psm_id).unwrap_or_default())?;
                let file_idx = sources
                    .binary_search_by(|s| s.as_str().cmp(id.source))
                    .map_err(|_| Error::MalformedPsmId(id.source.to_string()))?;
                let sequence = strip_flanks(row.get(peptide).unwrap_or_default()).to_string();
                // Percolator writes one protein per trailing column
                let protein_list = row
                    .iter()
                    .skip(proteins)
                    .filter(|p| !p.is_empty())
                    .collect::<Vec<_>>()
                    .join(",");

                let mut fields = row
                    .iter()
                    .take(self.headers.len())
                    .map(String::from)
                    .collect::<Vec<_>>();
                fields.resize(self.headers.len(), String::new());
                fields[proteins] = protein_list.clone();
                fields.extend([
                    file_idx.to_string(),
                    id.scan.to_string(),
                    id.charge.to_string(),
                    sequence.clone(),
                    protein_list.clone(),
                ]);

                Ok(Psm {
                    file_idx,
                    scan: id.scan,
                    q_value: parse_field(row, q_value, STANDALONE_Q_VALUE)?,
                    sequence,
                    proteins: protein_list,
                    charge: Some(id.charge),
                    fields,
                })
            })
            .collect()
    }
}

/// PSMs of one fraction that passed selection, ordered by scan
#[derive(Debug, Clone, PartialEq)]
pub struct Fraction {
    pub file_idx: usize,
    pub psms: Vec<Psm>,
}

/// Group PSMs by fraction, order them by scan and drop those that fail the
/// q-value or protein-uniqueness filters.
///
/// A q-value equal to `q_threshold` passes. Only [`Parsimony::Unique`] filters
/// on proteins here; canonical grouping happens at protein aggregation.
/// Fractions are returned in ascending index order, including fractions
/// where no PSM survived.
pub fn select(psms: Vec<Psm>, q_threshold: f64, parsimony: Parsimony) -> Vec<Fraction> {
    let mut fractions: BTreeMap<usize, Vec<Psm>> = BTreeMap::new();
    for psm in psms {
        fractions.entry(psm.file_idx).or_default().push(psm);
    }

    fractions
        .into_iter()
        .map(|(file_idx, mut psms)| {
            psms.sort_by_key(|psm| psm.scan);
            psms.retain(|psm| {
                psm.q_value <= q_threshold && (parsimony != Parsimony::Unique || psm.is_unique())
            });
            Fraction { file_idx, psms }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    const CRUX: &str = "file_idx\tscan\tcharge\tspectrum precursor m/z\tpercolator score\tpercolator q-value\tpercolator PEP\tsequence\tprotein id\tflanking aa
1\t300\t2\t700.1\t1.2\t0.001\t0.01\tPEPTIDEK\tsp|P1|A\tKR
0\t20\t3\t600.2\t0.8\t0.05\t0.02\tAAAAK\tsp|P1|A,sp|P2|B\tRK
0\t10\t2\t500.3\t1.5\t0.001\t0.001\tLLLLR\tsp|P3|C\tKR
0\t10\t2\t500.3\t1.1\t0.2\t0.3\tMMMMR\tsp|P4|D\tKR
";

    const STANDALONE: &str = "PSMId\tscore\tq-value\tposterior_error_prob\tpeptide\tproteinIds
Block6_F8_55_2_1\t1.1\t0.001\t0.01\tK.PEPTIDEK.R\tsp|P1|A
Block6_F7_12_3_1\t0.9\t0.01\t0.02\tR.AAAAK.L\tsp|P1|A\tsp|P2|B
";

    fn psm(file_idx: usize, scan: u32, q_value: f64, proteins: &str) -> Psm {
        Psm {
            file_idx,
            scan,
            q_value,
            sequence: "PEPTIDE".into(),
            proteins: proteins.into(),
            charge: None,
            fields: Vec::new(),
        }
    }

    #[test]
    fn read_standard() {
        let table = IdTable::from_reader(CRUX.as_bytes()).unwrap();
        assert!(matches!(table, IdTable::Standard(_)));
        assert_eq!(table.sources().unwrap(), None);
        let headers = table.headers();
        let psms = table.into_psms().unwrap();
        assert_eq!(psms.len(), 4);
        assert_eq!(psms[0].file_idx, 1);
        assert_eq!(psms[0].scan, 300);
        assert_eq!(psms[0].charge, Some(2));
        assert_eq!(psms[1].proteins, "sp|P1|A,sp|P2|B");
        assert_eq!(psms[1].sequence, "AAAAK");
        assert_eq!(psms[1].fields.len(), headers.len());
    }

    #[test]
    fn read_standalone() {
        let table = IdTable::from_reader(STANDALONE.as_bytes()).unwrap();
        assert!(matches!(table, IdTable::Standalone(_)));
        assert_eq!(
            table.sources().unwrap(),
            Some(vec!["Block6_F7".to_string(), "Block6_F8".to_string()])
        );
        let headers = table.headers();
        let psms = table.into_psms().unwrap();

        assert_eq!(psms[0].file_idx, 1);
        assert_eq!(psms[0].scan, 55);
        assert_eq!(psms[0].charge, Some(2));
        assert_eq!(psms[0].sequence, "PEPTIDEK");
        assert_eq!(psms[0].proteins, "sp|P1|A");

        assert_eq!(psms[1].file_idx, 0);
        assert_eq!(psms[1].scan, 12);
        assert_eq!(psms[1].proteins, "sp|P1|A,sp|P2|B");
        assert!(!psms[1].is_unique());

        assert_eq!(psms[1].fields.len(), headers.len());
        let protein_col = headers.iter().position(|h| h == PROTEIN_ID).unwrap();
        assert_eq!(psms[1].fields[protein_col], "sp|P1|A,sp|P2|B");
    }

    #[test]
    fn unknown_layout() {
        let table = IdTable::from_reader("a\tb\n1\t2\n".as_bytes());
        assert!(matches!(table, Err(Error::UnknownIdLayout)));
    }

    #[test]
    fn missing_required_column() {
        let table = IdTable::from_reader("file_idx\tscan\n0\t1\n".as_bytes()).unwrap();
        match table.into_psms() {
            Err(Error::MissingColumn(col)) => assert_eq!(col, Q_VALUE),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn invalid_scan() {
        let table = IdTable::from_reader(
            "file_idx\tscan\tpercolator q-value\tprotein id\n0\tabc\t0.1\tP1\n".as_bytes(),
        )
        .unwrap();
        assert!(matches!(table.into_psms(), Err(Error::InvalidField { .. })));
    }

    #[test]
    fn selection_groups_and_sorts() {
        let table = IdTable::from_reader(CRUX.as_bytes()).unwrap();
        let fractions = select(table.into_psms().unwrap(), 0.1, Parsimony::All);

        assert_eq!(fractions.len(), 2);
        assert_eq!(fractions[0].file_idx, 0);
        let scans = fractions[0].psms.iter().map(|p| p.scan).collect::<Vec<_>>();
        // q = 0.2 is dropped, the remaining PSMs are in scan order
        assert_eq!(scans, vec![10, 20]);
        assert_eq!(fractions[0].psms[0].sequence, "LLLLR");
        assert_eq!(fractions[1].psms.len(), 1);
    }

    #[test]
    fn stable_order_for_equal_scans() {
        let psms = vec![psm(0, 5, 0.01, "A"), psm(0, 2, 0.01, "B"), psm(0, 5, 0.01, "C")];
        let fractions = select(psms, 1.0, Parsimony::All);
        let proteins = fractions[0]
            .psms
            .iter()
            .map(|p| p.proteins.as_str())
            .collect::<Vec<_>>();
        assert_eq!(proteins, vec!["B", "A", "C"]);
    }

    #[test]
    fn q_value_boundary() {
        let threshold: f64 = 0.01;
        let above = f64::from_bits(threshold.to_bits() + 1);
        let psms = vec![psm(0, 1, threshold, "A"), psm(0, 2, above, "B")];
        let fractions = select(psms, threshold, Parsimony::All);
        assert_eq!(fractions[0].psms.len(), 1);
        assert_eq!(fractions[0].psms[0].scan, 1);
    }

    #[test]
    fn unique_filter() {
        let psms = vec![psm(0, 1, 0.0, "P1,P2"), psm(0, 2, 0.0, "P1")];

        let unique = select(psms.clone(), 1.0, Parsimony::Unique);
        assert_eq!(unique[0].psms.len(), 1);
        assert_eq!(unique[0].psms[0].proteins, "P1");

        for parsimony in [Parsimony::All, Parsimony::Canonical] {
            assert_eq!(select(psms.clone(), 1.0, parsimony)[0].psms.len(), 2);
        }
    }

    #[test]
    fn parsimony_from_str() {
        assert_eq!("unique".parse::<Parsimony>(), Ok(Parsimony::Unique));
        assert_eq!("canonical".parse::<Parsimony>(), Ok(Parsimony::Canonical));
        assert!("greedy".parse::<Parsimony>().is_err());
    }
}
