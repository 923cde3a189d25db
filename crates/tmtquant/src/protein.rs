//! Protein-level aggregation of peptide reporter intensities

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::psm::{Parsimony, Psm};
use crate::quant::QuantTable;
use crate::{Error, Result};

/// Summed reporter intensities of a protein, or of a group of proteins
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProteinGroup {
    pub id: String,
    pub intensities: Vec<f64>,
}

impl ProteinGroup {
    pub fn total(&self) -> f64 {
        self.intensities.iter().sum()
    }
}

/// Reporter intensities of one quantified PSM, with the identification
/// details needed to assign it to a protein
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PeptideQuant<'a> {
    pub sequence: &'a str,
    /// Comma-separated protein accessions
    pub proteins: &'a str,
    pub values: &'a [f64],
}

impl<'a> PeptideQuant<'a> {
    /// Pair every row of `table` with the PSM it quantifies. Corrected
    /// intensities are used when present.
    pub fn from_table(table: &'a QuantTable, psms: &'a [Psm]) -> Vec<Self> {
        table
            .rows
            .iter()
            .filter_map(|row| {
                let psm = psms.get(row.psm)?;
                Some(PeptideQuant {
                    sequence: &psm.sequence,
                    proteins: &psm.proteins,
                    values: row.values(),
                })
            })
            .collect()
    }

    fn is_unique(&self) -> bool {
        !self.proteins.contains(',')
    }
}

/// Assigns peptides to canonical protein groups.
///
/// Receives every observed peptide with the set of proteins it maps to, and
/// returns the group identifier each peptide's intensity is credited to.
pub trait ProteinGroupResolver {
    fn resolve_groups(
        &self,
        peptides: &BTreeMap<String, BTreeSet<String>>,
    ) -> BTreeMap<String, String>;
}

/// Merges proteins that were observed with exactly the same set of peptides,
/// since the data cannot tell them apart.
///
/// A merged group is named by its sorted accessions joined with `;`. A
/// peptide shared between distinguishable groups is credited to the `,`-joined
/// list of those groups. No minimal covering set is computed.
#[derive(Copy, Clone, Debug, Default)]
pub struct IndistinguishableProteins;

impl ProteinGroupResolver for IndistinguishableProteins {
    fn resolve_groups(
        &self,
        peptides: &BTreeMap<String, BTreeSet<String>>,
    ) -> BTreeMap<String, String> {
        let mut protein_peptides: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (peptide, proteins) in peptides {
            for protein in proteins {
                protein_peptides
                    .entry(protein.as_str())
                    .or_default()
                    .insert(peptide.as_str());
            }
        }

        let mut groups: BTreeMap<&BTreeSet<&str>, Vec<&str>> = BTreeMap::new();
        for (&protein, peps) in &protein_peptides {
            groups.entry(peps).or_default().push(protein);
        }

        let group_of = groups
            .values()
            .flat_map(|members| {
                let id = members.join(";");
                members.iter().map(move |&m| (m, id.clone()))
            })
            .collect::<BTreeMap<&str, String>>();

        log::debug!(
            "{} proteins collapsed into {} indistinguishable groups",
            protein_peptides.len(),
            groups.len()
        );

        peptides
            .iter()
            .map(|(peptide, proteins)| {
                let ids = proteins
                    .iter()
                    .filter_map(|p| group_of.get(p.as_str()))
                    .map(String::as_str)
                    .collect::<BTreeSet<_>>();
                (peptide.clone(), ids.into_iter().collect::<Vec<_>>().join(","))
            })
            .collect()
    }
}

/// Sum peptide intensities into protein groups.
///
/// Under [`Parsimony::Unique`] only single-protein peptides contribute. Under
/// [`Parsimony::All`] the full protein list of a peptide is used as its key,
/// without splitting. [`Parsimony::Canonical`] keys each peptide by the group
/// `resolver` assigns to it. Groups whose channels sum to zero are dropped,
/// and groups are returned ordered by id.
pub fn aggregate(
    peptides: &[PeptideQuant<'_>],
    parsimony: Parsimony,
    resolver: Option<&dyn ProteinGroupResolver>,
    channels: usize,
) -> Result<Vec<ProteinGroup>> {
    let canonical = match parsimony {
        Parsimony::Canonical => {
            let resolver = resolver.ok_or(Error::MissingResolver)?;
            let mut mapping: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
            for pep in peptides {
                mapping
                    .entry(pep.sequence.to_string())
                    .or_default()
                    .extend(pep.proteins.split(',').map(String::from));
            }
            Some(resolver.resolve_groups(&mapping))
        }
        _ => None,
    };

    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for pep in peptides {
        let key = match (&canonical, parsimony) {
            (Some(canonical), _) => match canonical.get(pep.sequence) {
                Some(group) => group.as_str(),
                None => {
                    log::warn!(
                        "peptide {} was not assigned a protein group, using `{}`",
                        pep.sequence,
                        pep.proteins
                    );
                    pep.proteins
                }
            },
            (None, Parsimony::Unique) if !pep.is_unique() => continue,
            (None, _) => pep.proteins,
        };

        let sums = groups.entry(key).or_insert_with(|| vec![0.0; channels]);
        for (sum, value) in sums.iter_mut().zip(pep.values) {
            *sum += value;
        }
    }

    let total = groups.len();
    let groups = groups
        .into_iter()
        .map(|(id, intensities)| ProteinGroup {
            id: id.to_string(),
            intensities,
        })
        .filter(|group| group.total() != 0.0)
        .collect::<Vec<_>>();

    log::info!(
        "aggregated {} protein groups, {} had no reporter signal",
        groups.len(),
        total - groups.len()
    );
    Ok(groups)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::quant::QuantRow;

    fn pep<'a>(sequence: &'a str, proteins: &'a str, values: &'a [f64]) -> PeptideQuant<'a> {
        PeptideQuant {
            sequence,
            proteins,
            values,
        }
    }

    fn ids(groups: &[ProteinGroup]) -> Vec<&str> {
        groups.iter().map(|g| g.id.as_str()).collect()
    }

    #[test]
    fn unique_mode() {
        let peptides = [
            pep("AAK", "P1,P2", &[5.0, 5.0]),
            pep("CCK", "P1", &[1.0, 2.0]),
            pep("DDK", "P1", &[3.0, 4.0]),
        ];
        let groups = aggregate(&peptides, Parsimony::Unique, None, 2).unwrap();
        assert_eq!(
            groups,
            vec![ProteinGroup {
                id: "P1".into(),
                intensities: vec![4.0, 6.0]
            }]
        );
    }

    #[test]
    fn all_mode_keeps_shared_keys() {
        let peptides = [
            pep("AAK", "P1,P2", &[5.0, 5.0]),
            pep("CCK", "P1", &[1.0, 2.0]),
            pep("EEK", "P1,P2", &[1.0, 0.0]),
        ];
        let groups = aggregate(&peptides, Parsimony::All, None, 2).unwrap();
        assert_eq!(ids(&groups), vec!["P1", "P1,P2"]);
        assert_eq!(groups[1].intensities, vec![6.0, 5.0]);
    }

    #[test]
    fn zero_groups_dropped() {
        let peptides = [
            pep("AAK", "P1", &[0.0, 0.0]),
            pep("CCK", "P2", &[0.0, 1.0]),
            pep("DDK", "P3", &[0.0, 0.0]),
            pep("EEK", "P3", &[0.0, 0.0]),
        ];
        for parsimony in [Parsimony::Unique, Parsimony::All] {
            let groups = aggregate(&peptides, parsimony, None, 2).unwrap();
            assert_eq!(ids(&groups), vec!["P2"]);
        }
    }

    #[test]
    fn idempotent() {
        let peptides = [
            pep("AAK", "P2", &[5.0, 1.0]),
            pep("CCK", "P1", &[1.0, 2.0]),
            pep("DDK", "P2,P3", &[3.0, 4.0]),
        ];
        let resolver = IndistinguishableProteins;
        for parsimony in [Parsimony::Unique, Parsimony::All, Parsimony::Canonical] {
            let first = aggregate(&peptides, parsimony, Some(&resolver), 2).unwrap();
            let second = aggregate(&peptides, parsimony, Some(&resolver), 2).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn canonical_requires_resolver() {
        let peptides = [pep("AAK", "P1", &[1.0])];
        assert!(matches!(
            aggregate(&peptides, Parsimony::Canonical, None, 1),
            Err(Error::MissingResolver)
        ));
    }

    #[test]
    fn indistinguishable_groups() {
        let mut mapping: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut add = |peptide: &str, proteins: &[&str]| {
            mapping.insert(
                peptide.into(),
                proteins.iter().map(|p| p.to_string()).collect(),
            );
        };
        // P1 and P2 are only ever seen together
        add("AAK", &["P1", "P2"]);
        add("CCK", &["P2", "P1", "P3"]);
        add("DDK", &["P3"]);

        let groups = IndistinguishableProteins.resolve_groups(&mapping);
        assert_eq!(groups["AAK"], "P1;P2");
        assert_eq!(groups["CCK"], "P1;P2,P3");
        assert_eq!(groups["DDK"], "P3");
    }

    #[test]
    fn canonical_mode() {
        let peptides = [
            pep("AAK", "P2,P1", &[1.0, 1.0]),
            pep("AAK", "P1,P2", &[2.0, 0.0]),
            pep("DDK", "P3", &[0.0, 7.0]),
        ];
        let groups =
            aggregate(&peptides, Parsimony::Canonical, Some(&IndistinguishableProteins), 2)
                .unwrap();
        assert_eq!(ids(&groups), vec!["P1;P2", "P3"]);
        assert_eq!(groups[0].intensities, vec![3.0, 1.0]);
    }

    #[test]
    fn peptides_from_table() {
        let psms = ["P1", "P1,P2", "P3"]
            .iter()
            .enumerate()
            .map(|(ix, proteins)| Psm {
                file_idx: 0,
                scan: ix as u32,
                q_value: 0.0,
                sequence: format!("PEP{}", ix),
                proteins: proteins.to_string(),
                charge: None,
                fields: Vec::new(),
            })
            .collect::<Vec<_>>();

        let mut table = QuantTable::new(vec![126.127726]);
        table.rows = vec![
            QuantRow {
                psm: 2,
                file_idx: 0,
                scan: 2,
                intensities: vec![1.0],
                spectrum_intensity: 1.0,
                corrected: Some(vec![0.5]),
            },
            QuantRow {
                psm: 0,
                file_idx: 0,
                scan: 0,
                intensities: vec![4.0],
                spectrum_intensity: 4.0,
                corrected: None,
            },
        ];

        let peptides = PeptideQuant::from_table(&table, &psms);
        assert_eq!(
            peptides,
            vec![pep("PEP2", "P3", &[0.5]), pep("PEP0", "P1", &[4.0])]
        );
    }
}
