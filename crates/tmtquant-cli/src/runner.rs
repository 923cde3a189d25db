use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{ensure, Context};
use log::info;
use tmtquant_core::correction::{correct, ContaminantMatrix};
use tmtquant_core::protein::{
    aggregate, IndistinguishableProteins, PeptideQuant, ProteinGroupResolver,
};
use tmtquant_core::psm::{select, IdTable, Psm};
use tmtquant_core::quant::{quantify_fraction, QuantTable};
use tmtquant_core::read_mzml;
use tmtquant_core::spectrum::SpectrumIndex;

use crate::discovery::{find_id_file, find_spectral_files, read_crux_logs, resolve_fractions, stem};
use crate::input::Search;

pub struct Runner {
    pub parameters: Search,
    start: Instant,
}

impl Runner {
    pub fn new(parameters: Search) -> Self {
        Self {
            parameters,
            start: Instant::now(),
        }
    }

    // Create a path for `file_name` in the output directory
    pub(crate) fn make_path<S: AsRef<str>>(&self, file_name: S) -> PathBuf {
        self.parameters.output_directory.join(file_name.as_ref())
    }

    /// Spectral files ordered by fraction index
    fn fraction_files(
        &self,
        sources: Option<Vec<String>>,
        fractions: usize,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let spectral = find_spectral_files(&self.parameters.mzml_directory)?;
        ensure!(
            spectral.len() == fractions,
            "found {} mzML files in `{}`, but the identification table refers to {} fractions",
            spectral.len(),
            self.parameters.mzml_directory.display(),
            fractions
        );

        let named: BTreeMap<usize, String> = match sources {
            Some(sources) => sources.into_iter().enumerate().collect(),
            None => read_crux_logs(&self.parameters.id_directory)?,
        };
        Ok(resolve_fractions(&spectral, &named))
    }

    pub fn run(mut self) -> anyhow::Result<Search> {
        let id_path = find_id_file(&self.parameters.id_directory)?;
        info!("Reading identification file: {}", id_path.display());

        let table = IdTable::from_path(&id_path)
            .with_context(|| format!("Failed to read `{}`", id_path.display()))?;
        let id_headers = table.headers();
        let sources = table.sources()?;
        let psms = table.into_psms()?;
        info!("read {} PSMs", psms.len());

        let n_fractions = psms.iter().map(|psm| psm.file_idx + 1).max().unwrap_or(0);
        let files = self.fraction_files(sources, n_fractions)?;

        let fractions = select(psms, self.parameters.q_value, self.parameters.parsimony);
        let reporters = self.parameters.tmt.reporter_masses();
        info!("Reporter channels: {}", self.parameters.tmt.headers().join(", "));

        let mut quant = QuantTable::new(reporters.clone());
        let mut selected: Vec<Psm> = Vec::new();

        for fraction in fractions {
            let path = files
                .get(fraction.file_idx)
                .with_context(|| format!("no spectral file for fraction {}", fraction.file_idx))?;

            if fraction.psms.is_empty() {
                info!("No PSMs in {} passed the filters, skipping", stem(path));
                continue;
            }

            info!(
                "Reading mzml file: {} ({} of {})",
                path.display(),
                fraction.file_idx + 1,
                files.len()
            );
            let spectra = read_mzml(path)
                .with_context(|| format!("Failed to read `{}`", path.display()))?;
            let index = SpectrumIndex::build(spectra, self.parameters.ppm);

            let rows = quantify_fraction(
                &index,
                &fraction.psms,
                selected.len(),
                &reporters,
                &self.parameters.quant,
            );
            info!(
                "quantified {} of {} PSMs from {}",
                rows.len(),
                fraction.psms.len(),
                stem(path)
            );

            quant.rows.extend(rows);
            selected.extend(fraction.psms);
        }

        if let Some(path) = &self.parameters.contaminants {
            let matrix = ContaminantMatrix::from_path(path)
                .with_context(|| format!("Failed to read contaminant matrix `{}`", path.display()))?;
            quant = correct(&quant, &matrix, self.parameters.correction)?;
        }

        let resolver: &dyn ProteinGroupResolver = &IndistinguishableProteins;
        let peptides = PeptideQuant::from_table(&quant, &selected);
        let proteins = aggregate(
            &peptides,
            self.parameters.parsimony,
            Some(resolver),
            quant.reporters.len(),
        )?;

        let path = self.write_psms(&id_headers, &quant, &selected)?;
        self.parameters.output_paths.push(path);
        let path = self.write_proteins(&quant, &proteins)?;
        self.parameters.output_paths.push(path);

        let path = self.make_path("results.json");
        self.parameters
            .output_paths
            .push(path.display().to_string());
        println!("{}", serde_json::to_string_pretty(&self.parameters)?);

        let bytes = serde_json::to_vec_pretty(&self.parameters)?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write `{}`", path.display()))?;

        let run_time = (Instant::now() - self.start).as_secs();
        info!("finished in {}s", run_time);
        info!("Run completed successfully.");

        Ok(self.parameters)
    }
}
