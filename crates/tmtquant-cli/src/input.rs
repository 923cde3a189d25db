use std::path::{Path, PathBuf};

use anyhow::{ensure, Context};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use tmtquant_core::correction::CorrectionMethod;
use tmtquant_core::psm::Parsimony;
use tmtquant_core::quant::{QuantLevel, QuantSettings};
use tmtquant_core::tmt::Isobaric;

#[derive(Serialize, Debug, Clone)]
/// Actual run parameters - may include overrides or default values not set by user
pub struct Search {
    pub version: String,
    pub mzml_directory: PathBuf,
    pub id_directory: PathBuf,
    pub tmt: Isobaric,
    pub ppm: f64,
    pub q_value: f64,
    pub parsimony: Parsimony,
    pub quant: QuantSettings,
    pub contaminants: Option<PathBuf>,
    pub correction: CorrectionMethod,
    pub output_directory: PathBuf,
    pub output_paths: Vec<String>,
}

#[derive(Deserialize, Default, Debug)]
/// Input run parameters deserialized from JSON file
pub struct Input {
    mzml_directory: Option<PathBuf>,
    id_directory: Option<PathBuf>,
    output_directory: Option<PathBuf>,
    multiplex: Option<u8>,
    ppm: Option<f64>,
    q_value: Option<f64>,
    parsimony: Option<Parsimony>,
    contaminants: Option<PathBuf>,
    correction: Option<CorrectionMethod>,
    digits: Option<u32>,
    quant_level: Option<u8>,
}

const DEFAULT_OUTPUT: &str = "tmt_out";

impl Input {
    pub fn from_arguments(matches: &ArgMatches) -> anyhow::Result<Self> {
        let mut input = match matches.get_one::<String>("parameters") {
            Some(path) => Input::load(path)
                .with_context(|| format!("Failed to read parameters from `{path}`"))?,
            None => Input::default(),
        };

        // Handle JSON configuration overrides
        if let Some(mzml) = matches.get_one::<String>("mzml") {
            input.mzml_directory = Some(mzml.into());
        }
        if let Some(id) = matches.get_one::<String>("id") {
            input.id_directory = Some(id.into());
        }
        if let Some(out) = matches.get_one::<String>("out") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(out.into());
        }
        if let Some(multiplex) = matches.get_one::<u8>("multiplex").copied() {
            input.multiplex = Some(multiplex);
        }
        if let Some(ppm) = matches.get_one::<f64>("precision").copied() {
            input.ppm = Some(ppm);
        }
        if let Some(q) = matches.get_one::<f64>("qvalue").copied() {
            input.q_value = Some(q);
        }
        if let Some(parsimony) = matches.get_one::<String>("parsimony") {
            input.parsimony = Some(parsimony.parse().map_err(anyhow::Error::msg)?);
        }
        if matches.get_flag("unique") {
            input.parsimony = Some(Parsimony::Unique);
        }
        if let Some(contaminants) = matches.get_one::<String>("contaminants") {
            input.contaminants = Some(contaminants.into());
        }
        if matches.get_flag("exact-solve") {
            input.correction = Some(CorrectionMethod::Exact);
        }
        if let Some(digits) = matches.get_one::<u32>("digits").copied() {
            input.digits = Some(digits);
        }
        if let Some(level) = matches.get_one::<u8>("quant-level").copied() {
            input.quant_level = Some(level);
        }

        ensure!(
            input.mzml_directory.is_some(),
            "an mzML directory must be provided. For more information try '--help'"
        );
        ensure!(
            input.id_directory.is_some(),
            "an identification directory must be provided. For more information try '--help'"
        );

        Ok(input)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)?;
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(anyhow::Error::from)
    }

    /// Directory outputs (and the log file) are written to
    pub fn output_directory(&self) -> PathBuf {
        self.output_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    }

    pub fn build(self) -> anyhow::Result<Search> {
        let tmt = Isobaric::try_from(self.multiplex.unwrap_or(10))?;

        let ppm = self.ppm.unwrap_or(10.0);
        ensure!(
            (1.0..=1000.0).contains(&ppm),
            "mass tolerance must be between 1 and 1000 ppm, got {}",
            ppm
        );

        let q_value = self.q_value.unwrap_or(1.0);
        ensure!(
            (0.0..=1.0).contains(&q_value),
            "q-value threshold must be between 0 and 1, got {}",
            q_value
        );

        let digits = self.digits.unwrap_or(2);
        ensure!(digits <= 10, "at most 10 decimal places are supported, got {}", digits);

        let level = QuantLevel::try_from(self.quant_level.unwrap_or(2)).map_err(anyhow::Error::msg)?;

        let output_directory = self.output_directory();
        let mzml_directory = self
            .mzml_directory
            .context("an mzML directory must be provided")?;
        let id_directory = self
            .id_directory
            .context("an identification directory must be provided")?;

        ensure!(
            mzml_directory.is_dir(),
            "mzML directory `{}` is not valid",
            mzml_directory.display()
        );
        ensure!(
            id_directory.is_dir(),
            "identification directory `{}` is not valid",
            id_directory.display()
        );
        if let Some(path) = &self.contaminants {
            ensure!(
                path.is_file(),
                "contaminant matrix `{}` does not exist",
                path.display()
            );
        }

        std::fs::create_dir_all(&output_directory).with_context(|| {
            format!(
                "Failed to create output directory `{}`",
                output_directory.display()
            )
        })?;

        Ok(Search {
            version: clap::crate_version!().into(),
            mzml_directory,
            id_directory,
            tmt,
            ppm,
            q_value,
            parsimony: self.parsimony.unwrap_or_default(),
            quant: QuantSettings { digits, level },
            contaminants: self.contaminants,
            correction: self.correction.unwrap_or_default(),
            output_directory,
            output_paths: Vec::new(),
        })
    }
}
