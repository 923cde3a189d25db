use clap::{value_parser, Arg, ArgAction, Command, ValueHint};

pub mod discovery;
pub mod input;
pub mod logging;
pub mod output;
pub mod runner;

pub fn command() -> Command {
    Command::new("tmtquant")
        .version(clap::crate_version!())
        .author("Edward Lau <edward.lau@cuanschutz.edu>")
        .about("TMT reporter ion quantification of Crux/Percolator PSMs")
        .arg(
            Arg::new("mzml")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Directory containing the mzML files, one per fraction")
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("id")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Directory containing the Percolator tab-delimited PSM file")
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("parameters")
                .long("parameters")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path to a JSON parameter file. Command line options override \
                     values set in the file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("unique")
                .short('u')
                .long("unique")
                .action(ArgAction::SetTrue)
                .help("Quantify protein-unique peptides only (same as `--parsimony unique`)"),
        )
        .arg(
            Arg::new("parsimony")
                .long("parsimony")
                .value_parser(["unique", "all", "canonical"])
                .help("How peptides shared between proteins are aggregated [default: all]"),
        )
        .arg(
            Arg::new("qvalue")
                .short('q')
                .long("qvalue")
                .value_parser(value_parser!(f64))
                .help("Quantify PSMs with a q-value at or below this threshold [default: 1.0]")
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("multiplex")
                .short('m')
                .long("multiplex")
                .value_parser(value_parser!(u8))
                .help("TMT multiplex level (0, 2, 6, 10, 11, 16) [default: 10]")
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("precision")
                .short('p')
                .long("precision")
                .value_parser(value_parser!(f64))
                .help("Reporter ion mass tolerance in ppm [default: 10]")
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("out")
                .short('o')
                .long("out")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Name of the output directory [default: tmt_out]")
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("contaminants")
                .short('c')
                .long("contaminants")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Comma-separated contaminant matrix used to correct reporter \
                     intensities for isotopic impurities",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("exact-solve")
                .long("exact-solve")
                .action(ArgAction::SetTrue)
                .help(
                    "Correct with an exact linear solve instead of non-negative \
                     least squares",
                ),
        )
        .arg(
            Arg::new("digits")
                .long("digits")
                .value_parser(value_parser!(u32))
                .help("Decimal places reported intensities are rounded to [default: 2]")
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("quant-level")
                .long("quant-level")
                .value_parser(value_parser!(u8))
                .help("Read reporter ions from MS2 (2) or SPS-MS3 (3) spectra [default: 2]")
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_parser(value_parser!(u16).range(1..))
                .help("Number of worker threads (default = # of CPUs)")
                .value_hint(ValueHint::Other),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Written by {author-with-newline}Version {version}\n\n\
             {all-args}{after-help}",
        )
}
