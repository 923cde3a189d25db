use anyhow::Context;
use tmtquant_cli::input::Input;
use tmtquant_cli::runner::Runner;
use tmtquant_cli::{command, logging};

fn main() -> anyhow::Result<()> {
    let matches = command().get_matches();

    let threads = matches
        .get_one::<u16>("threads")
        .map(|&n| n as usize)
        .unwrap_or_else(num_cpus::get);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()?;

    let input = Input::from_arguments(&matches)?;

    let out = input.output_directory();
    std::fs::create_dir_all(&out)
        .with_context(|| format!("Failed to create output directory `{}`", out.display()))?;
    logging::init(&out.join("tmt.log"))?;
    log::info!("tmtquant {}", clap::crate_version!());
    log::debug!("{:?}", input);

    let parameters = input.build()?;
    log::info!(
        "{} channels, {} ppm, q <= {}, {:?} parsimony",
        parameters.tmt.reporter_masses().len(),
        parameters.ppm,
        parameters.q_value,
        parameters.parsimony
    );

    Runner::new(parameters).run()?;
    Ok(())
}
