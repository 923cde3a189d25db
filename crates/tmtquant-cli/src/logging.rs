use std::fs::File;
use std::io::{Stderr, Write};
use std::path::Path;

use anyhow::Context;
use env_logger::{Builder, Env, Target, WriteStyle};
use log::{Level, LevelFilter};

pub const LOG_ENV: &str = "TMTQUANT_LOG";
pub const DEFAULT_FILTER: &str = "error,tmtquant=info";

/// Sends every record to the log file, and records at or above
/// `console_level` to the console
pub struct Tee<C = Stderr> {
    console: C,
    console_level: LevelFilter,
    file: Option<File>,
}

impl Tee {
    pub fn new(file: Option<File>) -> Self {
        Tee::with_console(std::io::stderr(), LevelFilter::Error, file)
    }
}

impl<C: Write> Tee<C> {
    pub fn with_console(console: C, console_level: LevelFilter, file: Option<File>) -> Self {
        Self {
            console,
            console_level,
            file,
        }
    }
}

/// Level of a record in env_logger's default `[<time> <LEVEL> <target>] ..` layout
fn record_level(buf: &[u8]) -> Option<Level> {
    let line = std::str::from_utf8(buf).ok()?;
    let header = line.strip_prefix('[')?.split(']').next()?;
    header.split_whitespace().find_map(|token| token.parse().ok())
}

impl<C: Write> Write for Tee<C> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        // Anything that does not look like a record goes to both
        if record_level(buf).map_or(true, |level| level <= self.console_level) {
            self.console.write_all(buf)?;
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.console.flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Install the global logger. Errors are shown on stderr; everything the
/// filter lets through is written to `log_path`.
///
/// Only the first call in a process installs a logger; later calls are no-ops.
pub fn init(log_path: &Path) -> anyhow::Result<()> {
    let file = File::create(log_path)
        .with_context(|| format!("Failed to create log file `{}`", log_path.display()))?;

    let result = Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(Env::default().filter_or(LOG_ENV, DEFAULT_FILTER))
        .write_style(WriteStyle::Never)
        .target(Target::Pipe(Box::new(Tee::new(Some(file)))))
        .try_init();

    if result.is_err() {
        log::debug!("logger already installed, `{}` is not used", log_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tee_writes_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tmt.log");
        let mut tee = Tee::new(Some(File::create(&path)?));
        writeln!(tee, "Reading mzml file: F1.mzML (1 of 1)")?;
        tee.flush()?;
        drop(tee);

        assert_eq!(
            std::fs::read_to_string(&path)?,
            "Reading mzml file: F1.mzML (1 of 1)\n"
        );
        Ok(())
    }

    #[test]
    fn console_only_gets_errors() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tmt.log");
        let file = File::create(&path)?;
        let mut tee = Tee::with_console(Vec::new(), LevelFilter::Error, Some(file));

        let info = "[2026-01-01T00:00:00Z INFO  tmtquant_cli::runner] Reading mzml file: F1.mzML\n";
        let error = "[2026-01-01T00:00:00Z ERROR tmtquant_core::quant] fraction 0: scan 9 skipped\n";
        tee.write_all(info.as_bytes())?;
        tee.write_all(error.as_bytes())?;
        tee.write_all(b"plain line\n")?;
        tee.flush()?;

        assert_eq!(
            String::from_utf8(std::mem::take(&mut tee.console))?,
            format!("{}plain line\n", error)
        );
        drop(tee);
        assert_eq!(
            std::fs::read_to_string(&path)?,
            format!("{}{}plain line\n", info, error)
        );
        Ok(())
    }

    #[test]
    fn levels_from_record_header() {
        assert_eq!(record_level(b"[t WARN  a::b] x"), Some(Level::Warn));
        assert_eq!(record_level(b"[t DEBUG a] x"), Some(Level::Debug));
        assert_eq!(record_level(b"no header"), None);
    }

    #[test]
    fn tee_without_file() -> anyhow::Result<()> {
        let mut tee = Tee::new(None);
        assert_eq!(tee.write(b"x")?, 1);
        Ok(())
    }
}
