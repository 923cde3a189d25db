//! Locating identification and spectral files, and deciding which spectral
//! file holds which fraction

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use regex::Regex;

fn files_in(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory `{}`", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect::<Vec<_>>();
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or_default()
}

/// File name without directory, compression suffix or extension:
/// `/data/F1.mzML.gz` becomes `F1`
pub fn stem(path: &Path) -> &str {
    let mut name = file_name(path);
    if let Some(ix) = name.rfind('.') {
        if name[ix + 1..].eq_ignore_ascii_case("gz") {
            name = &name[..ix];
        }
    }
    match name.rfind('.') {
        Some(ix) if ix > 0 => &name[..ix],
        _ => name,
    }
}

/// Locate the identification table: a single `*target.psms.txt` (Crux), or
/// failing that a single `*.psms.txt` or `*.tsv` (standalone Percolator)
pub fn find_id_file(dir: &Path) -> anyhow::Result<PathBuf> {
    let files = files_in(dir)?;

    let pick = |matches: Vec<&PathBuf>, kind: &str| -> anyhow::Result<Option<PathBuf>> {
        match matches.len() {
            0 => Ok(None),
            1 => Ok(Some(matches[0].clone())),
            n => bail!(
                "found {} {} files in `{}`, expected exactly one",
                n,
                kind,
                dir.display()
            ),
        }
    };

    let crux = files
        .iter()
        .filter(|p| file_name(p).ends_with("target.psms.txt"))
        .collect();
    if let Some(path) = pick(crux, "`*target.psms.txt`")? {
        return Ok(path);
    }

    let standalone = files
        .iter()
        .filter(|p| {
            let name = file_name(p);
            name.ends_with(".psms.txt") || name.ends_with(".tsv")
        })
        .collect();
    pick(standalone, "`*.psms.txt`/`*.tsv`")?.with_context(|| {
        format!(
            "no identification file (`*target.psms.txt`, `*.psms.txt` or `*.tsv`) in `{}`",
            dir.display()
        )
    })
}

fn is_mzml(path: &Path) -> bool {
    let name = file_name(path).to_ascii_lowercase();
    name.ends_with(".mzml") || name.ends_with(".mzml.gz")
}

/// Every mzML file in `dir`, optionally gzipped, in lexicographic order
pub fn find_spectral_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let files = files_in(dir)?
        .into_iter()
        .filter(|p| is_mzml(p))
        .collect::<Vec<_>>();
    if files.is_empty() {
        bail!("no mzML files in `{}`", dir.display());
    }
    Ok(files)
}

/// Extract the fraction index -> spectral file assignments Crux writes to
/// its log, e.g. `INFO: Assigning index 0 to /data/F1.mzML.`
pub fn crux_log_mapping(text: &str) -> BTreeMap<usize, String> {
    let re = Regex::new(r"Assigning index (\d+) to (.+)").expect("This is valid regex");

    text.lines()
        .filter_map(|line| {
            let caps = re.captures(line)?;
            let idx = caps.get(1)?.as_str().parse().ok()?;
            let path = caps.get(2)?.as_str().trim().trim_end_matches('.');
            Some((idx, file_name(Path::new(path)).to_string()))
        })
        .collect()
}

/// Read every `*.log.txt` file in the identification directory
pub fn read_crux_logs(dir: &Path) -> anyhow::Result<BTreeMap<usize, String>> {
    let mut mapping = BTreeMap::new();
    for path in files_in(dir)?
        .into_iter()
        .filter(|p| file_name(p).ends_with(".log.txt"))
    {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read `{}`", path.display()))?;
        mapping.extend(crux_log_mapping(&text));
    }
    Ok(mapping)
}

/// Order spectral files by fraction index.
///
/// `named` maps fraction indices to a file name or stem. It is only trusted
/// if it covers every fraction and each entry names one of `spectral`;
/// otherwise the files are used in sorted order.
pub fn resolve_fractions(spectral: &[PathBuf], named: &BTreeMap<usize, String>) -> Vec<PathBuf> {
    let resolved = (0..spectral.len())
        .map(|idx| {
            let name = named.get(&idx)?;
            let wanted = stem(Path::new(name));
            spectral.iter().find(|p| stem(p) == wanted).cloned()
        })
        .collect::<Option<Vec<_>>>();

    match resolved {
        Some(files) => {
            log::info!("using named fraction mapping for {} files", files.len());
            files
        }
        None => {
            log::warn!(
                "could not match fraction indices to spectral files by name, \
                 assuming fractions are in sorted file order"
            );
            spectral.to_vec()
        }
    }
}
