use std::path::{Path, PathBuf};

use tmtquant_cli::command;
use tmtquant_cli::input::{Input, Search};
use tmtquant_cli::runner::Runner;

const PSMS: &str = "file_idx\tscan\tcharge\tpercolator q-value\tsequence\tprotein id
0\t3\t2\t0.01\tAAAAK\tsp|P1|A,sp|P2|B
0\t2\t2\t0.001\tPEPTIDEK\tsp|P1|A
0\t9\t2\t0.01\tMISSINGK\tsp|P3|C
0\t4\t2\t0.5\tLOWQK\tsp|P4|D
";

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mzml = dir.path().join("mzml");
        let id = dir.path().join("id");
        std::fs::create_dir(&mzml).unwrap();
        std::fs::create_dir(&id).unwrap();

        let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../tmtquant/tests/data/tmt.mzML");
        std::fs::copy(fixture, mzml.join("F1.mzML")).unwrap();
        std::fs::write(id.join("percolator.target.psms.txt"), PSMS).unwrap();
        Workspace { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, extra: &[&str]) -> Search {
        let mzml = self.path("mzml");
        let id = self.path("id");
        let out = self.path("out");
        let mut args = vec![
            "tmtquant",
            mzml.to_str().unwrap(),
            id.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "-m",
            "2",
            "-q",
            "0.1",
        ];
        args.extend_from_slice(extra);

        let matches = command().try_get_matches_from(args).unwrap();
        let search = Input::from_arguments(&matches).unwrap().build().unwrap();
        Runner::new(search).run().unwrap()
    }
}

fn read_table(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .unwrap();
    let headers = rdr.headers().unwrap().iter().map(String::from).collect();
    let rows = rdr
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

fn numbers(row: &[String], from: usize) -> Vec<f64> {
    row[from..].iter().map(|v| v.parse().unwrap()).collect()
}

#[test]
fn quantify_crux_run() {
    let ws = Workspace::new();
    let search = ws.run(&[]);

    assert_eq!(search.output_paths.len(), 3);
    assert!(search.output_paths[2].ends_with("results.json"));

    let (headers, rows) = read_table(&ws.path("out/tmt_out.txt"));
    assert_eq!(
        headers,
        vec![
            "file_idx",
            "scan",
            "charge",
            "percolator q-value",
            "sequence",
            "protein id",
            "m126.127726",
            "m127.131081",
            "spectrum_int"
        ]
    );

    // Scan 9 is not in the file and the q = 0.5 PSM is filtered out
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][1], "2");
    assert_eq!(rows[0][4], "PEPTIDEK");
    assert_eq!(numbers(&rows[0], 6), vec![100.0, 50.0, 175.0]);
    assert_eq!(rows[1][1], "3");
    assert_eq!(numbers(&rows[1], 6), vec![7.5, 0.0, 7.5]);
    // Channels with no peak in their window are written as an unsigned zero
    assert_eq!(rows[1][7], "0.0");

    let (headers, rows) = read_table(&ws.path("out/tmt_protein_out.txt"));
    assert_eq!(headers, vec!["protein id", "m126.127726", "m127.131081"]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "sp|P1|A");
    assert_eq!(numbers(&rows[0], 1), vec![100.0, 50.0]);
    assert_eq!(rows[1][0], "sp|P1|A,sp|P2|B");
    assert_eq!(numbers(&rows[1], 1), vec![7.5, 0.0]);

    let manifest: serde_json::Value =
        serde_json::from_slice(&std::fs::read(ws.path("out/results.json")).unwrap()).unwrap();
    assert_eq!(manifest["tmt"], 2);
    assert_eq!(manifest["parsimony"], "all");
    assert_eq!(manifest["quant"]["digits"], 2);
}

#[test]
fn unique_peptides_only() {
    let ws = Workspace::new();
    ws.run(&["-u"]);

    let (_, rows) = read_table(&ws.path("out/tmt_out.txt"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][4], "PEPTIDEK");

    let (_, rows) = read_table(&ws.path("out/tmt_protein_out.txt"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "sp|P1|A");
}

#[test]
fn contaminant_correction() {
    let ws = Workspace::new();
    let matrix = ws.path("contaminants.csv");
    std::fs::write(&matrix, ",126,127C\n126,1,0\n127C,0,1\n").unwrap();

    for method in [None, Some("--exact-solve")] {
        let mut extra = vec!["-c", matrix.to_str().unwrap()];
        extra.extend(method);
        ws.run(&extra);

        let (headers, rows) = read_table(&ws.path("out/tmt_out.txt"));
        assert_eq!(
            &headers[6..],
            &[
                "m126.127726",
                "m127.131081",
                "spectrum_int",
                "m126.127726_cor",
                "m127.131081_cor"
            ]
        );
        let corrected = numbers(&rows[0], 9);
        assert!((corrected[0] - 100.0).abs() < 1e-9, "{:?}", corrected);
        assert!((corrected[1] - 50.0).abs() < 1e-9, "{:?}", corrected);

        let (headers, _) = read_table(&ws.path("out/tmt_protein_out.txt"));
        assert_eq!(
            headers,
            vec!["protein id", "m126.127726_cor", "m127.131081_cor"]
        );
    }
}

#[test]
fn wrong_matrix_shape_is_fatal() {
    let ws = Workspace::new();
    let matrix = ws.path("contaminants.csv");
    std::fs::write(&matrix, ",126\n126,1\n").unwrap();

    let mzml = ws.path("mzml");
    let id = ws.path("id");
    let out = ws.path("out");
    let matches = command()
        .try_get_matches_from([
            "tmtquant",
            mzml.to_str().unwrap(),
            id.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "-m",
            "2",
            "-c",
            matrix.to_str().unwrap(),
        ])
        .unwrap();
    let search = Input::from_arguments(&matches).unwrap().build().unwrap();
    assert!(Runner::new(search).run().is_err());
}

#[test]
fn fraction_count_mismatch_is_fatal() {
    let ws = Workspace::new();
    std::fs::copy(ws.path("mzml/F1.mzML"), ws.path("mzml/F2.mzML")).unwrap();

    let mzml = ws.path("mzml");
    let id = ws.path("id");
    let out = ws.path("out");
    let matches = command()
        .try_get_matches_from([
            "tmtquant",
            mzml.to_str().unwrap(),
            id.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ])
        .unwrap();
    let search = Input::from_arguments(&matches).unwrap().build().unwrap();
    let err = Runner::new(search).run().unwrap_err();
    assert!(err.to_string().contains("2 mzML files"), "{}", err);
}
