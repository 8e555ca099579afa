// Binary tests for `pedidos run` / `pedidos validate`.
//
// Fixtures are semicolon CSVs written to a temp dir next to a config file,
// the way Brazilian ERP exports arrive.
//
// Run with: cargo test -p pedidos-cli --test run_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::{tempdir, TempDir};

fn pedidos() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pedidos"))
}

const REPORT: &str = "\
Data;Pedido;Cliente;Vendedor;Vlr. Unit.;Qtde;Valor
Produto: - Cartucho .38 SPL;;;;;;
15/03/2024;101;Alfa Comércio Ltda;Marcos;3,50;50;175,00
16/03/2024;102;Loja  Beta;Marcos;3,50;10;35,00
Produto: Pistola 9mm;;;;;;
18/03/2024;104;Delta;Marcos;4.500,00;1;4.500,00
Data Emissão: 20/03/2024 10:00;;;;;;
Total geral;;;;;61;
";

const REFERENCE: &str = "\
Produto;Categoria;Calibre
Cartucho .38 SPL;Munição;.38
pistola 9 mm;Arma curta;9mm
";

const CUSTOMERS: &str = "\
Razão social;Nome fantasia;CNPJ/CPF;Telefones;E-mails
Alfa Comércio Ltda;Alfa;11.111.111/0001-11;(11) 5555-0001;
Beta Armas SA;Loja Beta;22.222.222/0001-22;;beta@ex.com
";

const CONFIG: &str = r#"
name = "Pedidos março"

[inputs]
report = "relatorio.csv"
reference = "produtos.csv"
customers = "clientes.csv"

[output]
dir = "saida"
prefix = "pedidos"
format = "csv"
"#;

/// Temp dir holding the three inputs and `marco.pedidos.toml`.
fn workspace(config: &str) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("relatorio.csv"), REPORT).unwrap();
    std::fs::write(dir.path().join("produtos.csv"), REFERENCE).unwrap();
    std::fs::write(dir.path().join("clientes.csv"), CUSTOMERS).unwrap();
    let config_path = dir.path().join("marco.pedidos.toml");
    std::fs::write(&config_path, config).unwrap();
    (dir, config_path)
}

fn run_json(config_path: &Path) -> (Output, serde_json::Value) {
    let output = pedidos()
        .args(["run", config_path.to_str().unwrap(), "--json"])
        .output()
        .expect("pedidos run --json");
    assert!(
        output.status.success(),
        "exit code: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let val: serde_json::Value = serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be valid JSON: {e}\nstdout:\n{stdout}"));
    (output, val)
}

fn only_file_in(dir: &Path) -> PathBuf {
    let files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1, "expected one output file, got {files:?}");
    files.into_iter().next().unwrap()
}

// ===========================================================================
// pedidos run
// ===========================================================================

#[test]
fn run_json_reports_every_stage() {
    let (dir, config_path) = workspace(CONFIG);
    let (_, val) = run_json(&config_path);

    assert_eq!(val["meta"]["config_name"], "Pedidos março");
    assert_eq!(val["dictionary_entries"], 2);
    assert_eq!(val["parse"]["header_rows"], 2);
    assert_eq!(val["parse"]["footer_found"], true);
    assert_eq!(val["parse"]["labeled"], true);
    assert_eq!(val["total_records"], 3);

    assert_eq!(val["enrichment"]["exact"], 2);
    assert_eq!(val["enrichment"]["fuzzy"], 1);
    assert_eq!(val["enrichment"]["unmatched"], 0);
    assert_eq!(val["enrichment"]["threshold"], 70);

    assert_eq!(val["join"]["by_legal_name"], 1);
    assert_eq!(val["join"]["by_trade_name"], 1);
    assert_eq!(val["join"]["unmatched"], 1);

    let out = PathBuf::from(val["output"].as_str().unwrap());
    assert!(out.starts_with(dir.path().join("saida")));
    assert_eq!(out.extension().unwrap(), "csv");
    assert!(out.exists());
}

#[test]
fn run_writes_enriched_csv() {
    let (dir, config_path) = workspace(CONFIG);
    run_json(&config_path);

    let written = only_file_in(&dir.path().join("saida"));
    let name = written.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("pedidos-"), "unexpected name {name}");

    let content = std::fs::read_to_string(&written).unwrap();
    let mut lines = content.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("descricao,"));
    assert!(header.contains("categoria,calibre"));
    assert!(header.ends_with("CNPJ/CPF,Telefones,E-mails"));

    let rows: Vec<_> = lines.collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].starts_with("Cartucho .38 SPL,2024-03-15,101,"));
    assert!(rows[0].contains("Munição"));
    assert!(rows[0].contains("11.111.111/0001-11"));
    // Whitespace collapse lets "Loja  Beta" join by trade name
    assert!(rows[1].contains("Loja Beta"));
    assert!(rows[1].contains("beta@ex.com"));
    assert!(rows[2].contains("Arma curta"));
}

#[test]
fn run_human_summary_on_stderr() {
    let (_dir, config_path) = workspace(CONFIG);
    let output = pedidos()
        .args(["run", config_path.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty(), "human mode must keep stdout clean");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Pedidos março: 3 records, 13 columns"), "stderr:\n{stderr}");
    assert!(stderr.contains("join: 1 by legal name, 1 by trade name, 1 unmatched"));
    assert!(stderr.contains("wrote "));
}

#[test]
fn output_dir_flag_overrides_config() {
    let (dir, config_path) = workspace(CONFIG);
    let elsewhere = dir.path().join("outra");
    let output = pedidos()
        .args(["run", config_path.to_str().unwrap(), "--json", "--output-dir"])
        .arg(&elsewhere)
        .output()
        .unwrap();
    assert!(output.status.success());
    only_file_in(&elsewhere);
    assert!(!dir.path().join("saida").exists());
}

#[test]
fn threshold_flag_overrides_config() {
    let (_dir, config_path) = workspace(CONFIG);
    let output = pedidos()
        .args(["run", config_path.to_str().unwrap(), "--json", "--threshold", "100"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let val: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(val["enrichment"]["threshold"], 100);
    assert_eq!(val["enrichment"]["fuzzy"], 0);
    assert_eq!(val["enrichment"]["unmatched"], 1);
}

#[test]
fn missing_reference_is_a_warning() {
    let (dir, config_path) = workspace(CONFIG);
    std::fs::remove_file(dir.path().join("produtos.csv")).unwrap();

    let (_, val) = run_json(&config_path);
    assert_eq!(val["dictionary_entries"], 0);
    assert_eq!(val["enrichment"]["unmatched"], 3);

    let notices = val["notices"].as_array().unwrap();
    assert!(notices.iter().any(|n| n["stage"] == "load"
        && n["severity"] == "warning"
        && n["message"].as_str().unwrap().contains("produtos.csv")));
}

// ===========================================================================
// Failures and exit codes
// ===========================================================================

#[test]
fn missing_report_exits_load() {
    let (dir, config_path) = workspace(CONFIG);
    std::fs::remove_file(dir.path().join("relatorio.csv")).unwrap();

    let output = pedidos()
        .args(["run", config_path.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot load report"));
    assert!(stderr.contains("hint:"));
    assert!(!dir.path().join("saida").exists(), "no output on load failure");
}

#[test]
fn invalid_config_exits_3() {
    let bad = CONFIG.replace("[output]", "[matching]\nthreshold = 150\n\n[output]");
    let (_dir, config_path) = workspace(&bad);

    for sub in ["run", "validate"] {
        let output = pedidos()
            .args([sub, config_path.to_str().unwrap()])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(3), "{sub}");
        assert!(String::from_utf8_lossy(&output.stderr).contains("matching.threshold"));
    }
}

#[test]
fn unreadable_config_exits_3() {
    let output = pedidos()
        .args(["validate", "/nonexistent/marco.pedidos.toml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn rejected_duplicate_key_exits_pipeline() {
    let config = CONFIG.replace("[output]", "[matching]\nduplicate_keys = \"reject\"\n\n[output]");
    let (dir, config_path) = workspace(&config);
    let reference = format!("{REFERENCE}CARTUCHO .38 spl;Munição;.38\n");
    std::fs::write(dir.path().join("produtos.csv"), reference).unwrap();

    let output = pedidos()
        .args(["run", config_path.to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(5));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("keep_last"), "hint expected:\n{stderr}");
}

#[test]
fn threshold_out_of_range_is_usage_error() {
    let (_dir, config_path) = workspace(CONFIG);
    let output = pedidos()
        .args(["run", config_path.to_str().unwrap(), "--threshold", "101"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ===========================================================================
// pedidos validate
// ===========================================================================

#[test]
fn validate_prints_settings() {
    let (_dir, config_path) = workspace(CONFIG);
    let output = pedidos()
        .args(["validate", config_path.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("valid: 'Pedidos março'"), "stderr:\n{stderr}");
    assert!(stderr.contains("threshold 70"));
    assert!(stderr.contains("output csv"));
}
