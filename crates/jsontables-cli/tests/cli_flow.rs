use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use jsontables_core::{Column, ColumnType, JsonTables, Row, StoreConfig, Value};
use uuid::Uuid;

const SALT: &str = "YU7icKHkVp5aARqK";

fn bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_jsontables"))
}

struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(prefix: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time")
            .as_nanos();
        let name = format!("{}_{}_{}", prefix, std::process::id(), nanos);
        let path = std::env::temp_dir().join(name);
        fs::create_dir_all(path.join("config")).expect("create config dir");
        Self { path }
    }

    fn data_file(&self) -> PathBuf {
        self.path.join("people.json")
    }

    fn config_home(&self) -> PathBuf {
        self.path.join("config")
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn seed_people(path: &Path) {
    let config = StoreConfig::new(path, "People").with_salt(SALT);
    let outcome = JsonTables::connect(config);
    let diagnostics = outcome.diagnostics.to_string();
    let db = outcome.value.expect(&diagnostics);

    let added = db.add_columns(
        "People",
        vec![
            Column::new("ID", ColumnType::Uuid).unique(),
            Column::new("Name", ColumnType::String),
            Column::new("Age", ColumnType::Integer),
            Column::new("Password", ColumnType::Secure),
        ],
    );
    assert!(added.success, "{}", added.diagnostics);

    for (name, age, password) in [("Ada", 36, "lovelace"), ("Bob", 25, "builder")] {
        let row = Row::new()
            .with("ID", Uuid::new_v4())
            .with("Name", name)
            .with("Age", age)
            .with("Password", Value::secure(password));
        let saved = db.save_record("People", row, "");
        assert!(saved.success, "{}", saved.diagnostics);
    }
}

fn command(temp: &TempDir) -> Command {
    let mut cmd = Command::new(bin());
    cmd.env("XDG_CONFIG_HOME", temp.config_home())
        .env("JSONTABLES_SALT", SALT)
        .env_remove("JSONTABLES_FILE")
        .env_remove("JSONTABLES_DATASET")
        .env_remove("JSONTABLES_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn run_with_file(temp: &TempDir, args: &[&str]) -> Output {
    let file = temp.data_file();
    let mut cmd = command(temp);
    cmd.arg("--file")
        .arg(&file)
        .arg("--dataset")
        .arg("People")
        .args(args);
    cmd.output().expect("run jsontables")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_tables_lists_seeded_table() {
    let temp = TempDir::new("jt_cli_tables");
    seed_people(&temp.data_file());

    let output = run_with_file(&temp, &["tables"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "People");
}

#[test]
fn test_rows_json_masks_secure_columns_unless_revealed() {
    let temp = TempDir::new("jt_cli_rows");
    seed_people(&temp.data_file());

    let output = run_with_file(&temp, &["rows", "People", "--json", "--order-by", "Age"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let rows: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("json output");
    let rows = rows.as_array().expect("array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["Name"], "Bob");
    assert_eq!(rows[0]["Age"], 25);
    assert_eq!(rows[0]["Password"], "********");

    let output = run_with_file(
        &temp,
        &["rows", "People", "--json", "--reveal", "--where", "Name = 'Ada'"],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    let rows: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("json output");
    assert_eq!(rows[0]["Password"], "lovelace");
}

#[test]
fn test_rows_table_output_hides_plaintext() {
    let temp = TempDir::new("jt_cli_render");
    seed_people(&temp.data_file());

    let output = run_with_file(&temp, &["rows", "People"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Ada"));
    assert!(!text.contains("lovelace"));
}

#[test]
fn test_count_and_delete() {
    let temp = TempDir::new("jt_cli_delete");
    seed_people(&temp.data_file());

    let output = run_with_file(&temp, &["count", "People", "--where", "Age > 30"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "1");

    let output = run_with_file(&temp, &["delete", "People", "--where", "Name = 'Bob'"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("Deleted 1 row(s)"));

    let output = run_with_file(&temp, &["count", "People"]);
    assert_eq!(stdout(&output).trim(), "1");
}

#[test]
fn test_delete_matching_nothing_warns() {
    let temp = TempDir::new("jt_cli_nomatch");
    seed_people(&temp.data_file());

    let output = run_with_file(&temp, &["delete", "People", "--where", "Name = 'Nobody'"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("Warning:"));
    assert!(stdout(&output).contains("Deleted 0 row(s)"));
}

#[test]
fn test_delete_requires_where_clause() {
    let temp = TempDir::new("jt_cli_nowhere");
    seed_people(&temp.data_file());

    let output = run_with_file(&temp, &["delete", "People", "--where", "  "]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Refusing to delete"));

    let output = run_with_file(&temp, &["count", "People"]);
    assert_eq!(stdout(&output).trim(), "2");
}

#[test]
fn test_bad_where_clause_fails() {
    let temp = TempDir::new("jt_cli_badwhere");
    seed_people(&temp.data_file());

    let output = run_with_file(&temp, &["count", "People", "--where", "Missing = 1"]);
    assert!(!output.status.success());
}

#[test]
fn test_drop_table_persists() {
    let temp = TempDir::new("jt_cli_drop");
    seed_people(&temp.data_file());

    let output = run_with_file(&temp, &["drop-table", "People"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let output = run_with_file(&temp, &["tables"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).trim().is_empty());
}

#[test]
fn test_schema_shows_column_types() {
    let temp = TempDir::new("jt_cli_schema");
    seed_people(&temp.data_file());

    let output = run_with_file(&temp, &["schema", "People"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Password"));
    assert!(text.contains("Secure"));
}

#[test]
fn test_missing_data_file_fails() {
    let temp = TempDir::new("jt_cli_missing");

    let output = run_with_file(&temp, &["tables"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("No data file found"));
}

#[test]
fn test_missing_config_explains_setup() {
    let temp = TempDir::new("jt_cli_noconfig");

    let output = command(&temp).arg("tables").output().expect("run jsontables");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("No config found"));
}

#[test]
fn test_config_init_then_use_config() {
    let temp = TempDir::new("jt_cli_config");
    seed_people(&temp.data_file());

    let output = command(&temp)
        .args(["config", "init", "--dataset", "People", "--path"])
        .arg(temp.data_file())
        .output()
        .expect("run jsontables");
    assert!(output.status.success(), "{}", stderr(&output));
    let config_path = temp.config_home().join("jsontables").join("config.toml");
    assert!(config_path.exists());

    let output = command(&temp)
        .args(["config", "init"])
        .output()
        .expect("run jsontables");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("already exists"));

    let output = command(&temp).arg("tables").output().expect("run jsontables");
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "People");
}

#[test]
fn test_keygen_outputs() {
    let temp = TempDir::new("jt_cli_keygen");

    let output = command(&temp).args(["keygen", "salt"]).output().expect("run");
    assert!(output.status.success());
    let salt = stdout(&output).trim().to_string();
    assert_eq!(salt.len(), 32);
    assert!(salt.chars().all(|c| c.is_ascii_alphanumeric()));

    let output = command(&temp).args(["keygen", "key"]).output().expect("run");
    let key = stdout(&output).trim().to_string();
    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));

    let output = command(&temp).args(["keygen", "iv"]).output().expect("run");
    assert_eq!(stdout(&output).trim().len(), 32);
}
