use std::path::Path;
use std::process::{Command, Output};

use rusqlite::Connection;

fn inspector(dir: &Path, args: &[&str]) -> std::io::Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_inspector"))
        .args(args)
        .current_dir(dir)
        .env_remove("INSPECTOR_DATABASE")
        .env_remove("INSPECTOR_SITES")
        .env_remove("INSPECTOR_SAMPLE_LIMIT")
        .env_remove("INSPECTOR_LOG")
        .output()
}

#[test]
fn test_missing_database_exits_with_error() {
    test_missing_database_exits_with_error_impl().unwrap();
}

fn test_missing_database_exits_with_error_impl() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("absent.db");

    let output = inspector(dir.path(), &["--database", path.to_str().unwrap(), "-q", "counts"])?;
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.starts_with("❌ Erreur: cannot open database"), "{stderr}");
    assert!(!path.exists());
    Ok(())
}

#[test]
fn test_report_goes_to_stdout() {
    test_report_goes_to_stdout_impl().unwrap();
}

fn test_report_goes_to_stdout_impl() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("opagax.db");
    let conn = Connection::open(&path)?;
    conn.execute_batch(
        r#"
        CREATE TABLE Sessions (Id INTEGER PRIMARY KEY, SiteId TEXT);
        INSERT INTO Sessions (Id, SiteId) VALUES (1, 'SITE_01'), (2, NULL);
        "#,
    )?;
    drop(conn);

    let output = inspector(dir.path(), &["migration"])?;
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8(output.stdout)?,
        "=== Vérification des données existantes ===\n\
         Sessions: 2\n\
         Table Formateurs n'existe pas encore\n\n"
    );
    Ok(())
}
