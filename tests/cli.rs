mod common;

use std::fs;

use assert_cmd::Command;
use common::{TestWorkspace, extract};
use covid_loader::record::CovidRecord;
use predicates::prelude::*;
use predicates::str::contains;

fn sample(workspace: &TestWorkspace) -> std::path::PathBuf {
    workspace.write(
        "latest.csv",
        &extract(&[
            "KEN,Africa,Kenya,2024-01-05,1000,10,,",
            "NGA,Africa,Nigeria,2024-01-04,1900,15,4,0",
            "NGA,Africa,Nigeria,2024-01-05,2000.0,100,5,1",
            "KEN,Africa,Kenya,bad-date,1,1,1,1",
        ]),
    )
}

fn covid_loader(workspace: &TestWorkspace) -> Command {
    let mut cmd = Command::cargo_bin("covid-loader").expect("binary exists");
    cmd.current_dir(workspace.path())
        .env_clear()
        .env("RUST_LOG", "off");
    cmd
}

fn load_sample(workspace: &TestWorkspace) -> String {
    let input = sample(workspace);
    let db = workspace.db_path("covid.db");
    covid_loader(workspace)
        .args(["load", "-i", input.to_str().unwrap(), "--sqlite", db.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains(
            "Loaded 3 row(s) into covid_data (4 read, 1 rejected, 0 duplicate(s) dropped)",
        ));
    db.to_str().unwrap().to_string()
}

#[test]
fn export_writes_csv_with_canonical_header() {
    let workspace = TestWorkspace::new();
    let db = load_sample(&workspace);

    let output = covid_loader(&workspace)
        .args(["--sqlite", &db, "export", "--location", "kenya"])
        .output()
        .expect("run export");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf-8 output");
    assert_eq!(
        stdout,
        "iso_code,continent,location,date,total_cases,new_cases,total_deaths,new_deaths\n\
         KEN,Africa,Kenya,2024-01-05,1000,10,,\n"
    );
}

#[test]
fn export_json_to_file_round_trips_records() {
    let workspace = TestWorkspace::new();
    let db = load_sample(&workspace);
    let out = workspace.path().join("view.json");

    covid_loader(&workspace)
        .args([
            "--sqlite",
            &db,
            "export",
            "--format",
            "json",
            "--from",
            "2024-01-05",
            "-o",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let records: Vec<CovidRecord> =
        serde_json::from_str(&fs::read_to_string(&out).expect("read export")).expect("parse json");
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.date.to_string() == "2024-01-05"));
    assert_eq!(records[0].total_deaths, None);
}

#[test]
fn summary_prints_death_rate_per_location() {
    let workspace = TestWorkspace::new();
    let db = load_sample(&workspace);

    covid_loader(&workspace)
        .args(["--sqlite", &db, "summary"])
        .assert()
        .success()
        .stdout(contains("location"))
        .stdout(contains("Kenya"))
        .stdout(contains("0.25%"))
        .stdout(contains("N/A"));
}

#[test]
fn migrate_copies_between_sqlite_files() {
    let workspace = TestWorkspace::new();
    let db = load_sample(&workspace);
    let copy = workspace.db_path("copy.db");

    covid_loader(&workspace)
        .args([
            "migrate",
            "--from",
            &format!("sqlite://{db}"),
            "--to",
            &format!("sqlite://{}", copy.display()),
        ])
        .assert()
        .success()
        .stdout(contains("Copied 3 row(s) into covid_data"));

    covid_loader(&workspace)
        .args(["--sqlite", copy.to_str().unwrap(), "export"])
        .assert()
        .success()
        .stdout(contains("NGA,Africa,Nigeria,2024-01-04,1900,15,4,0"));
}

#[test]
fn migrate_reads_urls_from_environment() {
    let workspace = TestWorkspace::new();
    let db = load_sample(&workspace);
    let copy = workspace.db_path("copy.db");

    covid_loader(&workspace)
        .arg("migrate")
        .env("MIGRATE_SOURCE_URL", format!("sqlite://{db}"))
        .env("MIGRATE_TARGET_URL", format!("sqlite://{}", copy.display()))
        .assert()
        .success()
        .stdout(contains("Copied 3 row(s)"));
}

#[test]
fn missing_connection_parameters_fail_before_any_work() {
    let workspace = TestWorkspace::new();
    let input = sample(&workspace);

    covid_loader(&workspace)
        .args(["load", "-i", input.to_str().unwrap()])
        .env("DB_HOST", "localhost")
        .assert()
        .failure()
        .stderr(contains("missing required connection parameter(s)"))
        .stderr(contains("DB_PASSWORD"));
}

#[test]
fn invalid_port_in_config_file_is_reported() {
    let workspace = TestWorkspace::new();
    let config = workspace.write(
        "db.yaml",
        "host: localhost\nport: 5432\ndatabase: covid\nuser: loader\npassword: secret\n",
    );

    covid_loader(&workspace)
        .args(["--config", config.to_str().unwrap(), "summary"])
        .env("DB_PORT", "not-a-port")
        .assert()
        .failure()
        .stderr(contains("DB_PORT is invalid"));
}

#[test]
fn missing_extract_is_a_failure() {
    let workspace = TestWorkspace::new();
    let db = workspace.db_path("covid.db");

    covid_loader(&workspace)
        .args(["--sqlite", db.to_str().unwrap(), "load", "-i", "nope.csv"])
        .assert()
        .failure()
        .stderr(contains("is unavailable"));
}

#[test]
fn unknown_store_url_is_rejected() {
    let workspace = TestWorkspace::new();

    covid_loader(&workspace)
        .args(["migrate", "--from", "mysql://u:pw@host/db", "--to", "sqlite://x.db"])
        .assert()
        .failure()
        .stderr(contains("--from"))
        .stderr(contains("pw").not());
}
