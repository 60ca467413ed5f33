use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn planner(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("payment_planner_cli").unwrap();
    cmd.env("PAYMENT_PLANNER_CLI_SCRIPT", "1")
        .env("PAYMENT_PLANNER_HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn script_mode_computes_and_stores_a_plan() {
    let home = TempDir::new().unwrap();
    let csv_path = home.path().join("cash.csv");
    let input = format!(
        "new demo\nset weeks 4\nmonth add \"Jan 2026\" 4\nitem add 01 Framing 1000 1 4\ncompute\nexport csv {}\nstore demo\nexit\n",
        csv_path.display()
    );

    planner(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Cash flow"))
        .stdout(contains("Contract $1,150.00"))
        .stdout(contains("Plan `demo` stored"));

    let stored = std::fs::read_to_string(home.path().join("plans/demo.json")).unwrap();
    assert!(stored.contains("\"Framing\""));
    let csv = std::fs::read_to_string(csv_path).unwrap();
    assert!(csv.starts_with("Month,Pre-tax"));
    let config = std::fs::read_to_string(home.path().join("config.json")).unwrap();
    assert!(config.contains("\"last_opened_plan\": \"demo\""));
}

#[test]
fn script_mode_needs_explicit_cap_for_overruns() {
    let home = TempDir::new().unwrap();
    let input = "set weeks 15\nmonth add Phase 15\nitem add 07 Finishes 1500 10 20\ncompute\ncap\nitem list\nexit\n";

    planner(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stderr(contains("run past the project end"))
        .stdout(contains("weeks 10-29"))
        .stdout(contains("Capped 1 item(s)."));
}

#[test]
fn compute_force_accepts_week_mismatch() {
    let home = TempDir::new().unwrap();
    let input = "set weeks 4\nmonth add Jan 2\nitem add 01 Build 400 1 4\ncompute --force\nexit\n";

    planner(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stderr(contains("Months add up to 2 weeks but the project runs 4."))
        .stdout(contains("Cash flow"));
}

#[test]
fn unknown_command_suggests_closest_match() {
    let home = TempDir::new().unwrap();
    planner(&home)
        .write_stdin("compte\nexit\n")
        .assert()
        .success()
        .stderr(contains("Unknown command `compte`"))
        .stdout(contains("Did you mean `compute`?"));
}

#[test]
fn month_auto_without_start_date_reports_error() {
    let home = TempDir::new().unwrap();
    planner(&home)
        .write_stdin("month auto\nmonth auto 2026-01-05\nexit\n")
        .assert()
        .success()
        .stderr(contains("Start date is not set"))
        .stdout(contains("Jan 2026"));
}

#[test]
fn version_prints_package_version() {
    let home = TempDir::new().unwrap();
    planner(&home)
        .write_stdin("version\n")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}
