use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Run poolboard in `dir` with a clean environment.
fn poolboard(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("poolboard");
    cmd.current_dir(dir.path())
        .env_remove("POOLBOARD_DIR")
        .env_remove("POOLBOARD_ACTOR")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn init_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    poolboard(&dir).arg("init").assert().success();
    dir
}

fn add(dir: &TempDir, args: &[&str]) {
    poolboard(dir).arg("add").args(args).assert().success();
}

// ─── Init ────────────────────────────────────────────────────────

#[test]
fn init_creates_config_and_database() {
    let dir = TempDir::new().unwrap();

    poolboard(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Project ready"));

    dir.child(".poolboard/config.toml")
        .assert(predicate::str::contains("page_size = 20"));
    dir.child(".poolboard/poolboard.db")
        .assert(predicate::path::exists());
}

#[test]
fn init_twice_fails() {
    let dir = init_project();
    poolboard(&dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn custom_dir_flag_is_used() {
    let dir = TempDir::new().unwrap();
    poolboard(&dir)
        .args(["--dir", "office", "init"])
        .assert()
        .success();
    dir.child("office/config.toml").assert(predicate::path::exists());

    poolboard(&dir)
        .args(["--dir", "office", "add", "Casa Azul"])
        .assert()
        .success();
}

#[test]
fn commands_before_init_point_to_init() {
    let dir = TempDir::new().unwrap();
    poolboard(&dir)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("poolboard init"));
}

// ─── Add / list ──────────────────────────────────────────────────

#[test]
fn added_customer_is_listed_with_formatting() {
    let dir = init_project();
    add(
        &dir,
        &[
            "Casa Azul",
            "--status",
            "Active (routed)",
            "--technician",
            "vini  penner.",
            "--filter-type",
            "Hayward C750",
            "--filter-value",
            "1234.5",
            "--last-service",
            "01/10/2025",
        ],
    );

    poolboard(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Casa Azul"))
        .stdout(predicate::str::contains("✓ Active"))
        .stdout(predicate::str::contains("Vini Penner"))
        .stdout(predicate::str::contains("$1,234.50"))
        .stdout(predicate::str::contains("01/10/2025"))
        .stdout(predicate::str::contains("Not scheduled"))
        .stdout(predicate::str::contains("1 active"));
}

#[test]
fn duplicate_name_with_accented_capitals_is_rejected() {
    let dir = init_project();
    add(&dir, &["Água Clara"]);

    poolboard(&dir)
        .args(["add", "ÁGUA CLARA"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn duplicate_name_is_rejected_case_insensitively() {
    let dir = init_project();
    add(&dir, &["Casa Azul"]);

    poolboard(&dir)
        .args(["add", "CASA AZUL"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    poolboard(&dir)
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_rows\": 1"));
}

#[test]
fn invalid_values_are_rejected() {
    let dir = init_project();
    poolboard(&dir)
        .args(["add", "Casa", "--route-value=-10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be negative"));

    poolboard(&dir)
        .args(["add", "Casa", "--status", "maybe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown status"));

    poolboard(&dir)
        .args(["add", "Casa", "--next-service", "31/02/2026"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid date"));
}

#[test]
fn status_filter_returns_only_matching_rows() {
    let dir = init_project();
    add(&dir, &["Lead Pool"]);
    add(&dir, &["Active Pool", "--status", "Active (routed)"]);

    poolboard(&dir)
        .args(["list", "--status", "Lead"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lead Pool"))
        .stdout(predicate::str::contains("Active Pool").not());
}

#[test]
fn month_filter_matches_either_date() {
    let dir = init_project();
    add(&dir, &["March Next", "--next-service", "10/03/2026"]);
    add(&dir, &["March Last", "--last-service", "2025-03-02"]);
    add(&dir, &["No Dates"]);

    poolboard(&dir)
        .args(["list", "--month", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("March Next"))
        .stdout(predicate::str::contains("March Last"))
        .stdout(predicate::str::contains("No Dates").not());

    poolboard(&dir)
        .args(["list", "--month", "13"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a month"));
}

#[test]
fn search_and_technician_filters_combine() {
    let dir = init_project();
    add(&dir, &["Casa Azul", "--technician", "Pedro"]);
    add(&dir, &["Casa Verde", "--technician", "Lucca"]);
    add(&dir, &["Villa Azul", "--technician", "pedro"]);

    poolboard(&dir)
        .args(["list", "--search", "casa", "--technician", "PEDRO"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Casa Azul"))
        .stdout(predicate::str::contains("Casa Verde").not())
        .stdout(predicate::str::contains("Villa Azul").not());
}

#[test]
fn paginated_rows_carry_absolute_indices() {
    let dir = init_project();
    add(&dir, &["A Pool"]);
    add(&dir, &["B Pool"]);
    add(&dir, &["C Pool"]);

    poolboard(&dir)
        .args(["list", "--page", "2", "--page-size", "2", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"index\": 2"))
        .stdout(predicate::str::contains("\"customer\": \"C Pool\""))
        .stdout(predicate::str::contains("\"page_count\": 2"));
}

#[test]
fn list_options_shows_technicians() {
    let dir = init_project();
    add(&dir, &["Casa", "--technician", "lucca ."]);

    poolboard(&dir)
        .args(["list", "--options"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unassigned, Lucca"));

    poolboard(&dir)
        .arg("techs")
        .assert()
        .success()
        .stdout(predicate::str::contains("Lucca"));
}

// ─── Update / rename / history ───────────────────────────────────

#[test]
fn batch_update_logs_every_field() {
    let dir = init_project();
    add(&dir, &["Casa Azul"]);

    poolboard(&dir)
        .args([
            "update",
            "casa azul",
            "status=Active (no route)",
            "technician=pedro santos",
            "next_service=2026-04-01",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 fields"));

    poolboard(&dir)
        .args(["log", "--customer", "Casa Azul"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 entries"))
        .stdout(predicate::str::contains("status: Lead → Active (no route)"))
        .stdout(predicate::str::contains("technician: Unassigned → Pedro Santos"))
        .stdout(predicate::str::contains("next_service: — → 2026-04-01"));
}

#[test]
fn update_with_unknown_field_changes_nothing() {
    let dir = init_project();
    add(&dir, &["Casa Azul"]);

    poolboard(&dir)
        .args(["update", "Casa Azul", "technician=Pedro", "colour=blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Valid fields"));

    poolboard(&dir)
        .args(["log", "--customer", "Casa Azul"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 entries"));
}

#[test]
fn update_of_missing_customer_fails() {
    let dir = init_project();
    poolboard(&dir)
        .args(["update", "Ghost", "status=Lead"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn rename_keeps_history_and_checks_conflicts() {
    let dir = init_project();
    add(&dir, &["Casa"]);
    add(&dir, &["Villa"]);

    poolboard(&dir)
        .args(["rename", "Casa", "villa"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    poolboard(&dir)
        .args(["rename", "Casa", "Casa Azul"])
        .assert()
        .success();

    poolboard(&dir)
        .args(["log", "--customer", "Casa Azul"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name: Casa → Casa Azul"));
}

#[test]
fn actor_comes_from_environment() {
    let dir = init_project();
    poolboard(&dir)
        .env("POOLBOARD_ACTOR", "maria")
        .args(["add", "Casa"])
        .assert()
        .success();

    poolboard(&dir)
        .args(["log", "--last", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("by maria"));
}

#[test]
fn log_since_future_date_is_empty() {
    let dir = init_project();
    add(&dir, &["Casa"]);
    poolboard(&dir)
        .args(["log", "--since", "2999-01-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No history entries found"));
}

// ─── Stats / technicians ─────────────────────────────────────────

#[test]
fn stats_sum_active_revenue_by_technician() {
    let dir = init_project();
    add(
        &dir,
        &["A", "--status", "ativo", "--technician", "Pedro", "--route-value", "100", "--filter-value", "50"],
    );
    add(&dir, &["B", "--status", "Inactive", "--technician", "Pedro", "--route-value", "999"]);

    poolboard(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("$100.00"))
        .stdout(predicate::str::contains("$150.00").not())
        .stdout(predicate::str::contains("$999.00").not());
}

#[test]
fn normalize_techs_reports_clean_store() {
    let dir = init_project();
    add(&dir, &["Casa", "--technician", "lucca ."]);

    poolboard(&dir)
        .args(["normalize-techs", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already normalized"))
        .stdout(predicate::str::contains("Lucca"));
}
