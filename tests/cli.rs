#![forbid(unsafe_code)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("escala-cli").unwrap();
    cmd.current_dir(dir)
        .env_remove("ESCALA_ENDPOINT")
        .env_remove("ESCALA_PAYLOAD_FIELD")
        .env_remove("ESCALA_POLL_INTERVAL_MS")
        .env_remove("ESCALA_REQUEST_TIMEOUT_MS")
        .env_remove("ESCALA_STATE_PATH")
        .env_remove("ESCALA_LOCALE");
    cmd
}

#[test]
fn weeks_prints_the_month_grid() {
    let dir = tempdir().unwrap();
    cli(dir.path())
        .args(["weeks", "--year", "2025", "--month", "1"])
        .assert()
        .success()
        .stdout(
            "Do Lu Ma Mi Ju Vi Sá\n\
             .. .. .. 01 02 03 04\n\
             05 06 07 08 09 10 11\n\
             12 13 14 15 16 17 18\n\
             19 20 21 22 23 24 25\n\
             26 27 28 29 30 31 ..\n",
        );
}

#[test]
fn weeks_rejects_month_13() {
    let dir = tempdir().unwrap();
    cli(dir.path())
        .args(["weeks", "--year", "2025", "--month", "13"])
        .assert()
        .failure();
}

#[test]
fn render_from_file() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("turnos.json"),
        r#"{"turnos":[{"fecha":"2025-11-03","hora":"08:30:00","sala":"Sala Azul",
            "titular":"Juan Pérez","titular_disponible":true,
            "auxiliar_1":"","aux1_disponible":true,
            "auxiliar_2":"No disponible","aux2_disponible":false,
            "auxiliar_3":null,"aux3_disponible":true}]}"#,
    )
    .unwrap();

    cli(dir.path())
        .args(["render", "--input", "turnos.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Calendario de Turnos - Noviembre 2025"))
        .stdout(predicate::str::contains("08:30 Sala Azul: Juan P. FALTA FALTA"));

    cli(dir.path())
        .args(["--locale", "en", "render", "--input", "turnos.json", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"month_name\":\"November\""));
}

#[test]
fn render_failure_shows_placeholder_and_exits_nonzero() {
    let dir = tempdir().unwrap();
    cli(dir.path())
        .args(["render", "--input", "missing.json"])
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("No se pudieron cargar los turnos"));
}

#[test]
fn pause_requires_admin_session() {
    let dir = tempdir().unwrap();

    cli(dir.path())
        .arg("pause")
        .assert()
        .failure()
        .stderr(predicate::str::contains("administrator"));

    cli(dir.path())
        .args(["session", "--user", "Ana García"])
        .assert()
        .success()
        .stdout("session: Ana García\n");
    cli(dir.path()).arg("pause").assert().failure();

    cli(dir.path())
        .args(["session", "--admin"])
        .assert()
        .success()
        .stdout("session: administrador\n");
    cli(dir.path())
        .arg("pause")
        .assert()
        .success()
        .stdout("auto-refresh paused\n");

    let state = fs::read_to_string(dir.path().join("escala-state.json")).unwrap();
    let state: serde_json::Value = serde_json::from_str(&state).unwrap();
    assert_eq!(state["paused"], true);
    assert_eq!(state["is_admin"], true);
    assert_eq!(state["user_name"], "Ana García");

    cli(dir.path()).arg("resume").assert().success();
    cli(dir.path())
        .args(["session", "--logout"])
        .assert()
        .success()
        .stdout("session: anonymous\n");
}

const BATCH_WITH_IDS: &str = r#"[{"fecha":"03/11/2025 08:30","hora":"08:30:00","sala":"Sala Azul",
    "titular":"Juan Pérez","titular_disponible":true,"titular_id":11,
    "auxiliar_1":"","aux1_disponible":true,"auxiliar_1_id":12,
    "auxiliar_2":"No disponible","aux2_disponible":false,"auxiliar_2_id":13}]"#;

#[test]
fn slots_lists_positions_with_their_ids() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("turnos.json"), BATCH_WITH_IDS).unwrap();

    cli(dir.path())
        .args(["slots", "--input", "turnos.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "  11  2025-11-03 08:30 Sala Azul  Titular: Juan Pérez",
        ))
        .stdout(predicate::str::contains("  12  2025-11-03 08:30 Sala Azul  Auxiliar 1: FALTA"))
        .stdout(predicate::str::contains("Auxiliar 2: No disponible"))
        .stdout(predicate::str::contains("   -  2025-11-03 08:30 Sala Azul  Auxiliar 3: FALTA"));
}

#[test]
fn claim_and_release_are_checked_client_side() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("turnos.json"), BATCH_WITH_IDS).unwrap();

    cli(dir.path())
        .args(["claim", "12", "--input", "turnos.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no user name"));

    cli(dir.path())
        .args(["session", "--user", "Ana García"])
        .assert()
        .success();
    cli(dir.path())
        .args(["claim", "11", "--input", "turnos.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already taken by Juan Pérez"));
    cli(dir.path())
        .args(["claim", "13", "--input", "turnos.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not offered"));

    cli(dir.path())
        .args(["release", "11", "--input", "turnos.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("administrator"));
}
