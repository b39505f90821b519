//! End-to-end launch attempts against stub clients

use std::time::Duration;

use sshive_core::{CancellationToken, Connection, ErrorKind, LaunchOptions, LaunchStage};
use tempfile::TempDir;

use crate::fixtures::{key_file, leftovers, orchestrator, test_settings, StubBin, TEST_DEADLINE};

const DENIED: &str = "echo 'ops@10.0.0.5: Permission denied (publickey,password).' >&2\nexit 255";
const REFUSED: &str = "echo 'ssh: connect to host 10.0.0.5 port 2222: Connection refused' >&2\nexit 255";

fn identity(argv: &[String]) -> String {
    argv.windows(2)
        .find(|w| w[0] == "-i")
        .map(|w| w[1].clone())
        .unwrap()
}

#[tokio::test]
async fn test_key_launch_succeeds() {
    let bin = StubBin::new();
    bin.add_ssh("exit 0");
    bin.add_terminal("xterm");
    let keys = TempDir::new().unwrap();
    let key = key_file(keys.path(), "id_ed25519");
    let temp = TempDir::new().unwrap();
    let (orch, spawner) = orchestrator(&bin, test_settings(temp.path()));

    let conn = Connection::new("web", "10.0.0.5", "ops")
        .with_port(2222)
        .with_key(&key);
    let outcome = tokio::time::timeout(TEST_DEADLINE, orch.launch(&conn))
        .await
        .unwrap();

    let report = outcome.report().expect("launch should succeed");
    assert_eq!(report.terminal, "XTerm");
    assert!(report.preflight_passed);
    assert_eq!(spawner.count(), 1);

    let recorded = spawner.last().unwrap();
    assert_eq!(recorded.program, bin.path().join("xterm"));
    let argv = recorded.client_argv;
    let key_arg = key.to_string_lossy().into_owned();
    assert!(argv.windows(2).any(|w| w[0] == "-p" && w[1] == "2222"));
    assert!(argv.windows(2).any(|w| w[0] == "-i" && w[1] == key_arg));
    assert_eq!(argv.last().map(String::as_str), Some("ops@10.0.0.5"));
    assert!(recorded.env.is_empty());

    // The probe ran once, in batch mode with the same key
    let calls = bin.ssh_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("BatchMode=yes"));
    assert!(calls[0].contains(&key_arg));

    // Native keys are never copied or deleted
    assert!(key.exists());
    assert!(leftovers(temp.path()).is_empty());
}

#[tokio::test]
async fn test_missing_key_spawns_nothing() {
    let bin = StubBin::new();
    bin.add_ssh("exit 0");
    bin.add_terminal("xterm");
    let temp = TempDir::new().unwrap();
    let (orch, spawner) = orchestrator(&bin, test_settings(temp.path()));

    let conn = Connection::new("web", "10.0.0.5", "ops").with_key(temp.path().join("gone"));
    let outcome = orch.launch(&conn).await;

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.kind, ErrorKind::KeyNotFound);
    assert_eq!(failure.stage, LaunchStage::Resolving);
    assert_eq!(spawner.count(), 0);
    assert!(bin.ssh_calls().is_empty());
}

#[tokio::test]
async fn test_password_without_helper() {
    let bin = StubBin::new();
    bin.add_ssh("exit 0");
    bin.add_terminal("xterm");
    let temp = TempDir::new().unwrap();
    let (orch, spawner) = orchestrator(&bin, test_settings(temp.path()));

    let conn = Connection::new("db", "db.internal", "admin").with_password("hunter2");
    let failure = orch.launch(&conn).await.failure().cloned().unwrap();

    assert_eq!(failure.kind, ErrorKind::PasswordHelperMissing);
    assert!(failure.detail.contains("sshpass"));
    assert_eq!(spawner.count(), 0);
    assert!(bin.ssh_calls().is_empty());
}

#[tokio::test]
async fn test_password_launch_through_helper() {
    let bin = StubBin::new();
    bin.add_ssh("exit 0");
    bin.add_sshpass("hunter2");
    bin.add_terminal("xterm");
    let temp = TempDir::new().unwrap();
    let (orch, spawner) = orchestrator(&bin, test_settings(temp.path()));

    let conn = Connection::new("db", "db.internal", "admin").with_password("hunter2");
    let outcome = orch.launch(&conn).await;
    assert!(outcome.is_success(), "{outcome:?}");

    let recorded = spawner.last().unwrap();
    assert_eq!(recorded.env, vec![("SSHPASS".to_string(), "hunter2".to_string())]);
    assert!(recorded.args.iter().all(|a| !a.contains("hunter2")));
    assert!(recorded.client_argv.iter().any(|a| a.ends_with("sshpass")));

    let calls = bin.ssh_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("BatchMode=no"));
    assert!(!calls[0].contains("hunter2"));
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let bin = StubBin::new();
    bin.add_ssh("exit 0");
    bin.add_sshpass("hunter2");
    bin.add_terminal("xterm");
    let temp = TempDir::new().unwrap();
    let (orch, spawner) = orchestrator(&bin, test_settings(temp.path()));

    let conn = Connection::new("db", "db.internal", "admin").with_password("letmein");
    let failure = orch.launch(&conn).await.failure().cloned().unwrap();

    assert_eq!(failure.kind, ErrorKind::AuthRejected);
    assert_eq!(failure.stage, LaunchStage::Validating);
    assert!(!failure.can_override());
    assert_eq!(spawner.count(), 0);
}

#[tokio::test]
async fn test_rejected_key_spawns_nothing() {
    let bin = StubBin::new();
    bin.add_ssh(DENIED);
    bin.add_terminal("xterm");
    let keys = TempDir::new().unwrap();
    let key = key_file(keys.path(), "id_rsa");
    let temp = TempDir::new().unwrap();
    let (orch, spawner) = orchestrator(&bin, test_settings(temp.path()));

    let conn = Connection::new("web", "10.0.0.5", "ops").with_key(&key);
    let failure = orch.launch(&conn).await.failure().cloned().unwrap();

    assert_eq!(failure.kind, ErrorKind::AuthRejected);
    assert!(failure.detail.contains("Permission denied"));
    assert_eq!(spawner.count(), 0);
}

#[tokio::test]
async fn test_unreachable_can_be_overridden() {
    let bin = StubBin::new();
    bin.add_ssh(REFUSED);
    bin.add_terminal("xterm");
    let keys = TempDir::new().unwrap();
    let key = key_file(keys.path(), "id_rsa");
    let temp = TempDir::new().unwrap();
    let (orch, spawner) = orchestrator(&bin, test_settings(temp.path()));
    let conn = Connection::new("web", "10.0.0.5", "ops")
        .with_port(2222)
        .with_key(&key);

    let failure = orch.launch(&conn).await.failure().cloned().unwrap();
    assert_eq!(failure.kind, ErrorKind::Unreachable);
    assert!(failure.can_override());
    assert_eq!(spawner.count(), 0);

    let retry = orch
        .launch_with(&conn, LaunchOptions::skip_preflight(), CancellationToken::new())
        .await;
    let report = retry.report().unwrap();
    assert!(!report.preflight_passed);
    assert_eq!(spawner.count(), 1);
    // The retry did not probe again
    assert_eq!(bin.ssh_calls().len(), 1);
}

#[tokio::test]
async fn test_probe_timeout_leaves_no_key() {
    let bin = StubBin::new();
    bin.add_ssh("exec sleep 30");
    bin.add_puttygen_ok();
    bin.add_terminal("xterm");
    let keys = TempDir::new().unwrap();
    let key = key_file(keys.path(), "deploy.ppk");
    let temp = TempDir::new().unwrap();
    let mut settings = test_settings(temp.path());
    settings.launch.preflight_timeout_secs = 1;
    let (orch, spawner) = orchestrator(&bin, settings);

    let conn = Connection::new("web", "10.0.0.5", "ops").with_key(&key);
    let started = std::time::Instant::now();
    let failure = tokio::time::timeout(TEST_DEADLINE, orch.launch(&conn))
        .await
        .unwrap()
        .failure()
        .cloned()
        .unwrap();

    assert_eq!(failure.kind, ErrorKind::Timeout);
    assert!(failure.can_override());
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(spawner.count(), 0);
    assert!(leftovers(temp.path()).is_empty());
}

#[tokio::test]
async fn test_ppk_launch_removes_converted_key() {
    let bin = StubBin::new();
    bin.add_ssh("exit 0");
    bin.add_puttygen_ok();
    bin.add_terminal("xterm");
    let keys = TempDir::new().unwrap();
    let key = key_file(keys.path(), "deploy.ppk");
    let temp = TempDir::new().unwrap();
    let (orch, spawner) = orchestrator(&bin, test_settings(temp.path()));

    let conn = Connection::new("web", "10.0.0.5", "ops").with_key(&key);
    let outcome = orch.launch(&conn).await;
    assert!(outcome.is_success(), "{outcome:?}");

    let recorded = spawner.last().unwrap();
    assert_eq!(recorded.keys_present, vec![true]);
    let converted = identity(&recorded.client_argv);
    assert!(converted.starts_with(&*temp.path().to_string_lossy()));
    assert!(bin.ssh_calls()[0].contains(&converted));

    // Gone once the attempt is over; the original stays
    assert!(!std::path::Path::new(&converted).exists());
    assert!(leftovers(temp.path()).is_empty());
    assert!(key.exists());
}

#[tokio::test]
async fn test_ppk_launch_waits_for_key_handoff_grace() {
    let bin = StubBin::new();
    bin.add_ssh("exit 0");
    bin.add_puttygen_ok();
    bin.add_terminal("xterm");
    let keys = TempDir::new().unwrap();
    let ppk = key_file(keys.path(), "deploy.ppk");
    let pem = key_file(keys.path(), "deploy.pem");
    let temp = TempDir::new().unwrap();
    let mut settings = test_settings(temp.path());
    settings.launch.key_handoff_grace_ms = 3_000;
    let grace = settings.launch.key_handoff_grace();
    let (orch, _spawner) = orchestrator(&bin, settings);

    let started = std::time::Instant::now();
    let outcome = orch
        .launch(&Connection::new("web", "10.0.0.5", "ops").with_key(&ppk))
        .await;
    assert!(outcome.is_success(), "{outcome:?}");
    assert!(started.elapsed() >= grace);

    // Native keys are never copied, so there is nothing to wait for
    let started = std::time::Instant::now();
    let outcome = orch
        .launch(&Connection::new("db", "10.0.0.6", "ops").with_key(&pem))
        .await;
    assert!(outcome.is_success(), "{outcome:?}");
    assert!(started.elapsed() < grace);
}

#[tokio::test]
async fn test_concurrent_ppk_launches_use_separate_files() {
    let bin = StubBin::new();
    bin.add_ssh("exit 0");
    bin.add_puttygen_ok();
    bin.add_terminal("xterm");
    let keys = TempDir::new().unwrap();
    let key = key_file(keys.path(), "shared.ppk");
    let temp = TempDir::new().unwrap();
    let (orch, spawner) = orchestrator(&bin, test_settings(temp.path()));

    let first = Connection::new("a", "10.0.0.5", "ops").with_key(&key);
    let second = Connection::new("b", "10.0.0.6", "ops").with_key(&key);
    let (a, b) = tokio::join!(orch.launch(&first), orch.launch(&second));
    assert!(a.is_success() && b.is_success());

    let commands = spawner.commands.lock().unwrap().clone();
    assert_eq!(commands.len(), 2);
    assert_ne!(identity(&commands[0].client_argv), identity(&commands[1].client_argv));
    assert!(leftovers(temp.path()).is_empty());
}

#[tokio::test]
async fn test_duplicate_attempt_rejected() {
    let bin = StubBin::new();
    bin.add_ssh("sleep 1\nexit 0");
    bin.add_terminal("xterm");
    let keys = TempDir::new().unwrap();
    let key = key_file(keys.path(), "id_rsa");
    let temp = TempDir::new().unwrap();
    let (orch, spawner) = orchestrator(&bin, test_settings(temp.path()));

    let conn = Connection::new("web", "10.0.0.5", "ops").with_key(&key);
    let (first, second) = tokio::join!(orch.launch(&conn), orch.launch(&conn));

    assert!(first.is_success());
    assert_eq!(second.failure().unwrap().kind, ErrorKind::AlreadyInProgress);
    assert_eq!(spawner.count(), 1);

    // Released after the first attempt finished
    assert!(orch.launch(&conn).await.is_success());
}

#[tokio::test]
async fn test_cancel_during_conversion() {
    let bin = StubBin::new();
    bin.add_ssh("exit 0");
    bin.add("puttygen", "exec sleep 30");
    bin.add_terminal("xterm");
    let keys = TempDir::new().unwrap();
    let key = key_file(keys.path(), "deploy.ppk");
    let temp = TempDir::new().unwrap();
    let (orch, spawner) = orchestrator(&bin, test_settings(temp.path()));

    let conn = Connection::new("web", "10.0.0.5", "ops").with_key(&key);
    let cancel = CancellationToken::new();
    let (outcome, ()) = tokio::join!(
        orch.launch_with(&conn, LaunchOptions::default(), cancel.clone()),
        async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            cancel.cancel();
        }
    );

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.kind, ErrorKind::Cancelled);
    assert_eq!(failure.stage, LaunchStage::Materializing);
    assert_eq!(spawner.count(), 0);
    assert!(leftovers(temp.path()).is_empty());
}

#[tokio::test]
async fn test_preferred_terminal_honoured() {
    let bin = StubBin::new();
    bin.add_ssh("exit 0");
    bin.add_terminal("konsole");
    bin.add_terminal("xterm");
    let temp = TempDir::new().unwrap();
    let mut settings = test_settings(temp.path());

    let (orch, _) = orchestrator(&bin, settings.clone());
    let conn = Connection::new("web", "10.0.0.5", "ops");
    assert_eq!(orch.launch(&conn).await.report().unwrap().terminal, "Konsole");

    settings.terminal.preferred = Some("xterm".to_string());
    let (orch, spawner) = orchestrator(&bin, settings);
    let outcome = orch.launch(&conn).await;
    assert_eq!(outcome.report().unwrap().terminal, "XTerm");
    assert_eq!(spawner.last().unwrap().args[0], "-e");
}

#[tokio::test]
async fn test_no_terminal_installed() {
    let bin = StubBin::new();
    bin.add_ssh("exit 0");
    let temp = TempDir::new().unwrap();
    let (orch, spawner) = orchestrator(&bin, test_settings(temp.path()));

    let conn = Connection::new("web", "10.0.0.5", "ops");
    let failure = orch.launch(&conn).await.failure().cloned().unwrap();

    assert_eq!(failure.kind, ErrorKind::NoTerminalFound);
    assert_eq!(failure.stage, LaunchStage::Detecting);
    assert!(failure.detail.contains("xterm"));
    assert_eq!(spawner.count(), 0);
}

#[tokio::test]
async fn test_check_probes_without_spawning() {
    let bin = StubBin::new();
    bin.add_ssh(DENIED);
    let keys = TempDir::new().unwrap();
    let key = key_file(keys.path(), "id_rsa");
    let temp = TempDir::new().unwrap();
    let mut settings = test_settings(temp.path());
    settings.launch.verify_credentials = false;
    let (orch, spawner) = orchestrator(&bin, settings);

    let conn = Connection::new("web", "10.0.0.5", "ops").with_key(&key);
    let outcome = orch.check(&conn, CancellationToken::new()).await;

    assert_eq!(outcome.failure().unwrap().kind, ErrorKind::AuthRejected);
    assert_eq!(bin.ssh_calls().len(), 1);
    assert_eq!(spawner.count(), 0);
}
