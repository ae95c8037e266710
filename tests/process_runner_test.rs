//! Process runner tests
//!
//! These tests spawn a stand-in `hidusb-relay-cmd` shell script, so they only
//! run on Unix.

#![cfg(unix)]

use hidrelay::platform::{resolve_executable, LocatedFrom, SearchRoots, RESOURCE_DIR_ENV};
use hidrelay::relay::{CommandRunner, Invocation, ProcessRunner, RelayCommand};
use hidrelay::{Channel, ChannelState, RelayClient, RelayError};
use serial_test::serial;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const FAKE_TOOL: &str = r#"#!/bin/sh
echo "$*" >> "$(dirname "$0")/calls.log"
case "$*" in
  ENUM) echo "Board ID=[TEST1] State: R1=OFF R2=ON" ;;
  STATUS|"id=TEST1 STATUS") echo "  Board ID=[TEST1] State: R1=OFF R2=ON  " ;;
  "ON 1"|"OFF ALL") ;;
  SLOW) sleep 5 ;;
  *) echo "unsupported: $*" >&2; exit 2 ;;
esac
"#;

fn install(dir: &Path, script: &str) -> PathBuf {
    let path = dir.join("hidusb-relay-cmd");
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn calls(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
#[serial]
async fn test_enumerate_and_status() {
    let dir = TempDir::new().unwrap();
    let client = RelayClient::new(install(dir.path(), FAKE_TOOL));

    let devices = client.enumerate().await.unwrap();
    assert!(devices.contains("TEST1"));

    let tokens = client.query_status().await.unwrap();
    assert_eq!(tokens, vec!["R1=OFF", "R2=ON"]);
    assert_eq!(client.detect_channel_count().await, 2);
    assert_eq!(calls(dir.path()), vec!["ENUM", "STATUS", "STATUS"]);
}

#[tokio::test]
#[serial]
async fn test_device_id_argument() {
    let dir = TempDir::new().unwrap();
    let client = RelayClient::new(install(dir.path(), FAKE_TOOL))
        .with_device_id(Some("TEST1".to_string()));

    let states = client.query_channel_states().await.unwrap();
    assert_eq!(states.as_slice(), &[false, true]);
    assert_eq!(calls(dir.path()), vec!["id=TEST1 STATUS"]);
}

#[tokio::test]
#[serial]
async fn test_set_reflects_exit_status() {
    let dir = TempDir::new().unwrap();
    let client = RelayClient::new(install(dir.path(), FAKE_TOOL));
    let one = Channel::new(1).unwrap();

    assert!(client.set_channel(one, ChannelState::On).await);
    assert!(client.set_all(ChannelState::Off).await);
    assert!(!client.set_channel(one, ChannelState::Off).await);

    let err = client
        .try_run(RelayCommand::Set {
            target: Channel::new(2).unwrap().into(),
            state: ChannelState::On,
        })
        .await
        .unwrap_err();
    match err {
        RelayError::NonZeroExit { code, stderr } => {
            assert_eq!(code, Some(2));
            assert_eq!(stderr, "unsupported: ON 2");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
#[serial]
async fn test_timeout_kills_slow_tool() {
    let dir = TempDir::new().unwrap();
    let path = install(dir.path(), FAKE_TOOL);
    let invocation = Invocation::new(&path, vec!["SLOW".to_string()], Duration::from_millis(300));

    let started = Instant::now();
    let result = ProcessRunner::new().run(&invocation).await;

    assert!(matches!(result, Err(RelayError::Timeout(_))));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
#[serial]
async fn test_slow_status_collapses_to_none() {
    let dir = TempDir::new().unwrap();
    let client = RelayClient::new(install(dir.path(), "#!/bin/sh\nsleep 5\n"))
        .with_timeout(Duration::from_millis(300));

    let started = Instant::now();
    assert_eq!(client.query_status().await, None);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
#[serial]
async fn test_missing_executable() {
    let dir = TempDir::new().unwrap();
    let client = RelayClient::new(dir.path().join("hidusb-relay-cmd"));

    assert_eq!(client.enumerate().await, None);
    assert!(matches!(
        client.try_run(RelayCommand::Enumerate).await,
        Err(RelayError::ExecutableNotFound(_))
    ));
}

#[test]
#[serial]
fn test_resource_dir_from_environment() {
    let dir = TempDir::new().unwrap();
    let expected = install(dir.path(), FAKE_TOOL);

    std::env::set_var(RESOURCE_DIR_ENV, dir.path());
    let located = resolve_executable(None, None);
    std::env::remove_var(RESOURCE_DIR_ENV);

    assert_eq!(located.path, expected);
    assert_eq!(located.source, LocatedFrom::Bundled);
}

#[test]
#[serial]
fn test_empty_resource_dir_is_ignored() {
    std::env::set_var(RESOURCE_DIR_ENV, "");
    let from_env = SearchRoots::from_environment(None);
    let located = resolve_executable(None, None);
    std::env::remove_var(RESOURCE_DIR_ENV);

    assert!(from_env.resource_dir.is_none());
    assert_ne!(located.source, LocatedFrom::Bundled);

    let from_config = SearchRoots::from_environment(Some(PathBuf::new()));
    assert!(from_config.resource_dir.is_none());
}

#[test]
#[serial]
fn test_empty_config_resource_dir_falls_back_to_environment() {
    let dir = TempDir::new().unwrap();
    std::env::set_var(RESOURCE_DIR_ENV, dir.path());
    let roots = SearchRoots::from_environment(Some(PathBuf::new()));
    std::env::remove_var(RESOURCE_DIR_ENV);

    assert_eq!(roots.resource_dir.as_deref(), Some(dir.path()));
}

#[test]
#[serial]
fn test_explicit_executable_skips_search() {
    let located = resolve_executable(Some(Path::new("/opt/relay/tool")), None);
    assert_eq!(located.path, PathBuf::from("/opt/relay/tool"));
    assert_eq!(located.source, LocatedFrom::Configured);
}
