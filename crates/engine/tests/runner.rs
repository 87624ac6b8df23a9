//! Integration tests for the engine process runner, using `/bin/sh` as a
//! stand-in engine.

use std::path::Path;
use std::time::Duration;

use assert_matches::assert_matches;
use shapecloud_core::progress::parse_progress_token;
use shapecloud_engine::{EngineError, EngineInvocation, EngineProcess};

/// Build an invocation that runs a shell script in a temp dir.
fn sh(dir: &Path, script: &str) -> EngineInvocation {
    EngineInvocation {
        working_dir: dir.to_path_buf(),
        binary: "/bin/sh".into(),
        args: vec!["-c".to_string(), script.to_string()],
    }
}

// ---------------------------------------------------------------------------
// Test: stdout lines stream in order and carry progress tokens
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stdout_lines_stream_with_progress_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let inv = sh(
        dir.path(),
        "printf 'starting\\n<progress>25</progress>\\n<progress>75</progress>\\n'",
    );

    let mut process = EngineProcess::spawn(&inv).unwrap();
    let mut tokens = Vec::new();
    while let Some(line) = process.next_line().await.unwrap() {
        if let Some(p) = parse_progress_token(&line) {
            tokens.push(p);
        }
    }
    process.finish().await.unwrap();

    assert_eq!(tokens, vec![25.0, 75.0]);
}

// ---------------------------------------------------------------------------
// Test: any stderr output is fatal and carries the engine's text
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stderr_output_is_fatal_with_text_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let inv = sh(
        dir.path(),
        "echo '<progress>10</progress>'; echo 'mesh has self-intersections' >&2",
    );

    let mut process = EngineProcess::spawn(&inv).unwrap();
    while process.next_line().await.unwrap().is_some() {}
    let err = process.finish().await.unwrap_err();

    assert_matches!(err, EngineError::Stderr(text) => {
        assert_eq!(text, "mesh has self-intersections");
    });
}

// ---------------------------------------------------------------------------
// Test: non-zero exit without stderr is still an error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_zero_exit_reported() {
    let dir = tempfile::tempdir().unwrap();
    let inv = sh(dir.path(), "exit 3");

    let mut process = EngineProcess::spawn(&inv).unwrap();
    while process.next_line().await.unwrap().is_some() {}
    let err = process.finish().await.unwrap_err();

    assert_matches!(err, EngineError::Exit { code: 3 });
}

// ---------------------------------------------------------------------------
// Test: stderr text wins over the exit status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stderr_wins_over_exit_status() {
    let dir = tempfile::tempdir().unwrap();
    let inv = sh(dir.path(), "echo 'out of memory' >&2; exit 9");

    let mut process = EngineProcess::spawn(&inv).unwrap();
    while process.next_line().await.unwrap().is_some() {}

    assert_matches!(
        process.finish().await.unwrap_err(),
        EngineError::Stderr(text) => assert_eq!(text, "out of memory")
    );
}

// ---------------------------------------------------------------------------
// Test: kill takes a long-running child down promptly
// ---------------------------------------------------------------------------

#[tokio::test]
async fn kill_terminates_child_promptly() {
    let dir = tempfile::tempdir().unwrap();
    let inv = sh(dir.path(), "echo ready; sleep 30");

    let mut process = EngineProcess::spawn(&inv).unwrap();
    // Wait for the first line so the child is definitely alive.
    assert_eq!(process.next_line().await.unwrap().unwrap(), "ready");

    tokio::time::timeout(Duration::from_secs(5), process.kill())
        .await
        .expect("kill must not wait for the sleep to finish");
}

// ---------------------------------------------------------------------------
// Test: a missing binary fails to spawn
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_binary_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let inv = EngineInvocation {
        working_dir: dir.path().to_path_buf(),
        binary: "/nonexistent/engine-binary".into(),
        args: vec!["groom".to_string()],
    };

    assert_matches!(EngineProcess::spawn(&inv), Err(EngineError::Io(_)));
}
