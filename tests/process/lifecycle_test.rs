//! Start, terminate and liveness of the resident process.

use std::sync::Arc;
use std::time::Duration;

use exiftool_supervisor::{
    ConfigFile, Encoding, ExifToolError, ProtocolError, StartOutcome, TerminateOutcome,
};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use super::{FakeExifTool, Recorder};

fn pid_of(raw: u32) -> Pid {
    Pid::from_raw(i32::try_from(raw).unwrap())
}

#[tokio::test]
async fn test_start_run_terminate() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().common_args(["-G", "-n"]).build().unwrap();

    assert_eq!(tool.start().await.unwrap(), StartOutcome::Started);
    assert!(tool.running());
    let pid = tool.pid().expect("running process has a pid");
    assert_eq!(tool.version().unwrap(), "12.40");

    let result = tool.run(["-ver"]).await.unwrap();
    assert_eq!(result.status, 0);
    assert!(!result.stdout_text().trim().is_empty());

    assert_eq!(tool.terminate().await.unwrap(), TerminateOutcome::Terminated);
    assert!(!tool.running());
    assert!(tool.pid().is_none());
    assert!(kill(pid_of(pid), None).is_err(), "child should be reaped");
}

#[tokio::test]
async fn test_launch_argument_order() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().common_args(["-G", "-n"]).build().unwrap();
    tool.start().await.unwrap();

    assert_eq!(
        fake.launch_args(),
        ["-stay_open", "True", "-@", "-", "-common_args", "-G", "-n"]
    );
    tool.terminate().await.unwrap();
}

#[tokio::test]
async fn test_config_file_comes_first() {
    let fake = FakeExifTool::install();
    let config = fake.dir().join("exiftool.config");
    std::fs::write(&config, "1;\n").unwrap();

    let mut tool = fake.builder().config_file(&config).build().unwrap();
    tool.start().await.unwrap();
    let args = fake.launch_args();
    assert_eq!(args[0], "-config");
    assert_eq!(args[1], config.to_string_lossy());
    assert_eq!(args[2], "-stay_open");
    tool.terminate().await.unwrap();

    tool.set_config_file(Some(ConfigFile::SkipDefault)).unwrap();
    tool.start().await.unwrap();
    let args = fake.launch_args();
    assert_eq!(args[0], "-config");
    assert_eq!(args[1], "");
    tool.terminate().await.unwrap();
}

#[tokio::test]
async fn test_start_when_running() {
    let fake = FakeExifTool::install();
    let recorder = Arc::new(Recorder::default());
    let mut tool = fake.builder().shared_logger(recorder.clone()).build().unwrap();

    tool.start().await.unwrap();
    let pid = tool.pid();
    assert_eq!(tool.start().await.unwrap(), StartOutcome::AlreadyRunning);
    assert_eq!(tool.pid(), pid);
    assert_eq!(recorder.warnings_containing("already running"), 1);

    tool.terminate().await.unwrap();
}

#[tokio::test]
async fn test_terminate_when_not_running() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();

    assert_eq!(tool.terminate().await.unwrap(), TerminateOutcome::NotRunning);

    tool.start().await.unwrap();
    assert_eq!(tool.terminate().await.unwrap(), TerminateOutcome::Terminated);
    assert_eq!(tool.terminate().await.unwrap(), TerminateOutcome::NotRunning);
}

#[tokio::test]
async fn test_restart_after_terminate() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();

    tool.start().await.unwrap();
    tool.terminate().await.unwrap();
    tool.start().await.unwrap();

    let result = tool.run(["-ver"]).await.unwrap();
    assert_eq!(result.status, 0);
    tool.terminate().await.unwrap();
}

#[tokio::test]
async fn test_dead_process_warns_once() {
    let fake = FakeExifTool::install();
    let recorder = Arc::new(Recorder::default());
    let mut tool = fake.builder().shared_logger(recorder.clone()).build().unwrap();
    tool.start().await.unwrap();

    let pid = tool.pid().unwrap();
    kill(pid_of(pid), Signal::SIGKILL).unwrap();

    let mut alive = true;
    for _ in 0..100 {
        if !tool.running() {
            alive = false;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!alive, "killed process should be noticed");

    assert!(!tool.running());
    assert!(!tool.running());
    assert_eq!(recorder.warnings_containing("died"), 1);
    assert!(matches!(tool.version(), Err(ExifToolError::NotRunning(_))));
}

#[tokio::test]
async fn test_setters_rejected_while_running() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();
    tool.start().await.unwrap();

    assert!(matches!(
        tool.set_common_args(["-j"]),
        Err(ExifToolError::Running(_))
    ));
    assert!(matches!(
        tool.set_encoding(Encoding::Latin1),
        Err(ExifToolError::Running(_))
    ));
    assert!(matches!(
        tool.set_block_size(512),
        Err(ExifToolError::Running(_))
    ));
    assert!(matches!(
        tool.set_executable(fake.path()),
        Err(ExifToolError::Running(_))
    ));
    assert!(matches!(
        tool.set_config_file(None),
        Err(ExifToolError::Running(_))
    ));

    tool.terminate().await.unwrap();
    tool.set_block_size(512).unwrap();
    assert_eq!(tool.config().block_size(), 512);
}

#[tokio::test]
async fn test_legacy_exiftool_rejected() {
    let fake = FakeExifTool::install();
    fake.set_flag("legacy");
    let mut tool = fake.builder().build().unwrap();

    let err = tool.start().await.unwrap_err();
    match err {
        ExifToolError::ProtocolVersion { minimum, source } => {
            assert_eq!(minimum, "12.15");
            assert!(matches!(source, ProtocolError::InvalidStatus { .. }));
        }
        other => panic!("Expected ProtocolVersion, got {other:?}"),
    }
    assert!(!tool.running());
}

#[tokio::test]
async fn test_executable_that_exits_at_once() {
    let mut tool = exiftool_supervisor::ExifTool::builder()
        .executable("false")
        .build()
        .unwrap();

    let err = tool.start().await.unwrap_err();
    assert!(matches!(err, ExifToolError::ExitedImmediately), "got {err:?}");
    assert!(!tool.running());
}

#[tokio::test]
async fn test_protocol_failure_kills_process() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();
    tool.start().await.unwrap();

    let err = tool.run(["-die"]).await.unwrap_err();
    assert!(
        matches!(
            err,
            ExifToolError::Protocol(ProtocolError::StreamClosed { .. })
        ),
        "got {err:?}"
    );
    assert!(!tool.running());
    assert!(matches!(
        tool.run(["-ver"]).await,
        Err(ExifToolError::NotRunning(_))
    ));
}

#[tokio::test]
async fn test_abandoned_batch_kills_process() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();
    tool.start().await.unwrap();

    let abandoned = tokio::time::timeout(Duration::from_millis(200), tool.run(["-sleep"])).await;
    assert!(abandoned.is_err(), "the batch should still be pending");
    assert!(tool.running());

    let err = tool.run(["-ver"]).await.unwrap_err();
    assert!(
        matches!(err, ExifToolError::Protocol(ProtocolError::Interrupted)),
        "got {err:?}"
    );
    assert!(!tool.running());
    assert_eq!(fake.batches().len(), 2, "the follow-up batch is never sent");
}
