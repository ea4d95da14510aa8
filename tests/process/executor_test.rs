//! Batch execution, status policy and the JSON/helper layers.

use futures_util::FutureExt;

use exiftool_supervisor::{Encoding, ExecuteError, ExifToolError, KeywordMode, TagValue};

use super::FakeExifTool;

#[tokio::test]
async fn test_run_when_not_running() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();

    let err = tool.run(["-ver"]).await.unwrap_err();
    assert!(matches!(err, ExifToolError::NotRunning(_)));
    assert!(fake.batches().is_empty());
}

#[tokio::test]
async fn test_run_returns_nonzero_status_unchecked() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();
    tool.start().await.unwrap();

    let result = tool.run(["-fail"]).await.unwrap();
    assert_eq!(result.status, 1);
    assert!(!result.success());
    assert!(result.stderr_text().contains("File not found"));

    tool.terminate().await.unwrap();
}

#[tokio::test]
async fn test_execute_checks_status() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();
    tool.start().await.unwrap();

    let err = tool.execute(["-fail", "missing.jpg"]).await.unwrap_err();
    match err {
        ExifToolError::Execute(ExecuteError::NonZeroStatus(ctx)) => {
            assert_eq!(ctx.status, 1);
            assert!(ctx.stderr.contains("File not found"));
            assert_eq!(ctx.params, ["-fail", "missing.jpg"]);
        }
        other => panic!("Expected NonZeroStatus, got {other:?}"),
    }
    assert!(tool.running(), "a failed status is not a protocol failure");

    tool.set_check_execute(false);
    let stdout = tool.execute(["-fail"]).await.unwrap();
    assert!(stdout.is_empty());
    assert_eq!(tool.last_status(), Some(1));

    tool.terminate().await.unwrap();
}

#[tokio::test]
async fn test_execute_auto_start() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().auto_start(true).build().unwrap();
    assert!(!tool.running());

    let stdout = tool.execute(["-ver"]).await.unwrap();
    assert_eq!(stdout.trim(), "12.40");
    assert!(tool.running());

    tool.terminate().await.unwrap();
}

#[tokio::test]
async fn test_execute_without_auto_start() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();

    let err = tool.execute(["-ver"]).await.unwrap_err();
    assert!(matches!(err, ExifToolError::NotRunning(_)));
}

#[tokio::test]
async fn test_last_result_kept_after_terminate() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();
    assert!(tool.last_result().is_none());

    tool.start().await.unwrap();
    tool.run(["-ver"]).await.unwrap();
    tool.terminate().await.unwrap();

    assert_eq!(tool.last_status(), Some(0));
    assert_eq!(tool.last_stdout().unwrap().trim(), "12.40");
    assert_eq!(tool.last_stderr().unwrap(), "");
}

#[tokio::test]
async fn test_batches_are_sent_verbatim() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();
    tool.start().await.unwrap();

    tool.run(["-ver"]).await.unwrap();
    tool.run(["-j", "a file.jpg"]).await.unwrap();
    tool.terminate().await.unwrap();

    let batches = fake.batches();
    assert_eq!(batches.len(), 3, "version check plus two batches");
    assert_eq!(batches[1], ["-ver"]);
    assert_eq!(batches[2], ["-j", "a file.jpg"]);
}

#[tokio::test]
async fn test_execute_json() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();
    tool.start().await.unwrap();

    let records = tool.execute_json(["a.jpg", "b.jpg"]).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["SourceFile"], "a.jpg");
    assert_eq!(records[1]["SourceFile"], "b.jpg");

    tool.terminate().await.unwrap();
}

#[tokio::test]
async fn test_execute_json_empty_output() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();
    tool.start().await.unwrap();

    let err = tool
        .execute_json(std::iter::empty::<&str>())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExifToolError::Execute(ExecuteError::OutputEmpty(_))
    ));

    tool.terminate().await.unwrap();
}

#[tokio::test]
async fn test_execute_json_invalid_output() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();
    tool.start().await.unwrap();

    let err = tool.execute_json(["-badjson"]).await.unwrap_err();
    match err {
        ExifToolError::Execute(ExecuteError::JsonInvalid { context, .. }) => {
            assert!(context.stdout.contains("not json"));
        }
        other => panic!("Expected JsonInvalid, got {other:?}"),
    }

    tool.terminate().await.unwrap();
}

#[tokio::test]
async fn test_latin1_round_trip() {
    let fake = FakeExifTool::install();
    let mut tool = fake
        .builder()
        .encoding(Encoding::Latin1)
        .build()
        .unwrap();
    tool.start().await.unwrap();

    let records = tool.execute_json(["caf\u{e9}.jpg"]).await.unwrap();
    assert_eq!(records[0]["SourceFile"], "caf\u{e9}.jpg");

    tool.terminate().await.unwrap();
}

#[tokio::test]
async fn test_latin1_rejects_unencodable_param() {
    let fake = FakeExifTool::install();
    let mut tool = fake
        .builder()
        .encoding(Encoding::Latin1)
        .build()
        .unwrap();
    tool.start().await.unwrap();

    let err = tool.execute_json(["\u{263a}.jpg"]).await.unwrap_err();
    match err {
        ExifToolError::Unencodable { param, encoding } => {
            assert_eq!(param, "\u{263a}.jpg");
            assert_eq!(encoding, Encoding::Latin1);
        }
        other => panic!("Expected Unencodable, got {other:?}"),
    }
    assert_eq!(fake.batches().len(), 1, "only the version check was sent");
    assert!(tool.running(), "nothing was written, the pipes are still in sync");

    let result = tool.run(["-ver"]).await.unwrap();
    assert_eq!(result.stdout_text().trim(), "12.40");

    tool.terminate().await.unwrap();
}

#[tokio::test]
async fn test_sequential_batches_with_marker_text_in_params() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();
    tool.start().await.unwrap();

    for i in 0..30 {
        let name = format!("{{ready}}f{i}.jpg");
        let records = tool.execute_json([name.as_str()]).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["SourceFile"], name.as_str());
    }
    assert_eq!(fake.batches().len(), 31);

    tool.terminate().await.unwrap();
}

#[tokio::test]
async fn test_raw_bytes_output() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();
    tool.start().await.unwrap();

    let stdout = tool.execute_bytes(["-ver"]).await.unwrap();
    assert_eq!(stdout, b"12.40\n");

    tool.terminate().await.unwrap();
}

#[tokio::test]
async fn test_get_tags_batch_order() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();
    tool.start().await.unwrap();

    let records = tool
        .get_tags(["a.jpg"], &["EXIF:Make", "Model"], &["-n"])
        .await
        .unwrap();
    assert_eq!(records.len(), 1);

    let err = tool.get_tags(["a.jpg"], &["Bad Tag"], &[]).await.unwrap_err();
    assert!(matches!(err, ExifToolError::TagName(tag) if tag == "Bad Tag"));

    tool.terminate().await.unwrap();
    let batches = fake.batches();
    assert_eq!(
        batches.last().unwrap(),
        &["-j", "-n", "-EXIF:Make", "-Model", "a.jpg"]
    );
}

#[tokio::test]
async fn test_set_tags_and_keywords() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();
    tool.start().await.unwrap();

    let summary = tool
        .set_tags(
            ["a.jpg"],
            &[
                ("XMP:Subject", TagValue::from(vec!["one", "two"])),
                ("Artist", TagValue::from("Me")),
            ],
            &["-overwrite_original"],
        )
        .await
        .unwrap();
    assert!(summary.contains("1 image files updated"));

    let summary = tool
        .set_keywords(["a.jpg"], KeywordMode::Add, &["sky"])
        .await
        .unwrap();
    assert!(summary.contains("1 image files updated"));
    tool.terminate().await.unwrap();

    let batches = fake.batches();
    let n = batches.len();
    assert_eq!(
        batches[n - 2],
        [
            "-overwrite_original",
            "-XMP:Subject=one",
            "-XMP:Subject=two",
            "-Artist=Me",
            "a.jpg"
        ]
    );
    assert_eq!(batches[n - 1], ["-IPTC:Keywords+=sky", "a.jpg"]);
}

#[tokio::test]
async fn test_scoped_terminates_on_success_and_error() {
    let fake = FakeExifTool::install();
    let mut tool = fake.builder().build().unwrap();

    let version = tool
        .scoped(|et| async move { et.execute(["-ver"]).await }.boxed())
        .await
        .unwrap();
    assert_eq!(version.trim(), "12.40");
    assert!(!tool.running());

    let err = tool
        .scoped(|et| async move { et.execute(["-fail"]).await }.boxed())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExifToolError::Execute(ExecuteError::NonZeroStatus(_))
    ));
    assert!(!tool.running());
}
