use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chatsvg::directory::Directory;
use chatsvg::discord::MessagePayload;
use chatsvg::error::{ApiError, FetchError};
use chatsvg::images::{ImageCache, ImageSource};
use chatsvg::theme::Theme;
use chatsvg::transcript::Transcriber;

/// Fails the first `failures` requests for URLs containing "flaky".
#[derive(Default)]
struct FakeCdn {
    calls: AtomicUsize,
    failures: usize,
}

impl ImageSource for FakeCdn {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("flaky") && n < self.failures {
            return Err(FetchError::new(url, "connection reset"));
        }
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }
}

fn payload(id: u64, secs: &str, content: &str, avatar: &str) -> Result<MessagePayload, ApiError> {
    let json = serde_json::json!({
        "id": id.to_string(),
        "content": content,
        "timestamp": format!("2021-01-01T00:00:{secs}+00:00"),
        "author": {
            "id": "1000",
            "username": "ada",
            "global_name": "Ada",
            "avatar": avatar,
        },
        "mentions": [],
        "reactions": [],
    });
    Ok(serde_json::from_value(json).unwrap())
}

fn run(
    history: Vec<Result<MessagePayload, ApiError>>,
    source: Arc<FakeCdn>,
    max_attempts: u32,
) -> (Result<chatsvg::transcript::Summary, ApiError>, tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let theme = Theme::default();
    let images = ImageCache::new(source, 16, Duration::from_secs(60));
    let transcriber = Transcriber {
        theme: &theme,
        line_width: 65,
        output_dir: dir.path(),
        max_attempts,
        images: &images,
    };
    let mut directory = Directory::default();
    directory.insert_channel(7, "general");
    let mut out = Vec::new();
    let summary = transcriber.run(history, &mut directory, &mut out);
    (summary, dir, String::from_utf8(out).unwrap())
}

#[test]
fn writes_one_file_per_message_and_lists_names() {
    let history = vec![
        payload(2, "02.500000", "second in <#7>", "abc"),
        payload(1, "01.000000", "**first**", "abc"),
    ];
    let source = Arc::new(FakeCdn::default());
    let (summary, dir, out) = run(history, Arc::clone(&source), 2);
    let summary = summary.unwrap();

    assert_eq!(summary.written, 2);
    assert!(summary.failed.is_empty());
    assert_eq!(out, "16094592025000000000.svg\n16094592010000000000.svg\n");

    let svg = std::fs::read_to_string(dir.path().join("16094592025000000000.svg")).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("#general"));
    // Same avatar URL for both messages: fetched once.
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn failing_message_does_not_stop_the_run() {
    let history = vec![
        payload(3, "03.000000", "see <#404>", "abc"),
        payload(2, "02.000000", "fine", "abc"),
    ];
    let (summary, dir, out) = run(history, Arc::new(FakeCdn::default()), 3);
    let summary = summary.unwrap();

    assert_eq!(summary.written, 1);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].id, 3);
    assert!(summary.failed[0].error.contains("unknown channel 404"));
    assert_eq!(out, "16094592020000000000.svg\n");

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["16094592020000000000.svg".to_string()]);
}

#[test]
fn transient_image_failures_are_retried() {
    let source = Arc::new(FakeCdn {
        failures: 1,
        ..FakeCdn::default()
    });
    let history = vec![payload(1, "01.000000", "hi", "flaky")];
    let (summary, _dir, _out) = run(history, Arc::clone(&source), 2);
    let summary = summary.unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn retries_are_bounded() {
    let source = Arc::new(FakeCdn {
        failures: usize::MAX,
        ..FakeCdn::default()
    });
    let history = vec![payload(1, "01.000000", "hi", "flaky")];
    let (summary, _dir, out) = run(history, Arc::clone(&source), 3);
    let summary = summary.unwrap();
    assert_eq!(summary.written, 0);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    assert!(out.is_empty());
}

#[test]
fn history_errors_end_the_run() {
    let history = vec![
        payload(2, "02.000000", "ok", "abc"),
        Err(ApiError::InvalidId("page".to_string())),
        payload(1, "01.000000", "never reached", "abc"),
    ];
    let (summary, dir, _out) = run(history, Arc::new(FakeCdn::default()), 1);
    assert!(matches!(summary, Err(ApiError::InvalidId(_))));
    assert!(dir.path().join("16094592020000000000.svg").exists());
    assert!(!dir.path().join("16094592010000000000.svg").exists());
}
