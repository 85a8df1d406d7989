use super::test_helpers::*;
use super::*;
use crate::supervisor::ProcessExit;
use crate::types::{MediaFormat, ProgressEvent};
use tokio::sync::Notify;


const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

fn request(format: MediaFormat, quality: &str, temp_dir: &tempfile::TempDir) -> DownloadRequest {
    DownloadRequest::new(URL, format, quality, temp_dir.path().join("out"))
}

/// Script that writes one progress line, then blocks on the returned gate
fn gated_script(first_percent: &str) -> (Vec<Step>, Arc<Notify>) {
    let gate = Arc::new(Notify::new());
    let steps = vec![
        out(&format!("[download]  {first_percent}% of 10.00MiB at 1.00MiB/s ETA 00:09")),
        Step::Gate(Arc::clone(&gate)),
    ];
    (steps, gate)
}
