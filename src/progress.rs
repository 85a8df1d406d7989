//! Parser for yt-dlp progress output
//!
//! yt-dlp reports download progress as lines such as
//! `[download]  25.0% of 10.00MiB at 2.00MiB/s ETA 00:05`. Only the percentage is
//! extracted; every other line is ignored.

use crate::types::ProgressEvent;
use regex::Regex;
use std::sync::LazyLock;

// Tag, whitespace, decimal number, percent sign. Anchored so a percentage later in
// an unrelated line is never picked up.
#[allow(clippy::expect_used)]
static PROGRESS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[download\]\s+(\d+(?:\.\d+)?)%").expect("progress pattern is valid")
});

/// Parse one line of yt-dlp output
///
/// Returns `None` for anything that is not a progress marker. The parser keeps no
/// state between calls, so percentages are passed through exactly as reported,
/// even when a later line reports less than an earlier one.
///
/// # Examples
///
/// ```
/// use media_dl::progress::parse_line;
///
/// let event = parse_line("[download]  25.0% of 10.00MiB at 2.00MiB/s ETA 00:05").unwrap();
/// assert_eq!(event.percent, 25.0);
///
/// assert!(parse_line("[download] Destination: foo.mp4").is_none());
/// ```
pub fn parse_line(line: &str) -> Option<ProgressEvent> {
    let captures = PROGRESS_LINE.captures(line)?;
    let percent = captures.get(1)?.as_str().parse::<f64>().ok()?;

    if !percent.is_finite() {
        return None;
    }

    Some(ProgressEvent { percent })
}
