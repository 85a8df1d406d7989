//! Format planning: request format and quality to yt-dlp selector flags
//!
//! Planning is pure. It never touches the filesystem or spawns anything, so the
//! whole mapping can be checked without yt-dlp installed.

use crate::error::Error;
use crate::types::MediaFormat;

/// Selector used when the best available streams are wanted
pub const BEST_SELECTOR: &str = "bestvideo+bestaudio/best";

/// Selector used for audio-only downloads
pub const AUDIO_SELECTOR: &str = "bestaudio/best";

/// Requested quality, parsed from a user-facing token
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quality {
    /// Best available streams, no height cap
    Best,
    /// Streams no taller than the given number of lines
    MaxHeight(u32),
}

impl std::str::FromStr for Quality {
    type Err = Error;

    /// Accepts `best`, `4k`, `8k` and `<N>p`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        match token.as_str() {
            "best" => return Ok(Self::Best),
            "4k" => return Ok(Self::MaxHeight(2160)),
            "8k" => return Ok(Self::MaxHeight(4320)),
            _ => {}
        }

        token
            .strip_suffix('p')
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u32>().ok())
            .filter(|height| *height > 0)
            .map(Self::MaxHeight)
            .ok_or_else(|| Error::InvalidQuality(s.to_string()))
    }
}

/// Flags derived from a format and quality
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagSet {
    /// yt-dlp format selector expression
    pub selector: String,
    /// Height cap applied inside the selector, if any
    pub max_height: Option<u32>,
    /// Audio codec to extract to, for audio-only downloads
    pub extract_audio: Option<&'static str>,
    /// Container audio and video are merged into
    pub merge_format: Option<&'static str>,
    /// Whether playlist URLs are restricted to the single referenced item
    pub no_playlist: bool,
}

impl FlagSet {
    /// Post-processing flags (audio extraction or container merge)
    pub fn post_process_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(codec) = self.extract_audio {
            args.push("--extract-audio".to_string());
            args.push("--audio-format".to_string());
            args.push(codec.to_string());
        }
        if let Some(container) = self.merge_format {
            args.push("--merge-output-format".to_string());
            args.push(container.to_string());
        }
        args
    }
}

/// Translate a format and quality token into yt-dlp flags
///
/// The quality token is validated for every format, so an unknown token is
/// rejected even for audio-only downloads, where a valid quality is ignored.
///
/// # Errors
///
/// Returns [`Error::InvalidQuality`] for an unrecognized quality token.
///
/// # Examples
///
/// ```
/// use media_dl::planner::plan;
/// use media_dl::MediaFormat;
///
/// let flags = plan(MediaFormat::Mp4, "720p").unwrap();
/// assert_eq!(flags.selector, "bestvideo[height<=720]+bestaudio/best[height<=720]");
/// assert_eq!(flags.merge_format, Some("mp4"));
/// ```
pub fn plan(format: MediaFormat, quality: &str) -> crate::Result<FlagSet> {
    let quality: Quality = quality.parse()?;

    if format.is_audio_only() {
        return Ok(FlagSet {
            selector: AUDIO_SELECTOR.to_string(),
            max_height: None,
            extract_audio: Some("mp3"),
            merge_format: None,
            no_playlist: true,
        });
    }

    let (selector, max_height) = match quality {
        Quality::Best => (BEST_SELECTOR.to_string(), None),
        Quality::MaxHeight(h) => (
            format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]"),
            Some(h),
        ),
    };

    Ok(FlagSet {
        selector,
        max_height,
        extract_audio: None,
        merge_format: format.merge_container(),
        no_playlist: true,
    })
}
