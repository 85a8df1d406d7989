//! Building the yt-dlp command line for a request

use crate::planner::FlagSet;
use crate::tools::ToolPaths;
use crate::types::DownloadRequest;
use std::path::PathBuf;

/// The complete external-process invocation for one job
///
/// Built once per job and never modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedInvocation {
    /// Program to spawn (absolute path, or a bare name for a PATH lookup)
    pub executable: PathBuf,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Output path template; `%(..)s` placeholders are left for yt-dlp
    pub output_template: String,
}

impl ResolvedInvocation {
    /// Assemble the invocation for a request
    ///
    /// Arguments are emitted as: url, selector, output template, cookies,
    /// ffmpeg location, the single-item constraint, then audio extraction or
    /// container merge flags.
    pub fn build(
        request: &DownloadRequest,
        flags: &FlagSet,
        tools: &ToolPaths,
        filename_template: &str,
    ) -> Self {
        let output_template = request
            .output_folder
            .join(filename_template)
            .to_string_lossy()
            .into_owned();

        let mut args = vec![
            request.source_url.clone(),
            "--format".to_string(),
            flags.selector.clone(),
            "--output".to_string(),
            output_template.clone(),
        ];

        if let Some(cookies) = &request.cookies_path {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().into_owned());
        }

        if let Some(ffmpeg) = &tools.ffmpeg {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.to_string_lossy().into_owned());
        }

        if flags.no_playlist {
            args.push("--no-playlist".to_string());
        }

        args.extend(flags.post_process_args());

        Self {
            executable: tools.ytdlp_program(),
            args,
            output_template,
        }
    }
}
