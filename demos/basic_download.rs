//! Basic download example
//!
//! This example demonstrates the core functionality of media-dl:
//! - Creating a downloader instance
//! - Submitting a request
//! - Monitoring download progress
//! - Cancelling on Ctrl+C
//!
//! Usage: `cargo run --example basic_download -- <url> [mp4|mkv|mp3] [quality]`

use media_dl::config::Config;
use media_dl::{DownloadRequest, JobOutcome, MediaDownloader, MediaFormat, ProgressEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .ok_or("usage: basic_download <url> [mp4|mkv|mp3] [quality]")?;
    let format: MediaFormat = args.next().as_deref().unwrap_or("mp4").parse()?;
    let quality = args.next().unwrap_or_else(|| "best".to_string());

    // Create downloader instance
    let downloader = MediaDownloader::new(Config::default())?;
    println!("Using yt-dlp: {}", downloader.tool_paths().ytdlp_program().display());

    let request = DownloadRequest::new(url, format, quality, downloader.default_output_dir());
    let handle = downloader
        .submit(request, |event: ProgressEvent| {
            println!("⬇ {:.1}%", event.percent);
        })
        .await?;

    let id = handle.id();
    let canceller = downloader.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel(id).await.ok();
        }
    });

    match handle.wait().await {
        JobOutcome::Success { output_folder } => {
            println!("✓ Saved to {}", output_folder.display());
        }
        JobOutcome::Cancelled => println!("Cancelled"),
        other => {
            eprintln!("✗ {}", other.message().unwrap_or("download failed"));
            if let JobOutcome::Failure { diagnostics, .. } = &other {
                for line in diagnostics {
                    eprintln!("  {line}");
                }
            }
        }
    }

    Ok(())
}
