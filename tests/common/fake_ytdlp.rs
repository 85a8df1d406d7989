//! Shell scripts standing in for yt-dlp

use media_dl::{
    CliSupervisor, Config, MediaDownloader, ProgressEvent, RuntimeEnvironment, Tool, ToolPaths,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Name of the file the fake writes its arguments to, one per line
pub const ARGS_FILE: &str = "args.txt";

/// Install `body` as `local_bin/yt-dlp` under `root`
///
/// The script records its arguments next to itself before running `body`.
pub fn install_fake_ytdlp(root: &Path, body: &str) -> PathBuf {
    let path = Tool::YtDlp.bundled_path(&RuntimeEnvironment::Development {
        project_root: root.to_path_buf(),
    });
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();

    let script = format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > \"$(dirname \"$0\")/{ARGS_FILE}\"\n{body}\n"
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Arguments the fake received on its last run
pub fn recorded_args(root: &Path) -> Vec<String> {
    let path = root.join("local_bin").join(ARGS_FILE);
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Downloader that runs real processes and finds yt-dlp in `root/local_bin`
pub fn downloader_for(root: &TempDir) -> MediaDownloader {
    let mut config = Config::default();
    config.tools.search_path = false;
    config.tools.environment = RuntimeEnvironment::Development {
        project_root: root.path().to_path_buf(),
    };
    config.download.default_output_dir = root.path().join("downloads");

    let tools = ToolPaths::resolve(&config.tools);
    MediaDownloader::with_supervisor(config, tools, Arc::new(CliSupervisor))
}

/// Progress sink that records every percentage
pub fn recording_sink() -> (
    impl FnMut(ProgressEvent) + Send + 'static,
    Arc<Mutex<Vec<f64>>>,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    let sink = move |event: ProgressEvent| {
        sink_seen.lock().unwrap().push(event.percent);
    };
    (sink, seen)
}

/// Whether a process exists and is not a zombie
pub fn is_running(pid: i32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => !stat
            .rsplit(')')
            .next()
            .is_some_and(|rest| rest.trim_start().starts_with('Z')),
        Err(_) if cfg!(target_os = "linux") => false,
        // SAFETY: signal 0 performs only the existence check
        Err(_) => (unsafe { libc::kill(pid, 0) }) == 0,
    }
}

/// Read a pid the fake wrote next to itself, once the file is complete
pub fn recorded_pid(root: &Path, name: &str) -> Option<i32> {
    std::fs::read_to_string(root.join("local_bin").join(name))
        .ok()?
        .trim()
        .parse()
        .ok()
}
