//! Engine CLI runner.
//!
//! Each simulation writes the cell config to `<work>/temp_config.txt` and
//! runs `gcsim -c <cfg> -substatOptimFull -out <work>/last_result.json` from
//! the engine root. The child is polled so a cancellation request can kill
//! it between polls.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::payload::EnginePayload;
use super::{CancelToken, SimOutcome, SimulationRunner};
use crate::error::{ConfigError, RunnerError};

const CONFIG_FILE: &str = "temp_config.txt";
const RESULT_FILE: &str = "last_result.json";
const STDOUT_FILE: &str = "engine_stdout.log";
const STDERR_FILE: &str = "engine_stderr.log";

/// Engine output kept in a failure message.
pub const MAX_FAILURE_OUTPUT: usize = 16 * 1024;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// `STATUS_CONTROL_C_EXIT`
#[cfg(windows)]
const WINDOWS_CTRL_C_EXIT: u32 = 0xC000_013A;

/// Finds the engine executable under `engine_root`.
///
/// Looks for `gcsim` at the root first, then under `cmd/gcsim/`.
pub fn resolve_engine_exe(engine_root: &Path) -> Result<PathBuf, ConfigError> {
    let name = format!("gcsim{}", std::env::consts::EXE_SUFFIX);
    let primary = engine_root.join(&name);
    if primary.is_file() {
        return Ok(primary);
    }
    let alt = engine_root.join("cmd").join("gcsim").join(&name);
    if alt.is_file() {
        return Ok(alt);
    }
    Err(ConfigError::InvalidEngineRoot {
        reason: format!(
            "cannot find engine CLI {name} in {}; expected {}",
            engine_root.display(),
            primary.display()
        ),
    })
}

/// [`SimulationRunner`] backed by the engine's command-line binary.
#[derive(Debug, Clone)]
pub struct CliRunner {
    engine_root: PathBuf,
    exe: PathBuf,
    work_dir: PathBuf,
    char_index: usize,
    poll_interval: Duration,
}

impl CliRunner {
    /// Creates a runner reporting the character at team slot `char_index`.
    pub fn new(
        engine_root: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
        char_index: usize,
    ) -> Result<Self, ConfigError> {
        let engine_root = engine_root.into();
        let exe = resolve_engine_exe(&engine_root)?;
        Ok(Self {
            engine_root,
            exe,
            work_dir: work_dir.into(),
            char_index,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn exe(&self) -> &Path {
        &self.exe
    }

    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn io_err(path: &Path, err: &io::Error) -> RunnerError {
        RunnerError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    fn prepare(&self, config_text: &str) -> Result<(PathBuf, PathBuf), RunnerError> {
        fs::create_dir_all(&self.work_dir).map_err(|e| Self::io_err(&self.work_dir, &e))?;
        let config_path = self.work_dir.join(CONFIG_FILE);
        fs::write(&config_path, config_text).map_err(|e| Self::io_err(&config_path, &e))?;
        let result_path = self.work_dir.join(RESULT_FILE);
        match fs::remove_file(&result_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Self::io_err(&result_path, &e)),
        }
        Ok((config_path, result_path))
    }

    fn command(&self, config_path: &Path, result_path: &Path, options: &str) -> Result<Command, RunnerError> {
        let stdout_path = self.work_dir.join(STDOUT_FILE);
        let stderr_path = self.work_dir.join(STDERR_FILE);
        let stdout = File::create(&stdout_path).map_err(|e| Self::io_err(&stdout_path, &e))?;
        let stderr = File::create(&stderr_path).map_err(|e| Self::io_err(&stderr_path, &e))?;

        let mut cmd = Command::new(&self.exe);
        cmd.current_dir(&self.engine_root)
            .arg("-c")
            .arg(config_path)
            .arg("-substatOptimFull")
            .arg("-out")
            .arg(result_path)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        if !options.is_empty() {
            cmd.arg("-options").arg(options);
        }
        Ok(cmd)
    }

    fn wait(&self, mut cmd: Command, cancel: &CancelToken) -> Result<ExitStatus, RunnerError> {
        let mut child = cmd.spawn().map_err(|e| Self::io_err(&self.exe, &e))?;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(e) => return Err(Self::io_err(&self.exe, &e)),
            }
            if cancel.is_canceled() {
                if let Err(e) = child.kill() {
                    warn!(error = %e, "failed to kill engine process");
                }
                let _ = child.wait();
                return Err(RunnerError::Canceled);
            }
            thread::sleep(self.poll_interval);
        }
    }

    fn captured_output(&self) -> String {
        let mut out = Vec::new();
        for name in [STDOUT_FILE, STDERR_FILE] {
            if let Ok(mut file) = File::open(self.work_dir.join(name)) {
                let _ = file.read_to_end(&mut out);
            }
        }
        truncate_output(&String::from_utf8_lossy(&out))
    }
}

/// True if the engine died from an operator interrupt.
fn interrupted(status: &ExitStatus) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.signal() == Some(libc::SIGINT)
    }
    #[cfg(windows)]
    {
        status.code().map(|c| c as u32) == Some(WINDOWS_CTRL_C_EXIT)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = status;
        false
    }
}

/// Trims engine output and caps it at [`MAX_FAILURE_OUTPUT`] bytes.
#[must_use]
pub fn truncate_output(output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.len() <= MAX_FAILURE_OUTPUT {
        return trimmed.to_string();
    }
    let mut end = MAX_FAILURE_OUTPUT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n...<truncated>", &trimmed[..end])
}

impl SimulationRunner for CliRunner {
    fn run(&mut self, cancel: &CancelToken, config_text: &str, options: &str) -> Result<SimOutcome, RunnerError> {
        if cancel.is_canceled() {
            return Err(RunnerError::Canceled);
        }
        let (config_path, result_path) = self.prepare(config_text)?;
        let cmd = self.command(&config_path, &result_path, options)?;

        let start = Instant::now();
        let status = self.wait(cmd, cancel)?;
        let elapsed = start.elapsed();

        if interrupted(&status) || (!status.success() && cancel.is_canceled()) {
            return Err(RunnerError::Canceled);
        }
        if !status.success() {
            let mut message = format!("engine CLI exited with {status} after {elapsed:?}");
            let output = self.captured_output();
            if !output.is_empty() {
                message.push('\n');
                message.push_str(&output);
            }
            return Err(RunnerError::ProcessFailed { message });
        }
        debug!(elapsed_ms = elapsed.as_millis() as u64, "engine run finished");

        let bytes = fs::read(&result_path).map_err(|e| Self::io_err(&result_path, &e))?;
        EnginePayload::parse(&bytes)?.into_outcome(self.char_index, config_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_engine_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CliRunner::new(dir.path(), dir.path().join("work"), 0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEngineRoot { .. }));
        assert!(err.to_string().contains("gcsim"));
    }

    #[test]
    fn test_resolves_nested_engine() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("cmd").join("gcsim");
        fs::create_dir_all(&nested).unwrap();
        let exe = nested.join(format!("gcsim{}", std::env::consts::EXE_SUFFIX));
        fs::write(&exe, b"").unwrap();
        assert_eq!(resolve_engine_exe(dir.path()).unwrap(), exe);
    }

    #[test]
    fn test_truncate_output() {
        assert_eq!(truncate_output("  short \n"), "short");
        let long = "é".repeat(MAX_FAILURE_OUTPUT);
        let cut = truncate_output(&long);
        assert!(cut.ends_with("...<truncated>"));
        assert!(cut.len() <= MAX_FAILURE_OUTPUT + "\n...<truncated>".len());
    }

    #[test]
    fn test_canceled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(format!("gcsim{}", std::env::consts::EXE_SUFFIX)), b"").unwrap();
        let mut runner = CliRunner::new(dir.path(), dir.path().join("work"), 0).unwrap();
        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(runner.run(&token, "cfg", ""), Err(RunnerError::Canceled)));
        assert!(!dir.path().join("work").exists());
    }
}
