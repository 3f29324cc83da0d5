//! External command execution utilities.
//!
//! Provides a Builder-based API for running external obfuscators and
//! minifiers with stdin piping, output capture and an optional time limit.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! // Configured argv with scratch files
//! Cmd::from_slice(&["javascript-obfuscator", "in.js", "--output", "out.js"]).run()?;
//!
//! // Piping the document through stdin
//! let output = Cmd::from_slice(&["html-minifier-terser", "--collapse-whitespace"])
//!     .stdin(html)
//!     .timeout(Some(Duration::from_secs(30)))
//!     .run()?;
//! ```

use crate::log;
use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use std::{
    ffi::{OsStr, OsString},
    io::{self, Read, Write},
    process::{Child, Command, ExitStatus, Output, Stdio},
    sync::OnceLock,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// Poll interval while waiting on a command with a time limit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Builder API
// ============================================================================

/// Command builder for external process execution.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    stdin_data: Option<Vec<u8>>,
    timeout: Option<Duration>,
    filter: Option<&'static FilterRule>,
}

impl Cmd {
    /// Create from a command array (e.g., `["javascript-obfuscator"]` or `["npx", "terser"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        let args: Vec<_> = iter.map(|s| s.as_ref().to_owned()).collect();
        Self {
            program,
            args,
            ..Default::default()
        }
    }

    /// Set stdin data to pipe to the process.
    pub fn stdin<D: AsRef<[u8]>>(mut self, data: D) -> Self {
        self.stdin_data = Some(data.as_ref().to_vec());
        self
    }

    /// Kill the process if it runs longer than `limit`.
    pub fn timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }

    /// Set output filter for logging.
    pub fn filter(mut self, filter: &'static FilterRule) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Get the program name for error messages.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Execute the command and return its output.
    ///
    /// Stdin is written and stdout/stderr are drained on separate threads, so
    /// large documents cannot deadlock on a full pipe. Fails on a non-zero
    /// exit status or when the time limit is exceeded.
    pub fn run(self) -> Result<Output> {
        let filter = self.filter.unwrap_or(&EMPTY_FILTER);
        let name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(if self.stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn `{name}`"))?;

        let writer = match (child.stdin.take(), self.stdin_data) {
            (Some(mut stdin), Some(data)) => Some(thread::spawn(move || stdin.write_all(&data))),
            _ => None,
        };
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let status = wait(&mut child, self.timeout, &name)?;

        let written = writer.map(|handle| {
            handle
                .join()
                .map_err(|_| anyhow!("Failed to join stdin writer thread"))
        });
        let output = Output {
            status,
            stdout: join_reader(stdout)?,
            stderr: join_reader(stderr)?,
        };

        log_output(&name, &output, filter)?;
        if let Some(written) = written {
            written?.with_context(|| format!("Failed to write stdin to `{name}`"))?;
        }
        Ok(output)
    }
}

// ============================================================================
// Process helpers
// ============================================================================

fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join_reader(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    let Some(handle) = handle else {
        return Ok(Vec::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| anyhow!("Failed to join output reader thread"))??;
    Ok(bytes)
}

/// Wait for the child, killing it once `limit` has elapsed.
fn wait(child: &mut Child, limit: Option<Duration>, name: &str) -> Result<ExitStatus> {
    let Some(limit) = limit else {
        return child
            .wait()
            .with_context(|| format!("Failed to wait for `{name}`"));
    };

    let started = Instant::now();
    loop {
        if let Some(status) = child
            .try_wait()
            .with_context(|| format!("Failed to wait for `{name}`"))?
        {
            return Ok(status);
        }
        if started.elapsed() >= limit {
            child.kill().ok();
            child.wait().ok();
            bail!("Command `{name}` timed out after {:.1}s", limit.as_secs_f64());
        }
        thread::sleep(POLL_INTERVAL);
    }
}

// ============================================================================
// Output Filtering
// ============================================================================

/// Filter rule for command output logging.
///
/// Used to reduce noise by skipping known warnings or irrelevant messages.
pub struct FilterRule {
    /// Prefixes to skip when logging output.
    pub skip_prefixes: &'static [&'static str],
}

impl FilterRule {
    /// Create a new filter rule.
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self { skip_prefixes }
    }

    /// Check if a line should be skipped.
    fn should_skip(&self, line: &str) -> bool {
        line.is_empty() || self.skip_prefixes.iter().any(|p| line.starts_with(p))
    }

    /// Log output lines that pass the filter.
    pub fn log(&self, name: &str, output: &str) {
        let lines: Vec<_> = output
            .lines()
            .filter(|line| {
                let plain = strip_ansi(line);
                let trimmed = plain.trim();
                !trimmed.is_empty() && !self.should_skip(trimmed)
            })
            .collect();

        if !lines.is_empty() {
            log!(name; "{}", lines.join("\n"));
        }
    }
}

/// Empty filter (no skipping).
pub const EMPTY_FILTER: FilterRule = FilterRule::new(&[]);

/// Node.js runtime chatter printed by npm-distributed obfuscators and minifiers.
pub const NODE_FILTER: FilterRule = FilterRule::new(&[
    "(node:",
    "(Use `node --trace",
    "npm WARN",
]);

// ============================================================================
// Helpers
// ============================================================================

/// Strip ANSI escape codes from string.
fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());
    re.replace_all(s, "")
}

/// Log command stderr, returning error on failure.
fn log_output(name: &str, output: &Output, filter: &'static FilterRule) -> Result<()> {
    if !output.status.success() {
        bail!(format_error(name, output, filter));
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    filter.log(name, stderr.trim());
    Ok(())
}

/// Format error message for failed command.
fn format_error(name: &str, output: &Output, filter: &'static FilterRule) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let error_msg = filter
        .skip_prefixes
        .iter()
        .fold(stderr.trim(), |s, p| s.trim_start_matches(p).trim_start());

    let mut msg = format!("Command `{name}` failed with {}\n", output.status);
    if !error_msg.is_empty() {
        msg.push_str(error_msg);
    }

    // Stdout of a failed minifier is usually the (partial) document itself.
    let stdout_trimmed = stdout.trim();
    if !stdout_trimmed.is_empty() && !stdout_trimmed.starts_with('<') {
        msg.push_str("\nStdout:\n");
        msg.push_str(stdout_trimmed);
    }
    msg
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice() {
        let cmd = Cmd::from_slice(&["npx", "terser", "--compress"])
            .timeout(Some(Duration::from_secs(1)));
        assert_eq!(cmd.program_name(), "npx");
        assert_eq!(cmd.program, OsString::from("npx"));
        assert_eq!(cmd.args.len(), 2);
        assert_eq!(cmd.timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_from_empty_slice() {
        let cmd = Cmd::from_slice::<&str>(&[]);
        assert_eq!(cmd.program_name(), "");
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn test_filter_rule() {
        let filter = FilterRule::new(&["WARN:", "INFO:"]);
        assert!(filter.should_skip("WARN: something"));
        assert!(filter.should_skip("INFO: something"));
        assert!(!filter.should_skip("ERROR: something"));
        assert!(filter.should_skip(""));
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
    }

    #[test]
    fn test_simple_command() {
        let output = Cmd::from_slice(&["echo", "hello"]).run().unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello"));
    }

    #[test]
    fn test_stdin_pipe() {
        let output = Cmd::from_slice(&["cat"]).stdin(b"test data").run().unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout, b"test data");
    }

    #[test]
    fn test_large_stdin_does_not_deadlock() {
        let data = "x".repeat(4 * 1024 * 1024);
        let output = Cmd::from_slice(&["cat"]).stdin(&data).run().unwrap();
        assert_eq!(output.stdout.len(), data.len());
    }

    #[test]
    fn test_failure_reports_stderr() {
        let err = Cmd::from_slice(&["sh", "-c", "echo '(node:1) noise' >&2; echo broken >&2; exit 3"])
            .filter(&NODE_FILTER)
            .run()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("`sh` failed"));
        assert!(msg.contains("broken"));
    }

    #[test]
    fn test_timeout_kills_process() {
        let started = Instant::now();
        let err = Cmd::from_slice(&["sh", "-c", "sleep 5"])
            .timeout(Some(Duration::from_millis(100)))
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_missing_program() {
        let err = Cmd::from_slice(&["scriptveil-definitely-not-installed"])
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("Failed to spawn"));
    }
}
