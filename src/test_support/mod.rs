//! Test utilities and mocks for extforge unit tests.
//!
//! Provides scripted implementations of the process and HTTP capabilities
//! so cache and pipeline code can be tested without npm, tsc, tfx or a
//! network.
//!
//! # Example
//!
//! ```rust,ignore
//! use extforge::test_support::{CommandPattern, MockExecutor, MockProcessOutput};
//!
//! #[test]
//! fn test_example() {
//!     let exec = MockExecutor::new().with_program("npm");
//!     exec.expect(
//!         CommandPattern::Contains("--version".into()),
//!         MockProcessOutput::success("10.2.0"),
//!     );
//!
//!     // Hand `Arc::new(exec)` to the code under test...
//! }
//! ```

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::util::http::{HttpClient, HttpError, HttpResponse};
use crate::util::process::{CommandRunner, ProcessBuilder, ProcessOutput};

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create a failure output with the given stderr and status code.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    fn to_output(&self) -> ProcessOutput {
        ProcessOutput {
            status: Some(self.status),
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
        }
    }
}

impl Default for MockProcessOutput {
    fn default() -> Self {
        MockProcessOutput::success("")
    }
}

/// Pattern for matching commands in MockExecutor.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on full command string.
    Exact(String),
    /// Match if command starts with prefix.
    StartsWith(String),
    /// Match if command contains substring.
    Contains(String),
    /// Match using a regex pattern.
    Regex(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    /// Check if this pattern matches the given command.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
            CommandPattern::Any => true,
        }
    }
}

/// Expectation for a command execution.
#[derive(Debug, Clone)]
pub struct CommandExpectation {
    /// Pattern to match against commands.
    pub pattern: CommandPattern,
    /// Output to return when matched.
    pub output: MockProcessOutput,
    /// Number of times this expectation can be used (None = unlimited).
    pub times: Option<usize>,
    /// Number of times this expectation has been used.
    pub used: usize,
}

impl CommandExpectation {
    /// Create a new expectation.
    pub fn new(pattern: CommandPattern, output: MockProcessOutput) -> Self {
        CommandExpectation {
            pattern,
            output,
            times: None,
            used: 0,
        }
    }

    /// Set the number of times this expectation can be used.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Check if this expectation can still be used.
    pub fn available(&self) -> bool {
        match self.times {
            Some(n) => self.used < n,
            None => true,
        }
    }
}

/// A command the executor was asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl RecordedCall {
    /// The command line as matched against expectations.
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

#[derive(Debug, Default)]
struct ExecutorState {
    expectations: Vec<CommandExpectation>,
    calls: Vec<RecordedCall>,
    default_output: Option<MockProcessOutput>,
}

/// Mock process executor for testing command execution.
///
/// Only programs registered with `with_program` are found. Commands are
/// matched against expectations in the order they were added.
#[derive(Debug, Default)]
pub struct MockExecutor {
    programs: HashMap<String, PathBuf>,
    state: Mutex<ExecutorState>,
}

impl MockExecutor {
    /// Create a new mock executor.
    pub fn new() -> Self {
        MockExecutor::default()
    }

    /// Make `name` discoverable.
    pub fn with_program(mut self, name: &str) -> Self {
        self.programs.insert(name.to_string(), PathBuf::from(name));
        self
    }

    /// Add an expectation with unlimited uses.
    pub fn expect(&self, pattern: CommandPattern, output: MockProcessOutput) -> &Self {
        self.expect_pattern(CommandExpectation::new(pattern, output))
    }

    /// Add a custom expectation.
    pub fn expect_pattern(&self, expectation: CommandExpectation) -> &Self {
        self.lock().expectations.push(expectation);
        self
    }

    /// Set a default output for commands that don't match any expectation.
    pub fn set_default(&self, output: MockProcessOutput) -> &Self {
        self.lock().default_output = Some(output);
        self
    }

    /// Get all commands that were called.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Verify that all expectations with a specific count were satisfied.
    pub fn verify(&self) -> Result<()> {
        for (i, exp) in self.lock().expectations.iter().enumerate() {
            if let Some(expected) = exp.times {
                if exp.used != expected {
                    bail!(
                        "expectation {} was used {} times, expected {}",
                        i,
                        exp.used,
                        expected
                    );
                }
            }
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ExecutorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CommandRunner for MockExecutor {
    fn find(&self, program: &str) -> Option<PathBuf> {
        self.programs.get(program).cloned()
    }

    fn run(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput> {
        let call = RecordedCall {
            program: cmd.get_program().to_path_buf(),
            args: cmd.get_args().to_vec(),
            cwd: cmd.get_cwd().map(Path::to_path_buf),
        };
        let full_cmd = call.command_line();

        let mut state = self.lock();
        state.calls.push(call);

        for exp in &mut state.expectations {
            if exp.pattern.matches(&full_cmd) && exp.available() {
                exp.used += 1;
                return Ok(exp.output.to_output());
            }
        }

        if let Some(ref default) = state.default_output {
            return Ok(default.to_output());
        }

        bail!("unexpected command: {}", full_cmd)
    }
}

/// Mock HTTP client serving canned responses.
///
/// Unknown URLs fail with a transport error.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    responses: Mutex<HashMap<String, HttpResponse>>,
    requests: Mutex<Vec<String>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        MockHttpClient::default()
    }

    /// Serve `body` with status 200.
    pub fn serve(&self, url: &str, body: Vec<u8>) {
        self.respond(url, 200, body);
    }

    /// Serve an arbitrary status and body.
    pub fn respond(&self, url: &str, status: u16, body: Vec<u8>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), HttpResponse { status, body });
    }

    /// Get all requested URLs.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl HttpClient for MockHttpClient {
    fn get(&self, url: &str) -> std::result::Result<HttpResponse, HttpError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .cloned()
            .ok_or_else(|| HttpError {
                message: format!("connection refused: {}", url),
            })
    }
}

/// Build an in-memory zip archive from `(path, contents)` pairs.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();

    for (name, contents) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

/// Write `(relative path, contents)` pairs under `root`.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (relative, contents) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_executor_basic() {
        let exec = MockExecutor::new().with_program("tsc");
        exec.expect(
            CommandPattern::Exact("tsc --version".into()),
            MockProcessOutput::success("Version 5.4.5"),
        );
        exec.expect(
            CommandPattern::StartsWith("tsc -p".into()),
            MockProcessOutput::success(""),
        );

        assert_eq!(exec.find("tsc"), Some(PathBuf::from("tsc")));
        assert_eq!(exec.find("tfx"), None);

        let result = exec.run(&ProcessBuilder::new("tsc").arg("--version")).unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "Version 5.4.5");

        let result = exec
            .run(&ProcessBuilder::new("tsc").args(["-p", "x"]).cwd("/w"))
            .unwrap();
        assert!(result.success());

        let calls = exec.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].cwd, Some(PathBuf::from("/w")));
    }

    #[test]
    fn test_mock_executor_unexpected() {
        let exec = MockExecutor::new();
        assert!(exec.run(&ProcessBuilder::new("unknown")).is_err());
    }

    #[test]
    fn test_limited_expectation() {
        let exec = MockExecutor::new();
        exec.expect_pattern(
            CommandExpectation::new(CommandPattern::Any, MockProcessOutput::failure(2, "boom"))
                .times(1),
        );
        exec.set_default(MockProcessOutput::success("ok"));

        let first = exec.run(&ProcessBuilder::new("a")).unwrap();
        let second = exec.run(&ProcessBuilder::new("a")).unwrap();
        assert_eq!(first.status, Some(2));
        assert!(second.success());
        exec.verify().unwrap();
    }

    #[test]
    fn test_mock_http_client() {
        let client = MockHttpClient::new();
        client.serve("https://example.com/file.zip", b"zip content".to_vec());

        let response = client.get("https://example.com/file.zip").unwrap();
        assert!(response.is_success());
        assert_eq!(response.body, b"zip content");
        assert!(client.get("https://example.com/other.zip").is_err());
        assert_eq!(client.requests().len(), 2);
    }
}
