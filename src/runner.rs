//! Execution of generated validation scripts with bounded regeneration.
//!
//! Each attempt runs `<interpreter> <script> <input> <output>` as a child
//! process. A non-zero exit, a spawn failure or a timeout are all treated the
//! same way: while retries remain, a *fresh* script is generated from the same
//! rules and headers and the next attempt runs that one.
//!
//! ```text
//! Attempt ──ok──────────────────────────────▶ Success(stdout)
//!    │
//!    └─fail─▶ retries_remaining > 0 ? ──yes──▶ regenerate ─▶ Attempt
//!                                    └─no───▶ ScriptExecutionFailed
//! ```

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{AttemptError, PipelineError};
use crate::models::Rule;
use crate::script_gen::ScriptGenerator;

/// Keep error messages readable when a script dumps a long traceback.
const MAX_STDERR_IN_ERROR: usize = 4 * 1024;

/// Everything needed to regenerate a script between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub rules: &'a [Rule],
    pub csv_headers: &'a str,
    pub document_id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub stdout: String,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

struct AttemptOutput {
    stdout: String,
    stderr: String,
}

#[derive(Clone)]
pub struct ScriptRunner {
    interpreter: String,
    timeout: Duration,
    generator: ScriptGenerator,
}

impl ScriptRunner {
    pub fn new(interpreter: impl Into<String>, timeout: Duration, generator: ScriptGenerator) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
            generator,
        }
    }

    /// Runs `script`, regenerating and retrying up to `retries` times.
    pub async fn run(
        &self,
        script: &Path,
        request: RunRequest<'_>,
        retries: u32,
    ) -> Result<RunOutcome, PipelineError> {
        let mut script: PathBuf = script.to_path_buf();
        let mut retries_remaining = retries;
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.execute_once(&script, request.input, request.output).await {
                Ok(out) => {
                    if !out.stderr.trim().is_empty() {
                        warn!(document_id = request.document_id, stderr = %out.stderr.trim(), "validation script wrote to stderr");
                    }
                    info!(document_id = request.document_id, attempts, "validation script succeeded");
                    return Ok(RunOutcome {
                        stdout: out.stdout,
                        attempts,
                    });
                }
                Err(e) => {
                    warn!(
                        document_id = request.document_id,
                        attempt = attempts,
                        retries_remaining,
                        error = %e,
                        "validation script failed"
                    );
                    if retries_remaining == 0 {
                        return Err(PipelineError::ScriptExecutionFailed {
                            attempts,
                            last_error: e.to_string(),
                        });
                    }
                    retries_remaining -= 1;
                    script = self
                        .generator
                        .generate_script(request.rules, request.csv_headers, request.document_id)
                        .await?;
                }
            }
        }
    }

    async fn execute_once(
        &self,
        script: &Path,
        input: &Path,
        output: &Path,
    ) -> Result<AttemptOutput, AttemptError> {
        let mut command = tokio::process::Command::new(&self.interpreter);
        command
            .arg(script)
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The script leads its own group so a timeout can take its children down too.
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|e| AttemptError::Spawn {
            program: self.interpreter.clone(),
            message: e.to_string(),
        })?;
        let pid = child.id();

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(AttemptError::Io(e.to_string())),
            Err(_) => {
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                return Err(AttemptError::Timeout(self.timeout.as_secs()));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(AttemptOutput { stdout, stderr })
        } else {
            Err(AttemptError::NonZeroExit {
                code: output.status.code(),
                stderr: tail(stderr.trim(), MAX_STDERR_IN_ERROR).to_string(),
            })
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    // SAFETY: kill(2) with a negative pid only signals that process group.
    let rc = unsafe { libc::kill(-(pgid as libc::pid_t), libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!(pgid, error = %err, "could not kill script process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

/// Last `max` bytes of `s`, cut on a char boundary.
fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::llm::testing::ScriptedClient;
    use crate::storage::FileStorage;
    use std::sync::Arc;
    use tempfile::TempDir;

    const FAILING: &str = "```sh\necho boom >&2\nexit 3\n```";
    const COPYING: &str = "```sh\ncp \"$1\" \"$2\"\necho done\n```";

    struct Fixture {
        tmp: TempDir,
        llm: Arc<ScriptedClient>,
        runner: ScriptRunner,
    }

    fn fixture(interpreter: &str, timeout: Duration, replies: &[&str]) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let storage = FileStorage::new(&StorageConfig {
            root: tmp.path().to_path_buf(),
            destinations: vec![],
        });
        let llm = ScriptedClient::new(replies.iter().copied());
        let generator = ScriptGenerator::new(llm.clone(), storage, "POSIX shell", "sh");
        let runner = ScriptRunner::new(interpreter, timeout, generator);
        Fixture { tmp, llm, runner }
    }

    impl Fixture {
        fn script(&self, body: &str) -> PathBuf {
            let path = self.tmp.path().join("initial.sh");
            std::fs::write(&path, body).unwrap();
            path
        }

        fn input(&self) -> PathBuf {
            let path = self.tmp.path().join("input.csv");
            std::fs::write(&path, "amount\n10\n").unwrap();
            path
        }
    }

    fn request<'a>(input: &'a Path, output: &'a Path) -> RunRequest<'a> {
        RunRequest {
            input,
            output,
            rules: &[],
            csv_headers: "amount",
            document_id: "doc-1",
        }
    }

    #[tokio::test]
    async fn exhausts_retries_with_fresh_scripts() {
        let f = fixture("sh", Duration::from_secs(10), &[FAILING, FAILING, FAILING]);
        let script = f.script("exit 1\n");
        let input = f.input();
        let output = f.tmp.path().join("report.csv");

        let err = f
            .runner
            .run(&script, request(&input, &output), 3)
            .await
            .unwrap_err();
        match err {
            PipelineError::ScriptExecutionFailed { attempts, last_error } => {
                assert_eq!(attempts, 4);
                assert!(last_error.contains("boom"), "{}", last_error);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(f.llm.calls(), 3);
    }

    #[tokio::test]
    async fn succeeds_after_one_regeneration() {
        let f = fixture("sh", Duration::from_secs(10), &[COPYING, COPYING]);
        let script = f.script("exit 1\n");
        let input = f.input();
        let output = f.tmp.path().join("report.csv");

        let outcome = f
            .runner
            .run(&script, request(&input, &output), 3)
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.stdout.trim(), "done");
        assert_eq!(f.llm.calls(), 1);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "amount\n10\n");
    }

    #[tokio::test]
    async fn first_attempt_success_skips_generation() {
        let f = fixture("sh", Duration::from_secs(10), &[]);
        let script = f.script("echo ok\n");
        let input = f.input();
        let output = f.tmp.path().join("report.csv");

        let outcome = f
            .runner
            .run(&script, request(&input, &output), 3)
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(f.llm.calls(), 0);
    }

    #[tokio::test]
    async fn timeout_counts_as_failed_attempt() {
        let f = fixture("sh", Duration::from_secs(1), &[]);
        let script = f.script("sleep 30\n");
        let input = f.input();
        let output = f.tmp.path().join("report.csv");

        let started = std::time::Instant::now();
        let err = f
            .runner
            .run(&script, request(&input, &output), 0)
            .await
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(err.to_string().contains("timed out"), "{}", err);
    }

    #[tokio::test]
    async fn timeout_kills_background_children() {
        let f = fixture("sh", Duration::from_secs(1), &[]);
        let marker = f.tmp.path().join("late.txt");
        let script = f.script(&format!(
            "(sleep 2; echo late > '{}') &\nsleep 30\n",
            marker.display()
        ));
        let input = f.input();
        let output = f.tmp.path().join("report.csv");

        let err = f
            .runner
            .run(&script, request(&input, &output), 0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"), "{}", err);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!marker.exists(), "background child outlived the timeout");
    }

    #[tokio::test]
    async fn failed_regeneration_aborts() {
        let f = fixture("sh", Duration::from_secs(10), &[]);
        let script = f.script("exit 1\n");
        let input = f.input();
        let output = f.tmp.path().join("report.csv");

        let err = f
            .runner
            .run(&script, request(&input, &output), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ScriptGenerationFailed(_)));
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_failed_attempt() {
        let f = fixture("no-such-interpreter-xyz", Duration::from_secs(10), &[]);
        let script = f.script("echo ok\n");
        let input = f.input();
        let output = f.tmp.path().join("report.csv");

        let err = f
            .runner
            .run(&script, request(&input, &output), 0)
            .await
            .unwrap_err();
        match err {
            PipelineError::ScriptExecutionFailed { attempts, last_error } => {
                assert_eq!(attempts, 1);
                assert!(last_error.contains("failed to spawn"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tail_keeps_end_of_long_text() {
        assert_eq!(tail("short", 10), "short");
        assert_eq!(tail("0123456789", 4), "6789");
        assert_eq!(tail("ééé", 3), "é");
    }
}
