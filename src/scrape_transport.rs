//! Search-page transport seam.
//!
//! Fetching the page is delegated to an external program so that no network
//! client lives in this crate.

use std::io::Read;
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};

const QUERY_PLACEHOLDER: &str = "{query}";
const MAX_STDERR_CHARS: usize = 200;
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Interface implemented by search-page fetchers.
pub trait ScrapeTransport: Send {
    /// Returns the raw page body for `query`.
    fn fetch_page(&self, query: &str) -> Result<String, String>;
}

/// Runs a configured argv template and returns its stdout as the page body.
///
/// A command still running after `timeout` is killed so a hung fetch cannot
/// hold back newer query runs.
#[derive(Debug, Clone)]
pub struct CommandTransport {
    argv_template: Vec<String>,
    timeout: Duration,
}

fn spawn_pipe_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Err(err) = pipe.read_to_end(&mut bytes) {
            debug!("Failed to read search command output: {}", err);
        }
        bytes
    })
}

fn join_pipe_reader(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Waits for `child` until `deadline`. Returns `Ok(None)` on timeout.
fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(EXIT_POLL_INTERVAL.min(deadline - now));
    }
}

impl CommandTransport {
    pub fn new(argv_template: Vec<String>, timeout: Duration) -> Self {
        Self {
            argv_template,
            timeout,
        }
    }

    fn expand_argv(&self, query: &str) -> Vec<String> {
        let encoded = urlencoding::encode(query);
        self.argv_template
            .iter()
            .map(|arg| arg.replace(QUERY_PLACEHOLDER, &encoded))
            .collect()
    }
}

impl ScrapeTransport for CommandTransport {
    fn fetch_page(&self, query: &str) -> Result<String, String> {
        let argv = self.expand_argv(query);
        let Some((program, args)) = argv.split_first() else {
            return Err("no search command configured (set [search].command)".to_string());
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| format!("Failed to run {program}: {error}"))?;

        // Drained concurrently so a large page cannot block the child on a full pipe.
        let stdout_reader = child.stdout.take().map(spawn_pipe_reader::<ChildStdout>);
        let stderr_reader = child.stderr.take().map(spawn_pipe_reader::<ChildStderr>);

        let status = match wait_until(&mut child, Instant::now() + self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                if let Err(err) = child.kill() {
                    warn!("Failed to kill timed out search command {}: {}", program, err);
                }
                let _ = child.wait();
                return Err(format!(
                    "{program} timed out after {} ms",
                    self.timeout.as_millis()
                ));
            }
            Err(error) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("Failed to wait for {program}: {error}"));
            }
        };

        let stdout = join_pipe_reader(stdout_reader);
        let stderr = join_pipe_reader(stderr_reader);

        if !status.success() {
            let stderr: String = String::from_utf8_lossy(&stderr)
                .trim()
                .chars()
                .take(MAX_STDERR_CHARS)
                .collect();
            return Err(format!("{program} exited with {status}: {stderr}"));
        }

        Ok(String::from_utf8_lossy(&stdout).to_string())
    }
}
