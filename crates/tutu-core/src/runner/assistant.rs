//! The external coding assistant, treated as an opaque process:
//! text in on stdin, text and an exit code out.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::AssistantConfig;
use crate::error::LaunchError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// How long a killed child's pipes get to drain before partial output is taken
const DRAIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// stdout/stderr stay attached to the terminal
    Interactive,
    /// stdout/stderr are collected into the output
    Captured,
}

#[derive(Debug, Clone)]
pub struct AssistantRequest<'a> {
    pub context: &'a str,
    pub working_dir: &'a Path,
    pub mode: RunMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssistantOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Something that can take a context blob and run a session over it.
///
/// Calls block until the session ends.
pub trait Assistant {
    fn run(&self, request: &AssistantRequest<'_>) -> Result<AssistantOutput, LaunchError>;
}

/// Runs the assistant as a child process.
#[derive(Debug, Clone)]
pub struct CommandAssistant {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandAssistant {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: None,
        }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(&config.program, config.args.clone()).with_timeout(config.timeout())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// `Ok(None)` means the timeout elapsed with the child still running.
    fn wait(&self, child: &mut Child) -> io::Result<Option<ExitStatus>> {
        let Some(timeout) = self.timeout else {
            return child.wait().map(Some);
        };
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Assistant for CommandAssistant {
    fn run(&self, request: &AssistantRequest<'_>) -> Result<AssistantOutput, LaunchError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(request.working_dir)
            .stdin(Stdio::piped());
        match request.mode {
            RunMode::Interactive => command.stdout(Stdio::inherit()).stderr(Stdio::inherit()),
            RunMode::Captured => command.stdout(Stdio::piped()).stderr(Stdio::piped()),
        };

        debug!(
            "Launching {} in {}",
            self.program.display(),
            request.working_dir.display()
        );
        let mut child = command.spawn().map_err(LaunchError::Spawn)?;

        // Feed stdin from its own thread so a child that writes before it
        // finishes reading cannot deadlock against a full pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = request.context.to_owned();
            thread::spawn(move || stdin.write_all(input.as_bytes()))
        });
        let stdout_capture = child.stdout.take().map(PipeCapture::spawn);
        let stderr_capture = child.stderr.take().map(PipeCapture::spawn);

        let status = match self.wait(&mut child) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let after = self.timeout.unwrap_or_default();
                warn!("Assistant exceeded {}s, killing pid {}", after.as_secs(), child.id());
                abort(&mut child);
                return Err(LaunchError::TimedOut {
                    after,
                    stdout: drain(stdout_capture),
                    stderr: drain(stderr_capture),
                });
            }
            Err(e) => {
                warn!("Waiting on assistant pid {} failed: {}", child.id(), e);
                abort(&mut child);
                return Err(e.into());
            }
        };

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Err(e)) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e.into()),
                // The child may exit without reading everything
                _ => {}
            }
        }
        let stdout = stdout_capture.map(PipeCapture::finish).unwrap_or_default();
        let stderr = stderr_capture.map(PipeCapture::finish).unwrap_or_default();

        let exit_code = status.code().ok_or(LaunchError::Signal)?;
        Ok(AssistantOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}

/// Kill and reap the child. It may already have exited.
fn abort(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Reads a pipe on its own thread into a buffer that stays readable while
/// the thread is still blocked.
struct PipeCapture {
    handle: JoinHandle<()>,
    buf: Arc<Mutex<Vec<u8>>>,
}

impl PipeCapture {
    fn spawn<R: Read + Send + 'static>(mut pipe: R) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let handle = thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => lock(&sink).extend_from_slice(&chunk[..n]),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
        });
        Self { handle, buf }
    }

    /// Wait for EOF and return everything read.
    fn finish(self) -> String {
        let Self { handle, buf } = self;
        let _ = handle.join();
        contents(&buf)
    }

    /// Give the reader up to `grace` to reach EOF, then take what it has.
    /// A grandchild still holding the pipe open only costs the grace period.
    fn drain(self, grace: Duration) -> String {
        let deadline = Instant::now() + grace;
        while !self.handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        contents(&self.buf)
    }
}

fn drain(capture: Option<PipeCapture>) -> String {
    capture
        .map(|capture| capture.drain(DRAIN_GRACE))
        .unwrap_or_default()
}

fn lock(buf: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn contents(buf: &Mutex<Vec<u8>>) -> String {
    String::from_utf8_lossy(&lock(buf)).into_owned()
}
