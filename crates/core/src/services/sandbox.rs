//! Resource-limited execution of one variant process.

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Bytes kept per output stream; the remainder is drained and dropped.
const MAX_CAPTURE: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    pub timeout: Duration,
    /// Address-space ceiling for the child (`RLIMIT_AS`), if any.
    pub memory_bytes: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Exited(i32),
    Signaled(i32),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct SandboxResult {
    pub outcome: ProcessOutcome,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

#[cfg(unix)]
fn apply_limits(cmd: &mut Command, memory_bytes: Option<u64>) {
    use std::os::unix::process::CommandExt;

    // SAFETY: the closure runs between fork and exec and only calls the async-signal-safe
    // setrlimit(2) on stack values.
    unsafe {
        cmd.pre_exec(move || {
            let no_core = libc::rlimit { rlim_cur: 0, rlim_max: 0 };
            libc::setrlimit(libc::RLIMIT_CORE, &no_core);
            if let Some(bytes) = memory_bytes {
                let limit = libc::rlimit { rlim_cur: bytes as libc::rlim_t, rlim_max: bytes as libc::rlim_t };
                libc::setrlimit(libc::RLIMIT_AS, &limit);
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
fn apply_limits(_cmd: &mut Command, _memory_bytes: Option<u64>) {}

fn outcome_of(status: ExitStatus) -> ProcessOutcome {
    if let Some(code) = status.code() {
        return ProcessOutcome::Exited(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ProcessOutcome::Signaled(signal);
        }
    }
    ProcessOutcome::Exited(-1)
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut captured = Vec::new();
        let Some(mut source) = source else {
            return captured;
        };
        let mut chunk = [0u8; 8192];
        loop {
            match source.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    let room = MAX_CAPTURE.saturating_sub(captured.len());
                    captured.extend_from_slice(&chunk[..n.min(room)]);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        captured
    })
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> io::Result<ProcessOutcome> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(outcome_of(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(ProcessOutcome::TimedOut);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Run `program` with `stdin` as its input under `limits`.
///
/// I/O errors here mean the process could not be started or supervised; they are not faults of
/// the program under test.
pub fn run_sandboxed(program: &Path, stdin: &[u8], limits: &SandboxLimits) -> io::Result<SandboxResult> {
    let mut cmd = Command::new(program);
    cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
    apply_limits(&mut cmd, limits.memory_bytes);

    let mut child = cmd.spawn()?;
    let input = stdin.to_vec();
    let child_stdin = child.stdin.take();
    let writer = thread::spawn(move || {
        if let Some(mut pipe) = child_stdin {
            // EPIPE when the child exits before reading everything.
            let _ = pipe.write_all(&input);
        }
    });
    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());

    let outcome = wait_with_deadline(&mut child, limits.timeout)?;
    let _ = writer.join();
    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();
    debug!(program = %program.display(), ?outcome, stdout_len = stdout.len(), "variant finished");

    Ok(SandboxResult { outcome, stdout, stderr })
}
