//! One spawned engine subprocess and its line channel.
//!
//! A reader thread forwards stdout lines into an `mpsc` channel so waits can
//! be bounded with `recv_timeout`; a closed channel means the process exited.
//! Termination (quit, kill, reap) happens at most once per process.

use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::protocol::uci_codec::QUIT;

pub const ENGINE_QUIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct EngineProcess {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    rx: Receiver<String>,
    label: String,
    quit_timeout: Duration,
    terminated: bool,
}

impl EngineProcess {
    /// Spawn `program` with piped stdin/stdout. `quit_timeout` bounds the
    /// polite exit on [`shutdown`](Self::shutdown) and on drop.
    pub fn spawn<S: AsRef<OsStr>>(
        program: S,
        args: &[String],
        label: String,
        quit_timeout: Duration,
    ) -> io::Result<Self> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        Self::attach(child, label, quit_timeout)
    }

    /// Wire up an already running child. On failure the child is killed and reaped.
    fn attach(mut child: Child, label: String, quit_timeout: Duration) -> io::Result<Self> {
        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                reap(&mut child, &label);
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "engine pipes unavailable"));
            }
        };

        let (tx, rx) = mpsc::channel::<String>();
        let reader = thread::Builder::new()
            .name(format!("{label}-stdout"))
            .spawn(move || {
                let reader = BufReader::new(stdout);
                for line in reader.lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line.trim_end().to_owned()).is_err() {
                        break;
                    }
                }
            });
        if let Err(err) = reader {
            reap(&mut child, &label);
            return Err(err);
        }

        debug!("{label}: spawned pid {}", child.id());
        Ok(Self {
            child,
            stdin: BufWriter::new(stdin),
            rx,
            label,
            quit_timeout,
            terminated: false,
        })
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        debug!("{} << {line}", self.label);
        self.stdin.write_all(line.as_bytes())?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()
    }

    /// Next stdout line. `Disconnected` means the process closed its output.
    pub fn recv_line(&self, timeout: Duration) -> Result<String, RecvTimeoutError> {
        let line = self.rx.recv_timeout(timeout)?;
        debug!("{} >> {line}", self.label);
        Ok(line)
    }

    /// Like [`recv_line`](Self::recv_line) but bounded by an absolute deadline.
    pub fn recv_line_until(&self, deadline: Instant) -> Result<String, RecvTimeoutError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.recv_line(remaining)
    }

    /// Exit status text if the process has already exited.
    pub fn exit_status(&mut self) -> Option<String> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.to_string()),
            _ => None,
        }
    }

    /// Kill and reap immediately. No-op once terminated.
    pub fn kill(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        reap(&mut self.child, &self.label);
    }

    /// Ask politely with `quit`, then kill after the quit timeout. No-op once terminated.
    pub fn shutdown(&mut self) {
        if self.terminated {
            return;
        }
        let _ = self.write_line(QUIT);
        let deadline = Instant::now() + self.quit_timeout;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                self.terminated = true;
                debug!("{}: exited after quit", self.label);
                return;
            }
            thread::sleep(ENGINE_QUIT_POLL_INTERVAL);
        }
        debug!("{}: no exit after quit, killing", self.label);
        self.kill();
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn reap(child: &mut Child, label: &str) {
    if let Err(err) = child.kill() {
        // Already exited; still reap below.
        debug!("{label}: kill: {err}");
    }
    if let Err(err) = child.wait() {
        warn!("{label}: failed to reap engine process: {err}");
    }
}
