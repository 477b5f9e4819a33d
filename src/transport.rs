//! Debugger process transport
//!
//! The engine talks to gdb over line-oriented stdio. [`GdbProcess`] wraps a
//! spawned `gdb --interpreter=mi2` child behind channels so the engine can
//! poll for output without blocking; [`MockTransport`] replaces the child
//! process in tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::common::{Error, Result};

/// Byte pipe to the debugger, abstracted for testing
pub trait Transport {
    /// Queue one line for the debugger's stdin (newline appended)
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Drain every complete output line received so far, without blocking
    fn read_available_lines(&mut self) -> Vec<String>;

    /// Ask the debuggee (or gdb itself) to halt
    fn send_interrupt(&mut self, child_pid: Option<i64>) -> Result<()>;

    fn is_alive(&self) -> bool;

    /// Kill the underlying process; further writes fail
    fn shutdown(&mut self);
}

/// A live gdb child process
pub struct GdbProcess {
    outgoing: mpsc::UnboundedSender<String>,
    incoming: mpsc::UnboundedReceiver<String>,
    kill: Option<oneshot::Sender<()>>,
    alive: Arc<AtomicBool>,
    gdb_pid: Option<u32>,
}

impl GdbProcess {
    /// Spawn gdb in MI mode. Reader tasks forward stdout and stderr lines
    /// into one channel; a writer task owns stdin.
    pub fn spawn(program: &Path, args: &[String], working_dir: Option<&Path>) -> Result<GdbProcess> {
        let mut command = Command::new(program);
        command
            .arg("--interpreter=mi2")
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| Error::TransportClosed(format!("failed to spawn {program:?}: {e}")))?;
        let gdb_pid = child.id();
        debug!(pid = ?gdb_pid, "spawned debugger process");

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::TransportClosed("no stdin pipe".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::TransportClosed("no stdout pipe".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::TransportClosed("no stderr pipe".into()))?;

        let (line_tx, incoming) = mpsc::unbounded_channel();
        let stderr_tx = line_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        });
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if stderr_tx.send(line).is_err() {
                    break;
                }
            }
        });

        let (outgoing, mut write_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(line) = write_rx.recv().await {
                if stdin.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if stdin.write_all(b"\n").await.is_err() {
                    break;
                }
                if stdin.flush().await.is_err() {
                    break;
                }
            }
        });

        let alive = Arc::new(AtomicBool::new(true));
        let alive_flag = alive.clone();
        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    debug!(?status, "debugger process exited");
                }
                _ = kill_rx => {
                    let _ = child.kill().await;
                }
            }
            alive_flag.store(false, Ordering::SeqCst);
        });

        Ok(GdbProcess {
            outgoing,
            incoming,
            kill: Some(kill_tx),
            alive,
            gdb_pid,
        })
    }
}

impl Transport for GdbProcess {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.outgoing
            .send(line.to_string())
            .map_err(|_| Error::TransportClosed("stdin writer gone".into()))
    }

    fn read_available_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.incoming.try_recv() {
            lines.push(line);
        }
        lines
    }

    fn send_interrupt(&mut self, child_pid: Option<i64>) -> Result<()> {
        // Interrupt the debuggee directly when we know its pid; otherwise
        // signal gdb, which forwards to the inferior.
        #[cfg(unix)]
        {
            let target = child_pid.or(self.gdb_pid.map(i64::from));
            let Some(pid) = target else {
                return Err(Error::TransportClosed("no process to interrupt".into()));
            };
            let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) };
            if rc != 0 {
                warn!(pid, "failed to deliver SIGINT");
                return Err(Error::TransportClosed(format!("kill({pid}) failed")));
            }
            Ok(())
        }
        #[cfg(not(unix))]
        {
            let _ = child_pid;
            Err(Error::TransportClosed(
                "interrupt is not supported on this platform".into(),
            ))
        }
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn shutdown(&mut self) {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
    }
}

/// Scripted transport for tests: records writes and interrupts, feeds back
/// canned lines, optionally through a per-command responder closure.
#[derive(Default)]
pub struct MockTransport {
    written: Rc<RefCell<Vec<String>>>,
    incoming: Rc<RefCell<VecDeque<String>>>,
    interrupts: Rc<RefCell<Vec<Option<i64>>>>,
    alive: Rc<Cell<bool>>,
    responder: Option<Box<dyn FnMut(&str) -> Vec<String>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            alive: Rc::new(Cell::new(true)),
            ..Default::default()
        }
    }

    /// Install a closure that turns each written command line into the
    /// output lines gdb would answer with
    pub fn with_responder(mut self, responder: impl FnMut(&str) -> Vec<String> + 'static) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Queue a line as if gdb emitted it spontaneously
    pub fn push_line(&self, line: impl Into<String>) {
        self.incoming.borrow_mut().push_back(line.into());
    }

    pub fn written(&self) -> Rc<RefCell<Vec<String>>> {
        self.written.clone()
    }

    pub fn interrupts(&self) -> Rc<RefCell<Vec<Option<i64>>>> {
        self.interrupts.clone()
    }

    pub fn alive_flag(&self) -> Rc<Cell<bool>> {
        self.alive.clone()
    }

    pub fn incoming(&self) -> Rc<RefCell<VecDeque<String>>> {
        self.incoming.clone()
    }
}

impl Transport for MockTransport {
    fn write_line(&mut self, line: &str) -> Result<()> {
        if !self.alive.get() {
            return Err(Error::TransportClosed("mock transport closed".into()));
        }
        self.written.borrow_mut().push(line.to_string());
        if let Some(responder) = &mut self.responder {
            let replies = responder(line);
            self.incoming.borrow_mut().extend(replies);
        }
        Ok(())
    }

    fn read_available_lines(&mut self) -> Vec<String> {
        self.incoming.borrow_mut().drain(..).collect()
    }

    fn send_interrupt(&mut self, child_pid: Option<i64>) -> Result<()> {
        self.interrupts.borrow_mut().push(child_pid);
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive.get()
    }

    fn shutdown(&mut self) {
        self.alive.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_records_writes_and_replies() {
        let mut mock = MockTransport::new().with_responder(|cmd| {
            if cmd.ends_with("-break-insert main") {
                vec!["^done,bkpt={number=\"1\"}".to_string()]
            } else {
                vec![]
            }
        });
        let written = mock.written();

        mock.write_line("10000000001-break-insert main").unwrap();
        assert_eq!(written.borrow().len(), 1);
        assert_eq!(mock.read_available_lines(), vec!["^done,bkpt={number=\"1\"}"]);
        assert!(mock.read_available_lines().is_empty());
    }

    #[test]
    fn mock_shutdown_rejects_writes() {
        let mut mock = MockTransport::new();
        mock.shutdown();
        assert!(!mock.is_alive());
        assert!(mock.write_line("-gdb-exit").is_err());
    }
}
