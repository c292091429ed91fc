//! Pseudoterminal access.
//!
//! The terminal engine talks to the child process through the [`Pty`]
//! trait: a duplex byte channel plus resize, terminate, and wait-for-exit.
//! [`LocalPty`] is the portable implementation over `portable-pty`,
//! covering Unix ptys and Windows ConPTY with the same surface.
//!
//! # Thread Safety
//!
//! [`Pty`] implementations are shared between the engine's internal reader
//! thread (blocking in [`Pty::receive`]) and the renderer thread (calling
//! [`Pty::send`] and [`Pty::resize`]); each side is serialized internally
//! so the trait takes `&self` everywhere.

// Rust guideline compliant 2025-06

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use portable_pty::{
    native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize,
};

/// The pseudoterminal connection interface.
///
/// The contract mirrors what the engine needs and nothing more: bytes in,
/// bytes out, a resize, and process lifetime control.
pub trait Pty: Send + Sync {
    /// Sends bytes to the child process.
    fn send(&self, data: &[u8]) -> Result<()>;

    /// Receives up to `buf.len()` bytes, blocking until data is available.
    ///
    /// Returns 0 once the child has terminated and the channel is drained.
    fn receive(&self, buf: &mut [u8]) -> Result<usize>;

    /// Resizes the terminal the child sees.
    fn resize(&self, cols: u16, rows: u16) -> Result<()>;

    /// Terminates the child process and returns immediately. Calling this
    /// on an already-dead child is a no-op.
    fn terminate(&self);

    /// Waits for the child to exit and returns its exit code.
    fn wait_for(&self) -> Result<u32>;
}

/// A local child process behind a native pseudoterminal.
pub struct LocalPty {
    master: Mutex<Box<dyn MasterPty + Send>>,
    writer: Mutex<Box<dyn Write + Send>>,
    reader: Mutex<Box<dyn Read + Send>>,
    child: Mutex<Box<dyn Child + Send + Sync>>,
    killer: Mutex<Box<dyn ChildKiller + Send + Sync>>,
}

impl std::fmt::Debug for LocalPty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalPty").finish_non_exhaustive()
    }
}

impl LocalPty {
    /// Opens a pty of the given size and spawns `command` on its slave
    /// side.
    pub fn spawn(command: CommandBuilder, cols: u16, rows: u16) -> Result<Self> {
        let pty_system = native_pty_system();
        let size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };
        let pair = pty_system.openpty(size).context("Failed to open PTY")?;
        let child = pair
            .slave
            .spawn_command(command)
            .context("Failed to spawn PTY command")?;
        // The slave side is the child's; only the master half stays here.
        drop(pair.slave);
        let killer = child.clone_killer();
        let writer = pair
            .master
            .take_writer()
            .context("Failed to take PTY writer")?;
        let reader = pair
            .master
            .try_clone_reader()
            .context("Failed to clone PTY reader")?;
        Ok(Self {
            master: Mutex::new(pair.master),
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            child: Mutex::new(child),
            killer: Mutex::new(killer),
        })
    }
}

impl Pty for LocalPty {
    fn send(&self, data: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().expect("pty writer lock poisoned");
        writer.write_all(data).context("Failed to write to PTY")?;
        writer.flush().context("Failed to flush PTY")?;
        Ok(())
    }

    fn receive(&self, buf: &mut [u8]) -> Result<usize> {
        let mut reader = self.reader.lock().expect("pty reader lock poisoned");
        reader.read(buf).context("Failed to read from PTY")
    }

    fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        let master = self.master.lock().expect("pty master lock poisoned");
        master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("Failed to resize PTY")
    }

    fn terminate(&self) {
        let mut killer = self.killer.lock().expect("pty killer lock poisoned");
        if let Err(e) = killer.kill() {
            log::warn!("Failed to kill PTY child: {e}");
        }
    }

    fn wait_for(&self) -> Result<u32> {
        let mut child = self.child.lock().expect("pty child lock poisoned");
        let status = child.wait().context("Failed to wait for PTY child")?;
        Ok(status.exit_code())
    }
}

impl Drop for LocalPty {
    fn drop(&mut self) {
        self.terminate();
        // Reap the child to prevent zombies.
        if let Ok(mut child) = self.child.lock() {
            let _ = child.wait();
        }
    }
}

/// Builds a [`CommandBuilder`] from a whitespace-separated command string,
/// a working directory, and extra environment variables.
///
/// # Panics
///
/// Panics if `command_str` is empty.
#[must_use]
pub fn build_command(
    command_str: &str,
    cwd: &Path,
    env_vars: &HashMap<String, String>,
) -> CommandBuilder {
    let parts: Vec<&str> = command_str.split_whitespace().collect();
    let mut cmd = CommandBuilder::new(parts[0]);
    for arg in &parts[1..] {
        cmd.arg(arg);
    }
    cmd.cwd(cwd);
    for (key, value) in env_vars {
        cmd.env(key, value);
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn build_command_splits_arguments() {
        let cmd = build_command("echo hello world", Path::new("/tmp"), &HashMap::new());
        let parts = cmd.as_unix_command_line().unwrap();
        assert!(parts.contains("echo"));
        assert!(parts.contains("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn spawn_echo_round_trip() {
        let cmd = build_command("echo pty-ok", Path::new("/"), &HashMap::new());
        let pty = LocalPty::spawn(cmd, 80, 24).expect("spawn failed");
        let mut collected = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match pty.receive(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => collected.extend_from_slice(&buf[..n]),
            }
        }
        let text = String::from_utf8_lossy(&collected);
        assert!(text.contains("pty-ok"), "output was {text:?}");
        let code = pty.wait_for().expect("wait failed");
        assert_eq!(code, 0);
    }
}
