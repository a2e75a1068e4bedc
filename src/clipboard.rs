//! Clipboard access through platform helper commands.
//!
//! Windows uses `clip` and PowerShell, macOS uses `pbcopy`/`pbpaste`.
//! Other platforms return [`GlueError::ClipboardUnsupported`].

use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::GlueError;
use crate::output::ByteDecoder;
use crate::Result;

/// Helper commands for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backend {
    /// Reads the text to copy from stdin.
    pub copy: &'static [&'static str],
    /// Writes the clipboard contents to stdout.
    pub paste: &'static [&'static str],
    /// Empties the clipboard. `None` means copy an empty string.
    pub clear: Option<&'static [&'static str]>,
}

/// Windows helpers. The clear command is `Set-Clipboard -Value ""`.
pub const WINDOWS: Backend = Backend {
    copy: &["clip"],
    paste: &["powershell", "-NoProfile", "-Command", "Get-Clipboard"],
    clear: Some(&[
        "powershell",
        "-NoProfile",
        "-Command",
        "Set-Clipboard",
        "-Value",
        "\"\"",
    ]),
};

/// macOS helpers. Clearing copies an empty string.
pub const MACOS: Backend = Backend {
    copy: &["pbcopy"],
    paste: &["pbpaste"],
    clear: None,
};

/// The backend for the current platform, if there is one.
pub fn backend() -> Option<Backend> {
    if cfg!(windows) {
        Some(WINDOWS)
    } else if cfg!(target_os = "macos") {
        Some(MACOS)
    } else {
        None
    }
}

/// Copy `text` to the clipboard.
pub fn copy(text: &str) -> Result<()> {
    let backend = backend().ok_or(GlueError::ClipboardUnsupported)?;
    run_with_input(backend.copy, text)
}

/// Read the clipboard as text.
pub fn paste() -> Result<String> {
    let backend = backend().ok_or(GlueError::ClipboardUnsupported)?;
    run_capture(backend.paste)
}

/// Empty the clipboard.
pub fn clear() -> Result<()> {
    let backend = backend().ok_or(GlueError::ClipboardUnsupported)?;
    match backend.clear {
        Some(argv) => run_capture(argv).map(|_| ()),
        None => run_with_input(backend.copy, ""),
    }
}

fn command_for(argv: &[&str]) -> Result<Command> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| GlueError::Clipboard("empty helper command".into()))?;
    let mut command = Command::new(program);
    command.args(args);
    Ok(command)
}

fn check_status(argv: &[&str], status: std::process::ExitStatus, stderr: &[u8]) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    Err(GlueError::Clipboard(format!(
        "`{}` exited with {}: {}",
        argv.join(" "),
        status,
        ByteDecoder::decode_to_string(stderr).trim()
    )))
}

/// Run a helper, feeding `input` on stdin.
fn run_with_input(argv: &[&str], input: &str) -> Result<()> {
    let mut child = command_for(argv)?
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| GlueError::Clipboard(format!("failed to run `{}`: {}", argv.join(" "), e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(input.as_bytes()) {
            drop(stdin);
            // Reap the helper before reporting
            let _ = child.kill();
            let _ = child.wait();
            return Err(e.into());
        }
    }

    let output = child.wait_with_output()?;
    check_status(argv, output.status, &output.stderr)
}

/// Run a helper and return its decoded stdout.
fn run_capture(argv: &[&str]) -> Result<String> {
    let output = command_for(argv)?
        .stdin(Stdio::null())
        .output()
        .map_err(|e| GlueError::Clipboard(format!("failed to run `{}`: {}", argv.join(" "), e)))?;

    check_status(argv, output.status, &output.stderr)?;
    Ok(ByteDecoder::decode_to_string(&output.stdout))
}
