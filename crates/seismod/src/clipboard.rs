// # Command-line Clipboard
//
// Writes the clipboard by piping text into the first platform utility that
// can be spawned. Tools that are not installed are skipped; a tool that runs
// and fails is remembered so the final error names it.

use async_trait::async_trait;
use seismo_core::Error;
use seismo_core::traits::Clipboard;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Utilities tried in order, with their arguments
const CLIPBOARD_COMMANDS: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("clip", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

/// Clipboard backed by external copy utilities
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    commands: Vec<(String, Vec<String>)>,
}

impl CommandClipboard {
    /// Clipboard trying the usual utilities for macOS, Windows, Wayland and X11
    pub fn new() -> Self {
        Self::with_commands(
            CLIPBOARD_COMMANDS
                .iter()
                .map(|(program, args)| {
                    (
                        program.to_string(),
                        args.iter().map(|a| a.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }

    /// Clipboard trying exactly `commands`
    pub fn with_commands(commands: Vec<(String, Vec<String>)>) -> Self {
        Self { commands }
    }

    /// Pipe `text` into one utility
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: the utility ran and exited successfully
    /// - `Ok(false)`: the utility is not installed
    /// - `Err(Error)`: the utility ran but failed
    async fn pipe_into(program: &str, args: &[String], text: &str) -> Result<bool, Error> {
        let mut child = match Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(Error::operator(format!("{}: {}", program, e))),
        };

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::operator(format!("{}: failed to capture stdin", program)))?;
        // A utility that exits early closes the pipe; its exit status tells the story
        match stdin.write_all(text.as_bytes()).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
            Err(e) => return Err(Error::operator(format!("{}: {}", program, e))),
        }
        drop(stdin);

        let status = child.wait().await?;
        if status.success() {
            Ok(true)
        } else {
            Err(Error::operator(format!("{} exited with {}", program, status)))
        }
    }
}

impl Default for CommandClipboard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clipboard for CommandClipboard {
    async fn write_text(&self, text: &str) -> Result<(), Error> {
        let mut last_error = None;

        for (program, args) in &self.commands {
            match Self::pipe_into(program, args, text).await {
                Ok(true) => {
                    debug!("Copied {} bytes with {}", text.len(), program);
                    return Ok(());
                }
                Ok(false) => continue,
                Err(e) => {
                    debug!("Clipboard utility failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::operator("no clipboard utility found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_utilities_report_operator_error() {
        let clipboard = CommandClipboard::with_commands(vec![(
            "seismod-no-such-clipboard-tool".to_string(),
            Vec::new(),
        )]);

        let err = clipboard.write_text("5").await.unwrap_err();
        assert!(matches!(err, Error::Operator(_)));
        assert!(err.to_string().contains("no clipboard utility found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn first_working_utility_wins() {
        let clipboard = CommandClipboard::with_commands(vec![
            ("seismod-no-such-clipboard-tool".to_string(), Vec::new()),
            ("false".to_string(), Vec::new()),
            ("cat".to_string(), Vec::new()),
        ]);

        assert!(clipboard.write_text("5").await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_utility_is_named() {
        let clipboard =
            CommandClipboard::with_commands(vec![("false".to_string(), Vec::new())]);

        let err = clipboard.write_text("5").await.unwrap_err();
        assert!(err.to_string().contains("false exited with"));
    }
}
