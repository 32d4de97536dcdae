// # Console Front End
//
// Stands in for a tray menu and dialog boxes:
//
// - a numbered menu of sources on stdout; typing a number or a name triggers
//   that source, `list` reprints the menu, `quit` stops periodic refreshes
// - yes/no questions from the ChangeRecorder are queued and answered by the
//   next stdin lines, one question at a time
// - notifications are printed and mirrored to the log
//
// Once stdin closes, every pending and future question fails as unreachable.

use async_trait::async_trait;
use seismo_core::traits::{Confirmer, Notifier};
use seismo_core::{Error, SchedulerHandle};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Questions that may wait for an answer at once
const CONFIRM_QUEUE_CAPACITY: usize = 16;

/// A question waiting for the operator
#[derive(Debug)]
pub struct ConfirmRequest {
    question: String,
    reply: oneshot::Sender<bool>,
}

/// Confirmer that forwards questions to the [`Console`]
#[derive(Debug, Clone)]
pub struct ConsoleConfirmer {
    tx: mpsc::Sender<ConfirmRequest>,
}

impl ConsoleConfirmer {
    /// Create a confirmer and the receiving end for the console
    pub fn channel() -> (Self, mpsc::Receiver<ConfirmRequest>) {
        let (tx, rx) = mpsc::channel(CONFIRM_QUEUE_CAPACITY);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Confirmer for ConsoleConfirmer {
    async fn confirm(&self, question: &str) -> Result<bool, Error> {
        let (reply, answer) = oneshot::channel();
        self.tx
            .send(ConfirmRequest {
                question: question.to_string(),
                reply,
            })
            .await
            .map_err(|_| Error::operator("console is not running"))?;

        answer
            .await
            .map_err(|_| Error::operator("console input closed before an answer"))
    }
}

/// Prints notifications and mirrors them to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, title: &str, body: &str) {
        println!("[{}] {}", title, body);
        info!("{}: {}", title, body);
    }

    fn alert(&self, title: &str, body: &str) {
        println!("[{}!] {}", title, body);
        warn!("{}: {}", title, body);
    }
}

/// One parsed menu line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuCommand {
    Trigger(String),
    List,
    Quit,
    Empty,
    Unknown(String),
}

/// Parse a menu line against the sources in menu order
///
/// Numbers are 1-based positions in the menu.
pub fn parse_command(line: &str, names: &[String]) -> MenuCommand {
    let line = line.trim();
    match line {
        "" => return MenuCommand::Empty,
        "list" => return MenuCommand::List,
        "quit" | "q" => return MenuCommand::Quit,
        _ => {}
    }

    if let Ok(index) = line.parse::<usize>() {
        return match index.checked_sub(1).and_then(|i| names.get(i)) {
            Some(name) => MenuCommand::Trigger(name.clone()),
            None => MenuCommand::Unknown(line.to_string()),
        };
    }

    if names.iter().any(|name| name == line) {
        MenuCommand::Trigger(line.to_string())
    } else {
        MenuCommand::Unknown(line.to_string())
    }
}

/// Whether an answer line means yes
pub fn is_affirmative(line: &str) -> bool {
    line.trim_start()
        .chars()
        .next()
        .is_some_and(|c| c.eq_ignore_ascii_case(&'y'))
}

/// Menu text for `names`
pub fn render_menu(names: &[String]) -> String {
    let mut menu = String::from("Sources:\n");
    if names.is_empty() {
        menu.push_str("  (none configured)\n");
    }
    for (i, name) in names.iter().enumerate() {
        menu.push_str(&format!("  {}) {}\n", i + 1, name));
    }
    menu.push_str("Type a number or name to copy its value, 'list' to show this menu, 'quit' to stop.");
    menu
}

/// Console actor owning stdin
pub struct Console {
    names: Vec<String>,
    scheduler: Arc<SchedulerHandle>,
    confirm_rx: mpsc::Receiver<ConfirmRequest>,
}

impl Console {
    pub fn new(
        names: Vec<String>,
        scheduler: Arc<SchedulerHandle>,
        confirm_rx: mpsc::Receiver<ConfirmRequest>,
    ) -> Self {
        Self {
            names,
            scheduler,
            confirm_rx,
        }
    }

    /// Serve the process's stdin
    pub async fn run(self) {
        self.run_with(BufReader::new(tokio::io::stdin())).await;
    }

    /// Serve `input` until it closes and every confirmer is gone
    pub async fn run_with<R: AsyncBufRead + Unpin>(mut self, input: R) {
        let mut lines = input.lines();
        let mut pending: VecDeque<ConfirmRequest> = VecDeque::new();
        let mut input_open = true;
        let mut confirm_open = true;

        println!("{}", render_menu(&self.names));

        while input_open || confirm_open {
            tokio::select! {
                request = self.confirm_rx.recv(), if confirm_open => match request {
                    Some(request) if input_open => {
                        if pending.is_empty() {
                            println!("{} [y/N]", request.question);
                        }
                        pending.push_back(request);
                    }
                    // Dropping the reply makes the question unreachable
                    Some(_) => debug!("Console input closed, question dropped"),
                    None => confirm_open = false,
                },

                line = lines.next_line(), if input_open => match line {
                    Ok(Some(line)) => self.handle_line(&line, &mut pending),
                    Ok(None) => {
                        info!("Console input closed");
                        input_open = false;
                        pending.clear();
                    }
                    Err(e) => {
                        warn!("Console input failed: {}", e);
                        input_open = false;
                        pending.clear();
                    }
                },
            }
        }
    }

    fn handle_line(&self, line: &str, pending: &mut VecDeque<ConfirmRequest>) {
        if let Some(request) = pending.pop_front() {
            // The recorder may have given up waiting; nothing to do then
            let _ = request.reply.send(is_affirmative(line));
            if let Some(next) = pending.front() {
                println!("{} [y/N]", next.question);
            }
            return;
        }

        match parse_command(line, &self.names) {
            MenuCommand::Trigger(name) => {
                if let Err(e) = self.scheduler.trigger(&name) {
                    warn!("Cannot trigger {}: {}", name, e);
                }
            }
            MenuCommand::List => println!("{}", render_menu(&self.names)),
            MenuCommand::Quit => {
                if self.scheduler.shutdown() {
                    println!("Stopping periodic refresh");
                }
            }
            MenuCommand::Empty => {}
            MenuCommand::Unknown(input) => println!("Unknown command: {}", input),
        }
    }
}
