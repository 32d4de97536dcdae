// # Operator Traits
//
// The monitor talks to a human through three narrow interfaces: a yes/no
// prompt, fire-and-forget notifications, and a clipboard. Desktop, console
// and test implementations all live outside the core.

use async_trait::async_trait;

/// Yes/no confirmation from the operator
///
/// `confirm` suspends until the operator answers. No timeout is applied by
/// the core; an implementation that wants bounded latency can wrap its own.
#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Ask `question` and wait for the answer
    ///
    /// # Returns
    ///
    /// - `Ok(true)` / `Ok(false)`: the operator's answer
    /// - `Err(Error::Operator)`: the prompt could not be shown or answered
    async fn confirm(&self, question: &str) -> Result<bool, crate::Error>;
}

/// Fire-and-forget operator notifications
pub trait Notifier: Send + Sync {
    /// Informational notification
    fn notify(&self, title: &str, body: &str);

    /// Alert-level notification (failures)
    fn alert(&self, title: &str, body: &str);
}

/// Shared clipboard
#[async_trait]
pub trait Clipboard: Send + Sync {
    /// Replace the clipboard contents with `text`
    async fn write_text(&self, text: &str) -> Result<(), crate::Error>;
}
