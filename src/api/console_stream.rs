use tokio::sync::mpsc;

pub(crate) fn create_console_stream() -> (ConsoleStreamPublisher, ConsoleStream) {
    let (tx, rx) = mpsc::unbounded_channel();

    (ConsoleStreamPublisher { sender: tx }, ConsoleStream { receiver: rx })
}

/// ConsoleStreamPublisher hands operator-facing text (`print` notifications and reports the
/// bootstrap produces for itself) to whoever drives the console.
#[derive(Clone)]
pub(crate) struct ConsoleStreamPublisher {
    sender: mpsc::UnboundedSender<String>,
}

impl ConsoleStreamPublisher {
    /// Returns false if nobody is listening anymore. The text is dropped in that case.
    pub(crate) fn publish(&self, text: String) -> bool {
        self.sender.send(text).is_ok()
    }
}

// For the application driving the operator console.
pub struct ConsoleStream {
    receiver: mpsc::UnboundedReceiver<String>,
}

impl ConsoleStream {
    /// Next notification for the operator, or `None` once the node is gone.
    pub async fn next(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}
