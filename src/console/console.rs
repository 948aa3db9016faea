use crate::api::{ConsoleStream, RingNodeClient, RingNodeHandle};
use crate::console::command::ConsoleCommand;
use crate::ring::OperatorCommandError;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

const BOOTSTRAP_PROMPT: &str = "Bootstrap > ";
const NAME_SERVER_PROMPT: &str = "NameServer > ";

enum Reply {
    Silent,
    Text(String),
    Quit,
}

/// Runs the interactive operator console until `quit` (bootstrap only) or end of input, then stops
/// the node's server.
///
/// Notifications from the ring are printed as they arrive, between prompts.
pub async fn run_console<R, W>(logger: slog::Logger, client: RingNodeClient, input: R, output: W)
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let RingNodeClient {
        mut handle,
        console_stream,
        lifecycle_listener: _,
    } = client;

    let prompt = if handle.is_bootstrap() {
        BOOTSTRAP_PROMPT
    } else {
        NAME_SERVER_PROMPT
    };

    let output = Arc::new(Mutex::new(output));
    let printer = tokio::spawn(print_notifications(logger.clone(), console_stream, output.clone(), prompt));

    let mut lines = input.lines();
    loop {
        if write_out(&output, prompt).await.is_err() {
            break;
        }

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                slog::warn!(logger, "Failed to read console input: {}", e);
                break;
            }
        };

        let reply = execute(&logger, &handle, &line).await;
        let text = match reply {
            Reply::Silent => continue,
            Reply::Text(text) => text,
            Reply::Quit => break,
        };
        if write_out(&output, &format!("{}\n", text)).await.is_err() {
            break;
        }
    }

    printer.abort();
    handle.shutdown();
    let _ = write_out(&output, "\nGoodbye.\n").await;
}

async fn execute(logger: &slog::Logger, handle: &RingNodeHandle, line: &str) -> Reply {
    let command = match ConsoleCommand::parse(line, handle.is_bootstrap()) {
        Ok(command) => command,
        Err(e) => return Reply::Text(e.to_string()),
    };

    let result = match command {
        ConsoleCommand::Empty => return Reply::Silent,
        ConsoleCommand::Quit => return Reply::Quit,
        ConsoleCommand::Status => return Reply::Text(handle.status().to_string()),
        ConsoleCommand::Enter => handle.enter().await.map(|_| None),
        ConsoleCommand::Leave => handle.leave().await.map(|notice| Some(notice.to_string())),
        ConsoleCommand::Lookup(key) => handle.lookup(key).await.map(|_| None),
        ConsoleCommand::Insert(key, value) => handle.insert(key, value).await.map(|_| None),
        ConsoleCommand::Delete(key) => handle.delete(key).await.map(|_| None),
    };

    match result {
        Ok(Some(text)) => Reply::Text(text),
        Ok(None) => Reply::Silent,
        Err(OperatorCommandError::Send(e)) => {
            slog::warn!(logger, "Console command failed: {}", e);
            Reply::Text("\nError : Communication with coordinator failed.".to_string())
        }
        Err(e) => Reply::Text(format!("Error : {}", e)),
    }
}

async fn print_notifications<W>(
    logger: slog::Logger,
    mut console_stream: ConsoleStream,
    output: Arc<Mutex<W>>,
    prompt: &'static str,
) where
    W: AsyncWrite + Unpin + Send,
{
    while let Some(text) = console_stream.next().await {
        if let Err(e) = write_out(&output, &format!("\n{}\n{}", text, prompt)).await {
            slog::warn!(logger, "Failed to print notification: {}", e);
            return;
        }
    }
}

async fn write_out<W>(output: &Mutex<W>, text: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut output = output.lock().await;
    output.write_all(text.as_bytes()).await?;
    output.flush().await
}
