use chrono::Utc;
use clap::Parser;
use ringkv::{run_console, try_create_ring_node, NodeConfigFile, NodeId, RingNodeConfig, RingOptions};
use slog::Drain;
use std::error::Error;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use tokio::io::BufReader;

/// A name server in a ring-partitioned key-value store.
#[derive(Debug, Parser)]
#[command(name = "ringkv-node")]
struct Args {
    /// Run as the bootstrap name server. Its config lists seed `key value` pairs instead of a
    /// bootstrap address.
    #[arg(long)]
    bootstrap: bool,

    /// IP address other name servers use to reach this one.
    #[arg(long, default_value = "127.0.0.1")]
    advertise_ip: String,

    /// Write logs to a timestamped file in this directory instead of stderr.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = NodeConfigFile::from_path(&args.config, args.bootstrap).unwrap_or_else(|e| exit_with(&e));

    let logger = match &args.log_dir {
        Some(dir) => create_root_logger_for_file(dir, config.id).unwrap_or_else(|e| exit_with(&e)),
        None => create_root_logger_for_stderr(config.id),
    };

    println!("ID: {}", config.id);
    println!("Port: {}", config.listen_port);

    let client = try_create_ring_node(RingNodeConfig {
        id: config.id,
        advertise_ip: args.advertise_ip,
        listen_port: config.listen_port,
        role: config.role,
        info_logger: logger.clone(),
        options: RingOptions::default(),
    })
    .await
    .unwrap_or_else(|e| exit_with(&e));

    run_console(logger, client, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await;
}

fn exit_with(e: &dyn Error) -> ! {
    let mut message = format!("Error : {}", e);
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {}", cause));
        source = cause.source();
    }

    eprintln!("{}", message);
    process::exit(1)
}

fn create_root_logger_for_file(directory: &Path, id: NodeId) -> io::Result<slog::Logger> {
    std::fs::create_dir_all(directory)?;

    let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let log_path = directory.join(format!("name_server_{}_{}.log", id, now));
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let decorator = slog_term::PlainDecorator::new(file);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Ok(slog::Logger::root(drain, slog::o!()))
}

// The console owns stdout, so terminal logs go to stderr.
fn create_root_logger_for_stderr(id: NodeId) -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).use_file_location().build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!("Binary" => format!("ringkv-node-{}", id)))
}
