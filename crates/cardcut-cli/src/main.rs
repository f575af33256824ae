mod commands;

use cardcut_core::install_signal_handler;
use cardcut_remote::{RemoteConfig, DEFAULT_MANIFEST_BASE};
use clap::Parser;
use commands::{EXIT_FAILURE, EXIT_MANIFEST_ERROR, EXIT_STORE_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

#[derive(Debug, Parser)]
#[command(
    name = "cardcut",
    version,
    about = "Extract individual card images from Tabletop Simulator sprite sheets"
)]
struct Cli {
    /// Path to the root save file (JSON).
    manifest: PathBuf,

    /// Directory holding sprite_cache/, manifest_cache/ and cards/.
    #[arg(long, default_value = "data")]
    data_dir: String,

    /// Base URL that campaign and scenario references are resolved against.
    #[arg(long, default_value = DEFAULT_MANIFEST_BASE)]
    manifest_base: String,

    /// Output the run summary as structured JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false)]
    trace: bool,
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    // --json owns stdout; diagnostics move to stderr, uncoloured.
    let writer = if cli.json {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CARDCUT_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(writer)
        .with_ansi(!cli.json)
        .with_target(false)
        .without_time()
        .init();

    install_signal_handler();

    let data_dir = expand_tilde(&cli.data_dir);
    let remote = RemoteConfig::new(&cli.manifest_base);
    let result = commands::extract::run(&data_dir, &cli.manifest, remote, cli.json);

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("manifest error:") {
        EXIT_MANIFEST_ERROR
    } else if msg.starts_with("store error:") || msg.starts_with("store lock:") {
        EXIT_STORE_ERROR
    } else {
        EXIT_FAILURE
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
