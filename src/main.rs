mod config;
mod config_persistence;
mod console_shell;
mod debouncer;
mod media_file_discovery;
mod protocol;
mod queue_controller;
mod rename_formatter;
mod rename_service;
mod scrape_parser;
mod scrape_transport;
mod suggestion;
mod suggestion_service;

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    thread,
};

use config_persistence::{default_config_file, load_or_create_config};
use log::{info, warn};
use media_file_discovery::collect_audio_files_from_paths;
use protocol::{Message, QueueMessage};
use queue_controller::QueueController;
use rename_service::{FsRenamer, RenameService};
use scrape_transport::CommandTransport;
use suggestion_service::SuggestionService;
use tokio::sync::broadcast;

const USAGE: &str = "usage: camelot-renamer [--config PATH] [FILE_OR_FOLDER...]";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config_file: Option<PathBuf>,
    paths: Vec<PathBuf>,
}

fn parse_cli_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| format!("--config needs a path\n{USAGE}"))?;
                parsed.config_file = Some(PathBuf::from(path));
            }
            "--help" | "-h" => return Err(USAGE.to_string()),
            _ => parsed.paths.push(PathBuf::from(arg)),
        }
    }
    Ok(parsed)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Trace);
    clog.init();
    log::set_max_level(log::LevelFilter::Info);

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let cli_args = parse_cli_args(std::env::args().skip(1))?;
    let config_file = cli_args
        .config_file
        .or_else(default_config_file)
        .ok_or("No config directory available; pass --config PATH")?;
    let config = load_or_create_config(&config_file)?;
    log::set_max_level(config.logging.level.level_filter());
    info!("Loaded config from {}", config_file.display());

    if config.search.command.is_empty() {
        warn!("No search command configured in [search] command; every lookup will fail");
    }

    // Bus for communication between components
    let (bus_sender, _) = broadcast::channel(1024);

    // Subscribe before anything is published so the initial files are not missed
    let mut queue_controller =
        QueueController::new(bus_sender.subscribe(), bus_sender.clone(), &config);

    // Setup suggestion service
    let suggestion_bus_receiver = bus_sender.subscribe();
    let suggestion_bus_sender = bus_sender.clone();
    let transport = CommandTransport::new(
        config.search.command.clone(),
        config.search.fetch_timeout(),
    );
    thread::Builder::new()
        .name("suggestion-service".to_string())
        .spawn(move || {
            let mut suggestion_service =
                SuggestionService::new(suggestion_bus_receiver, suggestion_bus_sender, transport);
            suggestion_service.run();
        })?;

    // Setup rename service
    let rename_bus_receiver = bus_sender.subscribe();
    let rename_bus_sender = bus_sender.clone();
    thread::Builder::new()
        .name("rename-service".to_string())
        .spawn(move || {
            let mut rename_service =
                RenameService::new(rename_bus_receiver, rename_bus_sender, FsRenamer);
            rename_service.run();
        })?;

    // Setup console shell
    let latest_snapshot = Arc::new(Mutex::new(None));
    console_shell::spawn_renderer(&bus_sender, Arc::clone(&latest_snapshot));
    let shell_bus_sender = bus_sender.clone();
    thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            console_shell::run_stdin_commands(&shell_bus_sender, &latest_snapshot);
        })?;

    let initial_files = collect_audio_files_from_paths(&cli_args.paths);
    if !initial_files.is_empty() {
        info!("Queueing {} files from the command line", initial_files.len());
        let _ = bus_sender.send(Message::Queue(QueueMessage::AddFiles(initial_files)));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(queue_controller.run());

    info!("Application exiting");
    Ok(())
}
