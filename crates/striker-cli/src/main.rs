//! `striker` – decision core of the robot soccer team.
//!
//! 1. Initialises tracing and loads `~/.striker/config.toml` (written with
//!    defaults on first run) plus `STRIKER_*` overrides.
//! 2. Binds the vision and referee sockets, or opens a match log for
//!    replay, and the radio command socket.  A bind failure is fatal.
//! 3. Runs the ingestion channels, the tick scheduler, the outbound task and
//!    the optional WebSocket world feed until **Ctrl-C**.

mod config;

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use colored::Colorize;
use striker_middleware::bus::forward;
use striker_middleware::channel::bind;
use striker_middleware::log_file::replay;
use striker_middleware::{
    EventBus, IngestOptions, LogReader, PacketKind, Topic, UdpChannel, UdpCommandSink, WorldFeed,
};
use striker_runtime::{
    init_tracing, transmit, DispatchConfig, Dispatcher, EngineConfig, StrategyEngine, TickScheduler,
};
use striker_types::StrikerError;
use striker_world::{World, WorldConfig};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let _guard = init_tracing("striker");
    print_banner();

    if !config::config_path().exists() {
        match config::save(&config::Config::default()) {
            Ok(()) => println!(
                "  {} Default config written to {}",
                "✓".green().bold(),
                config::config_path().display().to_string().bold()
            ),
            Err(e) => println!("  {}: {}", "Could not write default config".yellow(), e),
        }
    }
    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            println!("  {}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };
    print_summary(&cfg);

    // ── Shutdown signal ───────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let handler_tx = Arc::clone(&shutdown_tx);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping …".yellow().bold());
        let _ = handler_tx.send(true);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; stop the process with a signal instead");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "cannot start the async runtime");
            return ExitCode::FAILURE;
        }
    };
    let result = runtime.block_on(run(cfg, shutdown_rx));
    drop(shutdown_tx);

    match result {
        Ok(()) => {
            println!("{}", "  ✓ Striker stopped.".green());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "fatal startup error");
            println!("{}: {}", "Fatal".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wiring
// ─────────────────────────────────────────────────────────────────────────────

async fn run(cfg: config::Config, shutdown: watch::Receiver<bool>) -> Result<(), StrikerError> {
    let world = Arc::new(World::new(WorldConfig::default()));
    world.set_ally(cfg.ally_color);
    world.set_ally_plays_west(cfg.ally_plays_west);
    let bus = EventBus::default();
    let options = IngestOptions {
        min_confidence: cfg.min_confidence,
    };
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    tasks.push(tokio::spawn(forward(
        world.subscribe(),
        bus.clone(),
        Topic::World,
        shutdown.clone(),
    )));

    // ── Inputs ────────────────────────────────────────────────────────────
    if let Some(path) = &cfg.log_file {
        let reader = LogReader::open(path)?;
        info!(path = %path.display(), speed = cfg.replay_speed, "replaying match log");
        let (world, rx, speed) = (Arc::clone(&world), shutdown.clone(), cfg.replay_speed);
        tasks.push(tokio::spawn(async move {
            let stats = replay(reader, world, options, speed, rx).await;
            info!(records = stats.records, applied = stats.applied, dropped = stats.dropped, "replay finished");
        }));
    } else {
        for (kind, addr) in [(PacketKind::Vision, cfg.vision_addr), (PacketKind::Referee, cfg.referee_addr)] {
            let socket = bind(addr)
                .await
                .map_err(|e| StrikerError::Io(format!("cannot bind {} socket on {addr}: {e}", kind.name())))?;
            let channel = UdpChannel::new(kind, socket, Arc::clone(&world), options);
            let rx = shutdown.clone();
            tasks.push(tokio::spawn(async move {
                channel.run(rx).await;
            }));
        }
    }

    // ── Outbound ──────────────────────────────────────────────────────────
    let sink = UdpCommandSink::connect(cfg.command_addr).await?;
    let dispatch_config = DispatchConfig {
        stale_after: cfg.stale_after,
        ..DispatchConfig::default()
    };
    let (frames_tx, frames_rx) = mpsc::channel(dispatch_config.queue_capacity.max(1));
    let outbound = tokio::spawn(transmit(frames_rx, Arc::new(sink), bus.clone()));

    // ── World feed ────────────────────────────────────────────────────────
    if let Some(port) = cfg.feed_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| StrikerError::Io(format!("cannot bind world feed on {addr}: {e}")))?;
        let feed = WorldFeed::new(bus.clone(), Arc::clone(&world), Duration::from_millis(cfg.feed_snapshot_ms));
        tasks.push(tokio::spawn(feed.serve(listener, shutdown.clone())));
    }

    // ── Decision loop ─────────────────────────────────────────────────────
    let scheduler = TickScheduler::new(cfg.tick_hz)?;
    let engine = StrategyEngine::new(EngineConfig {
        keeper_id: cfg.keeper_id,
    });
    let dispatcher = Arc::new(Mutex::new(Dispatcher::new(
        Arc::clone(&world),
        engine,
        bus.clone(),
        frames_tx,
        dispatch_config,
    )));
    let ticking = Arc::clone(&dispatcher);
    println!("  {} Running. Press {} to stop.\n", "▶".green().bold(), "Ctrl-C".bold());
    scheduler
        .run(
            move || {
                ticking.lock().unwrap_or_else(PoisonError::into_inner).tick();
            },
            shutdown,
        )
        .await;

    let stats = dispatcher.lock().unwrap_or_else(PoisonError::into_inner).stats();
    info!(
        ticks = stats.ticks,
        commands = stats.commands,
        stops = stats.stops,
        dropped = stats.dropped,
        "dispatcher stopped"
    );
    // Last sender gone: the outbound task drains and ends.
    drop(dispatcher);
    if let Err(e) = outbound.await {
        warn!(error = %e, "outbound task failed");
    }
    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "task failed");
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   _____ __       _ __             "#.bold().cyan());
    println!("{}", r#"  / ___// /______(_) /_____  _____ "#.bold().cyan());
    println!("{}", r#"  \__ \/ __/ ___/ / //_/ _ \/ ___/ "#.bold().cyan());
    println!("{}", r#" ___/ / /_/ /  / / ,< /  __/ /     "#.bold().cyan());
    println!("{}", r#"/____/\__/_/  /_/_/|_|\___/_/      "#.bold().cyan());
    println!();
    println!("  {} {}", "Striker".bold(), format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    println!("  Small-size robot soccer decision core");
    println!();
}

fn print_summary(cfg: &config::Config) {
    println!("  Team      {} ({})", cfg.ally_color.to_string().bold(), if cfg.ally_plays_west { "west" } else { "east" });
    match &cfg.log_file {
        Some(path) => println!("  Input     log {} at {}x", path.display().to_string().bold(), cfg.replay_speed),
        None => println!("  Input     vision {} · referee {}", cfg.vision_addr, cfg.referee_addr),
    }
    println!("  Commands  {} at {} Hz", cfg.command_addr, cfg.tick_hz);
    if let Some(port) = cfg.feed_port {
        println!("  Feed      ws://0.0.0.0:{port}");
    }
    println!();
}
