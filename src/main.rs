use anyhow::{bail, Result};
use clap::Parser;
use keylayer_parser::cfg;
use keylayer_state_machine::*;
use log::info;
use simplelog::*;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, verbatim_doc_comment)]
/// keylayer: a layered keyboard remapper for Windows
///
/// keylayer intercepts key presses with a low-level keyboard hook and turns
/// taps, holds and double taps into other keys, layer changes, mouse actions
/// and macros, depending on the configuration for that key.
struct Args {
    // Display different platform specific paths based on the target OS
    #[cfg_attr(
        target_os = "windows",
        doc = r"Configuration file to use with keylayer. If not specified, defaults to
keylayer.json in the current working directory and
'C:\Users\user\AppData\Roaming\keylayer\keylayer.json'."
    )]
    #[cfg_attr(
        not(target_os = "windows"),
        doc = "Configuration file to use with keylayer. If not specified, defaults to
keylayer.json in the current working directory and
'$XDG_CONFIG_HOME/keylayer/keylayer.json'."
    )]
    #[arg(short, long, verbatim_doc_comment)]
    cfg: Option<PathBuf>,

    /// Port or full address (IP:PORT) to run the optional TCP server on. If blank,
    /// no TCP port will be listened on.
    #[cfg(feature = "tcp_server")]
    #[arg(
        short = 'p',
        long = "port",
        value_name = "PORT or IP:PORT",
        verbatim_doc_comment
    )]
    tcp_server_address: Option<SocketAddrWrapper>,

    /// Disable logging, except for errors. Takes precedent over debug and trace.
    #[arg(short, long)]
    quiet: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,

    /// Enable trace logging; implies --debug as well.
    #[arg(short, long)]
    trace: bool,

    /// Remove the startup delay.
    /// In some cases, removing the delay may cause keyboard issues on startup.
    #[arg(short, long, verbatim_doc_comment)]
    nodelay: bool,

    /// Validate configuration file and exit
    #[arg(long, verbatim_doc_comment)]
    check: bool,
}

/// Parse CLI arguments and initialize logging.
fn cli_init() -> Result<ValidatedArgs> {
    let args = Args::parse();

    let cfg_path = args.cfg.or_else(default_cfg);

    let log_lvl = match (args.quiet, args.debug, args.trace) {
        (true, _, _) => LevelFilter::Error,
        (_, _, true) => LevelFilter::Trace,
        (_, true, false) => LevelFilter::Debug,
        (false, false, false) => LevelFilter::Info,
    };

    let mut log_cfg = ConfigBuilder::new();
    if let Err(e) = log_cfg.set_time_offset_to_local() {
        eprintln!("WARNING: could not set log TZ to local: {e:?}");
    };
    log_cfg.set_time_format_rfc3339();
    CombinedLogger::init(vec![TermLogger::new(
        log_lvl,
        log_cfg.build(),
        TerminalMode::Mixed,
        ColorChoice::AlwaysAnsi,
    )])?;
    log::info!("keylayer v{} starting", env!("CARGO_PKG_VERSION"));
    #[cfg(target_os = "windows")]
    log::info!("using LLHOOK+SendInput for keyboard IO");

    let Some(cfg_path) = cfg_path else {
        bail!("No config file provided\nFor more info, pass the `-h` or `--help` flags.");
    };
    if !cfg_path.exists() {
        bail!(
            "Could not find the config file ({})\nFor more info, pass the `-h` or `--help` flags.",
            cfg_path.display()
        )
    }

    if args.check {
        log::info!("validating config only and exiting");
        let status = match cfg::new_from_file(&cfg_path) {
            // Loading already logged each warning.
            Ok(c) => {
                log::info!("config is valid, {} warning(s)", c.check().len());
                0
            }
            Err(e) => {
                log::error!("{e:?}");
                1
            }
        };
        std::process::exit(status);
    }

    Ok(ValidatedArgs {
        path: cfg_path,
        #[cfg(feature = "tcp_server")]
        tcp_server_address: args.tcp_server_address,
        nodelay: args.nodelay,
    })
}

fn main_impl() -> Result<()> {
    let args = cli_init()?;
    let engine_arc = RemapEngine::new_arc(&args)?;

    if !args.nodelay {
        info!("Sleeping for 2s. Please release all keys and don't press additional ones.");
        std::thread::sleep(std::time::Duration::from_secs(2));
    }

    #[cfg(feature = "tcp_server")]
    let address = args.tcp_server_address.map(SocketAddrWrapper::into_inner);
    #[cfg(not(feature = "tcp_server"))]
    let address: Option<std::net::SocketAddr> = None;

    if let Some(address) = address {
        let mut server = TcpServer::new(address);
        server.start(engine_arc.clone())?;
        let (ntx, nrx) = std::sync::mpsc::sync_channel(100);
        engine_arc.lock().set_notifier(Some(ntx));
        #[allow(clippy::unit_arg)]
        keylayer_state_machine::tcp_server::start_notification_loop(nrx, server.connections);
    }

    RemapEngine::event_loop(engine_arc)?;

    Ok(())
}

fn main() -> Result<()> {
    let ret = main_impl();
    if let Err(ref e) = ret {
        log::error!("{e}\n");
    }
    ret
}
