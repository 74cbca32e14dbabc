use anyhow::{bail, Result};
use clap::Parser;
use keylayer_state_machine::{sim::run_sim, *};
use simplelog::{format_description, *};
use std::path::PathBuf;

pub fn default_sim() -> Vec<PathBuf> {
    let mut sims = Vec::new();

    let default = PathBuf::from("test/sim.txt");
    if default.is_file() {
        sims.push(default);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let fallback = config_dir.join("keylayer").join("test").join("sim.txt");
        if fallback.is_file() {
            sims.push(fallback);
        }
    }

    sims
}

#[derive(Parser, Debug)]
#[command(author, version, verbatim_doc_comment)]
/// keylayer_simulated_input: a cli tool that helps debug a keylayer configuration by:
/// - reading a text file with a sequence of key events, including key delays
/// - interpreting them with keylayer
/// - printing out which key/mouse events keylayer would send if the keys were
///   pressed by a user
/// - (optionally) saving the result to a file for reference
struct Args {
    /// Configuration file to use. If not specified, defaults to keylayer.json in
    /// the current working directory and the keylayer folder of the user's
    /// configuration directory.
    #[arg(short, long, verbatim_doc_comment)]
    cfg: Option<PathBuf>,

    /// Simulation file(s). If not specified, defaults to test/sim.txt in the
    /// current working directory and keylayer/test/sim.txt in the user's
    /// configuration directory.
    #[arg(short = 's', long, verbatim_doc_comment)]
    sim: Option<Vec<PathBuf>>,

    /// Save output to the simulation file's path with its name appended by the value of this argument.
    #[arg(short = 'o', long, verbatim_doc_comment)]
    out: Option<String>,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,
}

fn log_init(debug: bool) -> Result<()> {
    let mut log_cfg = ConfigBuilder::new();
    if let Err(e) = log_cfg.set_time_offset_to_local() {
        eprintln!("WARNING: could not set log TZ to local: {e:?}");
    };
    log_cfg.set_time_format_custom(format_description!(
        version = 2,
        "[hour]:[minute]:[second].[subsecond digits:4]"
    ));
    CombinedLogger::init(vec![TermLogger::new(
        if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        },
        log_cfg.build(),
        TerminalMode::Stderr,
        ColorChoice::AlwaysAnsi,
    )])?;
    Ok(())
}

fn main_impl() -> Result<()> {
    let args = Args::parse();
    log_init(args.debug)?;
    log::info!(
        "keylayer_simulated_input v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let Some(cfg_path) = args.cfg.or_else(default_cfg) else {
        bail!("No config file provided\nFor more info, pass the `-h` or `--help` flags.");
    };
    if !cfg_path.exists() {
        bail!(
            "Could not find the config file ({})\nFor more info, pass the `-h` or `--help` flags.",
            cfg_path.display()
        )
    }
    let sim_paths = args.sim.unwrap_or_else(default_sim);
    if sim_paths.is_empty() {
        bail!("No simulation files provided\nFor more info, pass the `-h` or `--help` flags.");
    }
    let cfg_text = std::fs::read_to_string(&cfg_path)?;

    for sim_file in &sim_paths {
        // A fresh engine per file, and no store: simulations never write the configuration.
        let mut k = RemapEngine::new_from_str(&cfg_text)?;
        log::info!("Evaluating simulation file = {}", sim_file.display());
        let script = std::fs::read_to_string(sim_file)?;
        run_sim(&mut k, &script)?;
        let result = k.sender.kbd_out.outputs.events.join("\n");
        println!("{result}");
        if let Some(appendix) = &args.out {
            let mut out_name = sim_file.as_os_str().to_owned();
            out_name.push(appendix);
            std::fs::write(&out_name, format!("{result}\n"))?;
            log::info!("saved output to {}", PathBuf::from(out_name).display());
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let ret = main_impl();
    if let Err(ref e) = ret {
        log::error!("{e}\n");
    }
    ret
}
