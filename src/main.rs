use anyhow::{Result, anyhow, bail};
use avsp_menu::config::{DEFAULT_CONFIG_FILE, load_config, load_config_or_default};
use avsp_menu::{Document, Invocation, MacroHost, MenuNode, MenuTree, scan};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

/// List and run AvsPmod macros from a macros directory
#[derive(Parser, Debug)]
#[command(name = "avsp-menu", version, about)]
struct Args {
    /// Config file (defaults to avsp-menu.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Macros directory (overrides macros_dir from the config)
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Print the macros menu (default)
    List,

    /// Print the macros menu as JSON
    Json,

    /// Print the script behind a menu entry
    Find {
        /// Menu path, e.g. "Encode/Encode with x264"
        path: String,
    },

    /// Run a macro against an Avisynth script
    Run {
        /// Menu path of the macro
        path: String,

        /// Script to open as the active document
        #[arg(short, long)]
        script: Option<PathBuf>,
    },
}

/// Split "Encode/With x264" into menu titles
fn menu_path(path: &str) -> Vec<&str> {
    path.split('/')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    init_logging();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_config_or_default(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    let root = args.dir.clone().unwrap_or_else(|| config.macros_dir.clone());

    let tree = scan(&root, &config.naming)?;
    for warning in &tree.warnings {
        eprintln!("warning: {}: {}", warning.path.display(), warning.message);
    }

    match args.command.unwrap_or(Command::List) {
        Command::List => print!("{}", tree.render()),
        Command::Json => println!("{}", tree.to_json()?),
        Command::Find { path } => {
            let entry = find_entry(&tree, &path)?;
            println!("{}", tree.script_path(entry).display());
        }
        Command::Run { path, script } => {
            let entry = find_entry(&tree, &path)?;
            let mut doc = match script {
                Some(path) => Document::open(path)?,
                None => Document::default(),
            };

            let host = MacroHost::from_config(&config);
            match host.invoke(entry, &tree.root, &mut doc) {
                Invocation::Completed => {
                    if doc.is_modified() && doc.path().is_some() {
                        doc.save()?;
                    }
                    log::info!("Macro '{}' finished", entry.display_name);
                }
                Invocation::NotInvocable => bail!("'{}' is a separator", path),
                Invocation::Failed(message) => {
                    bail!("Macro '{}' failed: {}", entry.display_name, message)
                }
            }
        }
    }

    Ok(())
}

fn find_entry<'a>(tree: &'a MenuTree, path: &str) -> Result<&'a avsp_menu::MacroEntry> {
    match tree.find_by_path(&menu_path(path)) {
        Some(MenuNode::Entry(entry)) => Ok(entry),
        Some(MenuNode::Submenu(_)) => Err(anyhow!("'{}' is a submenu, not a macro", path)),
        None => Err(anyhow!("No macro at '{}'", path)),
    }
}

/// Initialize logging to stderr
///
/// Defaults to warnings only; set RUST_LOG=debug to trace scanning.
fn init_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:5}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
}
