//! `plist` CLI: inspect, edit and convert property-list files.
//!
//! ## Usage
//!
//! ```sh
//! # Which encoding is this file in?
//! plist probe -i Info.plist
//!
//! # Browse the tree, or dump it as JSON
//! plist show -i Info.plist
//! plist show --json -i Info.plist
//!
//! # Read and edit single values by path
//! plist get -i Info.plist CFBundleVersion
//! plist set -i Info.plist -o Info.plist CFBundleVersion 42
//! plist rename -i Info.plist "Old Name" "New Name"
//! plist delete -i Info.plist "Installed Extensions/0"
//! plist add -i Info.plist --type boolean ""
//!
//! # Re-encode (binary and JSON go through plutil)
//! plist convert -i Info.plist --to binary -o Info.bplist
//! ```
//!
//! Edits are written back in the format the input was read in.

mod plutil;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use plist_core::{load, save, Container, Format, NodeId, Plist, ValueType};
use plutil::Plutil;
use std::io::{self, Read, Write};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "plist", version, about = "Property-list inspector and editor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Conversion tool used for binary and JSON plists
    #[arg(long, global = true, env = "PLIST_PLUTIL", default_value = "plutil")]
    plutil: String,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// No log output at all
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the detected storage format (xml, binary, json or other)
    Probe {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Print the value tree
    Show {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Print JSON instead of the indented tree
        #[arg(long)]
        json: bool,
    },
    /// Re-encode a plist
    Convert {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Target format
        #[arg(long, value_enum, default_value_t = Target::Xml)]
        to: Target,
    },
    /// Print one value by path
    Get {
        /// `/`-separated keys and array indices; empty for the root
        path: String,
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Print the value as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace a primitive value from its text form
    Set {
        path: String,
        value: String,
        #[arg(short, long)]
        input: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Rename a dictionary key
    Rename {
        path: String,
        new_name: String,
        #[arg(short, long)]
        input: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Remove a value
    Delete {
        path: String,
        #[arg(short, long)]
        input: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Insert a new default value as the first child of an array or dictionary
    Add {
        /// Path of the parent array or dictionary
        parent: String,
        /// Kind of value to create
        #[arg(long = "type", value_enum)]
        kind: Kind,
        /// Initial content, in the value's text form
        #[arg(long)]
        value: Option<String>,
        #[arg(short, long)]
        input: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Xml,
    Binary,
    Json,
}

impl From<Target> for Format {
    fn from(target: Target) -> Self {
        match target {
            Target::Xml => Format::Xml,
            Target::Binary => Format::LegacyBinary,
            Target::Json => Format::Json,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Array,
    Boolean,
    Data,
    Date,
    Dictionary,
    Integer,
    Real,
    String,
}

impl From<Kind> for ValueType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Array => ValueType::Array,
            Kind::Boolean => ValueType::Boolean,
            Kind::Data => ValueType::Data,
            Kind::Date => ValueType::Date,
            Kind::Dictionary => ValueType::Dictionary,
            Kind::Integer => ValueType::Integer,
            Kind::Real => ValueType::Real,
            Kind::String => ValueType::String,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let converter = Plutil::new(&cli.plutil);

    match cli.command {
        Commands::Probe { input } => {
            let bytes = read_input(input.as_deref())?;
            let format = plist_core::detect_format(&bytes);
            write_output(None, format!("{format}\n").as_bytes())?;
        }
        Commands::Show { input, json } => {
            let plist = load_plist(input.as_deref(), &converter)?;
            let text = if json {
                serde_json::to_string_pretty(&plist.root_value().to_json())? + "\n"
            } else {
                render_tree(&plist)
            };
            write_output(None, text.as_bytes())?;
        }
        Commands::Convert { input, output, to } => {
            let mut plist = load_plist(input.as_deref(), &converter)?;
            plist.set_format(to.into());
            save_plist(&plist, output.as_deref(), &converter)?;
        }
        Commands::Get { path, input, json } => {
            let plist = load_plist(input.as_deref(), &converter)?;
            let node = resolve(&plist, &path)?;
            let text = if json {
                let value = plist
                    .to_value(node)
                    .ok_or_else(|| anyhow!("No value at path '{path}'"))?;
                serde_json::to_string_pretty(&value.to_json())?
            } else {
                plist.as_string(node).unwrap_or_default()
            };
            write_output(None, format!("{text}\n").as_bytes())?;
        }
        Commands::Set {
            path,
            value,
            input,
            output,
        } => {
            let mut plist = load_plist(input.as_deref(), &converter)?;
            let node = resolve(&plist, &path)?;
            plist
                .set_from_string(node, &value)
                .with_context(|| format!("Failed to set '{path}'"))?;
            save_plist(&plist, output.as_deref(), &converter)?;
        }
        Commands::Rename {
            path,
            new_name,
            input,
            output,
        } => {
            let mut plist = load_plist(input.as_deref(), &converter)?;
            let node = resolve(&plist, &path)?;
            let (dict, old_name) = match (plist.parent(node), plist.key_of(node)) {
                (Some(dict), Some(key)) => (dict, key.to_string()),
                _ => bail!("'{path}' is not a dictionary entry"),
            };
            if !plist.rename_entry(dict, &old_name, &new_name) {
                bail!("Cannot rename '{old_name}' to '{new_name}': name unchanged or already in use");
            }
            save_plist(&plist, output.as_deref(), &converter)?;
        }
        Commands::Delete {
            path,
            input,
            output,
        } => {
            let mut plist = load_plist(input.as_deref(), &converter)?;
            let node = resolve(&plist, &path)?;
            let deleted = match plist.container_of(node) {
                Some(Container::Node(parent)) => plist.delete_entry(parent, node),
                _ => false,
            };
            if !deleted {
                bail!("Cannot delete '{path}': the root value cannot be removed");
            }
            save_plist(&plist, output.as_deref(), &converter)?;
        }
        Commands::Add {
            parent,
            kind,
            value,
            input,
            output,
        } => {
            let mut plist = load_plist(input.as_deref(), &converter)?;
            let container = resolve(&plist, &parent)?;
            let kind = ValueType::from(kind);
            let child = plist
                .insert_first_child(container, kind.default_value())
                .ok_or_else(|| anyhow!("'{parent}' is not an array or dictionary"))?;
            if let Some(text) = value {
                plist
                    .set_from_string(child, &text)
                    .with_context(|| format!("Failed to set new {kind} value"))?;
            }
            info!(%kind, key = plist.key_of(child).unwrap_or_default(), "added value");
            save_plist(&plist, output.as_deref(), &converter)?;
        }
    }

    Ok(())
}

/// Install a stderr log subscriber. Default level is `warn`.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::OFF
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn load_plist(input: Option<&str>, converter: &Plutil) -> Result<Plist> {
    let bytes = read_input(input)?;
    let plist = load(&bytes, converter).context("Failed to load plist")?;
    debug!(format = %plist.format(), nodes = plist.node_count(), "loaded plist");
    Ok(plist)
}

fn save_plist(plist: &Plist, output: Option<&str>, converter: &Plutil) -> Result<()> {
    let bytes = save(plist, converter).context("Failed to save plist")?;
    write_output(output, &bytes)
}

fn resolve(plist: &Plist, path: &str) -> Result<NodeId> {
    plist
        .find(path)
        .ok_or_else(|| anyhow!("No value at path '{path}'"))
}

/// One line per node: indentation, name, type and display text.
fn render_tree(plist: &Plist) -> String {
    let mut out = String::new();
    let mut pending: Vec<(usize, String, NodeId)> = plist
        .elements(Container::Root)
        .unwrap_or_default()
        .into_iter()
        .map(|entry| (0, entry.name().unwrap_or_default().to_string(), *entry.value()))
        .collect();
    while let Some((depth, name, node)) = pending.pop() {
        let kind = plist.value_type(node).map(|t| t.name()).unwrap_or_default();
        let text = plist.as_string(node).unwrap_or_default();
        out.push_str(&format!("{}{name}  {kind}  {text}\n", "  ".repeat(depth)));
        if let Some(children) = plist.elements(node) {
            for entry in children.into_iter().rev() {
                pending.push((
                    depth + 1,
                    entry.name().unwrap_or_default().to_string(),
                    *entry.value(),
                ));
            }
        }
    }
    out
}

fn read_input(path: Option<&str>) -> Result<Vec<u8>> {
    match path {
        Some(path) => std::fs::read(path).with_context(|| format!("Failed to read file: {}", path)),
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content).context("Failed to write to stdout")?;
            stdout.flush().context("Failed to write to stdout")?;
        }
    }
    Ok(())
}
