use anyhow::Context;
use cir::netlist::Netlister;
use cir::Library;
use clap::Parser as ClapParser;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use verilog::{NetlistOptions, Verilog};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    eprintln!("input file: {:?}", &args.file);
    match args.out {
        Some(ref out) => eprintln!("output: {:?}", out),
        None => eprintln!("output: stdout"),
    }
    cir2verilog(args)?;
    eprintln!("Netlist writing complete.");

    Ok(())
}

/// Arguments to [`cir2verilog`].
#[derive(ClapParser)]
#[command(
    version,
    about,
    long_about = "Convert a JSON-serialized CIR library to a structural Verilog netlist"
)]
pub struct Args {
    /// The path to the input JSON library.
    file: PathBuf,
    /// The path where the output Verilog file should be saved.
    ///
    /// The file and its parent directories will be created if necessary.
    /// If the file already exists, it will be overwritten.
    ///
    /// If unspecified, the output will be written to stdout.
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// A TOML file of netlist options.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Netlist even if the library fails validation.
    #[arg(long)]
    skip_validation: bool,
}

/// Convert the given CIR library to a Verilog netlist.
pub fn cir2verilog(args: Args) -> anyhow::Result<()> {
    let opts = match args.config {
        Some(ref path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {:?}.", path))?;
            toml::from_str::<NetlistOptions>(&text)
                .with_context(|| format!("Failed to parse config file {:?}.", path))?
        }
        None => NetlistOptions::default(),
    };
    tracing::debug!(?opts, "loaded netlist options");

    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read input file {:?}.", &args.file))?;
    let lib: Library =
        serde_json::from_str(&text).with_context(|| "Failed to parse input CIR library.")?;

    if !args.skip_validation {
        let issues = lib.validate();
        for item in issues.iter() {
            eprintln!("{item}");
        }
        if issues.has_error() {
            anyhow::bail!("One or more errors in library identified; aborting.")
        }
    }

    if let Some(path) = args.out {
        Verilog
            .write_netlist_to_file(&lib, &path, &opts)
            .with_context(|| format!("Failed to export Verilog netlist to {:?}.", path))?;
    } else {
        let mut stdout = io::stdout().lock();
        Verilog
            .write_netlist(&lib, &mut stdout, &opts)
            .with_context(|| "Failed to export Verilog netlist to stdout.")?;
    }

    Ok(())
}
