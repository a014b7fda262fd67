use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use svnet_ast::Ast;
use tracing::info;

/// SVNET - SystemVerilog elaboration to netlist
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Elaborate a design into a netlist
    Elab {
        /// Elaborated AST file produced by the front end (JSON)
        input: PathBuf,

        /// Dump the AST before elaborating
        #[arg(long)]
        dump_ast: bool,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the elaborated AST of a design
    DumpAst {
        /// Elaborated AST file produced by the front end (JSON)
        input: PathBuf,
    },
}

fn load_ast(path: &Path) -> Result<Ast> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid elaborated AST", path.display()))
}

fn dump_ast(ast: &Ast) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(ast)?);
    Ok(())
}

fn elaborate(input: &Path, dump: bool, output: Option<&Path>, format: &str) -> Result<()> {
    let ast = load_ast(input)?;
    if dump {
        dump_ast(&ast)?;
    }

    info!("elaborating design `{}`", ast.name);
    let design = svnet_elab::elaborate(&ast)
        .with_context(|| format!("elaboration of `{}` failed", ast.name))?;
    info!("emitted {} modules", design.modules.len());

    let rendered = match format {
        "text" => svnet_netlist::emit_design(&design),
        "json" => serde_json::to_string_pretty(&design)?,
        other => anyhow::bail!("unknown output format `{other}` (expected `text` or `json`)"),
    };

    match output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt().with_env_filter(log_level).init();

    match cli.command {
        Commands::Elab {
            input,
            dump_ast: dump,
            output,
            format,
        } => {
            elaborate(&input, dump, output.as_deref(), &format)?;
        }

        Commands::DumpAst { input } => {
            let ast = load_ast(&input)?;
            dump_ast(&ast)?;
        }
    }

    Ok(())
}
