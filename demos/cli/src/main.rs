use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;

use graphvm::{bytecode::Function, graph::NodeGraph, nodes::NodeLibrary};

/// Node graph compiler
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,

    /// Input file, in the text graph format
    #[clap(short, long)]
    input: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Prints a listing of the compiled bytecode
    Disasm,

    /// Prints the graph in GraphViz format
    Dot,

    /// Writes the raw instruction words (native-endian)
    Bytes {
        /// Name of the file to write
        #[clap(short, long)]
        out: PathBuf,
    },

    /// Writes the compiled function (with return bindings) using `bincode`
    Bincode {
        /// Name of the file to write
        #[clap(short, long)]
        out: PathBuf,
    },

    /// Prints opcode names and values
    Ops,

    /// Prints the built-in node types
    Nodes,
}

fn load(args: &Args, lib: &NodeLibrary) -> Result<NodeGraph> {
    let Some(path) = &args.input else {
        bail!("this command requires an input file (--input)");
    };
    let now = Instant::now();
    let file = std::fs::File::open(path)?;
    let graph = NodeGraph::from_text(file, lib)?;
    info!("Loaded {} nodes in {:?}", graph.len(), now.elapsed());
    Ok(graph)
}

fn compile(graph: &NodeGraph) -> Result<Function> {
    let now = Instant::now();
    let f = graphvm::compile(graph)?;
    info!("Compiled {} words in {:?}", f.len(), now.elapsed());
    if f.stack_exhausted() {
        bail!("graph does not fit in the VM stack");
    }
    Ok(f)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();

    let args = Args::parse();
    let lib = NodeLibrary::builtin();

    match &args.cmd {
        Command::Disasm => {
            let f = compile(&load(&args, &lib)?)?;
            print!("{}", f.disassemble());
            for r in f.return_values() {
                println!("return {} ({}) = {}", r.name, r.typedesc, r.stack_offset);
            }
        }
        Command::Dot => {
            let g = load(&args, &lib)?;
            print!("{}", g.dot());
        }
        Command::Bytes { out } => {
            let f = compile(&load(&args, &lib)?)?;
            info!("Writing {} bytes to {out:?}", f.as_bytes().len());
            std::fs::File::create(out)?.write_all(f.as_bytes())?;
        }
        Command::Bincode { out } => {
            let f = compile(&load(&args, &lib)?)?;
            let data = bincode::serialize(&f)?;
            info!("Writing {} bytes to {out:?}", data.len());
            std::fs::File::create(out)?.write_all(&data)?;
        }
        Command::Ops => {
            for (name, value) in graphvm::bytecode::iter_ops() {
                println!("{value:>4} {name}");
            }
        }
        Command::Nodes => {
            for t in lib.iter() {
                let inputs: Vec<String> = t
                    .inputs()
                    .iter()
                    .map(|s| format!("{}: {}", s.name, s.typedesc))
                    .collect();
                let outputs: Vec<String> = t
                    .outputs()
                    .iter()
                    .map(|s| format!("{}: {}", s.name, s.typedesc))
                    .collect();
                println!(
                    "{} ({}) -> ({})",
                    t.name(),
                    inputs.join(", "),
                    outputs.join(", ")
                );
            }
        }
    }
    Ok(())
}
