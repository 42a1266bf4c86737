use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use spv_ir::{ModuleBuilder, spv};

#[derive(Parser)]
#[command(name = "spv-ir")]
#[command(about = "SPIR-V module validation and optimization")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the control flow of a SPIR-V binary.
    Val {
        #[arg(help = "Input SPIR-V binary")]
        input: PathBuf,
    },
    /// Run the constant optimization passes and write the result.
    Opt {
        #[arg(help = "Input SPIR-V binary")]
        input: PathBuf,

        #[arg(short, long, help = "Output SPIR-V binary")]
        output: PathBuf,

        #[arg(long, help = "Drop tombstoned instructions instead of emitting OpNop")]
        strip: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Val { input } => {
            let module = load(&input)?;
            spv_ir::cfg::validate_module(&module).context("validation failed")?;
            println!("{}: valid", input.display());
        }
        Commands::Opt {
            input,
            output,
            strip,
        } => {
            let mut module = load(&input)?;

            let unified = spv_ir::opt::unify_constants(&mut module).context("unify-constants")?;
            let eliminated = spv_ir::opt::eliminate_dead_constants(&mut module);
            let builder = ModuleBuilder::new(&module);
            builder.finalize(&mut module);

            let encoded = spv::words_to_bytes(&module.to_words(strip));
            fs::write(&output, &encoded)
                .with_context(|| format!("Failed to write output to {}", output.display()))?;
            println!(
                "Optimized {} -> {} ({} unified, {} eliminated, {} bytes)",
                input.display(),
                output.display(),
                unified,
                eliminated,
                encoded.len()
            );
        }
    }

    Ok(())
}

fn load(path: &PathBuf) -> Result<spv_ir::Module> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    spv_ir::build_module_from_bytes(&bytes)
        .with_context(|| format!("Failed to load {}", path.display()))
}
