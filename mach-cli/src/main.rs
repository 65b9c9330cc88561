//! Thin demonstration binary: argv -> [`mach_driver::BuildOptions`] -> the
//! driver pipeline. No backend is wired in, so `compile` stops at the
//! resolved, type-checked module graph (plus whatever `--emit-ast` writes);
//! it never produces an executable.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mach_driver::{compile, Architecture, BuildOptions, Platform, Target};

#[derive(Parser)]
#[command(name = "mach")]
#[command(version = "0.2.0")]
#[command(about = "Mach language compiler front/middle-end", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct TargetArgs {
    /// Target platform: windows, linux, macos. Defaults to the host platform.
    #[arg(long)]
    platform: Option<String>,

    /// Target architecture: x86, x64, arm, arm64. Defaults to the host architecture.
    #[arg(long)]
    arch: Option<String>,
}

impl TargetArgs {
    fn resolve(&self) -> Result<Target> {
        let platform = match &self.platform {
            Some(name) => {
                let platform = Platform::from_str(name);
                if !platform.is_valid() {
                    anyhow::bail!("unknown platform: {name}");
                }
                platform
            }
            None => Platform::current(),
        };
        let architecture = match &self.arch {
            Some(name) => {
                let architecture = Architecture::from_str(name);
                if !architecture.is_valid() {
                    anyhow::bail!("unknown architecture: {name}");
                }
                architecture
            }
            None => Architecture::current(),
        };
        Ok(Target::new(platform, architecture))
    }
}

#[derive(clap::Args)]
struct ModuleGraphArgs {
    /// Additional directory to search for `use`d modules
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// `name:directory` alias, e.g. `std:./vendor/std`, usable as an alias prefix in a `use` path
    #[arg(long = "alias", value_name = "NAME:DIR")]
    alias: Vec<String>,
}

impl ModuleGraphArgs {
    fn apply(&self, options: &mut BuildOptions) -> Result<()> {
        for path in &self.include {
            options.add_include_path(path.clone());
        }
        for raw in &self.alias {
            let (name, dir) = raw
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("alias must be `name:directory`, got `{raw}`"))?;
            options.add_alias(name, PathBuf::from(dir));
        }
        Ok(())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over a source file and report what it produced
    Compile {
        /// Entry .mach file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output artifact path (defaults to the input file's stem)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Optimization level, 0-3 (clamped; no backend consumes this yet)
        #[arg(short = 'O', long, default_value_t = 0)]
        opt_level: u8,

        /// Write the resolved AST of every module as JSON next to the output
        #[arg(long)]
        emit_ast: bool,

        #[command(flatten)]
        module_graph: ModuleGraphArgs,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Run the pipeline and only report diagnostics, producing no artifacts
    Check {
        /// Entry .mach file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[command(flatten)]
        module_graph: ModuleGraphArgs,

        #[command(flatten)]
        target: TargetArgs,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            input,
            output,
            opt_level,
            emit_ast,
            module_graph,
            target,
        } => {
            let target = target.resolve()?;
            log::info!("compiling {} for {target}", input.display());

            let mut options = BuildOptions::new(input);
            options.output_file = output;
            options.set_opt_level(opt_level);
            options.emit_ast = emit_ast;
            module_graph.apply(&mut options)?;

            let outcome = compile(&options, target)?;
            outcome.print_report();
            mach_driver::emit_artifacts(&outcome, &options)?;

            if !outcome.succeeded {
                anyhow::bail!("compilation failed");
            }
            println!("resolved {} module(s), no backend wired in", outcome.modules.modules().count());
            Ok(())
        }

        Commands::Check { input, module_graph, target } => {
            let target = target.resolve()?;
            log::info!("checking {} for {target}", input.display());

            let mut options = BuildOptions::new(input);
            module_graph.apply(&mut options)?;

            let outcome = compile(&options, target)?;
            outcome.print_report();

            if !outcome.succeeded {
                anyhow::bail!("check failed");
            }
            println!("ok");
            Ok(())
        }
    }
}
