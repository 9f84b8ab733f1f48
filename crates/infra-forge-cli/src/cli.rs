use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Compiler for a declarative infrastructure DSL.
///
/// infra-forge compiles `.infra` source files into deployment template JSON
/// and decompiles existing templates back into readable source.
#[derive(Parser)]
#[command(
    name = "infra-forge",
    version,
    about = "Compiler and decompiler for a declarative infrastructure DSL",
    after_help = "Use 'infra-forge <command> --help' for more information about a command.",
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Global options available to all subcommands.
#[derive(Args, Debug, Default)]
pub struct GlobalOpts {
    /// Configuration file path [env: INFRA_FORGE_CONFIG]
    #[arg(
        short = 'c',
        long = "config",
        global = true,
        env = "INFRA_FORGE_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// Output format: human (default), rich, json, plain
    #[arg(
        long,
        global = true,
        value_parser = ["human", "rich", "json", "plain"]
    )]
    pub format: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all non-error output
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output [env: NO_COLOR]
    #[arg(long = "no-color", global = true, env = "NO_COLOR")]
    pub no_color: bool,
}

/// Top-level subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Compile .infra files into template JSON
    Build(BuildArgs),

    /// Decompile template JSON files into .infra source
    ///
    /// An existing <file>.infra is never overwritten unless --force is given;
    /// such files are reported as failed and left untouched.
    Decompile(DecompileArgs),

    /// Parse and bind .infra files, reporting diagnostics only
    Check(CheckArgs),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

/// Arguments for `infra-forge build`.
#[derive(Args)]
pub struct BuildArgs {
    /// Source files to compile
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Write documents to stdout instead of <file>.json
    #[arg(long = "stdout")]
    pub stdout: bool,

    /// Directory for emitted documents (default: next to each source file)
    #[arg(short = 'o', long = "out-dir")]
    pub out_dir: Option<PathBuf>,
}

/// Arguments for `infra-forge decompile`.
#[derive(Args)]
pub struct DecompileArgs {
    /// Template JSON files to decompile
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Write source to stdout instead of <file>.infra
    #[arg(long = "stdout")]
    pub stdout: bool,

    /// Overwrite existing .infra files instead of refusing to decompile
    #[arg(short = 'f', long = "force")]
    pub force: bool,
}

/// Arguments for `infra-forge check`.
#[derive(Args)]
pub struct CheckArgs {
    /// Source files to check
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Arguments for `infra-forge completions`.
#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_parser = ["bash", "zsh", "fish", "powershell", "elvish"])]
    pub shell: String,
}
