use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "restfit",
    version,
    about = "Restfit code generator",
    long_about = "Generates implementations for the restfit API traits of a crate."
)]
pub struct RestfitCli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub options: GlobalOptions,
}

#[derive(Args, Debug, Default, Clone)]
pub struct GlobalOptions {
    /// Configuration file (defaults to ./restfit.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Source directory to scan
    #[arg(long, global = true, value_name = "DIR")]
    pub src_dir: Option<PathBuf>,

    /// Directory receiving generated files
    #[arg(long, global = true, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Validate every API trait and write the generated implementations
    Generate,
    /// Validate every API trait without writing anything
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = RestfitCli::try_parse_from([
            "restfit",
            "generate",
            "--src-dir",
            "crate/src",
            "--out-dir",
            "gen",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.command, Commands::Generate);
        assert_eq!(cli.options.src_dir, Some(PathBuf::from("crate/src")));
        assert_eq!(cli.options.out_dir, Some(PathBuf::from("gen")));
        assert!(cli.options.verbose);
        assert!(cli.options.config.is_none());
    }

    #[test]
    fn a_subcommand_is_required() {
        assert!(RestfitCli::try_parse_from(["restfit"]).is_err());
    }
}
