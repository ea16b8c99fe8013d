//! Restfit CLI entry point.
//!
//! Composition root for standalone generation:
//!
//! 1. **Resolve configuration** from `restfit.toml` (or `--config`), with the
//!    directory flags taking precedence.
//! 2. **Wire logging** with `tracing-subscriber`; `RUST_LOG` applies unless
//!    `--verbose` or `logging = true` asks for debug output.
//! 3. **Run** `generate` or `check` through [`restfit_codegen::Builder`].

mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use restfit_codegen::config::CONFIG_FILE_NAME;
use restfit_codegen::{Builder, GeneratorConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::{Commands, GlobalOptions, RestfitCli};

fn main() -> Result<()> {
    let cli = RestfitCli::parse();
    let config = resolve_config(&cli.options)?;
    init_logging(cli.options.verbose || config.logging, cli.options.json);

    for line in execute(&cli.command, &config)? {
        println!("{line}");
    }
    Ok(())
}

fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Loads the configuration file and applies command line overrides.
fn resolve_config(options: &GlobalOptions) -> Result<GeneratorConfig> {
    let mut config = match &options.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => GeneratorConfig::load_or_default(Path::new(CONFIG_FILE_NAME))?,
    };
    if let Some(src_dir) = &options.src_dir {
        config.src_dir = src_dir.clone();
    }
    if let Some(out_dir) = &options.out_dir {
        config.out_dir = out_dir.clone();
    }
    Ok(config)
}

/// Runs `command`, returning the lines to print on success.
fn execute(command: &Commands, config: &GeneratorConfig) -> Result<Vec<String>> {
    if !config.enabled {
        tracing::info!("generation disabled by configuration");
        return Ok(Vec::new());
    }
    let builder = Builder::from_config(config);
    tracing::debug!(
        src = %builder.src().display(),
        out = %builder.out().display(),
        ?command,
        "running restfit"
    );
    match command {
        Commands::Generate => {
            let written = builder.generate()?;
            tracing::info!(files = written.len(), "generation finished");
            Ok(written.iter().map(|path| path.display().to_string()).collect())
        }
        Commands::Check => {
            let classes = builder.check()?;
            tracing::info!(interfaces = classes.len(), "check finished");
            Ok(classes
                .iter()
                .map(|class| {
                    format!(
                        "{} ({} functions)",
                        class.qualified_name(),
                        class.functions.len()
                    )
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("lib.rs"), "pub mod api;\n").unwrap();
        fs::write(
            src.join("api.rs"),
            r#"
#[restfit::api]
pub trait PingApi {
    #[get("ping")]
    async fn ping(&self) -> Option<String>;
}
"#,
        )
        .unwrap();
        dir
    }

    fn options_for(dir: &Path) -> GlobalOptions {
        GlobalOptions {
            src_dir: Some(dir.join("src")),
            out_dir: Some(dir.join("out")),
            ..GlobalOptions::default()
        }
    }

    #[test]
    fn generate_writes_and_lists_files() {
        let dir = project();
        let config = resolve_config(&options_for(dir.path())).unwrap();
        let lines = execute(&Commands::Generate, &config).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("_PingApiImpl.rs"));
        assert!(dir.path().join("out").join("api").join("_PingApiImpl.rs").exists());
    }

    #[test]
    fn check_lists_interfaces_only() {
        let dir = project();
        let config = resolve_config(&options_for(dir.path())).unwrap();
        let lines = execute(&Commands::Check, &config).unwrap();
        assert_eq!(lines, vec!["crate::api::PingApi (1 functions)".to_string()]);
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn flags_override_the_config_file() {
        let dir = project();
        let config_path = dir.path().join("restfit.toml");
        fs::write(&config_path, "[generator]\nenabled = false\nsrc_dir = \"elsewhere\"\n").unwrap();
        let options = GlobalOptions {
            config: Some(config_path),
            ..options_for(dir.path())
        };
        let config = resolve_config(&options).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.src_dir, dir.path().join("src"));
        assert!(execute(&Commands::Generate, &config).unwrap().is_empty());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = project();
        let options = GlobalOptions {
            config: Some(dir.path().join("missing.toml")),
            ..GlobalOptions::default()
        };
        let error = resolve_config(&options).unwrap_err();
        assert!(format!("{error:#}").contains("missing.toml"));
    }
}
