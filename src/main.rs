//! # Sentinel Review - Review Decision Engine
//!
//! Revisa un conjunto de archivos modificados con reglas por lenguaje,
//! agrupa los hallazgos por categoría y severidad y decide `APPROVE`,
//! `COMMENT` o `REQUEST_CHANGES`.
//!
//! Códigos de salida: 0 aprobar/comentar, 1 pedir cambios, 2 error del motor.

use clap::Parser;
use colored::*;
use commands::{Cli, Commands};

// Módulos
pub mod commands;
pub mod config;
pub mod errors;
pub mod files;
pub mod git;
pub mod language;
pub mod logging;
pub mod review;
pub mod rules;

const EXIT_ENGINE_ERROR: i32 = 2;

fn run(cli: Cli) -> anyhow::Result<i32> {
    let project_root = match config::ReviewConfig::find_project_root() {
        Some(root) => root,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Review(args) => commands::review::handle_review(args, &project_root, cli.quiet, cli.verbose),
        Commands::Rules { config } => {
            commands::rules::handle_rules_command(config.as_deref(), &project_root)?;
            Ok(0)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "la revisión falló");
            eprintln!("{} {:#}", "❌ Error:".red().bold(), e);
            EXIT_ENGINE_ERROR
        }
    };
    std::process::exit(code);
}
