pub mod render;
pub mod review;
pub mod rules;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "sentinel-review")]
#[command(version, about = "Review decision engine: APPROVE, COMMENT or REQUEST_CHANGES for a change set", long_about = None)]
pub struct Cli {
    /// Solo la decisión, sin detalle de hallazgos
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Logs de depuración en stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Revisa archivos y decide APPROVE, COMMENT o REQUEST_CHANGES
    Review(ReviewArgs),
    /// Lista las reglas registradas
    Rules {
        /// Documento de configuración explícito
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct ReviewArgs {
    /// Archivos o carpetas a revisar (por defecto, la raíz del proyecto)
    pub paths: Vec<PathBuf>,

    /// Revisa solo los archivos modificados respecto a HEAD
    #[arg(long)]
    pub changed: bool,

    /// Formato de salida
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Documento de configuración explícito
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Nombre de la rama a validar
    #[arg(long)]
    pub branch: Option<String>,

    /// Mensaje de commit a validar (repetible)
    #[arg(long = "commit-msg")]
    pub commit_msgs: Vec<String>,

    /// Lee rama y commits pendientes desde git
    #[arg(long)]
    pub git: bool,

    /// Detiene el escaneo en el primer hallazgo crítico
    #[arg(long)]
    pub fail_fast: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Sarif,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Quiet,
    Normal,
    Verbose,
}

pub fn get_output_mode(quiet: bool, verbose: bool) -> OutputMode {
    if quiet {
        OutputMode::Quiet
    } else if verbose {
        OutputMode::Verbose
    } else {
        OutputMode::Normal
    }
}
