//! Módulo de metadatos Git para el CLI
//!
//! Rama actual, commits pendientes de integrar y archivos modificados. El
//! motor no ejecuta git: recibe estos datos ya resueltos.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::rules::{CommitInfo, CommitMetadata};

/// Separadores de registro y campo para `git log` (ASCII US / RS).
const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

/// Ejecuta git en `project_path` y devuelve stdout si terminó bien.
fn git(project_path: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(project_path)
        .output()
        .ok()?;
    if !output.status.success() {
        tracing::debug!(?args, status = ?output.status, "git terminó con error");
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Nombre de la rama actual; `None` fuera de un repo o en HEAD separado.
pub fn obtener_rama_actual(project_path: &Path) -> Option<String> {
    let rama = git(project_path, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    let rama = rama.trim();
    if rama.is_empty() || rama == "HEAD" {
        None
    } else {
        Some(rama.to_string())
    }
}

/// Interpreta la salida de `git log --format=%H%x1f%B%x1e`.
pub fn parsear_log(salida: &str) -> Vec<CommitInfo> {
    salida
        .split(RECORD_SEP)
        .filter_map(|registro| {
            let (id, mensaje) = registro.trim_start().split_once(FIELD_SEP)?;
            let id = id.trim();
            if id.is_empty() {
                return None;
            }
            Some(CommitInfo {
                id: id.to_string(),
                message: mensaje.trim().to_string(),
            })
        })
        .collect()
}

/// Commits por delante del upstream; sin upstream, solo el último commit.
pub fn obtener_commits_pendientes(project_path: &Path) -> Vec<CommitInfo> {
    let formato = "--format=%H%x1f%B%x1e";
    let salida = git(project_path, &["log", formato, "@{upstream}..HEAD"])
        .or_else(|| git(project_path, &["log", formato, "-1"]));
    salida.map(|s| parsear_log(&s)).unwrap_or_default()
}

/// Rama y commits pendientes como metadatos para las reglas de alcance commit.
pub fn recolectar_metadatos(project_path: &Path) -> CommitMetadata {
    CommitMetadata {
        branch: obtener_rama_actual(project_path),
        commits: obtener_commits_pendientes(project_path),
    }
}

/// Archivos modificados respecto a HEAD (`git diff --name-only HEAD`) que aún existen.
/// Devuelve un Vec vacío si no es un repo git o git no está disponible.
pub fn obtener_archivos_modificados(project_path: &Path) -> Vec<PathBuf> {
    git(project_path, &["diff", "--name-only", "HEAD"])
        .map(|salida| {
            salida
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| project_path.join(l))
                .filter(|p| p.exists())
                .collect()
        })
        .unwrap_or_default()
}
