//! Comando `review`: recolecta archivos y metadatos, ejecuta el motor y renderiza.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::*;

use crate::commands::render::{render_sarif, render_text};
use crate::commands::{get_output_mode, OutputFormat, OutputMode, ReviewArgs};
use crate::config::ReviewConfig;
use crate::git;
use crate::language::{Language, LanguageClassifier, ProjectMarkers};
use crate::review::{ChangedFile, Changeset, Report, ReviewEngine};
use crate::rules::{CommitInfo, CommitMetadata};

/// Carga la configuración explícita o la de `.sentinel/` en la raíz.
pub fn load_config(explicit: Option<&Path>, project_root: &Path) -> anyhow::Result<ReviewConfig> {
    let config = match explicit {
        Some(path) => ReviewConfig::from_file(path)?,
        None => ReviewConfig::load(project_root)?,
    };
    Ok(config)
}

/// Archivos `.env*` no tienen lenguaje pero sí pueden contener secretos.
fn is_env_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == ".env" || n.starts_with(".env."))
}

/// Recorre `targets` respetando `.gitignore`. Los archivos nombrados
/// explícitamente siempre entran; en carpetas solo los de lenguaje conocido.
pub fn collect_files(targets: &[PathBuf], classifier: &LanguageClassifier) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for target in targets {
        if target.is_file() {
            files.push(target.clone());
            continue;
        }
        let walker = ignore::WalkBuilder::new(target)
            .hidden(false)
            .git_ignore(true)
            .filter_entry(|e| e.file_name() != ".git")
            .build();
        for entry in walker.flatten() {
            let p = entry.path();
            if !p.is_file() {
                continue;
            }
            let known = classifier.language_of(&p.to_string_lossy()) != Language::Unknown;
            if known || is_env_file(p) {
                files.push(p.to_path_buf());
            }
        }
    }
    files.sort();
    files.dedup();
    files
}

/// Ruta relativa a la raíz con separadores `/`.
fn relative_path(path: &Path, project_root: &Path) -> String {
    path.strip_prefix(project_root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Metadatos de commit a partir de git y de los flags; `None` si no hay nada que validar.
pub fn build_commit_metadata(args: &ReviewArgs, project_root: &Path) -> Option<CommitMetadata> {
    let mut meta = if args.git {
        git::recolectar_metadatos(project_root)
    } else {
        CommitMetadata::default()
    };
    if let Some(branch) = &args.branch {
        meta.branch = Some(branch.clone());
    }
    meta.commits.extend(args.commit_msgs.iter().enumerate().map(|(i, message)| CommitInfo {
        id: format!("msg-{}", i + 1),
        message: message.clone(),
    }));

    if meta.branch.is_none() && meta.commits.is_empty() {
        None
    } else {
        Some(meta)
    }
}

/// Lee cada archivo; los que fallan entran como ilegibles y la revisión sigue.
pub fn read_changed_files(paths: &[PathBuf], project_root: &Path) -> Vec<ChangedFile> {
    paths
        .iter()
        .map(|path| {
            let relative = relative_path(path, project_root);
            match fs::read(path) {
                Ok(content) => ChangedFile::new(relative, content),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "no se pudo leer el archivo");
                    ChangedFile::unreadable(relative, e.to_string())
                }
            }
        })
        .collect()
}

/// Ejecuta la revisión y devuelve el código de salida de la decisión.
pub fn handle_review(args: ReviewArgs, project_root: &Path, quiet: bool, verbose: bool) -> anyhow::Result<i32> {
    let output_mode = get_output_mode(quiet, verbose);
    let config = load_config(args.config.as_deref(), project_root)?;
    let engine = ReviewEngine::new(&config).context("configuración de revisión inválida")?;

    let markers = ProjectMarkers::from_root(project_root);
    let classifier = LanguageClassifier::new(markers.clone());
    let paths = if args.changed {
        git::obtener_archivos_modificados(project_root)
    } else if args.paths.is_empty() {
        collect_files(&[project_root.to_path_buf()], &classifier)
    } else {
        // Relativas a la raíz del proyecto; si no existen ahí, tal cual (cwd o absolutas)
        let targets: Vec<PathBuf> = args
            .paths
            .iter()
            .map(|p| {
                let rooted = project_root.join(p);
                if rooted.exists() { rooted } else { p.clone() }
            })
            .collect();
        if let Some(missing) = targets.iter().find(|p| !p.exists()) {
            anyhow::bail!("el destino '{}' no existe", missing.display());
        }
        collect_files(&targets, &classifier)
    };

    let files = read_changed_files(&paths, project_root);

    if output_mode == OutputMode::Verbose && args.format == OutputFormat::Text {
        println!("\n📂 Archivos procesados:");
        for f in &files {
            println!("   {}", f.path);
        }
    }
    if output_mode != OutputMode::Quiet && args.format == OutputFormat::Text {
        println!("\n{} Revisando {} archivo(s)...", "⚡".cyan(), files.len());
    }

    let files_checked = files.len();
    let changeset = Changeset {
        files,
        commit: build_commit_metadata(&args, project_root),
        project_root: Some(project_root.to_path_buf()),
        markers,
    };
    let aggregated = if args.fail_fast {
        engine.review_fail_fast(&changeset)
    } else {
        engine.review(&changeset)
    };
    let report = Report::from_aggregated(&aggregated);

    match args.format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Sarif => println!("{}", render_sarif(&report, engine.registry())),
        OutputFormat::Text => print!("{}", render_text(&report, files_checked, output_mode)),
    }

    Ok(report.decision.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args() -> ReviewArgs {
        ReviewArgs {
            paths: Vec::new(),
            changed: false,
            format: OutputFormat::Json,
            config: None,
            branch: None,
            commit_msgs: Vec::new(),
            git: false,
            fail_fast: false,
        }
    }

    #[test]
    fn test_collect_files_skips_ignored_and_unknown() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("dist")).unwrap();
        fs::write(root.join("src/app.ts"), "export const a = 1;\n").unwrap();
        fs::write(root.join("src/logo.png"), [0x89u8, 0x50]).unwrap();
        fs::write(root.join("dist/app.js"), "var a = 1;\n").unwrap();
        fs::write(root.join(".env"), "API_KEY=abc\n").unwrap();
        fs::write(root.join(".gitignore"), "dist/\n").unwrap();
        // `ignore` solo aplica .gitignore dentro de un repo git
        fs::create_dir_all(root.join(".git")).unwrap();

        let classifier = LanguageClassifier::new(ProjectMarkers::default());
        let files: Vec<String> = collect_files(&[root.to_path_buf()], &classifier)
            .iter()
            .map(|p| relative_path(p, root))
            .collect();
        assert!(files.contains(&"src/app.ts".to_string()));
        assert!(!files.contains(&"src/logo.png".to_string()));
        assert!(!files.contains(&"dist/app.js".to_string()));
        assert!(files.contains(&".env".to_string()));
    }

    #[test]
    fn test_explicit_file_is_always_collected() {
        let temp_dir = TempDir::new().unwrap();
        let notes = temp_dir.path().join("notes.txt");
        fs::write(&notes, "x").unwrap();
        let classifier = LanguageClassifier::new(ProjectMarkers::default());
        assert_eq!(collect_files(&[notes.clone()], &classifier), vec![notes]);
    }

    #[test]
    fn test_commit_metadata_from_flags() {
        let temp_dir = TempDir::new().unwrap();
        assert!(build_commit_metadata(&args(), temp_dir.path()).is_none());

        let mut with_flags = args();
        with_flags.branch = Some("feature/login".into());
        with_flags.commit_msgs = vec!["feat: add login page".into()];
        let meta = build_commit_metadata(&with_flags, temp_dir.path()).unwrap();
        assert_eq!(meta.branch.as_deref(), Some("feature/login"));
        assert_eq!(meta.commits[0].id, "msg-1");
    }

    #[test]
    fn test_read_failure_becomes_unreadable_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("ok.py"), "x = 1\n").unwrap();
        // `--changed` puede listar archivos borrados después del diff
        let paths = vec![root.join("ok.py"), root.join("gone.py")];

        let files = read_changed_files(&paths, root);
        assert_eq!(files[0], ChangedFile::new("ok.py", "x = 1\n"));
        assert_eq!(files[1].path, "gone.py");
        assert!(files[1].read_error.is_some());
        assert!(files[1].content.is_empty());
    }

    #[test]
    fn test_handle_review_exit_code() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(
            root.join("src/service.ts"),
            "export function load() {\n  try {\n    run();\n  } catch (e) {\n  }\n}\n",
        )
        .unwrap();

        let mut review_args = args();
        review_args.paths = vec![PathBuf::from("src")];
        assert_eq!(handle_review(review_args, root, true, false).unwrap(), 1);

        let mut missing = args();
        missing.paths = vec![PathBuf::from("nope")];
        assert!(handle_review(missing, root, true, false).is_err());
    }
}
