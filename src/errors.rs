//! Taxonomía de errores del motor de revisión.
//!
//! Los errores que comprometen la decisión final (reglas duplicadas,
//! configuración inválida) son fatales y aparecen antes de escanear.
//! Los errores locales a un archivo o a una regla se degradan a un Finding.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("regla duplicada en el registro: '{id}'")]
    DuplicateRule { id: String },

    #[error("la regla '{rule_id}' falló durante la evaluación: {reason}")]
    RuleEvaluation { rule_id: String, reason: String },

    #[error("no se pudo decodificar '{path}': {reason}")]
    UnreadableFile { path: String, reason: String },

    #[error("configuración inválida: {0}")]
    InvalidConfiguration(String),

    #[error("no se pudo leer la configuración {}: {reason}", path.display())]
    ConfigParse { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReviewError {
    /// Errores fatales: deben abortar la ejecución antes del escaneo.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ReviewError::RuleEvaluation { .. } | ReviewError::UnreadableFile { .. }
        )
    }
}

pub type ReviewResult<T> = Result<T, ReviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localized_errors_are_not_fatal() {
        let rule = ReviewError::RuleEvaluation {
            rule_id: "EMPTY_CATCH".into(),
            reason: "boom".into(),
        };
        let file = ReviewError::UnreadableFile {
            path: "src/a.ts".into(),
            reason: "invalid utf-8".into(),
        };
        assert!(!rule.is_fatal());
        assert!(!file.is_fatal());
        assert!(ReviewError::DuplicateRule { id: "X".into() }.is_fatal());
        assert!(ReviewError::InvalidConfiguration("x".into()).is_fatal());
    }

    #[test]
    fn test_error_messages_name_the_subject() {
        let err = ReviewError::DuplicateRule { id: "DIRECT_OUTPUT".into() };
        assert!(err.to_string().contains("DIRECT_OUTPUT"));
    }
}
