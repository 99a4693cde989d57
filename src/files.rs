//! # Localización de tests emparejados
//!
//! Antes de escanear, el pipeline resuelve qué tests emparejados existen, ya
//! sea dentro del conjunto de cambios o en disco bajo la raíz del proyecto.
//! Así las reglas de testing trabajan sobre un conjunto ya calculado y nunca
//! tocan el sistema de archivos.

use std::collections::BTreeSet;
use std::path::Path;

use crate::language::Classification;

/// Busca el test emparejado de un archivo fuente siguiendo la convención de su lenguaje.
///
/// # Argumentos
/// * `classification` - Resultado del clasificador para el archivo fuente
/// * `known_paths` - Rutas (normalizadas) presentes en el conjunto de cambios
/// * `project_root` - Raíz del proyecto para buscar en disco (opcional)
///
/// # Retorna
/// * `Some(ruta)` - Primera ubicación encontrada (canónica primero, luego alternativas)
/// * `None` - Si no existe ningún test en ninguna ubicación aceptada
///
/// # Ejemplos
/// ```
/// // payments.go -> payments_test.go en el mismo directorio
/// // calculator.py -> tests/test_calculator.py
/// ```
pub fn buscar_test_emparejado(
    classification: &Classification,
    known_paths: &BTreeSet<String>,
    project_root: Option<&Path>,
) -> Option<String> {
    let canonical = classification.paired_test.as_ref()?;

    std::iter::once(canonical)
        .chain(classification.alternate_tests.iter())
        .find(|candidate| {
            known_paths.contains(candidate.as_str())
                || project_root
                    .map(|root| root.join(candidate.as_str()).is_file())
                    .unwrap_or(false)
        })
        .cloned()
}
