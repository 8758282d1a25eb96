//! Heuristic form classification.
//!
//! Two passes of case-insensitive keyword-substring matching: the sheet
//! name first, then the text content of the sheet's first rows. Submitters
//! rename sheets, so the name alone cannot be trusted; the content pass is
//! the fallback. Keyword sets are validated disjoint at registry load, so
//! "first variant in registration order" is unambiguous.

use crate::error::{IntakeError, IntakeResult};
use crate::registry::Registry;
use crate::types::FormKind;

/// Number of leading sheet rows inspected by the content pass.
pub const CONTENT_SCAN_ROWS: u32 = 10;

/// Determine which registered variant a sheet matches.
///
/// `preview_rows` is the text of the sheet's first rows, one string per
/// row, empty cells skipped. Fails with `UnrecognizedFormType` when no
/// keyword of any variant appears in the sheet name or the preview text.
pub fn classify(
    registry: &Registry,
    sheet_name: &str,
    preview_rows: &[String],
) -> IntakeResult<FormKind> {
    let name = sheet_name.to_lowercase();
    for variant in registry.variants() {
        if variant.keywords.iter().any(|k| name.contains(k.as_str())) {
            tracing::debug!(kind = %variant.kind, "form type identified by sheet name");
            return Ok(variant.kind);
        }
    }

    let content = preview_rows.join(" ").to_lowercase();
    for variant in registry.variants() {
        if variant.keywords.iter().any(|k| content.contains(k.as_str())) {
            tracing::debug!(kind = %variant.kind, "form type identified by sheet content");
            return Ok(variant.kind);
        }
    }

    Err(IntakeError::UnrecognizedFormType {
        sheet: sheet_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::builtin()
    }

    #[test]
    fn test_classify_by_sheet_name_any_case() {
        let r = registry();
        assert_eq!(
            classify(&r, "Formulario de Compras", &[]).unwrap(),
            FormKind::Compras
        );
        assert_eq!(classify(&r, "SERVICIOS 2025", &[]).unwrap(), FormKind::Servicios);
        assert_eq!(classify(&r, "gastos del mes", &[]).unwrap(), FormKind::Costos);
    }

    #[test]
    fn test_sheet_name_wins_over_content() {
        let r = registry();
        let rows = vec!["Formulario de Compras".to_string()];
        // Name says service, content says purchase; the name pass runs first.
        assert_eq!(
            classify(&r, "Servicios", &rows).unwrap(),
            FormKind::Servicios
        );
    }

    #[test]
    fn test_classify_by_content_when_name_is_generic() {
        let r = registry();
        let rows = vec![
            "ACME Corp".to_string(),
            "FORMULARIO DE COMPRAS R-60".to_string(),
        ];
        assert_eq!(classify(&r, "Hoja1", &rows).unwrap(), FormKind::Compras);
    }

    #[test]
    fn test_no_match_is_unrecognized() {
        let r = registry();
        let rows = vec!["quarterly revenue".to_string()];
        let err = classify(&r, "Sheet1", &rows).unwrap_err();
        assert!(matches!(err, IntakeError::UnrecognizedFormType { .. }));
    }

    #[test]
    fn test_registry_order_breaks_ties_within_a_pass() {
        let r = registry();
        // Content mentions both a purchase and a service keyword; the first
        // registered variant wins.
        let rows = vec!["compra de servicio".to_string()];
        assert_eq!(classify(&r, "Hoja1", &rows).unwrap(), FormKind::Compras);
    }
}
