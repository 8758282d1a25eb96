//! Declarative form-variant registry.
//!
//! Each recognized form layout is a [`FormVariant`] descriptor: where the
//! header fields live, where the item table starts, which column holds which
//! item field, and which keywords identify the layout. Adding a layout is
//! adding a descriptor here; classification and extraction never change.

use crate::error::{IntakeError, IntakeResult};
use crate::types::{column_index, CellRef, FormKind};

/// Header fields that must be non-empty for a submission to be accepted.
pub const MANDATORY_HEADER_FIELDS: [&str; 2] = ["form_number", "requester"];

/// Descriptor for one recognized form layout.
#[derive(Debug, Clone)]
pub struct FormVariant {
    pub kind: FormKind,
    /// Classification keywords, matched case-insensitively as substrings.
    pub keywords: Vec<String>,
    /// Header field → cell, in declaration order.
    pub header: Vec<(String, CellRef)>,
    /// First row of the item table (1-based).
    pub items_start_row: u32,
    /// Item field → column index, in declaration order. The first entry is
    /// the item key column; an empty key cell terminates the table scan.
    pub item_columns: Vec<(String, u32)>,
}

/// Ordered collection of form variants. Classification scans variants in
/// registration order, so order is part of the contract.
#[derive(Debug, Clone)]
pub struct Registry {
    variants: Vec<FormVariant>,
}

impl Registry {
    /// Build a registry, validating the variant set up front: unique kinds,
    /// mandatory header fields present, a non-empty item mapping, and
    /// keyword sets that are disjoint across variants. Keyword matching is
    /// by substring, so one variant's keyword containing another's would
    /// make classification order-dependent; such sets are rejected.
    pub fn new(mut variants: Vec<FormVariant>) -> IntakeResult<Self> {
        if variants.is_empty() {
            return Err(IntakeError::Registry("no form variants registered".to_string()));
        }

        for variant in &mut variants {
            for keyword in &mut variant.keywords {
                *keyword = keyword.to_lowercase();
            }
        }

        for (i, variant) in variants.iter().enumerate() {
            if variants[..i].iter().any(|v| v.kind == variant.kind) {
                return Err(IntakeError::Registry(format!(
                    "variant {} is registered twice",
                    variant.kind
                )));
            }
            if variant.keywords.is_empty() {
                return Err(IntakeError::Registry(format!(
                    "variant {} has no classification keywords",
                    variant.kind
                )));
            }
            if variant.item_columns.is_empty() {
                return Err(IntakeError::Registry(format!(
                    "variant {} has no item column mapping",
                    variant.kind
                )));
            }
            if variant.items_start_row == 0 {
                return Err(IntakeError::Registry(format!(
                    "variant {} item table start row must be 1-based",
                    variant.kind
                )));
            }
            for field in MANDATORY_HEADER_FIELDS {
                if !variant.header.iter().any(|(name, _)| name == field) {
                    return Err(IntakeError::Registry(format!(
                        "variant {} is missing mandatory header field '{}'",
                        variant.kind, field
                    )));
                }
            }
        }

        for (i, a) in variants.iter().enumerate() {
            for b in &variants[i + 1..] {
                for ka in &a.keywords {
                    for kb in &b.keywords {
                        if ka.contains(kb.as_str()) || kb.contains(ka.as_str()) {
                            return Err(IntakeError::Registry(format!(
                                "keyword '{}' ({}) overlaps keyword '{}' ({})",
                                ka, a.kind, kb, b.kind
                            )));
                        }
                    }
                }
            }
        }

        Ok(Self { variants })
    }

    /// The built-in variant set: purchase, service and cost forms sharing a
    /// common header block (form number D2, date D3, requester D4,
    /// department D5, notes D6) with item tables starting at row 10.
    pub fn builtin() -> Self {
        Self::new(builtin_variants()).expect("builtin form registry is consistent")
    }

    /// Variants in registration order.
    pub fn variants(&self) -> &[FormVariant] {
        &self.variants
    }

    pub fn lookup(&self, kind: FormKind) -> IntakeResult<&FormVariant> {
        self.variants
            .iter()
            .find(|v| v.kind == kind)
            .ok_or_else(|| IntakeError::UnknownVariant(kind.to_string()))
    }
}

fn common_header() -> Vec<(String, CellRef)> {
    [
        ("form_number", "D2"),
        ("form_date", "D3"),
        ("requester", "D4"),
        ("department", "D5"),
        ("notes", "D6"),
    ]
    .into_iter()
    .map(|(field, cell)| {
        (
            field.to_string(),
            CellRef::parse(cell).expect("static cell reference"),
        )
    })
    .collect()
}

fn columns(mapping: &[(&str, &str)]) -> Vec<(String, u32)> {
    mapping.iter()
        .map(|(field, col)| {
            (
                field.to_string(),
                column_index(col).expect("static column letter"),
            )
        })
        .collect()
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn builtin_variants() -> Vec<FormVariant> {
    vec![
        FormVariant {
            kind: FormKind::Compras,
            keywords: keywords(&["compra", "adquisición", "purchase"]),
            header: common_header(),
            items_start_row: 10,
            item_columns: columns(&[
                ("item_no", "A"),
                ("description", "B"),
                ("quantity", "C"),
                ("unit", "D"),
                ("unit_price", "E"),
                ("total", "F"),
            ]),
        },
        FormVariant {
            kind: FormKind::Servicios,
            keywords: keywords(&["servicio", "service"]),
            header: common_header(),
            items_start_row: 10,
            item_columns: columns(&[
                ("item_no", "A"),
                ("service", "B"),
                ("provider", "C"),
                ("amount", "D"),
                ("service_date", "E"),
            ]),
        },
        FormVariant {
            kind: FormKind::Costos,
            keywords: keywords(&["costo", "gasto", "expense", "cost"]),
            header: common_header(),
            items_start_row: 10,
            item_columns: columns(&[
                ("item_no", "A"),
                ("concept", "B"),
                ("category", "C"),
                ("amount", "D"),
                ("expense_date", "E"),
            ]),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(kind: FormKind, words: &[&str]) -> FormVariant {
        FormVariant {
            kind,
            keywords: keywords(words),
            header: common_header(),
            items_start_row: 10,
            item_columns: columns(&[("item_no", "A"), ("description", "B")]),
        }
    }

    #[test]
    fn test_builtin_registry_has_three_variants() {
        let registry = Registry::builtin();
        assert_eq!(registry.variants().len(), 3);
        assert_eq!(
            registry.lookup(FormKind::Compras).unwrap().kind,
            FormKind::Compras
        );
        assert_eq!(
            registry.lookup(FormKind::Servicios).unwrap().items_start_row,
            10
        );
        assert_eq!(
            registry.lookup(FormKind::Costos).unwrap().item_columns[0].0,
            "item_no"
        );
    }

    #[test]
    fn test_lookup_unregistered_variant_fails() {
        let registry = Registry::new(vec![variant(FormKind::Compras, &["compra"])]).unwrap();
        let err = registry.lookup(FormKind::Costos).unwrap_err();
        assert!(matches!(err, IntakeError::UnknownVariant(_)));
    }

    #[test]
    fn test_duplicate_keyword_across_variants_rejected() {
        let result = Registry::new(vec![
            variant(FormKind::Compras, &["compra"]),
            variant(FormKind::Servicios, &["Compra"]),
        ]);
        assert!(matches!(result, Err(IntakeError::Registry(_))));
    }

    #[test]
    fn test_substring_keyword_overlap_rejected() {
        // "cost" would match every sheet that matches "costo", making the
        // classification depend on registration order.
        let result = Registry::new(vec![
            variant(FormKind::Servicios, &["cost"]),
            variant(FormKind::Costos, &["costo"]),
        ]);
        assert!(matches!(result, Err(IntakeError::Registry(_))));
    }

    #[test]
    fn test_missing_mandatory_header_field_rejected() {
        let mut v = variant(FormKind::Compras, &["compra"]);
        v.header.retain(|(name, _)| name != "requester");
        let result = Registry::new(vec![v]);
        assert!(matches!(result, Err(IntakeError::Registry(_))));
    }

    #[test]
    fn test_zero_start_row_rejected() {
        let mut v = variant(FormKind::Compras, &["compra"]);
        v.items_start_row = 0;
        let result = Registry::new(vec![v]);
        assert!(matches!(result, Err(IntakeError::Registry(_))));
    }

    #[test]
    fn test_duplicate_kind_rejected() {
        let result = Registry::new(vec![
            variant(FormKind::Compras, &["compra"]),
            variant(FormKind::Compras, &["purchase"]),
        ]);
        assert!(matches!(result, Err(IntakeError::Registry(_))));
    }

    #[test]
    fn test_keywords_are_normalized_to_lowercase() {
        let registry = Registry::new(vec![variant(FormKind::Compras, &["COMPRA"])]).unwrap();
        assert_eq!(registry.variants()[0].keywords, vec!["compra".to_string()]);
    }
}
