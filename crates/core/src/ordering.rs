//! Table dependency order for bulk operations.
//!
//! The processing sequence is a curated constant rather than a runtime
//! topological sort: parents appear before children so foreign keys are
//! satisfied when tables are applied strictly in order. [`verify_order`]
//! cross-checks the constant against the curated foreign-key edge list at
//! startup and reports drift as warnings instead of trusting a possibly
//! stale list.

/// Known tables in parent-before-child order.
///
/// Any table name not on this list is processed after all listed tables,
/// in encounter order.
pub const TABLE_ORDER: &[&str] = &[
    "profiles",
    "user_roles",
    "dealers",
    "distributors",
    "products",
    "policies",
    "sales_orders",
    "sales_order_items",
    "purchases",
    "purchase_items",
    "invoices",
    "invoice_items",
    "payments",
    "credit_notes",
    "cash_flow_entries",
];

/// Curated foreign-key edges, `(parent, child)`.
///
/// Maintained by hand alongside the schema; [`verify_order`] keeps
/// [`TABLE_ORDER`] honest against this list.
pub const FK_EDGES: &[(&str, &str)] = &[
    ("profiles", "user_roles"),
    ("dealers", "policies"),
    ("dealers", "sales_orders"),
    ("distributors", "purchases"),
    ("products", "sales_order_items"),
    ("products", "purchase_items"),
    ("sales_orders", "sales_order_items"),
    ("sales_orders", "invoices"),
    ("purchases", "purchase_items"),
    ("invoices", "invoice_items"),
    ("invoices", "payments"),
    ("invoices", "credit_notes"),
    ("payments", "cash_flow_entries"),
];

/// Server-computed columns that must never be written directly, per table.
///
/// The database maintains these itself (triggers or generated columns);
/// writing them during a restore would either fail or corrupt the derived
/// value.
pub const GENERATED_COLUMNS: &[(&str, &[&str])] = &[
    ("cash_flow_entries", &["running_balance"]),
    ("invoices", &["outstanding_amount"]),
];

/// Return the server-computed columns for `table` (empty for most tables).
pub fn generated_columns(table: &str) -> &'static [&'static str] {
    GENERATED_COLUMNS
        .iter()
        .find(|(t, _)| *t == table)
        .map(|(_, cols)| *cols)
        .unwrap_or(&[])
}

/// Order the given table names for processing.
///
/// Names found in [`TABLE_ORDER`] come first, in list order; names absent
/// from the list follow, in their original encounter order. The result is
/// deterministic for any input order of `present`.
pub fn order_tables(present: &[String]) -> Vec<String> {
    let mut ordered: Vec<String> = TABLE_ORDER
        .iter()
        .filter(|t| present.iter().any(|p| p == *t))
        .map(|t| t.to_string())
        .collect();

    for name in present {
        if !TABLE_ORDER.contains(&name.as_str()) {
            ordered.push(name.clone());
        }
    }

    ordered
}

/// Check [`TABLE_ORDER`] against [`FK_EDGES`] and return drift warnings.
///
/// A warning is produced when an edge endpoint is missing from the list or
/// when a child precedes its parent. An empty result means the static list
/// embeds a valid topological order of the curated edges. Called once at
/// startup; callers log warnings rather than aborting.
pub fn verify_order() -> Vec<String> {
    let position = |name: &str| TABLE_ORDER.iter().position(|t| *t == name);
    let mut warnings = Vec::new();

    for (parent, child) in FK_EDGES {
        match (position(parent), position(child)) {
            (None, _) => warnings.push(format!(
                "dependency order: parent table '{parent}' (edge {parent} -> {child}) is not listed"
            )),
            (_, None) => warnings.push(format!(
                "dependency order: child table '{child}' (edge {parent} -> {child}) is not listed"
            )),
            (Some(p), Some(c)) if p >= c => warnings.push(format!(
                "dependency order: '{child}' is listed before its parent '{parent}'"
            )),
            _ => {}
        }
    }

    warnings
}

/// Returns `true` if `name` is a safe lowercase SQL identifier.
///
/// Table names from archives and dumps reach raw SQL text, so anything
/// outside `[a-z_][a-z0-9_]*` is rejected before rendering.
pub fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn listed_tables_keep_list_order_regardless_of_input_order() {
        let present = names(&["invoices", "dealers", "sales_orders", "profiles"]);
        let ordered = order_tables(&present);
        assert_eq!(
            ordered,
            names(&["profiles", "dealers", "sales_orders", "invoices"])
        );
    }

    #[test]
    fn parents_precede_children_for_any_subset() {
        let present = names(&["cash_flow_entries", "payments", "invoices", "sales_orders"]);
        let ordered = order_tables(&present);
        for (parent, child) in FK_EDGES {
            let p = ordered.iter().position(|t| t == parent);
            let c = ordered.iter().position(|t| t == child);
            if let (Some(p), Some(c)) = (p, c) {
                assert!(p < c, "{parent} must precede {child}");
            }
        }
    }

    #[test]
    fn unknown_tables_come_last_in_encounter_order() {
        let present = names(&["zz_custom", "dealers", "aa_custom"]);
        let ordered = order_tables(&present);
        assert_eq!(ordered, names(&["dealers", "zz_custom", "aa_custom"]));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(order_tables(&[]).is_empty());
    }

    #[test]
    fn static_order_matches_fk_edges() {
        let warnings = verify_order();
        assert!(warnings.is_empty(), "drift detected: {warnings:?}");
    }

    #[test]
    fn generated_columns_lookup() {
        assert_eq!(generated_columns("cash_flow_entries"), &["running_balance"]);
        assert!(generated_columns("dealers").is_empty());
    }

    #[test]
    fn safe_identifiers() {
        assert!(is_safe_identifier("sales_orders"));
        assert!(is_safe_identifier("_tmp"));
        assert!(!is_safe_identifier("Dealers"));
        assert!(!is_safe_identifier("orders; DROP TABLE x"));
        assert!(!is_safe_identifier("1st"));
        assert!(!is_safe_identifier(""));
    }
}
