use std::path::Path;

use txseed_spec::{
    ColumnKind, compile_spec, load_spec_file, parse_expr, transactions_spec, validate_spec_json,
};

fn spec_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../specs").join(name)
}

#[test]
fn transactions_spec_file_matches_builtin_preset() {
    let loaded = load_spec_file(&spec_path("transactions.spec.json")).expect("load spec file");
    let builtin = transactions_spec(100);

    assert_eq!(loaded.name, builtin.name);
    assert_eq!(loaded.rows, builtin.rows);
    assert_eq!(loaded.column_names(), builtin.column_names());

    for (file_col, preset_col) in loaded.columns.iter().zip(&builtin.columns) {
        assert_eq!(file_col.data_type, preset_col.data_type, "{}", file_col.name);
        assert_eq!(file_col.nullable, preset_col.nullable, "{}", file_col.name);
        match (&file_col.generator, &preset_col.generator) {
            (ColumnKind::Expr { expr: left }, ColumnKind::Expr { expr: right }) => {
                assert_eq!(
                    parse_expr(left).expect("parse file expr"),
                    parse_expr(right).expect("parse preset expr"),
                    "{}",
                    file_col.name
                );
            }
            (left, right) => assert_eq!(left, right, "{}", file_col.name),
        }
    }
}

#[test]
fn sample_specs_compile() {
    for name in ["transactions.spec.json", "orders.spec.toml"] {
        let spec = load_spec_file(&spec_path(name)).expect("load spec file");
        let compiled = compile_spec(&spec).expect("spec compiles");
        assert!(compiled.warnings.is_empty(), "{name}: {:?}", compiled.warnings);
    }
}

#[test]
fn raw_json_reports_semantic_issues_with_paths() {
    let json = serde_json::json!({
        "name": "broken",
        "rows": 5,
        "columns": [
            {"name": "a", "data_type": "long",
             "generator": {"kind": "expr", "expr": "b * 2"}},
            {"name": "c", "data_type": "string",
             "generator": {"kind": "expr", "expr": "reverse(a)"}}
        ]
    });
    let report = validate_spec_json(&json).expect("schema compiles");
    assert!(!report.is_ok());

    let unknown = report
        .errors
        .iter()
        .find(|issue| issue.code == "unknown_column")
        .expect("unknown column reported");
    assert_eq!(unknown.path, "/columns/0/generator/expr");

    let function = report
        .errors
        .iter()
        .find(|issue| issue.code == "unknown_function")
        .expect("unknown function reported");
    assert_eq!(function.path, "/columns/1/generator/expr");
    assert!(function.hint.as_deref().is_some_and(|hint| hint.contains("element_at")));
}
