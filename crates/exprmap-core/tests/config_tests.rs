use std::io::Write;
use std::sync::Arc;

use exprmap_core::{
    calls, CallSiteRewriter, ErrorKind, Expr, ExprKind, Lambda, MapError, Mapper, MapperConfig,
    RewriteSettings, TransformPipeline,
};
use exprmap_test_helpers::fixtures::{cat_dto_mapper, thing};
use tempfile::{Builder, NamedTempFile};

fn write_config(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_json_config() {
    let file = write_config(
        ".json",
        r#"{ "rewriteOptions": { "nullPropagation": false, "projectionParameterPrefix": "p_" } }"#,
    );

    let config = MapperConfig::from_file(file.path()).unwrap();

    assert!(!config.rewrite_options.null_propagation);
    assert_eq!(config.rewrite_options.projection_parameter_prefix, "p_");
}

#[test]
fn test_load_yaml_config() {
    let file = write_config(
        ".yaml",
        "rewriteOptions:\n  nullPropagation: false\n",
    );

    let config = MapperConfig::from_file(file.path()).unwrap();

    assert!(!config.rewrite_options.null_propagation);
    assert_eq!(config.rewrite_options.projection_parameter_prefix, "map_");
}

#[test]
fn test_missing_fields_take_defaults() {
    let file = write_config(".json", "{}");

    let config = MapperConfig::from_file(file.path()).unwrap();

    assert_eq!(config, MapperConfig::default());
}

#[test]
fn test_init_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exprmap.json");

    MapperConfig::init_file(&path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    let config = MapperConfig::from_file(&path).unwrap();

    assert!(content.contains("\"nullPropagation\": true"));
    assert_eq!(config, MapperConfig::default());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = MapperConfig::from_file(&dir.path().join("absent.json")).unwrap_err();

    assert!(matches!(err, MapError::Io(_)));
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_invalid_json_is_config_error() {
    let file = write_config(".json", "{ \"rewriteOptions\": ");

    let err = MapperConfig::from_file(file.path()).unwrap_err();

    assert!(matches!(err, MapError::Config(_)));
}

#[test]
fn test_wrong_field_type_is_config_error() {
    let file = write_config(".yml", "rewriteOptions:\n  nullPropagation: sometimes\n");

    let err = MapperConfig::from_file(file.path()).unwrap_err();

    assert!(matches!(err, MapError::Config(_)));
}

// ============================================================================
// Applying configuration
// ============================================================================

#[test]
fn test_loaded_config_drives_rewriting() {
    let file = write_config(".json", r#"{ "rewriteOptions": { "nullPropagation": false } }"#);
    let config = MapperConfig::from_file(file.path()).unwrap();
    let rewriter = CallSiteRewriter::with_settings(RewriteSettings::from_config(&config));
    let cat_mapper = cat_dto_mapper();
    let x = Expr::parameter("x", thing::ty());
    let body = calls::map_with(x.member(&thing::favorite_cat()), Expr::mapper(&cat_mapper)).unwrap();

    let mapper = Mapper::with_pipeline(
        Lambda::unary(x, body).unwrap(),
        TransformPipeline::new(Arc::new(rewriter)),
    )
    .unwrap();

    assert!(matches!(
        mapper.expression().body().kind(),
        ExprKind::MemberInit(_)
    ));
}
