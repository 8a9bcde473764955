use pretty_assertions::assert_eq;
use tessera_types::{Error, FieldErrors};

#[test]
fn field_errors_accumulate_per_field() {
    let mut errors = FieldErrors::new();
    errors.push("slug", "must not be empty");
    errors.push("tableName", "must match ^[a-z][a-z0-9_]*$");
    errors.push("slug", "must be kebab-case");

    assert_eq!(errors.len(), 2);
    assert_eq!(errors.messages("slug"), ["must not be empty", "must be kebab-case"]);
    assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["slug", "tableName"]);
    assert!(errors.messages("categoryId").is_empty());
}

#[test]
fn empty_field_errors_into_ok() {
    assert!(FieldErrors::new().into_result().is_ok());
}

#[test]
fn non_empty_field_errors_into_validation() {
    let mut errors = FieldErrors::new();
    errors.push("name", "is required");
    let err = errors.into_result().unwrap_err();
    assert!(err.is_validation());
    assert!(err.field_errors().unwrap().contains("name"));
}

#[test]
fn error_display() {
    let err = Error::invalid("tableName", "does not match the first version");
    assert_eq!(
        err.to_string(),
        "validation failed: tableName: does not match the first version"
    );
    assert!(Error::not_found("schema x").to_string().contains("schema x"));
    assert!(Error::conflict("dup").to_string().starts_with("conflict"));
    assert_eq!(Error::Cancelled.to_string(), "operation cancelled");
}

#[test]
fn error_kind_predicates() {
    assert!(Error::not_found("x").is_not_found());
    assert!(Error::conflict("x").is_conflict());
    assert!(!Error::Internal("x".into()).is_conflict());
    assert!(Error::Internal("x".into()).field_errors().is_none());
}

#[test]
fn field_errors_serialize_as_map() {
    let mut errors = FieldErrors::new();
    errors.push("categoryId", "unknown category");
    let json = serde_json::to_value(&errors).unwrap();
    assert_eq!(json, serde_json::json!({"categoryId": ["unknown category"]}));
}
