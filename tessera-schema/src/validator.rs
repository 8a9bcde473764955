//! JSON Schema (Draft 2020-12 subset) interpreter.
//!
//! Supported keywords: `type`, `enum`, `const`, `properties`, `required`,
//! `additionalProperties`, `minLength`, `maxLength`, `pattern`, `format`,
//! `minimum`, `maximum`, `exclusiveMinimum`, `exclusiveMaximum`,
//! `multipleOf`, `items`, `minItems`, `maxItems`, `uniqueItems`, and boolean
//! schemas. Every other keyword is an annotation and is ignored.
//!
//! Validation never stops at the first failure. Issues are reported in a
//! fixed order per node: `type` (a type mismatch ends evaluation of that
//! node), `enum`/`const`, the bounds of the instance's type, `required`,
//! declared `properties`, then undeclared properties.

use crate::format::Format;
use regex_lite::Regex;
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::fmt;
use tessera_types::FieldErrors;
use thiserror::Error;

/// Path used for failures on the payload itself.
pub const ROOT_PATH: &str = "$";

/// One payload failure: where and what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path (`address.city`, `tags[2]`), or `$` for the root.
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Groups issues by path for the domain `Validation` error.
#[must_use]
pub fn to_field_errors(issues: &[ValidationIssue]) -> FieldErrors {
    issues
        .iter()
        .map(|i| (i.path.clone(), i.message.clone()))
        .collect()
}

/// One problem with a schema definition, located by JSON pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileIssue {
    /// `#`-rooted JSON pointer to the offending keyword.
    pub pointer: String,
    pub message: String,
}

impl fmt::Display for CompileIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pointer, self.message)
    }
}

/// A definition that cannot be used to validate payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid schema definition ({} problem(s))", .issues.len())]
pub struct CompileError {
    pub issues: Vec<CompileIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl JsonType {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "object" => Self::Object,
            "array" => Self::Array,
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "null" => Self::Null,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => is_integer(value),
            Self::Boolean => value.is_boolean(),
            Self::Null => value.is_null(),
        }
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => true,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0),
        _ => false,
    }
}

fn type_name_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) if is_integer(value) => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone)]
enum Node {
    Bool(bool),
    Rules(Box<Rules>),
}

#[derive(Debug, Clone, Default)]
struct Rules {
    types: Option<Vec<JsonType>>,
    enum_values: Option<Vec<Value>>,
    const_value: Option<Value>,
    // strings
    min_length: Option<u64>,
    max_length: Option<u64>,
    pattern: Option<(String, Regex)>,
    format: Option<(String, Format)>,
    // numbers
    minimum: Option<Number>,
    maximum: Option<Number>,
    exclusive_minimum: Option<Number>,
    exclusive_maximum: Option<Number>,
    multiple_of: Option<Number>,
    // objects
    properties: Vec<(String, Node)>,
    required: Vec<String>,
    additional: Option<Node>,
    // arrays
    items: Option<Node>,
    min_items: Option<u64>,
    max_items: Option<u64>,
    unique_items: bool,
}

/// A definition checked and prepared for repeated evaluation.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    root: Node,
}

impl CompiledSchema {
    /// Checks `definition` and prepares it for validation.
    ///
    /// Every problem in the definition is reported, not just the first.
    pub fn compile(definition: &Value) -> Result<Self, CompileError> {
        let mut issues = Vec::new();
        let root = compile_node(definition, "#", &mut issues);
        if issues.is_empty() {
            Ok(Self { root })
        } else {
            Err(CompileError { issues })
        }
    }

    /// Top-level property names declared under `properties`.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        let props: &[(String, Node)] = match &self.root {
            Node::Rules(rules) => &rules.properties,
            Node::Bool(_) => &[],
        };
        props.iter().map(|(name, _)| name.as_str())
    }

    /// Evaluates `payload`, returning every failure in report order.
    #[must_use]
    pub fn issues(&self, payload: &Value) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        check_node(&self.root, payload, ROOT_PATH, &mut issues);
        issues
    }

    /// `Ok(())` only if `payload` satisfies every rule.
    pub fn validate(&self, payload: &Value) -> Result<(), Vec<ValidationIssue>> {
        let issues = self.issues(payload);
        if issues.is_empty() { Ok(()) } else { Err(issues) }
    }
}

// ── Compilation ──────────────────────────────────────────────────

fn problem(issues: &mut Vec<CompileIssue>, pointer: &str, message: impl Into<String>) {
    issues.push(CompileIssue {
        pointer: pointer.to_string(),
        message: message.into(),
    });
}

fn compile_node(schema: &Value, pointer: &str, issues: &mut Vec<CompileIssue>) -> Node {
    match schema {
        Value::Bool(b) => Node::Bool(*b),
        Value::Object(obj) => Node::Rules(Box::new(compile_rules(obj, pointer, issues))),
        other => {
            problem(
                issues,
                pointer,
                format!("schema must be an object or boolean, got {}", type_name_of(other)),
            );
            Node::Bool(true)
        }
    }
}

fn compile_rules(obj: &Map<String, Value>, pointer: &str, issues: &mut Vec<CompileIssue>) -> Rules {
    let at = |keyword: &str| format!("{pointer}/{keyword}");
    let mut rules = Rules::default();

    if let Some(t) = obj.get("type") {
        rules.types = compile_types(t, &at("type"), issues);
    }
    if let Some(e) = obj.get("enum") {
        match e.as_array() {
            Some(values) => rules.enum_values = Some(values.clone()),
            None => problem(issues, &at("enum"), "must be an array"),
        }
    }
    rules.const_value = obj.get("const").cloned();

    rules.min_length = non_negative(obj, "minLength", pointer, issues);
    rules.max_length = non_negative(obj, "maxLength", pointer, issues);
    if let Some(p) = obj.get("pattern") {
        match p.as_str() {
            Some(src) => match Regex::new(src) {
                Ok(re) => rules.pattern = Some((src.to_string(), re)),
                Err(e) => problem(issues, &at("pattern"), format!("invalid regular expression: {e}")),
            },
            None => problem(issues, &at("pattern"), "must be a string"),
        }
    }
    if let Some(f) = obj.get("format") {
        match f.as_str() {
            Some(name) => rules.format = Some((name.to_string(), Format::from_name(name))),
            None => problem(issues, &at("format"), "must be a string"),
        }
    }

    rules.minimum = number(obj, "minimum", pointer, issues);
    rules.maximum = number(obj, "maximum", pointer, issues);
    rules.exclusive_minimum = number(obj, "exclusiveMinimum", pointer, issues);
    rules.exclusive_maximum = number(obj, "exclusiveMaximum", pointer, issues);
    rules.multiple_of = number(obj, "multipleOf", pointer, issues);
    if let Some(m) = &rules.multiple_of {
        if m.as_f64().is_none_or(|f| f <= 0.0) {
            problem(issues, &at("multipleOf"), "must be greater than 0");
        }
    }

    if let Some(props) = obj.get("properties") {
        match props.as_object() {
            Some(props) => {
                for (name, sub) in props {
                    let sub_pointer = format!("{}/{}", at("properties"), escape_pointer(name));
                    rules
                        .properties
                        .push((name.clone(), compile_node(sub, &sub_pointer, issues)));
                }
            }
            None => problem(issues, &at("properties"), "must be an object"),
        }
    }
    if let Some(req) = obj.get("required") {
        match req.as_array() {
            Some(names) => {
                for (i, name) in names.iter().enumerate() {
                    match name.as_str() {
                        Some(n) if !rules.required.iter().any(|r| r == n) => {
                            rules.required.push(n.to_string());
                        }
                        Some(n) => problem(
                            issues,
                            &format!("{}/{i}", at("required")),
                            format!("duplicate entry {n:?}"),
                        ),
                        None => problem(
                            issues,
                            &format!("{}/{i}", at("required")),
                            "must be a string",
                        ),
                    }
                }
            }
            None => problem(issues, &at("required"), "must be an array of strings"),
        }
    }
    if let Some(additional) = obj.get("additionalProperties") {
        rules.additional = Some(compile_node(additional, &at("additionalProperties"), issues));
    }

    if let Some(items) = obj.get("items") {
        rules.items = Some(compile_node(items, &at("items"), issues));
    }
    rules.min_items = non_negative(obj, "minItems", pointer, issues);
    rules.max_items = non_negative(obj, "maxItems", pointer, issues);
    if let Some(u) = obj.get("uniqueItems") {
        match u.as_bool() {
            Some(b) => rules.unique_items = b,
            None => problem(issues, &at("uniqueItems"), "must be a boolean"),
        }
    }

    rules
}

fn compile_types(value: &Value, pointer: &str, issues: &mut Vec<CompileIssue>) -> Option<Vec<JsonType>> {
    let names: Vec<&Value> = match value {
        Value::String(_) => vec![value],
        Value::Array(items) if !items.is_empty() => items.iter().collect(),
        _ => {
            problem(issues, pointer, "must be a type name or a non-empty array of type names");
            return None;
        }
    };
    let mut types = Vec::with_capacity(names.len());
    for name in names {
        match name.as_str().and_then(JsonType::from_name) {
            Some(t) => types.push(t),
            None => problem(issues, pointer, format!("unknown type {name}")),
        }
    }
    Some(types)
}

fn number(obj: &Map<String, Value>, keyword: &str, pointer: &str, issues: &mut Vec<CompileIssue>) -> Option<Number> {
    match obj.get(keyword)? {
        Value::Number(n) => Some(n.clone()),
        _ => {
            problem(issues, &format!("{pointer}/{keyword}"), "must be a number");
            None
        }
    }
}

fn non_negative(obj: &Map<String, Value>, keyword: &str, pointer: &str, issues: &mut Vec<CompileIssue>) -> Option<u64> {
    let value = obj.get(keyword)?;
    match value.as_u64() {
        Some(n) => Some(n),
        None => {
            problem(issues, &format!("{pointer}/{keyword}"), "must be a non-negative integer");
            None
        }
    }
}

fn escape_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

// ── Evaluation ───────────────────────────────────────────────────

fn child_path(parent: &str, key: &str) -> String {
    if parent == ROOT_PATH {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn check_node(node: &Node, value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) {
    match node {
        Node::Bool(true) => {}
        Node::Bool(false) => issues.push(ValidationIssue::new(path, "no value is allowed here")),
        Node::Rules(rules) => check_rules(rules, value, path, issues),
    }
}

fn check_rules(rules: &Rules, value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) {
    if let Some(types) = &rules.types {
        if !types.iter().any(|t| t.accepts(value)) {
            let expected: Vec<&str> = types.iter().map(|t| t.name()).collect();
            issues.push(ValidationIssue::new(
                path,
                format!("expected {}, got {}", expected.join(" or "), type_name_of(value)),
            ));
            return;
        }
    }

    if let Some(allowed) = &rules.enum_values {
        if !allowed.iter().any(|a| json_eq(a, value)) {
            let rendered: Vec<String> = allowed.iter().map(Value::to_string).collect();
            issues.push(ValidationIssue::new(
                path,
                format!("must be one of [{}]", rendered.join(", ")),
            ));
        }
    }
    if let Some(expected) = &rules.const_value {
        if !json_eq(expected, value) {
            issues.push(ValidationIssue::new(path, format!("must equal {expected}")));
        }
    }

    match value {
        Value::String(s) => check_string(rules, s, path, issues),
        Value::Number(n) => check_number(rules, n, path, issues),
        Value::Object(obj) => check_object(rules, obj, path, issues),
        Value::Array(items) => check_array(rules, items, path, issues),
        Value::Bool(_) | Value::Null => {}
    }
}

fn check_string(rules: &Rules, s: &str, path: &str, issues: &mut Vec<ValidationIssue>) {
    let len = s.chars().count() as u64;
    if let Some(min) = rules.min_length {
        if len < min {
            issues.push(ValidationIssue::new(
                path,
                format!("must be at least {min} characters long"),
            ));
        }
    }
    if let Some(max) = rules.max_length {
        if len > max {
            issues.push(ValidationIssue::new(
                path,
                format!("must be at most {max} characters long"),
            ));
        }
    }
    if let Some((src, re)) = &rules.pattern {
        if !re.is_match(s) {
            issues.push(ValidationIssue::new(path, format!("must match pattern {src}")));
        }
    }
    if let Some((name, format)) = &rules.format {
        if !format.matches(s) {
            issues.push(ValidationIssue::new(path, format!("must be a valid {name}")));
        }
    }
}

fn check_number(rules: &Rules, n: &Number, path: &str, issues: &mut Vec<ValidationIssue>) {
    let below = |limit: &Number| compare(n, limit).is_some_and(Ordering::is_lt);
    let above = |limit: &Number| compare(n, limit).is_some_and(Ordering::is_gt);

    if let Some(min) = &rules.minimum {
        if below(min) {
            issues.push(ValidationIssue::new(path, format!("must be >= {min}")));
        }
    }
    if let Some(max) = &rules.maximum {
        if above(max) {
            issues.push(ValidationIssue::new(path, format!("must be <= {max}")));
        }
    }
    if let Some(min) = &rules.exclusive_minimum {
        if !above(min) {
            issues.push(ValidationIssue::new(path, format!("must be > {min}")));
        }
    }
    if let Some(max) = &rules.exclusive_maximum {
        if !below(max) {
            issues.push(ValidationIssue::new(path, format!("must be < {max}")));
        }
    }
    if let Some(step) = &rules.multiple_of {
        if !is_multiple(n, step) {
            issues.push(ValidationIssue::new(path, format!("must be a multiple of {step}")));
        }
    }
}

/// Exact value of an integer-valued `Number` stored as `i64` or `u64`.
fn exact(n: &Number) -> Option<i128> {
    n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from))
}

/// Integers compare exactly; `f64` is used only when a float is involved.
fn compare(a: &Number, b: &Number) -> Option<Ordering> {
    match (exact(a), exact(b)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn is_multiple(n: &Number, step: &Number) -> bool {
    match (exact(n), exact(step)) {
        (Some(v), Some(s)) if s > 0 => v % s == 0,
        _ => match (n.as_f64(), step.as_f64()) {
            (Some(v), Some(s)) if s > 0.0 => {
                let quotient = v / s;
                (quotient - quotient.round()).abs() <= 1e-9
            }
            _ => true,
        },
    }
}

fn check_object(rules: &Rules, obj: &Map<String, Value>, path: &str, issues: &mut Vec<ValidationIssue>) {
    for name in &rules.required {
        if !obj.contains_key(name) {
            issues.push(ValidationIssue::new(&child_path(path, name), "is required"));
        }
    }

    for (name, sub) in &rules.properties {
        if let Some(v) = obj.get(name) {
            check_node(sub, v, &child_path(path, name), issues);
        }
    }

    let Some(additional) = &rules.additional else { return };
    for (key, v) in obj {
        if rules.properties.iter().any(|(name, _)| name == key) {
            continue;
        }
        let key_path = child_path(path, key);
        match additional {
            Node::Bool(true) => {}
            Node::Bool(false) => issues.push(ValidationIssue::new(&key_path, "is not allowed")),
            node => check_node(node, v, &key_path, issues),
        }
    }
}

fn check_array(rules: &Rules, items: &[Value], path: &str, issues: &mut Vec<ValidationIssue>) {
    let len = items.len() as u64;
    if let Some(min) = rules.min_items {
        if len < min {
            issues.push(ValidationIssue::new(path, format!("must contain at least {min} items")));
        }
    }
    if let Some(max) = rules.max_items {
        if len > max {
            issues.push(ValidationIssue::new(path, format!("must contain at most {max} items")));
        }
    }
    if rules.unique_items {
        let duplicated = items
            .iter()
            .enumerate()
            .any(|(i, a)| items[..i].iter().any(|b| json_eq(a, b)));
        if duplicated {
            issues.push(ValidationIssue::new(path, "items must be unique"));
        }
    }
    if let Some(item_schema) = &rules.items {
        for (i, item) in items.iter().enumerate() {
            check_node(item_schema, item, &format!("{path}[{i}]"), issues);
        }
    }
}

/// JSON equality where `1` and `1.0` are the same number.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare(x, y).is_some_and(Ordering::is_eq),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| json_eq(v, w)))
        }
        _ => a == b,
    }
}
