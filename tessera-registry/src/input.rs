//! Create requests and the structural checks run before touching the space.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_schema::{CompiledSchema, SemVer};
use tessera_types::{CategoryId, FieldErrors, SchemaId};

/// Longest accepted table name.
pub const MAX_TABLE_NAME_LEN: usize = 63;

/// Request to create a schema version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchemaInput {
    /// Existing schema to add a version to. When absent the schema is looked
    /// up by slug, or a new one is minted.
    #[serde(default)]
    pub schema_id: Option<SchemaId>,
    /// Explicit `MAJOR.MINOR.PATCH`. When absent the next patch is used.
    #[serde(default)]
    pub version: Option<String>,
    pub definition: Value,
    pub table_name: String,
    pub slug: String,
    pub category_id: CategoryId,
}

impl CreateSchemaInput {
    pub fn new(
        definition: Value,
        table_name: impl Into<String>,
        slug: impl Into<String>,
        category_id: impl Into<CategoryId>,
    ) -> Self {
        Self {
            schema_id: None,
            version: None,
            definition,
            table_name: table_name.into(),
            slug: slug.into(),
            category_id: category_id.into(),
        }
    }

    #[must_use]
    pub fn with_schema_id(mut self, schema_id: SchemaId) -> Self {
        self.schema_id = Some(schema_id);
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Runs every check that needs no stored state, collecting all failures.
    pub(crate) fn check(&self) -> Result<Checked, FieldErrors> {
        let mut errors = FieldErrors::new();

        if !is_valid_table_name(&self.table_name) {
            errors.push(
                "tableName",
                format!(
                    "must match ^[a-z][a-z0-9_]*$ and be at most {MAX_TABLE_NAME_LEN} characters"
                ),
            );
        }

        let slug = normalize_slug(&self.slug);
        if slug.is_empty() {
            errors.push("slug", "must contain at least one letter or digit");
        }

        match &self.definition {
            Value::Object(map) if !map.is_empty() => {
                if let Err(e) = CompiledSchema::compile(&self.definition) {
                    for issue in e.issues {
                        errors.push("definition", issue.to_string());
                    }
                }
            }
            _ => errors.push("definition", "must be a non-empty JSON object"),
        }

        if self.category_id.is_blank() {
            errors.push("categoryId", "is required");
        }

        let version = match self.version.as_deref().map(SemVer::parse).transpose() {
            Ok(version) => version,
            Err(e) => {
                errors.push("version", e.to_string());
                None
            }
        };

        if errors.is_empty() {
            Ok(Checked { slug, version })
        } else {
            Err(errors)
        }
    }
}

/// Normalized values produced by [`CreateSchemaInput::check`].
#[derive(Debug)]
pub(crate) struct Checked {
    pub slug: String,
    pub version: Option<SemVer>,
}

/// True for `^[a-z][a-z0-9_]*$` names of at most [`MAX_TABLE_NAME_LEN`] bytes.
#[must_use]
pub fn is_valid_table_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    match bytes.first() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    bytes.len() <= MAX_TABLE_NAME_LEN
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'_')
}

/// Kebab-case form of `raw`: lowercased, each run of characters outside
/// `[a-z0-9]` collapsed to one `-`, no leading or trailing `-`.
///
/// Returns an empty string when nothing usable remains.
#[must_use]
pub fn normalize_slug(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut gap = false;
    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if gap && !slug.is_empty() {
                slug.push('-');
            }
            gap = false;
            slug.push(c);
        } else {
            gap = true;
        }
    }
    slug
}
