//! Paging and sorting for entity listings.

use crate::record::EntityRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tessera_types::{Error, FieldErrors};

/// Page size bounds applied to [`ListOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Used when the caller gives no page size, or a non-positive one.
    pub default_page_size: u32,
    /// Larger requests are clamped to this.
    pub max_page_size: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl PageLimits {
    /// Clamped `(page, page_size)`: page at least 1, size in `1..=max`.
    #[must_use]
    pub fn clamp(&self, page: Option<i64>, page_size: Option<i64>) -> (u32, u32) {
        let max = self.max_page_size.max(1);
        let page = page
            .filter(|p| *p >= 1)
            .map_or(1, |p| u32::try_from(p).unwrap_or(u32::MAX));
        let page_size = match page_size {
            Some(size) if size >= 1 => u32::try_from(size).unwrap_or(u32::MAX).min(max),
            _ => self.default_page_size.clamp(1, max),
        };
        (page, page_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(format!("must be \"asc\" or \"desc\", got {s:?}"))
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// Listing request. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListOptions {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// `createdAt`, `updatedAt`, `entityId`, or a top-level property declared
    /// by the active schema.
    pub sort_column: Option<String>,
    /// `asc` or `desc`, any case.
    pub sort_order: Option<String>,
    /// Include soft-deleted entities.
    pub include_deleted: bool,
}

impl ListOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: i64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub fn sort_by(mut self, column: impl Into<String>, order: impl Into<String>) -> Self {
        self.sort_column = Some(column.into());
        self.sort_order = Some(order.into());
        self
    }

    #[must_use]
    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }
}

/// What a listing is ordered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SortKey {
    CreatedAt,
    UpdatedAt,
    EntityId,
    /// A declared top-level payload property.
    Property(String),
}

impl SortKey {
    /// Resolves a caller-supplied column against the declared properties.
    fn resolve<'a>(column: &str, mut declared: impl Iterator<Item = &'a str>) -> Option<Self> {
        match column {
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            "updatedAt" | "updated_at" => Some(Self::UpdatedAt),
            "entityId" | "entity_id" => Some(Self::EntityId),
            _ if !is_path_safe(column) => None,
            _ => declared
                .any(|name| name == column)
                .then(|| Self::Property(column.to_string())),
        }
    }

    /// SQL expression to order by. Properties bind their JSON path as `?{param}`.
    pub(crate) fn expression(&self, param: usize) -> String {
        match self {
            Self::CreatedAt => "created_at".to_string(),
            Self::UpdatedAt => "updated_at".to_string(),
            Self::EntityId => "entity_id".to_string(),
            Self::Property(_) => format!("json_extract(payload, ?{param})"),
        }
    }

    /// JSON path bound for a property key.
    pub(crate) fn json_path(&self) -> Option<String> {
        match self {
            Self::Property(name) => Some(format!("$.\"{name}\"")),
            _ => None,
        }
    }
}

/// Whether `name` can be placed verbatim inside a quoted JSON path label.
///
/// SQLite matches a quoted label against the key's raw JSON text, so a name
/// that serializes with escapes (`"`, `\`, control characters) never matches.
fn is_path_safe(name: &str) -> bool {
    !name.chars().any(|c| c == '"' || c == '\\' || c.is_control())
}

/// Options after clamping and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedList {
    pub page: u32,
    pub page_size: u32,
    pub key: SortKey,
    pub order: SortOrder,
    pub include_deleted: bool,
}

impl ResolvedList {
    pub(crate) fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }
}

impl ListOptions {
    /// Clamps paging and checks the sort against the schema's declared
    /// properties. Bad sort column and bad sort order are reported together.
    pub(crate) fn resolve<'a>(
        &self,
        limits: &PageLimits,
        declared: impl Iterator<Item = &'a str>,
    ) -> Result<ResolvedList, Error> {
        let (page, page_size) = limits.clamp(self.page, self.page_size);
        let mut errors = FieldErrors::new();

        let key = match self.sort_column.as_deref().map(str::trim) {
            None | Some("") => SortKey::CreatedAt,
            Some(column) => SortKey::resolve(column, declared).unwrap_or_else(|| {
                errors.push(
                    "sortColumn",
                    format!("cannot sort by {column:?}: not a system column or declared property"),
                );
                SortKey::CreatedAt
            }),
        };

        let order = match self.sort_order.as_deref().map(str::trim) {
            None | Some("") => SortOrder::default(),
            Some(raw) => raw.parse::<SortOrder>().unwrap_or_else(|message: String| {
                errors.push("sortOrder", message);
                SortOrder::default()
            }),
        };

        errors.into_result()?;
        Ok(ResolvedList {
            page,
            page_size,
            key,
            order,
            include_deleted: self.include_deleted,
        })
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPage {
    pub records: Vec<EntityRecord>,
    /// Matching entities across all pages.
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_page_and_size() {
        let limits = PageLimits::default();
        assert_eq!(limits.clamp(None, None), (1, 20));
        assert_eq!(limits.clamp(Some(0), Some(0)), (1, 20));
        assert_eq!(limits.clamp(Some(-3), Some(-1)), (1, 20));
        assert_eq!(limits.clamp(Some(4), Some(500)), (4, 100));
        assert_eq!(limits.clamp(Some(2), Some(100)), (2, 100));
    }

    #[test]
    fn custom_limits() {
        let limits = PageLimits {
            default_page_size: 5,
            max_page_size: 10,
        };
        assert_eq!(limits.clamp(None, None), (1, 5));
        assert_eq!(limits.clamp(None, Some(11)), (1, 10));
    }

    #[test]
    fn sort_order_parses_any_case() {
        assert_eq!("ASC".parse::<SortOrder>(), Ok(SortOrder::Asc));
        assert_eq!("Desc".parse::<SortOrder>(), Ok(SortOrder::Desc));
        assert!("up".parse::<SortOrder>().is_err());
    }

    #[test]
    fn resolves_sort_keys() {
        let declared = ["name", "color"];
        let limits = PageLimits::default();
        let resolve = |column: &str| {
            ListOptions::new()
                .sort_by(column, "asc")
                .resolve(&limits, declared.iter().copied())
                .map(|r| r.key)
        };
        assert_eq!(resolve("created_at"), Ok(SortKey::CreatedAt));
        assert_eq!(resolve("updatedAt"), Ok(SortKey::UpdatedAt));
        assert_eq!(resolve("entity_id"), Ok(SortKey::EntityId));
        assert_eq!(resolve("color"), Ok(SortKey::Property("color".into())));
        assert!(resolve("weight").unwrap_err().field_errors().unwrap().contains("sortColumn"));
    }

    #[test]
    fn escaped_property_names_are_not_sortable() {
        let declared = ["a\\b", "q\"t", "tab\t", "x.y", "é"];
        let limits = PageLimits::default();
        let resolve = |column: &str| {
            ListOptions::new()
                .sort_by(column, "asc")
                .resolve(&limits, declared.iter().copied())
                .map(|r| r.key)
        };
        for column in ["a\\b", "q\"t", "tab\t"] {
            assert!(resolve(column).is_err(), "{column:?} should be rejected");
        }
        assert_eq!(resolve("x.y"), Ok(SortKey::Property("x.y".into())));
        assert_eq!(resolve("é"), Ok(SortKey::Property("é".into())));
    }

    #[test]
    fn reports_bad_column_and_order_together() {
        let err = ListOptions::new()
            .sort_by("nope", "sideways")
            .resolve(&PageLimits::default(), std::iter::empty())
            .unwrap_err();
        let fields: Vec<&str> = err.field_errors().unwrap().fields().collect();
        assert_eq!(fields, vec!["sortColumn", "sortOrder"]);
    }
}
