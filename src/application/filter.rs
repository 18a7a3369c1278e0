//! Typed list-query description.
//!
//! `FilterSpec` is a closed, typed struct rather than an open predicate map:
//! canonicalization is exhaustive by construction, and the raw-parameter
//! parser fails closed on anything it does not recognize.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::Category;

/// Default page size when a query does not specify one.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("unrecognized query predicate `{name}`")]
    UnknownPredicate { name: String },
    #[error("invalid value `{value}` for predicate `{name}`")]
    InvalidValue { name: String, value: String },
}

/// Fields a listing collection can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    LikeCount,
    CreatedAt,
}

impl SortField {
    pub const ALL: [SortField; 2] = [SortField::LikeCount, SortField::CreatedAt];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LikeCount => "like_count",
            Self::CreatedAt => "created_at",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "like_count" => Some(Self::LikeCount),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Offset pagination. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn is_default(self) -> bool {
        self == Self::default()
    }
}

/// A normalized description of a list query: exact-match predicates, an
/// optional sort, pagination, and the viewer whose personalized fields the
/// result carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub owner: Option<Uuid>,
    pub group: Option<Uuid>,
    pub featured: Option<bool>,
    pub category: Option<Category>,
    pub sort: Option<SortSpec>,
    pub page: PageRequest,
    pub viewer: Option<Uuid>,
}

impl FilterSpec {
    /// True when at least one exact-match predicate is set.
    pub fn has_predicates(&self) -> bool {
        self.owner.is_some()
            || self.group.is_some()
            || self.featured.is_some()
            || self.category.is_some()
    }

    /// Parse raw query pairs into a typed spec.
    ///
    /// Fails closed: an unrecognized predicate name or an unparsable value is
    /// an error, never a silently dropped or mis-keyed predicate. Pair order
    /// does not affect the result.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut spec = Self::default();
        let mut sort_field: Option<SortField> = None;
        let mut sort_direction: Option<SortDirection> = None;

        for (name, value) in pairs {
            match name {
                "owner" => spec.owner = Some(parse_uuid(name, value)?),
                "group" => spec.group = Some(parse_uuid(name, value)?),
                "viewer" => spec.viewer = Some(parse_uuid(name, value)?),
                "featured" => {
                    spec.featured = Some(match value {
                        "true" => true,
                        "false" => false,
                        _ => return Err(invalid(name, value)),
                    })
                }
                "category" => {
                    spec.category = Some(Category::parse(value).ok_or_else(|| invalid(name, value))?)
                }
                "sort" => sort_field = Some(SortField::parse(value).ok_or_else(|| invalid(name, value))?),
                "direction" => {
                    sort_direction =
                        Some(SortDirection::parse(value).ok_or_else(|| invalid(name, value))?)
                }
                "page" => spec.page.page = parse_number(name, value)?,
                "limit" => spec.page.limit = parse_number(name, value)?,
                other => {
                    return Err(FilterError::UnknownPredicate {
                        name: other.to_string(),
                    });
                }
            }
        }

        if let Some(field) = sort_field {
            spec.sort = Some(SortSpec {
                field,
                direction: sort_direction.unwrap_or(SortDirection::Desc),
            });
        } else if sort_direction.is_some() {
            return Err(FilterError::InvalidValue {
                name: "direction".to_string(),
                value: "direction requires sort".to_string(),
            });
        }

        Ok(spec)
    }
}

fn invalid(name: &str, value: &str) -> FilterError {
    FilterError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn parse_uuid(name: &str, value: &str) -> Result<Uuid, FilterError> {
    Uuid::parse_str(value).map_err(|_| invalid(name, value))
}

fn parse_number(name: &str, value: &str) -> Result<u32, FilterError> {
    value.parse::<u32>().map_err(|_| invalid(name, value))
}
