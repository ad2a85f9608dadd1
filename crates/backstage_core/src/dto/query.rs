//! Query and batch-operation request shapes.

use crate::dto::validation::{
    is_uuid, read_ids, read_min_int, read_optional_string, read_trashed, Rule, Validate,
    ValidationContext, ValidationErrors, ValidationRejection,
};
use crate::model::{EntityId, Record};
use crate::repo::query::TrashFilter;
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// Trash visibility for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrashMode {
    /// Live and trashed rows.
    All,
    /// Only trashed rows.
    Only,
    /// Only live rows.
    #[default]
    None,
}

impl TrashMode {
    pub const VALUES: &'static [&'static str] = &["all", "only", "none"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "only" => Some(Self::Only),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn filter(self) -> TrashFilter {
        match self {
            Self::All => TrashFilter::Include,
            Self::Only => TrashFilter::Only,
            Self::None => TrashFilter::Exclude,
        }
    }
}

/// Batch delete: `trashed` soft-deletes instead of purging.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteDto {
    pub trashed: Option<bool>,
    pub ids: Vec<EntityId>,
}

impl Validate for DeleteDto {
    fn validate(
        payload: &Record,
        ctx: &ValidationContext<'_>,
    ) -> Result<Self, ValidationRejection> {
        let mut errors = ctx.errors();
        let trashed = read_trashed(payload, "trashed", &mut errors);
        let ids = read_ids(payload, "ids", &mut errors);
        errors.finish(Self { trashed, ids })
    }
}

/// Batch restore of trashed records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RestoreDto {
    pub ids: Vec<EntityId>,
}

impl Validate for RestoreDto {
    fn validate(
        payload: &Record,
        ctx: &ValidationContext<'_>,
    ) -> Result<Self, ValidationRejection> {
        let mut errors = ctx.errors();
        let ids = read_ids(payload, "ids", &mut errors);
        errors.finish(Self { ids })
    }
}

/// Single-record detail query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetailQueryDto {
    pub trashed: Option<bool>,
}

impl Validate for DetailQueryDto {
    fn validate(
        payload: &Record,
        ctx: &ValidationContext<'_>,
    ) -> Result<Self, ValidationRejection> {
        let mut errors = ctx.errors();
        let trashed = read_trashed(payload, "trashed", &mut errors);
        errors.finish(Self { trashed })
    }
}

/// Paged list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQueryDto {
    pub page: u32,
    pub limit: u32,
    pub trashed: TrashMode,
}

impl Default for ListQueryDto {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            trashed: TrashMode::default(),
        }
    }
}

impl Validate for ListQueryDto {
    fn validate(
        payload: &Record,
        ctx: &ValidationContext<'_>,
    ) -> Result<Self, ValidationRejection> {
        let mut errors = ctx.errors();
        let (page, limit) = read_paging(payload, &mut errors);
        let trashed = match payload.get("trashed") {
            None | Some(Value::Null) => TrashMode::default(),
            Some(value) => match value.as_str().and_then(TrashMode::parse) {
                Some(mode) => mode,
                None => {
                    errors.add("trashed", Rule::IsEnum(TrashMode::VALUES));
                    TrashMode::default()
                }
            },
        };
        errors.finish(Self {
            page,
            limit,
            trashed,
        })
    }
}

/// Permission list query, optionally narrowed to one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPermissionDto {
    pub page: u32,
    pub limit: u32,
    pub role: Option<EntityId>,
}

impl Default for QueryPermissionDto {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            role: None,
        }
    }
}

impl Validate for QueryPermissionDto {
    fn validate(
        payload: &Record,
        ctx: &ValidationContext<'_>,
    ) -> Result<Self, ValidationRejection> {
        let mut errors = ctx.errors();
        let (page, limit) = read_paging(payload, &mut errors);

        let mut role = None;
        if let Some(text) = read_optional_string(payload, "role", &mut errors) {
            let well_formed = is_uuid(text);
            if !well_formed {
                errors.add("role", Rule::IsUuid);
            }
            if !ctx.exists("roles", text) {
                errors.add("role", Rule::DataExists { table: "roles" });
            }
            if well_formed {
                role = uuid::Uuid::parse_str(text).ok();
            }
        }

        errors.finish(Self { page, limit, role })
    }
}

fn read_paging(payload: &Record, errors: &mut ValidationErrors) -> (u32, u32) {
    let page = read_min_int(payload, "page", 1, DEFAULT_PAGE, errors);
    let limit = read_min_int(payload, "limit", 1, DEFAULT_LIMIT, errors);
    (page, limit)
}

