//! Filter, sort and pagination for the walk listing.
//!
//! A [`WalkQuery`] carries the caller's options, each with a default. It is
//! first resolved into a [`QueryPlan`] (recognised fields only, window
//! computed) and the plan is then rendered as SQL in a fixed order: base set,
//! filter, sort, window.
//!
//! Field names are matched case-insensitively. Unrecognised filter or sort
//! fields are ignored rather than rejected.

use sqlx::{QueryBuilder, Sqlite};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct WalkQuery {
    pub filter_on: Option<String>,
    pub filter_query: Option<String>,
    pub sort_by: Option<String>,
    pub is_ascending: bool,
    pub page: i64,
    pub page_size: i64,
    /// Optional ceiling applied to `page_size`.
    pub max_page_size: Option<i64>,
}

impl Default for WalkQuery {
    fn default() -> Self {
        Self {
            filter_on: None,
            filter_query: None,
            sort_by: None,
            is_ascending: true,
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Name,
}

impl FilterField {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().eq_ignore_ascii_case("name") {
            Some(FilterField::Name)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Length,
}

impl SortField {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("name") {
            Some(SortField::Name)
        } else if raw.eq_ignore_ascii_case("length") {
            Some(SortField::Length)
        } else {
            None
        }
    }

    fn column(self) -> &'static str {
        match self {
            SortField::Name => "w.name",
            SortField::Length => "w.length_in_km",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Case-sensitive substring match on the stored name.
    NameContains(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub ascending: bool,
}

/// Offset/limit window. Both are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: i64,
    pub take: i64,
}

impl Window {
    /// `skip = (page - 1) * take`. A page below 1 starts at the first row and a
    /// negative size takes nothing.
    pub fn new(page: i64, page_size: i64, max_page_size: Option<i64>) -> Self {
        let mut take = page_size.max(0);
        if let Some(max) = max_page_size {
            take = take.min(max.max(0));
        }
        let skip = page.saturating_sub(1).max(0).saturating_mul(take);
        Window { skip, take }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub filter: Option<Filter>,
    pub sort: Option<Sort>,
    pub window: Window,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

impl WalkQuery {
    pub fn plan(&self) -> QueryPlan {
        let filter = match (non_blank(&self.filter_on), non_blank(&self.filter_query)) {
            (Some(field), Some(value)) => match FilterField::parse(field) {
                Some(FilterField::Name) => Some(Filter::NameContains(value.to_string())),
                None => None,
            },
            _ => None,
        };

        let sort = non_blank(&self.sort_by)
            .and_then(SortField::parse)
            .map(|field| Sort { field, ascending: self.is_ascending });

        QueryPlan { filter, sort, window: Window::new(self.page, self.page_size, self.max_page_size) }
    }
}

/// Selects walks joined with their difficulty and region.
pub const WALK_BASE_SELECT: &str = "SELECT w.id, w.name, w.description, w.length_in_km, w.walk_image_url, \
     w.difficulty_id, w.region_id, \
     d.name AS difficulty_name, \
     r.code AS region_code, r.name AS region_name, r.region_image_url AS region_image_url \
     FROM walks w \
     JOIN difficulties d ON d.id = w.difficulty_id \
     JOIN regions r ON r.id = w.region_id";

impl QueryPlan {
    /// Renders the plan on top of [`WALK_BASE_SELECT`].
    pub fn build(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new(WALK_BASE_SELECT);

        if let Some(Filter::NameContains(value)) = &self.filter {
            // instr() is case-sensitive; LIKE would fold ASCII case.
            qb.push(" WHERE instr(w.name, ").push_bind(value.clone()).push(") > 0");
        }

        match self.sort {
            Some(sort) => {
                qb.push(" ORDER BY ").push(sort.field.column()).push(if sort.ascending { " ASC" } else { " DESC" });
            }
            // store order, made explicit so paging is stable
            None => {
                qb.push(" ORDER BY w.rowid");
            }
        }

        qb.push(" LIMIT ").push_bind(self.window.take).push(" OFFSET ").push_bind(self.window.skip);
        qb
    }
}
