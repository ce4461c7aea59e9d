//! Turns list/search request parameters into a store-agnostic query.

use chrono::{DateTime, Utc};

use crate::models::timestamp;
use crate::services::validation::ValidationError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;
pub const SEARCH_LIMIT: i64 = 20;

/// Filter value that disables a filter.
pub const ALL: &str = "all";

/// Document fields the free-text match looks at.
pub const TEXT_SEARCH_FIELDS: [&str; 3] = ["customerName", "carDetails.make", "carDetails.model"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Dotted document path, e.g. `price` or `carDetails.make`.
    pub field: String,
    pub direction: Direction,
}

impl SortKey {
    pub fn ascending(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Ascending,
        }
    }

    pub fn descending(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Descending,
        }
    }

    /// `price` sorts ascending, `-price` descending. Empty entries and
    /// names outside `[A-Za-z0-9_.]` yield `None`.
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        let (field, direction) = match entry.strip_prefix('-') {
            Some(rest) => (rest, Direction::Descending),
            None => (entry, Direction::Ascending),
        };
        if !is_field_path(field) {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            direction,
        })
    }
}

fn is_field_path(field: &str) -> bool {
    !field.is_empty()
        && field.split('.').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Parses sort entries, each of which may itself be comma-joined. A field
/// named twice keeps its first position and its last direction.
pub fn parse_sort<'a, I>(entries: I) -> Vec<SortKey>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut keys: Vec<SortKey> = Vec::new();
    for entry in entries.into_iter().flat_map(|e| e.split(',')) {
        let Some(key) = SortKey::parse(entry) else {
            if !entry.trim().is_empty() {
                tracing::debug!(entry, "ignoring unusable sort entry");
            }
            continue;
        };
        match keys.iter_mut().find(|k| k.field == key.field) {
            Some(existing) => existing.direction = key.direction,
            None => keys.push(key),
        }
    }
    keys
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Exact text match on a document field.
    Equals { field: &'static str, value: String },
    /// Inclusive time range; either bound may be open.
    Between {
        field: &'static str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    },
    /// Case-insensitive substring match on any of the fields.
    ContainsAny {
        fields: &'static [&'static str],
        needle: String,
    },
}

/// Clauses combined with AND. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub clauses: Vec<Clause>,
}

impl Filter {
    pub fn text_search(needle: &str) -> Self {
        Self {
            clauses: vec![Clause::ContainsAny {
                fields: &TEXT_SEARCH_FIELDS,
                needle: needle.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindSpec {
    pub filter: Filter,
    /// Primary key first. Empty means store insertion order.
    pub sort: Vec<SortKey>,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub find: FindSpec,
    pub page: i64,
    pub page_size: i64,
}

/// Raw list parameters, as received.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub q: Option<String>,
    pub service_type: Option<String>,
    pub car_type: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    /// `None` when no `sort` parameter was sent at all.
    pub sort: Option<Vec<String>>,
}

impl ListParams {
    /// Collects parameters from query-string pairs in order. Repeated
    /// `sort` values accumulate; for other names the last one wins.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut params = Self::default();
        for (name, value) in pairs {
            let value = value.clone();
            match name.as_str() {
                "page" => params.page = Some(value),
                "pageSize" => params.page_size = Some(value),
                "q" => params.q = Some(value),
                "serviceType" => params.service_type = Some(value),
                "carType" => params.car_type = Some(value),
                "status" => params.status = Some(value),
                "dateFrom" => params.date_from = Some(value),
                "dateTo" => params.date_to = Some(value),
                "sort" => params.sort.get_or_insert_with(Vec::new).push(value),
                _ => {}
            }
        }
        params
    }
}

/// Reads an optional sign and the digits that follow, ignoring the rest:
/// `"2abc"` -> 2, `"8.9"` -> 8, `"abc"` -> `None`. Overlong values saturate.
fn leading_int(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let (negative, rest) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return None;
    }
    let value = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

pub fn paginate(page: Option<&str>, page_size: Option<&str>) -> (i64, i64) {
    let parse = |raw: Option<&str>| raw.and_then(leading_int);
    let page = parse(page).unwrap_or(DEFAULT_PAGE).max(1);
    let page_size = parse(page_size)
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    (page, page_size)
}

fn active(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty() && *v != ALL)
}

fn date_bound(raw: &Option<String>, param: &str) -> Result<Option<DateTime<Utc>>, ValidationError> {
    match raw.as_deref().filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => timestamp::parse_lenient(v)
            .map(Some)
            .ok_or_else(|| ValidationError::single(param, "expected a date")),
    }
}

pub fn build_filter(params: &ListParams) -> Result<Filter, ValidationError> {
    let mut clauses = Vec::new();

    if let Some(service) = active(&params.service_type) {
        clauses.push(Clause::Equals {
            field: "serviceType",
            value: service.to_string(),
        });
    }
    if let Some(car_type) = active(&params.car_type) {
        clauses.push(Clause::Equals {
            field: "carDetails.type",
            value: car_type.to_string(),
        });
    }
    if let Some(status) = active(&params.status) {
        clauses.push(Clause::Equals {
            field: "status",
            value: status.to_string(),
        });
    }

    let from = date_bound(&params.date_from, "dateFrom")?;
    let to = date_bound(&params.date_to, "dateTo")?;
    if from.is_some() || to.is_some() {
        clauses.push(Clause::Between {
            field: "date",
            from,
            to,
        });
    }

    if let Some(q) = params.q.as_deref().filter(|q| !q.is_empty()) {
        clauses.extend(Filter::text_search(q).clauses);
    }

    Ok(Filter { clauses })
}

pub fn build_list_query(params: &ListParams) -> Result<ListQuery, ValidationError> {
    let (page, page_size) = paginate(params.page.as_deref(), params.page_size.as_deref());
    let filter = build_filter(params)?;
    let sort = match &params.sort {
        Some(entries) => parse_sort(entries.iter().map(String::as_str)),
        None => vec![SortKey::descending("date")],
    };

    Ok(ListQuery {
        find: FindSpec {
            filter,
            sort,
            skip: (page - 1).saturating_mul(page_size),
            limit: page_size,
        },
        page,
        page_size,
    })
}

/// `None` for an empty query: there is nothing to look up.
pub fn build_search_query(q: Option<&str>) -> Option<FindSpec> {
    let q = q.filter(|q| !q.is_empty())?;
    Some(FindSpec {
        filter: Filter::text_search(q),
        sort: Vec::new(),
        skip: 0,
        limit: SEARCH_LIMIT,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn list(raw: &[(&str, &str)]) -> ListQuery {
        build_list_query(&ListParams::from_pairs(&pairs(raw))).unwrap()
    }

    #[test]
    fn test_defaults() {
        let query = list(&[]);
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 10);
        assert_eq!(query.find.skip, 0);
        assert_eq!(query.find.limit, 10);
        assert!(query.find.filter.clauses.is_empty());
        assert_eq!(query.find.sort, vec![SortKey::descending("date")]);
    }

    #[test]
    fn test_pagination_clamped() {
        assert_eq!(paginate(Some("0"), Some("500")), (1, 50));
        assert_eq!(paginate(Some("-3"), Some("0")), (1, 1));
        assert_eq!(paginate(Some("abc"), Some("")), (1, 10));
        assert_eq!(paginate(Some("2"), Some("8")), (2, 8));
        assert_eq!(paginate(Some("2abc"), Some("8.9")), (2, 8));
        assert_eq!(paginate(Some(" +4"), Some("-")), (4, 10));
        assert_eq!(paginate(Some("99999999999999999999"), None).0, i64::MAX);

        let query = list(&[("page", "3"), ("pageSize", "8")]);
        assert_eq!(query.find.skip, 16);
        assert_eq!(query.find.limit, 8);
    }

    #[test]
    fn test_all_sentinel_and_empty_values_skip_filters() {
        let query = list(&[
            ("serviceType", "all"),
            ("carType", ""),
            ("status", "all"),
            ("q", ""),
        ]);
        assert!(query.find.filter.clauses.is_empty());
    }

    #[test]
    fn test_equality_filters() {
        let query = list(&[
            ("serviceType", "Premium Wash"),
            ("carType", "suv"),
            ("status", "Confirmed"),
        ]);
        assert_eq!(
            query.find.filter.clauses,
            vec![
                Clause::Equals {
                    field: "serviceType",
                    value: "Premium Wash".to_string()
                },
                Clause::Equals {
                    field: "carDetails.type",
                    value: "suv".to_string()
                },
                Clause::Equals {
                    field: "status",
                    value: "Confirmed".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_date_range_bounds_independent() {
        let query = list(&[("dateTo", "2024-01-31")]);
        assert_eq!(
            query.find.filter.clauses,
            vec![Clause::Between {
                field: "date",
                from: None,
                to: timestamp::parse_lenient("2024-01-31"),
            }]
        );
    }

    #[test]
    fn test_bad_date_bound_rejected() {
        let params = ListParams::from_pairs(&pairs(&[("dateFrom", "yesterday")]));
        let err = build_list_query(&params).unwrap_err();
        assert!(err.fields.contains_key("dateFrom"));
    }

    #[test]
    fn test_free_text_clause() {
        let query = list(&[("q", "civic")]);
        assert_eq!(
            query.find.filter.clauses,
            vec![Clause::ContainsAny {
                fields: &TEXT_SEARCH_FIELDS,
                needle: "civic".to_string()
            }]
        );
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!(
            parse_sort(["-price,customerName", "", "-date"]),
            vec![
                SortKey::descending("price"),
                SortKey::ascending("customerName"),
                SortKey::descending("date"),
            ]
        );
        assert_eq!(
            parse_sort(["date,,-duration,carDetails.make"]),
            vec![
                SortKey::ascending("date"),
                SortKey::descending("duration"),
                SortKey::ascending("carDetails.make"),
            ]
        );
    }

    #[test]
    fn test_sort_repeated_field_keeps_position() {
        assert_eq!(
            parse_sort(["price,date,-price"]),
            vec![SortKey::descending("price"), SortKey::ascending("date")]
        );
    }

    #[test]
    fn test_sort_skips_unsafe_names() {
        assert_eq!(
            parse_sort(["price') DESC; --", "-", "a..b", "ok"]),
            vec![SortKey::ascending("ok")]
        );
    }

    #[test]
    fn test_repeated_sort_params_accumulate() {
        let query = list(&[("sort", "-price"), ("sort", "date")]);
        assert_eq!(
            query.find.sort,
            vec![SortKey::descending("price"), SortKey::ascending("date")]
        );
    }

    #[test]
    fn test_present_but_empty_sort_means_natural_order() {
        let query = list(&[("sort", "")]);
        assert!(query.find.sort.is_empty());
    }

    #[test]
    fn test_search_query() {
        assert_eq!(build_search_query(None), None);
        assert_eq!(build_search_query(Some("")), None);

        let spec = build_search_query(Some("ana")).unwrap();
        assert_eq!(spec.limit, 20);
        assert_eq!(spec.skip, 0);
        assert!(spec.sort.is_empty());
        assert_eq!(spec.filter, Filter::text_search("ana"));
    }
}
