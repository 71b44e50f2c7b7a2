use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::pickup::{CourierId, PickupRequest, PickupStatus};
use crate::models::totals::TotalsWindow;
use crate::models::waste::WasteItem;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;
pub const MIN_SEARCH_CHARS: usize = 2;
pub const NAME_MATCH_LIMIT: u32 = 50;

/// Raw list parameters as they arrive from the transport layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub courier_id: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct QuerySettings {
    /// Reject searches below [`MIN_SEARCH_CHARS`] instead of ignoring them.
    pub strict_search: bool,
    /// Offset used to anchor plain dates to instants.
    pub utc_offset: FixedOffset,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            strict_search: false,
            utc_offset: Utc.fix(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    PickupDate,
    PickupStatus,
    PickupAddress,
}

impl FromStr for SortField {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "pickup_date" => Ok(SortField::PickupDate),
            "pickup_status" => Ok(SortField::PickupStatus),
            "pickup_address" => Ok(SortField::PickupAddress),
            other => Err(AppError::InvalidSort(format!(
                "sort_by must be one of pickup_date, pickup_status, pickup_address (got '{other}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(AppError::InvalidSort(format!(
                "order must be asc or desc (got '{raw}')"
            ))),
        }
    }
}

/// Row predicate shared by list queries and counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickupFilter {
    pub courier_id: Option<CourierId>,
    pub status: Option<PickupStatus>,
    /// Inclusive lower bound on `requested_at`.
    pub requested_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `requested_at`.
    pub requested_until: Option<DateTime<Utc>>,
    pub created_within: Option<TotalsWindow>,
    /// Case-insensitive substring of the address, already trimmed.
    pub search: Option<String>,
}

impl PickupFilter {
    pub fn matches(&self, pickup: &PickupRequest) -> bool {
        if self.courier_id.is_some() && pickup.courier_id != self.courier_id {
            return false;
        }
        if self.status.is_some_and(|status| status != pickup.status) {
            return false;
        }
        if self.requested_from.is_some_and(|from| pickup.requested_at < from) {
            return false;
        }
        if self.requested_until.is_some_and(|until| pickup.requested_at >= until) {
            return false;
        }
        if self
            .created_within
            .is_some_and(|window| !window.contains(pickup.created_at))
        {
            return false;
        }
        match &self.search {
            Some(needle) => pickup
                .address
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickupQuery {
    pub filter: PickupFilter,
    pub sort_by: SortField,
    pub order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl PickupQuery {
    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn take(&self) -> u64 {
        u64::from(self.limit)
    }

    /// Ordering of two rows under this query's sort. Ties fall back to id.
    pub fn compare(&self, a: &PickupRequest, b: &PickupRequest) -> Ordering {
        let primary = match self.sort_by {
            SortField::PickupDate => a.requested_at.cmp(&b.requested_at),
            SortField::PickupStatus => a.status.as_str().cmp(b.status.as_str()),
            SortField::PickupAddress => a.address.to_lowercase().cmp(&b.address.to_lowercase()),
        }
        .then_with(|| a.id.cmp(&b.id));

        match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        }
    }
}

/// Turns raw list parameters into a validated query. Performs no I/O.
pub fn build_query(params: &ListParams, settings: &QuerySettings) -> Result<PickupQuery, AppError> {
    let courier_id = present(&params.courier_id)
        .map(|raw| parse_courier_id(raw).map_err(AppError::InvalidFilter))
        .transpose()?;

    let status = present(&params.status)
        .map(|raw| {
            raw.parse::<PickupStatus>()
                .map_err(|err| AppError::InvalidFilter(err.to_string()))
        })
        .transpose()?;

    let (requested_from, requested_until) = parse_date_range(
        present(&params.start_date),
        present(&params.end_date),
        settings.utc_offset,
    )?;

    let search = parse_search(params.search.as_deref(), settings.strict_search)?;

    let sort_by = present(&params.sort_by)
        .map(str::parse::<SortField>)
        .transpose()?
        .unwrap_or_default();
    let order = present(&params.order)
        .map(str::parse::<SortOrder>)
        .transpose()?
        .unwrap_or_default();

    let page = parse_bounded("page", present(&params.page), DEFAULT_PAGE, 1, u32::MAX)?;
    let limit = parse_bounded("limit", present(&params.limit), DEFAULT_LIMIT, 1, MAX_LIMIT)?;

    Ok(PickupQuery {
        filter: PickupFilter {
            courier_id,
            status,
            requested_from,
            requested_until,
            created_within: None,
            search,
        },
        sort_by,
        order,
        page,
        limit,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WasteListParams {
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WasteFilter {
    /// Case-insensitive substring of the waste name, already trimmed.
    pub search: Option<String>,
}

impl WasteFilter {
    pub fn matches(&self, waste: &WasteItem) -> bool {
        match &self.search {
            Some(needle) => waste.name.to_lowercase().contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

/// Waste catalog page, always ordered by name ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct WasteQuery {
    pub filter: WasteFilter,
    pub page: u32,
    pub limit: u32,
}

impl WasteQuery {
    /// First [`NAME_MATCH_LIMIT`] wastes whose name contains `name`.
    pub fn by_name(name: &str) -> Self {
        Self {
            filter: WasteFilter {
                search: Some(name.trim().to_string()),
            },
            page: 1,
            limit: NAME_MATCH_LIMIT,
        }
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn take(&self) -> u64 {
        u64::from(self.limit)
    }

    pub fn compare(a: &WasteItem, b: &WasteItem) -> Ordering {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    }
}

pub fn build_waste_query(
    params: &WasteListParams,
    settings: &QuerySettings,
) -> Result<WasteQuery, AppError> {
    let search = parse_search(params.search.as_deref(), settings.strict_search)?;
    let page = parse_bounded("page", present(&params.page), DEFAULT_PAGE, 1, u32::MAX)?;
    let limit = parse_bounded("limit", present(&params.limit), DEFAULT_LIMIT, 1, MAX_LIMIT)?;

    Ok(WasteQuery {
        filter: WasteFilter { search },
        page,
        limit,
    })
}

pub fn parse_courier_id(raw: &str) -> Result<CourierId, String> {
    match raw.trim().parse::<CourierId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(format!("courier id must be a positive integer (got '{raw}')")),
    }
}

/// Parses an optional `[start, end]` pair into instant bounds, the upper one exclusive.
///
/// Both ends are inclusive for the caller: a plain end date includes that whole
/// day and a timestamp end includes that exact instant.
pub fn parse_date_range(
    start: Option<&str>,
    end: Option<&str>,
    offset: FixedOffset,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), AppError> {
    let start = start.map(|raw| DateBound::parse("start_date", raw, offset)).transpose()?;
    let end = end.map(|raw| DateBound::parse("end_date", raw, offset)).transpose()?;

    if let (Some(start), Some(end)) = (&start, &end) {
        if start.instant >= end.instant {
            return Err(AppError::InvalidDateRange(
                "start_date must be before end_date".to_string(),
            ));
        }
    }

    let until = end.map(|bound| bound.exclusive_end()).transpose()?;
    Ok((start.map(|bound| bound.instant), until))
}

#[derive(Debug, Clone, Copy)]
struct DateBound {
    instant: DateTime<Utc>,
    whole_day: bool,
}

impl DateBound {
    fn parse(field: &str, raw: &str, offset: FixedOffset) -> Result<Self, AppError> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            let instant = offset
                .from_local_datetime(&date.and_time(NaiveTime::MIN))
                .single()
                .ok_or_else(|| AppError::InvalidDateRange(format!("{field} is out of range")))?;
            return Ok(Self {
                instant: instant.with_timezone(&Utc),
                whole_day: true,
            });
        }

        DateTime::parse_from_rfc3339(raw)
            .map(|instant| Self {
                instant: instant.with_timezone(&Utc),
                whole_day: false,
            })
            .map_err(|_| {
                AppError::InvalidDateRange(format!(
                    "{field} must be YYYY-MM-DD or an RFC 3339 timestamp (got '{raw}')"
                ))
            })
    }

    /// First instant past the bound: the next local midnight for a plain date,
    /// one nanosecond later for a timestamp.
    fn exclusive_end(&self) -> Result<DateTime<Utc>, AppError> {
        let step = if self.whole_day {
            Duration::days(1)
        } else {
            Duration::nanoseconds(1)
        };
        self.instant
            .checked_add_signed(step)
            .ok_or_else(|| AppError::InvalidDateRange("end_date is out of range".to_string()))
    }
}

fn parse_search(raw: Option<&str>, strict: bool) -> Result<Option<String>, AppError> {
    let Some(trimmed) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    if trimmed.chars().count() < MIN_SEARCH_CHARS {
        if strict {
            return Err(AppError::InvalidSearchQuery(format!(
                "search must be at least {MIN_SEARCH_CHARS} characters"
            )));
        }
        return Ok(None);
    }

    Ok(Some(trimmed.to_string()))
}

fn parse_bounded(
    field: &str,
    raw: Option<&str>,
    default: u32,
    min: u32,
    max: u32,
) -> Result<u32, AppError> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    match raw.trim().parse::<u32>() {
        Ok(value) if (min..=max).contains(&value) => Ok(value),
        _ => Err(AppError::InvalidPagination(format!(
            "{field} must be an integer between {min} and {max} (got '{raw}')"
        ))),
    }
}

pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
