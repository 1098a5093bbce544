//! Book records, catalog hits and the wire types of the collection API.
//!
//! Server payloads are deserialized leniently: an unknown or empty status is
//! treated as unset, a null or zero rating as "no rating". Missing authors,
//! covers and years are rendered as placeholders by the views, never as errors.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Catalog keys starting with this prefix belong to manually entered books.
pub const MANUAL_KEY_PREFIX: &str = "manual_";

/// Placeholder shown when a record carries no author.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

// ── Reading status ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    WantToRead,
    Reading,
    Finished,
    DidNotFinish,
}

impl ReadingStatus {
    /// All variants in display order.
    pub const ALL: [ReadingStatus; 4] = [
        Self::WantToRead,
        Self::Reading,
        Self::Finished,
        Self::DidNotFinish,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WantToRead => "want_to_read",
            Self::Reading => "reading",
            Self::Finished => "finished",
            Self::DidNotFinish => "did_not_finish",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::WantToRead => "Want to read",
            Self::Reading => "Currently reading",
            Self::Finished => "Finished",
            Self::DidNotFinish => "Didn't finish",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// Cycle forward through `None → WantToRead → … → DidNotFinish → None`.
    pub fn cycle_next(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(Self::WantToRead),
            Some(Self::WantToRead) => Some(Self::Reading),
            Some(Self::Reading) => Some(Self::Finished),
            Some(Self::Finished) => Some(Self::DidNotFinish),
            Some(Self::DidNotFinish) => None,
        }
    }

    /// Cycle backward, the inverse of [`ReadingStatus::cycle_next`].
    pub fn cycle_prev(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(Self::DidNotFinish),
            Some(Self::WantToRead) => None,
            Some(Self::Reading) => Some(Self::WantToRead),
            Some(Self::Finished) => Some(Self::Reading),
            Some(Self::DidNotFinish) => Some(Self::Finished),
        }
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<Option<ReadingStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(ReadingStatus::parse))
}

// ── Rating ───────────────────────────────────────────────────────────────────

/// A star rating in half steps. Zero means "no rating".
///
/// Stored as a count of half stars (0..=10) so ratings compare exactly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rating(u8);

impl Rating {
    pub const NONE: Rating = Rating(0);
    pub const MAX_HALF_STEPS: u8 = 10;

    pub fn from_half_steps(steps: u8) -> Option<Self> {
        (steps <= Self::MAX_HALF_STEPS).then_some(Self(steps))
    }

    /// Strict constructor: only `0` and multiples of 0.5 in `[0.5, 5]`.
    pub fn new(stars: f64) -> Option<Self> {
        let doubled = stars * 2.0;
        if !doubled.is_finite() || doubled.fract() != 0.0 {
            return None;
        }
        if !(0.0..=f64::from(Self::MAX_HALF_STEPS)).contains(&doubled) {
            return None;
        }
        Some(Self(doubled as u8))
    }

    /// Lenient conversion for server data: snaps to the nearest half star.
    pub fn snap(stars: f64) -> Self {
        if !stars.is_finite() {
            return Self::NONE;
        }
        let doubled = (stars * 2.0).round().clamp(0.0, f64::from(Self::MAX_HALF_STEPS));
        Self(doubled as u8)
    }

    pub fn half_steps(self) -> u8 {
        self.0
    }

    pub fn stars(self) -> f64 {
        f64::from(self.0) / 2.0
    }

    pub fn is_set(self) -> bool {
        self.0 > 0
    }

    /// Half a star more, saturating at five stars.
    pub fn step_up(self) -> Self {
        Self((self.0 + 1).min(Self::MAX_HALF_STEPS))
    }

    /// Half a star less, saturating at "no rating".
    pub fn step_down(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    /// Compact star glyphs, e.g. `★★★½`. Empty when unset.
    pub fn glyphs(self) -> String {
        let mut out = "★".repeat(usize::from(self.0 / 2));
        if self.0 % 2 == 1 {
            out.push('½');
        }
        out
    }

    pub fn description(self) -> &'static str {
        match self.0 {
            0 => "No rating",
            1 => "One of the worst I've read",
            2 => "I hated this book",
            3 => "Occasional sections that were enjoyable",
            4 => "Boring, hard to finish; wouldn't recommend",
            5 => "Some good parts",
            6 => "Average; I liked it okay",
            7 => "Better than average, but not great",
            8 => "Very good & well written; I enjoyed it",
            9 => "Great writing and plot",
            _ => "Amazing; I couldn't put it down",
        }
    }

    /// `4.5 stars - Great writing and plot`, or `No rating`.
    pub fn caption(self) -> String {
        if !self.is_set() {
            return self.description().to_string();
        }
        let plural = if self.0 == 2 { "" } else { "s" };
        format!("{} star{plural} - {}", self, self.description())
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 2 == 0 {
            write!(f, "{}", self.0 / 2)
        } else {
            write!(f, "{}.5", self.0 / 2)
        }
    }
}

impl Serialize for Rating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 2 == 0 {
            serializer.serialize_u64(u64::from(self.0 / 2))
        } else {
            serializer.serialize_f64(self.stars())
        }
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<f64> = Option::deserialize(deserializer)?;
        Ok(raw.map(Rating::snap).unwrap_or_default())
    }
}

// ── Book record ──────────────────────────────────────────────────────────────

/// A book saved in the collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub first_publish_year: Option<i32>,
    #[serde(default, rename = "openlibrary_key")]
    pub catalog_key: Option<String>,
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: Option<ReadingStatus>,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default)]
    pub cover_id: Option<i64>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub added_at: Option<String>,
}

impl BookRecord {
    pub fn is_manual(&self) -> bool {
        self.catalog_key
            .as_deref()
            .map_or(true, |k| k.starts_with(MANUAL_KEY_PREFIX))
    }

    /// Catalog key to look a summary up with, if the record has real catalog backing.
    pub fn summary_key(&self) -> Option<&str> {
        summary_key(self.catalog_key.as_deref())
    }

    pub fn author_display(&self) -> &str {
        self.author_name
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(UNKNOWN_AUTHOR)
    }

    pub fn added_at(&self) -> Option<DateTime<Utc>> {
        self.added_at.as_deref().and_then(parse_timestamp)
    }
}

/// Server timestamps are `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Returns the key when it points at a real catalog work.
pub fn summary_key(key: Option<&str>) -> Option<&str> {
    key.map(str::trim)
        .filter(|k| !k.is_empty() && !k.starts_with(MANUAL_KEY_PREFIX))
}

/// "today", "3 days ago", "2 months ago" …
pub fn relative_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - then).num_days().abs();
    let unit = |n: i64, word: &str| {
        if n > 1 {
            format!("{n} {word}s ago")
        } else {
            format!("{n} {word} ago")
        }
    };
    match days {
        0 => "today".to_string(),
        1 => "yesterday".to_string(),
        2..=6 => format!("{days} days ago"),
        7..=29 => unit(days / 7, "week"),
        30..=364 => unit(days / 30, "month"),
        _ => unit(days / 365, "year"),
    }
}

// ── Catalog ──────────────────────────────────────────────────────────────────

/// A transient search result from the external catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author_name: Vec<String>,
    #[serde(default)]
    pub first_publish_year: Option<i32>,
    #[serde(default)]
    pub cover_i: Option<i64>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub isbn: Vec<String>,
}

impl CatalogHit {
    /// Authors joined for display, `None` when the hit lists none.
    pub fn authors(&self) -> Option<String> {
        if self.author_name.is_empty() {
            None
        } else {
            Some(self.author_name.join(", "))
        }
    }
}

// ── Cover references ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoverSize {
    Small,
    Medium,
}

/// `{base}/b/id/{id}-M.jpg`
pub fn cover_url(base: &str, cover_id: i64, size: CoverSize) -> String {
    let suffix = match size {
        CoverSize::Small => "S",
        CoverSize::Medium => "M",
    };
    format!("{}/b/id/{cover_id}-{suffix}.jpg", base.trim_end_matches('/'))
}

// ── Filters & pages ──────────────────────────────────────────────────────────

/// Filter snapshot the feed was fetched under.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Filters {
    pub search: String,
    pub status: Option<ReadingStatus>,
}

impl Filters {
    pub fn is_active(&self) -> bool {
        !self.search.is_empty() || self.status.is_some()
    }
}

/// Query for one page of the collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: usize,
    pub offset: usize,
    pub filters: Filters,
}

impl PageQuery {
    /// Query-string pairs; empty filters are omitted.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
        ];
        if !self.filters.search.is_empty() {
            params.push(("search", self.filters.search.clone()));
        }
        if let Some(status) = self.filters.status {
            params.push(("status", status.as_str().to_string()));
        }
        params
    }
}

/// One page of the collection list endpoint.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BookPage {
    #[serde(default)]
    pub books: Vec<BookRecord>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub total: Option<usize>,
}

// ── Write payloads ───────────────────────────────────────────────────────────

/// Body of the create call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewBook {
    pub title: String,
    pub author_name: String,
    pub first_publish_year: Option<i32>,
    pub status: ReadingStatus,
    pub rating: Rating,
    #[serde(flatten)]
    pub source: BookSource,
}

/// Where a new record comes from: catalog metadata or the manual-entry flag.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BookSource {
    Catalog {
        key: String,
        cover_i: Option<i64>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        isbn: Vec<String>,
    },
    Manual {
        manual: bool,
    },
}

impl BookSource {
    pub fn manual() -> Self {
        Self::Manual { manual: true }
    }
}

/// Body of the update call. Title, author and year are immutable after creation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BookUpdate {
    pub status: ReadingStatus,
    pub rating: Rating,
}
