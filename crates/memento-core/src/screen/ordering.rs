//! List ordering policies for the photo gallery.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::MediaRecord;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Newest first; records without a timestamp sort as oldest.
    #[default]
    Date,
    /// Case-insensitive ascending; unnamed records go last in input order.
    Name,
}

impl SortOrder {
    /// Sort `records` in place. Both orderings are stable.
    pub fn apply(self, records: &mut [MediaRecord]) {
        match self {
            Self::Date => records.sort_by(|a, b| compare_dates(a.created_at, b.created_at)),
            Self::Name => records.sort_by_cached_key(|record| {
                let name = record.name.as_deref().map(str::to_lowercase);
                (name.is_none(), name)
            }),
        }
    }
}

fn compare_dates(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Date => "date",
            Self::Name => "name",
        })
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(Self::Date),
            "name" => Ok(Self::Name),
            other => Err(Error::InvalidInput(format!(
                "Unknown sort order '{other}' (expected date or name)"
            ))),
        }
    }
}
