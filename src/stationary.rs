//! Stationary-period tagging for twilights.
//!
//! Segmentation into stationary periods happens elsewhere (from activity
//! data); this module only labels each twilight with the period it falls in.

use crate::TwilightEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A span during which the bird is assumed not to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationaryPeriod {
    pub id: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A twilight labelled with its stationary period, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedTwilight {
    #[serde(flatten)]
    pub event: TwilightEvent,
    pub stap_id: Option<u32>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StationaryError {
    #[error("stationary period {id} ends ({end}) before it starts ({start})")]
    ReversedPeriod {
        id: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Label every twilight with the first period whose inclusive span holds it.
///
/// Twilights that fall between periods (flights) get `None`.
pub fn tag_stationary_periods(
    twilights: &[TwilightEvent],
    periods: &[StationaryPeriod],
) -> Result<Vec<TaggedTwilight>, StationaryError> {
    if let Some(p) = periods.iter().find(|p| p.end < p.start) {
        return Err(StationaryError::ReversedPeriod {
            id: p.id,
            start: p.start,
            end: p.end,
        });
    }

    Ok(twilights
        .iter()
        .map(|&event| TaggedTwilight {
            event,
            stap_id: periods
                .iter()
                .find(|p| p.start <= event.instant && event.instant <= p.end)
                .map(|p| p.id),
        })
        .collect())
}
