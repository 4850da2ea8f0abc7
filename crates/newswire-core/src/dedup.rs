//! Choosing the canonical event among duplicates.

use chrono::{DateTime, Utc};

use crate::event::EventId;

/// The fields that decide which duplicate survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateCandidate {
  pub event_id:   EventId,
  pub start_time: DateTime<Utc>,
}

/// The outcome of collapsing one group of same-named events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
  pub keep:   EventId,
  pub remove: Vec<EventId>,
}

/// Keep the most recently started candidate (ties → highest id); everything
/// else is removed. Returns `None` for an empty group.
pub fn partition(group: &[DuplicateCandidate]) -> Option<Partition> {
  let keep = group.iter().max_by_key(|c| (c.start_time, c.event_id))?.event_id;
  let mut remove: Vec<EventId> = group
    .iter()
    .map(|c| c.event_id)
    .filter(|id| *id != keep)
    .collect();
  remove.sort();
  remove.dedup();
  Some(Partition { keep, remove })
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone};

  use super::*;

  fn c(id: i64, offset_minutes: i64) -> DuplicateCandidate {
    let t0 = Utc.with_ymd_and_hms(2024, 3, 20, 18, 0, 0).unwrap();
    DuplicateCandidate {
      event_id:   EventId(id),
      start_time: t0 + TimeDelta::minutes(offset_minutes),
    }
  }

  #[test]
  fn latest_start_wins() {
    let p = partition(&[c(10, 0), c(15, 60)]).unwrap();
    assert_eq!(p.keep, EventId(15));
    assert_eq!(p.remove, [EventId(10)]);
  }

  #[test]
  fn ties_go_to_highest_id() {
    let p = partition(&[c(21, 5), c(4, 5), c(9, 5)]).unwrap();
    assert_eq!(p.keep, EventId(21));
    assert_eq!(p.remove, [EventId(4), EventId(9)]);
  }

  #[test]
  fn newer_start_beats_higher_id() {
    let p = partition(&[c(30, 0), c(2, 1)]).unwrap();
    assert_eq!(p.keep, EventId(2));
  }

  #[test]
  fn singleton_and_empty_groups() {
    assert_eq!(partition(&[c(1, 0)]).unwrap().remove, Vec::<EventId>::new());
    assert!(partition(&[]).is_none());
  }
}
