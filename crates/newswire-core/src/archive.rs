//! Turning a completed live event into an article.
//!
//! Pure functions only; the archiver in `newswire-engine` feeds them the rows
//! and persists the result.

use crate::{
  Error, Result,
  article::{ArticleOrigin, NewArticle},
  event::{Category, EventUpdate, LiveEvent},
};

/// Tag attached to every article produced from an event.
pub const ARCHIVED_EVENT_TAG: &str = "archived-event";

/// Qualifiers removed from the front of an event name.
const LEADING_QUALIFIERS: &[&str] = &[
  "🔴",
  "[live]",
  "(live)",
  "live updates:",
  "live coverage:",
  "live:",
  "live -",
  "live –",
  "live |",
];

/// Qualifiers removed from the end of an event name.
const TRAILING_QUALIFIERS: &[&str] = &[
  "🔴",
  "[live]",
  "(live)",
  "live updates",
  "live coverage",
  "- live",
  "– live",
  "| live",
  ": live",
];

const SEPARATORS: &[char] = &['-', '–', '|', ':'];

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
  let head = s.get(..prefix.len())?;
  head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// Case-insensitive suffix strip. A suffix that starts with a word character
/// only matches at a word boundary.
fn strip_suffix_ci<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
  let split = s.len().checked_sub(suffix.len())?;
  let tail = s.get(split..)?;
  if !tail.eq_ignore_ascii_case(suffix) {
    return None;
  }
  let head = &s[..split];
  let starts_word = suffix.chars().next().is_some_and(char::is_alphanumeric);
  let joined = head.chars().next_back().is_some_and(char::is_alphanumeric);
  (!(starts_word && joined)).then_some(head)
}

/// Remove "live" branding from an event name.
///
/// Only whole qualifiers are removed, so names that merely contain the
/// letters (`Liverpool`, `Deliveroo Results`) are untouched. A name that
/// consists of nothing but a qualifier is returned as-is.
pub fn strip_live_qualifier(name: &str) -> String {
  let mut current = name.trim();
  loop {
    let before = current;

    if let Some(rest) =
      LEADING_QUALIFIERS.iter().find_map(|q| strip_prefix_ci(current, q))
    {
      current = rest.trim_start().trim_start_matches(SEPARATORS).trim_start();
    }
    if let Some(rest) =
      TRAILING_QUALIFIERS.iter().find_map(|q| strip_suffix_ci(current, q))
    {
      current = rest.trim_end().trim_end_matches(SEPARATORS).trim_end();
    }

    if current == before {
      break;
    }
  }

  if current.is_empty() {
    name.trim().to_owned()
  } else {
    current.to_owned()
  }
}

fn title_case(word: &str) -> String {
  let mut chars = word.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

/// A neutral attribution derived from the category's leaf segment, e.g.
/// `sports/football` → "Football News". Never mentions live coverage.
pub fn source_label(category: &Category) -> String {
  let words: Vec<String> = category
    .leaf()
    .unwrap_or_default()
    .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
    .filter(|w| !w.is_empty())
    .filter(|w| !matches!(*w, "live" | "ongoing"))
    .map(title_case)
    .collect();

  match words.last().map(String::as_str) {
    None => "News".to_owned(),
    Some("News") => words.join(" "),
    Some(_) => format!("{} News", words.join(" ")),
  }
}

/// Merge updates into narrative text, oldest first.
///
/// Each fragment is stamped with its UTC time; fragments are separated by a
/// blank line. No updates means an empty body.
pub fn render_body(updates: &[EventUpdate]) -> String {
  let mut ordered: Vec<&EventUpdate> = updates.iter().collect();
  ordered.sort_by_key(|u| (u.timestamp, u.update_id));

  ordered
    .into_iter()
    .filter_map(|u| {
      let title = u.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
      let content = u.content.trim();
      let text = match (title, content.is_empty()) {
        (None, true) => return None,
        (None, false) => content.to_owned(),
        (Some(t), true) => t.to_owned(),
        (Some(t), false) => format!("{t}\n{content}"),
      };
      Some(format!("[{}] {text}", u.timestamp.format("%H:%M")))
    })
    .collect::<Vec<_>>()
    .join("\n\n")
}

/// Build the article for a completed event.
///
/// Refuses events that are still live: an article must never exist for an
/// event that can still change.
pub fn compose_article(
  event: &LiveEvent,
  updates: &[EventUpdate],
) -> Result<NewArticle> {
  if event.is_live() {
    return Err(Error::NotCompleted(event.event_id));
  }
  if let Some(stray) = updates.iter().find(|u| u.event_id != event.event_id) {
    return Err(Error::Invariant(format!(
      "update {} belongs to event {}, not {}",
      stray.update_id, stray.event_id, event.event_id
    )));
  }

  let description = event.description.trim();
  let tags = event
    .category
    .segments()
    .map(str::to_owned)
    .chain(std::iter::once(ARCHIVED_EVENT_TAG.to_owned()))
    .collect();

  Ok(NewArticle {
    title:        strip_live_qualifier(&event.name),
    body:         render_body(updates),
    summary:      (!description.is_empty()).then(|| description.to_owned()),
    category:     event.category.clone(),
    source_label: source_label(&event.category),
    tags,
    origin:       ArticleOrigin::ArchivedEvent { event_id: event.event_id },
  })
}
