//! [`SqliteStore`], the SQLite implementation of [`NewsStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior, types::Value};

use newswire_core::{
  article::{Article, ArticleId, NewArticle},
  dedup::{DuplicateCandidate, partition},
  event::{
    CompletionReason, EventId, EventStatus, EventUpdate, LiveEvent, NewEvent,
    NewUpdate, UpdateId,
  },
  store::{ArticleQuery, EventQuery, NewsStore},
};

use crate::{
  Error, Result,
  encode::{
    ARTICLE_COLUMNS, EVENT_COLUMNS, RawArticle, RawEvent, RawUpdate,
    UPDATE_COLUMNS, decode_dt, encode_dt, encode_tags, like_pattern,
    stored_precision, subcategory_range,
  },
  schema::{MIGRATIONS, PRAGMAS, SCHEMA_VERSION},
};

/// Outcome of running migrations at open.
enum Migration {
  Current { from: i64 },
  TooNew { found: i64 },
}

fn other(e: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Newswire store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Open it once
/// at process start and hand clones to every component.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and bring its schema up to date.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.migrate().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.migrate().await?;
    Ok(store)
  }

  /// Close the underlying connection, flushing WAL state.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  /// The schema version currently recorded in the database.
  pub async fn schema_version(&self) -> Result<i64> {
    let version: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?))
      .await?;
    Ok(version)
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }

  async fn migrate(&self) -> Result<()> {
    let outcome = self
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;

        let found: i64 =
          conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        if found > SCHEMA_VERSION {
          return Ok(Migration::TooNew { found });
        }

        let tx = conn.transaction()?;
        let from = found.max(0);
        for (idx, sql) in MIGRATIONS.iter().enumerate().skip(from as usize) {
          tx.execute_batch(sql)?;
          tx.pragma_update(None, "user_version", idx as i64 + 1)?;
        }
        tx.commit()?;
        Ok(Migration::Current { from })
      })
      .await?;

    match outcome {
      Migration::TooNew { found } => Err(Error::UnsupportedSchemaVersion {
        found,
        supported: SCHEMA_VERSION,
      }),
      Migration::Current { from } => {
        if from < SCHEMA_VERSION {
          tracing::info!(from, to = SCHEMA_VERSION, "migrated store schema");
        }
        Ok(())
      }
    }
  }

  async fn query_events(
    &self,
    sql: String,
    params: Vec<Value>,
  ) -> Result<Vec<LiveEvent>> {
    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn query_articles(
    &self,
    sql: String,
    params: Vec<Value>,
  ) -> Result<Vec<Article>> {
    let raws: Vec<RawArticle> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawArticle::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawArticle::into_article).collect()
  }

  async fn insert_article(
    &self,
    input: NewArticle,
    created_at: DateTime<Utc>,
  ) -> Result<(Article, bool)> {
    let source_event = input.origin.source_event();
    let tags_str     = encode_tags(&input.tags)?;
    let at_str       = encode_dt(created_at);
    let row          = (
      input.title.clone(),
      input.body.clone(),
      input.summary.clone(),
      input.category.as_str().to_owned(),
      input.source_label.clone(),
    );

    let (existing, new_id): (Option<RawArticle>, Option<i64>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(event_id) = source_event {
          let existing = tx
            .query_row(
              &format!(
                "SELECT {ARTICLE_COLUMNS} FROM articles WHERE source_event_id = ?1"
              ),
              rusqlite::params![event_id.0],
              RawArticle::from_row,
            )
            .optional()?;
          if existing.is_some() {
            return Ok((existing, None));
          }
        }

        let (title, body, summary, category, source_label) = row;
        tx.execute(
          "INSERT INTO articles (
             title, body, summary, category, source_label, tags,
             source_event_id, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            title,
            body,
            summary,
            category,
            source_label,
            tags_str,
            source_event.map(|e| e.0),
            at_str,
          ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok((None, Some(id)))
      })
      .await?;

    match (existing, new_id) {
      (Some(raw), _) => Ok((raw.into_article()?, false)),
      (None, Some(id)) => Ok((
        Article {
          article_id:   ArticleId(id),
          title:        input.title,
          body:         input.body,
          summary:      input.summary,
          category:     input.category,
          source_label: input.source_label,
          tags:         input.tags,
          origin:       input.origin,
          created_at,
        },
        true,
      )),
      (None, None) => Err(Error::Core(newswire_core::Error::Invariant(
        "article insert produced no row".to_owned(),
      ))),
    }
  }
}

/// Delete `ids` and their updates inside an open transaction.
fn delete_events_tx(
  tx: &rusqlite::Transaction<'_>,
  ids: &[EventId],
) -> rusqlite::Result<usize> {
  let mut removed = 0;
  for id in ids {
    tx.execute(
      "DELETE FROM event_updates WHERE event_id = ?1",
      rusqlite::params![id.0],
    )?;
    removed += tx.execute(
      "DELETE FROM live_events WHERE event_id = ?1",
      rusqlite::params![id.0],
    )?;
  }
  Ok(removed)
}

// ─── NewsStore impl ──────────────────────────────────────────────────────────

impl NewsStore for SqliteStore {
  type Error = Error;

  // ── Events ────────────────────────────────────────────────────────────────

  async fn create_event(&self, input: NewEvent) -> Result<LiveEvent> {
    let start = stored_precision(input.start_time.unwrap_or_else(Utc::now));
    let scheduled_end = input.scheduled_end.map(stored_precision);

    let name_str     = input.name.clone();
    let category_str = input.category.as_str().to_owned();
    let desc_str     = input.description.clone();
    let venue        = input.venue.clone();
    let start_str    = encode_dt(start);
    let end_str      = scheduled_end.map(encode_dt);
    let status_str   = EventStatus::Live.as_ref().to_owned();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO live_events (
             name, category, status, description, venue,
             start_time, scheduled_end, last_updated, version
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?6, 0)",
          rusqlite::params![
            name_str, category_str, status_str, desc_str, venue, start_str,
            end_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(LiveEvent {
      event_id: EventId(id),
      name: input.name,
      category: input.category,
      status: EventStatus::Live,
      description: input.description,
      venue: input.venue,
      start_time: start,
      scheduled_end,
      last_updated: start,
      completed_at: None,
      completion_reason: None,
      version: 0,
    })
  }

  async fn get_event(&self, id: EventId) -> Result<Option<LiveEvent>> {
    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {EVENT_COLUMNS} FROM live_events WHERE event_id = ?1"),
              rusqlite::params![id.0],
              RawEvent::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn list_events(&self, query: &EventQuery) -> Result<Vec<LiveEvent>> {
    let mut conds: Vec<&'static str> = vec![];
    let mut params: Vec<Value> = vec![];

    if let Some(status) = query.status {
      conds.push("status = ?");
      params.push(Value::Text(status.as_ref().to_owned()));
    }
    if let Some(category) = query.category.as_ref().filter(|c| !c.is_blank()) {
      let (lo, hi) = subcategory_range(category);
      conds.push("(category = ? OR (category >= ? AND category < ?))");
      params.push(Value::Text(category.as_str().to_owned()));
      params.push(Value::Text(lo));
      params.push(Value::Text(hi));
    }
    if let Some(text) = query.text.as_deref().filter(|t| !t.trim().is_empty()) {
      let pattern = like_pattern(text.trim());
      conds.push("(name LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')");
      params.push(Value::Text(pattern.clone()));
      params.push(Value::Text(pattern));
    }
    if let Some(after) = query.completed_after {
      conds.push("completed_at >= ?");
      params.push(Value::Text(encode_dt(after)));
    }
    if let Some(before) = query.completed_before {
      conds.push("completed_at < ?");
      params.push(Value::Text(encode_dt(before)));
    }
    // SQLite treats a negative LIMIT as "no limit".
    params.push(Value::Integer(query.limit.map_or(-1, |l| l as i64)));

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    let sql = format!(
      "SELECT {EVENT_COLUMNS} FROM live_events
       {where_clause}
       ORDER BY start_time DESC, event_id DESC
       LIMIT ?"
    );

    self.query_events(sql, params).await
  }

  async fn delete_event(&self, id: EventId) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = delete_events_tx(&tx, &[id])?;
        tx.commit()?;
        Ok(removed)
      })
      .await?;
    Ok(removed > 0)
  }

  // ── Updates ───────────────────────────────────────────────────────────────

  async fn append_update(&self, input: NewUpdate) -> Result<EventUpdate> {
    let timestamp  = stored_precision(input.timestamp);
    let event_id   = input.event_id;
    let ts_str     = encode_dt(timestamp);
    let title      = input.title.clone();
    let content    = input.content.clone();
    let importance = input.importance;

    let inserted: Result<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let status: Option<String> = tx
          .query_row(
            "SELECT status FROM live_events WHERE event_id = ?1",
            rusqlite::params![event_id.0],
            |r| r.get(0),
          )
          .optional()?;
        match status.as_deref() {
          None => return Ok(Err(Error::EventNotFound(event_id))),
          Some("live") => {}
          Some(_) => return Ok(Err(Error::EventClosed(event_id))),
        }

        tx.execute(
          "INSERT INTO event_updates (event_id, timestamp, title, content, importance)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![event_id.0, ts_str, title, content, importance],
        )?;
        let update_id = tx.last_insert_rowid();

        tx.execute(
          "UPDATE live_events
           SET last_updated = max(last_updated, ?2), version = version + 1
           WHERE event_id = ?1",
          rusqlite::params![event_id.0, ts_str],
        )?;

        tx.commit()?;
        Ok(Ok(update_id))
      })
      .await?;

    let update_id = inserted?;

    Ok(EventUpdate {
      update_id: UpdateId(update_id),
      event_id,
      timestamp,
      title: input.title,
      content: input.content,
      importance,
    })
  }

  async fn get_updates(&self, event_id: EventId) -> Result<Vec<EventUpdate>> {
    let raws: Vec<RawUpdate> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {UPDATE_COLUMNS} FROM event_updates
           WHERE event_id = ?1
           ORDER BY timestamp ASC, update_id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![event_id.0], RawUpdate::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUpdate::into_update).collect()
  }

  // ── Lifecycle writes ──────────────────────────────────────────────────────

  async fn mark_completed(
    &self,
    id: EventId,
    expected_version: i64,
    at: DateTime<Utc>,
    reason: CompletionReason,
  ) -> Result<bool> {
    let at_str     = encode_dt(at);
    let reason_str = reason.as_ref().to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE live_events
           SET status = 'completed', completed_at = ?3, completion_reason = ?4,
               version = version + 1
           WHERE event_id = ?1 AND status = 'live' AND version = ?2",
          rusqlite::params![id.0, expected_version, at_str, reason_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn force_complete_started_before(
    &self,
    cutoff: DateTime<Utc>,
    at: DateTime<Utc>,
  ) -> Result<Vec<EventId>> {
    let cutoff_str = encode_dt(cutoff);
    let at_str     = encode_dt(at);
    let reason_str = CompletionReason::SafetyCeiling.as_ref().to_owned();

    let ids: Vec<i64> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "UPDATE live_events
           SET status = 'completed', completed_at = ?2, completion_reason = ?3,
               version = version + 1
           WHERE status = 'live' AND start_time < ?1
           RETURNING event_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![cutoff_str, at_str, reason_str], |r| {
            r.get(0)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut ids: Vec<EventId> = ids.into_iter().map(EventId).collect();
    ids.sort();
    Ok(ids)
  }

  async fn purge_completed_event(&self, id: EventId, expected_version: i64) -> Result<bool> {
    let purged = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = tx.execute(
          "DELETE FROM live_events
           WHERE event_id = ?1 AND status = 'completed' AND version = ?2",
          rusqlite::params![id.0, expected_version],
        )?;
        if removed == 1 {
          tx.execute(
            "DELETE FROM event_updates WHERE event_id = ?1",
            rusqlite::params![id.0],
          )?;
        }
        tx.commit()?;
        Ok(removed == 1)
      })
      .await?;
    Ok(purged)
  }

  // ── Deduplication ─────────────────────────────────────────────────────────

  async fn duplicate_live_names(&self) -> Result<Vec<String>> {
    let names = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT name FROM live_events
           WHERE status = 'live'
           GROUP BY name
           HAVING COUNT(*) > 1
           ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(names)
  }

  async fn collapse_duplicates(&self, name: String) -> Result<Vec<EventId>> {
    let removed = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front, so the group cannot change
        // between the read below and the deletes.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let raw: Vec<(i64, String)> = {
          let mut stmt = tx.prepare(
            "SELECT event_id, start_time FROM live_events
             WHERE name = ?1 AND status = 'live'",
          )?;
          stmt
            .query_map(rusqlite::params![name], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let group = raw
          .into_iter()
          .map(|(id, start)| -> tokio_rusqlite::Result<DuplicateCandidate> {
            Ok(DuplicateCandidate {
              event_id:   EventId(id),
              start_time: decode_dt(&start).map_err(other)?,
            })
          })
          .collect::<tokio_rusqlite::Result<Vec<_>>>()?;

        let remove = partition(&group).map(|p| p.remove).unwrap_or_default();
        delete_events_tx(&tx, &remove)?;
        tx.commit()?;
        Ok(remove)
      })
      .await?;
    Ok(removed)
  }

  async fn purge_orphan_updates(&self) -> Result<u64> {
    let purged = self
      .conn
      .call(|conn| {
        Ok(conn.execute(
          "DELETE FROM event_updates
           WHERE event_id NOT IN (SELECT event_id FROM live_events)",
          [],
        )?)
      })
      .await?;
    Ok(purged as u64)
  }

  // ── Articles ──────────────────────────────────────────────────────────────

  async fn create_article(&self, input: NewArticle) -> Result<Article> {
    let (article, _) = self.insert_article(input, stored_precision(Utc::now())).await?;
    Ok(article)
  }

  async fn create_article_from_event(
    &self,
    input: NewArticle,
  ) -> Result<(Article, bool)> {
    if input.origin.source_event().is_none() {
      return Err(Error::Core(newswire_core::Error::Invariant(
        "archived article has no source event".to_owned(),
      )));
    }
    self.insert_article(input, stored_precision(Utc::now())).await
  }

  async fn get_article(&self, id: ArticleId) -> Result<Option<Article>> {
    let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE article_id = ?");
    let mut found = self.query_articles(sql, vec![Value::Integer(id.0)]).await?;
    Ok(found.pop())
  }

  async fn find_article_for_event(&self, event_id: EventId) -> Result<Option<Article>> {
    let sql =
      format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE source_event_id = ?");
    let mut found = self
      .query_articles(sql, vec![Value::Integer(event_id.0)])
      .await?;
    Ok(found.pop())
  }

  async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
    let mut conds: Vec<&'static str> = vec![];
    let mut params: Vec<Value> = vec![];

    if let Some(category) = query.category.as_ref().filter(|c| !c.is_blank()) {
      let (lo, hi) = subcategory_range(category);
      conds.push("(category = ? OR (category >= ? AND category < ?))");
      params.push(Value::Text(category.as_str().to_owned()));
      params.push(Value::Text(lo));
      params.push(Value::Text(hi));
    }
    match query.archived_only {
      Some(true) => conds.push("source_event_id IS NOT NULL"),
      Some(false) => conds.push("source_event_id IS NULL"),
      None => {}
    }
    params.push(Value::Integer(query.limit.map_or(-1, |l| l as i64)));
    params.push(Value::Integer(query.offset.unwrap_or(0) as i64));

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    let sql = format!(
      "SELECT {ARTICLE_COLUMNS} FROM articles
       {where_clause}
       ORDER BY created_at DESC, article_id DESC
       LIMIT ? OFFSET ?"
    );

    self.query_articles(sql, params).await
  }
}
