//! SQLite implementation of [`PolicyStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use triage_core::{
  policy::{NewPolicy, PolicyPatch, SlaPolicy},
  store::PolicyStore,
};

use crate::{
  Error, Result,
  encode::{
    POLICY_COLUMNS, POLICY_ORDER, RawPolicy, encode_dt, encode_filter,
    encode_metrics, encode_uuid,
  },
  schema::SCHEMA,
};

/// Domain outcome computed inside a database closure. The outer result
/// carries database failures; the inner one carries rule violations that
/// abort the transaction.
type Checked<T> = std::result::Result<T, triage_core::Error>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A policy store backed by a single SQLite file.
///
/// Clones share the same reference-counted connection.
#[derive(Clone)]
pub struct SqlitePolicyStore {
  conn: tokio_rusqlite::Connection,
}

impl SqlitePolicyStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch(&self, include_deleted: bool) -> Result<Vec<SlaPolicy>> {
    let raws: Vec<RawPolicy> = self
      .conn
      .call(move |conn| {
        let filter = if include_deleted { "" } else { "WHERE is_deleted = 0" };
        let sql =
          format!("SELECT {POLICY_COLUMNS} FROM sla_policies {filter} {POLICY_ORDER}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawPolicy::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPolicy::into_policy).collect()
  }
}

/// Increment the collection version and return the new value.
fn bump_version(tx: &rusqlite::Transaction<'_>) -> rusqlite::Result<i64> {
  tx.query_row(
    "UPDATE policy_store_meta SET version = version + 1
     WHERE singleton = 0
     RETURNING version",
    [],
    |r| r.get(0),
  )
}

fn current_version(conn: &rusqlite::Connection) -> rusqlite::Result<i64> {
  conn.query_row(
    "SELECT version FROM policy_store_meta WHERE singleton = 0",
    [],
    |r| r.get(0),
  )
}

fn non_negative(raw: i64, column: &str) -> Result<u64> {
  u64::try_from(raw).map_err(|_| Error::Decode(format!("negative {column}: {raw}")))
}

/// Load the row for `id`, apply `patch` and write it back. An empty patch
/// returns the row untouched. `None` when no row exists.
fn patch_in_tx(
  tx: &rusqlite::Transaction<'_>,
  id: Uuid,
  patch: PolicyPatch,
) -> Result<Option<SlaPolicy>> {
  let id_str = encode_uuid(id);
  let Some(raw) = tx
    .query_row(
      &format!("SELECT {POLICY_COLUMNS} FROM sla_policies WHERE policy_id = ?1"),
      rusqlite::params![id_str],
      RawPolicy::from_row,
    )
    .optional()?
  else {
    return Ok(None);
  };

  let mut policy = raw.into_policy()?;
  if patch.is_empty() {
    return Ok(Some(policy));
  }

  patch.apply(&mut policy);
  policy.updated_at = Utc::now();
  let filter_cols = encode_filter(&policy.filter);

  tx.execute(
    "UPDATE sla_policies SET
       title = ?2, description = ?3,
       filter_priority = ?4, filter_group_id = ?5,
       filter_type = ?6, filter_source = ?7,
       metrics_json = ?8, updated_at = ?9
     WHERE policy_id = ?1",
    rusqlite::params![
      id_str,
      policy.title,
      policy.description,
      filter_cols.priority,
      filter_cols.group_id,
      filter_cols.ticket_type,
      filter_cols.source,
      encode_metrics(&policy.metrics)?,
      encode_dt(policy.updated_at),
    ],
  )?;
  bump_version(tx)?;

  Ok(Some(policy))
}

// ─── PolicyStore impl ────────────────────────────────────────────────────────

impl PolicyStore for SqlitePolicyStore {
  type Error = Error;

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn list(&self, include_deleted: bool) -> Result<Vec<SlaPolicy>> {
    self.fetch(include_deleted).await
  }

  async fn get(&self, id: Uuid) -> Result<Option<SlaPolicy>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPolicy> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {POLICY_COLUMNS} FROM sla_policies WHERE policy_id = ?1"),
            rusqlite::params![id_str],
            RawPolicy::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPolicy::into_policy).transpose()
  }

  async fn version(&self) -> Result<u64> {
    let raw = self.conn.call(|conn| Ok(current_version(conn)?)).await?;
    non_negative(raw, "version")
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn create(&self, input: NewPolicy) -> Result<SlaPolicy> {
    input.validate()?;

    let policy_id = Uuid::new_v4();
    let now       = Utc::now();

    let id_str       = encode_uuid(policy_id);
    let now_str      = encode_dt(now);
    let filter_cols  = encode_filter(&input.filter);
    let metrics_json = encode_metrics(&input.metrics)?;
    let title        = input.title.clone();
    let description  = input.description.clone();
    let explicit_pos = input.position;

    // Sequence allocation, the append-position count and the insert share one
    // immediate transaction, so concurrent creates cannot observe the same
    // count or sequence.
    let (position, seq): (u32, i64) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let seq: i64 = tx.query_row(
          "UPDATE policy_store_meta
           SET next_seq = next_seq + 1, version = version + 1
           WHERE singleton = 0
           RETURNING next_seq - 1",
          [],
          |r| r.get(0),
        )?;

        let position: u32 = match explicit_pos {
          Some(p) => p,
          None => tx.query_row(
            "SELECT COUNT(*) FROM sla_policies WHERE is_deleted = 0",
            [],
            |r| r.get(0),
          )?,
        };

        tx.execute(
          "INSERT INTO sla_policies (
             policy_id, title, description, position,
             filter_priority, filter_group_id, filter_type, filter_source,
             metrics_json, is_deleted, deleted_at,
             created_at, updated_at, created_seq
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, NULL, ?10, ?10, ?11)",
          rusqlite::params![
            id_str,
            title,
            description,
            position,
            filter_cols.priority,
            filter_cols.group_id,
            filter_cols.ticket_type,
            filter_cols.source,
            metrics_json,
            now_str,
            seq,
          ],
        )?;

        tx.commit()?;
        Ok((position, seq))
      })
      .await?;

    tracing::debug!(%policy_id, position, seq, "created sla policy");

    Ok(SlaPolicy {
      policy_id,
      title: input.title,
      description: input.description,
      position,
      filter: input.filter,
      metrics: input.metrics,
      is_deleted: false,
      deleted_at: None,
      created_at: now,
      updated_at: now,
      created_seq: non_negative(seq, "created_seq")?,
    })
  }

  async fn update(&self, id: Uuid, patch: PolicyPatch) -> Result<SlaPolicy> {
    patch.validate()?;

    // Read, patch and write under one immediate transaction so concurrent
    // patches to different fields both survive.
    let outcome: Result<Option<SlaPolicy>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = patch_in_tx(&tx, id, patch);
        if matches!(outcome, Ok(Some(_))) {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?;

    let policy = outcome?.ok_or(triage_core::Error::PolicyNotFound(id))?;
    tracing::debug!(policy_id = %id, "updated sla policy");
    Ok(policy)
  }

  async fn soft_delete(&self, id: Uuid) -> Result<SlaPolicy> {
    let id_str  = encode_uuid(id);
    let now_str = encode_dt(Utc::now());

    let newly_deleted: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
          "UPDATE sla_policies SET is_deleted = 1, deleted_at = ?2, updated_at = ?2
           WHERE policy_id = ?1 AND is_deleted = 0",
          rusqlite::params![id_str, now_str],
        )?;
        if changed > 0 {
          bump_version(&tx)?;
        }
        tx.commit()?;
        Ok(changed > 0)
      })
      .await?;

    let policy = self
      .get(id)
      .await?
      .ok_or(triage_core::Error::PolicyNotFound(id))?;

    if newly_deleted {
      tracing::debug!(policy_id = %id, position = policy.position, "soft-deleted sla policy");
    }
    Ok(policy)
  }

  async fn reorder(
    &self,
    ordered_ids: Vec<Uuid>,
    expected_version: Option<u64>,
  ) -> Result<()> {
    let mut seen = HashMap::with_capacity(ordered_ids.len());
    for id in &ordered_ids {
      if seen.insert(encode_uuid(*id), *id).is_some() {
        return Err(
          triage_core::Error::InvalidInput(format!("policy {id} listed more than once"))
            .into(),
        );
      }
    }

    let expected = expected_version
      .map(|v| {
        i64::try_from(v)
          .map_err(|_| triage_core::Error::InvalidInput(format!("version {v} out of range")))
      })
      .transpose()?;
    let count = ordered_ids.len();
    let now_str = encode_dt(Utc::now());

    let outcome: Checked<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let actual = current_version(&tx)?;
        if let Some(expected) = expected
          && expected != actual
        {
          return Ok(Err(triage_core::Error::VersionConflict {
            expected: expected as u64,
            actual:   actual as u64,
          }));
        }

        let states: HashMap<String, bool> = {
          let mut stmt = tx.prepare("SELECT policy_id, is_deleted FROM sla_policies")?;
          stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, bool>(1)?)))?
            .collect::<rusqlite::Result<_>>()?
        };

        for (id_str, id) in &seen {
          match states.get(id_str) {
            None => return Ok(Err(triage_core::Error::PolicyNotFound(*id))),
            Some(true) => {
              return Ok(Err(triage_core::Error::InvalidInput(format!(
                "policy {id} is deleted and cannot be reordered"
              ))));
            }
            Some(false) => {}
          }
        }

        if let Some(missing) = states
          .iter()
          .find(|(id_str, deleted)| !**deleted && !seen.contains_key(*id_str))
        {
          return Ok(Err(triage_core::Error::InvalidInput(format!(
            "reorder must list every active policy; {} is missing",
            missing.0
          ))));
        }

        // Every id was checked above; a failed write drops `tx` uncommitted.
        for (index, id) in ordered_ids.iter().enumerate() {
          tx.execute(
            "UPDATE sla_policies SET position = ?2, updated_at = ?3
             WHERE policy_id = ?1",
            rusqlite::params![encode_uuid(*id), index as u32, now_str],
          )?;
        }

        let version = bump_version(&tx)?;
        tx.commit()?;
        Ok(Ok(version))
      })
      .await?;

    let version = outcome?;
    tracing::debug!(policies = count, version, "reordered sla policies");
    Ok(())
  }

  async fn compact(&self) -> Result<Vec<SlaPolicy>> {
    let now_str = encode_dt(Utc::now());

    let renumbered: usize = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Vec<(String, u32)> = {
          let mut stmt = tx.prepare(&format!(
            "SELECT policy_id, position FROM sla_policies
             WHERE is_deleted = 0 {POLICY_ORDER}"
          ))?;
          stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?
        };

        let mut renumbered = 0;
        for (index, (id_str, position)) in current.iter().enumerate() {
          let index = index as u32;
          if *position != index {
            tx.execute(
              "UPDATE sla_policies SET position = ?2, updated_at = ?3
               WHERE policy_id = ?1",
              rusqlite::params![id_str, index, now_str],
            )?;
            renumbered += 1;
          }
        }

        if renumbered > 0 {
          bump_version(&tx)?;
        }
        tx.commit()?;
        Ok(renumbered)
      })
      .await?;

    if renumbered > 0 {
      tracing::debug!(renumbered, "compacted sla policy positions");
    }
    self.fetch(false).await
  }
}
