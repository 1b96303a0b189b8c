//! Main store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use alarms_types::ids::canonical_id;
use alarms_types::{Alarm, AlarmsPage, PageMetadata};
use rusqlite::{Connection, Transaction, named_params};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::{Operation, classify};
use crate::config::StoreConfig;
use crate::error::{Cancelled, Error, Result};
use crate::models::StoredAlarm;
use crate::queries::{ALARM_COLUMNS, ListQuery, Scope};
use crate::repository::AlarmRepository;
use crate::schema;

const INSERT_ALARM: &str = "INSERT INTO alarms (id, thing_id, group_id, subtopic, protocol, payload, created)
     VALUES (:id, :thing_id, :group_id, :subtopic, :protocol, :payload, :created)";

const DELETE_ALARM: &str = "DELETE FROM alarms WHERE id = :id";

/// SQLite-based alarm store.
///
/// The connection sits behind a mutex, so a `Store` can be shared between
/// threads (for example inside an `Arc`).
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open or create a database at the given path with default settings.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(&StoreConfig::with_path(path.as_ref()))
    }

    /// Open or create a database as described by `config`.
    pub fn open_with_config(config: &StoreConfig) -> Result<Self> {
        let path = config.path.as_path();

        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening alarm database at {}", path.display());
        let conn = Connection::open(path).map_err(Error::Storage)?;

        conn.busy_timeout(config.busy_timeout())
            .map_err(Error::Storage)?;
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = {};
             PRAGMA synchronous = NORMAL;",
            config.journal_mode.as_pragma()
        ))
        .map_err(Error::Storage)?;

        schema::initialize(&conn).map_err(Error::Storage)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open the store described by the configuration file at `path`.
    ///
    /// A missing file means default settings. The configuration is validated
    /// before the database is opened.
    pub fn open_config_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = StoreConfig::load_or_default(path)?;
        config.validate()?;
        Self::open_with_config(&config)
    }

    /// Open the store configured at [`default_config_path`](crate::default_config_path),
    /// falling back to [`default_db_path`](crate::default_db_path).
    pub fn open_default() -> Result<Self> {
        Self::open_config_file(crate::default_config_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::Storage)?;
        schema::initialize(&conn).map_err(Error::Storage)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self, op: Operation) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| op.failure("alarm store connection mutex poisoned"))
    }

    /// Run `work` inside one transaction, committing only if it succeeds.
    ///
    /// Any error (including cancellation observed after `work`) rolls the
    /// transaction back.
    fn in_transaction<T>(
        &self,
        ctx: &CancellationToken,
        op: Operation,
        work: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        ensure_active(ctx, op)?;
        let mut conn = self.lock(op)?;
        let tx = conn.transaction().map_err(|e| classify(op, e))?;

        let result = work(&tx).and_then(|value| {
            ensure_active(ctx, op)?;
            Ok(value)
        });

        match result {
            Ok(value) => {
                tx.commit().map_err(|e| classify(op, e))?;
                Ok(value)
            }
            Err(err) => {
                match tx.rollback() {
                    Ok(()) => warn!("Rolled back transaction: {}", err),
                    Err(rollback_err) => {
                        warn!("Rollback failed after {}: {}", err, rollback_err)
                    }
                }
                Err(err)
            }
        }
    }

    fn retrieve_scoped(
        &self,
        ctx: &CancellationToken,
        scope: Scope,
        scope_id: &str,
        pm: &PageMetadata,
    ) -> Result<AlarmsPage> {
        // A malformed scope id can never match, so skip storage entirely.
        let scope_id = canonical_id(scope_id).map_err(|e| Error::NotFound(Box::new(e)))?;

        let query = ListQuery::build(scope, &scope_id, pm)
            .map_err(|e| Error::MalformedEntity(Box::new(e)))?;

        let op = Operation::Retrieve;
        ensure_active(ctx, op)?;
        let conn = self.lock(op)?;

        debug!("Executing query: {}", query.sql);
        let mut stmt = conn.prepare(&query.sql).map_err(|e| classify(op, e))?;
        let page_params = query.page_params.as_named();
        let rows = stmt
            .query_map(page_params.as_slice(), StoredAlarm::from_row)
            .map_err(|e| classify(op, e))?;

        let mut alarms = Vec::new();
        for row in rows {
            let stored = row.map_err(|e| op.failure(e))?;
            let alarm = stored.into_alarm().map_err(|e| op.failure(e))?;
            alarms.push(alarm);
        }

        ensure_active(ctx, op)?;
        debug!("Executing query: {}", query.count_sql);
        let count_params = query.filter_params.as_named();
        let total: i64 = conn
            .query_row(&query.count_sql, count_params.as_slice(), |row| row.get(0))
            .map_err(|e| classify(op, e))?;

        Ok(AlarmsPage {
            alarms,
            page: PageMetadata {
                total: u64::try_from(total).unwrap_or_default(),
                offset: pm.offset,
                limit: pm.limit,
                order: Some(query.order.to_string()),
                dir: Some(query.dir.to_lowercase()),
                payload: pm.payload.clone(),
            },
        })
    }
}

fn ensure_active(ctx: &CancellationToken, op: Operation) -> Result<()> {
    if ctx.is_cancelled() {
        Err(op.failure(Cancelled))
    } else {
        Ok(())
    }
}

/// Rewrite the ids of `stored` in canonical form, rejecting malformed ones.
fn canonicalize_ids(stored: &mut StoredAlarm) -> Result<()> {
    for id in [&mut stored.id, &mut stored.thing_id, &mut stored.group_id] {
        *id = canonical_id(id.as_str()).map_err(|e| Error::MalformedEntity(Box::new(e)))?;
    }
    Ok(())
}

impl AlarmRepository for Store {
    fn save(&self, ctx: &CancellationToken, alarms: &[Alarm]) -> Result<()> {
        if alarms.is_empty() {
            return Ok(());
        }

        let op = Operation::Create;
        self.in_transaction(ctx, op, |tx| {
            let mut stmt = tx.prepare_cached(INSERT_ALARM).map_err(|e| classify(op, e))?;

            for alarm in alarms {
                ensure_active(ctx, op)?;
                let mut stored = StoredAlarm::from_alarm(alarm).map_err(|e| op.failure(e))?;
                canonicalize_ids(&mut stored)?;

                stmt.execute(named_params! {
                    ":id": stored.id,
                    ":thing_id": stored.thing_id,
                    ":group_id": stored.group_id,
                    ":subtopic": stored.subtopic,
                    ":protocol": stored.protocol,
                    ":payload": stored.payload,
                    ":created": stored.created,
                })
                .map_err(|e| classify(op, e))?;
            }

            Ok(())
        })?;

        info!("Saved {} alarms", alarms.len());
        Ok(())
    }

    fn retrieve_by_id(&self, ctx: &CancellationToken, id: &str) -> Result<Alarm> {
        let id = canonical_id(id).map_err(|e| Error::NotFound(Box::new(e)))?;

        let op = Operation::Retrieve;
        ensure_active(ctx, op)?;
        let conn = self.lock(op)?;

        let stored = conn
            .query_row(
                &format!("SELECT {} FROM alarms WHERE id = :id", ALARM_COLUMNS),
                named_params! { ":id": id },
                StoredAlarm::from_row,
            )
            .map_err(|e| classify(op, e))?;
        drop(conn);

        stored.into_alarm()
    }

    fn retrieve_by_thing(
        &self,
        ctx: &CancellationToken,
        thing_id: &str,
        pm: &PageMetadata,
    ) -> Result<AlarmsPage> {
        self.retrieve_scoped(ctx, Scope::Thing, thing_id, pm)
    }

    fn retrieve_by_group(
        &self,
        ctx: &CancellationToken,
        group_id: &str,
        pm: &PageMetadata,
    ) -> Result<AlarmsPage> {
        self.retrieve_scoped(ctx, Scope::Group, group_id, pm)
    }

    fn remove(&self, ctx: &CancellationToken, ids: &[String]) -> Result<()> {
        let op = Operation::Remove;
        ensure_active(ctx, op)?;
        let conn = self.lock(op)?;
        let mut stmt = conn.prepare_cached(DELETE_ALARM).map_err(|e| classify(op, e))?;

        for id in ids {
            // A malformed id matches no stored alarm.
            let Ok(id) = canonical_id(id) else {
                debug!("Skipping removal of malformed id {:?}", id);
                continue;
            };
            ensure_active(ctx, op)?;
            let removed = stmt
                .execute(named_params! { ":id": id })
                .map_err(|e| classify(op, e))?;
            debug!("Removed {} alarm(s) with id {}", removed, id);
        }

        Ok(())
    }
}
