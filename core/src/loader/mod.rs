//! Batched, per-scope row loaders.
//!
//! A [`BatchLoader`] serves point lookups on one key of one table. Lookups
//! issued in the same scheduling turn are coalesced into a single query,
//! results are memoized for the lifetime of the loader, and a failed batch is
//! reported to every requester in it without being cached.

mod key;

pub use key::LoaderKey;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use compact_str::CompactString;
use hashbrown::HashMap;
use rowgate_types::SchemaDef;
use tokio::sync::OnceCell;

use crate::error::{Result, RowgateError};
use crate::exec::{Executor, Statement};
use crate::filter::{Filter, FilterCompiler, col};
use crate::helpers;
use crate::order::{OrderSpec, Page, build_order_and_limit};
use crate::row::Row;
use crate::sql::SQL;
use crate::{rowgate_trace_batch, rowgate_warn};
use key::CanonicalKey;

/// Whether a loader resolves one row or a row set per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderKind {
    /// Backed by a unique key; resolves to at most one row
    Unique,
    /// Backed by a non-unique key; resolves to every matching row
    Many,
}

/// Batching knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Cooperative yields between enqueueing a key and flushing its batch
    pub yield_turns: usize,
    /// Seal a batch once it holds this many keys
    pub max_batch_size: Option<usize>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            yield_turns: 1,
            max_batch_size: None,
        }
    }
}

type BatchRows = Arc<HashMap<CanonicalKey, Vec<Row>>>;

/// Keys flushed together in one query.
struct Batch {
    epoch: u64,
    /// First ordering requested in this batch; applies to every key in it
    order: Option<OrderSpec>,
    keys: Mutex<Vec<CanonicalKey>>,
    outcome: OnceCell<Result<BatchRows>>,
}

enum Entry {
    Pending(Arc<Batch>),
    Resolved {
        rows: Vec<Row>,
        order: Option<OrderSpec>,
    },
}

#[derive(Default)]
struct LoaderState {
    entries: HashMap<CanonicalKey, Entry>,
    open: Option<Arc<Batch>>,
    /// Bumped by `clear`; batches from an older epoch do not populate the cache
    epoch: u64,
}

/// Coalescing, caching loader for one (table, key) pair.
///
/// A loader is owned by a single unit of work. Sharing one across independent
/// requests would leak cached rows between them; create a fresh loader (or
/// [`clear`](Self::clear) it) per request.
pub struct BatchLoader {
    schema: Arc<SchemaDef>,
    table: CompactString,
    columns: Vec<CompactString>,
    kind: LoaderKind,
    options: LoaderOptions,
    state: Mutex<LoaderState>,
}

impl std::fmt::Debug for BatchLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchLoader")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl BatchLoader {
    /// Creates a loader on the declared key of `table` covering `columns`.
    ///
    /// A [`LoaderKind::Unique`] loader needs a unique key and a
    /// [`LoaderKind::Many`] loader a non-unique one; key columns must be
    /// string or number columns.
    pub fn new(
        schema: Arc<SchemaDef>,
        table: &str,
        columns: &[&str],
        kind: LoaderKind,
        options: LoaderOptions,
    ) -> Result<Self> {
        let table_def = schema
            .table(table)
            .ok_or_else(|| RowgateError::UnknownTable(table.into()))?;
        let unknown_key = || RowgateError::UnknownKey {
            table: table.into(),
            columns: columns.join(", ").into(),
        };

        let key = match kind {
            LoaderKind::Unique => table_def.unique_key(columns),
            LoaderKind::Many => table_def.non_unique_key(columns),
        }
        .ok_or_else(unknown_key)?;

        let loadable = key.columns.iter().all(|column| {
            table_def
                .column(column)
                .is_some_and(|def| def.semantic.is_loader_key())
        });
        if !loadable {
            return Err(unknown_key());
        }

        let columns = key.columns.iter().map(|c| CompactString::from(c.as_str())).collect();
        Ok(Self {
            schema,
            table: table.into(),
            columns,
            kind,
            options,
            state: Mutex::new(LoaderState::default()),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Key columns in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(CompactString::as_str)
    }

    pub const fn kind(&self) -> LoaderKind {
        self.kind
    }

    /// Loads the row with `key`, or `None` when there is none.
    pub async fn load_one<E: Executor>(&self, exec: &E, key: &LoaderKey) -> Result<Option<Row>> {
        let rows = self.load(exec, key, None).await?;
        Ok(rows.into_iter().next())
    }

    /// Loads every row with `key`.
    ///
    /// The ordering is not part of the cache key, and it is chosen per batch:
    /// the batch's first request fixes the ordering for every key it fetches,
    /// including keys no earlier request has seen. A request joining that batch
    /// with a different ordering gets the batch's ordering and a `warn` event.
    /// Later requests for a cached key likewise get the ordering it was fetched
    /// with.
    pub async fn load_many<E: Executor>(
        &self,
        exec: &E,
        key: &LoaderKey,
        order: Option<&OrderSpec>,
    ) -> Result<Vec<Row>> {
        self.load(exec, key, order).await
    }

    /// Drops every cached and pending entry. Batches already in flight still
    /// answer their requesters but no longer populate the cache.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.open = None;
        state.epoch += 1;
    }

    async fn load<E: Executor>(
        &self,
        exec: &E,
        key: &LoaderKey,
        order: Option<&OrderSpec>,
    ) -> Result<Vec<Row>> {
        let table = self
            .schema
            .table(&self.table)
            .ok_or_else(|| RowgateError::UnknownTable(self.table.clone()))?;
        let canonical = CanonicalKey::new(table, &self.columns, key)?;
        let order = match self.kind {
            LoaderKind::Unique => None,
            LoaderKind::Many => order,
        };

        let batch = {
            let mut state = self.lock();
            match state.entries.get(&canonical) {
                Some(Entry::Resolved { rows, order: first }) => {
                    self.check_order(first.as_ref(), order);
                    return Ok(rows.clone());
                }
                Some(Entry::Pending(batch)) => {
                    self.check_order(batch.order.as_ref(), order);
                    Arc::clone(batch)
                }
                None => {
                    let batch = self.enqueue(&mut state, canonical.clone(), order);
                    state
                        .entries
                        .insert(canonical.clone(), Entry::Pending(Arc::clone(&batch)));
                    batch
                }
            }
        };

        for _ in 0..self.options.yield_turns {
            tokio::task::yield_now().await;
        }

        let outcome = batch
            .outcome
            .get_or_init(|| self.dispatch(exec, &batch))
            .await;
        match outcome {
            Ok(resolved) => Ok(resolved.get(&canonical).cloned().unwrap_or_default()),
            Err(error) => Err(error.clone()),
        }
    }

    /// Adds `key` to the open batch, opening one if needed.
    fn enqueue(
        &self,
        state: &mut LoaderState,
        key: CanonicalKey,
        order: Option<&OrderSpec>,
    ) -> Arc<Batch> {
        let batch = match &state.open {
            Some(open) => {
                self.check_order(open.order.as_ref(), order);
                Arc::clone(open)
            }
            None => {
                let batch = Arc::new(Batch {
                    epoch: state.epoch,
                    order: order.cloned(),
                    keys: Mutex::new(Vec::new()),
                    outcome: OnceCell::new(),
                });
                state.open = Some(Arc::clone(&batch));
                batch
            }
        };

        let size = {
            let mut keys = lock(&batch.keys);
            keys.push(key);
            keys.len()
        };
        if self
            .options
            .max_batch_size
            .is_some_and(|max| max > 0 && size >= max)
        {
            state.open = None;
        }
        batch
    }

    /// Runs `batch` and records its outcome in the cache.
    async fn dispatch<E: Executor>(&self, exec: &E, batch: &Arc<Batch>) -> Result<BatchRows> {
        {
            let mut state = self.lock();
            if state
                .open
                .as_ref()
                .is_some_and(|open| Arc::ptr_eq(open, batch))
            {
                state.open = None;
            }
        }
        let keys = lock(&batch.keys).clone();
        rowgate_trace_batch!(self.table, keys.len());

        let outcome = self.fetch(exec, batch, &keys).await;

        let mut state = self.lock();
        if state.epoch == batch.epoch {
            for key in &keys {
                let ours = matches!(
                    state.entries.get(key),
                    Some(Entry::Pending(pending)) if Arc::ptr_eq(pending, batch)
                );
                if !ours {
                    continue;
                }
                match &outcome {
                    Ok(resolved) => {
                        let rows = resolved.get(key).cloned().unwrap_or_default();
                        state.entries.insert(
                            key.clone(),
                            Entry::Resolved {
                                rows,
                                order: batch.order.clone(),
                            },
                        );
                    }
                    Err(_) => {
                        state.entries.remove(key);
                    }
                }
            }
        }
        outcome
    }

    async fn fetch<E: Executor>(
        &self,
        exec: &E,
        batch: &Batch,
        keys: &[CanonicalKey],
    ) -> Result<BatchRows> {
        let compiler = FilterCompiler::new(&self.schema);
        let table = compiler.table(&self.table)?;
        let dialect = exec.dialect();

        let condition = compiler.compile(&self.table, &self.key_filter(keys))?;
        let order_by = match &batch.order {
            Some(order) => build_order_and_limit(table, order, &Page::default(), dialect)?.order_by,
            None => SQL::empty(),
        };
        let sql = helpers::select(&self.table, condition, order_by, SQL::empty());

        let rows = exec.query(&Statement::render(&sql, dialect)).await?;

        let mut resolved: HashMap<CanonicalKey, Vec<Row>> = HashMap::with_capacity(keys.len());
        for row in rows {
            let row = row.conform(table);
            if let Some(key) = CanonicalKey::from_row(&self.columns, &row) {
                resolved.entry(key).or_default().push(row);
            }
        }
        Ok(Arc::new(resolved))
    }

    /// `col IN (...)` for single-column keys, an OR of conjunctions otherwise.
    fn key_filter(&self, keys: &[CanonicalKey]) -> Filter {
        if let [column] = self.columns.as_slice() {
            return col(column.as_str())
                .is_in(keys.iter().map(|key| key.0[0].to_value()))
                .into();
        }

        Filter::or(keys.iter().map(|key| {
            Filter::and(
                self.columns
                    .iter()
                    .zip(key.0.iter())
                    .map(|(column, part)| col(column.as_str()).equals(part.to_value())),
            )
        }))
    }

    fn check_order(&self, first: Option<&OrderSpec>, requested: Option<&OrderSpec>) {
        if let Some(requested) = requested
            && first != Some(requested)
        {
            rowgate_warn!(
                table = %self.table,
                requested = ?requested,
                applied = ?first,
                "rowgate.loader: ordering differs from the first request for this key; keeping the first"
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoaderState> {
        lock(&self.state)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
