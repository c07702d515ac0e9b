//! Units of work.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use compact_str::CompactString;
use hashbrown::HashMap;
use rowgate_core::error::{Result, RowgateError};
use rowgate_core::exec::Executor;
use rowgate_core::loader::{BatchLoader, LoaderKind, LoaderOptions};
use rowgate_core::rowgate_warn;
use rowgate_types::{ColumnDef, SchemaDef, SemanticType, TableDef};

use crate::config::RowgateConfig;
use crate::table::TableClient;

/// Schema metadata plus configuration, shared by every unit of work.
///
/// `Rowgate` holds no caches; call [`scope`](Self::scope) once per request to
/// get a [`Scope`] that owns the loaders for that request.
#[derive(Debug, Clone)]
pub struct Rowgate {
    schema: Arc<SchemaDef>,
    config: RowgateConfig,
}

impl Rowgate {
    pub fn new(schema: SchemaDef) -> Self {
        Self::with_config(schema, RowgateConfig::default())
    }

    pub fn with_config(schema: SchemaDef, config: RowgateConfig) -> Self {
        Self {
            schema: Arc::new(schema),
            config,
        }
    }

    pub fn schema(&self) -> &SchemaDef {
        &self.schema
    }

    pub fn config(&self) -> &RowgateConfig {
        &self.config
    }

    /// Opens a unit of work running on `exec`.
    pub fn scope<E: Executor>(&self, exec: E) -> Scope<'_, E> {
        if exec.dialect() != self.config.dialect {
            rowgate_warn!(
                configured = self.config.dialect.as_str(),
                executor = exec.dialect().as_str(),
                "rowgate.scope: executor dialect differs from the configured one; rendering for the executor"
            );
        }
        Scope {
            gate: self,
            exec,
            loaders: Mutex::new(HashMap::new()),
        }
    }
}

/// Identifies one loader: table, key columns (sorted) and kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LoaderSlot {
    table: CompactString,
    columns: Vec<CompactString>,
    kind: LoaderKind,
}

/// One unit of work: an executor plus the loaders (and their caches) that
/// live exactly as long as the request does.
///
/// Dropping the scope drops every cached row. Never share a scope between
/// independent requests.
pub struct Scope<'r, E> {
    gate: &'r Rowgate,
    exec: E,
    loaders: Mutex<HashMap<LoaderSlot, Arc<BatchLoader>>>,
}

impl<E> std::fmt::Debug for Scope<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("loaders", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl<'r, E: Executor> Scope<'r, E> {
    /// Accessor for `table`.
    pub fn table(&self, name: &str) -> Result<TableClient<'_, 'r, E>> {
        let table = self
            .gate
            .schema
            .table(name)
            .ok_or_else(|| RowgateError::UnknownTable(name.into()))?;
        Ok(TableClient::new(self, table))
    }

    pub fn executor(&self) -> &E {
        &self.exec
    }

    pub(crate) fn schema(&self) -> &'r SchemaDef {
        &self.gate.schema
    }

    /// The table's soft-delete flag column, if it has one.
    pub(crate) fn soft_delete_column(&self, table: &'r TableDef) -> Option<&'r ColumnDef> {
        table
            .column(&self.gate.config.soft_delete_column)
            .filter(|column| matches!(column.semantic, SemanticType::Boolean | SemanticType::Number))
    }

    /// The loader for `columns` of `table`, created on first use.
    pub(crate) fn loader(
        &self,
        table: &str,
        columns: &[&str],
        kind: LoaderKind,
    ) -> Result<Arc<BatchLoader>> {
        let mut sorted: Vec<CompactString> = columns.iter().map(|c| CompactString::from(*c)).collect();
        sorted.sort_unstable();
        let slot = LoaderSlot {
            table: table.into(),
            columns: sorted,
            kind,
        };

        let mut loaders = self.lock();
        if let Some(loader) = loaders.get(&slot) {
            return Ok(Arc::clone(loader));
        }
        let loader = Arc::new(BatchLoader::new(
            Arc::clone(&self.gate.schema),
            table,
            columns,
            kind,
            LoaderOptions::from(self.gate.config.loader),
        )?);
        loaders.insert(slot, Arc::clone(&loader));
        Ok(loader)
    }

    /// Drops the cached rows of every loader on `table`.
    pub(crate) fn invalidate(&self, table: &str) {
        for (slot, loader) in self.lock().iter() {
            if slot.table == table {
                loader.clear();
            }
        }
    }

    /// Drops every cached row in this scope.
    pub fn clear(&self) {
        for loader in self.lock().values() {
            loader.clear();
        }
    }
}

impl<E> Scope<'_, E> {
    fn lock(&self) -> MutexGuard<'_, HashMap<LoaderSlot, Arc<BatchLoader>>> {
        self.loaders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
