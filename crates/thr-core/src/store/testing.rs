// Test doubles shared by the service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{ControlQuery, MemoryStore, RegistryStore, Scope};
use crate::error::CoreError;
use crate::model::{Control, ControlId, FamilyId, Technology, TechnologyFamily};

fn boom() -> CoreError {
    CoreError::Api {
        message: "connection reset by peer".into(),
        code: None,
        status: Some(502),
    }
}

/// Store whose every operation fails.
pub(crate) struct FailingStore;

#[async_trait]
impl RegistryStore for FailingStore {
    async fn list_families(&self) -> Result<Vec<TechnologyFamily>, CoreError> {
        Err(boom())
    }

    async fn list_technologies(
        &self,
        _family: Option<&FamilyId>,
    ) -> Result<Vec<Technology>, CoreError> {
        Err(boom())
    }

    async fn list_controls(&self, _query: &ControlQuery) -> Result<Vec<Control>, CoreError> {
        Err(boom())
    }

    async fn get_control(&self, _id: &ControlId) -> Result<Option<Control>, CoreError> {
        Err(boom())
    }

    async fn update_control(&self, _control: &Control) -> Result<bool, CoreError> {
        Err(boom())
    }

    async fn insert_control(&self, _control: &Control) -> Result<(), CoreError> {
        Err(boom())
    }

    async fn delete_control(&self, _id: &ControlId) -> Result<(), CoreError> {
        Err(boom())
    }
}

/// Wraps a `MemoryStore`; reads whose scope key has a gate wait for it
/// to be released. Writes and ungated reads pass straight through.
pub(crate) struct GatedStore {
    inner: MemoryStore,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    failing: AtomicBool,
}

impl GatedStore {
    pub(crate) fn new(inner: MemoryStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gates: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        })
    }

    /// Hold the next read for `key` until the returned sender fires.
    pub(crate) fn gate(&self, key: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(key.to_owned(), rx);
        tx
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(boom())
        } else {
            Ok(())
        }
    }

    async fn wait(&self, key: &str) {
        let gate = self.gates.lock().unwrap().remove(key);
        if let Some(rx) = gate {
            let _ = rx.await;
        }
    }
}

fn scope_key(scope: &Scope) -> String {
    match scope {
        Scope::All => String::new(),
        Scope::Family(f) => f.to_string(),
        Scope::Technology(t) => t.to_string(),
    }
}

#[async_trait]
impl RegistryStore for GatedStore {
    async fn list_families(&self) -> Result<Vec<TechnologyFamily>, CoreError> {
        self.check()?;
        self.inner.list_families().await
    }

    async fn list_technologies(
        &self,
        family: Option<&FamilyId>,
    ) -> Result<Vec<Technology>, CoreError> {
        self.wait(family.map_or("", FamilyId::as_str)).await;
        self.check()?;
        self.inner.list_technologies(family).await
    }

    async fn list_controls(&self, query: &ControlQuery) -> Result<Vec<Control>, CoreError> {
        self.wait(&scope_key(&query.scope)).await;
        self.check()?;
        self.inner.list_controls(query).await
    }

    async fn get_control(&self, id: &ControlId) -> Result<Option<Control>, CoreError> {
        self.check()?;
        self.inner.get_control(id).await
    }

    async fn update_control(&self, control: &Control) -> Result<bool, CoreError> {
        self.check()?;
        self.inner.update_control(control).await
    }

    async fn insert_control(&self, control: &Control) -> Result<(), CoreError> {
        self.check()?;
        self.inner.insert_control(control).await
    }

    async fn delete_control(&self, id: &ControlId) -> Result<(), CoreError> {
        self.check()?;
        self.inner.delete_control(id).await
    }
}

/// Two families, three technologies, a handful of controls.
pub(crate) fn sample_store() -> MemoryStore {
    use crate::model::control::fixtures::control;

    let mut tde = control("DB-MY-002", "mysql", Some(1));
    tde.statement = "Transparent Data Encryption (TDE) must be enabled".into();
    let mut tde_pg = control("DB-PG-001", "pg", None);
    tde_pg.description = "Use tde-style encryption via pgcrypto".into();

    MemoryStore::with_data(
        vec![
            TechnologyFamily {
                id: "OS".into(),
                title: "Operating Systems".into(),
            },
            TechnologyFamily {
                id: "DB".into(),
                title: "Database".into(),
            },
        ],
        vec![
            Technology {
                id: "win-11".into(),
                title: "Windows 11".into(),
                family_id: "OS".into(),
            },
            Technology {
                id: "mysql".into(),
                title: "MySQL 8.0".into(),
                family_id: "DB".into(),
            },
            Technology {
                id: "pg".into(),
                title: "PostgreSQL 15".into(),
                family_id: "DB".into(),
            },
        ],
        vec![
            control("OS-WIN-001", "win-11", Some(1)),
            control("OS-WIN-002", "win-11", None),
            control("DB-MY-001", "mysql", Some(2)),
            tde,
            tde_pg,
        ],
    )
}
