// ── Technology directory ──
//
// Read-only family/technology lists, published as one `watch` snapshot.
// Technology loads carry a ticket; a response for a family the user has
// already moved away from is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{FamilyId, Technology, TechnologyFamily};
use crate::store::RegistryStore;

pub const FAMILIES_ERROR: &str = "Failed to fetch technology families";
pub const TECHNOLOGIES_ERROR: &str = "Failed to fetch technologies";

/// Snapshot of the directory as the UI sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryView {
    pub families: Vec<TechnologyFamily>,
    pub technologies: Vec<Technology>,
    /// Family the technology list was loaded for (`None` = all families).
    pub technologies_for: Option<FamilyId>,
    pub loading_families: bool,
    pub loading_technologies: bool,
    pub error: Option<String>,
}

impl DirectoryView {
    pub fn loading(&self) -> bool {
        self.loading_families || self.loading_technologies
    }
}

/// Loads families and technologies. Cheaply cloneable.
#[derive(Clone)]
pub struct DirectoryService {
    inner: Arc<DirectoryInner>,
}

struct DirectoryInner {
    store: Arc<dyn RegistryStore>,
    view: watch::Sender<DirectoryView>,
    tech_ticket: AtomicU64,
}

impl DirectoryService {
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        let (view, _) = watch::channel(DirectoryView::default());
        Self {
            inner: Arc::new(DirectoryInner {
                store,
                view,
                tech_ticket: AtomicU64::new(0),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DirectoryView> {
        self.inner.view.subscribe()
    }

    pub fn snapshot(&self) -> DirectoryView {
        self.inner.view.borrow().clone()
    }

    /// Replace the family list. On failure the previous list is kept and
    /// the view carries [`FAMILIES_ERROR`].
    pub async fn load_families(&self) -> Result<Vec<TechnologyFamily>, CoreError> {
        self.inner.view.send_modify(|v| v.loading_families = true);

        match self.inner.store.list_families().await {
            Ok(families) => {
                debug!(count = families.len(), "technology families loaded");
                self.inner.view.send_modify(|v| {
                    v.families.clone_from(&families);
                    v.loading_families = false;
                    v.error = None;
                });
                Ok(families)
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch technology families");
                self.inner.view.send_modify(|v| {
                    v.loading_families = false;
                    v.error = Some(FAMILIES_ERROR.into());
                });
                Err(e)
            }
        }
    }

    /// Replace the technology list with `family`'s technologies (all
    /// technologies when `None`). Results for superseded requests are
    /// returned to the caller but not published.
    pub async fn load_technologies(
        &self,
        family: Option<&FamilyId>,
    ) -> Result<Vec<Technology>, CoreError> {
        let ticket = self.reserve_technologies();
        self.load_reserved_technologies(ticket, family).await
    }

    /// Take a ticket for a technology load without awaiting. Spawning
    /// callers reserve first so that the last reservation wins.
    pub fn reserve_technologies(&self) -> u64 {
        let ticket = self.inner.tech_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .view
            .send_modify(|v| v.loading_technologies = true);
        ticket
    }

    /// Run a technology load for a ticket from
    /// [`reserve_technologies`](Self::reserve_technologies).
    pub async fn load_reserved_technologies(
        &self,
        ticket: u64,
        family: Option<&FamilyId>,
    ) -> Result<Vec<Technology>, CoreError> {
        let result = self.inner.store.list_technologies(family).await;
        let is_latest = || self.inner.tech_ticket.load(Ordering::SeqCst) == ticket;

        match result {
            Ok(technologies) => {
                let published = self.inner.view.send_if_modified(|v| {
                    if !is_latest() {
                        return false;
                    }
                    v.technologies.clone_from(&technologies);
                    v.technologies_for = family.cloned();
                    v.loading_technologies = false;
                    v.error = None;
                    true
                });
                if published {
                    debug!(count = technologies.len(), family = ?family, "technologies loaded");
                } else {
                    debug!(ticket, family = ?family, "dropping stale technology list");
                }
                Ok(technologies)
            }
            Err(e) if !is_latest() => {
                debug!(ticket, error = %e, "dropping stale technology failure");
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, family = ?family, "failed to fetch technologies");
                self.inner.view.send_modify(|v| {
                    v.loading_technologies = false;
                    v.error = Some(TECHNOLOGIES_ERROR.into());
                });
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::store::testing::{FailingStore, GatedStore, sample_store};

    fn titles(techs: &[Technology]) -> Vec<&str> {
        techs.iter().map(|t| t.title.as_str()).collect()
    }

    #[tokio::test]
    async fn families_load_into_view() {
        let service = DirectoryService::new(Arc::new(sample_store()));
        let families = service.load_families().await.unwrap();

        let view = service.snapshot();
        assert_eq!(view.families, families);
        assert_eq!(view.families[0].title, "Database");
        assert!(!view.loading());
        assert_eq!(view.error, None);
    }

    #[tokio::test]
    async fn technologies_filter_by_family() {
        let service = DirectoryService::new(Arc::new(sample_store()));
        service
            .load_technologies(Some(&FamilyId::from("DB")))
            .await
            .unwrap();

        let view = service.snapshot();
        assert_eq!(titles(&view.technologies), vec!["MySQL 8.0", "PostgreSQL 15"]);
        assert_eq!(view.technologies_for, Some(FamilyId::from("DB")));

        service.load_technologies(None).await.unwrap();
        assert_eq!(service.snapshot().technologies.len(), 3);
    }

    #[tokio::test]
    async fn family_failure_sets_fixed_message() {
        let service = DirectoryService::new(Arc::new(FailingStore));
        assert!(service.load_families().await.is_err());

        let view = service.snapshot();
        assert_eq!(view.error.as_deref(), Some(FAMILIES_ERROR));
        assert!(!view.loading());
    }

    #[tokio::test]
    async fn technology_failure_keeps_previous_list() {
        let store = GatedStore::new(sample_store());
        let service = DirectoryService::new(store.clone());
        service
            .load_technologies(Some(&FamilyId::from("OS")))
            .await
            .unwrap();

        store.set_failing(true);
        assert!(
            service
                .load_technologies(Some(&FamilyId::from("DB")))
                .await
                .is_err()
        );

        let view = service.snapshot();
        assert_eq!(titles(&view.technologies), vec!["Windows 11"]);
        assert_eq!(view.error.as_deref(), Some(TECHNOLOGIES_ERROR));
    }

    #[tokio::test]
    async fn stale_technology_response_is_dropped() {
        let store = GatedStore::new(sample_store());
        let service = DirectoryService::new(store.clone());
        let release_os = store.gate("OS");

        let slow = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .load_technologies(Some(&FamilyId::from("OS")))
                    .await
            })
        };
        tokio::task::yield_now().await;

        service
            .load_technologies(Some(&FamilyId::from("DB")))
            .await
            .unwrap();
        release_os.send(()).unwrap();
        let stale = slow.await.unwrap().unwrap();
        assert_eq!(titles(&stale), vec!["Windows 11"]);

        let view = service.snapshot();
        assert_eq!(view.technologies_for, Some(FamilyId::from("DB")));
        assert_eq!(titles(&view.technologies), vec!["MySQL 8.0", "PostgreSQL 15"]);
        assert!(!view.loading());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn last_reservation_wins_whichever_task_runs_first() {
        let service = DirectoryService::new(Arc::new(sample_store()));
        for _ in 0..100 {
            let mut tasks = Vec::new();
            for family in ["OS", "DB"] {
                let ticket = service.reserve_technologies();
                let service = service.clone();
                tasks.push(tokio::spawn(async move {
                    service
                        .load_reserved_technologies(ticket, Some(&FamilyId::from(family)))
                        .await
                }));
            }
            for task in tasks {
                task.await.unwrap().unwrap();
            }
            let view = service.snapshot();
            assert_eq!(view.technologies_for, Some(FamilyId::from("DB")));
            assert!(!view.loading());
        }
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let service = DirectoryService::new(Arc::new(sample_store()));
        let mut rx = service.subscribe();
        service.load_families().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().families.len(), 2);
    }
}
