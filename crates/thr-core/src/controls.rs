// ── Controls service ──
//
// Turns a `FilterContext` into a controls query, publishes the result as
// a `watch` snapshot, and performs upsert/delete followed by a re-fetch.
// Every fetch takes a ticket; only the latest ticket may publish.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{Control, ControlId, FamilyId, TechnologyId};
use crate::sort::Sort;
use crate::store::{ControlOrder, ControlQuery, RegistryStore, Scope};

/// Maximum rows per fetch. There is no further paging.
pub const PAGE_SIZE: usize = 50;

pub const FETCH_ERROR: &str = "Failed to fetch controls";
pub const SAVE_ERROR: &str = "Failed to save control";
pub const DELETE_ERROR: &str = "Failed to delete control";

/// What the controls list is showing. Technology wins over family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterContext {
    pub technology_id: Option<TechnologyId>,
    pub family_id: Option<FamilyId>,
    pub search: String,
    pub sort: Option<Sort>,
}

impl FilterContext {
    /// Resolve into a store query.
    pub fn to_query(&self) -> ControlQuery {
        let scope = match (&self.technology_id, &self.family_id) {
            (Some(tech), _) => Scope::Technology(tech.clone()),
            (None, Some(family)) => Scope::Family(family.clone()),
            (None, None) => Scope::All,
        };
        let term = self.search.trim();
        ControlQuery {
            scope,
            search: (!term.is_empty()).then(|| term.to_owned()),
            order: self.sort.map_or(ControlOrder::RankingThenId, ControlOrder::By),
            limit: PAGE_SIZE,
        }
    }
}

/// Snapshot of the controls list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlsView {
    pub controls: Vec<Control>,
    pub loading: bool,
    pub error: Option<String>,
    /// Context the current `controls` were fetched for.
    pub context: FilterContext,
}

/// A fetch whose ticket was taken by [`ControlsService::request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    ticket: u64,
    context: FilterContext,
}

/// Result of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

/// Fetches and mutates controls. Cheaply cloneable.
#[derive(Clone)]
pub struct ControlsService {
    inner: Arc<ControlsInner>,
}

struct ControlsInner {
    store: Arc<dyn RegistryStore>,
    view: watch::Sender<ControlsView>,
    /// Context requested most recently; may be ahead of `view.context`
    /// while a fetch is in flight.
    context: watch::Sender<FilterContext>,
    ticket: AtomicU64,
}

impl ControlsService {
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        let (view, _) = watch::channel(ControlsView::default());
        let (context, _) = watch::channel(FilterContext::default());
        Self {
            inner: Arc::new(ControlsInner {
                store,
                view,
                context,
                ticket: AtomicU64::new(0),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ControlsView> {
        self.inner.view.subscribe()
    }

    pub fn snapshot(&self) -> ControlsView {
        self.inner.view.borrow().clone()
    }

    pub fn context(&self) -> FilterContext {
        self.inner.context.borrow().clone()
    }

    /// Store `ctx` and re-fetch if it differs from the current context.
    /// Returns `Ok(true)` when a fetch ran.
    pub async fn set_context(&self, ctx: FilterContext) -> Result<bool, CoreError> {
        let Some(pending) = self.request(ctx) else {
            return Ok(false);
        };
        self.fetch_pending(pending).await?;
        Ok(true)
    }

    /// Store `ctx` and reserve a fetch ticket for it, without awaiting.
    ///
    /// Returns `None` when `ctx` equals the current context. Callers that
    /// spawn the fetch must call this first, on their own task, so that the
    /// order of requests is the order of calls.
    pub fn request(&self, ctx: FilterContext) -> Option<PendingFetch> {
        let mut pending = None;
        self.inner.context.send_if_modified(|current| {
            if *current == ctx {
                return false;
            }
            current.clone_from(&ctx);
            pending = Some(PendingFetch {
                ticket: self.next_ticket(),
                context: ctx.clone(),
            });
            true
        });
        if pending.is_some() {
            self.inner.view.send_modify(|v| v.loading = true);
        }
        pending
    }

    /// Fetch controls for the current context and publish them.
    ///
    /// Failure keeps the previously published rows and sets [`FETCH_ERROR`].
    /// A result whose ticket has been superseded is returned but not published.
    pub async fn fetch(&self) -> Result<Vec<Control>, CoreError> {
        let mut pending = PendingFetch {
            ticket: 0,
            context: FilterContext::default(),
        };
        // Read the context and take the ticket under the same lock as `request`.
        self.inner.context.send_if_modified(|current| {
            pending = PendingFetch {
                ticket: self.next_ticket(),
                context: current.clone(),
            };
            false
        });
        self.inner.view.send_modify(|v| v.loading = true);
        self.fetch_pending(pending).await
    }

    /// Run a fetch reserved by [`request`](Self::request).
    pub async fn fetch_pending(&self, pending: PendingFetch) -> Result<Vec<Control>, CoreError> {
        let PendingFetch { ticket, context } = pending;
        let query = context.to_query();
        let result = self.inner.store.list_controls(&query).await;

        match result {
            Ok(controls) => {
                let published = self.inner.view.send_if_modified(|v| {
                    if !self.is_latest(ticket) {
                        return false;
                    }
                    v.controls.clone_from(&controls);
                    v.loading = false;
                    v.error = None;
                    v.context = context;
                    true
                });
                if published {
                    debug!(count = controls.len(), scope = ?query.scope, "controls loaded");
                } else {
                    debug!(ticket, "dropping stale controls response");
                }
                Ok(controls)
            }
            Err(e) if !self.is_latest(ticket) => {
                debug!(ticket, error = %e, "dropping stale controls failure");
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, scope = ?query.scope, "failed to fetch controls");
                self.set_error(FETCH_ERROR);
                Err(e)
            }
        }
    }

    fn next_ticket(&self) -> u64 {
        self.inner.ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, ticket: u64) -> bool {
        self.inner.ticket.load(Ordering::SeqCst) == ticket
    }

    /// Update-by-id, or insert when no control has that id, then re-fetch.
    pub async fn save(&self, control: &Control) -> Result<SaveOutcome, CoreError> {
        let result = match self.inner.store.update_control(control).await {
            Ok(true) => Ok(SaveOutcome::Updated),
            Ok(false) => self
                .inner
                .store
                .insert_control(control)
                .await
                .map(|()| SaveOutcome::Created),
            Err(e) => Err(e),
        };

        match result {
            Ok(outcome) => {
                info!(id = %control.id, ?outcome, "control saved");
                // A failed re-fetch is reported through the view; the save stands.
                let _ = self.fetch().await;
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, id = %control.id, "failed to save control");
                self.set_error(SAVE_ERROR);
                Err(e)
            }
        }
    }

    /// Delete by id, then re-fetch.
    pub async fn delete(&self, id: &ControlId) -> Result<(), CoreError> {
        match self.inner.store.delete_control(id).await {
            Ok(()) => {
                info!(%id, "control deleted");
                let _ = self.fetch().await;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, %id, "failed to delete control");
                self.set_error(DELETE_ERROR);
                Err(e)
            }
        }
    }

    /// Look up one control (not published to the view).
    pub async fn get(&self, id: &ControlId) -> Result<Control, CoreError> {
        self.inner
            .store
            .get_control(id)
            .await?
            .ok_or_else(|| CoreError::ControlNotFound {
                identifier: id.to_string(),
            })
    }

    fn set_error(&self, message: &str) {
        self.inner.view.send_modify(|v| {
            v.loading = false;
            v.error = Some(message.to_owned());
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::control::fixtures::control;
    use crate::sort::{SortColumn, SortDirection};
    use crate::store::MemoryStore;
    use crate::store::testing::{FailingStore, GatedStore, sample_store};

    fn service() -> ControlsService {
        ControlsService::new(Arc::new(sample_store()))
    }

    fn tech(id: &str) -> FilterContext {
        FilterContext {
            technology_id: Some(TechnologyId::from(id)),
            ..FilterContext::default()
        }
    }

    fn ids(rows: &[Control]) -> Vec<&str> {
        rows.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn technology_takes_precedence_over_family() {
        let ctx = FilterContext {
            technology_id: Some("mysql".into()),
            family_id: Some("OS".into()),
            search: "  ".into(),
            sort: None,
        };
        let query = ctx.to_query();
        assert_eq!(query.scope, Scope::Technology("mysql".into()));
        assert_eq!(query.search, None);
        assert_eq!(query.order, ControlOrder::RankingThenId);
        assert_eq!(query.limit, PAGE_SIZE);
    }

    #[tokio::test]
    async fn technology_filter_returns_only_that_technology() {
        let service = service();
        assert!(service.set_context(tech("mysql")).await.unwrap());

        let view = service.snapshot();
        assert!(!view.controls.is_empty());
        assert!(view.controls.iter().all(|c| c.tech_id.as_str() == "mysql"));
        assert_eq!(ids(&view.controls), vec!["DB-MY-002", "DB-MY-001"]);
        assert_eq!(view.context, tech("mysql"));
    }

    #[tokio::test]
    async fn unchanged_context_does_not_refetch() {
        let store = Arc::new(sample_store());
        let service = ControlsService::new(store.clone());
        assert!(service.set_context(tech("mysql")).await.unwrap());
        let calls = store.calls();
        assert!(!service.set_context(tech("mysql")).await.unwrap());
        assert_eq!(store.calls(), calls);
    }

    #[tokio::test]
    async fn search_without_scope_spans_all_technologies() {
        let service = service();
        let ctx = FilterContext {
            search: "TDE".into(),
            ..FilterContext::default()
        };
        service.set_context(ctx).await.unwrap();

        let view = service.snapshot();
        assert_eq!(ids(&view.controls), vec!["DB-MY-002", "DB-PG-001"]);
        assert!(view.controls.iter().all(|c| c.matches_search("tde")));
    }

    #[tokio::test]
    async fn search_is_anded_with_family() {
        let service = service();
        let ctx = FilterContext {
            family_id: Some("OS".into()),
            search: "tde".into(),
            ..FilterContext::default()
        };
        service.set_context(ctx).await.unwrap();
        assert!(service.snapshot().controls.is_empty());
    }

    #[tokio::test]
    async fn explicit_sort_overrides_default() {
        let service = service();
        let ctx = FilterContext {
            family_id: Some("DB".into()),
            sort: Some(Sort {
                column: SortColumn::Id,
                direction: SortDirection::Desc,
            }),
            ..FilterContext::default()
        };
        service.set_context(ctx).await.unwrap();
        assert_eq!(
            ids(&service.snapshot().controls),
            vec!["DB-PG-001", "DB-MY-002", "DB-MY-001"]
        );
    }

    #[tokio::test]
    async fn fetch_is_capped_at_page_size() {
        let controls = (0..75)
            .map(|i| control(&format!("DB-MY-{i:03}"), "mysql-8-0", Some(i)))
            .collect();
        let store = MemoryStore::with_data(
            vec![crate::model::TechnologyFamily {
                id: "DB".into(),
                title: "Database".into(),
            }],
            vec![crate::model::Technology {
                id: "mysql-8-0".into(),
                title: "MySQL 8.0".into(),
                family_id: "DB".into(),
            }],
            controls,
        );
        let service = ControlsService::new(Arc::new(store));
        service.set_context(tech("mysql-8-0")).await.unwrap();

        let view = service.snapshot();
        assert_eq!(view.controls.len(), PAGE_SIZE);
        assert!(view.controls.iter().all(|c| c.tech_id.as_str() == "mysql-8-0"));
        assert!(
            view.controls
                .windows(2)
                .all(|w| w[0].ranking <= w[1].ranking)
        );
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_rows() {
        let store = GatedStore::new(sample_store());
        let service = ControlsService::new(store.clone());
        service.set_context(tech("win-11")).await.unwrap();

        store.set_failing(true);
        assert!(service.set_context(tech("mysql")).await.is_err());

        let view = service.snapshot();
        assert_eq!(view.error.as_deref(), Some(FETCH_ERROR));
        assert_eq!(ids(&view.controls), vec!["OS-WIN-001", "OS-WIN-002"]);
        assert!(!view.loading);
    }

    #[tokio::test]
    async fn stale_response_never_overwrites_newer_one() {
        let store = GatedStore::new(sample_store());
        let service = ControlsService::new(store.clone());
        let release_win = store.gate("win-11");

        let slow = {
            let service = service.clone();
            tokio::spawn(async move { service.set_context(tech("win-11")).await })
        };
        tokio::task::yield_now().await;

        service.set_context(tech("mysql")).await.unwrap();
        release_win.send(()).unwrap();
        slow.await.unwrap().unwrap();

        let view = service.snapshot();
        assert_eq!(view.context, tech("mysql"));
        assert!(view.controls.iter().all(|c| c.tech_id.as_str() == "mysql"));
        assert!(!view.loading);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn back_to_back_requests_settle_on_the_last_one() {
        let service = service();
        for round in 0..200 {
            let older = format!("t{round}");
            let newer = format!("td{round}");
            let mut tasks = Vec::new();
            for search in [&older, &newer] {
                let ctx = FilterContext {
                    search: search.clone(),
                    ..FilterContext::default()
                };
                let pending = service.request(ctx).unwrap();
                let service = service.clone();
                tasks.push(tokio::spawn(async move { service.fetch_pending(pending).await }));
            }
            for task in tasks {
                task.await.unwrap().unwrap();
            }

            assert_eq!(service.context().search, newer);
            let view = service.snapshot();
            assert_eq!(view.context.search, newer, "round {round}");
            assert!(!view.loading);
        }
    }

    #[tokio::test]
    async fn request_is_none_for_the_current_context() {
        let service = service();
        let pending = service.request(tech("mysql")).unwrap();
        assert!(service.snapshot().loading);
        assert!(service.request(tech("mysql")).is_none());

        service.fetch_pending(pending).await.unwrap();
        assert_eq!(service.snapshot().context, tech("mysql"));
    }

    #[tokio::test]
    async fn save_existing_id_updates_in_place() {
        let store = Arc::new(sample_store());
        let service = ControlsService::new(store.clone());
        service.set_context(tech("mysql")).await.unwrap();
        let before = service.snapshot().controls.len();

        let mut edited = service.snapshot().controls[0].clone();
        edited.statement = "Encryption at rest is mandatory".into();
        let outcome = service.save(&edited).await.unwrap();

        assert_eq!(outcome, SaveOutcome::Updated);
        let view = service.snapshot();
        assert_eq!(view.controls.len(), before);
        let saved = view.controls.iter().find(|c| c.id == edited.id).unwrap();
        assert_eq!(saved.statement, "Encryption at rest is mandatory");
        assert_eq!(saved.tech_id, edited.tech_id);
    }

    #[tokio::test]
    async fn save_new_id_creates_exactly_one() {
        let service = service();
        service.set_context(tech("mysql")).await.unwrap();
        let before = service.snapshot().controls.len();

        let outcome = service
            .save(&control("DB-MY-900", "mysql", None))
            .await
            .unwrap();

        assert_eq!(outcome, SaveOutcome::Created);
        let view = service.snapshot();
        assert_eq!(view.controls.len(), before + 1);
        assert_eq!(
            view.controls
                .iter()
                .filter(|c| c.id.as_str() == "DB-MY-900")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn failed_save_sets_message() {
        let service = ControlsService::new(Arc::new(FailingStore));
        let err = service.save(&control("X", "mysql", None)).await;
        assert!(err.is_err());
        assert_eq!(service.snapshot().error.as_deref(), Some(SAVE_ERROR));
    }

    #[tokio::test]
    async fn delete_refetches() {
        let service = service();
        service.set_context(tech("win-11")).await.unwrap();
        service.delete(&"OS-WIN-001".into()).await.unwrap();
        assert_eq!(ids(&service.snapshot().controls), vec!["OS-WIN-002"]);
    }

    #[tokio::test]
    async fn failed_delete_sets_message() {
        let service = ControlsService::new(Arc::new(FailingStore));
        assert!(service.delete(&"X".into()).await.is_err());
        assert_eq!(service.snapshot().error.as_deref(), Some(DELETE_ERROR));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let service = service();
        let err = service.get(&"NOPE".into()).await.unwrap_err();
        assert!(matches!(err, CoreError::ControlNotFound { .. }));
    }
}
