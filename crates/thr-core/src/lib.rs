//! Registry services between `thr-api` and the UI consumers (CLI / TUI).
//!
//! This crate owns the domain model and the fetch/filter/sort/edit
//! pipeline of the THR console:
//!
//! - **[`Registry`]**: facade holding the store and both services.
//!   [`Registry::connect`] talks to a remote store, [`Registry::demo`]
//!   runs on in-memory sample data.
//!
//! - **[`RegistryStore`]**: async trait every backend implements.
//!   [`RestStore`] speaks PostgREST, [`MemoryStore`] applies the same
//!   query semantics in process.
//!
//! - **[`DirectoryService`]** / **[`ControlsService`]**: load data and
//!   publish [`DirectoryView`] / [`ControlsView`] snapshots through
//!   `tokio::sync::watch`. Controls fetches are ticketed so a slow,
//!   superseded response never overwrites a newer one.
//!
//! - **[`Selection`]**, **[`SortState`]**, **[`ControlForm`]**: pure state
//!   for the selector bar, column sorting and the edit form.

pub mod config;
pub mod controls;
pub mod convert;
pub mod directory;
pub mod error;
pub mod form;
pub mod model;
pub mod registry;
pub mod selection;
pub mod sort;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{RegistryConfig, TlsVerification};
pub use controls::{
    ControlsService, ControlsView, FilterContext, PAGE_SIZE, PendingFetch, SaveOutcome,
};
pub use directory::{DirectoryService, DirectoryView};
pub use error::CoreError;
pub use form::{ControlDraft, ControlForm, FieldErrors, FormField, FormMode, SubmitOutcome};
pub use registry::Registry;
pub use selection::{FamilyRef, Selection, SelectionChange, TechnologyRef};
pub use sort::{Sort, SortColumn, SortDirection, SortState};
pub use store::{ControlOrder, ControlQuery, MemoryStore, RegistryStore, RestStore, Scope};

pub use model::{Control, ControlId, FamilyId, Technology, TechnologyFamily, TechnologyId};
