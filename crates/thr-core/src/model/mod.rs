// ── Canonical domain model ──

pub mod control;
pub mod directory;
pub mod ids;

pub use control::Control;
pub use directory::{Technology, TechnologyFamily};
pub use ids::{ControlId, FamilyId, TechnologyId};
