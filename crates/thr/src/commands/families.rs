//! Technology family command handlers.

use tabled::Tabled;
use thr_core::{Registry, TechnologyFamily};

use crate::cli::{FamiliesArgs, FamiliesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct FamilyRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
}

impl From<&TechnologyFamily> for FamilyRow {
    fn from(f: &TechnologyFamily) -> Self {
        Self {
            id: f.id.to_string(),
            title: f.title.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    registry: &Registry,
    args: FamiliesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        FamiliesCommand::List => {
            let families = registry.directory().load_families().await?;
            let out = output::render_list(
                &global.output,
                &families,
                |f: &TechnologyFamily| FamilyRow::from(f),
                |f| f.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
