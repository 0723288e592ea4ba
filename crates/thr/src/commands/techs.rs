//! Technology command handlers.

use tabled::Tabled;
use thr_core::{FamilyId, Registry, Technology};

use crate::cli::{GlobalOpts, TechsArgs, TechsCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct TechRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Family")]
    family: String,
}

impl From<&Technology> for TechRow {
    fn from(t: &Technology) -> Self {
        Self {
            id: t.id.to_string(),
            title: t.title.clone(),
            family: t.family_id.to_string(),
        }
    }
}

pub async fn handle(
    registry: &Registry,
    args: TechsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        TechsCommand::List { family } => {
            let family = family.map(FamilyId::from);
            let techs = registry
                .directory()
                .load_technologies(family.as_ref())
                .await?;
            let out =
                output::render_list(&global.output, &techs, |t: &Technology| TechRow::from(t), |t| t.id.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
