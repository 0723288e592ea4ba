//! Control command handlers.

use std::path::Path;

use tabled::Tabled;
use thr_core::{
    Control, ControlForm, ControlId, CoreError, FamilyId, FilterContext, Registry, SaveOutcome,
    Sort, SortColumn, SubmitOutcome, TechnologyId,
};

use crate::cli::{ControlsArgs, ControlsCommand, ControlsListArgs, GlobalOpts, SortArg};
use crate::error::CliError;
use crate::output;

use super::util;

fn map_sort_column(arg: SortArg) -> SortColumn {
    match arg {
        SortArg::Id => SortColumn::Id,
        SortArg::ControlFamily => SortColumn::ControlFamily,
        SortArg::ControlType => SortColumn::ControlType,
        SortArg::Statement => SortColumn::Statement,
        SortArg::ThrCode => SortColumn::ThrCode,
    }
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ControlRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Technology")]
    technology: String,
    #[tabled(rename = "Rank")]
    ranking: String,
    #[tabled(rename = "Control Family")]
    control_family: String,
    #[tabled(rename = "Type")]
    control_type: String,
    #[tabled(rename = "Statement")]
    statement: String,
}

impl From<&Control> for ControlRow {
    fn from(c: &Control) -> Self {
        Self {
            id: c.id.to_string(),
            technology: c
                .technology_title
                .clone()
                .unwrap_or_else(|| c.tech_id.to_string()),
            ranking: c.ranking.map(|r| r.to_string()).unwrap_or_default(),
            control_family: c.control_family.clone(),
            control_type: c.control_type.clone(),
            statement: output::truncate(&c.statement, 60),
        }
    }
}

fn control_detail(c: &Control, color: bool) -> String {
    let opt = |v: Option<&str>| v.map_or_else(|| output::absent(color), ToOwned::to_owned);
    let when = |v: Option<chrono::DateTime<chrono::Utc>>| {
        v.map_or_else(
            || output::absent(color),
            |t| t.format("%Y-%m-%d %H:%M UTC").to_string(),
        )
    };
    let l = |s: &str| output::label(s, color);

    [
        format!("{}          {}", l("ID:"), c.id),
        format!(
            "{}  {} ({})",
            l("Technology:"),
            c.technology_title.as_deref().unwrap_or("?"),
            c.tech_id
        ),
        format!("{}      {}", l("Family:"), opt(c.family_title.as_deref())),
        format!("{} {}", l("Ctrl Family:"), c.control_family),
        format!("{}   {}", l("Ctrl Type:"), c.control_type),
        format!(
            "{}     {}",
            l("Ranking:"),
            c.ranking
                .map_or_else(|| output::absent(color), |r| r.to_string())
        ),
        format!("{}  {}", l("Monitor ID:"), opt(c.monitor_id.as_deref())),
        format!("{} {}", l("Description:"), c.description),
        format!("{}   {}", l("Statement:"), c.statement),
        format!("{}      {}", l("Recommendation:"), c.recommendation),
        format!("{}\n{}", l("THR Code:"), c.thr_code.trim_end()),
        format!("{}    {}", l("Comments:"), opt(c.comments.as_deref())),
        format!("{}     {}", l("Created:"), when(c.created_at)),
        format!("{}     {}", l("Updated:"), when(c.updated_at)),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    registry: &Registry,
    args: ControlsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ControlsCommand::List(list) => list_controls(registry, list, global).await,

        ControlsCommand::Get { id } => {
            let control = registry.controls().get(&ControlId::from(id)).await?;
            let color = output::should_color(&global.color);
            let out = output::render_single(
                &global.output,
                &control,
                |c| control_detail(c, color),
                |c| c.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ControlsCommand::Save { from_file, tech } => {
            save_control(registry, &from_file, tech, global).await
        }

        ControlsCommand::Delete { id } => {
            let id = ControlId::from(id);
            // Resolve first so a typo reports "not found" before prompting.
            registry.controls().get(&id).await?;
            if !util::confirm(
                &format!("Delete control '{id}'? This cannot be undone."),
                "controls delete",
                global.yes,
            )? {
                return Ok(());
            }
            registry.controls().delete(&id).await?;
            if !global.quiet {
                eprintln!("Control '{id}' deleted");
            }
            Ok(())
        }
    }
}

async fn list_controls(
    registry: &Registry,
    list: ControlsListArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let sort = list.sort.map(|arg| {
        let column = map_sort_column(arg);
        if list.desc {
            Sort::desc(column)
        } else {
            Sort::asc(column)
        }
    });
    let ctx = FilterContext {
        technology_id: list.tech.map(TechnologyId::from),
        family_id: list.family.map(FamilyId::from),
        search: list.search.unwrap_or_default(),
        sort,
    };

    let service = registry.controls();
    let controls = if service.set_context(ctx).await? {
        service.snapshot().controls
    } else {
        service.fetch().await?
    };

    let out = output::render_list(&global.output, &controls, |c: &Control| ControlRow::from(c), |c| {
        c.id.to_string()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn save_control(
    registry: &Registry,
    path: &Path,
    tech: Option<String>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let draft = util::read_control_file(path)?;
    let service = registry.controls();

    // Existing id -> edit form (id and technology fixed); otherwise create.
    let existing = if draft.id.trim().is_empty() {
        None
    } else {
        match service.get(&ControlId::from(draft.id.trim())).await {
            Ok(control) => Some(control),
            Err(CoreError::ControlNotFound { .. }) => None,
            Err(e) => return Err(e.into()),
        }
    };
    let mut form = match existing {
        Some(ref control) => ControlForm::edit(control),
        None => {
            let technology = tech.or_else(|| draft.tech_id.clone()).map(TechnologyId::from);
            ControlForm::create(technology.as_ref())?
        }
    };
    form.apply_draft(&draft);

    if let Some(warning) = form.thr_code_warning() {
        tracing::warn!(%warning, "THR code check");
        if !global.quiet {
            eprintln!("warning: {warning}");
        }
    }

    match form.submit(service).await {
        SubmitOutcome::Saved(outcome) => {
            if !global.quiet {
                let verb = match outcome {
                    SaveOutcome::Created => "created",
                    SaveOutcome::Updated => "updated",
                };
                eprintln!("Control '{}' {verb}", form.value(thr_core::FormField::Id));
            }
            Ok(())
        }
        SubmitOutcome::Invalid => Err(CliError::InvalidControl {
            details: form
                .errors()
                .values()
                .cloned()
                .collect::<Vec<_>>()
                .join("\n"),
        }),
        SubmitOutcome::Failed(e) => Err(e.into()),
    }
}
