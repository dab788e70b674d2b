use anyhow::Result;
use colored::Colorize;
use declarative::Phase;
use edgeconf::handler::PlannedStep;
use std::collections::HashSet;

use crate::Context;
use crate::cli::PlanArgs;
use crate::ui;

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let service = super::service(args.kind.kind);
    let old = super::load_document(&args.old)?;
    let new = super::load_document(&args.new)?;
    service.validate_all(&new)?;

    let previews = service.preview_all(&old, &new)?;

    if !ctx.quiet {
        ui::header(&format!("Plan for {} service", service.metadata().kind));
    }

    let mut removals = 0;
    let mut creations = 0;
    for (key, steps) in &previews {
        if steps.is_empty() {
            continue;
        }
        ui::section(key);
        display_steps(steps, ctx.verbose > 0);
        removals += steps.iter().filter(|s| s.phase == Phase::Remove).count();
        creations += steps.iter().filter(|s| s.phase == Phase::Create).count();
    }

    println!();
    if removals + creations == 0 {
        ui::success("No changes - remote matches the declaration");
    } else {
        println!(
            "{} {} to delete, {} to create",
            "Plan:".bold(),
            removals.to_string().red(),
            creations.to_string().green()
        );
    }

    Ok(())
}

/// Print steps, collapsing a delete and create of the same key into one
/// replacement line unless every step was asked for
fn display_steps(steps: &[PlannedStep], expand: bool) {
    if expand {
        steps.iter().for_each(ui::step);
        return;
    }

    let removed: HashSet<&str> = steps
        .iter()
        .filter(|s| s.phase == Phase::Remove)
        .map(|s| s.key.as_str())
        .collect();
    let created: HashSet<&str> = steps
        .iter()
        .filter(|s| s.phase == Phase::Create)
        .map(|s| s.key.as_str())
        .collect();

    for step in steps {
        let replaced = removed.contains(step.key.as_str()) && created.contains(step.key.as_str());
        match (replaced, step.phase) {
            (true, Phase::Remove) => ui::replacement(&step.key),
            (true, Phase::Create) => {}
            (false, _) => ui::step(step),
        }
    }
}
