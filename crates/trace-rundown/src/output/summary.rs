//! Terminal output rendering for correlation results.
//!
//! Provides a human-readable summary of what was reconstructed and how
//! much of it could be cross-referenced.

use crate::aggregator::IngestStats;
use crate::parser::schema::OutputModel;
use colored::*;

/// Render a human-readable summary of a model for the terminal
pub fn render_terminal_summary(model: &OutputModel, stats: &IngestStats) -> String {
    let mut out = String::new();

    out.push_str(&render_header(stats));
    out.push_str(&render_entities(model));
    out.push_str(&render_resolution(model));
    out.push_str(&render_targets(model));
    out.push_str(&render_worklets(model));

    out
}

fn render_header(stats: &IngestStats) -> String {
    let mut out = String::new();
    out.push_str("\n🔎 ");
    out.push_str(&"Trace Rundown Summary".bold().to_string());
    out.push_str("\n---------------------------------------------------\n");
    out.push_str(&format!(
        "Events:   {} read, {} recognized, {} skipped\n",
        stats.events,
        stats.events - stats.unclassified,
        stats.unclassified
    ));
    if stats.rejected_sources > 0 {
        out.push_str(&format!(
            "{} {} script source events were malformed\n",
            "⚠️".yellow(),
            stats.rejected_sources
        ));
    }
    out.push_str("---------------------------------------------------\n\n");
    out
}

fn render_entities(model: &OutputModel) -> String {
    format!(
        "Targets: {}   Execution contexts: {}   Scripts: {}   Worklets: {}\n",
        model.targets().len(),
        model.execution_contexts().len(),
        model.scripts().len(),
        model.worklets().len()
    )
}

fn render_resolution(model: &OutputModel) -> String {
    let mut out = String::new();

    let contexts = model.execution_contexts();
    let resolved = contexts.iter().filter(|c| c.is_resolved()).count();
    out.push_str(&format!(
        "{} Context ids resolved: {}/{}\n",
        status_symbol(resolved, contexts.len()),
        resolved,
        contexts.len()
    ));

    let scripts = model.scripts();
    let with_source = scripts.iter().filter(|s| s.source_text.is_some()).count();
    out.push_str(&format!(
        "{} Scripts with source: {}/{}\n",
        status_symbol(with_source, scripts.len()),
        with_source,
        scripts.len()
    ));

    let with_aux = scripts.iter().filter(|s| s.aux_data.is_some()).count();
    out.push_str(&format!(
        "{} Scripts linked to a context: {}/{}\n",
        status_symbol(with_aux, scripts.len()),
        with_aux,
        scripts.len()
    ));

    out
}

fn render_targets(model: &OutputModel) -> String {
    let mut out = String::new();

    if model.targets().is_empty() {
        return out;
    }

    out.push_str("\nTargets:\n");
    for group in model.by_target() {
        out.push_str(&format!(
            "  {:<8} {} (pid {}) {} contexts, {} scripts\n",
            group.target.target_type,
            group.target.target_id.as_str().bold(),
            group.target.pid,
            group.execution_contexts.len(),
            group.scripts.len()
        ));
    }

    out
}

fn render_worklets(model: &OutputModel) -> String {
    let mut out = String::new();

    if model.worklets().is_empty() {
        return out;
    }

    out.push_str("\nAuction Worklets:\n");
    for worklet in model.worklets() {
        let halves = match (
            worklet.running_in_process_event.is_some(),
            worklet.done_with_process_event.is_some(),
        ) {
            (true, true) => "running + done".green(),
            (true, false) => "running only".yellow(),
            (false, true) => "done only".yellow(),
            (false, false) => "no events".red(),
        };
        out.push_str(&format!(
            "  {:<8} {} (pid {}) [{}]\n",
            worklet.worklet_type.label(),
            worklet.host,
            worklet.pid,
            halves
        ));
    }

    out
}

fn status_symbol(found: usize, total: usize) -> ColoredString {
    if found == total {
        "✓".green()
    } else if found == 0 {
        "✗".red()
    } else {
        "~".yellow()
    }
}
