//! Run execution: plan display, confirmation, progress, and the final report.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use vista_core::pipeline::{event_channel, EventReceiver};
use vista_core::{
    run_output_dir, CaptionClient, ClientOptions, ConcurrencyMode, OpenAiProvider, Orchestrator,
    ResultWriter, RunEnd, RunEvent, RunReport,
};

use super::setup::CaptionPlan;
use super::CaptionArgs;
use crate::cli::theme;

/// Not-found sources listed before the rest are summarized.
const MAX_LISTED_MISSING: usize = 5;

/// Print what is about to happen to stderr.
pub(crate) fn print_plan(plan: &CaptionPlan) {
    let v = &plan.validation;
    let label = theme::label();

    theme::print_heading("Plan");
    eprintln!("    {:<14}{:>8}", label.apply_to("Inputs:"), v.total);
    eprintln!("    {:<14}{:>8}", label.apply_to("To process:"), v.to_process.len());
    if !v.skipped_existing.is_empty() {
        eprintln!(
            "    {:<14}{:>8}",
            label.apply_to("Skipped:"),
            theme::dim().apply_to(v.skipped_existing.len())
        );
    }
    if !v.not_found.is_empty() {
        eprintln!(
            "    {:<14}{:>8}",
            label.apply_to("Not found:"),
            theme::warn().apply_to(v.not_found.len())
        );
        for source in v.not_found.iter().take(MAX_LISTED_MISSING) {
            eprintln!("      {}", theme::dim().apply_to(source));
        }
        if v.not_found.len() > MAX_LISTED_MISSING {
            eprintln!(
                "      {}",
                theme::dim().apply_to(format!(
                    "... and {} more",
                    v.not_found.len() - MAX_LISTED_MISSING
                ))
            );
        }
    }

    let mode = match plan.run.mode {
        ConcurrencyMode::Sequential => "sequential".to_string(),
        ConcurrencyMode::BoundedParallel { workers } => format!("parallel ({workers} workers)"),
    };
    eprintln!("  {}", theme::dim().apply_to("-".repeat(36)));
    eprintln!("    {:<14}{:>8}px", label.apply_to("Resolution:"), plan.run.resolution);
    eprintln!("    {:<14}{}", label.apply_to("Mode:"), mode);
    eprintln!(
        "    {:<14}{}",
        label.apply_to("Estimate:"),
        theme::accent().apply_to(format!("${:.4}", plan.estimate))
    );
    eprintln!();
}

/// Ask before spending money. `--yes` skips the prompt; without a terminal
/// the prompt cannot be answered, so `--yes` becomes mandatory.
pub(crate) fn confirm(args: &CaptionArgs) -> anyhow::Result<bool> {
    if args.yes {
        return Ok(true);
    }
    if !console::user_attended_stderr() {
        anyhow::bail!("No terminal to confirm the run.\n\n  Hint: pass --yes to start without asking.");
    }
    let answer = dialoguer::Confirm::with_theme(&theme::vista_theme())
        .with_prompt("Start captioning?")
        .default(true)
        .interact_opt()?;
    Ok(answer.unwrap_or(false))
}

/// Caption everything in the plan and print the report.
pub(crate) async fn run_captioning(plan: CaptionPlan, args: &CaptionArgs) -> anyhow::Result<()> {
    let provider = OpenAiProvider::from_config(&plan.config.openai, args.api_key.as_deref())?;
    let client = Arc::new(CaptionClient::new(
        Arc::new(provider),
        ClientOptions::from_run(&plan.run),
    ));

    let run_dir = run_output_dir(&plan.output_root, chrono::Local::now());
    let writer = ResultWriter::new(run_dir, plan.run.write);

    let (tx, rx) = event_channel();
    let orchestrator = Orchestrator::new(client, plan.run.clone()).with_events(tx);

    let cancel = orchestrator.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing requests in flight");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let progress = create_progress_bar(plan.validation.to_process.len() as u64);
    let consumer = tokio::spawn(consume_events(rx, progress));

    let outcome = orchestrator
        .run(&plan.validation.to_process, &plan.instruction, writer)
        .await;

    // Dropping the orchestrator closes the channel if Finished was never read.
    drop(orchestrator);
    if let Err(e) = consumer.await {
        tracing::debug!("Progress task ended abnormally: {e}");
    }
    ctrl_c.abort();

    match outcome {
        Ok(report) => {
            print_report(&report);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Ok(())
        }
        Err(aborted) => {
            print_report(&aborted.report);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&aborted.report)?);
            }
            Err(aborted.error.into())
        }
    }
}

/// Drive the progress bar until the run reports it has finished.
async fn consume_events(mut rx: EventReceiver, progress: ProgressBar) {
    while let Some(event) = rx.recv().await {
        match &event {
            RunEvent::Started { .. } | RunEvent::Dispatched { .. } => {
                if let Some(status) = event.status() {
                    progress.set_message(status);
                }
            }
            RunEvent::Succeeded { path, .. } => {
                tracing::debug!("Wrote {:?}", path);
            }
            RunEvent::Failed { source, error, .. } => {
                progress.println(format!(
                    "  {} {}: {}",
                    theme::error().apply_to("✗"),
                    source,
                    error
                ));
            }
            RunEvent::Progress(p) => progress.set_position(p.processed as u64),
            RunEvent::Finished(_) => {
                progress.finish_and_clear();
                return;
            }
        }
    }
    progress.finish_and_clear();
}

/// Create a progress bar for the run.
fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary after the run.
fn print_report(report: &RunReport) {
    eprint!("{}", render_report(report));
}

/// Summary block: counts, token totals, the cost breakdown, grouped
/// failures, and how the run ended.
fn render_report(report: &RunReport) -> String {
    use std::fmt::Write as _;

    let label = theme::label();
    let rule = "=".repeat(36);
    let mut out = String::new();

    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", theme::accent().apply_to(&rule));
    let _ = writeln!(out, "  {}", theme::accent().apply_to(format!("{:^36}", "Summary")));
    let _ = writeln!(out, "  {}", theme::accent().apply_to(&rule));
    let _ = writeln!(
        out,
        "    {:<19}{:>10}",
        label.apply_to("Processed:"),
        format!("{} of {}", report.processed, report.total)
    );
    let _ = writeln!(out, "    {:<19}{:>10}", label.apply_to("Succeeded:"), report.succeeded());
    if !report.failed.is_empty() {
        let _ = writeln!(
            out,
            "    {:<19}{:>10}",
            label.apply_to("Failed:"),
            theme::error().apply_to(report.failed.len())
        );
    }
    if report.processed < report.total {
        let _ = writeln!(
            out,
            "    {:<19}{:>10}",
            label.apply_to("Not sent:"),
            report.total - report.processed
        );
    }

    let _ = writeln!(out, "  {}", theme::dim().apply_to("-".repeat(36)));
    let usage = &report.usage;
    for (name, count) in [
        ("Prompt tokens:", usage.prompt_tokens),
        ("Completion tokens:", usage.completion_tokens),
        ("Total tokens:", usage.total_tokens),
    ] {
        let _ = writeln!(out, "    {:<19}{:>10}", label.apply_to(name), count);
    }

    let _ = writeln!(out, "  {}", theme::dim().apply_to("-".repeat(36)));
    let cost = &report.cost;
    for (name, amount) in [
        ("Input cost:", cost.input),
        ("Output cost:", cost.output),
        ("Total cost:", cost.total),
    ] {
        let _ = writeln!(
            out,
            "    {:<19}{:>10}",
            label.apply_to(name),
            format!("${amount:.4}")
        );
    }

    if !report.failed.is_empty() {
        let _ = writeln!(out);
        for group in report.failure_groups() {
            let _ = writeln!(out, "  {}", theme::error().apply_to(&group.error));
            for file in &group.files {
                let _ = writeln!(out, "    - {file}");
            }
            if group.overflow > 0 {
                let _ = writeln!(
                    out,
                    "    {}",
                    theme::dim().apply_to(format!("... and {} more", group.overflow))
                );
            }
        }
    }

    match report.end {
        RunEnd::Completed => {}
        RunEnd::Aborted { threshold } => {
            let _ = writeln!(
                out,
                "\n  {}",
                theme::error().apply_to(format!("Aborted after {threshold} consecutive failures"))
            );
        }
        RunEnd::Cancelled => {
            let _ = writeln!(
                out,
                "\n  {}",
                theme::warn().apply_to("Cancelled before all images were sent")
            );
        }
    }

    if report.written > 0 {
        let _ = writeln!(
            out,
            "\n  {} {}",
            label.apply_to("Output:"),
            report.output_dir.display()
        );
    }
    let _ = writeln!(out);
    out
}
