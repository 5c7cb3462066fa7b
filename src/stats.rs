use std::time::Duration;

use chrono::{DateTime, Local};

use crate::clock::Sample;

/// Running counters the engine updates as it admits, completes, and
/// expires queries (§3). `outstanding` lives in `InFlightTable`, not
/// here — `Stats` only tracks the monotonic, never-decreasing counts.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    pub sent_count: u64,
    pub completed_count: u64,
    pub timed_out_count: u64,
}

/// Everything the Reporter needs to print the final statistics block
/// (§4.G), captured once the run loop exits.
pub struct RunSummary {
    pub stats: Stats,
    pub runs_through_file: u64,
    pub stopped_by_time_limit: bool,
    pub run_once: bool,
    pub time_limit: Option<Duration>,
    pub program_start: Sample,
    pub end_of_run: Sample,
}

/// Prints the final aggregate statistics block (§4.G). Division by zero
/// is guarded explicitly: an empty run reports 0% and 0.0s rather than
/// NaN or a panic.
pub fn print_report(summary: &RunSummary) {
    let sent = summary.stats.sent_count;
    let completed = summary.stats.completed_count;
    let lost = summary.stats.timed_out_count;

    println!();
    if summary.run_once {
        println!("Run mode:       single pass through the input file");
    } else {
        println!("Run mode:       repeated passes through the input file");
    }
    if let Some(limit) = summary.time_limit {
        println!("Time limit:     {:.6} sec", limit.as_secs_f64());
    }
    if summary.stopped_by_time_limit {
        println!("Terminated by:  time limit");
    } else {
        println!("Terminated by:  end of input");
    }
    println!("Passes through file: {}", summary.runs_through_file);

    println!();
    println!("Queries sent:         {sent}");
    println!("Queries completed:    {completed}");
    println!("Queries lost:         {lost}");

    let completion_pct = if sent == 0 {
        0.0
    } else {
        100.0 * completed as f64 / sent as f64
    };
    let loss_pct = if sent == 0 {
        0.0
    } else {
        100.0 * lost as f64 / sent as f64
    };
    println!("Percentage completed: {completion_pct:.2}%");
    println!("Percentage lost:      {loss_pct:.2}%");

    println!();
    println!(
        "Started at:  {}",
        DateTime::<Local>::from(summary.program_start.wall).format("%Y-%m-%d %H:%M:%S%.6f %:z")
    );
    println!(
        "Finished at: {}",
        DateTime::<Local>::from(summary.end_of_run.wall).format("%Y-%m-%d %H:%M:%S%.6f %:z")
    );

    let duration = if sent == 0 {
        0.0
    } else {
        summary
            .end_of_run
            .monotonic
            .saturating_duration_since(summary.program_start.monotonic)
            .as_secs_f64()
    };
    println!("Run time:    {duration:.6} sec");

    let qps = if completed == 0 || duration == 0.0 {
        0.0
    } else {
        completed as f64 / duration
    };
    println!("Queries/sec: {qps:.6}");
}
