//! Human-readable text output

use super::RunReport;
use crate::stats::LatencySummary;
use crate::util::time::{calculate_rate, format_nanos, format_rate, percentage};
use std::fmt::Write;

/// Print the final results to the console
pub fn print_results(report: &RunReport) {
    print!("{}", render(report));
}

/// Render the final results
///
/// Operation counts with their share of all data operations, the checkpoint
/// count, and one latency line per operation kind that ran.
pub fn render(report: &RunReport) -> String {
    let ops = &report.operations;
    let total = ops.total();
    let mut out = String::new();

    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    let _ = writeln!(out, "                    RUN RESULTS");
    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    let _ = writeln!(out);
    let _ = writeln!(out, "Elapsed Time: {:.3}s", report.elapsed.as_secs_f64());
    let _ = writeln!(out);

    let _ = writeln!(out, "Operations:");
    for (name, count) in [("read", ops.read), ("insert", ops.insert), ("update", ops.update)] {
        let _ = writeln!(
            out,
            "  Executed {} {} operations ({:.0}%)",
            count,
            name,
            percentage(count, total).floor()
        );
    }
    let _ = writeln!(out, "  Executed {} checkpoint operations", ops.checkpoint);
    let _ = writeln!(
        out,
        "  Throughput: {} ops/sec",
        format_rate(calculate_rate(total, report.elapsed))
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Latency:");
    let latency = &report.latency;
    for (name, summary) in [
        ("read", &latency.read),
        ("insert", &latency.insert),
        ("update", &latency.update),
        ("checkpoint", &latency.checkpoint),
    ] {
        if summary.ops > 0 {
            let _ = writeln!(out, "  {:<10} {}", name, latency_line(summary));
        }
    }
    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    out
}

fn latency_line(summary: &LatencySummary) -> String {
    format!(
        "avg {}, min {}, max {}, p50 {}, p90 {}, p99 {}, p99.9 {}",
        format_nanos(summary.avg_ns),
        format_nanos(summary.min_ns),
        format_nanos(summary.max_ns),
        format_nanos(summary.p50_ns),
        format_nanos(summary.p90_ns),
        format_nanos(summary.p99_ns),
        format_nanos(summary.p999_ns),
    )
}
