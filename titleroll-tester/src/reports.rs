use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use crate::simulation::SimulationSummary;

pub fn generate_console_report(
    out: &mut impl Write,
    summaries: &[SimulationSummary],
    tolerance: f64,
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Roll Simulation Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==========================".cyan())?;

    let passed = summaries.iter().filter(|s| s.passed).count();
    let failed = summaries.len() - passed;
    writeln!(out, "Seeds simulated: {}", summaries.len())?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", failed.to_string().red())?;
    writeln!(out, "Tolerance: ±{tolerance:.4}")?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for summary in summaries {
        let status = if summary.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(out, "{status} {}", format!("seed {}", summary.seed).bold())?;
        writeln!(
            out,
            "   Rolls: {} across {} users ({} boosted, {} downgraded)",
            summary.rolls, summary.users, summary.boosted_rolls, summary.downgraded_rolls
        )?;
        writeln!(out, "   Max deviation: {:.4}", summary.max_deviation)?;
        for share in &summary.shares {
            let deviation = format!("{:+.4}", share.observed - share.expected);
            let deviation = if share.deviation() > tolerance {
                deviation.red()
            } else {
                deviation.normal()
            };
            writeln!(
                out,
                "     {:>6} {:<24} {:>8}  observed {:.4}  expected {:.4}  {deviation}",
                share.id.to_string(),
                share.label,
                share.awarded,
                share.observed,
                share.expected
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut impl Write, summaries: &[SimulationSummary]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, summaries)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report(
    out: &mut impl Write,
    summaries: &[SimulationSummary],
) -> Result<()> {
    writeln!(out, "# Titleroll Simulation Results\n")?;

    let passed = summaries.iter().filter(|s| s.passed).count();
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Seeds**: {}", summaries.len())?;
    writeln!(out, "- **Passed**: {passed}")?;
    writeln!(out, "- **Failed**: {}\n", summaries.len() - passed)?;

    writeln!(out, "## Detailed Results\n")?;
    for summary in summaries {
        let status = if summary.passed { "✅" } else { "❌" };
        writeln!(out, "### {status} seed {}\n", summary.seed)?;
        writeln!(
            out,
            "- **Rolls**: {} ({} boosted, {} downgraded)",
            summary.rolls, summary.boosted_rolls, summary.downgraded_rolls
        )?;
        writeln!(out, "- **Max deviation**: {:.4}\n", summary.max_deviation)?;
        writeln!(out, "| Id | Title | Awarded | Observed | Expected |")?;
        writeln!(out, "|---:|---|---:|---:|---:|")?;
        for share in &summary.shares {
            writeln!(
                out,
                "| {} | {} | {} | {:.4} | {:.4} |",
                share.id, share.label, share.awarded, share.observed, share.expected
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::EntryShare;
    use titleroll_core::EntryId;

    fn summary(passed: bool) -> SimulationSummary {
        SimulationSummary {
            seed: 1337,
            users: 1,
            rolls: 10,
            boosted_rolls: 1,
            downgraded_rolls: 0,
            rng_draws: 10,
            shares: vec![EntryShare {
                id: EntryId(1),
                label: String::from("Passer-by"),
                awarded: 10,
                observed: 1.0,
                expected: 1.0,
            }],
            max_deviation: 0.0,
            passed,
        }
    }

    #[test]
    fn markdown_report_lists_shares() {
        let mut buffer = Vec::new();
        generate_markdown_report(&mut buffer, &[summary(true), summary(false)]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("# Titleroll Simulation Results"));
        assert!(text.contains("- **Failed**: 1"));
        assert!(text.contains("| 1 | Passer-by | 10 | 1.0000 | 1.0000 |"));
    }

    #[test]
    fn json_report_roundtrips() {
        let mut buffer = Vec::new();
        generate_json_report(&mut buffer, &[summary(true)]).unwrap();
        let parsed: Vec<SimulationSummary> = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed, vec![summary(true)]);
    }

    #[test]
    fn console_report_mentions_each_seed() {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        generate_console_report(&mut buffer, &[summary(true)], 0.01, Duration::from_millis(5))
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("✅ PASS seed 1337"));
        assert!(text.contains("Passer-by"));
    }
}
