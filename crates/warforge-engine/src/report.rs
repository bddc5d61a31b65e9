//! Terminal rendering of a finished run's outcome.

use std::fmt::Write as _;

use warforge_core::runner::{SimulationOutcome, Verdict};
use warforge_types::DetailType;

/// Render the outcome as a human-readable report.
pub fn render(outcome: &SimulationOutcome) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Warforge run complete ===");
    let _ = writeln!(out, "days completed: {}", outcome.days_completed);

    let _ = writeln!(out, "\nfactory production ({} total):", outcome.factory.total());
    for detail_type in DetailType::ALL {
        let produced = outcome
            .factory
            .produced
            .get(&detail_type)
            .copied()
            .unwrap_or(0);
        let _ = writeln!(out, "  {detail_type:<8} {produced}");
    }

    for faction in &outcome.factions {
        let _ = writeln!(out, "\n{}:", faction.name);
        let _ = writeln!(out, "  robots built: {}", faction.army_size());
        if let Some(first) = faction.roster.first() {
            let _ = writeln!(out, "  first robot:  {first}");
        }
        if let Some(last) = faction.roster.last() {
            let _ = writeln!(out, "  last robot:   {last}");
        }
        let consumed: u64 = faction.consumed.values().sum();
        let leftover: usize = faction.leftover.values().sum();
        let _ = writeln!(out, "  parts taken:  {consumed}");
        let _ = writeln!(out, "  parts spare:  {leftover}");
    }

    match &outcome.verdict {
        Verdict::Winner { name, army_size } => {
            let _ = writeln!(out, "\n{name} goes to war with {army_size} robots.");
        }
        Verdict::Tie { army_size } => {
            let _ = writeln!(
                out,
                "\nThe armies stand equal at {army_size} robots each. Nobody marches.",
            );
        }
    }
    out
}
