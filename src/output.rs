//! Colored console output for the slot scanner.
//!
//! Color scheme: blue+bold headers, cyan values, green success,
//! yellow warnings, dimmed secondary text.

use alloy_primitives::{Address, U256};
use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::path::Path;

use crate::cache::CacheStats;
use crate::value::{address_hex, SlotValue, Value};

// ── Helpers ────────────────────────────────────────────────────────

/// Join the labels sharing a slot: `a, b`.
pub fn format_labels(labels: &[String]) -> String {
    labels.join(", ")
}

/// Format a cache hit rate as a percentage with one decimal.
pub fn format_hit_rate(stats: &CacheStats) -> String {
    format!("{:.1}%", stats.hit_rate() * 100.0)
}

/// Colour a resolved value by how complete it is.
fn paint(value: &Value) -> ColoredString {
    let text = value.to_string();
    match value {
        Value::Empty => text.yellow(),
        Value::Skipped(_) | Value::NotAValue | Value::Absent => text.dimmed(),
        _ => text.cyan(),
    }
}

// ── Banner ─────────────────────────────────────────────────────────

/// Print the startup banner with the scan target.
pub fn print_banner(contract: &Address, layout: &Path, variables: usize) {
    println!();
    println!("{}", "=== Storage Slot Scanner ===".blue().bold());
    println!("  Contract:     {}", address_hex(contract).cyan());
    println!("  Layout:       {}", layout.display().to_string().cyan());
    println!("  Variables:    {}", variables.to_string().cyan());
}

/// Print which storage source is being read.
pub fn print_source(kind: &str, path: &Path) {
    println!(
        "  {} {} loaded: {}",
        "OK".green().bold(),
        kind,
        path.display().to_string().cyan()
    );
}

// ── Results ────────────────────────────────────────────────────────

/// Print one resolved slot.
pub fn print_slot(slot: &SlotValue) {
    match &slot.value {
        Value::Packed(members) => {
            println!(
                "  {} {} {}",
                format!("slot {}", slot.slot).blue().bold(),
                format_labels(&slot.labels),
                "(packed)".dimmed()
            );
            for member in members {
                println!("      {} = {}", member.label, paint(&member.value));
            }
        }
        value => println!(
            "  {} {} = {}",
            format!("slot {}", slot.slot).blue().bold(),
            format_labels(&slot.labels),
            paint(value)
        ),
    }
}

/// Print every resolved slot followed by a count of degraded positions.
pub fn print_slots(slots: &[SlotValue]) {
    println!();
    println!("{}", "Storage:".blue().bold());
    for slot in slots {
        print_slot(slot);
    }
    let degraded = slots.iter().filter(|s| s.value.is_empty_placeholder()).count();
    if degraded > 0 {
        println!(
            "  {} {} slot(s) could not be read",
            "WARNING:".yellow().bold(),
            degraded.to_string().yellow()
        );
    }
}

/// Print a single variable resolved on its own.
pub fn print_variable(label: &str, slot: U256, value: &Value) {
    println!();
    println!(
        "  {} {} = {}",
        format!("slot {slot}").blue().bold(),
        label,
        paint(value)
    );
}

/// Print cache counters after a scan.
pub fn print_cache_stats(stats: &CacheStats) {
    println!(
        "  {} reads: {} hits, {} misses ({} hit rate)",
        "CACHE".dimmed(),
        stats.hits.to_string().cyan(),
        stats.misses.to_string().cyan(),
        format_hit_rate(stats).dimmed(),
    );
}

/// Print any serializable result as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────
