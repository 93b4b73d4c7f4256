//! Home Automation Walkthrough
//!
//! This example drives a small home-automation namespace through state
//! transitions, contexts, and a mutual-exclusion group, printing the
//! action identifiers the engine hands to its action sink.
//!
//! Key concepts:
//! - Hierarchical state paths and minimal enter/exit diffs
//! - Orthogonal contexts layered onto the current branch
//! - Context groups enforcing mutual exclusion
//! - Engine state mirrored into a key/value store
//!
//! Run with: cargo run --example home_automation

use std::sync::Arc;

use statetree::effects::{MemorySink, MemoryStore};
use statetree::{EngineSettings, StateEngine};

fn show(sink: &MemorySink, label: &str) {
    println!("{label}:");
    for action in sink.invocations() {
        println!("  {action}");
    }
    println!();
    sink.clear();
}

fn main() {
    println!("=== Home Automation Example ===\n");

    let sink = Arc::new(MemorySink::permissive());
    let store = Arc::new(MemoryStore::new());
    let engine = StateEngine::new(sink.clone(), store.clone(), EngineSettings::default());

    engine.add_namespace("Home").unwrap();
    engine
        .define_context_group("Home", "time", vec!["day".into(), "night".into()])
        .unwrap();

    engine.change_state("Home", "Awake>Morning", false).unwrap();
    show(&sink, "wake up");

    engine.add_context("Home", "day", false).unwrap();
    show(&sink, "daylight");

    engine.change_state("Home", "Awake>Evening", false).unwrap();
    show(&sink, "evening (the Awake prefix is retained)");

    engine.add_context("Home", "night", false).unwrap();
    show(&sink, "nightfall (day exits before night enters)");

    engine.change_state("Home", "Asleep", false).unwrap();
    show(&sink, "bedtime");

    engine.revert("Home").unwrap();
    show(&sink, "back downstairs");

    println!("current state: {}", engine.current_state("Home").unwrap());
    println!("state mirror:  {}", store.value("Home").unwrap());
    println!("contexts:      {}", store.value("Home__Contexts").unwrap());

    println!("\n=== Example Complete ===");
}
