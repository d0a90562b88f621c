//! Example: Inspecting arena usage
//!
//! Shows how buffers move between size classes as they grow, and prints the
//! usage report and the tree view of a parsed document.

#![allow(missing_docs)]

use pooldoc::{Arena, ArenaConfig, inspect_tree, parse_json};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=pooldoc=trace shows every promotion.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("--- Pooldoc Arena Inspector Example ---");

    let mut arena = Arena::new(ArenaConfig::small())?;

    // 1. Grow a buffer through three size classes
    let mut buf = arena.buffer_create()?;
    for _ in 0..5 {
        arena.buffer_append_str(&mut buf, &"#".repeat(60))?;
        println!(
            "len {:>4}  capacity {:>5}  class {}",
            arena.buffer_len(buf)?,
            arena.buffer_capacity(buf)?,
            buf.class()
        );
    }

    // 2. Parse a document
    let doc = parse_json(
        &mut arena,
        br#"{"user":{"id":7,"roles":["admin","ops"]},"active":true}"#,
    )?;

    println!("\n{}", arena.report());
    println!("Tree:\n{}", inspect_tree(&arena, doc)?);

    arena.buffer_destroy(buf)?;
    arena.node_destroy(Some(doc))?;
    assert_eq!(arena.node_live_count(), 0);
    Ok(())
}
