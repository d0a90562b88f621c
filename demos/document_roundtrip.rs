//! Example: Round-tripping a document between JSON and XML
//!
//! Parses a JSON configuration, reads a few values by dotted path, writes the
//! same tree as XML to disk and loads it back.

#![allow(missing_docs)]

use pooldoc::{
    Arena, ArenaConfig, load_file, parse_json, parse_xml, provide, serialize_xml, store_file,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Pooldoc Document Round-Trip Example ---");

    // 1. One arena holds every buffer and node below.
    let mut arena = Arena::new(ArenaConfig::small())?;

    let input = br#"{
        "service": "ingest",
        "limits": {"connections": 128, "timeout": "30s"},
        "peers": ["alpha", "beta"]
    }"#;

    // 2. Parse and look up values
    let doc = parse_json(&mut arena, input)?;
    for path in ["service", "limits.connections", "peers.1"] {
        let node = provide(&arena, doc, path)?;
        if let Some(payload) = arena.node_payload(node)? {
            println!("{path:>20} = {}", String::from_utf8_lossy(arena.buffer_bytes(payload)?));
        }
    }

    // 3. Emit XML; entries come out sorted by key
    let xml = serialize_xml(&mut arena, doc)?;
    println!("XML: {}", String::from_utf8_lossy(arena.buffer_bytes(xml)?));

    let path = std::env::temp_dir().join("pooldoc_roundtrip.xml");
    store_file(&arena, xml, &path)?;
    println!("Stored {} bytes to '{}'.", arena.buffer_len(xml)?, path.display());

    // 4. Load it back and compare, ignoring entry order
    let loaded = load_file(&mut arena, &path)?;
    let src = arena.buffer_bytes(loaded)?.to_vec();
    let reparsed = parse_xml(&mut arena, &src)?;
    let before = provide(&arena, doc, "limits")?;
    let after = provide(&arena, reparsed, "limits")?;
    assert!(arena.tree_equal_unordered(before, after)?);
    println!("Success! Trees match.");

    // Cleanup
    for buf in [xml, loaded] {
        arena.buffer_destroy(buf)?;
    }
    arena.node_destroy(Some(doc))?;
    arena.node_destroy(Some(reparsed))?;
    std::fs::remove_file(&path)?;

    Ok(())
}
