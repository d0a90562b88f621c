#![allow(missing_docs)]

use pooldoc::{Arena, ArenaConfig, NodeId, PathErrorKind, PooldocError, parse_json, provide};

fn fixture(arena: &mut Arena) -> pooldoc::Result<NodeId> {
    parse_json(
        arena,
        br#"{"a":{"b":[10,{"c":"deep"}]},"0":"zero","list":["x","y"],"leaf":"v"}"#,
    )
}

fn payload(arena: &Arena, node: NodeId) -> pooldoc::Result<Vec<u8>> {
    match arena.node_payload(node)? {
        Some(p) => Ok(arena.buffer_bytes(p)?.to_vec()),
        None => Ok(Vec::new()),
    }
}

fn kind_of(result: pooldoc::Result<NodeId>) -> Option<PathErrorKind> {
    result.err().and_then(|e| e.path_kind())
}

/// Keys and indices mix freely along a path.
#[test]
fn test_nested_lookup() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let doc = fixture(&mut arena)?;

    assert_eq!(payload(&arena, provide(&arena, doc, "a.b.0")?)?, b"10");
    assert_eq!(payload(&arena, provide(&arena, doc, "a.b.1.c")?)?, b"deep");
    assert_eq!(payload(&arena, provide(&arena, doc, "list.1")?)?, b"y");
    Ok(())
}

/// The empty path is the node itself.
#[test]
fn test_empty_path() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let doc = fixture(&mut arena)?;
    assert_eq!(provide(&arena, doc, "")?, doc);
    Ok(())
}

/// All-digit segments are keys on objects, indices on arrays.
#[test]
fn test_digit_keys_on_objects() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let doc = fixture(&mut arena)?;

    assert_eq!(payload(&arena, provide(&arena, doc, "0")?)?, b"zero");
    assert_eq!(kind_of(provide(&arena, doc, "1")), Some(PathErrorKind::KeyNotFound));
    assert_eq!(kind_of(provide(&arena, doc, "list.2")), Some(PathErrorKind::IndexOutOfRange));
    assert_eq!(kind_of(provide(&arena, doc, "list.x")), Some(PathErrorKind::KeyNotFound));
    Ok(())
}

/// Descending into a leaf fails by segment kind.
#[test]
fn test_lookup_through_leaf() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let doc = fixture(&mut arena)?;

    assert_eq!(kind_of(provide(&arena, doc, "leaf.0")), Some(PathErrorKind::IndexOutOfRange));
    assert_eq!(kind_of(provide(&arena, doc, "leaf.k")), Some(PathErrorKind::KeyNotFound));
    assert_eq!(kind_of(provide(&arena, doc, "a.")), Some(PathErrorKind::KeyNotFound));
    Ok(())
}

/// Segments are limited to 255 bytes.
#[test]
fn test_segment_length_limit() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let doc = fixture(&mut arena)?;

    let at_limit = "k".repeat(255);
    assert_eq!(kind_of(provide(&arena, doc, &at_limit)), Some(PathErrorKind::KeyNotFound));

    let too_long = format!("a.{}", "k".repeat(256));
    match provide(&arena, doc, &too_long) {
        Err(PooldocError::Path { kind, segment }) => {
            assert_eq!(kind, PathErrorKind::SegmentTooLong);
            assert_eq!(segment.len(), 256);
        }
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

/// `provide(t, p1.p2)` equals `provide(provide(t, p1), p2)`.
#[test]
fn test_path_composition() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let doc = fixture(&mut arena)?;

    for (p1, p2) in [("a", "b.1.c"), ("a.b", "1.c"), ("a.b.1", "c")] {
        let joined = provide(&arena, doc, &format!("{p1}.{p2}"))?;
        let stepped = provide(&arena, provide(&arena, doc, p1)?, p2)?;
        assert_eq!(joined, stepped);
    }
    Ok(())
}

/// Lookup never changes the tree or the arena.
#[test]
fn test_lookup_is_read_only() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let doc = fixture(&mut arena)?;
    let report = arena.report();

    let _ = provide(&arena, doc, "a.b.7");
    let _ = provide(&arena, doc, "missing");
    assert_eq!(arena.report().nodes.live, report.nodes.live);

    let copy = fixture(&mut arena)?;
    assert!(arena.tree_equal(doc, copy)?);
    Ok(())
}
