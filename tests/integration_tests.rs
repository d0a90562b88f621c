#![allow(missing_docs)]

//! End-to-end scenarios over a single arena.

use pooldoc::{
    Arena, ArenaConfig, ParseErrorKind, PathErrorKind, PooldocError, SizeClass, parse_json,
    provide, serialize_json, serialize_xml,
};

fn usage(arena: &Arena) -> (Vec<usize>, usize) {
    (
        SizeClass::ALL.iter().map(|c| arena.free_count(*c)).collect(),
        arena.node_free_count(),
    )
}

const COMPOUND: &[u8] = br#"{"a":1,"b":[true,null,"x\n"],"c":{}}"#;

/// Compound document: byte-exact round trip and path access.
#[test]
fn test_compound_json_roundtrip() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::default())?;
    let doc = parse_json(&mut arena, COMPOUND)?;

    let out = serialize_json(&mut arena, doc)?;
    assert_eq!(arena.buffer_bytes(out)?, COMPOUND);

    let first = provide(&arena, doc, "b.0")?;
    let text = arena.node_payload(first)?.expect("scalar");
    assert!(arena.buffer_equal_str(text, "true")?);

    let third = provide(&arena, doc, "b.2")?;
    let text = arena.node_payload(third)?.expect("scalar");
    assert_eq!(arena.buffer_bytes(text)?, b"x\n");
    Ok(())
}

/// Number lexemes survive verbatim.
#[test]
fn test_number_lexeme_preserved() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let doc = parse_json(&mut arena, br#"{"n":-1.5e+10}"#)?;
    let out = serialize_json(&mut arena, doc)?;
    assert_eq!(arena.buffer_bytes(out)?, br#"{"n":-1.5e+10}"#);
    Ok(())
}

/// Overflowing a 16-byte buffer promotes it and recycles the old slot.
#[test]
fn test_buffer_overflow_promotion() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let free_16 = arena.free_count(SizeClass::B16);

    let mut buf = arena.buffer_create()?;
    let original = buf;
    assert_eq!(arena.free_count(SizeClass::B16), free_16 - 1);

    arena.buffer_append_str(&mut buf, &"a".repeat(20))?;
    assert_eq!(arena.buffer_len(buf)?, 20);
    assert_eq!(arena.buffer_capacity(buf)?, 256);
    assert_eq!(arena.buffer_bytes(buf)?, "a".repeat(20).as_bytes());
    assert_eq!(arena.free_count(SizeClass::B16), free_16);
    assert!(arena.buffer_bytes(original).is_err());
    Ok(())
}

/// XML output orders entries by key regardless of insertion order.
#[test]
fn test_xml_deterministic_ordering() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let root = arena.node_new_object()?;
    for key in ["zebra", "apple", "mango"] {
        let value = arena.node_new_scalar(key.to_uppercase().as_bytes())?;
        arena.node_insert_entry(root, key.as_bytes(), value)?;
    }

    let out = serialize_xml(&mut arena, root)?;
    assert_eq!(
        arena.buffer_bytes(out)?,
        b"<apple>APPLE</apple><mango>MANGO</mango><zebra>ZEBRA</zebra>"
    );
    Ok(())
}

/// A missing value is reported at its offset and nothing leaks.
#[test]
fn test_parse_error_reporting() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let before = usage(&arena);

    match parse_json(&mut arena, br#"{"a":}"#) {
        Err(PooldocError::Parse { kind, offset }) => {
            assert_eq!(kind, ParseErrorKind::ExpectedValue);
            assert_eq!(offset, 5);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(usage(&arena), before);
    Ok(())
}

/// Failed lookups report their kind and leave the tree intact.
#[test]
fn test_path_traversal_failures() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let doc = parse_json(&mut arena, COMPOUND)?;
    let before = usage(&arena);

    let err = provide(&arena, doc, "b.5").unwrap_err();
    assert_eq!(err.path_kind(), Some(PathErrorKind::IndexOutOfRange));
    let err = provide(&arena, doc, "d").unwrap_err();
    assert_eq!(err.path_kind(), Some(PathErrorKind::KeyNotFound));

    assert_eq!(usage(&arena), before);
    let out = serialize_json(&mut arena, doc)?;
    assert_eq!(arena.buffer_bytes(out)?, COMPOUND);
    Ok(())
}

/// The second free of a buffer is refused.
#[test]
fn test_double_free_detection() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let buf = arena.buffer_alloc(10)?;
    arena.buffer_free(buf)?;
    let before = usage(&arena);

    assert!(matches!(
        arena.buffer_free(buf),
        Err(PooldocError::InvalidArgument(_))
    ));
    assert_eq!(usage(&arena), before);
    Ok(())
}

/// Destroying a parsed tree returns every slot.
#[test]
fn test_destroy_returns_everything() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let before = usage(&arena);

    let doc = parse_json(&mut arena, COMPOUND)?;
    let out = serialize_json(&mut arena, doc)?;
    arena.buffer_destroy(out)?;
    arena.node_destroy(Some(doc))?;
    arena.node_destroy(None)?;

    assert_eq!(usage(&arena), before);
    assert!(arena.node_destroy(Some(doc)).is_err());
    Ok(())
}

/// Destruction is iterative: a very deep chain does not exhaust the stack.
#[test]
fn test_destroy_deep_tree() -> pooldoc::Result<()> {
    let config = ArenaConfig::builder().nodes(100_000).build();
    let mut arena = Arena::new(config)?;
    let root = arena.node_new_array()?;
    let mut parent = root;
    for _ in 0..99_999 {
        let child = arena.node_new_array()?;
        arena.node_push_child(parent, child)?;
        parent = child;
    }
    assert_eq!(arena.node_free_count(), 0);

    arena.node_destroy(Some(root))?;
    assert_eq!(arena.node_free_count(), 100_000);
    Ok(())
}
