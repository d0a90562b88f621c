#![allow(missing_docs)]

use std::error::Error;
use std::fs;

use pooldoc::{
    Arena, ArenaConfig, CodecRegistry, DocumentCodec, Format, JsonCodec, NodeId, PooldocError,
    Shape, SizeClass, inspect_tree, load_file, parse_json, parse_xml, provide, serialize_json,
    serialize_xml, store_file, transcode,
};

// --- CODECS ---

/// The registry hands out the codec for each format.
#[test]
fn test_registry_lookup() -> pooldoc::Result<()> {
    let registry = CodecRegistry::default();
    for format in Format::ALL {
        assert_eq!(registry.get(format)?.format(), format);
    }
    Ok(())
}

/// Transcoding works both ways and leaves no intermediate tree behind.
#[test]
fn test_transcode_both_directions() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;

    let json = transcode(&mut arena, b"<a>1</a><b><c>x</c></b>", Format::Xml, Format::Json)?;
    assert_eq!(arena.buffer_bytes(json)?, br#"{"a":1,"b":{"c":"x"}}"#);
    assert_eq!(arena.node_live_count(), 0);

    let registry = CodecRegistry::new();
    let xml = registry.transcode(&mut arena, br#"{"z":[1,2],"a":"t"}"#, Format::Json, Format::Xml)?;
    assert_eq!(
        arena.buffer_bytes(xml)?,
        b"<a>t</a><z><item0>1</item0><item1>2</item1></z>"
    );
    assert_eq!(arena.node_live_count(), 0);
    Ok(())
}

/// A failed transcode releases both the tree and any partial output.
#[test]
fn test_transcode_failure_cleans_up() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let live_16 = arena.live_count(SizeClass::B16);

    let err = transcode(&mut arena, br#"{"1bad":"v"}"#, Format::Json, Format::Xml).unwrap_err();
    assert!(matches!(err, PooldocError::InvalidArgument(_)));
    assert_eq!(arena.node_live_count(), 0);
    assert_eq!(arena.live_count(SizeClass::B16), live_16);

    let err = transcode(&mut arena, b"<a>", Format::Xml, Format::Json).unwrap_err();
    assert!(err.parse_kind().is_some());
    assert_eq!(arena.node_live_count(), 0);
    Ok(())
}

/// Codecs are usable through the trait object.
#[test]
fn test_codec_trait_object() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let codec: Box<dyn DocumentCodec> = Box::new(JsonCodec);
    let doc = codec.parse(&mut arena, b"[1,2]")?;
    let out = codec.serialize(&mut arena, doc)?;
    assert_eq!(arena.buffer_bytes(out)?, b"[1,2]");
    Ok(())
}

/// Formats are recognized by file extension.
#[test]
fn test_format_from_path() {
    assert_eq!(Format::from_path("doc.json"), Some(Format::Json));
    assert_eq!(Format::from_path("conf/site.XML"), Some(Format::Xml));
    assert_eq!(Format::from_path("notes.txt"), None);
    assert_eq!(Format::from_path("README"), None);
    assert_eq!(Format::Xml.to_string(), "xml");
}

// --- TREE EDITING ---

/// Detaching and reattaching a child moves a subtree between parents.
#[test]
fn test_detach_and_reattach() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let doc = parse_json(&mut arena, b"[[1],[2,3]]")?;
    let first = provide(&arena, doc, "0")?;

    let moved = arena.node_detach_child(provide(&arena, doc, "1")?, 1)?;
    arena.node_push_child(first, moved)?;

    let out = serialize_json(&mut arena, doc)?;
    assert_eq!(arena.buffer_bytes(out)?, b"[[1,3],[2]]");
    assert!(arena.node_detach_child(first, 5).is_err());
    Ok(())
}

/// Replacing a payload hands the old buffer back to the caller.
#[test]
fn test_set_payload() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let leaf = arena.node_new_scalar(b"old")?;
    let fresh = arena.buffer_create_from_str("new")?;

    let previous = arena.node_set_payload(leaf, Some(fresh))?.expect("old payload");
    assert!(arena.buffer_equal_str(previous, "old")?);
    arena.buffer_destroy(previous)?;

    let out = serialize_json(&mut arena, leaf)?;
    assert_eq!(arena.buffer_bytes(out)?, br#""new""#);
    Ok(())
}

/// A node cannot be attached under its own subtree.
#[test]
fn test_cycles_rejected() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let root = arena.node_new_array()?;
    let child = arena.node_new_array()?;
    let grandchild = arena.node_new_array()?;
    arena.node_push_child(root, child)?;
    arena.node_push_child(child, grandchild)?;

    for (parent, node) in [(root, root), (child, root), (grandchild, root)] {
        assert!(matches!(
            arena.node_push_child(parent, node),
            Err(PooldocError::InvalidArgument(_))
        ));
    }
    let object = arena.node_new_object()?;
    let holder = arena.node_insert_entry(object, b"k", root)?;
    assert!(matches!(
        arena.node_insert_entry(grandchild, b"loop", object),
        Err(PooldocError::InvalidArgument(_))
    ));

    assert!(arena.tree_equal(object, object)?);
    let out = serialize_json(&mut arena, object)?;
    assert_eq!(arena.buffer_bytes(out)?, br#"{"k":[[[]]]}"#);
    assert_eq!(arena.node(root)?.parent, Some(holder));
    Ok(())
}

/// An attached node cannot gain a second parent or be destroyed in place.
#[test]
fn test_shared_subtrees_rejected() -> pooldoc::Result<()> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let a = arena.node_new_array()?;
    let b = arena.node_new_array()?;
    let leaf = arena.node_new_scalar(b"x")?;
    arena.node_push_child(a, leaf)?;

    assert!(matches!(
        arena.node_push_child(b, leaf),
        Err(PooldocError::InvalidArgument(_))
    ));
    let object = arena.node_new_object()?;
    let live = arena.node_live_count();
    assert!(matches!(
        arena.node_insert_entry(object, b"k", leaf),
        Err(PooldocError::InvalidArgument(_))
    ));
    assert_eq!(arena.node_live_count(), live);
    assert!(matches!(
        arena.node_destroy(Some(leaf)),
        Err(PooldocError::InvalidArgument(_))
    ));

    arena.node_destroy(Some(a))?;
    let out = serialize_json(&mut arena, b)?;
    assert_eq!(arena.buffer_bytes(out)?, b"[]");
    assert!(arena.node(leaf).is_err());
    Ok(())
}

// --- FILES ---

/// Store and load move bytes through the filesystem unchanged.
#[test]
fn test_store_and_load() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("doc.json");
    let mut arena = Arena::new(ArenaConfig::small())?;

    let doc = parse_json(&mut arena, br#"{"k":[1,2,3]}"#)?;
    let out = serialize_json(&mut arena, doc)?;
    store_file(&arena, out, &path)?;
    assert_eq!(fs::read(&path)?, br#"{"k":[1,2,3]}"#);

    let loaded = load_file(&mut arena, &path)?;
    assert!(arena.buffer_equal(loaded, out)?);
    assert_eq!(loaded.class(), SizeClass::B16);
    Ok(())
}

/// Missing files surface as I/O errors.
#[test]
fn test_load_missing_file() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mut arena = Arena::new(ArenaConfig::small())?;
    let err = load_file(&mut arena, dir.path().join("absent.xml")).unwrap_err();
    assert!(matches!(err, PooldocError::Io(_)));
    Ok(())
}

/// Files larger than the largest size class are refused before reading.
#[test]
fn test_load_oversized_file() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("big.json");
    fs::write(&path, vec![b' '; SizeClass::MAX_CAPACITY + 1])?;

    let mut arena = Arena::new(ArenaConfig::small())?;
    let err = load_file(&mut arena, &path).unwrap_err();
    assert!(err.is_out_of_capacity());
    assert_eq!(arena.live_count(SizeClass::B1M), 0);
    Ok(())
}

// --- INSPECTION ---

/// The report tracks live slots and serializes through serde.
#[test]
fn test_arena_report() -> Result<(), Box<dyn Error>> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let buf = arena.buffer_create_from_str(&"r".repeat(100))?;

    let report = arena.report();
    assert_eq!(report.classes.len(), SizeClass::COUNT);
    assert_eq!(report.classes[1].live, 1);
    assert_eq!(report.classes[1].bytes_in_use, 100);
    assert_eq!(report.region_bytes, arena.region_size());

    let text = report.to_string();
    assert!(text.starts_with("=== POOLDOC ARENA REPORT ==="));

    let json = serde_json::to_value(&report)?;
    assert_eq!(json["classes"][1]["capacity"], 256);
    assert_eq!(json["nodes"]["live"], 0);

    arena.buffer_destroy(buf)?;
    assert_eq!(arena.report().classes[1].live, 0);
    Ok(())
}

/// Tree inspection describes shapes and previews payloads.
#[test]
fn test_inspect_tree() -> Result<(), Box<dyn Error>> {
    let mut arena = Arena::new(ArenaConfig::small())?;
    let doc = parse_json(&mut arena, br#"{"name":"pooldoc","tags":["a","b"]}"#)?;

    let info = inspect_tree(&arena, doc)?;
    assert_eq!(info.shape, Shape::Object);
    assert_eq!(info.children.len(), 2);
    assert_eq!(info.children[0].shape, Shape::Entry);
    assert_eq!(info.children[0].preview.as_deref(), Some("name"));

    let tags: NodeId = provide(&arena, doc, "tags")?;
    let tags_info = inspect_tree(&arena, tags)?;
    assert_eq!(tags_info.shape, Shape::Array);
    assert_eq!(tags_info.children.len(), 2);

    let rendered = info.to_string();
    assert!(rendered.contains("└── "));
    assert!(rendered.contains("\"pooldoc\""));

    let json = serde_json::to_value(&info)?;
    assert_eq!(json["shape"], "Object");
    Ok(())
}

/// Inspection accepts every tree the codecs accept at the same depth limit.
#[test]
fn test_inspect_depth_matches_codecs() -> pooldoc::Result<()> {
    let config = ArenaConfig::builder().max_depth(8).build();
    let mut arena = Arena::new(config)?;
    let nested = |levels: usize| format!("{}1{}", r#"{"a":"#.repeat(levels), "}".repeat(levels));

    let doc = parse_json(&mut arena, nested(8).as_bytes())?;
    let json = serialize_json(&mut arena, doc)?;
    assert_eq!(arena.buffer_bytes(json)?, nested(8).as_bytes());
    let xml = serialize_xml(&mut arena, doc)?;
    let src = arena.buffer_bytes(xml)?.to_vec();
    let reparsed = parse_xml(&mut arena, &src)?;

    let info = inspect_tree(&arena, doc)?;
    assert_eq!(info.children.len(), 1);
    inspect_tree(&arena, reparsed)?;

    assert!(matches!(
        parse_json(&mut arena, nested(9).as_bytes()),
        Err(PooldocError::RecursionLimit { depth: 8 })
    ));
    Ok(())
}
