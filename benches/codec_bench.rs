#![allow(missing_docs)]

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use pooldoc::{
    Arena, ArenaConfig, Format, parse_json, parse_xml, provide, serialize_json, serialize_xml,
    transcode,
};
use std::hint::black_box;

fn generate_json(count: usize) -> Vec<u8> {
    let items: Vec<String> = (0..count)
        .map(|i| format!(r#"{{"id":{i},"name":"item-{i}","tags":["a","b"]}}"#))
        .collect();
    format!(r#"{{"items":[{}]}}"#, items.join(",")).into_bytes()
}

// --- BENCHMARKS ---

fn bench_json(c: &mut Criterion) {
    let item_count = 400;
    let src = generate_json(item_count);
    let mut arena = Arena::new(ArenaConfig::default()).expect("Failed to build arena");

    println!("JSON document: {} bytes", src.len());

    let mut group = c.benchmark_group("JSON");
    group.throughput(Throughput::Bytes(src.len() as u64));

    group.bench_function("parse_destroy", |b| {
        b.iter(|| {
            let doc = parse_json(&mut arena, black_box(&src)).expect("Parse failed");
            arena.node_destroy(Some(doc)).expect("Destroy failed");
        });
    });

    let doc = parse_json(&mut arena, &src).expect("Parse failed");
    group.bench_function("serialize", |b| {
        b.iter(|| {
            let out = serialize_json(&mut arena, black_box(doc)).expect("Serialize failed");
            arena.buffer_destroy(out).expect("Destroy failed");
        });
    });

    group.bench_function("provide_last_item", |b| {
        let path = format!("items.{}.name", item_count - 1);
        b.iter(|| provide(&arena, doc, black_box(&path)).expect("Lookup failed"));
    });

    group.finish();
}

fn bench_xml(c: &mut Criterion) {
    // Synthesized item elements make the XML tree larger than its JSON source.
    let mut arena = Arena::new(ArenaConfig::scaled(4)).expect("Failed to build arena");
    let json = generate_json(400);
    let xml_buf = transcode(&mut arena, &json, Format::Json, Format::Xml).expect("Transcode failed");
    let src = arena.buffer_bytes(xml_buf).expect("Bad buffer").to_vec();
    arena.buffer_destroy(xml_buf).expect("Destroy failed");

    println!("XML document: {} bytes", src.len());

    let mut group = c.benchmark_group("XML");
    group.throughput(Throughput::Bytes(src.len() as u64));

    group.bench_function("parse_destroy", |b| {
        b.iter(|| {
            let doc = parse_xml(&mut arena, black_box(&src)).expect("Parse failed");
            arena.node_destroy(Some(doc)).expect("Destroy failed");
        });
    });

    let doc = parse_xml(&mut arena, &src).expect("Parse failed");
    group.bench_function("serialize_sorted", |b| {
        b.iter(|| {
            let out = serialize_xml(&mut arena, black_box(doc)).expect("Serialize failed");
            arena.buffer_destroy(out).expect("Destroy failed");
        });
    });

    group.finish();
}

fn bench_buffers(c: &mut Criterion) {
    let mut arena = Arena::new(ArenaConfig::default()).expect("Failed to build arena");
    let mut group = c.benchmark_group("Buffers");

    group.bench_function("alloc_free_16", |b| {
        b.iter(|| {
            let buf = arena.buffer_alloc(black_box(10)).expect("Alloc failed");
            arena.buffer_free(buf).expect("Free failed");
        });
    });

    // Walks 16 -> 256 -> 4K -> 64K through promotions.
    group.bench_function("append_promote_8k", |b| {
        b.iter(|| {
            let mut buf = arena.buffer_create().expect("Alloc failed");
            for _ in 0..1024 {
                arena.buffer_append_str(&mut buf, black_box("01234567")).expect("Append failed");
            }
            arena.buffer_destroy(buf).expect("Destroy failed");
        });
    });

    group.finish();
}

criterion_group!(benches, bench_json, bench_xml, bench_buffers);
criterion_main!(benches);
