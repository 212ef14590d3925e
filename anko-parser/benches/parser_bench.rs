use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;

use anko_core::{Screen, ScrollbackStore};
use anko_parser::Parser;

fn generate_plain_text(size: usize) -> Vec<u8> {
    let text = "The quick brown fox jumps over the lazy dog.\r\n";
    text.as_bytes().iter().cycle().take(size).copied().collect()
}

fn generate_sgr_sequences(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let sequences = [
        "\x1b[0m",
        "\x1b[1m",
        "\x1b[4m",
        "\x1b[38;5;196m",
        "\x1b[48;5;21m",
        "\x1b[38;2;255;128;0m",
        "\x1b[48;2;0;128;255m",
    ];
    let text = "Colored text ";

    let mut i = 0;
    while data.len() < size {
        data.extend_from_slice(sequences[i % sequences.len()].as_bytes());
        data.extend_from_slice(text.as_bytes());
        i += 1;
    }
    data.truncate(size);
    data
}

fn generate_cursor_movement(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let sequences = [
        "\x1b[A",
        "\x1b[B",
        "\x1b[C",
        "\x1b[D",
        "\x1b[10;20H",
        "\x1b[2J",
        "\x1b[K",
    ];

    let mut i = 0;
    while data.len() < size {
        data.extend_from_slice(sequences[i % sequences.len()].as_bytes());
        i += 1;
    }
    data.truncate(size);
    data
}

fn bench_parser(c: &mut Criterion) {
    const SIZE: usize = 64 * 1024;
    let inputs = [
        ("plain_text", generate_plain_text(SIZE)),
        ("sgr_sequences", generate_sgr_sequences(SIZE)),
        ("cursor_movement", generate_cursor_movement(SIZE)),
    ];

    let mut group = c.benchmark_group("parser");
    group.throughput(Throughput::Bytes(SIZE as u64));
    for (name, input) in &inputs {
        group.bench_function(*name, |b| {
            b.iter(|| {
                let mut parser = Parser::new(
                    Screen::new(80, 24),
                    Arc::new(ScrollbackStore::new_in_memory()),
                );
                parser.feed(black_box(input));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parser);
criterion_main!(benches);
