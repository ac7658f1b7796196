use criterion::{Criterion, criterion_group, criterion_main};
use docs_rag::embeddings::chunking::{ChunkingConfig, chunk_document, chunk_text};
use docs_rag::extract::FileType;
use std::fmt::Write;
use std::hint::black_box;

fn sample_document(sentences: usize) -> String {
    let mut document = String::new();
    for i in 0..sentences {
        write!(
            document,
            "Paragraph {} explains how the retrieval pipeline splits long documents into \
             overlapping windows before they are embedded. ",
            i
        )
        .expect("can write to string");
    }
    document
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let document = sample_document(2_000);
    let config = ChunkingConfig::default();

    c.bench_function("chunk_text", |b| {
        b.iter(|| {
            chunk_text(
                black_box(&document),
                black_box(config.chunk_size),
                black_box(config.chunk_overlap),
            )
        })
    });

    c.bench_function("chunk_document", |b| {
        b.iter(|| {
            chunk_document(
                black_box(&document),
                "bench.txt",
                FileType::Text,
                black_box(&config),
            )
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
