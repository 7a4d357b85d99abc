use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use tasksearch::config::{ExpansionConfig, SearchConfig};
use tasksearch::search::{expand_query, normalize, Lexicon, SearchService};
use tasksearch::types::{SearchOptions, Task};

const SUBJECTS: &[&str] = &[
    "dentist", "groceries", "kitchen sink", "tax forms", "flight", "garage", "report", "invoice",
    "birthday gift", "car service", "insurance", "library books",
];
const VERBS: &[&str] = &["Call", "Buy", "Fix", "Email", "Book", "Clean", "Review", "Pay"];

fn build_corpus(count: usize) -> Vec<Task> {
    (0..count)
        .map(|i| {
            let verb = VERBS[i % VERBS.len()];
            let subject = SUBJECTS[(i * 7) % SUBJECTS.len()];
            Task::new(format!("t{i}"), format!("{verb} {subject} #{i}"))
                .with_priority((i % 4) as u8 + 1)
        })
        .collect()
}

fn bench_expand(c: &mut Criterion) {
    let lexicon = Lexicon::builtin();
    let config = ExpansionConfig::default();
    c.bench_function("expand_typo_query", |b| {
        b.iter(|| {
            let nq = normalize(black_box("cal dentist appt tomorow"));
            black_box(expand_query(&nq, &lexicon, &config))
        })
    });
}

fn bench_search(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let service = SearchService::new(SearchConfig::default());
    let options = SearchOptions::default();

    for size in [100, 2_000] {
        let corpus = build_corpus(size);
        c.bench_function(&format!("search_fuzzy_{size}"), |b| {
            b.iter(|| {
                let result = runtime.block_on(service.search(black_box("fx sink"), &corpus, &options));
                black_box(result.matches.len())
            })
        });
    }
}

criterion_group!(benches, bench_expand, bench_search);
criterion_main!(benches);
