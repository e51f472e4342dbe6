use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use remedy::services::diff_normalizer::normalize_with_stats;

/// A multi-file diff with `hunks` hunks per file, every header miscounted.
fn synthetic_diff(files: usize, hunks: usize) -> String {
    let mut diff = String::new();
    for f in 0..files {
        diff.push_str(&format!(
            "diff --git a/src/mod_{f}.rs b/src/mod_{f}.rs\n--- a/src/mod_{f}.rs\n+++ b/src/mod_{f}.rs\n"
        ));
        for h in 0..hunks {
            let start = h * 40 + 1;
            diff.push_str(&format!("@@ -{start},1 +{start},1 @@ fn item_{h}() {{\r\n"));
            for i in 0..6 {
                diff.push_str(&format!(" let keep_{i} = {i};\r\n"));
            }
            diff.push_str("-    old();\r\n+    new();\r\n+    extra();\r\n");
        }
    }
    diff.push_str("\n\n");
    diff
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    for (files, hunks) in [(1, 4), (10, 20), (50, 100)] {
        let diff = synthetic_diff(files, hunks);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{files}x{hunks}")),
            &diff,
            |b, diff| b.iter(|| normalize_with_stats(black_box(diff))),
        );
    }
    group.finish();
}

fn bench_already_normalized(c: &mut Criterion) {
    let normalized = normalize_with_stats(&synthetic_diff(10, 20)).text;
    c.bench_function("normalize_clean_10x20", |b| {
        b.iter(|| normalize_with_stats(black_box(&normalized)));
    });
}

criterion_group!(diff_normalizer, bench_normalize, bench_already_normalized);
criterion_main!(diff_normalizer);
