use criterion::{Criterion, criterion_group, criterion_main};
use gts_core::config::ResolveConfig;
use gts_core::model::{RecipeRecord, RecipeSet};
use gts_partition::partition_set;
use std::hint::black_box;

/// A tree of `dirs` sibling directories under `src/`, each with `per_dir`
/// targets. Every target depends on the previous one, so consecutive
/// directories form grouping cycles that need hoisting.
fn build_records(dirs: usize, per_dir: usize) -> Vec<RecipeRecord> {
    let mut records = Vec::with_capacity(dirs * per_dir);
    let mut previous: Option<String> = None;
    for i in 0..per_dir {
        for d in 0..dirs {
            let id = format!("t_{d}_{i}");
            let dir = format!("dir_{d}");
            let deps: Vec<&str> = previous.as_deref().into_iter().collect();
            records.push(RecipeRecord::new(id.clone(), &deps, &["src", dir.as_str()]));
            previous = Some(id);
        }
    }
    records
}

fn bench_resolve_small(c: &mut Criterion) {
    let records = build_records(3, 4);
    let config = ResolveConfig::default();

    c.bench_function("resolve_3_dirs_12_targets", |b| {
        b.iter(|| {
            let mut set = RecipeSet::from_records(black_box(records.clone())).unwrap();
            partition_set(&mut set, &config).unwrap()
        })
    });
}

fn bench_acyclic_wide(c: &mut Criterion) {
    // One target per directory: nothing to hoist, measures view building and
    // emission only.
    let records = build_records(200, 1);
    let config = ResolveConfig::default();

    c.bench_function("emit_200_dirs_no_hoists", |b| {
        b.iter(|| {
            let mut set = RecipeSet::from_records(black_box(records.clone())).unwrap();
            partition_set(&mut set, &config).unwrap()
        })
    });
}

criterion_group!(benches, bench_resolve_small, bench_acyclic_wide);
criterion_main!(benches);
