//! Benchmarks for layout mutation and persistence.
//!
//! Run with: cargo bench -p workbench-layout

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use workbench_layout::{
    Align, Layout, MAIN_AREA_INITIAL_PART, PartOptions, PartPlacement, PartSpec, Region,
    ViewOptions, canonical_layout, deserialize_layout, serialize_layout,
};

/// Main-area grid split `parts` times, each part hosting `views_per_part`
/// views.
fn make_layout(parts: usize, views_per_part: usize) -> Layout {
    let mut layout = Layout::new();
    let mut previous = MAIN_AREA_INITIAL_PART.to_owned();
    let mut next_view = 1;
    for i in 0..parts {
        let id = format!("part.bench-{i}");
        let align = if i % 2 == 0 { Align::Right } else { Align::Bottom };
        layout = layout
            .add_part(
                id.as_str(),
                &PartPlacement::Relative(PartSpec::new(align).relative_to(previous.as_str())),
                &PartOptions::default(),
            )
            .expect("bench part");
        for _ in 0..views_per_part {
            layout = layout
                .add_view(
                    format!("view.{next_view}"),
                    id.as_str(),
                    &ViewOptions::default(),
                )
                .expect("bench view");
            next_view += 1;
        }
        previous = id;
    }
    layout
}

fn bench_add_view(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/add_view");
    for parts in [1, 8, 32, 128] {
        let layout = make_layout(parts, 4);
        group.bench_with_input(BenchmarkId::from_parameter(parts), &layout, |b, layout| {
            b.iter(|| {
                black_box(layout.add_view(
                    "view.bench",
                    MAIN_AREA_INITIAL_PART,
                    &ViewOptions::default(),
                ))
            })
        });
    }
    group.finish();
}

fn bench_drop_to_region(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/move_view_to_region");
    for parts in [8, 32, 128] {
        let layout = make_layout(parts, 4);
        group.bench_with_input(BenchmarkId::new("east", parts), &layout, |b, layout| {
            b.iter(|| {
                black_box(layout.move_view_to_region(
                    "view.1",
                    MAIN_AREA_INITIAL_PART,
                    Region::East,
                    None,
                    None,
                ))
            })
        });
        group.bench_with_input(BenchmarkId::new("center", parts), &layout, |b, layout| {
            b.iter(|| {
                black_box(layout.move_view_to_region(
                    "view.1",
                    MAIN_AREA_INITIAL_PART,
                    Region::Center,
                    None,
                    None,
                ))
            })
        });
    }
    group.finish();
}

fn bench_persistence(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/persistence");
    for parts in [8, 64] {
        let layout = make_layout(parts, 4);
        let encoded = serialize_layout(&layout).expect("bench serialize");
        group.bench_with_input(BenchmarkId::new("serialize", parts), &layout, |b, layout| {
            b.iter(|| black_box(serialize_layout(layout)))
        });
        group.bench_with_input(
            BenchmarkId::new("deserialize", parts),
            &encoded,
            |b, encoded| b.iter(|| black_box(deserialize_layout(encoded))),
        );
        group.bench_with_input(BenchmarkId::new("canonical", parts), &layout, |b, layout| {
            b.iter(|| black_box(canonical_layout(layout)))
        });
    }
    group.finish();
}

fn bench_remove_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/remove_views");
    let layout = make_layout(32, 4);
    group.bench_function("mark_and_sweep_32", |b| {
        b.iter_batched(
            || {
                (1..=32)
                    .try_fold(layout.clone(), |layout, n| {
                        layout.mark_view_for_removal(&format!("view.{}", n * 4))
                    })
                    .expect("bench mark")
            },
            |marked| black_box(marked.remove_views_marked_for_removal()),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_add_view,
    bench_drop_to_region,
    bench_persistence,
    bench_remove_cascade,
);

criterion_main!(benches);
