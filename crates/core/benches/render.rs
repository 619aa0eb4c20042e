//! Criterion benchmarks for full vs incremental repaint.
//!
//! Run with:
//!   cargo bench -p golview
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use golview::board::{Board, CellChange, Grid, GridSize};
use golview::render::RenderEngine;
use golview::surface::{Palette, RasterSurface};

const SCALE: u32 = 15;

/// Deterministic board with roughly a third of the cells alive.
fn make_board(size: GridSize) -> Board {
    let mut grid = Grid::new(size);
    for y in 0..size.h {
        for x in 0..size.w {
            if (x * 7 + y * 13) % 3 == 0 {
                grid.set(x, y, true);
            }
        }
    }
    Board {
        grid,
        pause: Some(false),
    }
}

fn make_diff(size: GridSize, count: usize) -> Vec<CellChange> {
    (0..count as u32)
        .map(|i| {
            let x = (i * 31) % size.w;
            let y = (i * 17) % size.h;
            CellChange::new(x, y, i % 2 == 0)
        })
        .collect()
}

fn surface_for(size: GridSize) -> RasterSurface {
    RasterSurface::new(size.w * SCALE, size.h * SCALE, SCALE, Palette::default())
}

/// Full repaint at growing grid sizes.
fn bench_full_repaint(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_repaint");

    for (w, h) in [(50, 35), (100, 70), (200, 140)] {
        let size = GridSize::new(w, h);
        group.throughput(Throughput::Elements(size.cell_count() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let board = make_board(size);
            let mut surface = surface_for(size);
            let mut engine = RenderEngine::new();

            b.iter(|| black_box(engine.full_repaint(&board, &mut surface)));
        });
    }

    group.finish();
}

/// Incremental repaint on the default 100x70 grid with growing diffs.
fn bench_incremental_repaint(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental_repaint");
    let size = GridSize::new(100, 70);

    for count in [10, 100, 1000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let changes = make_diff(size, count);
            let mut surface = surface_for(size);
            let mut engine = RenderEngine::new();

            b.iter(|| black_box(engine.incremental_repaint(&changes, &mut surface)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_full_repaint, bench_incremental_repaint);
criterion_main!(benches);
