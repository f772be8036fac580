use criterion::{criterion_group, criterion_main, Criterion};
use kd_index::kdtree::{KDTree, KDTreeBuilder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstar::RTree;

const NUM_POINTS: usize = 100_000;

fn load_points() -> Vec<[f64; 3]> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..NUM_POINTS)
        .map(|_| {
            [
                rng.gen_range(-1000.0..1000.0),
                rng.gen_range(-1000.0..1000.0),
                rng.gen_range(-1000.0..1000.0),
            ]
        })
        .collect()
}

fn construct_inserted(points: &[[f64; 3]]) -> KDTree<f64, usize> {
    let mut tree = KDTree::new(3);
    for (i, point) in points.iter().enumerate() {
        tree.insert(point, Some(i)).unwrap();
    }
    tree
}

fn construct_bulk(points: &[[f64; 3]]) -> KDTree<f64, usize> {
    let mut builder = KDTreeBuilder::with_capacity(3, points.len());
    for (i, point) in points.iter().enumerate() {
        builder.add(point, Some(i)).unwrap();
    }
    builder.finish().unwrap()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let points = load_points();

    c.bench_function("construction (kd-index insert)", |b| {
        b.iter(|| construct_inserted(&points))
    });

    c.bench_function("construction (kd-index bulk)", |b| {
        b.iter(|| construct_bulk(&points))
    });

    c.bench_function("construction (rstar bulk)", |b| {
        b.iter(|| RTree::bulk_load(points.clone()))
    });

    let inserted = construct_inserted(&points);
    let bulk = construct_bulk(&points);
    let rstar_tree = RTree::bulk_load(points.clone());
    let query = [12.5, -40.25, 300.];

    c.bench_function("nearest (kd-index insert)", |b| {
        b.iter(|| inserted.nearest(&query).unwrap())
    });

    c.bench_function("nearest (kd-index bulk)", |b| {
        b.iter(|| bulk.nearest(&query).unwrap())
    });

    c.bench_function("nearest (rstar)", |b| {
        b.iter(|| rstar_tree.nearest_neighbor(&query))
    });

    let radius = 50.;

    c.bench_function("range (kd-index bulk)", |b| {
        b.iter(|| bulk.nearest_range(&query, radius).unwrap().len())
    });

    c.bench_function("range (rstar)", |b| {
        b.iter(|| {
            rstar_tree
                .locate_within_distance(query, radius * radius)
                .count()
        })
    });

    let queries: Vec<f64> = points.iter().take(1000).flatten().copied().collect();
    c.bench_function("nearest batch of 1000 (kd-index bulk)", |b| {
        b.iter(|| bulk.nearest_batch(&queries).unwrap().len())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
