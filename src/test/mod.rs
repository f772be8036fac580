//! Shared fixtures for tests.

use rand::rngs::StdRng;
use rand::Rng;

use crate::kdtree::{KDTree, Node};
use crate::r#type::IndexableNum;


/// Route tracing output through the test harness. Filtered by `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `n` points with coordinates drawn uniformly from `[-100, 100)`.
pub(crate) fn random_points(rng: &mut StdRng, n: usize, dimension: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|_| (0..dimension).map(|_| rng.gen_range(-100.0..100.0)).collect())
        .collect()
}

/// `n` points with small integer coordinates, so that many share a value on some axis.
pub(crate) fn clustered_points(rng: &mut StdRng, n: usize, dimension: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|_| (0..dimension).map(|_| rng.gen_range(0..4) as f64).collect())
        .collect()
}

pub(crate) fn sq_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).fold(0., |acc, (a, b)| {
        let d = a - b;
        acc + d * d
    })
}

/// Squared distance from `query` to the nearest of `points`.
pub(crate) fn brute_force_nearest(points: &[Vec<f64>], query: &[f64]) -> Option<f64> {
    points
        .iter()
        .map(|point| sq_dist(point, query))
        .min_by(|a, b| a.partial_cmp(b).unwrap())
}

/// Sorted indices of every point within `radius` of `query`.
pub(crate) fn brute_force_within(points: &[Vec<f64>], query: &[f64], radius: f64) -> Vec<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(_, point)| radius >= 0. && sq_dist(point, query) <= radius * radius)
        .map(|(i, _)| i)
        .collect()
}

/// Check that every node's left subtree is strictly less, and its right subtree greater or
/// equal, on the node's split axis.
///
/// Each node is checked against the bounds inherited from all of its ancestors, so this stays
/// linear even on chain-shaped trees.
pub(crate) fn assert_split_invariant<N: IndexableNum, P>(tree: &KDTree<N, P>) {
    type Bounds<N> = Vec<Option<N>>;

    let dimension = tree.dimensions();
    // Per-axis lower bounds (inclusive) and upper bounds (exclusive)
    let mut stack: Vec<(Node<'_, N, P>, Bounds<N>, Bounds<N>)> = tree
        .root()
        .map(|root| (root, vec![None; dimension], vec![None; dimension]))
        .into_iter()
        .collect();

    while let Some((node, lower, upper)) = stack.pop() {
        for (axis, &value) in node.coords().iter().enumerate() {
            if let Some(low) = lower[axis] {
                assert!(
                    value >= low,
                    "{:?} below split {:?} of an ancestor on axis {}",
                    node.coords(),
                    low,
                    axis
                );
            }
            if let Some(high) = upper[axis] {
                assert!(
                    value < high,
                    "{:?} not below split {:?} of an ancestor on axis {}",
                    node.coords(),
                    high,
                    axis
                );
            }
        }

        let axis = node.axis();
        let split = node.split_value();
        if let Some(left) = node.left_child() {
            let mut upper = upper.clone();
            upper[axis] = Some(upper[axis].map_or(split, |high| high.min(split)));
            stack.push((left, lower.clone(), upper));
        }
        if let Some(right) = node.right_child() {
            let mut lower = lower;
            lower[axis] = Some(lower[axis].map_or(split, |low| low.max(split)));
            stack.push((right, lower, upper));
        }
    }
}
