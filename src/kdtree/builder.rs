use std::cmp;

use geo_traits::CoordTrait;
use tinyvec::TinyVec;

use crate::error::{KDTreeError, Result};
use crate::kdtree::index::{check_arity, try_grow, Release};
use crate::kdtree::KDTree;
use crate::r#type::{coord_values, IndexableNum};

/// A builder to create a balanced [`KDTree`] from a known set of points.
///
/// Points added here are kd-sorted on [`finish`][Self::finish], producing a tree whose height is
/// logarithmic in the number of points. The finished tree accepts further
/// [`insert`][KDTree::insert] calls like any other.
///
/// ```
/// use kd_index::kdtree::KDTreeBuilder;
///
/// let mut builder = KDTreeBuilder::<f64, u32>::with_capacity(2, 3);
/// builder.add(&[0., 0.], Some(0)).unwrap();
/// builder.add(&[1., 1.], Some(1)).unwrap();
/// builder.add(&[2., 2.], Some(2)).unwrap();
/// let tree = builder.finish().unwrap();
///
/// assert_eq!(tree.height(), 2);
/// assert_eq!(tree.nearest_payload(&[1.9, 2.1]).unwrap(), Some(&2));
/// ```
pub struct KDTreeBuilder<N: IndexableNum, P = ()> {
    dimension: usize,
    /// Interleaved coordinates, `dimension` values per item
    coords: Vec<N>,
    payloads: Vec<Option<P>>,
    release: Option<Release<P>>,
}

impl<N: IndexableNum, P> KDTreeBuilder<N, P> {
    /// Create a new builder for points with `dimension` coordinates.
    pub fn new(dimension: usize) -> Self {
        Self::with_capacity(dimension, 0)
    }

    /// Create a new builder with room for `num_items` points.
    pub fn with_capacity(dimension: usize, num_items: usize) -> Self {
        Self {
            dimension,
            coords: Vec::with_capacity(num_items * dimension),
            payloads: Vec::with_capacity(num_items),
            release: None,
        }
    }

    /// Set the callback the finished tree uses to release payloads.
    ///
    /// Only payloads that make it into the finished tree are passed to `release`; payloads still
    /// held by a builder that is dropped are dropped normally.
    pub fn release_with(mut self, release: impl FnMut(P) + Send + Sync + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    /// The number of points added so far.
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Returns `true` if no points have been added.
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Add a point to the index, returning its insertion index.
    pub fn add(&mut self, point: &[N], payload: Option<P>) -> Result<usize> {
        check_arity(self.dimension, point.len())?;
        try_grow(&mut self.coords, self.dimension)?;
        try_grow(&mut self.payloads, 1)?;

        let index = self.payloads.len();
        self.coords.extend_from_slice(point);
        self.payloads.push(payload);
        Ok(index)
    }

    /// Add a point given as a geo-traits coordinate.
    pub fn add_coord(
        &mut self,
        coord: &impl CoordTrait<T = N>,
        payload: Option<P>,
    ) -> Result<usize> {
        self.add(&coord_values(coord), payload)
    }

    /// Add many payload-free points at once from interleaved coordinates.
    ///
    /// `coords` must hold a whole number of points.
    pub fn add_interleaved(&mut self, coords: &[N]) -> Result<()> {
        if self.dimension == 0 {
            return Err(KDTreeError::ZeroDimension);
        }
        let remainder = coords.len() % self.dimension;
        if remainder != 0 {
            return Err(KDTreeError::InvalidArity {
                expected: self.dimension,
                found: remainder,
            });
        }

        let num_items = coords.len() / self.dimension;
        try_grow(&mut self.coords, coords.len())?;
        try_grow(&mut self.payloads, num_items)?;

        self.coords.extend_from_slice(coords);
        self.payloads.extend((0..num_items).map(|_| None));
        Ok(())
    }

    /// Consume this builder, performing the k-d sort and generating a KDTree ready for queries.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(num_items = self.len(), dimension = self.dimension)
    )]
    pub fn finish(mut self) -> Result<KDTree<N, P>> {
        let num_items = self.len();
        let mut tree = KDTree::from_parts(self.dimension, num_items, self.release.take());
        if num_items == 0 {
            return Ok(tree);
        }

        let mut ids: Vec<usize> = (0..num_items).collect();
        let mut sorter = Sorter {
            ids: &mut ids,
            coords: &mut self.coords,
            payloads: &mut self.payloads,
            dimension: self.dimension,
        };
        sorter.build(&mut tree, num_items)?;

        tracing::debug!(num_items, height = tree.height(), "built balanced tree");
        Ok(tree)
    }
}

/// Where a newly created node gets linked into the tree.
#[derive(Debug, Clone, Copy, Default)]
enum Link {
    #[default]
    Root,
    Left(u32),
    Right(u32),
}

impl Link {
    fn attach<N: IndexableNum, P>(self, tree: &mut KDTree<N, P>, id: u32) {
        match self {
            Link::Root => tree.root = Some(id),
            Link::Left(parent) => tree.nodes[parent as usize].left = Some(id),
            Link::Right(parent) => tree.nodes[parent as usize].right = Some(id),
        }
    }
}

/// Mutable borrow of the staged items while they are being kd-sorted.
struct Sorter<'b, N: IndexableNum, P> {
    /// Original insertion index of each slot, moved alongside the coordinates
    ids: &'b mut [usize],
    coords: &'b mut [N],
    payloads: &'b mut [Option<P>],
    dimension: usize,
}

impl<N: IndexableNum, P> Sorter<'_, N, P> {
    /// Build the tree over the first `num_items` slots, appending nodes to `tree` in pre-order.
    ///
    /// Pending subtrees live on an explicit stack. Heavy ties can make the tree as deep as it is
    /// long.
    fn build(&mut self, tree: &mut KDTree<N, P>, num_items: usize) -> Result<()> {
        let mut stack: TinyVec<[(usize, usize, usize, Link); 32]> = TinyVec::new();
        stack.push((0, num_items, 0, Link::Root));

        while let Some((left, right, depth, link)) = stack.pop() {
            // Identical points always chain to the right, whatever the axis
            if self.all_identical(left, right) {
                let mut link = link;
                for slot in left..right {
                    let id = self.push(tree, slot)?;
                    link.attach(tree, id);
                    link = Link::Right(id);
                }
                continue;
            }

            let axis = depth % self.dimension;

            // middle index; strictly greater than `left` since there are two or more items
            let m = left + ((right - left) >> 1);
            self.select(m, left, right - 1, axis);
            let pivot = self.separate_ties(left, m, axis);

            let id = self.push(tree, pivot)?;
            link.attach(tree, id);

            // Pushed in backwards order to what gets popped, so the left subtree is laid out first
            if pivot + 1 < right {
                stack.push((pivot + 1, right, depth + 1, Link::Right(id)));
            }
            if left < pivot {
                stack.push((left, pivot, depth + 1, Link::Left(id)));
            }
        }

        Ok(())
    }

    /// Move the item in `slot` into `tree` as an unlinked node.
    fn push(&mut self, tree: &mut KDTree<N, P>, slot: usize) -> Result<u32> {
        let start = slot * self.dimension;
        let payload = self.payloads[self.ids[slot]].take();
        tree.push_node(&self.coords[start..start + self.dimension], payload)
    }

    /// Returns `true` if every item in `[left, right)` has the same coordinates as the first.
    fn all_identical(&self, left: usize, right: usize) -> bool {
        let first = &self.coords[left * self.dimension..(left + 1) * self.dimension];
        self.coords[(left + 1) * self.dimension..right * self.dimension]
            .chunks_exact(self.dimension)
            .all(|item| item == first)
    }

    /// After selection, items in `[left, m)` are only known to be `<=` the median. Move every
    /// item equal to the median behind the strictly smaller ones and return the median's new
    /// slot, so that everything before it is strictly less on `axis`.
    fn separate_ties(&mut self, left: usize, m: usize, axis: usize) -> usize {
        let t = self.value(m, axis);
        let mut pivot = left;
        for i in left..m {
            if self.value(i, axis) < t {
                self.swap_item(pivot, i);
                pivot += 1;
            }
        }
        self.swap_item(pivot, m);
        pivot
    }

    /// Custom Floyd-Rivest selection algorithm: sort ids and coords so that [left..k-1] items are
    /// smaller than k-th item on `axis`. Requires `k > left` or `left == right`.
    fn select(&mut self, k: usize, mut left: usize, mut right: usize, axis: usize) {
        while right > left {
            if right - left > 600 {
                let n = (right - left + 1) as f64;
                let m = (k - left + 1) as f64;
                let z = f64::ln(n);
                let s = 0.5 * f64::exp((2.0 * z) / 3.0);
                let sd = 0.5
                    * f64::sqrt((z * s * (n - s)) / n)
                    * (if m - n / 2.0 < 0.0 { -1.0 } else { 1.0 });
                let new_left = cmp::max(left, f64::floor(k as f64 - (m * s) / n + sd) as usize);
                let new_right = cmp::min(
                    right,
                    f64::floor(k as f64 + ((n - m) * s) / n + sd) as usize,
                );
                self.select(k, new_left, new_right, axis);
            }

            let t = self.value(k, axis);
            let mut i = left;
            let mut j = right;

            self.swap_item(left, k);
            if self.value(right, axis) > t {
                self.swap_item(left, right);
            }

            while i < j {
                self.swap_item(i, j);
                i += 1;
                j -= 1;
                while self.value(i, axis) < t {
                    i += 1;
                }
                while self.value(j, axis) > t {
                    j -= 1;
                }
            }

            if self.value(left, axis) == t {
                self.swap_item(left, j);
            } else {
                j += 1;
                self.swap_item(j, right);
            }

            if j <= k {
                left = j + 1;
            }
            if k <= j {
                right = j - 1;
            }
        }
    }

    #[inline]
    fn value(&self, i: usize, axis: usize) -> N {
        self.coords[self.dimension * i + axis]
    }

    #[inline]
    fn swap_item(&mut self, i: usize, j: usize) {
        self.ids.swap(i, j);
        for axis in 0..self.dimension {
            self.coords
                .swap(self.dimension * i + axis, self.dimension * j + axis);
        }
    }
}
