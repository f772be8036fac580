//! Views onto query results.

use std::cmp::Ordering;
use std::fmt;

use tinyvec::TinyVec;

use crate::kdtree::index::sq_dist;
use crate::kdtree::KDTree;
use crate::r#type::IndexableNum;

/// A point found by a query, borrowed from the tree that owns it.
pub struct Neighbor<'a, N: IndexableNum, P> {
    coords: &'a [N],
    payload: Option<&'a P>,
    distance_sq: N,
}

impl<'a, N: IndexableNum, P> Neighbor<'a, N, P> {
    /// The coordinates of the found point.
    pub fn coords(&self) -> &'a [N] {
        self.coords
    }

    /// The payload attached to the found point, if one was supplied on insert.
    pub fn payload(&self) -> Option<&'a P> {
        self.payload
    }

    /// Squared Euclidean distance from the query point.
    pub fn distance_sq(&self) -> N {
        self.distance_sq
    }

    /// Euclidean distance from the query point.
    pub fn distance(&self) -> N {
        self.distance_sq.sqrt()
    }
}

impl<N: IndexableNum, P> Clone for Neighbor<'_, N, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N: IndexableNum, P> Copy for Neighbor<'_, N, P> {}

impl<N: IndexableNum, P: fmt::Debug> fmt::Debug for Neighbor<'_, N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neighbor")
            .field("coords", &self.coords)
            .field("payload", &self.payload)
            .field("distance_sq", &self.distance_sq)
            .finish()
    }
}

impl<N: IndexableNum, P> KDTree<N, P> {
    #[inline]
    pub(crate) fn neighbor(&self, id: u32, distance_sq: N) -> Neighbor<'_, N, P> {
        Neighbor {
            coords: self.node_coords(id),
            payload: self.node_payload(id),
            distance_sq,
        }
    }
}

/// A lazy iterator over every point within a radius of a query point.
///
/// Points are yielded in pre-order (node, then left subtree, then right subtree), not sorted by
/// distance. Created by [`KDTree::within`].
pub struct Within<'a, N: IndexableNum, P> {
    tree: &'a KDTree<N, P>,
    query: Vec<N>,
    radius: N,
    radius_sq: N,
    /// Pending `(node id, depth)` pairs
    stack: TinyVec<[(u32, usize); 32]>,
}

impl<'a, N: IndexableNum, P> Within<'a, N, P> {
    pub(crate) fn new(tree: &'a KDTree<N, P>, query: &[N], radius: N) -> Self {
        let mut stack = TinyVec::new();
        // A negative or NaN radius matches nothing
        if radius >= N::zero() {
            if let Some(root) = tree.root {
                stack.push((root, 0));
            }
        }

        Self {
            tree,
            query: query.to_vec(),
            radius,
            radius_sq: radius * radius,
            stack,
        }
    }

    /// Advance the traversal to the next node within range, returning its id and squared
    /// distance.
    fn next_hit(&mut self) -> Option<(u32, N)> {
        while let Some((id, depth)) = self.stack.pop() {
            let node = self.tree.nodes[id as usize];
            let coords = self.tree.node_coords(id);
            let axis = depth % self.tree.dimension;
            let diff = self.query[axis] - coords[axis];

            // Pushed in backwards order to what gets popped, so the left subtree comes first
            if let Some(right) = node.right {
                if -diff <= self.radius {
                    self.stack.push((right, depth + 1));
                }
            }
            if let Some(left) = node.left {
                if diff <= self.radius {
                    self.stack.push((left, depth + 1));
                }
            }

            let distance_sq = sq_dist(&self.query, coords);
            if distance_sq <= self.radius_sq {
                return Some((id, distance_sq));
            }
        }
        None
    }
}

impl<'a, N: IndexableNum, P> Iterator for Within<'a, N, P> {
    type Item = Neighbor<'a, N, P>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, distance_sq) = self.next_hit()?;
        Some(self.tree.neighbor(id, distance_sq))
    }
}

impl<N: IndexableNum, P> fmt::Debug for Within<'_, N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Within")
            .field("query", &self.query)
            .field("radius", &self.radius)
            .field("pending", &self.stack.len())
            .finish()
    }
}

/// The collected result of a range query, read through a forward cursor.
///
/// The result owns its list of hits but borrows coordinates and payloads from the tree, which
/// keeps ownership of them. Hits are in traversal order unless
/// [`sort_by_distance`][Self::sort_by_distance] is called.
///
/// ```
/// use kd_index::kdtree::KDTree;
///
/// let mut tree = KDTree::<f64>::new(2);
/// tree.insert(&[0., 0.], None).unwrap();
/// tree.insert(&[1., 0.], None).unwrap();
/// tree.insert(&[5., 5.], None).unwrap();
///
/// let mut result = tree.nearest_range(&[0., 0.], 1.).unwrap();
/// assert_eq!(result.len(), 2);
/// while let Some(hit) = result.current() {
///     assert!(hit.distance() <= 1.);
///     result.advance();
/// }
/// assert!(result.is_exhausted());
/// result.release();
/// ```
pub struct QueryResult<'a, N: IndexableNum, P> {
    tree: &'a KDTree<N, P>,
    hits: Vec<(u32, N)>,
    position: usize,
}

impl<'a, N: IndexableNum, P> QueryResult<'a, N, P> {
    pub(crate) fn new(mut within: Within<'a, N, P>) -> Self {
        let mut hits = vec![];
        while let Some(hit) = within.next_hit() {
            hits.push(hit);
        }

        Self {
            tree: within.tree,
            hits,
            position: 0,
        }
    }

    /// The total number of hits, regardless of cursor position.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns `true` if the query found nothing.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Returns `true` once the cursor has moved past the last hit.
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.hits.len()
    }

    /// The hit under the cursor, or `None` if the cursor is exhausted.
    pub fn current(&self) -> Option<Neighbor<'a, N, P>> {
        self.hits
            .get(self.position)
            .map(|&(id, distance_sq)| self.tree.neighbor(id, distance_sq))
    }

    /// Move the cursor to the next hit. Returns `false` if the cursor is now exhausted.
    pub fn advance(&mut self) -> bool {
        if self.position < self.hits.len() {
            self.position += 1;
        }
        !self.is_exhausted()
    }

    /// Move the cursor back to the first hit.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Reorder the hits nearest first and rewind the cursor.
    ///
    /// The sort is stable, so equidistant hits keep their traversal order.
    pub fn sort_by_distance(&mut self) {
        self.hits
            .sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        self.rewind();
    }

    /// Iterate over every hit from the start, without moving the cursor.
    pub fn iter(&self) -> impl Iterator<Item = Neighbor<'a, N, P>> + '_ {
        self.hits
            .iter()
            .map(|&(id, distance_sq)| self.tree.neighbor(id, distance_sq))
    }

    /// Release the result. Equivalent to dropping it.
    pub fn release(self) {}
}

impl<'a, N: IndexableNum, P> Iterator for QueryResult<'a, N, P> {
    type Item = Neighbor<'a, N, P>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.current()?;
        self.position += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.hits.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl<N: IndexableNum, P> fmt::Debug for QueryResult<'_, N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("hits", &self.hits)
            .field("position", &self.position)
            .finish()
    }
}
