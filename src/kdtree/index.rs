use std::fmt;

use geo_traits::CoordTrait;

use crate::error::{KDTreeError, Result};
use crate::r#type::{coord_values, IndexableNum};

/// Callback that receives each payload when its node is destroyed.
pub(crate) type Release<P> = Box<dyn FnMut(P) + Send + Sync>;

/// Child links of a single node. The node's coordinates and payload live in the tree's flat
/// buffers at the same id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct KDNode {
    pub(crate) left: Option<u32>,
    pub(crate) right: Option<u32>,
}

/// A mutable k-dimensional tree.
///
/// Each point optionally carries a payload of type `P`. The tree owns every payload it is given
/// and releases it when the tree is cleared or dropped, either through the callback passed to
/// [`KDTree::with_release`] or through the payload's own `Drop`.
///
/// The split axis of a node is `depth % dimensions`. Points strictly less than a node on that
/// axis are stored to its left, all others (including ties) to its right.
///
/// ```
/// use kd_index::kdtree::KDTree;
///
/// let mut tree = KDTree::<f64, &str>::new(3);
/// tree.insert(&[1., 1., 1.], Some("A")).unwrap();
/// tree.insert(&[2., 2., 2.], Some("B")).unwrap();
///
/// let nearest = tree.nearest(&[0.9, 1.2, 1.]).unwrap().unwrap();
/// assert_eq!(nearest.coords(), &[1., 1., 1.]);
/// assert_eq!(nearest.payload(), Some(&"A"));
/// ```
pub struct KDTree<N: IndexableNum, P = ()> {
    pub(crate) dimension: usize,
    /// Interleaved coordinates, `dimension` values per node
    pub(crate) coords: Vec<N>,
    pub(crate) nodes: Vec<KDNode>,
    pub(crate) payloads: Vec<Option<P>>,
    pub(crate) root: Option<u32>,
    release: Option<Release<P>>,
}

impl<N: IndexableNum, P> KDTree<N, P> {
    /// Create an empty tree over points with `dimension` coordinates.
    ///
    /// A dimension of zero is accepted here, but every point operation on such a tree returns
    /// [`KDTreeError::ZeroDimension`].
    pub fn new(dimension: usize) -> Self {
        Self::from_parts(dimension, 0, None)
    }

    /// Create an empty tree that passes every payload to `release` when it is destroyed.
    ///
    /// `release` is invoked exactly once per payload, when the tree is dropped or cleared. It is
    /// never invoked for points inserted without a payload.
    pub fn with_release(dimension: usize, release: impl FnMut(P) + Send + Sync + 'static) -> Self {
        Self::from_parts(dimension, 0, Some(Box::new(release)))
    }

    pub(crate) fn from_parts(
        dimension: usize,
        capacity: usize,
        release: Option<Release<P>>,
    ) -> Self {
        Self {
            dimension,
            coords: Vec::with_capacity(capacity * dimension),
            nodes: Vec::with_capacity(capacity),
            payloads: Vec::with_capacity(capacity),
            root: None,
            release,
        }
    }

    /// The number of coordinates of every point in this tree.
    pub fn dimensions(&self) -> usize {
        self.dimension
    }

    /// The number of points in this tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree contains no points.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Insert a point, optionally carrying a payload.
    ///
    /// The tree takes ownership of `payload`. If the point does not have exactly
    /// [`dimensions`][Self::dimensions] coordinates this fails with
    /// [`KDTreeError::InvalidArity`] and the tree is left untouched.
    pub fn insert(&mut self, point: &[N], payload: Option<P>) -> Result<()> {
        self.check_arity(point.len())?;
        let id = self.push_node(point, payload)?;

        let Some(mut current) = self.root else {
            self.root = Some(id);
            return Ok(());
        };

        let mut depth = 0;
        loop {
            let axis = depth % self.dimension;
            let split = self.coords[current as usize * self.dimension + axis];
            let node = &mut self.nodes[current as usize];
            let slot = if point[axis] < split {
                &mut node.left
            } else {
                &mut node.right
            };

            match *slot {
                Some(child) => {
                    current = child;
                    depth += 1;
                }
                None => {
                    *slot = Some(id);
                    return Ok(());
                }
            }
        }
    }

    /// Insert a point given as a geo-traits coordinate.
    pub fn insert_coord(
        &mut self,
        coord: &impl CoordTrait<T = N>,
        payload: Option<P>,
    ) -> Result<()> {
        self.insert(&coord_values(coord), payload)
    }

    /// Remove every point, releasing all payloads. The dimension and release callback are kept.
    #[tracing::instrument(level = "debug", skip_all, fields(len = self.len()))]
    pub fn clear(&mut self) {
        self.release_payloads();
        self.coords.clear();
        self.nodes.clear();
        self.root = None;
    }

    /// Append an unlinked node to the flat buffers, returning its id.
    ///
    /// On [`KDTreeError::AllocationFailure`] nothing has been appended and `payload` is dropped.
    pub(crate) fn push_node(&mut self, point: &[N], payload: Option<P>) -> Result<u32> {
        let id = next_id(self.nodes.len())?;
        try_grow(&mut self.coords, self.dimension)?;
        try_grow(&mut self.nodes, 1)?;
        try_grow(&mut self.payloads, 1)?;

        self.coords.extend_from_slice(point);
        self.nodes.push(KDNode::default());
        self.payloads.push(payload);
        Ok(id)
    }

    #[inline]
    pub(crate) fn check_arity(&self, found: usize) -> Result<()> {
        check_arity(self.dimension, found)
    }

    #[inline]
    pub(crate) fn node_coords(&self, id: u32) -> &[N] {
        let start = id as usize * self.dimension;
        &self.coords[start..start + self.dimension]
    }

    #[inline]
    pub(crate) fn node_payload(&self, id: u32) -> Option<&P> {
        self.payloads[id as usize].as_ref()
    }

    /// Hand every payload to the release callback, or drop it if there is none.
    fn release_payloads(&mut self) -> usize {
        let mut released = 0;
        for payload in self.payloads.drain(..).flatten() {
            released += 1;
            match self.release.as_mut() {
                Some(release) => release(payload),
                None => drop(payload),
            }
        }
        released
    }
}

impl<N: IndexableNum, P> Drop for KDTree<N, P> {
    fn drop(&mut self) {
        let released = self.release_payloads();
        if released > 0 {
            tracing::debug!(released, "released payloads on teardown");
        }
    }
}

impl<N: IndexableNum, P> fmt::Debug for KDTree<N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KDTree")
            .field("dimension", &self.dimension)
            .field("len", &self.len())
            .field("root", &self.root)
            .field("has_release", &self.release.is_some())
            .finish()
    }
}

/// Validate that a point with `found` coordinates fits a space of `dimension` dimensions.
pub(crate) fn check_arity(dimension: usize, found: usize) -> Result<()> {
    if dimension == 0 {
        tracing::trace!("rejected point for zero-dimensional tree");
        return Err(KDTreeError::ZeroDimension);
    }
    if found != dimension {
        tracing::trace!(expected = dimension, found, "rejected point");
        return Err(KDTreeError::InvalidArity {
            expected: dimension,
            found,
        });
    }
    Ok(())
}

/// The id of the node appended after `len` existing nodes. Ids are `u32`.
#[inline]
pub(crate) fn next_id(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| KDTreeError::AllocationFailure)
}

/// Reserve room for `additional` more items without aborting on allocation failure.
#[inline]
pub(crate) fn try_grow<T>(buffer: &mut Vec<T>, additional: usize) -> Result<()> {
    buffer
        .try_reserve(additional)
        .map_err(|_| KDTreeError::AllocationFailure)
}

/// Squared Euclidean distance between two points of equal length.
#[inline]
pub(crate) fn sq_dist<N: IndexableNum>(a: &[N], b: &[N]) -> N {
    a.iter().zip(b).fold(N::zero(), |acc, (&a, &b)| {
        let d = a - b;
        acc + d * d
    })
}
