use geo_traits::CoordTrait;
use tinyvec::TinyVec;

use crate::error::Result;
use crate::kdtree::index::sq_dist;
use crate::kdtree::{KDTree, Neighbor, QueryResult, Within};
use crate::r#type::{coord_values, IndexableNum};

impl<N: IndexableNum, P> KDTree<N, P> {
    /// Find the point nearest to `point`.
    ///
    /// Returns `Ok(None)` if the tree is empty. When several points are equally near, the first
    /// one reached by the search wins; this is deterministic for a given insertion history.
    pub fn nearest(&self, point: &[N]) -> Result<Option<Neighbor<'_, N, P>>> {
        self.check_arity(point.len())?;
        Ok(self.nearest_unchecked(point))
    }

    /// Find the point nearest to a geo-traits coordinate.
    pub fn nearest_coord(
        &self,
        coord: &impl CoordTrait<T = N>,
    ) -> Result<Option<Neighbor<'_, N, P>>> {
        self.nearest(&coord_values(coord))
    }

    /// Shortcut for [`nearest`][Self::nearest] that only returns the found coordinates.
    pub fn nearest_point(&self, point: &[N]) -> Result<Option<&[N]>> {
        Ok(self.nearest(point)?.map(|neighbor| neighbor.coords()))
    }

    /// Shortcut for [`nearest`][Self::nearest] that only returns the found payload.
    ///
    /// Returns `None` both when the tree is empty and when the nearest point has no payload.
    pub fn nearest_payload(&self, point: &[N]) -> Result<Option<&P>> {
        Ok(self.nearest(point)?.and_then(|neighbor| neighbor.payload()))
    }

    /// Collect every point within `radius` of `point`, boundary included.
    ///
    /// Results are in traversal order, not sorted by distance. A negative radius yields an empty
    /// result.
    #[tracing::instrument(level = "debug", skip_all, fields(radius = ?radius))]
    pub fn nearest_range(&self, point: &[N], radius: N) -> Result<QueryResult<'_, N, P>> {
        let result = QueryResult::new(self.within(point, radius)?);
        tracing::trace!(hits = result.len(), "range query complete");
        Ok(result)
    }

    /// Lazily iterate over every point within `radius` of `point`, boundary included.
    pub fn within(&self, point: &[N], radius: N) -> Result<Within<'_, N, P>> {
        self.check_arity(point.len())?;
        Ok(Within::new(self, point, radius))
    }

    /// Lazily iterate over every point within `radius` of a geo-traits coordinate.
    pub fn within_coord(
        &self,
        coord: &impl CoordTrait<T = N>,
        radius: N,
    ) -> Result<Within<'_, N, P>> {
        self.within(&coord_values(coord), radius)
    }

    /// Nearest neighbor search for a point already known to have the right arity.
    pub(crate) fn nearest_unchecked(&self, point: &[N]) -> Option<Neighbor<'_, N, P>> {
        let root = self.root?;

        // Pending `(node id, depth, squared distance to the splitting plane)`. Near children are
        // queued with a zero plane distance and so are never pruned.
        let mut stack: TinyVec<[(u32, usize, N); 32]> = TinyVec::new();
        stack.push((root, 0, N::zero()));

        let mut best: Option<(u32, N)> = None;

        while let Some((id, depth, plane_sq)) = stack.pop() {
            if let Some((_, best_sq)) = best {
                if plane_sq >= best_sq {
                    continue;
                }
            }

            let coords = self.node_coords(id);
            let distance_sq = sq_dist(point, coords);
            if best.map_or(true, |(_, best_sq)| distance_sq < best_sq) {
                best = Some((id, distance_sq));
            }

            let node = self.nodes[id as usize];
            let axis = depth % self.dimension;
            let (near, far) = if point[axis] < coords[axis] {
                (node.left, node.right)
            } else {
                (node.right, node.left)
            };

            // The far side is popped only once the near side is exhausted
            if let Some(far) = far {
                let diff = point[axis] - coords[axis];
                stack.push((far, depth + 1, diff * diff));
            }
            if let Some(near) = near {
                stack.push((near, depth + 1, N::zero()));
            }
        }

        best.map(|(id, distance_sq)| self.neighbor(id, distance_sq))
    }
}
