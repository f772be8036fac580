//! Batched read-only queries.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::error::{KDTreeError, Result};
use crate::kdtree::{KDTree, Neighbor};
use crate::r#type::IndexableNum;

impl<N: IndexableNum, P: Sync> KDTree<N, P> {
    /// Find the nearest point for every query in `queries`, which holds interleaved coordinates,
    /// [`dimensions`][Self::dimensions] values per query.
    ///
    /// Results are in query order. With the `rayon` feature the queries are answered in parallel.
    #[tracing::instrument(level = "debug", skip_all, fields(num_queries = queries.len() / self.dimension.max(1)))]
    pub fn nearest_batch(&self, queries: &[N]) -> Result<Vec<Option<Neighbor<'_, N, P>>>> {
        if self.dimension == 0 {
            return Err(KDTreeError::ZeroDimension);
        }
        let remainder = queries.len() % self.dimension;
        if remainder != 0 {
            return Err(KDTreeError::InvalidArity {
                expected: self.dimension,
                found: remainder,
            });
        }

        #[cfg(feature = "rayon")]
        let results = queries
            .par_chunks_exact(self.dimension)
            .map(|query| self.nearest_unchecked(query))
            .collect();

        #[cfg(not(feature = "rayon"))]
        let results = queries
            .chunks_exact(self.dimension)
            .map(|query| self.nearest_unchecked(query))
            .collect();

        Ok(results)
    }
}
