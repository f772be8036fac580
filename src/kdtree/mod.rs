//! An implementation of a mutable K-D Tree that owns a payload per point.

#![warn(missing_docs)]

mod builder;
mod index;
mod parallel;
mod result;
mod search;
mod traversal;

pub use builder::KDTreeBuilder;
pub use index::KDTree;
pub use result::{Neighbor, QueryResult, Within};
pub use traversal::Node;
