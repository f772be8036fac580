//! Utilities to traverse the KDTree structure.

use tinyvec::TinyVec;

use crate::kdtree::KDTree;
use crate::r#type::IndexableNum;

/// A node in the KDTree.
#[derive(Debug)]
pub struct Node<'a, N: IndexableNum, P> {
    /// The tree that this node is a reference onto
    tree: &'a KDTree<N, P>,

    id: u32,

    /// Distance from the root, which has depth 0
    depth: usize,
}

impl<'a, N: IndexableNum, P> Node<'a, N, P> {
    pub(crate) fn from_root(tree: &'a KDTree<N, P>) -> Option<Self> {
        tree.root.map(|id| Self { tree, id, depth: 0 })
    }

    /// The coordinates of the point stored at this node.
    pub fn coords(&self) -> &'a [N] {
        self.tree.node_coords(self.id)
    }

    /// The payload stored at this node, if any.
    pub fn payload(&self) -> Option<&'a P> {
        self.tree.node_payload(self.id)
    }

    /// The distance of this node from the root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The axis that the children of this node are split over.
    #[inline]
    pub fn axis(&self) -> usize {
        self.depth % self.tree.dimension
    }

    /// The coordinate of this node on its split axis.
    pub fn split_value(&self) -> N {
        self.coords()[self.axis()]
    }

    /// The child holding points strictly less than this node on its split axis.
    pub fn left_child(&self) -> Option<Node<'a, N, P>> {
        self.tree.nodes[self.id as usize]
            .left
            .map(|id| self.child(id))
    }

    /// The child holding points greater than or equal to this node on its split axis.
    pub fn right_child(&self) -> Option<Node<'a, N, P>> {
        self.tree.nodes[self.id as usize]
            .right
            .map(|id| self.child(id))
    }

    /// Returns `true` if this is a leaf node without children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        let node = self.tree.nodes[self.id as usize];
        node.left.is_none() && node.right.is_none()
    }

    /// Returns `true` if this is an intermediate node with children.
    #[inline]
    pub fn is_parent(&self) -> bool {
        !self.is_leaf()
    }

    fn child(&self, id: u32) -> Node<'a, N, P> {
        Node {
            tree: self.tree,
            id,
            depth: self.depth + 1,
        }
    }
}

impl<N: IndexableNum, P> Clone for Node<'_, N, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N: IndexableNum, P> Copy for Node<'_, N, P> {}

impl<N: IndexableNum, P> KDTree<N, P> {
    /// Access the root node of the KDTree for manual traversal.
    pub fn root(&self) -> Option<Node<'_, N, P>> {
        Node::from_root(self)
    }

    /// The number of levels in the tree. An empty tree has height 0.
    pub fn height(&self) -> usize {
        let mut stack: TinyVec<[(u32, usize); 32]> = TinyVec::new();
        if let Some(root) = self.root {
            stack.push((root, 1));
        }

        let mut height = 0;
        while let Some((id, level)) = stack.pop() {
            height = height.max(level);
            let node = self.nodes[id as usize];
            stack.extend(node.left.map(|child| (child, level + 1)));
            stack.extend(node.right.map(|child| (child, level + 1)));
        }
        height
    }
}
