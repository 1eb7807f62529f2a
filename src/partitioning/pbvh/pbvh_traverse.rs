use ordered_float::OrderedFloat;
use smallvec::SmallVec;

use crate::math::Real;
use crate::partitioning::pbvh::{Pbvh, PbvhNode};
use crate::query::Ray;

const TRAVERSAL_STACK_SIZE: usize = 32;

/// Controls the execution flow of [`Pbvh::traverse`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TraversalAction {
    /// The traversal will continue on the children of the tested node.
    Continue,
    /// The traversal will skip all descendants of the tested node.
    Prune,
    /// The traversal will exit immediately.
    EarlyExit,
}

/// An iterator through the leaves of a [`Pbvh`], see [`Pbvh::leaves`].
pub struct Leaves<'a, Check: Fn(&PbvhNode) -> bool> {
    tree: &'a Pbvh,
    stack: SmallVec<[u32; TRAVERSAL_STACK_SIZE]>,
    check: Check,
}

impl<'a, Check: Fn(&PbvhNode) -> bool> Leaves<'a, Check> {
    fn new(tree: &'a Pbvh, check: Check) -> Self {
        let mut stack = SmallVec::new();
        if tree.nodes.first().is_some_and(|root| check(root)) {
            stack.push(0);
        }
        Leaves { tree, stack, check }
    }
}

impl<Check: Fn(&PbvhNode) -> bool> Iterator for Leaves<'_, Check> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;
            let node = &self.tree.nodes[id as usize];

            let Some([left, right]) = node.children() else {
                return Some(id);
            };

            // Right first so the left child is popped first.
            if (self.check)(&self.tree.nodes[right as usize]) {
                self.stack.push(right);
            }
            if (self.check)(&self.tree.nodes[left as usize]) {
                self.stack.push(left);
            }
        }
    }
}

impl Pbvh {
    /// Iterates through the leaves, in depth-first order.
    ///
    /// The `check_node` closure is called on every traversed node. If it returns `false` then the
    /// node and all its descendants won't be iterated on.
    pub fn leaves<F: Fn(&PbvhNode) -> bool>(&self, check_node: F) -> Leaves<'_, F> {
        Leaves::new(self, check_node)
    }

    /// Traverses the tree in depth-first order.
    ///
    /// `check_node` is called with the index of each visited node.
    pub fn traverse(&self, mut check_node: impl FnMut(u32, &PbvhNode) -> TraversalAction) {
        let mut stack: SmallVec<[u32; TRAVERSAL_STACK_SIZE]> = SmallVec::new();
        if !self.nodes.is_empty() {
            stack.push(0);
        }

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            match check_node(id, node) {
                TraversalAction::EarlyExit => return,
                TraversalAction::Prune => {}
                TraversalAction::Continue => {
                    if let Some([left, right]) = node.children() {
                        stack.push(right);
                        stack.push(left);
                    }
                }
            }
        }
    }

    /// The indices of the leaves reached by `filter`, sorted in increasing order.
    ///
    /// `filter` is applied to internal nodes as well: rejecting one prunes its whole subtree.
    pub fn search_nodes(&self, filter: impl Fn(&PbvhNode) -> bool) -> Vec<u32> {
        let mut result: Vec<u32> = self.leaves(filter).collect();
        result.sort_unstable();
        result
    }

    /// The indices of all the leaves, sorted in increasing order.
    pub fn all_leaf_nodes(&self) -> Vec<u32> {
        (0..self.nodes.len() as u32)
            .filter(|i| self.nodes[*i as usize].is_leaf())
            .collect()
    }

    /// Calls `hit_fn` on the leaves whose box is hit by `ray`, closest box first.
    ///
    /// `hit_fn` receives the leaf index and the running closest depth, initially `Real::MAX`, that
    /// it lowers when it finds a hit. A leaf whose box is entered beyond that depth is skipped.
    /// Fully hidden leaves are skipped.
    pub fn raycast(
        &self,
        ray: &Ray,
        use_original: bool,
        mut hit_fn: impl FnMut(u32, &mut Real),
    ) {
        let mut hits = vec![];
        self.traverse(|id, node| {
            let aabb = node.aabb_for(use_original);
            if node.is_fully_hidden() || !aabb.is_valid() {
                return TraversalAction::Prune;
            }
            match aabb.intersects_ray(ray) {
                Some(tmin) => {
                    if node.is_leaf() {
                        hits.push((OrderedFloat(tmin), id));
                    }
                    TraversalAction::Continue
                }
                None => TraversalAction::Prune,
            }
        });

        hits.sort();

        let mut depth = Real::MAX;
        for (tmin, id) in hits {
            if tmin.0 < depth {
                hit_fn(id, &mut depth);
            }
        }
    }

    /// Calls `nearest_fn` on the leaves that may hold the primitive closest to `ray`, closest
    /// box first.
    ///
    /// The ray direction must be normalized. `nearest_fn` receives the leaf index and the running
    /// best squared distance, initially `Real::MAX`, that it lowers when it finds a closer
    /// primitive. Boxes entirely behind the ray origin are pruned, and leaves whose box is
    /// already farther than the running best are skipped.
    pub fn find_nearest_to_ray(
        &self,
        ray: &Ray,
        use_original: bool,
        mut nearest_fn: impl FnMut(u32, &mut Real),
    ) {
        let mut candidates = vec![];
        self.traverse(|id, node| {
            let aabb = node.aabb_for(use_original);
            if node.is_fully_hidden() || !aabb.is_valid() || aabb.is_behind_ray(ray) {
                return TraversalAction::Prune;
            }
            if node.is_leaf() {
                let (dist_sq, _) = aabb.distance_squared_to_ray(ray);
                candidates.push((OrderedFloat(dist_sq), id));
            }
            TraversalAction::Continue
        });

        candidates.sort();

        let mut best_dist_sq = Real::MAX;
        for (dist_sq, id) in candidates {
            if dist_sq.0 < best_dist_sq {
                nearest_fn(id, &mut best_dist_sq);
            }
        }
    }
}
