//! Iterative dominator computation (Cooper–Harvey–Kennedy).
//!
//! Works on a plain adjacency view so it can be driven by the forward CFG,
//! the reversed CFG (for post-dominators), or hand-built graphs in tests.

use std::collections::HashMap;

/// Synthetic node used as the root of augmented graphs. Never a real block
/// id: real ids are bounded by the module id bound.
pub const PSEUDO: u32 = u32::MAX;

/// An owned adjacency view rooted at `root`. Every node must be reachable
/// from the root (the CFG builder guarantees this by augmenting the graph
/// with [`PSEUDO`]).
#[derive(Debug, Default)]
pub struct Graph {
    pub root: u32,
    pub succs: HashMap<u32, Vec<u32>>,
    pub preds: HashMap<u32, Vec<u32>>,
}

impl Graph {
    fn succs_of(&self, node: u32) -> &[u32] {
        self.succs.get(&node).map_or(&[], Vec::as_slice)
    }

    fn preds_of(&self, node: u32) -> &[u32] {
        self.preds.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Iterative postorder from the root.
    #[must_use]
    pub fn postorder(&self) -> Vec<u32> {
        let mut order = Vec::new();
        let mut visited = std::collections::HashSet::new();
        let mut stack = vec![(self.root, 0usize)];
        visited.insert(self.root);
        while let Some(&(node, child)) = stack.last() {
            let succs = self.succs_of(node);
            if child < succs.len() {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                let next = succs[child];
                if visited.insert(next) {
                    stack.push((next, 0));
                }
            } else {
                order.push(node);
                stack.pop();
            }
        }
        order
    }
}

/// Immediate-dominator tree. The root's immediate dominator is itself.
#[derive(Debug)]
pub struct DominatorTree {
    idom: HashMap<u32, u32>,
    root: u32,
}

impl DominatorTree {
    /// Compute dominators over `graph` by iterating to a fixpoint in
    /// reverse postorder, intersecting predecessors' dominators by walking
    /// up to the common postorder ancestor.
    #[must_use]
    pub fn compute(graph: &Graph) -> Self {
        let postorder = graph.postorder();
        let index: HashMap<u32, usize> = postorder
            .iter()
            .enumerate()
            .map(|(i, &n)| (n, i))
            .collect();

        // idom expressed in postorder indices while iterating.
        let mut idom: Vec<Option<usize>> = vec![None; postorder.len()];
        let root_index = postorder.len() - 1;
        idom[root_index] = Some(root_index);

        let intersect = |idom: &[Option<usize>], mut a: usize, mut b: usize| -> usize {
            while a != b {
                while a < b {
                    a = idom[a].expect("processed node");
                }
                while b < a {
                    b = idom[b].expect("processed node");
                }
            }
            a
        };

        let mut changed = true;
        while changed {
            changed = false;
            for node_index in (0..postorder.len() - 1).rev() {
                let node = postorder[node_index];
                let mut new_idom: Option<usize> = None;
                for &pred in graph.preds_of(node) {
                    let Some(&pred_index) = index.get(&pred) else {
                        continue;
                    };
                    if idom[pred_index].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred_index,
                        Some(current) => intersect(&idom, pred_index, current),
                    });
                }
                if new_idom.is_some() && idom[node_index] != new_idom {
                    idom[node_index] = new_idom;
                    changed = true;
                }
            }
        }

        let idom = idom
            .iter()
            .enumerate()
            .filter_map(|(i, &dom)| dom.map(|d| (postorder[i], postorder[d])))
            .collect();
        Self {
            idom,
            root: graph.root,
        }
    }

    /// Immediate dominator of `node`; the root dominates itself. `None`
    /// for nodes the computation never saw.
    #[must_use]
    pub fn idom(&self, node: u32) -> Option<u32> {
        self.idom.get(&node).copied()
    }

    /// Reflexive dominance query: does `a` dominate `b`?
    #[must_use]
    pub fn dominates(&self, a: u32, b: u32) -> bool {
        if a == b {
            return self.idom.contains_key(&a);
        }
        let mut node = b;
        loop {
            let Some(dom) = self.idom(node) else {
                return false;
            };
            if dom == a {
                return true;
            }
            if dom == node || node == self.root {
                return false;
            }
            node = dom;
        }
    }
}
