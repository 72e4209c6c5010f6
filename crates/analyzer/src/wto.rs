//! C4: Bourdoncle's Weak Topological Order construction over a function's
//! CFG. Grounded directly on `include/util/wto.hpp`'s `Wto::visit`/
//! `component` pair: a depth-first traversal that assigns each node a
//! depth-first number and, on detecting a back edge, pops the stack down
//! to the edge's target to form a cycle headed by that target.

use std::collections::HashMap;

use crate::front_end::Cfg;
use crate::ids::NodeId;

/// A single component of the partition: either a lone vertex or a cycle
/// with a designated head and nested body components.
#[derive(Debug, Clone)]
pub enum WtoComponent {
    Vertex(NodeId),
    Cycle { head: NodeId, body: Vec<WtoComponent> },
}

impl WtoComponent {
    pub fn head_or_node(&self) -> NodeId {
        match self {
            WtoComponent::Vertex(n) => *n,
            WtoComponent::Cycle { head, .. } => *head,
        }
    }

    /// Every node this component contains, including a cycle's head and
    /// all of its (possibly nested) body nodes. Used by the fixpoint
    /// engine to tell a cycle head's loop-carried predecessors (inside
    /// this set) from its predecessors from outside the loop.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        collect_nodes(self, &mut out);
        out
    }
}

/// The ordered list of enclosing cycle heads, outermost first, for some
/// node — the "nesting" used to classify a predecessor edge as
/// inside or outside a loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nesting(pub Vec<NodeId>);

impl Nesting {
    /// `self`'s nesting is "inside or equal to" `other`'s when `other` is a
    /// prefix of `self` — i.e. every loop enclosing `other` also encloses
    /// `self`. Used by the fixpoint engine to split a cycle head's
    /// predecessors into "from outside" (nesting ≤ head's) and
    /// "loop-carried" (nesting > head's, i.e. `self` nests `other` and more).
    pub fn le(&self, other: &Nesting) -> bool {
        other.0.len() <= self.0.len() && self.0[..other.0.len()] == other.0[..]
    }
}

/// A Weak Topological Order of a function's CFG, plus the nesting of every
/// reachable node.
pub struct Wto {
    pub components: Vec<WtoComponent>,
    nesting: HashMap<NodeId, Nesting>,
}

impl Wto {
    /// Builds the WTO of `cfg`, starting from its entry node. Unreachable
    /// nodes never receive a depth-first number and so are silently
    /// excluded from the partition.
    pub fn build(cfg: &Cfg) -> Self {
        let mut builder = Builder {
            cfg,
            dfn: HashMap::new(),
            stack: Vec::new(),
            num: 0,
        };
        let mut top = Vec::new();
        builder.visit(cfg.entry, &mut top);
        let mut wto = Wto {
            components: top,
            nesting: HashMap::new(),
        };
        wto.build_nesting();
        wto
    }

    pub fn nesting_of(&self, node: NodeId) -> &Nesting {
        self.nesting
            .get(&node)
            .expect("wto well-formedness: every visited node has a nesting")
    }

    fn build_nesting(&mut self) {
        let components = self.components.clone();
        let mut current = Nesting::default();
        for c in &components {
            build_nesting_rec(c, &mut current, &mut self.nesting);
        }
    }

    /// All nodes that appear in the partition, in WTO order — used by the
    /// engine's post-convergence replay pass.
    pub fn nodes_in_order(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for c in &self.components {
            collect_nodes(c, &mut out);
        }
        out
    }
}

fn build_nesting_rec(
    component: &WtoComponent,
    current: &mut Nesting,
    table: &mut HashMap<NodeId, Nesting>,
) {
    match component {
        WtoComponent::Vertex(n) => {
            table.insert(*n, current.clone());
        }
        WtoComponent::Cycle { head, body } => {
            table.insert(*head, current.clone());
            current.0.push(*head);
            for c in body {
                build_nesting_rec(c, current, table);
            }
            current.0.pop();
        }
    }
}

fn collect_nodes(component: &WtoComponent, out: &mut Vec<NodeId>) {
    match component {
        WtoComponent::Vertex(n) => out.push(*n),
        WtoComponent::Cycle { head, body } => {
            out.push(*head);
            for c in body {
                collect_nodes(c, out);
            }
        }
    }
}

/// Depth-first number; `0` means "unvisited", matching the source's use of
/// `0` as the not-yet-visited sentinel (dfns are assigned starting at 1).
type Dfn = u32;

struct Builder<'a> {
    cfg: &'a Cfg,
    dfn: HashMap<NodeId, Dfn>,
    stack: Vec<NodeId>,
    num: Dfn,
}

impl<'a> Builder<'a> {
    fn dfn_of(&self, n: NodeId) -> Dfn {
        *self.dfn.get(&n).unwrap_or(&0)
    }

    /// Mirrors `Wto::visit`: pushes `vertex`, recurses into unvisited
    /// successors in the CFG's stable (insertion) order, and on returning
    /// to its own dfn either emits a lone vertex or pops the stack into a
    /// cycle headed by `vertex`.
    fn visit(&mut self, vertex: NodeId, partition: &mut Vec<WtoComponent>) -> Dfn {
        self.stack.push(vertex);
        self.num += 1;
        let mut head = self.num;
        self.dfn.insert(vertex, head);
        let mut loop_found = false;

        for succ in self.cfg.node(vertex).successors.clone() {
            let succ_dfn = self.dfn_of(succ);
            let min = if succ_dfn == 0 {
                self.visit(succ, partition)
            } else {
                succ_dfn
            };
            if min <= head {
                head = min;
                loop_found = true;
            }
        }

        if head == self.dfn_of(vertex) {
            self.dfn.insert(vertex, Dfn::MAX);
            let mut element = self.stack.pop().expect("wto stack underflow");
            if loop_found {
                while element != vertex {
                    self.dfn.insert(element, 0);
                    element = self.stack.pop().expect("wto stack underflow");
                }
                partition.insert(0, self.component(vertex));
            } else {
                partition.insert(0, WtoComponent::Vertex(vertex));
            }
        }
        head
    }

    /// Builds the cycle rooted at `vertex`: a fresh sub-partition over its
    /// not-yet-visited successors. A self-loop (no other successor gets a
    /// fresh dfn) yields a cycle with an empty body.
    fn component(&mut self, vertex: NodeId) -> WtoComponent {
        let mut body = Vec::new();
        for succ in self.cfg.node(vertex).successors.clone() {
            if self.dfn_of(succ) == 0 {
                self.visit(succ, &mut body);
            }
        }
        WtoComponent::Cycle { head: vertex, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front_end::synthetic::CfgBuilder;

    #[test]
    fn straight_line_cfg_is_all_vertices() {
        let mut b = CfgBuilder::new();
        let n0 = b.node();
        let n1 = b.node();
        let n2 = b.node();
        b.add_edge(n0, n1);
        b.add_edge(n1, n2);
        let cfg = b.build(n0);
        let wto = Wto::build(&cfg);
        assert_eq!(wto.nodes_in_order(), vec![n0, n1, n2]);
        assert!(wto.nesting_of(n1).0.is_empty());
    }

    #[test]
    fn self_loop_is_a_single_head_cycle() {
        let mut b = CfgBuilder::new();
        let n0 = b.node();
        let n1 = b.node();
        b.add_edge(n0, n1);
        b.add_edge(n1, n1);
        let cfg = b.build(n0);
        let wto = Wto::build(&cfg);
        assert!(matches!(
            &wto.components[1],
            WtoComponent::Cycle { head, body } if *head == n1 && body.is_empty()
        ));
    }

    #[test]
    fn while_loop_nests_body_under_head() {
        // entry -> head -> body -> head (back edge); head -> exit
        let mut b = CfgBuilder::new();
        let entry = b.node();
        let head = b.node();
        let body = b.node();
        let exit = b.node();
        b.add_edge(entry, head);
        b.add_edge(head, body);
        b.add_edge(body, head);
        b.add_edge(head, exit);
        let cfg = b.build(entry);
        let wto = Wto::build(&cfg);

        assert_eq!(wto.nesting_of(entry).0, Vec::<NodeId>::new());
        assert_eq!(wto.nesting_of(head).0, Vec::<NodeId>::new());
        assert_eq!(wto.nesting_of(body).0, vec![head]);
        assert_eq!(wto.nesting_of(exit).0, Vec::<NodeId>::new());
    }

    #[test]
    fn unreachable_nodes_are_excluded() {
        let mut b = CfgBuilder::new();
        let entry = b.node();
        let reachable = b.node();
        let _unreachable = b.node();
        b.add_edge(entry, reachable);
        let cfg = b.build(entry);
        let wto = Wto::build(&cfg);
        assert_eq!(wto.nodes_in_order().len(), 2);
    }

    #[test]
    fn nesting_le_orders_by_prefix() {
        let outer = Nesting(vec![NodeId(0)]);
        let inner = Nesting(vec![NodeId(0), NodeId(1)]);
        let unrelated = Nesting(vec![NodeId(2)]);
        assert!(inner.le(&outer));
        assert!(outer.le(&outer));
        assert!(!outer.le(&inner));
        assert!(!inner.le(&unrelated));
    }
}
