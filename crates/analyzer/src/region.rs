//! C2 (region half): the memory-region rose-tree, stack frames, and
//! location contexts, all hash-consed the same way symbolic expressions
//! are.

use knight_core::Interner;

use crate::ids::{DeclRef, FrameId, LocCtxId, NodeId, RegionId, StmtRef};
use crate::types::SymType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// A local variable's storage; root of its own subtree.
    Stack { decl: DeclRef },
    /// A heap allocation's storage; root of its own subtree.
    Heap { alloc_stmt: StmtRef },
    /// A struct/class field, nested under a `Stack`/`Heap`/another
    /// `Field`/`Element` region.
    Field { name: &'static str },
    /// An array/pointer element; `index = None` denotes a symbolic
    /// (unknown) index.
    Element { index: Option<i64> },
}

impl RegionKind {
    /// Whether this kind may be the tree root (no parent).
    fn is_root_kind(self) -> bool {
        matches!(self, RegionKind::Stack { .. } | RegionKind::Heap { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRegion {
    pub parent: Option<RegionId>,
    pub kind: RegionKind,
    pub value_type: SymType,
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct RegionKey(Option<RegionId>, RegionKind, SymType);

pub struct RegionManager<'a> {
    pool: Interner<'a, RegionKey, MemRegion>,
}

impl<'a> RegionManager<'a> {
    pub fn new(bump: &'a bumpalo::Bump) -> Self {
        Self {
            pool: Interner::new(bump),
        }
    }

    pub fn get(&self, id: RegionId) -> &'a MemRegion {
        self.pool.get(id)
    }

    /// Constructs (or looks up) a region with the given parent and kind,
    /// enforcing the `parent_kind` relation: root kinds (`Stack`/`Heap`)
    /// must have no parent, nested kinds (`Field`/`Element`) must have one.
    ///
    /// # Panics
    ///
    /// Panics if `parent.is_some() != !kind.is_root_kind()` — this is an
    /// analyzer-bug class invariant violation, not a user-facing error.
    pub fn get_region(&mut self, parent: Option<RegionId>, kind: RegionKind, value_type: SymType) -> RegionId {
        assert_eq!(
            parent.is_none(),
            kind.is_root_kind(),
            "region parent/kind nesting violated for {kind:?}"
        );
        self.pool
            .intern(RegionKey(parent, kind, value_type), || MemRegion {
                parent,
                kind,
                value_type,
            })
    }

    pub fn get_stack_region(&mut self, decl: DeclRef, value_type: SymType) -> RegionId {
        self.get_region(None, RegionKind::Stack { decl }, value_type)
    }

    pub fn get_heap_region(&mut self, alloc_stmt: StmtRef, value_type: SymType) -> RegionId {
        self.get_region(None, RegionKind::Heap { alloc_stmt }, value_type)
    }

    pub fn get_field_region(&mut self, parent: RegionId, name: &'static str, value_type: SymType) -> RegionId {
        self.get_region(Some(parent), RegionKind::Field { name }, value_type)
    }

    pub fn get_element_region(&mut self, parent: RegionId, index: Option<i64>, value_type: SymType) -> RegionId {
        self.get_region(Some(parent), RegionKind::Element { index }, value_type)
    }

    /// Walks to the root of `region`'s subtree (a `Stack` or `Heap`
    /// region).
    pub fn root_of(&self, mut region: RegionId) -> RegionId {
        while let Some(parent) = self.get(region).parent {
            region = parent;
        }
        region
    }
}

/// Identifies a function activation. `parent = None` marks the top frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackFrame {
    pub decl: DeclRef,
    pub parent: Option<FrameId>,
    /// `(callsite_expr, cfg_node, stmt_index_within_node)`, present iff
    /// `parent.is_some()`.
    pub call_site: Option<(StmtRef, NodeId, u32)>,
}

impl StackFrame {
    pub fn is_top_frame(&self) -> bool {
        self.parent.is_none()
    }
}

pub struct FrameManager<'a> {
    pool: Interner<'a, StackFrame, StackFrame>,
}

impl<'a> FrameManager<'a> {
    pub fn new(bump: &'a bumpalo::Bump) -> Self {
        Self {
            pool: Interner::new(bump),
        }
    }

    pub fn get(&self, id: FrameId) -> &'a StackFrame {
        self.pool.get(knight_core::Id::from_raw(id.0))
    }

    pub fn top_frame(&mut self, decl: DeclRef) -> FrameId {
        let frame = StackFrame {
            decl,
            parent: None,
            call_site: None,
        };
        let id = self.pool.intern(frame, || frame);
        FrameId(id.index() as u32)
    }

    pub fn call_frame(
        &mut self,
        decl: DeclRef,
        parent: FrameId,
        call_site: (StmtRef, NodeId, u32),
    ) -> FrameId {
        let frame = StackFrame {
            decl,
            parent: Some(parent),
            call_site: Some(call_site),
        };
        let id = self.pool.intern(frame, || frame);
        FrameId(id.index() as u32)
    }

    /// The transitive closure of `parent`: is `ancestor` an ancestor of
    /// `frame` (or equal to it)?
    pub fn is_ancestor_of(&self, ancestor: FrameId, mut frame: FrameId) -> bool {
        loop {
            if frame == ancestor {
                return true;
            }
            match self.get(frame).parent {
                Some(p) => frame = p,
                None => return false,
            }
        }
    }
}

/// `{ frame, block, element_index }`; `element_index = -1` marks block
/// start, `>= 0` a specific CFG element within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocationContext {
    pub frame: FrameId,
    pub block: NodeId,
    pub element_index: i32,
}

pub struct LocationManager<'a> {
    pool: Interner<'a, LocationContext, LocationContext>,
}

impl<'a> LocationManager<'a> {
    pub fn new(bump: &'a bumpalo::Bump) -> Self {
        Self {
            pool: Interner::new(bump),
        }
    }

    pub fn get(&self, id: LocCtxId) -> &'a LocationContext {
        self.pool.get(knight_core::Id::from_raw(id.0))
    }

    pub fn create_location_context(&mut self, frame: FrameId, block: NodeId, element_index: i32) -> LocCtxId {
        let ctx = LocationContext {
            frame,
            block,
            element_index,
        };
        let id = self.pool.intern(ctx, || ctx);
        LocCtxId(id.index() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_region_requires_a_parent() {
        let bump = bumpalo::Bump::new();
        let mut mgr = RegionManager::new(&bump);
        let root = mgr.get_stack_region(DeclRef(0), SymType::Pointer);
        let field = mgr.get_field_region(root, "len", SymType::INT);
        assert_eq!(mgr.get(field).parent, Some(root));
        assert_eq!(mgr.root_of(field), root);
    }

    #[test]
    #[should_panic]
    fn stack_region_with_parent_panics() {
        let bump = bumpalo::Bump::new();
        let mut mgr = RegionManager::new(&bump);
        let root = mgr.get_stack_region(DeclRef(0), SymType::INT);
        mgr.get_region(Some(root), RegionKind::Stack { decl: DeclRef(1) }, SymType::INT);
    }

    #[test]
    fn ancestor_closure_follows_call_chain() {
        let bump = bumpalo::Bump::new();
        let mut mgr = FrameManager::new(&bump);
        let top = mgr.top_frame(DeclRef(0));
        let mid = mgr.call_frame(DeclRef(1), top, (StmtRef(0), NodeId(0), 0));
        let leaf = mgr.call_frame(DeclRef(2), mid, (StmtRef(1), NodeId(1), 0));
        assert!(mgr.is_ancestor_of(top, leaf));
        assert!(mgr.is_ancestor_of(mid, leaf));
        assert!(!mgr.is_ancestor_of(leaf, top));
    }

    #[test]
    fn interning_location_contexts_is_pointer_equal() {
        let bump = bumpalo::Bump::new();
        let mut mgr = LocationManager::new(&bump);
        let a = mgr.create_location_context(FrameId(0), NodeId(0), -1);
        let b = mgr.create_location_context(FrameId(0), NodeId(0), -1);
        assert_eq!(a, b);
    }
}
