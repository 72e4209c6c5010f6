//! Interfaces the C/C++ parser and CFG builder must satisfy. The front end
//! itself is out of scope: this module only fixes the contract the rest
//! of the crate consumes, plus a small synthetic implementation
//! (`synthetic`) used by tests so the engine, resolver, and checkers are
//! exercisable without a real C/C++ parser.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::ids::{DeclRef, FunctionId, NodeId, StmtRef};
use crate::types::SymType;

/// A diagnosable source position; the only thing the core needs back from
/// the front end about *where* a statement came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    pub file: PathBuf,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl BinOp {
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinOp::Assign
                | BinOp::AddAssign
                | BinOp::SubAssign
                | BinOp::MulAssign
                | BinOp::DivAssign
        )
    }

    pub fn is_compound_assignment(self) -> bool {
        matches!(
            self,
            BinOp::AddAssign | BinOp::SubAssign | BinOp::MulAssign | BinOp::DivAssign
        )
    }

    /// The underlying arithmetic op a compound assignment desugars to
    /// (`x += e` ⇒ `x + e`).
    pub fn underlying_arith(self) -> BinOp {
        match self {
            BinOp::AddAssign => BinOp::Add,
            BinOp::SubAssign => BinOp::Sub,
            BinOp::MulAssign => BinOp::Mul,
            BinOp::DivAssign => BinOp::Div,
            other => other,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    /// Negates a comparison operator (used by condition filtering on the
    /// false branch).
    pub fn negate_comparison(self) -> BinOp {
        match self {
            BinOp::Eq => BinOp::Ne,
            BinOp::Ne => BinOp::Eq,
            BinOp::Lt => BinOp::Ge,
            BinOp::Le => BinOp::Gt,
            BinOp::Gt => BinOp::Le,
            BinOp::Ge => BinOp::Lt,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Plus,
    Minus,
    PreInc,
    PostInc,
    PreDec,
    PostDec,
    AddrOf,
}

/// The syntactic shape of a statement/expression the symbol resolver
/// dispatches on.
#[derive(Debug, Clone)]
pub enum StmtKind {
    IntegerLiteral {
        value: i128,
        ty: SymType,
    },
    DeclRefExpr {
        decl: DeclRef,
    },
    /// An implicit lvalue-to-rvalue load, or an implicit int-to-int cast.
    ImplicitCast {
        operand: StmtRef,
        is_loading_lvalue: bool,
        src_ty: SymType,
        dst_ty: SymType,
    },
    UnaryOperator {
        op: UnOp,
        operand: StmtRef,
        ty: SymType,
    },
    BinaryOperator {
        op: BinOp,
        lhs: StmtRef,
        rhs: StmtRef,
        ty: SymType,
    },
    ConditionalOperator {
        cond: StmtRef,
        then_branch: StmtRef,
        else_branch: StmtRef,
        ty: SymType,
    },
    VarDecl {
        var: DeclRef,
        init: Option<StmtRef>,
        ty: SymType,
    },
    DeclStmt {
        decls: Vec<StmtRef>,
    },
    /// A direct call `callee(args...)`. The symbol resolver treats any
    /// call as opaque (conjures a fresh value); the debug-inspection
    /// checker recognizes `dump`/`reach` by `callee` and reports instead
    /// of producing a diagnostic through the normal analysis path.
    CallExpr {
        callee: String,
        args: Vec<StmtRef>,
        ty: SymType,
    },
    /// A statement kind not otherwise modelled; degrades to conjuring a
    /// fresh symbol.
    Opaque,
}

/// A single CFG element within a node's element list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgElement {
    Statement(StmtRef),
    Initializer,
    ScopeBegin,
    ScopeEnd,
    NewAllocator,
    LifetimeEnds,
    LoopExit,
    Constructor,
    Destructor,
    CleanupFunction,
}

#[derive(Debug, Clone, Default)]
pub struct CfgNode {
    pub elements: Vec<CfgElement>,
    pub successors: Vec<NodeId>,
    pub predecessors: Vec<NodeId>,
    /// The branch condition, present iff this node has exactly two
    /// successors.
    pub last_condition: Option<StmtRef>,
}

#[derive(Debug, Clone)]
pub struct Cfg {
    pub nodes: BTreeMap<NodeId, CfgNode>,
    pub entry: NodeId,
}

impl Cfg {
    pub fn node(&self, id: NodeId) -> &CfgNode {
        &self.nodes[&id]
    }

    /// The single predecessor of `node`, if it has exactly one — used by
    /// the branch-condition filter, which only fires when the predecessor
    /// has exactly two successors.
    pub fn unique_pred(&self, node: NodeId) -> Option<NodeId> {
        let preds = &self.node(node).predecessors;
        if preds.len() == 1 {
            Some(preds[0])
        } else {
            None
        }
    }
}

/// Front-end contract: for each function, a deterministic CFG and a way to
/// inspect the syntactic shape of its statements.
pub trait AstCfgProvider {
    fn functions(&self) -> Vec<FunctionId>;
    fn cfg(&self, function: FunctionId) -> &Cfg;
    fn stmt_kind(&self, stmt: StmtRef) -> StmtKind;
    fn function_name(&self, function: FunctionId) -> &str;
    /// Where `stmt` came from, for diagnostics.
    fn stmt_location(&self, stmt: StmtRef) -> SourceLoc;
    /// The file a function was declared in, for begin/end-function
    /// diagnostics that have no enclosing statement.
    fn function_file(&self, function: FunctionId) -> &Path;
}

/// A hand-built CFG/AST used by tests to drive the engine end to end
/// without a real C/C++ parser.
pub mod synthetic {
    use super::*;

    #[derive(Debug, Default)]
    pub struct SyntheticProgram {
        functions: Vec<(FunctionId, String, Cfg)>,
        stmts: BTreeMap<StmtRef, StmtKind>,
        next_stmt: u32,
    }

    impl SyntheticProgram {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fresh_stmt(&mut self, kind: StmtKind) -> StmtRef {
            let id = StmtRef(self.next_stmt);
            self.next_stmt += 1;
            self.stmts.insert(id, kind);
            id
        }

        pub fn add_function(&mut self, name: &str, cfg: Cfg) -> FunctionId {
            let id = FunctionId(self.functions.len() as u32);
            self.functions.push((id, name.to_string(), cfg));
            id
        }
    }

    impl AstCfgProvider for SyntheticProgram {
        fn functions(&self) -> Vec<FunctionId> {
            self.functions.iter().map(|(id, ..)| *id).collect()
        }

        fn cfg(&self, function: FunctionId) -> &Cfg {
            &self.functions[function.0 as usize].2
        }

        fn stmt_kind(&self, stmt: StmtRef) -> StmtKind {
            self.stmts
                .get(&stmt)
                .cloned()
                .unwrap_or(StmtKind::Opaque)
        }

        fn function_name(&self, function: FunctionId) -> &str {
            &self.functions[function.0 as usize].1
        }

        fn stmt_location(&self, stmt: StmtRef) -> SourceLoc {
            SourceLoc {
                file: PathBuf::from("<synthetic>"),
                offset: stmt.0 as usize,
            }
        }

        fn function_file(&self, _function: FunctionId) -> &Path {
            Path::new("<synthetic>")
        }
    }

    /// Builds up a `Cfg` node by node; nodes are numbered in the order
    /// `node()` is called, and the first node created is the entry.
    #[derive(Debug, Default)]
    pub struct CfgBuilder {
        nodes: BTreeMap<NodeId, CfgNode>,
        next: u32,
    }

    impl CfgBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn node(&mut self) -> NodeId {
            let id = NodeId(self.next);
            self.next += 1;
            self.nodes.insert(id, CfgNode::default());
            id
        }

        pub fn add_element(&mut self, node: NodeId, element: CfgElement) {
            self.nodes.get_mut(&node).unwrap().elements.push(element);
        }

        pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
            self.nodes.get_mut(&from).unwrap().successors.push(to);
            self.nodes.get_mut(&to).unwrap().predecessors.push(from);
        }

        pub fn set_condition(&mut self, node: NodeId, cond: StmtRef) {
            self.nodes.get_mut(&node).unwrap().last_condition = Some(cond);
        }

        pub fn build(self, entry: NodeId) -> Cfg {
            Cfg {
                nodes: self.nodes,
                entry,
            }
        }
    }
}
