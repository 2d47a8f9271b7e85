//! Árbol sintáctico.
//!
//! Los nodos viven en una arena ([`Ast`]) y se refieren entre sí por
//! índice ([`NodeId`]). Cada nodo tiene exactamente un padre, con
//! excepción de la raíz, que siempre es un único [`NodeKind::Program`].

use crate::source::Position;
use bitflags::bitflags;
use std::fmt::{self, Display, Write};

/// Índice de un nodo dentro de su [`Ast`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

bitflags! {
    /// Cláusulas presentes en un `for`.
    ///
    /// Una cláusula ausente no aporta hijo alguno al nodo, por lo cual
    /// esto es necesario para interpretar sus hijos.
    pub struct ForClauses: u8 {
        const INIT      = 0x01;
        const CONDITION = 0x02;
        const STEP      = 0x04;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Program,
    FunctionDecl,
    ExternDecl,
    VariableDecl,
    ConstDecl,
    ReturnStmt,
    IfStmt,
    WhileStmt,
    ForStmt(ForClauses),
    BreakStmt,
    ContinueStmt,
    Block,

    /// Sin hijos, sustituye a una expresión que no se pudo analizar.
    Expression,

    BinaryExpr,
    UnaryExpr,
    Literal,
    Identifier,
    CallExpr,
}

impl Display for NodeKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use NodeKind::*;

        let string = match self {
            Program => "program",
            FunctionDecl => "fn",
            ExternDecl => "extern",
            VariableDecl => "var",
            ConstDecl => "const",
            ReturnStmt => "return",
            IfStmt => "if",
            WhileStmt => "while",
            ForStmt(_) => "for",
            BreakStmt => "break",
            ContinueStmt => "continue",
            Block => "block",
            Expression => "error",
            BinaryExpr => "binary",
            UnaryExpr => "unary",
            Literal => "literal",
            Identifier => "id",
            CallExpr => "call",
        };

        fmt.write_str(string)
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    kind: NodeKind,
    name: String,
    value: String,
    children: Vec<NodeId>,
    params: Vec<NodeId>,
    position: Position,
}

impl Node {
    pub fn new(kind: NodeKind, position: Position) -> Self {
        Node {
            kind,
            name: String::new(),
            value: String::new(),
            children: Vec::new(),
            params: Vec::new(),
            position,
        }
    }

    pub fn with_name<S: Into<String>>(self, name: S) -> Self {
        Node {
            name: name.into(),
            ..self
        }
    }

    pub fn with_value<S: Into<String>>(self, value: S) -> Self {
        Node {
            value: value.into(),
            ..self
        }
    }

    pub fn with_children(self, children: Vec<NodeId>) -> Self {
        Node { children, ..self }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Identificador, nombre de función u operador.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Texto de un literal, o tipo de retorno de una función.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Parámetros, solo para declaraciones de funciones.
    pub fn params(&self) -> &[NodeId] {
        &self.params
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    pub fn set_value<S: Into<String>>(&mut self, value: S) {
        self.value = value.into();
    }

    pub fn push_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    pub fn push_param(&mut self, param: NodeId) {
        self.params.push(param);
    }
}

/// Arena de nodos con una raíz.
#[derive(Clone, Debug)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Ast {
    /// Crea un árbol con solo una raíz [`NodeKind::Program`] vacía.
    pub fn new() -> Self {
        Ast {
            nodes: vec![Node::new(NodeKind::Program, Position::default())],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Inserta un nodo sin padre.
    ///
    /// El llamador es responsable de enlazarlo a exactamente un padre.
    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);

        id
    }

    pub fn node(&self, NodeId(id): NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    pub fn node_mut(&mut self, NodeId(id): NodeId) -> &mut Node {
        &mut self.nodes[id as usize]
    }

    /// Cantidad total de nodos, raíz incluida.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forma compacta de un subárbol, en notación de S-expressions.
    ///
    /// Las hojas se imprimen como su texto; `2 + 3 * 4` resulta en
    /// `(+ 2 (* 3 4))` y `f(a, 1)` en `(call f a 1)`.
    pub fn sexpr(&self, id: NodeId) -> SExpr<'_> {
        SExpr(self, id)
    }

    /// Árbol completo con indentación, un nodo por línea.
    pub fn dump(&self) -> Dump<'_> {
        Dump(self)
    }

    fn write_dump(&self, fmt: &mut fmt::Formatter<'_>, id: NodeId, indent: usize) -> fmt::Result {
        let node = self.node(id);

        write!(fmt, "{}{} @ {}", "| ".repeat(indent), node.kind, node.position)?;
        if !node.name.is_empty() {
            write!(fmt, " name={}", node.name)?;
        }

        if !node.value.is_empty() {
            write!(fmt, " value={:?}", node.value)?;
        }

        fmt.write_char('\n')?;

        for &child in node.params.iter().chain(node.children.iter()) {
            self.write_dump(fmt, child, indent + 1)?;
        }

        Ok(())
    }
}

/// Ver [`Ast::sexpr()`].
pub struct SExpr<'a>(&'a Ast, NodeId);

impl Display for SExpr<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let SExpr(ast, id) = *self;
        let node = ast.node(id);

        match node.kind {
            NodeKind::Literal => return fmt.write_str(&node.value),
            NodeKind::Identifier => return fmt.write_str(&node.name),
            NodeKind::BinaryExpr | NodeKind::UnaryExpr => write!(fmt, "({}", node.name)?,
            NodeKind::CallExpr => write!(fmt, "(call {}", node.name)?,

            kind => {
                write!(fmt, "({}", kind)?;
                if !node.name.is_empty() {
                    write!(fmt, " {}", node.name)?;
                }
            }
        }

        for &child in node.params.iter().chain(node.children.iter()) {
            write!(fmt, " {}", SExpr(ast, child))?;
        }

        fmt.write_char(')')
    }
}

/// Ver [`Ast::dump()`].
pub struct Dump<'a>(&'a Ast);

impl Display for Dump<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Dump(ast) = *self;
        ast.write_dump(fmt, ast.root, 0)
    }
}

impl Default for Ast {
    fn default() -> Self {
        Ast::new()
    }
}
