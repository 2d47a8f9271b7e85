//! Generación de pseudo-ensamblador AMD64.
//!
//! Se recorre el árbol una sola vez, escribiendo texto directamente.
//! No hay representación intermedia ni asignación de registros: todo
//! valor con nombre vive en el stack frame de su función y cada
//! expresión se reduce a un operando textual.
//!
//! La salida consta de cuatro secciones en orden fijo: `.rodata`,
//! `.data`, `.bss` y `.text`. Cada una se acumula por separado y se
//! concatenan al final.

use std::{
    collections::HashMap,
    fmt::{self, Write as _},
    io,
    mem,
};

use thiserror::Error;

use crate::{
    arch::amd64::{self, Reg},
    ast::{Ast, NodeId, NodeKind},
    source::{Located, Position},
};

pub use frame::{FunctionSymbol, VariableInfo};

mod expr;
mod flow;
mod frame;

/// Símbolo del punto de entrada.
pub const ENTRY_SYMBOL: &str = "__aol_main__";

/// Etiqueta del mensaje que se imprime al arrancar.
pub const BANNER_SYMBOL: &str = "__aol_banner__";

const BANNER: &str = "AOL\n";

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("Call to undeclared function `{0}`")]
    UndeclaredFunction(String),

    #[error("Redefinition of function `{0}`")]
    Redefinition(String),

    #[error("`{0}` outside of a loop")]
    OutsideLoop(&'static str),

    #[error("Initializer of global `{0}` is not a constant")]
    NonConstantGlobal(String),
}

/// Resultado de una compilación.
#[derive(Debug)]
pub struct Compiled {
    pub assembly: String,

    /// Funciones en orden de declaración.
    pub functions: Vec<FunctionSymbol>,

    pub errors: Vec<Located<CodegenError>>,
}

impl Compiled {
    pub fn function(&self, name: &str) -> Option<&FunctionSymbol> {
        self.functions.iter().find(|function| function.name == name)
    }

    pub fn write_to<W: io::Write>(&self, mut output: W) -> io::Result<()> {
        output.write_all(self.assembly.as_bytes())?;
        output.flush()
    }
}

/// Genera código para un programa completo.
///
/// Los errores semánticos (llamadas a funciones no declaradas, `break`
/// fuera de ciclos, etc.) no detienen la generación; se acumulan en
/// [`Compiled::errors`].
pub fn compile(ast: &Ast) -> Result<Compiled, fmt::Error> {
    let mut context = Context::new(ast);
    context.program()?;
    context.finish()
}

#[derive(Default)]
struct Sections {
    rodata: String,
    data: String,
    bss: String,

    /// Funciones terminadas, en orden de finalización.
    functions: String,
}

/// Destinos de `continue` y `break` de un ciclo.
struct Loop {
    next: String,
    exit: String,
}

/// Estado de una compilación.
struct Context<'a> {
    ast: &'a Ast,
    sections: Sections,

    /// Flujo de texto actual: punto de entrada o cuerpo de una función.
    text: String,

    functions: Vec<FunctionSymbol>,
    symbols: HashMap<String, usize>,

    /// Función en construcción, si la hay.
    frame: Option<FunctionSymbol>,
    loops: Vec<Loop>,

    literals: u32,
    labels: u32,
    errors: Vec<Located<CodegenError>>,
}

impl<'a> Context<'a> {
    fn new(ast: &'a Ast) -> Self {
        Context {
            ast,
            sections: Sections::default(),
            text: String::new(),
            functions: Vec::new(),
            symbols: HashMap::new(),
            frame: None,
            loops: Vec::new(),
            literals: 0,
            labels: 0,
            errors: Vec::new(),
        }
    }

    fn output(&mut self) -> &mut String {
        &mut self.text
    }

    fn label(&mut self, label: &str) -> fmt::Result {
        writeln!(self.output(), "{}:", label)
    }

    fn error(&mut self, error: CodegenError, position: Position) {
        self.errors.push(Located::at(error, position));
    }

    fn program(&mut self) -> fmt::Result {
        writeln!(self.sections.rodata, "{}:\n\t:asciz {:?}", BANNER_SYMBOL, BANNER)?;

        writeln!(self.output(), ":global {}\n", ENTRY_SYMBOL)?;
        self.label(ENTRY_SYMBOL)?;

        // argc y argv, tal como los deja el cargador
        emit!(self, "mov", "{}, {}", Reg::Rax, Reg::Rsp)?;
        emit!(self, "mov", "{}, {}", Reg::Rbx, Reg::Rdi)?;

        emit!(self, "push", "{}", Reg::Rax)?;
        emit!(self, "push", "{}", Reg::Rbx)?;
        emit!(self, "mov", "{}, 1", Reg::Rax)?;
        emit!(self, "mov", "{}, 1", Reg::Rdi)?;
        emit!(self, "lea", "{}, [{}]", Reg::Rsi, BANNER_SYMBOL)?;
        emit!(self, "mov", "{}, {}", Reg::Rdx, BANNER.len())?;
        emit!(self, "syscall")?;
        emit!(self, "pop", "{}", Reg::Rbx)?;
        emit!(self, "pop", "{}", Reg::Rax)?;

        emit!(self, "call", "$main")?;
        emit!(self, "mov", "{}, {}", Reg::Rdi, Reg::RETURN)?;
        emit!(self, "mov", "{}, 60", Reg::Rax)?;
        emit!(self, "syscall")?;
        self.output().push('\n');

        let ast = self.ast;
        for &statement in ast.node(ast.root()).children() {
            self.statement(statement)?;
        }

        Ok(())
    }

    fn finish(self) -> Result<Compiled, fmt::Error> {
        let Context {
            sections,
            text,
            functions,
            errors,
            ..
        } = self;

        let mut assembly = String::new();
        writeln!(assembly, ":section .rodata\n:align 8\n{}", sections.rodata)?;
        writeln!(assembly, ":section .data\n:align 8\n{}", sections.data)?;
        writeln!(assembly, ":section .bss\n:align 8\n{}", sections.bss)?;
        write!(assembly, ":section .text\n:align 16\n{}{}", text, sections.functions)?;

        Ok(Compiled {
            assembly,
            functions,
            errors,
        })
    }

    fn statement(&mut self, id: NodeId) -> fmt::Result {
        let ast = self.ast;
        let node = ast.node(id);

        match node.kind() {
            NodeKind::FunctionDecl => self.function(id),
            NodeKind::ExternDecl => self.extern_declaration(id),
            NodeKind::VariableDecl | NodeKind::ConstDecl => self.variable(id),
            NodeKind::ReturnStmt => self.return_statement(id),
            NodeKind::IfStmt => self.if_statement(id),
            NodeKind::WhileStmt => self.while_statement(id),
            NodeKind::ForStmt(clauses) => self.for_statement(id, clauses),
            NodeKind::BreakStmt => self.jump(id, flow::Jump::Break),
            NodeKind::ContinueStmt => self.jump(id, flow::Jump::Continue),

            NodeKind::Program | NodeKind::Block => {
                for &child in node.children() {
                    self.statement(child)?;
                }

                Ok(())
            }

            _ => self.expression_statement(id),
        }
    }

    fn function(&mut self, id: NodeId) -> fmt::Result {
        let ast = self.ast;
        let node = ast.node(id);

        let mut symbol = FunctionSymbol::new(node.name(), Some(id));
        let spills = symbol.bind_params(node.params().iter().map(|&param| ast.node(param).name()));

        // Se declara antes del cuerpo para permitir recursión
        let index = self.declare(symbol.clone(), node.position());

        let outer_frame = self.frame.replace(symbol);
        let outer_loops = mem::take(&mut self.loops);
        let outer_text = mem::take(&mut self.text);

        for &statement in node.children() {
            self.statement(statement)?;
        }

        let body = mem::replace(&mut self.text, outer_text);
        self.loops = outer_loops;

        let symbol = match mem::replace(&mut self.frame, outer_frame) {
            Some(symbol) => symbol,
            None => return Err(fmt::Error),
        };

        let mut function = String::new();
        writeln!(function, ".func {}", symbol.name)?;
        writeln!(function, "\tpush {}", Reg::Rbp)?;
        writeln!(function, "\tmov {}, {}", Reg::Rbp, Reg::Rsp)?;

        if symbol.stack_size > 0 {
            writeln!(function, "\tsub {}, {}", Reg::Rsp, symbol.stack_size)?;
        }

        for (reg, offset) in spills {
            writeln!(function, "\tmov {}, {}", amd64::frame_address(offset), reg)?;
        }

        function.push_str(&body);
        write_epilogue(&mut function)?;
        writeln!(function, ".endfunc\n")?;

        self.sections.functions.push_str(&function);
        self.functions[index] = symbol;

        Ok(())
    }

    fn extern_declaration(&mut self, id: NodeId) -> fmt::Result {
        let ast = self.ast;
        let node = ast.node(id);

        let mut symbol = FunctionSymbol::new(node.name(), None);
        symbol.bind_params(node.params().iter().map(|&param| ast.node(param).name()));

        self.declare(symbol, node.position());
        writeln!(self.output(), ":extern {}", node.name())
    }

    /// Registra una función, reemplazando cualquier definición previa.
    fn declare(&mut self, symbol: FunctionSymbol, position: Position) -> usize {
        match self.symbols.get(&symbol.name) {
            Some(&index) => {
                self.error(CodegenError::Redefinition(symbol.name.clone()), position);
                self.functions[index] = symbol;

                index
            }

            None => {
                let index = self.functions.len();
                self.symbols.insert(symbol.name.clone(), index);
                self.functions.push(symbol);

                index
            }
        }
    }

    fn variable(&mut self, id: NodeId) -> fmt::Result {
        let ast = self.ast;
        let node = ast.node(id);

        if self.frame.is_none() {
            return self.global(id);
        }

        let value = match node.children().first() {
            Some(&initializer) => self.expression(initializer)?,
            None => String::new(),
        };

        let offset = self
            .frame
            .as_mut()
            .map(|frame| frame.allocate_local(node.name(), amd64::VALUE_SIZE))
            .ok_or(fmt::Error)?;

        let address = amd64::frame_address(offset);

        if value.is_empty() {
            writeln!(self.output(), "\t// {} uninitialized at {}", node.name(), address)
        } else {
            emit!(self, "mov", "{}, {}", address, value)
        }
    }

    /// Variable global. Su valor inicial debe ser un literal, ya que no
    /// existe código que lo calcule antes de `main`.
    fn global(&mut self, id: NodeId) -> fmt::Result {
        let ast = self.ast;
        let node = ast.node(id);

        let initializer = node.children().first().map(|&initializer| ast.node(initializer));

        match initializer {
            Some(literal) if literal.kind() == NodeKind::Literal => {
                let value = self.literal(literal.value())?;
                return writeln!(self.sections.data, "{}:\n\t:quad {}", node.name(), value);
            }

            Some(other) => {
                let error = CodegenError::NonConstantGlobal(node.name().to_owned());
                self.error(error, other.position());
            }

            None => (),
        }

        writeln!(self.sections.bss, "{}:\n\t:zero {}", node.name(), amd64::VALUE_SIZE)
    }

    fn expression_statement(&mut self, id: NodeId) -> fmt::Result {
        let ast = self.ast;
        let node = ast.node(id);

        match node.kind() {
            NodeKind::Expression => Ok(()),
            NodeKind::CallExpr => self.call(id).map(drop),
            NodeKind::BinaryExpr if expr::is_assignment(node.name()) => self.assignment(id).map(drop),

            _ => {
                let text = self.expression(id)?;
                if text.is_empty() {
                    Ok(())
                } else {
                    writeln!(self.output(), "\t{}", text)
                }
            }
        }
    }
}

fn write_epilogue(output: &mut String) -> fmt::Result {
    writeln!(output, "\tmov {}, {}", Reg::Rsp, Reg::Rbp)?;
    writeln!(output, "\tpop {}", Reg::Rbp)?;
    writeln!(output, "\tret")
}
