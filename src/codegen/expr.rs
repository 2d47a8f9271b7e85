//! Expresiones, asignaciones y llamadas.
//!
//! Cada expresión se reduce a un operando textual. Solo las llamadas
//! y asignaciones emiten instrucciones; el resto se compone como texto.

use std::fmt::{self, Write as _};

use super::{CodegenError, Context};
use crate::{
    arch::amd64::{self, Reg},
    ast::{NodeId, NodeKind},
};

/// Operadores de asignación.
pub(super) fn is_assignment(operator: &str) -> bool {
    matches!(
        operator,
        "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" | "<<=" | ">>="
    )
}

/// Instrucción equivalente a un operador de asignación.
///
/// No hay instrucción de dos operandos para `/=` ni `%=`.
fn mnemonic(operator: &str) -> Option<&'static str> {
    let mnemonic = match operator {
        "=" => "mov",
        "+=" => "add",
        "-=" => "sub",
        "*=" => "imul",
        "&=" => "and",
        "|=" => "or",
        "^=" => "xor",
        "<<=" => "shl",
        ">>=" => "shr",
        _ => return None,
    };

    Some(mnemonic)
}

fn is_numeric(literal: &str) -> bool {
    !literal.is_empty() && literal.bytes().all(|byte| byte.is_ascii_digit())
}

impl Context<'_> {
    pub(super) fn expression(&mut self, id: NodeId) -> Result<String, fmt::Error> {
        let ast = self.ast;
        let node = ast.node(id);

        match node.kind() {
            NodeKind::Literal => self.literal(node.value()),
            NodeKind::Identifier => Ok(self.resolve(node.name())),
            NodeKind::CallExpr => self.call(id),

            NodeKind::BinaryExpr if is_assignment(node.name()) => self.assignment(id),

            NodeKind::BinaryExpr => match node.children() {
                &[lhs, rhs] => {
                    let lhs = self.expression(lhs)?;
                    let rhs = self.expression(rhs)?;

                    Ok(format!("{} {} {}", lhs, node.name(), rhs))
                }

                _ => Ok(String::new()),
            },

            NodeKind::UnaryExpr => match node.children().first() {
                Some(&operand) => {
                    let operand = self.expression(operand)?;
                    Ok(format!("{}{}", node.name(), operand))
                }

                None => Ok(String::new()),
            },

            _ => Ok(String::new()),
        }
    }

    /// Los literales numéricos se usan tal cual; todo lo demás se
    /// almacena en `.rodata` y se sustituye por su etiqueta.
    pub(super) fn literal(&mut self, literal: &str) -> Result<String, fmt::Error> {
        if is_numeric(literal) {
            return Ok(literal.to_owned());
        }

        let label = format!("str_{}", self.literals);
        self.literals += 1;

        writeln!(self.sections.rodata, "{}:\n\t:asciz {:?}", label, literal)?;
        Ok(label)
    }

    /// Locales, luego parámetros, luego el nombre mismo (globales y
    /// símbolos externos).
    fn resolve(&self, name: &str) -> String {
        self.frame
            .as_ref()
            .and_then(|frame| frame.resolve(name))
            .map(|variable| variable.operand())
            .unwrap_or_else(|| name.to_owned())
    }

    pub(super) fn assignment(&mut self, id: NodeId) -> Result<String, fmt::Error> {
        let ast = self.ast;
        let node = ast.node(id);

        let (target, value) = match node.children() {
            &[target, value] => (target, value),
            _ => return Ok(String::new()),
        };

        let value = self.expression(value)?;
        let target = self.expression(target)?;
        if value.is_empty() || target.is_empty() {
            return Ok(target);
        }

        match mnemonic(node.name()) {
            Some(mnemonic) => emit!(self, mnemonic, "{}, {}", target, value)?,
            None => {
                let operator = node.name();
                writeln!(self.output(), "\t{} {} {}", target, operator, value)?;
            }
        }

        Ok(target)
    }

    /// Llamada conforme a la ABI. El valor resultante queda en `%rax`.
    ///
    /// Una llamada a una función no declarada no emite nada y produce
    /// un operando vacío.
    pub(super) fn call(&mut self, id: NodeId) -> Result<String, fmt::Error> {
        let ast = self.ast;
        let node = ast.node(id);

        if !self.symbols.contains_key(node.name()) {
            let error = CodegenError::UndeclaredFunction(node.name().to_owned());
            self.error(error, node.position());

            return Ok(String::new());
        }

        let mut arguments = Vec::with_capacity(node.children().len());
        for &argument in node.children() {
            arguments.push(self.expression(argument)?);
        }

        let stack_args = arguments.len().saturating_sub(Reg::MAX_ARGS);
        for argument in arguments.iter().rev().take(stack_args) {
            emit!(self, "push", "{}", argument)?;
        }

        for (argument, reg) in arguments.iter().zip(Reg::argument_sequence()) {
            emit!(self, "mov", "{}, {}", reg, argument)?;
        }

        let name = node.name();
        emit!(self, "call", "${}", name)?;

        if stack_args > 0 {
            let size = stack_args as u32 * amd64::VALUE_SIZE;
            emit!(self, "add", "{}, {}", Reg::Rsp, size)?;
        }

        Ok(Reg::RETURN.to_string())
    }
}
