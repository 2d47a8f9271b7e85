//! Control de flujo.

use std::fmt::{self, Write as _};

use super::{CodegenError, Context, Loop};
use crate::{
    arch::amd64::Reg,
    ast::{ForClauses, NodeId},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum Jump {
    Break,
    Continue,
}

impl Context<'_> {
    /// Número fresco para las etiquetas de una estructura de control.
    fn next_label(&mut self) -> u32 {
        let label = self.labels;
        self.labels += 1;

        label
    }

    /// Salta a `target` si la condición es falsa.
    fn test(&mut self, condition: NodeId, target: &str) -> fmt::Result {
        let condition = self.expression(condition)?;
        if condition.is_empty() {
            return Ok(());
        }

        emit!(self, "cmp", "{}, 0", condition)?;
        emit!(self, "je", "{}", target)
    }

    pub(super) fn if_statement(&mut self, id: NodeId) -> fmt::Result {
        let ast = self.ast;
        let children = ast.node(id).children();

        let n = self.next_label();
        let start = format!("__aol_if__{}", n);
        let otherwise = format!("__aol_else__{}", n);
        let end = format!("__aol_endif__{}", n);

        self.label(&start)?;
        if let Some(&condition) = children.first() {
            self.test(condition, &otherwise)?;
        }

        if let Some(&then) = children.get(1) {
            self.statement(then)?;
        }

        let else_branch = children.get(2).copied();
        if else_branch.is_some() {
            emit!(self, "jmp", "{}", end)?;
        }

        self.label(&otherwise)?;
        if let Some(else_branch) = else_branch {
            self.statement(else_branch)?;
        }

        self.label(&end)
    }

    pub(super) fn while_statement(&mut self, id: NodeId) -> fmt::Result {
        let ast = self.ast;
        let children = ast.node(id).children();

        let n = self.next_label();
        let start = format!("__aol_while__{}", n);
        let end = format!("__aol_while_end__{}", n);

        self.label(&start)?;
        if let Some(&condition) = children.first() {
            self.test(condition, &end)?;
        }

        if let Some(&body) = children.get(1) {
            self.loop_body(body, &start, &end)?;
        }

        emit!(self, "jmp", "{}", start)?;
        self.label(&end)
    }

    pub(super) fn for_statement(&mut self, id: NodeId, clauses: ForClauses) -> fmt::Result {
        let ast = self.ast;
        let mut children = ast.node(id).children().iter().copied();

        let mut clause = |flag| {
            if clauses.contains(flag) {
                children.next()
            } else {
                None
            }
        };

        let init = clause(ForClauses::INIT);
        let condition = clause(ForClauses::CONDITION);
        let step = clause(ForClauses::STEP);
        let body = children.next();

        let n = self.next_label();
        let start = format!("__aol_for__{}", n);
        let next = format!("__aol_for_step__{}", n);
        let end = format!("__aol_for_end__{}", n);

        if let Some(init) = init {
            self.statement(init)?;
        }

        self.label(&start)?;
        if let Some(condition) = condition {
            self.test(condition, &end)?;
        }

        if let Some(body) = body {
            self.loop_body(body, &next, &end)?;
        }

        self.label(&next)?;
        if let Some(step) = step {
            self.statement(step)?;
        }

        emit!(self, "jmp", "{}", start)?;
        self.label(&end)
    }

    fn loop_body(&mut self, body: NodeId, next: &str, exit: &str) -> fmt::Result {
        self.loops.push(Loop {
            next: next.to_owned(),
            exit: exit.to_owned(),
        });

        let result = self.statement(body);
        self.loops.pop();

        result
    }

    pub(super) fn jump(&mut self, id: NodeId, jump: Jump) -> fmt::Result {
        let keyword = match jump {
            Jump::Break => "break",
            Jump::Continue => "continue",
        };

        let target = self.loops.last().map(|innermost| match jump {
            Jump::Break => innermost.exit.clone(),
            Jump::Continue => innermost.next.clone(),
        });

        match target {
            Some(target) => emit!(self, "jmp", "{}", target),
            None => {
                let position = self.ast.node(id).position();
                self.error(CodegenError::OutsideLoop(keyword), position);

                writeln!(self.output(), "\t// {}", keyword)
            }
        }
    }

    pub(super) fn return_statement(&mut self, id: NodeId) -> fmt::Result {
        let ast = self.ast;

        if let Some(&value) = ast.node(id).children().first() {
            let value = self.expression(value)?;
            if !value.is_empty() && value != Reg::RETURN.to_string() {
                emit!(self, "mov", "{}, {}", Reg::RETURN, value)?;
            }
        }

        if self.frame.is_some() {
            super::write_epilogue(self.output())
        } else {
            emit!(self, "ret")
        }
    }
}
