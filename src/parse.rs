//! Análisis sintáctico.
//!
//! El parser es descendente recursivo para sentencias y utiliza
//! precedence climbing para expresiones binarias. Consume tokens
//! estrictamente de izquierda a derecha, sin retroceder.
//!
//! # Errores
//! Ningún error sintáctico detiene el análisis. Cuando falta un token
//! esperado se registra un diagnóstico y se continúa desde la misma
//! posición, sin consumir nada; una expresión primaria inválida se
//! reemplaza por un nodo [`NodeKind::Expression`] vacío. El árbol
//! resultante puede estar malformado, por lo cual el llamador decide
//! si los diagnósticos retornados deben impedir fases posteriores.

use thiserror::Error;

use crate::{
    ast::{Ast, ForClauses, Node, NodeId, NodeKind},
    lex::{Keyword, Token, TokenKind},
    source::{Located, Position},
};

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("Expected {expected}, found {found}")]
    Expected {
        expected: &'static str,
        found: TokenKind,
    },

    #[error("Unexpected {0} in expression")]
    UnexpectedToken(TokenKind),

    #[error("Abrupt end of program")]
    UnexpectedEof,
}

/// Construye un árbol a partir de un flujo de tokens.
///
/// Siempre se produce un árbol, junto a todos los diagnósticos que
/// se hayan encontrado en el camino.
pub fn parse(tokens: &[Token]) -> (Ast, Vec<Located<ParserError>>) {
    let eof_position = tokens
        .last()
        .map(Token::position)
        .unwrap_or_default();

    let mut parser = Parser {
        tokens,
        offset: 0,
        ast: Ast::new(),
        errors: Vec::new(),
        eof: Token::new(TokenKind::Eof, "", eof_position),
    };

    parser.program();
    (parser.ast, parser.errors)
}

/// Precedencia de un operador binario.
///
/// Un valor de cero indica que el token no es un operador binario.
fn precedence(kind: TokenKind) -> u8 {
    use TokenKind::*;

    match kind {
        Star | Slash => 3,
        Plus | Minus => 2,
        EqualEqual | NotEqual | Less | LessEqual | Greater | GreaterEqual => 1,
        _ => 0,
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    offset: usize,
    ast: Ast,
    errors: Vec<Located<ParserError>>,
    eof: Token,
}

impl Parser<'_> {
    fn program(&mut self) {
        while !self.at_end() {
            let statement = self.statement();

            let root = self.ast.root();
            self.ast.node_mut(root).push_child(statement);
        }
    }

    fn statement(&mut self) -> NodeId {
        match self.peek(0).kind() {
            TokenKind::Keyword(keyword) => match keyword {
                Keyword::Function => self.function(),
                Keyword::Var | Keyword::Let | Keyword::Const => self.variable(),
                Keyword::Return => self.return_statement(),
                Keyword::If => self.if_statement(),
                Keyword::While => self.while_statement(),
                Keyword::For => self.for_statement(),
                Keyword::Break => self.jump(NodeKind::BreakStmt),
                Keyword::Continue => self.jump(NodeKind::ContinueStmt),
                Keyword::Extern => self.extern_declaration(),
                _ => self.expression_statement(),
            },

            _ => self.expression_statement(),
        }
    }

    fn function(&mut self) -> NodeId {
        let keyword = self.advance();
        let mut node = Node::new(NodeKind::FunctionDecl, keyword.position());

        match self.name("function name") {
            Some(name) => node.set_name(name),
            None => return self.ast.push(node),
        }

        self.parameters(&mut node);

        if !self.expect(TokenKind::LBrace, "`{` before function body") {
            return self.ast.push(node);
        }

        for statement in self.block_items() {
            node.push_child(statement);
        }

        self.ast.push(node)
    }

    fn extern_declaration(&mut self) -> NodeId {
        let keyword = self.advance();
        let mut node = Node::new(NodeKind::ExternDecl, keyword.position());

        self.expect(TokenKind::Keyword(Keyword::Function), "`fn` after `extern`");
        match self.name("function name") {
            Some(name) => node.set_name(name),
            None => return self.ast.push(node),
        }

        self.parameters(&mut node);
        self.terminate("`;` after extern declaration");

        self.ast.push(node)
    }

    /// Lista de parámetros y anotación opcional de tipo de retorno.
    fn parameters(&mut self, node: &mut Node) {
        self.expect(TokenKind::LParen, "`(` after function name");

        if !self.check(TokenKind::RParen) {
            loop {
                let token = self.peek(0).clone();
                if token.kind() != TokenKind::Identifier {
                    self.fail_expected("parameter name");
                    break;
                }

                self.advance();
                let param = Node::new(NodeKind::Identifier, token.position()).with_name(token.text());
                let param = self.ast.push(param);
                node.push_param(param);

                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenKind::RParen, "`)` after parameters");

        if self.eat(TokenKind::Arrow) {
            if let Some(typ) = self.name("return type") {
                node.set_value(typ);
            }
        }
    }

    fn variable(&mut self) -> NodeId {
        let keyword = self.advance();
        let kind = match keyword.kind() {
            TokenKind::Keyword(Keyword::Const) => NodeKind::ConstDecl,
            _ => NodeKind::VariableDecl,
        };

        let mut node = Node::new(kind, keyword.position());
        match self.name("variable name") {
            Some(name) => node.set_name(name),
            None => return self.ast.push(node),
        }

        if self.eat(TokenKind::Assign) {
            let initializer = self.expression();
            node.push_child(initializer);
        }

        self.terminate("`;` after variable declaration");
        self.ast.push(node)
    }

    fn return_statement(&mut self) -> NodeId {
        let keyword = self.advance();
        let mut node = Node::new(NodeKind::ReturnStmt, keyword.position());

        if !matches!(
            self.peek(0).kind(),
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        ) {
            let value = self.expression();
            node.push_child(value);
        }

        self.terminate("`;` after return statement");
        self.ast.push(node)
    }

    fn if_statement(&mut self) -> NodeId {
        let keyword = self.advance();
        let mut node = Node::new(NodeKind::IfStmt, keyword.position());

        let condition = self.condition("`(` after `if`");
        node.push_child(condition);

        let then = self.body();
        node.push_child(then);

        if self.eat(TokenKind::Keyword(Keyword::Else)) {
            let otherwise = self.body();
            node.push_child(otherwise);
        }

        self.ast.push(node)
    }

    fn while_statement(&mut self) -> NodeId {
        let keyword = self.advance();
        let condition = self.condition("`(` after `while`");
        let body = self.body();

        let node = Node::new(NodeKind::WhileStmt, keyword.position())
            .with_children(vec![condition, body]);

        self.ast.push(node)
    }

    fn for_statement(&mut self) -> NodeId {
        let keyword = self.advance();
        let mut clauses = ForClauses::empty();
        let mut children = Vec::new();

        self.expect(TokenKind::LParen, "`(` after `for`");

        match self.peek(0).kind() {
            TokenKind::Semicolon => {
                self.advance();
            }

            // Las declaraciones consumen su propio `;`
            TokenKind::Keyword(Keyword::Var | Keyword::Let | Keyword::Const) => {
                clauses |= ForClauses::INIT;
                children.push(self.variable());
            }

            _ => {
                clauses |= ForClauses::INIT;
                children.push(self.assignment());
                self.terminate("`;` after `for` initializer");
            }
        }

        if self.check(TokenKind::Semicolon) {
            self.advance();
        } else {
            clauses |= ForClauses::CONDITION;
            children.push(self.expression());
            self.terminate("`;` after `for` condition");
        }

        if !self.check(TokenKind::RParen) {
            clauses |= ForClauses::STEP;
            children.push(self.assignment());
        }

        self.expect(TokenKind::RParen, "`)` after `for` clauses");
        children.push(self.body());

        let node = Node::new(NodeKind::ForStmt(clauses), keyword.position()).with_children(children);
        self.ast.push(node)
    }

    fn jump(&mut self, kind: NodeKind) -> NodeId {
        let keyword = self.advance();
        self.terminate("`;` after jump statement");

        self.ast.push(Node::new(kind, keyword.position()))
    }

    /// Condición entre paréntesis de `if` y `while`.
    fn condition(&mut self, expected: &'static str) -> NodeId {
        self.expect(TokenKind::LParen, expected);
        let condition = self.expression();
        self.expect(TokenKind::RParen, "`)` after condition");

        condition
    }

    /// Cuerpo de una estructura de control: un bloque o una sola sentencia.
    fn body(&mut self) -> NodeId {
        if !self.check(TokenKind::LBrace) {
            return self.statement();
        }

        let brace = self.advance();
        let items = self.block_items();

        let block = Node::new(NodeKind::Block, brace.position()).with_children(items);
        self.ast.push(block)
    }

    /// Sentencias hasta `}`, asumiendo que `{` ya fue consumido.
    fn block_items(&mut self) -> Vec<NodeId> {
        let mut items = Vec::new();
        loop {
            match self.peek(0).kind() {
                TokenKind::RBrace => {
                    self.advance();
                    break items;
                }

                TokenKind::Eof => {
                    self.fail(ParserError::UnexpectedEof);
                    break items;
                }

                _ => items.push(self.statement()),
            }
        }
    }

    fn expression_statement(&mut self) -> NodeId {
        let expression = self.assignment();
        self.terminate("`;` after expression");

        expression
    }

    /// Una expresión, opcionalmente como destino de una asignación.
    ///
    /// La asignación no participa de la tabla de precedencias; solo
    /// puede aparecer en posición de sentencia o en cláusulas de `for`.
    fn assignment(&mut self) -> NodeId {
        let target = self.expression();
        if !self.peek(0).kind().is_assignment() {
            return target;
        }

        let operator = self.advance();
        let value = self.assignment();

        let position = self.ast.node(target).position();
        let node = Node::new(NodeKind::BinaryExpr, position)
            .with_name(operator.text())
            .with_children(vec![target, value]);

        self.ast.push(node)
    }

    fn expression(&mut self) -> NodeId {
        self.binary(1)
    }

    fn binary(&mut self, min_precedence: u8) -> NodeId {
        let mut lhs = self.unary();

        loop {
            let precedence = precedence(self.peek(0).kind());
            if precedence == 0 || precedence < min_precedence {
                break lhs;
            }

            // Operandos de igual precedencia no se aceptan a la derecha,
            // lo cual resulta en asociatividad por la izquierda
            let operator = self.advance();
            let rhs = self.binary(precedence + 1);

            let position = self.ast.node(lhs).position();
            let node = Node::new(NodeKind::BinaryExpr, position)
                .with_name(operator.text())
                .with_children(vec![lhs, rhs]);

            lhs = self.ast.push(node);
        }
    }

    fn unary(&mut self) -> NodeId {
        match self.peek(0).kind() {
            TokenKind::Plus | TokenKind::Minus | TokenKind::Bang => {
                let operator = self.advance();
                let operand = self.unary();

                let node = Node::new(NodeKind::UnaryExpr, operator.position())
                    .with_name(operator.text())
                    .with_children(vec![operand]);

                self.ast.push(node)
            }

            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> NodeId {
        let token = self.peek(0).clone();
        let literal = |value: &str| Node::new(NodeKind::Literal, token.position()).with_value(value);

        let node = match token.kind() {
            TokenKind::Identifier => {
                self.advance();
                if self.check(TokenKind::LParen) {
                    return self.call(&token);
                }

                Node::new(NodeKind::Identifier, token.position()).with_name(token.text())
            }

            TokenKind::IntegerLiteral | TokenKind::StringLiteral | TokenKind::CharLiteral => {
                self.advance();
                literal(token.text())
            }

            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                literal("1")
            }

            TokenKind::Keyword(Keyword::False | Keyword::Null) => {
                self.advance();
                literal("0")
            }

            TokenKind::LParen => {
                self.advance();
                let inner = self.expression();
                self.expect(TokenKind::RParen, "`)` to close parenthesized expression");

                return inner;
            }

            TokenKind::Eof => {
                self.fail(ParserError::UnexpectedEof);
                Node::new(NodeKind::Expression, token.position())
            }

            kind => {
                self.fail(ParserError::UnexpectedToken(kind));
                self.advance();

                Node::new(NodeKind::Expression, token.position())
            }
        };

        self.ast.push(node)
    }

    /// Llamada a función, con el identificador ya consumido.
    fn call(&mut self, callee: &Token) -> NodeId {
        let mut node = Node::new(NodeKind::CallExpr, callee.position()).with_name(callee.text());
        self.advance();

        if !self.check(TokenKind::RParen) {
            loop {
                let argument = self.expression();
                node.push_child(argument);

                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenKind::RParen, "`)` after call arguments");
        self.expect(TokenKind::Semicolon, "`;` after call");

        self.ast.push(node)
    }

    /// Consume un identificador, o reporta su ausencia sin consumir.
    fn name(&mut self, expected: &'static str) -> Option<String> {
        if self.check(TokenKind::Identifier) {
            Some(self.advance().text().to_owned())
        } else {
            self.fail_expected(expected);
            None
        }
    }

    /// Fin de sentencia.
    ///
    /// Las llamadas consumen su propio `;`, en cuyo caso no se
    /// requiere otro.
    fn terminate(&mut self, expected: &'static str) {
        let previous = self.offset.checked_sub(1).and_then(|i| self.tokens.get(i));
        if let Some(previous) = previous {
            if previous.kind() == TokenKind::Semicolon {
                return;
            }
        }

        self.expect(TokenKind::Semicolon, expected);
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> bool {
        let found = self.eat(kind);
        if !found {
            self.fail_expected(expected);
        }

        found
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        let found = self.check(kind);
        if found {
            self.advance();
        }

        found
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek(0).kind() == kind
    }

    fn at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn peek(&self, lookahead: usize) -> &Token {
        match self.tokens.get(self.offset + lookahead) {
            Some(token) => token,
            None => &self.eof,
        }
    }

    fn advance(&mut self) -> Token {
        let token = self.peek(0).clone();
        if token.kind() != TokenKind::Eof {
            self.offset += 1;
        }

        token
    }

    fn fail_expected(&mut self, expected: &'static str) {
        let found = self.peek(0).kind();
        self.fail(ParserError::Expected { expected, found });
    }

    fn fail(&mut self, error: ParserError) {
        let position: Position = self.peek(0).position();
        self.errors.push(Located::at(error, position));
    }
}
