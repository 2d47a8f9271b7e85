//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone el texto fuente
//! en unidades léxicas denominadas tokens. Los espacios en blanco y los
//! comentarios (`//` de línea y `/* */` de bloque) se descartan durante
//! esta operación. Cada token emitido está asociado a la posición de su
//! primer carácter, lo cual permite rastrear errores tanto en los mismos
//! como en constructos más elevados de fases posteriores.
//!
//! # Contenido de un token
//! A diferencia de otras fases, todo token preserva su lexema original,
//! incluso operadores y palabras clave. Las constantes literales no se
//! resuelven a valores: un entero es su secuencia de dígitos y una cadena
//! es el texto entre comillas, sin procesar secuencias de escape.
//!
//! # Reglas importantes del lenguaje
//! - Las palabras clave distinguen mayúsculas y minúsculas.
//! - Existen alias para algunas palabras clave, como `fn`, `func` y
//!   `function`.
//! - No hay literales de punto flotante: `3.14` son tres tokens.
//!
//! # Errores
//! El lexer nunca falla. Caracteres desconocidos producen
//! [`TokenKind::Unknown`] y literales o comentarios sin terminar se
//! extienden hasta el final de la entrada.

use crate::source::Position;
use std::{
    fmt::{self, Display},
    str::FromStr,
};

/// Objeto resultante del análisis léxico.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    text: String,
    position: Position,
}

impl Token {
    pub fn new<S: Into<String>>(kind: TokenKind, text: S, position: Position) -> Self {
        Token {
            kind,
            text: text.into(),
            position,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Lexema original.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Posición del primer carácter.
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn line(&self) -> u32 {
        self.position.line()
    }

    pub fn column(&self) -> u32 {
        self.position.column()
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "[{}] {} -> {}", self.position, self.text, self.kind)
    }
}

/// Clasificación de un token.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Fin de la entrada. Siempre es el último token.
    Eof,

    /// Carácter que no inicia ningún token conocido.
    Unknown,

    Identifier,
    IntegerLiteral,

    // Reservados, esta generación del lexer no los produce
    FloatLiteral,
    DoubleLiteral,
    BoolLiteral,
    NullLiteral,

    StringLiteral,
    CharLiteral,

    Keyword(Keyword),

    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `=`
    Assign,
    /// `+=`
    PlusAssign,
    /// `-=`
    MinusAssign,
    /// `*=`
    StarAssign,
    /// `/=`
    SlashAssign,
    /// `%=`
    PercentAssign,
    /// `==`
    EqualEqual,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
    /// `&`
    Amp,
    /// `&=`
    AmpAssign,
    /// `|`
    Pipe,
    /// `|=`
    PipeAssign,
    /// `^`
    Caret,
    /// `^=`
    CaretAssign,
    /// `~`
    Tilde,
    /// `<<`
    ShiftLeft,
    /// `<<=`
    ShiftLeftAssign,
    /// `>>`
    ShiftRight,
    /// `>>=`
    ShiftRightAssign,
    /// `->`
    Arrow,
    /// `?`
    Question,
    /// `.`
    Dot,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `:`
    Colon,
}

impl TokenKind {
    /// Determina si el token es alguno de los operadores de asignación.
    pub fn is_assignment(self) -> bool {
        use TokenKind::*;

        matches!(
            self,
            Assign
                | PlusAssign
                | MinusAssign
                | StarAssign
                | SlashAssign
                | PercentAssign
                | AmpAssign
                | PipeAssign
                | CaretAssign
                | ShiftLeftAssign
                | ShiftRightAssign
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;

        let string = match self {
            Eof => "end of input",
            Unknown => "unknown character",
            Identifier => "identifier",
            IntegerLiteral => "integer literal",
            FloatLiteral => "float literal",
            DoubleLiteral => "double literal",
            BoolLiteral => "bool literal",
            NullLiteral => "null literal",
            StringLiteral => "string literal",
            CharLiteral => "char literal",
            TokenKind::Keyword(keyword) => return write!(fmt, "keyword `{}`", keyword),

            operator => {
                let text = OPERATORS
                    .iter()
                    .find(|&&(_, kind)| kind == *operator)
                    .map(|&(text, _)| text)
                    .unwrap_or("?");

                return write!(fmt, "`{}`", text);
            }
        };

        fmt.write_str(string)
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    Function,
    Var,
    Let,
    Const,
    Return,
    If,
    Else,
    While,
    For,
    Break,
    Continue,
    Extern,
    Unsafe,
    Asm,
    True,
    False,
    Null,
    Switch,
    Case,
    Default,
    Enum,
    Struct,
    Class,
    Interface,
    Import,
    Module,
}

#[rustfmt::skip]
const KEYWORDS: &[(&str, Keyword)] = &[
    ("fn",        Keyword::Function),
    ("func",      Keyword::Function),
    ("function",  Keyword::Function),
    ("var",       Keyword::Var),
    ("let",       Keyword::Let),
    ("const",     Keyword::Const),
    ("return",    Keyword::Return),
    ("if",        Keyword::If),
    ("else",      Keyword::Else),
    ("while",     Keyword::While),
    ("for",       Keyword::For),
    ("break",     Keyword::Break),
    ("continue",  Keyword::Continue),
    ("extern",    Keyword::Extern),
    ("unsafe",    Keyword::Unsafe),
    ("asm",       Keyword::Asm),
    ("true",      Keyword::True),
    ("false",     Keyword::False),
    ("null",      Keyword::Null),
    ("switch",    Keyword::Switch),
    ("case",      Keyword::Case),
    ("default",   Keyword::Default),
    ("enum",      Keyword::Enum),
    ("struct",    Keyword::Struct),
    ("class",     Keyword::Class),
    ("interface", Keyword::Interface),
    ("import",    Keyword::Import),
    ("module",    Keyword::Module),
];

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        // La primera entrada de la tabla es la ortografía canónica
        let string = KEYWORDS
            .iter()
            .find(|&&(_, keyword)| keyword == *self)
            .map(|&(name, _)| name)
            .unwrap_or("?");

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Operadores y delimitadores, ordenados de mayor a menor longitud.
///
/// El orden es relevante: el primer prefijo que coincida gana, lo cual
/// resuelve `->` antes que `-` y `<<=` antes que `<<` o `<=`.
#[rustfmt::skip]
const OPERATORS: &[(&str, TokenKind)] = &[
    ("<<=", TokenKind::ShiftLeftAssign),
    (">>=", TokenKind::ShiftRightAssign),
    ("->",  TokenKind::Arrow),
    ("==",  TokenKind::EqualEqual),
    ("!=",  TokenKind::NotEqual),
    ("<=",  TokenKind::LessEqual),
    (">=",  TokenKind::GreaterEqual),
    ("+=",  TokenKind::PlusAssign),
    ("-=",  TokenKind::MinusAssign),
    ("*=",  TokenKind::StarAssign),
    ("/=",  TokenKind::SlashAssign),
    ("%=",  TokenKind::PercentAssign),
    ("&&",  TokenKind::AndAnd),
    ("||",  TokenKind::OrOr),
    ("&=",  TokenKind::AmpAssign),
    ("|=",  TokenKind::PipeAssign),
    ("^=",  TokenKind::CaretAssign),
    ("<<",  TokenKind::ShiftLeft),
    (">>",  TokenKind::ShiftRight),
    ("+",   TokenKind::Plus),
    ("-",   TokenKind::Minus),
    ("*",   TokenKind::Star),
    ("/",   TokenKind::Slash),
    ("%",   TokenKind::Percent),
    ("=",   TokenKind::Assign),
    ("<",   TokenKind::Less),
    (">",   TokenKind::Greater),
    ("!",   TokenKind::Bang),
    ("&",   TokenKind::Amp),
    ("|",   TokenKind::Pipe),
    ("^",   TokenKind::Caret),
    ("~",   TokenKind::Tilde),
    ("?",   TokenKind::Question),
    (".",   TokenKind::Dot),
    ("(",   TokenKind::LParen),
    (")",   TokenKind::RParen),
    ("{",   TokenKind::LBrace),
    ("}",   TokenKind::RBrace),
    ("[",   TokenKind::LBracket),
    ("]",   TokenKind::RBracket),
    (";",   TokenKind::Semicolon),
    (",",   TokenKind::Comma),
    (":",   TokenKind::Colon),
];

/// Escáner de tokens sobre un texto fuente completo.
pub struct Lexer {
    source: Vec<char>,
    offset: usize,
    next: Position,
    done: bool,
}

impl Lexer {
    /// Crea un lexer en estado inicial.
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            offset: 0,
            next: Position::default(),
            done: false,
        }
    }

    /// Consume la entrada completa.
    ///
    /// El resultado siempre termina con exactamente un token
    /// [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let eof = token.kind() == TokenKind::Eof;

            tokens.push(token);
            if eof {
                break tokens;
            }
        }
    }

    /// Escanea un único token.
    ///
    /// Una vez alcanzado el final de la entrada, toda llamada posterior
    /// retorna nuevamente [`TokenKind::Eof`].
    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let start = self.next;
        let c = match self.peek(0) {
            None => return Token::new(TokenKind::Eof, "", start),
            Some(c) => c,
        };

        if c.is_ascii_alphabetic() || c == '_' {
            self.word(start)
        } else if c.is_ascii_digit() {
            let text = self.take_while(|c| c.is_ascii_digit());
            Token::new(TokenKind::IntegerLiteral, text, start)
        } else if c == '"' {
            self.string(start)
        } else if c == '\'' {
            self.char_literal(start)
        } else {
            self.operator(start)
        }
    }

    /// Descarta espacios en blanco y cualquier secuencia de comentarios.
    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }

                (Some('/'), Some('/')) => {
                    while !matches!(self.peek(0), None | Some('\n')) {
                        self.bump();
                    }
                }

                // Un comentario de bloque sin terminar consume el resto de la entrada
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();

                    loop {
                        match (self.peek(0), self.peek(1)) {
                            (None, _) => break,
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }

                            _ => {
                                self.bump();
                            }
                        }
                    }
                }

                _ => break,
            }
        }
    }

    fn word(&mut self, start: Position) -> Token {
        let text = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let kind = match Keyword::from_str(&text) {
            Ok(keyword) => TokenKind::Keyword(keyword),
            Err(()) => TokenKind::Identifier,
        };

        Token::new(kind, text, start)
    }

    fn string(&mut self, start: Position) -> Token {
        self.bump();
        let text = self.take_while(|c| c != '"');

        // Comilla de cierre, si la hay
        self.bump();
        Token::new(TokenKind::StringLiteral, text, start)
    }

    fn char_literal(&mut self, start: Position) -> Token {
        self.bump();

        // No se verifica la longitud: se toma un carácter y se asume
        // que el siguiente es la comilla de cierre
        let text: String = self.bump().into_iter().collect();
        self.bump();

        Token::new(TokenKind::CharLiteral, text, start)
    }

    fn operator(&mut self, start: Position) -> Token {
        let matched = OPERATORS.iter().find(|&&(text, _)| {
            text.chars()
                .enumerate()
                .all(|(i, c)| self.peek(i) == Some(c))
        });

        match matched {
            Some(&(text, kind)) => {
                for _ in text.chars() {
                    self.bump();
                }

                Token::new(kind, text, start)
            }

            None => {
                let text: String = self.bump().into_iter().collect();
                Token::new(TokenKind::Unknown, text, start)
            }
        }
    }

    fn take_while<P>(&mut self, mut predicate: P) -> String
    where
        P: FnMut(char) -> bool,
    {
        let mut text = String::new();
        while let Some(c) = self.peek(0).filter(|&c| predicate(c)) {
            text.push(c);
            self.bump();
        }

        text
    }

    fn peek(&self, lookahead: usize) -> Option<char> {
        self.source.get(self.offset + lookahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;

        self.offset += 1;
        self.next = self.next.after(c);

        Some(c)
    }
}

impl Iterator for Lexer {
    type Item = Token;

    /// Emite tokens hasta, pero sin incluir, [`TokenKind::Eof`].
    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }

        let token = self.next_token();
        if token.kind() == TokenKind::Eof {
            self.done = true;
            None
        } else {
            Some(token)
        }
    }
}

/// Atajo para [`Lexer::tokenize()`].
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).iter().map(Token::kind).collect()
    }

    #[test]
    fn keyword_aliases() {
        use TokenKind::Keyword as K;

        assert_eq!(
            kinds("fn func function"),
            vec![
                K(Keyword::Function),
                K(Keyword::Function),
                K(Keyword::Function),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(kinds("Return"), vec![TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn longest_operator_wins() {
        use TokenKind::*;

        assert_eq!(
            kinds("-> - <<= <= < != !"),
            vec![Arrow, Minus, ShiftLeftAssign, LessEqual, Less, NotEqual, Bang, Eof]
        );
    }

    #[test]
    fn no_increment_operators() {
        use TokenKind::*;

        assert_eq!(kinds("5--3"), vec![IntegerLiteral, Minus, Minus, IntegerLiteral, Eof]);
        assert_eq!(kinds("a++"), vec![Identifier, Plus, Plus, Eof]);
    }

    #[test]
    fn unknown_character() {
        let tokens = tokenize("a @ b");
        assert_eq!(tokens[1].kind(), TokenKind::Unknown);
        assert_eq!(tokens[1].text(), "@");
        assert_eq!(tokens[2].kind(), TokenKind::Identifier);
    }

    #[test]
    fn iterator_stops_before_eof() {
        let lexer = Lexer::new("a b");
        assert_eq!(lexer.count(), 2);
    }

    #[test]
    fn eof_is_sticky() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next_token().kind(), TokenKind::Identifier);
        assert_eq!(lexer.next_token().kind(), TokenKind::Eof);
        assert_eq!(lexer.next_token().kind(), TokenKind::Eof);
    }
}
