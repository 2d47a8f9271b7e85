use aolc::{
    lex::{self, Keyword, Lexer, Token, TokenKind},
    source::Position,
};

#[test]
fn texts_reproduce_source_without_trivia() {
    let source = "fn add(a, b) {\n    return a + b; // suma\n}\n/* bloque */ var x = add(1, 2);\n";
    let tokens = lex::tokenize(source);

    let joined: String = tokens.iter().map(Token::text).collect();
    assert_eq!(joined, "fnadd(a,b){returna+b;}varx=add(1,2);");
    assert_eq!(tokens.last().map(Token::kind), Some(TokenKind::Eof));
}

#[test]
fn positions_are_one_based() {
    let tokens = lex::tokenize("let x;\n  x += 10;");

    let positions: Vec<_> = tokens.iter().map(Token::position).collect();
    assert_eq!(
        positions,
        vec![
            Position::new(1, 1),
            Position::new(1, 5),
            Position::new(1, 6),
            Position::new(2, 3),
            Position::new(2, 5),
            Position::new(2, 8),
            Position::new(2, 10),
            Position::new(2, 11),
        ]
    );

    assert_eq!(tokens[0].kind(), TokenKind::Keyword(Keyword::Let));
    assert_eq!(tokens[4].kind(), TokenKind::PlusAssign);
}

#[test]
fn consecutive_comments_are_skipped() {
    let tokens = lex::tokenize("// a\n// b\n/* c */ x");

    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].kind(), TokenKind::Identifier);
    assert_eq!(tokens[0].position(), Position::new(3, 9));
}

#[test]
fn literals_keep_raw_text() {
    let tokens = lex::tokenize(r#""hola\n" 'c' 0042"#);

    assert_eq!(tokens[0].kind(), TokenKind::StringLiteral);
    assert_eq!(tokens[0].text(), r"hola\n");
    assert_eq!(tokens[1].kind(), TokenKind::CharLiteral);
    assert_eq!(tokens[1].text(), "c");
    assert_eq!(tokens[2].kind(), TokenKind::IntegerLiteral);
    assert_eq!(tokens[2].text(), "0042");
}

#[test]
fn unterminated_string_runs_to_end() {
    let tokens = lex::tokenize("\"abc");

    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].kind(), TokenKind::StringLiteral);
    assert_eq!(tokens[0].text(), "abc");
}

#[test]
fn unterminated_block_comment_runs_to_end() {
    let kinds: Vec<_> = lex::tokenize("a /* x\ny").iter().map(Token::kind).collect();
    assert_eq!(kinds, vec![TokenKind::Identifier, TokenKind::Eof]);
}

#[test]
fn char_literal_takes_one_character() {
    let tokens = lex::tokenize("'ab'");

    // `b` se descarta como si fuera la comilla de cierre
    assert_eq!(tokens[0].kind(), TokenKind::CharLiteral);
    assert_eq!(tokens[0].text(), "a");
    assert!(tokens.iter().all(|token| token.text() != "b"));
    assert_eq!(tokens.last().map(Token::kind), Some(TokenKind::Eof));
}

#[test]
fn no_floating_point() {
    let kinds: Vec<_> = Lexer::new("3.14").map(|token| token.kind()).collect();
    assert_eq!(
        kinds,
        vec![TokenKind::IntegerLiteral, TokenKind::Dot, TokenKind::IntegerLiteral]
    );
}

#[test]
fn token_dump_format() {
    let tokens = lex::tokenize("\n  foo");
    assert_eq!(tokens[0].to_string(), "[2:3] foo -> identifier");
}
