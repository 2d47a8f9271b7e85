use aolc::{codegen, error::Diagnostics, lex, parse, source::Source};
use std::{io::Read, rc::Rc};

fn main() -> std::io::Result<()> {
    let mut text = String::new();
    std::io::stdin().lock().read_to_string(&mut text)?;

    let source = Rc::new(Source::new("<stdin>", text));
    let tokens = lex::tokenize(source.text());
    print!("Tokens: {:#?}\n\n", tokens);

    let (ast, errors) = parse::parse(&tokens);
    print!("Ast:\n{}\n", ast.dump());

    let syntax = Diagnostics::from(errors)
        .kind("Syntax error")
        .with_source(Rc::clone(&source));

    let compiled = match codegen::compile(&ast) {
        Ok(compiled) => compiled,
        Err(_) => {
            eprint!("{}", syntax);
            return Ok(());
        }
    };

    println!("{}", compiled.assembly);
    eprint!("{}", syntax);
    eprint!("{}", Diagnostics::from(compiled.errors).with_source(source));

    Ok(())
}
