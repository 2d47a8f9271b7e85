use aolc::{
    codegen::{self, CodegenError, Compiled},
    lex, parse,
    source::Position,
};

fn compile(source: &str) -> Compiled {
    let (ast, errors) = parse::parse(&lex::tokenize(source));
    assert!(errors.is_empty(), "{:?}", errors);

    codegen::compile(&ast).expect("formatting to a String failed")
}

/// Texto de una función, desde `.func` hasta antes de `.endfunc`.
fn function_text<'a>(assembly: &'a str, name: &str) -> &'a str {
    let start = assembly
        .find(&format!(".func {}\n", name))
        .expect("function was not emitted");

    let end = assembly[start..]
        .find(".endfunc")
        .expect("unterminated function");

    &assembly[start..start + end]
}

#[test]
fn sections_in_order() {
    let compiled = compile("fn main() { return 0; }");
    let assembly = &compiled.assembly;

    let offsets: Vec<_> = [".rodata", ".data", ".bss", ".text"]
        .iter()
        .map(|section| {
            assembly
                .find(&format!(":section {}\n", section))
                .expect("missing section")
        })
        .collect();

    assert!(offsets.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(assembly.contains(":global __aol_main__\n\n__aol_main__:\n\tmov %rax, %rsp\n\tmov %rbx, %rdi\n"));
    assert!(assembly.contains("\tcall $main\n"));
    assert!(assembly.contains("__aol_banner__:\n\t:asciz \"AOL\\n\"\n"));
}

#[test]
fn register_arguments_only() {
    let compiled = compile("fn f(a, b, c) { return a; } fn main() { f(1, 2, 3); }");

    assert_eq!(
        function_text(&compiled.assembly, "main"),
        ".func main\n\
         \tpush %rbp\n\
         \tmov %rbp, %rsp\n\
         \tmov %rdi, 1\n\
         \tmov %rsi, 2\n\
         \tmov %rdx, 3\n\
         \tcall $f\n\
         \tmov %rsp, %rbp\n\
         \tpop %rbp\n\
         \tret\n"
    );
}

#[test]
fn stack_arguments_pushed_in_reverse() {
    let compiled = compile(
        "fn g(a, b, c, d, e, f, h, i) { return i; }\n\
         fn main() { g(1, 2, 3, 4, 5, 6, 7, 8); }",
    );

    assert_eq!(
        function_text(&compiled.assembly, "main"),
        ".func main\n\
         \tpush %rbp\n\
         \tmov %rbp, %rsp\n\
         \tpush 8\n\
         \tpush 7\n\
         \tmov %rdi, 1\n\
         \tmov %rsi, 2\n\
         \tmov %rdx, 3\n\
         \tmov %rcx, 4\n\
         \tmov %r8, 5\n\
         \tmov %r9, 6\n\
         \tcall $g\n\
         \tadd %rsp, 16\n\
         \tmov %rsp, %rbp\n\
         \tpop %rbp\n\
         \tret\n"
    );

    // El octavo argumento está sobre el séptimo
    let callee = function_text(&compiled.assembly, "g");
    assert!(callee.contains("\tmov %rax, [%rbp + 24]\n"));
    assert_eq!(compiled.function("g").map(|g| g.stack_size), Some(48));
}

#[test]
fn frame_layout() {
    let compiled = compile("fn f(a, b) { var x = 1; var y = 2; return x; }");
    let text = function_text(&compiled.assembly, "f");

    assert!(text.starts_with(
        ".func f\n\
         \tpush %rbp\n\
         \tmov %rbp, %rsp\n\
         \tsub %rsp, 32\n\
         \tmov [%rbp - 8], %rdi\n\
         \tmov [%rbp - 16], %rsi\n\
         \tmov [%rbp - 24], 1\n\
         \tmov [%rbp - 32], 2\n\
         \tmov %rax, [%rbp - 24]\n\
         \tmov %rsp, %rbp\n\
         \tpop %rbp\n\
         \tret\n"
    ));

    let symbol = compiled.function("f").expect("f is declared");
    let offsets: Vec<_> = symbol
        .locals
        .iter()
        .map(|local| (local.name.as_str(), local.offset))
        .collect();

    assert_eq!(offsets, [("a", -8), ("b", -16), ("x", -24), ("y", -32)]);
    assert_eq!(symbol.stack_size, 32);
    assert_eq!(symbol.params.len(), 2);
}

#[test]
fn literals_are_not_deduplicated() {
    let compiled = compile(
        "extern fn puts(s);\n\
         fn a() { puts(\"x\"); }\n\
         fn b() { puts(\"x\"); }",
    );

    let assembly = &compiled.assembly;
    assert!(assembly.contains("str_0:\n\t:asciz \"x\"\n"));
    assert!(assembly.contains("str_1:\n\t:asciz \"x\"\n"));
    assert!(!assembly.contains("str_2"));

    assert!(function_text(assembly, "a").contains("\tmov %rdi, str_0\n"));
    assert!(function_text(assembly, "b").contains("\tmov %rdi, str_1\n"));
}

#[test]
fn undeclared_call_is_skipped() {
    let compiled = compile("fn main() { var x = 1; nope(x); x = 2; }");

    assert_eq!(compiled.errors.len(), 1);
    assert_eq!(
        compiled.errors[0].val(),
        &CodegenError::UndeclaredFunction(String::from("nope"))
    );
    assert_eq!(compiled.errors[0].location(), Position::new(1, 24));

    let text = function_text(&compiled.assembly, "main");
    assert!(!text.contains("call"));
    assert!(text.contains("\tmov [%rbp - 8], 1\n"));
    assert!(text.contains("\tmov [%rbp - 8], 2\n"));
}

#[test]
fn recursion_is_allowed() {
    let compiled = compile("fn fact(n) { if (n < 2) { return 1; } return n * fact(n - 1); }");

    assert!(compiled.errors.is_empty(), "{:?}", compiled.errors);

    let text = function_text(&compiled.assembly, "fact");
    assert!(text.contains("\tmov %rdi, [%rbp - 8] - 1\n\tcall $fact\n"));
    assert!(text.contains("\tmov %rax, [%rbp - 8] * %rax\n"));
}

#[test]
fn sibling_ifs_get_distinct_labels() {
    let compiled = compile("fn main() { if (1) { } if (2) { } else { } }");
    let assembly = &compiled.assembly;

    for label in &["__aol_if__0:", "__aol_if__1:", "__aol_endif__0:", "__aol_endif__1:"] {
        assert_eq!(assembly.matches(label).count(), 1, "{}", label);
    }

    assert!(assembly.contains("\tcmp 1, 0\n\tje __aol_else__0\n"));
    assert!(assembly.contains("\tcmp 2, 0\n\tje __aol_else__1\n"));
    assert!(assembly.contains("\tjmp __aol_endif__1\n"));
    assert!(!assembly.contains("\tjmp __aol_endif__0\n"));
}

#[test]
fn while_break_and_continue() {
    let compiled = compile(
        "fn main() {\n\
             var i = 0;\n\
             while (i < 10) {\n\
                 if (i == 5) { break; }\n\
                 i += 1;\n\
                 continue;\n\
             }\n\
         }",
    );

    let text = function_text(&compiled.assembly, "main");
    assert!(text.contains("__aol_while__0:\n\tcmp [%rbp - 8] < 10, 0\n\tje __aol_while_end__0\n"));
    assert!(text.contains("\tjmp __aol_while_end__0\n"));
    assert!(text.contains("\tadd [%rbp - 8], 1\n"));

    // `continue` y el salto de regreso al final del ciclo
    assert_eq!(text.matches("\tjmp __aol_while__0\n").count(), 2);
    assert!(compiled.errors.is_empty());
}

#[test]
fn for_continue_reaches_step() {
    let compiled = compile("fn main() { for (var i = 0; i < 3; i += 1) { continue; } }");
    let text = function_text(&compiled.assembly, "main");

    assert!(text.contains(
        "\tmov [%rbp - 8], 0\n\
         __aol_for__0:\n\
         \tcmp [%rbp - 8] < 3, 0\n\
         \tje __aol_for_end__0\n\
         \tjmp __aol_for_step__0\n\
         __aol_for_step__0:\n\
         \tadd [%rbp - 8], 1\n\
         \tjmp __aol_for__0\n\
         __aol_for_end__0:\n"
    ));
}

#[test]
fn break_targets_innermost_loop() {
    let compiled = compile("fn main() { while (1) { for (;;) { break; } break; } }");
    let text = function_text(&compiled.assembly, "main");

    let inner = text.find("\tjmp __aol_for_end__1\n").expect("inner break");
    let outer = text.find("\tjmp __aol_while_end__0\n").expect("outer break");
    assert!(inner < outer);
}

#[test]
fn break_outside_loop() {
    let compiled = compile("fn main() { break; continue; }");

    assert_eq!(compiled.errors.len(), 2);
    assert_eq!(compiled.errors[0].val(), &CodegenError::OutsideLoop("break"));
    assert_eq!(compiled.errors[1].val(), &CodegenError::OutsideLoop("continue"));

    let text = function_text(&compiled.assembly, "main");
    assert!(text.contains("\t// break\n\t// continue\n"));
}

#[test]
fn globals_and_externs() {
    let compiled = compile(
        "extern fn puts(s);\n\
         var counter = 5;\n\
         var buffer;\n\
         fn main() { return counter; }",
    );

    let assembly = &compiled.assembly;
    assert!(assembly.contains(":section .data\n:align 8\ncounter:\n\t:quad 5\n"));
    assert!(assembly.contains(":section .bss\n:align 8\nbuffer:\n\t:zero 8\n"));
    assert!(assembly.contains(":extern puts\n"));
    assert!(function_text(assembly, "main").contains("\tmov %rax, counter\n"));

    let puts = compiled.function("puts").expect("puts is declared");
    assert!(puts.is_external());
    assert_eq!(puts.params.len(), 1);
}

#[test]
fn redefinition_replaces_symbol() {
    let compiled = compile("fn f() { } fn f(x) { return x; }");

    assert_eq!(compiled.errors.len(), 1);
    assert_eq!(
        compiled.errors[0].val(),
        &CodegenError::Redefinition(String::from("f"))
    );

    assert_eq!(compiled.functions.len(), 1);
    assert_eq!(compiled.functions[0].params.len(), 1);
}

#[test]
fn write_to_emits_assembly() {
    let compiled = compile("fn main() { }");

    let mut output = Vec::new();
    compiled.write_to(&mut output).expect("writing to a Vec failed");
    assert_eq!(output, compiled.assembly.as_bytes());
}

#[test]
fn globals_need_constant_initializers() {
    let (ast, errors) = parse::parse(&lex::tokenize(
        "fn f() { return 1; }\n\
         var g = f();\n\
         var s = \"hola\";\n\
         fn main() { return g; }",
    ));
    assert!(errors.is_empty(), "{:?}", errors);

    let compiled = codegen::compile(&ast).expect("formatting to a String failed");
    assert_eq!(compiled.errors.len(), 1);
    assert_eq!(
        compiled.errors[0].val(),
        &CodegenError::NonConstantGlobal(String::from("g"))
    );
    assert_eq!(compiled.errors[0].location(), Position::new(2, 9));

    let assembly = &compiled.assembly;
    assert!(assembly.contains("g:\n\t:zero 8\n"));
    assert!(assembly.contains("s:\n\t:quad str_0\n"));
    assert!(!assembly.contains(":quad %rax"));

    // Nada se ejecuta entre la salida del programa y las funciones
    let entry_end = assembly.find(".func").expect("functions were emitted");
    assert!(!assembly[..entry_end].contains("call $f"));
}
