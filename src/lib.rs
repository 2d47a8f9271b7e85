//! Compilador para AOL.
//!
//! # Front end
//! Cada programa deriva de un único archivo de código fuente.
//! Este archivo se somete primero a análisis léxico en [`lex`], de
//! lo cual se obtiene un flujo de tokens. El flujo de tokens se
//! dispone en un árbol sintáctico ([`ast`]) por medio de análisis
//! sintáctico en [`parse`]. Ninguna de estas fases aborta ante
//! errores: el lexer produce tokens desconocidos y el parser acumula
//! diagnósticos mientras continúa.
//!
//! # Back end
//! El árbol se recorre una única vez en [`codegen`], emitiendo
//! pseudo-ensamblador AMD64 como texto. Los parámetros propios de la
//! arquitectura, como registros y convención de llamada, se describen
//! en [`arch`]. El ensamblado y enlazado quedan fuera de este crate.

#[macro_use]
mod macros;

pub mod arch;
pub mod ast;
pub mod codegen;
pub mod error;
pub mod lex;
pub mod parse;
pub mod source;
