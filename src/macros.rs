/// Emite una instrucción al flujo actual de un contexto de generación.
///
/// Los argumentos se evalúan mientras el flujo está prestado, por lo
/// cual no pueden volver a tomar prestado el contexto.
macro_rules! emit {
    ($context:expr, $opcode:expr) => {
        writeln!($context.output(), "\t{}", $opcode)
    };

    ($context:expr, $opcode:expr, $($format:tt)*) => {{
        write!($context.output(), "\t{} ", $opcode)?;
        writeln!($context.output(), $($format)*)
    }};
}
