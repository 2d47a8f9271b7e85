//! Parámetros de AMD64 y su convención de llamada.

use std::fmt;

/// Esta es una arquitectura de 64 bits.
pub const VALUE_SIZE: u32 = 8;

/// Desplazamiento desde `%rbp` del primer argumento en stack.
///
/// Entre el frame pointer y los argumentos se encuentran el `%rbp`
/// anterior y la dirección de retorno.
pub const STACK_ARGS_BASE: i32 = 2 * VALUE_SIZE as i32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reg {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    Rsp,
    R8,
    R9,
}

impl Reg {
    /* La ABI indica que se coloquen los primeros 6 argumentos en los registros %rdi, %rsi, %rdx, %rcx,
     * %r8 y %r9. Si hay más se ponen en el stack en orden inverso.
     */
    pub const MAX_ARGS: usize = 6;

    /// Registro de valor de retorno.
    pub const RETURN: Reg = Reg::Rax;

    pub fn argument_sequence() -> impl Iterator<Item = Reg> {
        use Reg::*;

        std::iter::successors(Some(Rdi), |last| match last {
            Rdi => Some(Rsi),
            Rsi => Some(Rdx),
            Rdx => Some(Rcx),
            Rcx => Some(R8),
            R8 => Some(R9),
            _ => None,
        })
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Reg::*;

        let name = match self {
            Rax => "%rax",
            Rbx => "%rbx",
            Rcx => "%rcx",
            Rdx => "%rdx",
            Rsi => "%rsi",
            Rdi => "%rdi",
            Rbp => "%rbp",
            Rsp => "%rsp",
            R8 => "%r8",
            R9 => "%r9",
        };

        formatter.write_str(name)
    }
}

/// Operando de memoria relativo al frame pointer.
pub fn frame_address(offset: i32) -> String {
    if offset < 0 {
        format!("[{} - {}]", Reg::Rbp, -offset)
    } else {
        format!("[{} + {}]", Reg::Rbp, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_argument_registers() {
        let names: Vec<_> = Reg::argument_sequence().map(|reg| reg.to_string()).collect();
        assert_eq!(names, ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"]);
        assert_eq!(names.len(), Reg::MAX_ARGS);
    }

    #[test]
    fn frame_addresses() {
        assert_eq!(frame_address(-8), "[%rbp - 8]");
        assert_eq!(frame_address(16), "[%rbp + 16]");
    }
}
