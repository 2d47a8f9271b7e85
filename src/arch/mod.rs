//! Detalles específicos de la arquitectura objetivo.
//!
//! Por ahora solo existe AMD64. Este módulo expone sus parámetros
//! (tamaño de palabra, registros, convención de llamada) a la
//! generación de código.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use thiserror::Error;
use unicase::UniCase;

pub mod amd64;

/// Arquitectura de procesador (ISA).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arch {
    Amd64,
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchError {
    #[error("Unsupported architecture `{0}`, only `amd64` is available")]
    Unsupported(String),

    #[error("Architecture `{0}` has no {1}-bit mode")]
    Bits(Arch, u32),
}

impl Arch {
    /// Ancho de palabra nativo.
    pub fn bits(self) -> u32 {
        match self {
            Arch::Amd64 => amd64::VALUE_SIZE * 8,
        }
    }

    /// Verifica que el modo solicitado sea el de esta arquitectura.
    pub fn with_bits(self, bits: u32) -> Result<Self, ArchError> {
        if bits == self.bits() {
            Ok(self)
        } else {
            Err(ArchError::Bits(self, bits))
        }
    }
}

impl Display for Arch {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::Amd64 => fmt.write_str("amd64"),
        }
    }
}

impl FromStr for Arch {
    type Err = ArchError;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        const NAMES: &[(&str, Arch)] = &[("amd64", Arch::Amd64), ("x86_64", Arch::Amd64)];

        NAMES
            .iter()
            .find(|&&(name, _)| UniCase::new(name) == UniCase::new(string))
            .map(|&(_, arch)| arch)
            .ok_or_else(|| ArchError::Unsupported(string.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arch_names() {
        assert_eq!("amd64".parse::<Arch>(), Ok(Arch::Amd64));
        assert_eq!("AMD64".parse::<Arch>(), Ok(Arch::Amd64));
        assert_eq!("x86_64".parse::<Arch>(), Ok(Arch::Amd64));
        assert!(matches!("xtensa".parse::<Arch>(), Err(ArchError::Unsupported(_))));
    }

    #[test]
    fn only_native_word_size() {
        assert_eq!(Arch::Amd64.with_bits(64), Ok(Arch::Amd64));
        assert_eq!(Arch::Amd64.with_bits(32), Err(ArchError::Bits(Arch::Amd64, 32)));
    }
}
