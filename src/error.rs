//! Reporte de diagnósticos.
//!
//! Ninguna fase del compilador imprime por sí misma. Cada una retorna
//! sus errores como valores [`Located`], los cuales se agrupan aquí
//! bajo una misma categoría para ser presentados al usuario.

use crate::source::{Located, Position, Source};
use std::{
    error::Error,
    fmt::{self, Display},
    rc::Rc,
};

mod sealed {
    pub trait Sealed {}
}

pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> Position;
}

pub struct Diagnostics {
    kind: &'static str,
    origin: Option<Rc<Source>>,
    errors: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }

    /// Asocia el código fuente, con lo cual se citan las líneas afectadas.
    pub fn with_source(self, origin: Rc<Source>) -> Self {
        Diagnostics {
            origin: Some(origin),
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            kind: "error",
            origin: None,
            errors: Default::default(),
        }
    }
}

impl<E: 'static + LocatedError> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
            ..Default::default()
        }
    }
}

impl<E: 'static + LocatedError> From<Vec<E>> for Diagnostics {
    fn from(errors: Vec<E>) -> Self {
        let errors = errors
            .into_iter()
            .map(|error| {
                let errors: Box<dyn LocatedError> = Box::new(error);
                errors
            })
            .collect();

        Diagnostics {
            errors,
            ..Default::default()
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics {
            kind,
            origin,
            errors,
        } = self;

        for error in errors {
            writeln!(fmt, "{}: {}", kind, error.source())?;

            let location = error.location();
            let origin = match origin {
                Some(origin) => origin,
                None => {
                    writeln!(fmt, " --> {}", location)?;
                    writeln!(fmt)?;
                    continue;
                }
            };

            writeln!(fmt, " --> {}:{}", origin.name(), location)?;

            let digits = location.line().to_string().chars().count();
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;

            origin.with_line(location.line(), |line| {
                writeln!(
                    fmt,
                    "{:>digits$} | {}",
                    location.line(),
                    line,
                    digits = digits
                )
            })?;

            let skip = location.column().saturating_sub(1) as usize;
            writeln!(
                fmt,
                "{:digits$} | {:skip$}^",
                "",
                "",
                digits = digits,
                skip = skip
            )?;

            writeln!(fmt)?;
        }

        Ok(())
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> Position {
        Located::location(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error("Something broke")]
    struct Broken;

    #[test]
    fn renders_line_and_caret() {
        let source = Rc::new(Source::new("test.aol", "fn main() {\n  oops;\n}\n"));
        let diagnostics = Diagnostics::from(vec![Located::at(Broken, Position::new(2, 3))])
            .kind("syntax error")
            .with_source(source);

        let rendered = diagnostics.to_string();
        assert!(rendered.contains("syntax error: Something broke"));
        assert!(rendered.contains(" --> test.aol:2:3"));
        assert!(rendered.contains("2 |   oops;"));
        assert!(rendered.contains("  |   ^"));
    }

    #[test]
    fn empty_renders_nothing() {
        let diagnostics = Diagnostics::default();
        assert!(diagnostics.is_empty());
        assert_eq!(diagnostics.to_string(), "");
    }
}
