//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de la posición en el código fuente original
//! donde se originaron, lo cual permite determinar un punto exacto
//! o aproximado en donde ocurre un error de abstracción arbitraria.

use std::{
    fmt::{self, Debug, Display, Formatter},
    fs, io,
    path::Path,
};

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<T> {
    location: Position,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> Position {
        self.location
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Position) -> Self {
        Located { value, location }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Una posición línea-columna en un archivo.
///
/// Ambas coordenadas inician en 1.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Construye una posición arbitraria.
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }

    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    pub fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Incrementa el número de línea y retorna a la columna 1.
    pub fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }

    /// Posición que le corresponde al carácter siguiente a `c`.
    pub fn after(self, c: char) -> Position {
        match c {
            '\n' => self.newline(),
            _ => self.advance(),
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

impl Debug for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Un archivo de código fuente, leído en su totalidad.
///
/// El compilador no opera sobre flujos; el texto completo se mantiene
/// en memoria, lo cual también permite citar líneas en diagnósticos.
#[derive(Debug, Clone)]
pub struct Source {
    name: String,
    text: String,
}

impl Source {
    /// Construye a partir de un nombre de origen y su contenido.
    pub fn new<N, T>(name: N, text: T) -> Self
    where
        N: Into<String>,
        T: Into<String>,
    {
        Source {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Lee un archivo completo.
    pub fn read<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;

        Ok(Source::new(path.display().to_string(), text))
    }

    /// Nombre de origen.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contenido completo.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Invoca a `callback` con la línea indicada, o con una cadena
    /// vacía si la línea no existe.
    pub fn with_line<F, R>(&self, line: u32, callback: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let text = (line as usize)
            .checked_sub(1)
            .and_then(|index| self.text.lines().nth(index))
            .unwrap_or("");

        callback(text)
    }
}
