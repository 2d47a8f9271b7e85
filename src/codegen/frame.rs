//! Símbolos de función y disposición de stack frames.
//!
//! Toda variable vive en memoria relativa a `%rbp`. Las locales crecen
//! hacia abajo desde el frame pointer; los argumentos a partir del
//! séptimo se encuentran hacia arriba, sobre la dirección de retorno.
//!
//! ```text
//! [%rbp + 24]   octavo argumento
//! [%rbp + 16]   séptimo argumento
//! [%rbp + 8]    dirección de retorno
//! [%rbp + 0]    %rbp anterior
//! [%rbp - 8]    primera local (o copia del primer argumento)
//! ```

use crate::{
    arch::amd64::{self, Reg},
    ast::NodeId,
};

/// Una variable local o parámetro.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableInfo {
    pub name: String,

    /// Desplazamiento en bytes relativo a `%rbp`. Es cero para
    /// parámetros que residen en registros.
    pub offset: i32,

    /// Tamaño en bytes.
    pub size: u32,

    /// Solo para parámetros recibidos en registros.
    pub register: Option<Reg>,
}

impl VariableInfo {
    /// Operando con el cual se accede a la variable.
    pub fn operand(&self) -> String {
        match self.register {
            Some(reg) => reg.to_string(),
            None => amd64::frame_address(self.offset),
        }
    }
}

/// Símbolo de una función declarada o definida.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionSymbol {
    pub name: String,
    pub params: Vec<VariableInfo>,
    pub locals: Vec<VariableInfo>,

    /// Suma de los tamaños de todas las locales asignadas.
    pub stack_size: u32,

    /// Declaración en el árbol; `None` para funciones externas.
    pub body: Option<NodeId>,
}

impl FunctionSymbol {
    pub fn new<S: Into<String>>(name: S, body: Option<NodeId>) -> Self {
        FunctionSymbol {
            name: name.into(),
            params: Vec::new(),
            locals: Vec::new(),
            stack_size: 0,
            body,
        }
    }

    pub fn is_external(&self) -> bool {
        self.body.is_none()
    }

    /// Asigna ubicaciones a los parámetros según la convención de llamada.
    ///
    /// Los primeros seis quedan en registros y se copian de inmediato a
    /// locales nuevas, de modo que dentro del cuerpo todo parámetro se
    /// lee desde el frame. Se retornan los pares registro-desplazamiento
    /// de estas copias, que deben emitirse tras el prólogo.
    pub fn bind_params<'a, I>(&mut self, names: I) -> Vec<(Reg, i32)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut registers = Reg::argument_sequence();
        let mut stack_offset = amd64::STACK_ARGS_BASE;

        for name in names {
            let (offset, register) = match registers.next() {
                Some(reg) => (0, Some(reg)),
                None => {
                    let offset = stack_offset;
                    stack_offset += amd64::VALUE_SIZE as i32;

                    (offset, None)
                }
            };

            self.params.push(VariableInfo {
                name: name.to_owned(),
                offset,
                size: amd64::VALUE_SIZE,
                register,
            });
        }

        let spilled: Vec<_> = self
            .params
            .iter()
            .filter_map(|param| param.register.map(|reg| (reg, param.name.clone())))
            .collect();

        spilled
            .into_iter()
            .map(|(reg, name)| (reg, self.allocate_local(name, amd64::VALUE_SIZE)))
            .collect()
    }

    /// Reserva espacio para una local nueva y retorna su desplazamiento.
    ///
    /// Las posiciones nunca se reutilizan.
    pub fn allocate_local<S: Into<String>>(&mut self, name: S, size: u32) -> i32 {
        self.stack_size += size;
        let offset = -(self.stack_size as i32);

        self.locals.push(VariableInfo {
            name: name.into(),
            offset,
            size,
            register: None,
        });

        offset
    }

    /// Busca una variable por nombre.
    ///
    /// Las locales ocultan a los parámetros y, entre locales, la
    /// declaración más reciente oculta a las anteriores.
    pub fn resolve(&self, name: &str) -> Option<&VariableInfo> {
        self.locals
            .iter()
            .rev()
            .find(|local| local.name == name)
            .or_else(|| self.params.iter().find(|param| param.name == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_params_are_spilled() {
        let mut symbol = FunctionSymbol::new("f", None);
        let spills = symbol.bind_params(["a", "b"]);

        assert_eq!(spills, vec![(Reg::Rdi, -8), (Reg::Rsi, -16)]);
        assert_eq!(symbol.params[0].offset, 0);
        assert_eq!(symbol.params[0].register, Some(Reg::Rdi));
        assert_eq!(symbol.stack_size, 16);

        // La copia local tiene prioridad sobre el registro
        assert_eq!(symbol.resolve("b").map(VariableInfo::operand).as_deref(), Some("[%rbp - 16]"));
    }

    #[test]
    fn stack_params_above_return_address() {
        let mut symbol = FunctionSymbol::new("f", None);
        let names = ["a", "b", "c", "d", "e", "f", "g", "h"];
        symbol.bind_params(names.iter().copied());

        let g = &symbol.params[6];
        let h = &symbol.params[7];
        assert_eq!((g.offset, g.register), (16, None));
        assert_eq!((h.offset, h.register), (24, None));
        assert_eq!(symbol.resolve("h").map(VariableInfo::operand).as_deref(), Some("[%rbp + 24]"));

        // Solo los seis parámetros en registros ocupan espacio local
        assert_eq!(symbol.stack_size, 48);
    }

    #[test]
    fn locals_are_never_reused() {
        let mut symbol = FunctionSymbol::new("f", None);
        assert_eq!(symbol.allocate_local("x", 8), -8);
        assert_eq!(symbol.allocate_local("x", 8), -16);
        assert_eq!(symbol.resolve("x").map(|x| x.offset), Some(-16));
        assert_eq!(symbol.stack_size, 16);
    }
}
