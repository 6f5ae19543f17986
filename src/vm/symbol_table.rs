//! Compile-time symbol resolution.
//!
//! Each scope maps names to (scope, index) slots. Indices are dense and
//! zero-based per scope, assigned in definition order. Resolving a name
//! from an enclosing function's locals captures it as a free variable.

use std::collections::HashMap;

/// Where a symbol lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    Global,
    Local,
    Builtin,
    Free,
}

/// A resolved name: its scope and slot index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

/// A lexically nested symbol table.
#[derive(Debug, Default)]
pub struct SymbolTable {
    pub outer: Option<Box<SymbolTable>>,
    store: HashMap<String, Symbol>,
    pub num_definitions: usize,
    /// Symbols captured from the enclosing scope, in capture order.
    /// Their position is the closure's free-variable index.
    pub free_symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh scope enclosed in `outer`.
    pub fn enclosed(outer: SymbolTable) -> Self {
        Self {
            outer: Some(Box::new(outer)),
            ..Self::default()
        }
    }

    /// Define a name in this scope, returning its fresh symbol.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.outer.is_none() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: self.num_definitions,
        };
        self.num_definitions += 1;
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Register a builtin at its fixed registry index.
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Resolve a name, walking outward. Globals and builtins stay
    /// directly accessible; an outer local (or free) becomes a free
    /// variable of this scope.
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.store.get(name) {
            return Some(symbol.clone());
        }
        let outer_symbol = self.outer.as_mut()?.resolve(name)?;
        match outer_symbol.scope {
            SymbolScope::Global | SymbolScope::Builtin => Some(outer_symbol),
            SymbolScope::Local | SymbolScope::Free => Some(self.define_free(outer_symbol)),
        }
    }

    fn define_free(&mut self, original: Symbol) -> Symbol {
        self.free_symbols.push(original.clone());
        let symbol = Symbol {
            name: original.name,
            scope: SymbolScope::Free,
            index: self.free_symbols.len() - 1,
        };
        self.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }

    /// Pop this scope, returning the enclosing table.
    pub fn into_outer(self) -> Option<SymbolTable> {
        self.outer.map(|boxed| *boxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_assigns_dense_indices() {
        let mut global = SymbolTable::new();
        let a = global.define("a");
        let b = global.define("b");
        assert_eq!(a.index, 0);
        assert_eq!(b.index, 1);
        assert_eq!(a.scope, SymbolScope::Global);

        let mut local = SymbolTable::enclosed(global);
        let c = local.define("c");
        let d = local.define("d");
        assert_eq!(c.index, 0);
        assert_eq!(d.index, 1);
        assert_eq!(c.scope, SymbolScope::Local);
    }

    #[test]
    fn test_resolve_global() {
        let mut global = SymbolTable::new();
        global.define("a");
        global.define("b");

        let a = global.resolve("a").expect("a resolves");
        assert_eq!(a.scope, SymbolScope::Global);
        assert_eq!(a.index, 0);
        assert!(global.resolve("missing").is_none());
    }

    #[test]
    fn test_resolve_through_nested_scopes() {
        let mut global = SymbolTable::new();
        global.define("a");
        let mut first = SymbolTable::enclosed(global);
        first.define("b");
        let mut second = SymbolTable::enclosed(first);
        second.define("c");

        // Globals stay global no matter how deep.
        let a = second.resolve("a").unwrap();
        assert_eq!(a.scope, SymbolScope::Global);

        // The enclosing function's local becomes free here.
        let b = second.resolve("b").unwrap();
        assert_eq!(b.scope, SymbolScope::Free);
        assert_eq!(b.index, 0);

        // Own locals resolve as locals.
        let c = second.resolve("c").unwrap();
        assert_eq!(c.scope, SymbolScope::Local);
    }

    #[test]
    fn test_free_capture_records_original() {
        let mut global = SymbolTable::new();
        global.define("a");
        let mut outer_fn = SymbolTable::enclosed(global);
        outer_fn.define("b");
        let mut inner_fn = SymbolTable::enclosed(outer_fn);

        let b = inner_fn.resolve("b").unwrap();
        assert_eq!(b.scope, SymbolScope::Free);
        assert_eq!(inner_fn.free_symbols.len(), 1);
        // The recorded symbol is the *outer* view of the variable.
        assert_eq!(inner_fn.free_symbols[0].scope, SymbolScope::Local);
        assert_eq!(inner_fn.free_symbols[0].index, 0);

        // Resolving again does not capture twice.
        inner_fn.resolve("b").unwrap();
        assert_eq!(inner_fn.free_symbols.len(), 1);
    }

    #[test]
    fn test_transitive_capture() {
        // A variable local to the outermost function, used two functions
        // down, is captured as free by every scope it passes through.
        let mut outermost = SymbolTable::enclosed(SymbolTable::new());
        outermost.define("x");
        let middle = SymbolTable::enclosed(outermost);
        let mut innermost = SymbolTable::enclosed(middle);

        let x = innermost.resolve("x").unwrap();
        assert_eq!(x.scope, SymbolScope::Free);
        assert_eq!(innermost.free_symbols.len(), 1);

        let mut middle = innermost.into_outer().unwrap();
        let x = middle.resolve("x").unwrap();
        assert_eq!(x.scope, SymbolScope::Free);
        assert_eq!(middle.free_symbols.len(), 1);
    }

    #[test]
    fn test_define_builtin() {
        let mut global = SymbolTable::new();
        global.define_builtin(0, "len");
        let mut local = SymbolTable::enclosed(global);

        let len = local.resolve("len").unwrap();
        assert_eq!(len.scope, SymbolScope::Builtin);
        assert_eq!(len.index, 0);
        // Builtins are never captured as free variables.
        assert!(local.free_symbols.is_empty());
    }
}
