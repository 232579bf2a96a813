use std::collections::HashMap;

/// Storage class of a declared identifier.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum VarKind {
    Static,
    Field,
    Argument,
    Local,
}

impl VarKind {
    fn is_class_scope(self) -> bool {
        matches!(self, VarKind::Static | VarKind::Field)
    }

    fn counter_slot(self) -> usize {
        match self {
            VarKind::Static => 0,
            VarKind::Field => 1,
            VarKind::Argument => 2,
            VarKind::Local => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolEntry {
    pub var_type: String,
    pub kind: VarKind,
    pub index: usize,
}

/// Maps identifier names to (type, kind, index) across the two live
/// scopes. Static and field bindings live for the whole class;
/// argument and local bindings are wiped by `start_subroutine`.
/// Lookup searches the subroutine scope first, so subroutine names
/// shadow class names.
#[derive(Debug, Default)]
pub struct SymbolTable {
    class_scope: HashMap<String, SymbolEntry>,
    subroutine_scope: HashMap<String, SymbolEntry>,
    counters: [usize; 4],
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a binding and assigns it the next index for its kind.
    /// Indices are dense and start at 0 within (scope, kind).
    pub fn define(&mut self, name: &str, var_type: &str, kind: VarKind) {
        let slot = kind.counter_slot();
        let entry = SymbolEntry {
            var_type: var_type.to_string(),
            kind,
            index: self.counters[slot],
        };
        self.counters[slot] += 1;
        if kind.is_class_scope() {
            self.class_scope.insert(name.to_string(), entry);
        } else {
            self.subroutine_scope.insert(name.to_string(), entry);
        }
    }

    /// Clears the subroutine scope and its two counters. Class bindings
    /// and counters persist across subroutines.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
        self.counters[VarKind::Argument.counter_slot()] = 0;
        self.counters[VarKind::Local.counter_slot()] = 0;
    }

    pub fn kind_count(&self, kind: VarKind) -> usize {
        self.counters[kind.counter_slot()]
    }

    pub fn resolve(&self, name: &str) -> Option<&SymbolEntry> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    pub fn kind_of(&self, name: &str) -> Option<VarKind> {
        self.resolve(name).map(|entry| entry.kind)
    }

    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.resolve(name).map(|entry| entry.var_type.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.resolve(name).map(|entry| entry.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_dense_per_kind() {
        let mut table = SymbolTable::new();
        table.define("a", "int", VarKind::Local);
        table.define("b", "boolean", VarKind::Local);
        table.define("c", "int", VarKind::Argument);
        table.define("d", "int", VarKind::Local);

        assert_eq!(table.index_of("a"), Some(0));
        assert_eq!(table.index_of("b"), Some(1));
        assert_eq!(table.index_of("d"), Some(2));
        assert_eq!(table.index_of("c"), Some(0));
        assert_eq!(table.kind_count(VarKind::Local), 3);
        assert_eq!(table.kind_count(VarKind::Argument), 1);
    }

    #[test]
    fn subroutine_scope_shadows_class_scope() {
        let mut table = SymbolTable::new();
        table.define("x", "int", VarKind::Field);
        table.define("x", "Array", VarKind::Local);

        assert_eq!(table.kind_of("x"), Some(VarKind::Local));
        assert_eq!(table.type_of("x"), Some("Array"));

        table.start_subroutine();
        assert_eq!(table.kind_of("x"), Some(VarKind::Field));
    }

    #[test]
    fn start_subroutine_resets_only_subroutine_state() {
        let mut table = SymbolTable::new();
        table.define("s", "int", VarKind::Static);
        table.define("f", "int", VarKind::Field);
        table.define("a", "int", VarKind::Argument);
        table.define("v", "int", VarKind::Local);

        table.start_subroutine();

        assert_eq!(table.kind_of("a"), None);
        assert_eq!(table.kind_of("v"), None);
        assert_eq!(table.kind_count(VarKind::Argument), 0);
        assert_eq!(table.kind_count(VarKind::Local), 0);
        assert_eq!(table.kind_count(VarKind::Static), 1);
        assert_eq!(table.kind_count(VarKind::Field), 1);

        table.define("a2", "int", VarKind::Argument);
        assert_eq!(table.index_of("a2"), Some(0));
    }

    #[test]
    fn unknown_names_resolve_to_none() {
        let table = SymbolTable::new();
        assert_eq!(table.kind_of("ghost"), None);
        assert_eq!(table.type_of("ghost"), None);
        assert_eq!(table.index_of("ghost"), None);
    }
}
