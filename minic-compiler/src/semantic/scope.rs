use crate::ast::{Line, Type};
use std::collections::HashMap;

/// Index of a scope record in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    /// `Int`/`Bool`/`Char`, or `Array(elem)` for arrays.
    pub ty: Type,
    /// Declared element count, arrays only.
    pub size: Option<usize>,
    pub initialized: bool,
    /// Nesting level of the declaring scope (0 = file scope).
    pub level: usize,
    pub is_global: bool,
    pub line: Line,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: Type, line: Line) -> Self {
        Self {
            name: name.into(),
            ty,
            size: None,
            initialized: false,
            level: 0,
            is_global: false,
            line,
        }
    }
}

#[derive(Debug, Clone)]
struct Scope {
    variables: HashMap<String, Variable>,
    parent: Option<ScopeId>,
    level: usize,
    /// False once the block that opened this scope has ended.
    open: bool,
}

/// Outcome of resolving a name from the current scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    Visible(&'a Variable),
    /// Declared in a block that has already closed.
    OutOfScope(&'a Variable),
    Undeclared,
}

/// Nested lexical scopes, addressed by index.
///
/// Records are never freed during one analysis; `active` holds the chain of
/// scopes that are currently open, innermost last.
#[derive(Debug, Clone)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
    active: Vec<ScopeId>,
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeArena {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                variables: HashMap::new(),
                parent: None,
                level: 0,
                open: true,
            }],
            active: vec![ScopeId::ROOT],
        }
    }

    pub fn current(&self) -> ScopeId {
        self.active.last().copied().unwrap_or(ScopeId::ROOT)
    }

    pub fn current_level(&self) -> usize {
        self.scopes[self.current().0].level
    }

    /// Open a child of the current scope and make it current.
    pub fn push(&mut self) -> ScopeId {
        let parent = self.current();
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            variables: HashMap::new(),
            parent: Some(parent),
            level: self.scopes[parent.0].level + 1,
            open: true,
        });
        self.active.push(id);
        log::trace!("enter scope {} (level {})", id.0, self.current_level());
        id
    }

    /// Close the current scope. The root scope is never closed.
    pub fn pop(&mut self) {
        if self.active.len() > 1 {
            if let Some(id) = self.active.pop() {
                self.scopes[id.0].open = false;
                log::trace!("leave scope {}", id.0);
            }
        }
    }

    /// Declare in the current scope. Fails with the existing entry if the
    /// name is already declared in this same scope.
    pub fn declare(&mut self, mut var: Variable) -> Result<(), Variable> {
        let id = self.current();
        let scope = &mut self.scopes[id.0];
        if let Some(existing) = scope.variables.get(&var.name) {
            return Err(existing.clone());
        }
        var.level = scope.level;
        scope.variables.insert(var.name.clone(), var);
        Ok(())
    }

    fn find(&self, name: &str) -> Option<ScopeId> {
        let mut cursor = Some(self.current());
        while let Some(id) = cursor {
            let scope = &self.scopes[id.0];
            if scope.variables.contains_key(name) {
                return Some(id);
            }
            cursor = scope.parent;
        }
        None
    }

    /// Lookup through the parent chain of the current scope.
    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.find(name)
            .and_then(|id| self.scopes[id.0].variables.get(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Variable> {
        let id = self.find(name)?;
        self.scopes[id.0].variables.get_mut(name)
    }

    fn descends_from(&self, id: ScopeId, ancestor: ScopeId) -> bool {
        let mut cursor = self.scopes[id.0].parent;
        while let Some(p) = cursor {
            if p == ancestor {
                return true;
            }
            cursor = self.scopes[p.0].parent;
        }
        false
    }

    /// Resolve a use of `name` at the current point.
    ///
    /// A variable is visible only while its declaring scope is on the active
    /// chain, i.e. its level is not deeper than the current level. A name that
    /// only exists in an already-closed block nested inside the current scope
    /// is reported as out of scope rather than undeclared.
    pub fn resolve(&self, name: &str) -> Resolution<'_> {
        let level = self.current_level();
        if let Some(var) = self.lookup(name) {
            if var.level <= level {
                return Resolution::Visible(var);
            }
            return Resolution::OutOfScope(var);
        }
        let current = self.current();
        self.scopes
            .iter()
            .enumerate()
            .rev()
            .filter(|(i, s)| !s.open && s.level > level && self.descends_from(ScopeId(*i), current))
            .find_map(|(_, s)| s.variables.get(name))
            .map_or(Resolution::Undeclared, Resolution::OutOfScope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(name: &str) -> Variable {
        Variable::new(name, Type::Int, 1)
    }

    #[test]
    fn levels_follow_nesting() {
        let mut scopes = ScopeArena::new();
        assert_eq!(scopes.current_level(), 0);
        scopes.push();
        scopes.push();
        assert_eq!(scopes.current_level(), 2);
        scopes.pop();
        assert_eq!(scopes.current_level(), 1);
        scopes.pop();
        scopes.pop();
        assert_eq!(scopes.current(), ScopeId::ROOT);
    }

    #[test]
    fn redeclaration_in_same_scope_is_rejected() {
        let mut scopes = ScopeArena::new();
        scopes.push();
        assert!(scopes.declare(int("a")).is_ok());
        let existing = scopes.declare(int("a")).unwrap_err();
        assert_eq!(existing.level, 1);
    }

    #[test]
    fn shadowing_in_nested_scope_is_allowed() {
        let mut scopes = ScopeArena::new();
        scopes.declare(int("a")).unwrap();
        scopes.push();
        scopes
            .declare(Variable::new("a", Type::Char, 2))
            .unwrap();
        assert_eq!(scopes.lookup("a").map(|v| v.ty), Some(Type::Char));
        scopes.pop();
        assert_eq!(scopes.lookup("a").map(|v| v.ty), Some(Type::Int));
    }

    #[test]
    fn closed_block_variables_are_out_of_scope() {
        let mut scopes = ScopeArena::new();
        scopes.push();
        scopes.push();
        scopes.declare(int("temp")).unwrap();
        assert!(matches!(scopes.resolve("temp"), Resolution::Visible(_)));
        scopes.pop();
        assert!(matches!(scopes.resolve("temp"), Resolution::OutOfScope(v) if v.level == 2));
        assert_eq!(scopes.resolve("other"), Resolution::Undeclared);
    }

    #[test]
    fn sibling_function_locals_are_undeclared() {
        let mut scopes = ScopeArena::new();
        scopes.push();
        scopes.declare(int("local_var")).unwrap();
        scopes.pop();
        scopes.push();
        // Same level as the closed sibling, so not "out of scope".
        assert_eq!(scopes.resolve("local_var"), Resolution::Undeclared);
    }

    #[test]
    fn closed_blocks_of_other_functions_are_undeclared() {
        let mut scopes = ScopeArena::new();
        scopes.push();
        scopes.push();
        scopes.declare(int("temp")).unwrap();
        scopes.pop();
        scopes.pop();
        scopes.push();
        assert_eq!(scopes.resolve("temp"), Resolution::Undeclared);
    }

    #[test]
    fn lookup_mut_updates_declaring_scope() {
        let mut scopes = ScopeArena::new();
        scopes.declare(int("g")).unwrap();
        scopes.push();
        scopes.lookup_mut("g").unwrap().initialized = true;
        scopes.pop();
        assert!(scopes.lookup("g").unwrap().initialized);
    }
}
