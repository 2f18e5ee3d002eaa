use super::instr::{il_type, Instr};
use crate::ast::{Line, ScalarType, Type};
use crate::CompileOptions;
use std::collections::HashMap;

/// Where a named value lives at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Arg(usize, Type),
    Local(usize, Type),
    Global(Type),
}

impl Storage {
    pub fn ty(self) -> Type {
        match self {
            Storage::Arg(_, t) | Storage::Local(_, t) | Storage::Global(t) => t,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub return_type: Type,
    pub params: Vec<ScalarType>,
}

/// A lowered method body with its frame layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub return_type: Type,
    pub params: Vec<(ScalarType, String)>,
    pub entry_point: bool,
    /// Slot types and display names, indexed by slot.
    pub locals: Vec<(Type, String)>,
    pub body: Vec<Instr>,
    pub max_stack: usize,
    /// Lines of statements that left the operand stack at a different depth
    /// than they found it. Empty for well-formed output.
    pub unbalanced: Vec<Line>,
}

impl Method {
    fn new(name: &str, return_type: Type, params: Vec<(ScalarType, String)>) -> Self {
        Self {
            name: name.to_string(),
            return_type,
            params,
            entry_point: false,
            locals: Vec::new(),
            body: Vec::new(),
            max_stack: 0,
            unbalanced: Vec::new(),
        }
    }
}

pub struct Gen<'o> {
    pub options: &'o CompileOptions,
    pub signatures: HashMap<String, Signature>,
    pub globals: HashMap<String, Type>,
    pub method: Method,
    label_count: usize,
    depth: usize,
    /// Block-scoped name-to-slot maps; the first entry holds parameters.
    scopes: Vec<HashMap<String, Storage>>,
}

impl<'o> Gen<'o> {
    pub fn new(options: &'o CompileOptions) -> Self {
        Self {
            options,
            signatures: HashMap::new(),
            globals: HashMap::new(),
            method: Method::new("", Type::Void, Vec::new()),
            label_count: 0,
            depth: 0,
            scopes: Vec::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.options.assembly_name
    }

    /// Begin a new method; parameters occupy argument slots in order.
    pub fn start_method(
        &mut self,
        name: &str,
        return_type: Type,
        params: Vec<(ScalarType, String)>,
    ) {
        let args = params
            .iter()
            .enumerate()
            .map(|(i, (ty, name))| (name.clone(), Storage::Arg(i, Type::from(*ty))))
            .collect();
        self.method = Method::new(name, return_type, params);
        self.depth = 0;
        self.scopes = vec![args];
    }

    pub fn finish_method(&mut self) -> Method {
        self.scopes.clear();
        std::mem::replace(&mut self.method, Method::new("", Type::Void, Vec::new()))
    }

    pub fn new_label(&mut self) -> String {
        self.label_count += 1;
        let label = format!("IL_{:04}", self.label_count);
        log::trace!("allocated label {}", label);
        label
    }

    pub fn emit(&mut self, instr: Instr) {
        let (pops, pushes) = instr.stack_effect();
        if pops > self.depth {
            log::warn!(
                "{}: '{}' pops {} value(s) from a stack of depth {}",
                self.method.name,
                instr,
                pops,
                self.depth
            );
        }
        self.depth = self.depth.saturating_sub(pops) + pushes;
        self.method.max_stack = self.method.max_stack.max(self.depth);
        self.method.body.push(instr);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Run `f` with a nested slot scope; slots stay allocated afterwards.
    pub fn scoped<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scopes.push(HashMap::new());
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Allocate a fresh local slot and bind `name` to it in the innermost scope.
    pub fn declare_local(&mut self, name: &str, ty: Type) -> usize {
        let slot = self.method.locals.len();
        let display = if self.local_name_taken(name) {
            self.suffixed_local_name(name, slot)
        } else {
            name.to_string()
        };
        self.method.locals.push((ty, display));
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Storage::Local(slot, ty));
        }
        slot
    }

    /// Anonymous local for intermediate values.
    pub fn scratch_local(&mut self, ty: Type) -> usize {
        let slot = self.method.locals.len();
        let display = self.suffixed_local_name("tmp", slot);
        self.method.locals.push((ty, display));
        slot
    }

    fn local_name_taken(&self, name: &str) -> bool {
        self.method.locals.iter().any(|(_, n)| n == name)
    }

    /// First `base_N` no local of the method uses, counting up from `slot`.
    fn suffixed_local_name(&self, base: &str, slot: usize) -> String {
        let mut n = slot;
        loop {
            let candidate = format!("{}_{}", base, n);
            if !self.local_name_taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Storage> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
            .or_else(|| self.globals.get(name).map(|t| Storage::Global(*t)))
    }

    pub fn field_ref(&self, name: &str, ty: Type) -> String {
        format!("{} {}::{}", il_type(ty), self.class_name(), name)
    }

    pub fn load(&mut self, storage: Storage, name: &str) {
        let instr = match storage {
            Storage::Arg(i, _) => Instr::Ldarg(i),
            Storage::Local(i, _) => Instr::Ldloc(i),
            Storage::Global(t) => Instr::Ldsfld(self.field_ref(name, t)),
        };
        self.emit(instr);
    }

    pub fn store(&mut self, storage: Storage, name: &str) {
        let instr = match storage {
            Storage::Arg(i, _) => Instr::Starg(i),
            Storage::Local(i, _) => Instr::Stloc(i),
            Storage::Global(t) => Instr::Stsfld(self.field_ref(name, t)),
        };
        self.emit(instr);
    }

    /// Call target for a user-defined function.
    pub fn method_ref(&self, name: &str, sig: &Signature) -> String {
        let params = sig
            .params
            .iter()
            .map(|p| il_type((*p).into()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} {}::{}({})",
            il_type(sig.return_type),
            self.class_name(),
            name,
            params
        )
    }
}
