//! Stack-machine code generation.
//!
//! Lowers an analyzed program to MSIL-flavoured instruction text: one static
//! method per function inside a wrapper class, globals as static fields
//! initialized by a single `.cctor`. Generation assumes the tree passed
//! analysis; anything it cannot resolve is logged and lowered best-effort.

pub mod context;
pub mod expr;
pub mod instr;
pub mod stmt;

use crate::ast::{Function, Item, Program, Stmt, Type, ENTRY_POINT};
use crate::CompileOptions;
pub use context::{Gen, Method, Signature};
pub use instr::Instr;
use instr::il_type;
use std::fmt::Write as _;

/// A fully lowered program.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub name: String,
    /// Static fields in declaration order.
    pub globals: Vec<(Type, String)>,
    /// Static initializer, present when some global needs a value.
    pub initializer: Option<Method>,
    pub methods: Vec<Method>,
}

impl Assembly {
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn render(&self, options: &CompileOptions) -> String {
        let mut out = String::new();
        if options.emit_header {
            out.push_str(".assembly extern mscorlib {}\n");
            let _ = writeln!(out, ".assembly {} {{}}", self.name);
            out.push('\n');
        }
        let _ = writeln!(
            out,
            ".class public auto ansi beforefieldinit {} extends [mscorlib]System.Object",
            self.name
        );
        out.push_str("{\n");
        for (ty, name) in &self.globals {
            let _ = writeln!(out, "    .field public static {} {}", il_type(*ty), name);
        }
        if let Some(cctor) = &self.initializer {
            render_method(&mut out, cctor, true);
        }
        for m in &self.methods {
            render_method(&mut out, m, false);
        }
        out.push_str("}\n");
        out
    }
}

fn render_method(out: &mut String, m: &Method, initializer: bool) {
    out.push('\n');
    if initializer {
        out.push_str(
            "    .method private hidebysig specialname rtspecialname static void .cctor() cil managed\n",
        );
    } else {
        let params = m
            .params
            .iter()
            .map(|(ty, name)| format!("{} {}", il_type((*ty).into()), name))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "    .method public static {} {}({}) cil managed",
            il_type(m.return_type),
            m.name,
            params
        );
    }
    out.push_str("    {\n");
    if m.entry_point {
        out.push_str("        .entrypoint\n");
    }
    let _ = writeln!(out, "        .maxstack {}", m.max_stack);
    if !m.locals.is_empty() {
        let locals = m
            .locals
            .iter()
            .enumerate()
            .map(|(i, (ty, name))| format!("[{}] {} {}", i, il_type(*ty), name))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "        .locals init ({})", locals);
    }
    for instr in &m.body {
        let indent = if instr.is_label() { "    " } else { "        " };
        let _ = writeln!(out, "{}{}", indent, instr);
    }
    out.push_str("    }\n");
}

impl Gen<'_> {
    pub fn lower_program(&mut self, program: &Program) -> Assembly {
        let mut globals = Vec::new();
        for item in &program.items {
            match item {
                Item::Function(f) => {
                    self.signatures.insert(
                        f.name.clone(),
                        Signature {
                            return_type: f.return_type,
                            params: f.params.iter().map(|p| p.ty).collect(),
                        },
                    );
                }
                Item::Global(Stmt::VarDecl { ty, name, .. }) => {
                    globals.push((Type::from(*ty), name.clone()));
                }
                Item::Global(Stmt::ArrayDecl { elem, name, .. }) => {
                    globals.push((Type::Array(*elem), name.clone()));
                }
                Item::Global(other) => {
                    log::warn!("line {}: unsupported top-level statement skipped", other.line());
                }
            }
        }
        self.globals = globals.iter().map(|(t, n)| (n.clone(), *t)).collect();
        log::debug!(
            "codegen: {} function(s), {} global(s)",
            self.signatures.len(),
            globals.len()
        );

        let initializer = self.lower_initializer(program);
        let methods = program
            .functions()
            .map(|f| self.lower_function(f))
            .collect();

        Assembly {
            name: self.class_name().to_string(),
            globals,
            initializer,
            methods,
        }
    }

    fn lower_initializer(&mut self, program: &Program) -> Option<Method> {
        self.start_method(".cctor", Type::Void, Vec::new());
        for item in &program.items {
            match item {
                Item::Global(Stmt::VarDecl {
                    ty,
                    name,
                    init: Some(init),
                    ..
                }) => {
                    self.lower_expr(init);
                    let field = self.field_ref(name, Type::from(*ty));
                    self.emit(Instr::Stsfld(field));
                }
                Item::Global(Stmt::ArrayDecl {
                    elem,
                    name,
                    size,
                    init,
                    ..
                }) => {
                    self.init_global_array(name, *elem, *size, init.as_deref().unwrap_or(&[]));
                }
                _ => {}
            }
        }
        let mut cctor = self.finish_method();
        if cctor.body.is_empty() {
            return None;
        }
        cctor.body.push(Instr::Ret { value: false });
        Some(cctor)
    }

    fn lower_function(&mut self, f: &Function) -> Method {
        log::debug!("codegen: lowering function {}", f.name);
        let params = f.params.iter().map(|p| (p.ty, p.name.clone())).collect();
        self.start_method(&f.name, f.return_type, params);
        self.method.entry_point = f.name == ENTRY_POINT;

        // Parameters and the top-level body share one slot scope.
        for s in &f.body {
            self.lower_stmt(s);
        }
        if !matches!(f.body.last(), Some(Stmt::Return { .. })) {
            if f.return_type == Type::Void {
                self.emit(Instr::Ret { value: false });
            } else {
                self.emit(Instr::LdcI4(0));
                self.emit(Instr::Ret { value: true });
            }
        }
        self.finish_method()
    }
}

/// Lower `program` without rendering it.
pub fn lower(program: &Program, options: &CompileOptions) -> Assembly {
    Gen::new(options).lower_program(program)
}

pub fn generate(program: &Program) -> String {
    generate_with(program, &CompileOptions::default())
}

pub fn generate_with(program: &Program, options: &CompileOptions) -> String {
    lower(program, options).render(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_to_ast;

    fn lower_source(source: &str) -> Assembly {
        let parsed = parse_to_ast(source).unwrap();
        lower(&parsed.program, &CompileOptions::default())
    }

    #[test]
    fn missing_return_in_main_yields_zero() {
        let asm = lower_source("int main() { int x = 1; }");
        let body = &asm.method("main").unwrap().body;
        assert_eq!(
            &body[body.len() - 2..],
            &[Instr::LdcI4(0), Instr::Ret { value: true }]
        );
    }

    #[test]
    fn globals_become_static_fields() {
        let asm = lower_source("int counter = 5; bool flags[2]; int main() { return counter; }");
        assert_eq!(
            asm.globals,
            vec![
                (Type::Int, "counter".to_string()),
                (Type::Array(crate::ast::ScalarType::Bool), "flags".to_string())
            ]
        );
        let cctor = asm.initializer.as_ref().unwrap();
        assert_eq!(
            cctor.body[..2],
            [
                Instr::LdcI4(5),
                Instr::Stsfld("int32 generated_code::counter".into())
            ]
        );
        let main = asm.method("main").unwrap();
        assert_eq!(main.body[0], Instr::Ldsfld("int32 generated_code::counter".into()));
    }

    #[test]
    fn no_initializer_without_globals() {
        assert!(lower_source("void main() { }").initializer.is_none());
    }

    #[test]
    fn shadowed_local_gets_new_slot() {
        let asm = lower_source("int main() { int x = 1; { int x = 2; x = 3; } x = 4; return x; }");
        let main = asm.method("main").unwrap();
        assert_eq!(main.locals.len(), 2);
        assert_eq!(main.locals[1].1, "x_1");
        assert!(main.body.contains(&Instr::Stloc(1)));
        // The outer `x = 4` goes back to slot 0.
        let pos = main.body.iter().position(|i| *i == Instr::LdcI4(4)).unwrap();
        assert_eq!(main.body[pos + 1], Instr::Stloc(0));
    }

    #[test]
    fn local_names_stay_unique_next_to_suffixed_shadows() {
        let asm = lower_source(
            "int main() { int x = 1; { int x = 2; } int x_1 = 3; int tmp_3 = 4; return x_1; }",
        );
        let main = asm.method("main").unwrap();
        let names: Vec<&str> = main.locals.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(names, vec!["x", "x_1", "x_1_2", "tmp_3"]);
        let unique: std::collections::HashSet<&str> = names.iter().copied().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn header_can_be_disabled() {
        let parsed = parse_to_ast("void main() { }").unwrap();
        let options = CompileOptions {
            emit_header: false,
            assembly_name: "Demo".into(),
            ..CompileOptions::default()
        };
        let text = generate_with(&parsed.program, &options);
        assert!(!text.contains(".assembly"));
        assert!(text.starts_with(".class public auto ansi beforefieldinit Demo"));
    }
}
