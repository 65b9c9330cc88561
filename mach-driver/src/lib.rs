//! The compiler driver: the glue that wires the preprocessor (via the
//! module manager), module resolution, scope building, type checking, and
//! monomorphization into a single strict pipeline, and produces the
//! [`LoweringContract`] a backend collaborator consumes.
//!
//! Everything past "parse the entry file's module graph" runs against one
//! shared [`mach_sema::SemaContext`] and one shared [`Monomorphizer`], so a
//! generic instantiated from two different modules collapses to a single
//! specialization and an imported symbol is the same `SymbolId` in every
//! module that `use`s it.

pub mod contract;
pub mod error;
pub mod options;
pub mod target;

pub use contract::LoweringContract;
pub use error::DriverError;
pub use options::{Alias, BuildOptions};
pub use target::{Architecture, Endian, Platform, Target, TargetInfo};

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use mach_ast::{NodeKind, ScopeId};
use mach_diagnostics::{Diagnostic, DiagnosticEngine};
use mach_module::{ModuleError, ModuleId, ModuleManager};
use mach_sema::{scope_builder, typeck, Monomorphizer, SemaContext};

/// Every `use` path named at the top level of a module's AST, in source
/// order — the set of module names `build_module_scope` needs an already-
/// built scope for.
fn use_targets(ast: &mach_ast::Ast) -> Vec<String> {
    let Some(root) = ast.root else { return Vec::new() };
    let items = match &ast.get(root).kind {
        NodeKind::Program { items } => items.clone(),
        _ => return Vec::new(),
    };
    items
        .iter()
        .filter_map(|id| match &ast.get(*id).kind {
            NodeKind::UseDecl { path, .. } => Some(path.join(".")),
            _ => None,
        })
        .collect()
}

/// The resolved state of a compilation, successful or not: every module
/// reached from the entry file, the shared symbol/scope/type state, the
/// specialization cache, and every diagnostic collected along the way. A
/// failed compilation (`succeeded == false`) still carries this far — the
/// pipeline keeps checking past errors rather than aborting.
pub struct CompileOutcome {
    pub modules: ModuleManager,
    pub sema: SemaContext,
    pub mono: Monomorphizer,
    pub diagnostics: DiagnosticEngine,
    /// Preprocessed source text by file path, so a diagnostic's `Span` (which
    /// only carries a path) can still be rendered with a caret later.
    pub sources: HashMap<String, String>,
    pub target: Target,
    pub succeeded: bool,
}

impl CompileOutcome {
    /// The backend contract, borrowed from the finished state. Only
    /// meaningful to hand to a backend when `succeeded` is true; a caller
    /// that ignores that and lowers anyway gets whatever partial state the
    /// pipeline produced, same as the diagnostics already printed.
    pub fn contract(&self) -> LoweringContract<'_> {
        LoweringContract::new(&self.modules, &self.sema, &self.mono)
    }

    /// Render every diagnostic, grouped by stage, plus the module manager's
    /// own not-found/circular-import errors, which carry no token/span to
    /// format against a source line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut diags: Vec<&Diagnostic> = self.diagnostics.diagnostics().iter().collect();
        diags.sort_by_key(|d| d.stage);
        for diag in diags {
            let source = self.sources.get(&diag.span.file).map(String::as_str).unwrap_or("");
            out.push_str(&diag.format(source));
            out.push('\n');
        }
        for entry in self.modules.errors().entries() {
            match &entry.file_path {
                Some(path) => out.push_str(&format!("error: {} ({path})\n", entry.message)),
                None => out.push_str(&format!("error: {}\n", entry.message)),
            }
        }
        out
    }

    pub fn print_report(&self) {
        eprint!("{}", self.render());
        self.diagnostics.print_summary();
    }
}

/// Run the whole semantic-analysis pipeline for `options` against `target`.
/// Returns `Err` only for the driver's own fatal condition — the entry
/// file's module graph could not be resolved at all (unreadable entry file,
/// or a `ModuleNotFound`/`CircularDependency` reachable from it); every
/// later failure (redeclaration, unknown identifier, bad cast, ...) is
/// recorded as a diagnostic and reported through `Ok(CompileOutcome)` with
/// `succeeded = false` instead.
pub fn compile(options: &BuildOptions, target: Target) -> Result<CompileOutcome, DriverError> {
    let mut manager = ModuleManager::new();
    for path in &options.include_paths {
        manager.add_search_path(path);
    }
    for alias in &options.aliases {
        manager.add_alias(alias.name.clone(), alias.directory.clone());
    }

    let sys_arch = target.architecture.as_i64();
    let sys_plat = target.platform.as_i64();
    let mut constants = HashMap::new();
    constants.insert("__SYS_ARCH__".to_string(), sys_arch);
    constants.insert("__SYS_PLAT__".to_string(), sys_plat);
    manager.set_constants(constants);

    let entry_name = options.entry_module_name();
    manager.load_entry(&entry_name, &options.input_file)?;

    let layout = target::target_layout(target);
    let mut sema = SemaContext::new(layout, sys_arch, sys_plat);
    let mut mono = Monomorphizer::new();
    let mut diagnostics = DiagnosticEngine::new();
    let mut sources = HashMap::new();

    // Every loaded module in dependency (leaves-first) order: a
    // DFS-discovery order in which a module's `use` targets always precede
    // it, so building scopes in this same order guarantees every import is
    // already resolvable.
    let ids: Vec<ModuleId> = manager.modules().map(|(id, _)| id).collect();

    for &id in &ids {
        let module = manager.get(id);
        for diag in &module.diagnostics {
            diagnostics.emit(diag.clone());
        }
        sources.insert(module.file_path.display().to_string(), module.source.clone());
    }

    let mut scopes_by_name: HashMap<String, ScopeId> = HashMap::new();
    let mut scope_by_id: HashMap<ModuleId, ScopeId> = HashMap::new();
    for &id in &ids {
        let module = manager.get(id);
        let Some(ast) = module.ast.as_ref() else { continue };
        let file = module.file_path.display().to_string();
        let mut imports = HashMap::new();
        for target_path in use_targets(ast) {
            if let Some(&scope) = scopes_by_name.get(&target_path) {
                imports.insert(target_path, scope);
            }
        }
        let scope = scope_builder::build_module_scope(&mut sema, ast, &mut diagnostics, &file, &module.source, &module.name, &imports);
        scopes_by_name.insert(module.name.clone(), scope);
        scope_by_id.insert(id, scope);
    }

    for &id in &ids {
        let Some(&scope) = scope_by_id.get(&id) else { continue };
        let module = manager.get_mut(id);
        let name = module.name.clone();
        let file = module.file_path.display().to_string();
        let source = module.source.clone();
        let Some(ast) = module.ast.as_mut() else { continue };
        typeck::check_module(&mut sema, &mut mono, ast, scope, &name, &file, &source, &mut diagnostics);
        mono.drain(&mut sema, ast, &mut diagnostics, &file, &source);
    }

    let succeeded = !diagnostics.has_errors() && manager.errors().is_empty();

    Ok(CompileOutcome {
        modules: manager,
        sema,
        mono,
        diagnostics,
        sources,
        target,
        succeeded,
    })
}

/// Read the entry file directly, for a caller (e.g. a `check`-only CLI
/// command) that wants the raw source without running the full pipeline.
pub fn read_source(path: &Path) -> Result<String, DriverError> {
    fs::read_to_string(path).map_err(|source| DriverError::EntryFileNotReadable {
        path: path.display().to_string(),
        source,
    })
}

/// Write the resolved AST of every module as pretty-printed JSON, the one
/// `emit_*` artifact the driver can produce on its own (the backend contract
/// already hands a generator the resolved AST; `emit_ast` just lets a caller
/// look at it without a backend). `emit_ir`/`emit_asm` have no counterpart
/// here — both are backend collaborator output — so a request for either is
/// logged and otherwise ignored rather than silently "succeeding".
pub fn emit_artifacts(outcome: &CompileOutcome, options: &BuildOptions) -> std::io::Result<()> {
    if options.emit_ast {
        let path = options.emit_ast_path.clone().unwrap_or_else(|| options.resolved_output_file().with_extension("ast.json"));
        let mut dump = serde_json::Map::new();
        for (id, module) in outcome.modules.modules() {
            let _ = id;
            if let Some(ast) = &module.ast {
                let value = serde_json::to_value(ast).unwrap_or(serde_json::Value::Null);
                dump.insert(module.name.clone(), value);
            }
        }
        fs::write(&path, serde_json::to_string_pretty(&dump)?)?;
    }
    if options.emit_ir {
        log::warn!("emit_ir requested but no backend is wired into this pipeline; skipping");
    }
    if options.emit_asm {
        log::warn!("emit_asm requested but no backend is wired into this pipeline; skipping");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, relative: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn linux_x64() -> Target {
        Target::new(Platform::Linux, Architecture::AmdX64)
    }

    #[test]
    fn minimal_program_compiles_with_no_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_file(dir.path(), "main.mach", "fun main(): i32 {\n  ret 0;\n}\n");

        let options = BuildOptions::new(entry);
        let outcome = compile(&options, linux_x64()).unwrap();

        assert!(outcome.succeeded, "{}", outcome.render());
    }

    #[test]
    fn a_program_split_across_modules_resolves_the_import() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "util.mach", "fun answer(): i32 { ret 42; }\n");
        let entry = write_file(dir.path(), "main.mach", "use util;\nfun main(): i32 { ret answer(); }\n");

        let mut options = BuildOptions::new(entry);
        options.add_include_path(dir.path());
        let outcome = compile(&options, linux_x64()).unwrap();

        assert!(outcome.succeeded, "{}", outcome.render());
    }

    #[test]
    fn circular_import_fails_the_whole_build() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.mach", "use b;\n");
        write_file(dir.path(), "b.mach", "use a;\n");
        let entry = dir.path().join("a.mach");

        let mut options = BuildOptions::new(entry);
        options.add_include_path(dir.path());
        let err = compile(&options, linux_x64()).unwrap_err();
        assert!(matches!(err, DriverError::EntryModuleUnresolved(ModuleError::CircularDependency(_))));
    }

    #[test]
    fn a_type_error_is_reported_but_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_file(dir.path(), "main.mach", "val x: i32 = \"hello\";\n");

        let options = BuildOptions::new(entry);
        let outcome = compile(&options, linux_x64()).unwrap();

        assert!(!outcome.succeeded);
        assert!(outcome.diagnostics.has_errors());
        let rendered = outcome.render();
        assert!(rendered.contains("main.mach:1:14"));
        assert!(rendered.contains("^^^^^^^"));
    }

    #[test]
    fn unreadable_entry_file_is_a_driver_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = BuildOptions::new(dir.path().join("does_not_exist.mach"));
        let err = compile(&options, linux_x64()).unwrap_err();
        assert!(matches!(err, DriverError::EntryModuleUnresolved(ModuleError::Io { .. })));
    }

    #[test]
    fn generic_used_from_two_call_sites_collapses_to_one_specialization() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_file(
            dir.path(),
            "main.mach",
            "fun id<T>(x: T): T { ret x; }\nfun main(): i32 { ret id<i32>(1) + id<i32>(2); }\n",
        );

        let options = BuildOptions::new(entry);
        let outcome = compile(&options, linux_x64()).unwrap();

        assert!(outcome.succeeded, "{}", outcome.render());
        assert_eq!(outcome.mono.specialization_count(), 1);
    }
}
