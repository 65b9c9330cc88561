//! Resolves `use` paths to files, parses each reachable module exactly once,
//! and detects import cycles. A `use` path like `std.io.file` maps to
//! `std/io/file.mach` under either an alias base (if `std` is an alias) or
//! one of the configured search paths, first match wins.
//!
//! Every file is run through the preprocessor before it reaches the lexer:
//! the module manager owns the one constants table shared by the whole
//! build and applies it to each module's source as it is read.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use mach_ast::{Arena, Ast, Id, NodeKind};
use mach_diagnostics::Diagnostic;
use thiserror::Error;

pub type ModuleId = Id<Module>;

/// A loaded module: its canonical `use` path, the file it was read from, and
/// (once parsed) its AST. `is_analyzed` is left for the semantic pass to
/// flip; the module manager itself only parses.
#[derive(Debug)]
pub struct Module {
    pub name: String,
    pub file_path: PathBuf,
    pub ast: Option<Ast>,
    pub is_parsed: bool,
    pub is_analyzed: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// The preprocessed text the AST's byte offsets are relative to — kept
    /// around (rather than discarded once parsed) so a later pass can still
    /// derive a `Span`'s line/column from a node's offset.
    pub source: String,
}

impl Module {
    fn stub(name: String, file_path: PathBuf) -> Self {
        Self {
            name,
            file_path,
            ast: None,
            is_parsed: false,
            is_analyzed: false,
            diagnostics: Vec::new(),
            source: String::new(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModuleError {
    #[error("module not found: {0}")]
    ModuleNotFound(String),
    #[error("circular dependency: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),
    #[error("failed to read module {path}: {message}")]
    Io { path: String, message: String },
    #[error("preprocessing {path} failed: {message}")]
    Preprocessor { path: String, message: String },
}

/// One entry accumulated while loading, for batch reporting at the end of a
/// build (mirrors `ModuleErrorList` rather than aborting on the first
/// failure, so a run surfaces every broken import in one pass).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleErrorEntry {
    pub module_path: String,
    pub file_path: Option<String>,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ModuleErrorList {
    entries: Vec<ModuleErrorEntry>,
}

impl ModuleErrorList {
    pub fn push(&mut self, module_path: impl Into<String>, file_path: Option<String>, message: impl Into<String>) {
        self.entries.push(ModuleErrorEntry {
            module_path: module_path.into(),
            file_path,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ModuleErrorEntry] {
        &self.entries
    }
}

/// Owns every loaded module plus the search configuration used to locate
/// them. `in_progress`/`load_stack` track the current recursive-descent
/// chain so a `use` cycle is caught mid-resolution rather than silently
/// accepted because the target module happened to finish loading first.
pub struct ModuleManager {
    modules: Arena<Module>,
    by_path: HashMap<String, ModuleId>,
    search_paths: Vec<PathBuf>,
    aliases: HashMap<String, PathBuf>,
    errors: ModuleErrorList,
    in_progress: HashSet<String>,
    load_stack: Vec<String>,
    constants: HashMap<String, i64>,
}

impl Default for ModuleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleManager {
    pub fn new() -> Self {
        Self {
            modules: Arena::new(),
            by_path: HashMap::new(),
            search_paths: Vec::new(),
            aliases: HashMap::new(),
            errors: ModuleErrorList::default(),
            in_progress: HashSet::new(),
            load_stack: Vec::new(),
            constants: HashMap::new(),
        }
    }

    /// Build a manager whose preprocessor pass sees `constants` (e.g. the
    /// driver's `__SYS_ARCH__`/`__SYS_PLAT__` and any `-D`-style build
    /// constants) for every module it loads.
    pub fn with_constants(constants: HashMap<String, i64>) -> Self {
        Self { constants, ..Self::new() }
    }

    pub fn set_constants(&mut self, constants: HashMap<String, i64>) {
        self.constants = constants;
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    /// `name` is the first segment of a `use` path; `base` is the directory
    /// that segment's remaining path components are resolved relative to.
    pub fn add_alias(&mut self, name: impl Into<String>, base: impl Into<PathBuf>) {
        self.aliases.insert(name.into(), base.into());
    }

    pub fn errors(&self) -> &ModuleErrorList {
        &self.errors
    }

    pub fn get(&self, id: ModuleId) -> &Module {
        self.modules.get(id)
    }

    /// Mutable access for the semantic passes, which write `resolved_type`/
    /// `symbol` onto each module's AST nodes in place.
    pub fn get_mut(&mut self, id: ModuleId) -> &mut Module {
        self.modules.get_mut(id)
    }

    /// Every loaded module in load order (dependencies before the modules
    /// that `use` them, since [`ModuleManager::load_and_resolve`] recurses
    /// into dependencies before the arena allocates their importer) — the
    /// order the driver walks to build each module's scope against its
    /// already-resolved imports.
    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules.iter()
    }

    /// Every parse diagnostic across every loaded module, in load order —
    /// the module manager's own errors (not found / circular / io) are
    /// reported separately via [`ModuleManager::errors`].
    pub fn all_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.modules.iter().flat_map(|(_, module)| module.diagnostics.iter())
    }

    pub fn find_by_path(&self, use_path: &str) -> Option<ModuleId> {
        self.by_path.get(use_path).copied()
    }

    /// Resolve a `use` path to a file. An aliased first segment takes its
    /// remaining segments relative to the alias's base directory; otherwise
    /// every search path is tried in order with the full dotted path turned
    /// into a relative `.mach` file. First existing candidate wins.
    pub fn resolve_path(&self, use_path: &str) -> Result<PathBuf, ModuleError> {
        let segments: Vec<&str> = use_path.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(ModuleError::ModuleNotFound(use_path.to_string()));
        }

        if let Some(base) = segments.first().and_then(|first| self.aliases.get(*first)) {
            let rest = &segments[1..];
            let candidate = if rest.is_empty() {
                base.join("mod.mach")
            } else {
                base.join(format!("{}.mach", rest.join("/")))
            };
            return if candidate.exists() {
                Ok(candidate)
            } else {
                Err(ModuleError::ModuleNotFound(use_path.to_string()))
            };
        }

        let relative = format!("{}.mach", segments.join("/"));
        for search_path in &self.search_paths {
            let candidate = search_path.join(&relative);
            if candidate.exists() {
                return Ok(candidate);
            }
        }
        Err(ModuleError::ModuleNotFound(use_path.to_string()))
    }

    /// Load (and recursively resolve the dependencies of) the module named
    /// by `use_path`. Idempotent: a module already fully loaded is returned
    /// from cache without touching disk again. A `use_path` still mid-load
    /// on the current chain is a circular dependency, reported with the
    /// full chain of module names from entry to the repeated name.
    pub fn load_module(&mut self, use_path: &str) -> Result<ModuleId, ModuleError> {
        if let Some(&id) = self.by_path.get(use_path) {
            return Ok(id);
        }
        let file_path = match self.resolve_path(use_path) {
            Ok(path) => path,
            Err(err) => {
                self.errors.push(use_path, None, err.to_string());
                return Err(err);
            }
        };
        self.load_at_path(use_path, &file_path)
    }

    /// Load the driver's entry file directly at `file_path`, bypassing
    /// search-path/alias resolution: the entry file is named on the command
    /// line, not reached through a `use` path, so there is nothing to
    /// resolve it against. `name` is the module name it is registered and
    /// cached under (by convention, its file stem).
    pub fn load_entry(&mut self, name: &str, file_path: &Path) -> Result<ModuleId, ModuleError> {
        if let Some(&id) = self.by_path.get(name) {
            return Ok(id);
        }
        self.load_at_path(name, file_path)
    }

    /// Shared by [`ModuleManager::load_module`] and
    /// [`ModuleManager::load_entry`] once each has settled on a concrete
    /// file path: detect cycles on `use_path`, parse, cache under
    /// `use_path`.
    fn load_at_path(&mut self, use_path: &str, file_path: &Path) -> Result<ModuleId, ModuleError> {
        if self.in_progress.contains(use_path) {
            let mut chain = self.load_stack.clone();
            chain.push(use_path.to_string());
            let err = ModuleError::CircularDependency(chain);
            self.errors.push(use_path, None, err.to_string());
            return Err(err);
        }

        self.in_progress.insert(use_path.to_string());
        self.load_stack.push(use_path.to_string());

        let result = self.load_and_resolve(use_path, file_path);

        self.load_stack.pop();
        self.in_progress.remove(use_path);

        match result {
            Ok(module) => {
                let id = self.modules.alloc(module);
                self.by_path.insert(use_path.to_string(), id);
                Ok(id)
            }
            Err(err) => Err(err),
        }
    }

    /// Parse one module's source and recursively load every module it
    /// `use`s, so cycles through this module are detected before it is ever
    /// cached as complete.
    fn load_and_resolve(&mut self, use_path: &str, file_path: &Path) -> Result<Module, ModuleError> {
        log::debug!("loading module '{use_path}' from {}", file_path.display());
        let source = fs::read_to_string(file_path).map_err(|e| {
            let err = ModuleError::Io {
                path: file_path.display().to_string(),
                message: e.to_string(),
            };
            self.errors.push(use_path, Some(file_path.display().to_string()), err.to_string());
            err
        })?;

        let preprocessed = mach_preprocessor::Preprocessor::new(&self.constants).run(&source).map_err(|e| {
            let err = ModuleError::Preprocessor {
                path: file_path.display().to_string(),
                message: e.to_string(),
            };
            self.errors.push(use_path, Some(file_path.display().to_string()), err.to_string());
            err
        })?;

        let (ast, diagnostics) = mach_parser::parse(&preprocessed, &file_path.display().to_string());

        for dependency in collect_use_paths(&ast) {
            self.load_module(&dependency)?;
        }

        let mut module = Module::stub(use_path.to_string(), file_path.to_path_buf());
        module.ast = Some(ast);
        module.is_parsed = true;
        module.diagnostics = diagnostics;
        module.source = preprocessed;
        Ok(module)
    }
}

/// Every `use` path named directly in a module's top-level items, in source
/// order, for the pre-order dependency walk.
fn collect_use_paths(ast: &Ast) -> Vec<String> {
    ast.nodes
        .iter()
        .filter_map(|(_, node)| match &node.kind {
            NodeKind::UseDecl { path, .. } => Some(path.join(".")),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_module(dir: &Path, relative: &str, contents: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = fs::File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn resolves_a_module_through_a_search_path() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "widgets/button.mach", "val x: i32 = 1;\n");

        let mut manager = ModuleManager::new();
        manager.add_search_path(dir.path());
        let id = manager.load_module("widgets.button").unwrap();
        assert!(manager.get(id).is_parsed);
    }

    #[test]
    fn missing_module_is_module_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = ModuleManager::new();
        manager.add_search_path(dir.path());
        let err = manager.load_module("does.not.exist").unwrap_err();
        assert_eq!(err, ModuleError::ModuleNotFound("does.not.exist".to_string()));
    }

    #[test]
    fn loading_the_same_path_twice_returns_the_cached_id() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "a.mach", "val x: i32 = 1;\n");

        let mut manager = ModuleManager::new();
        manager.add_search_path(dir.path());
        let first = manager.load_module("a").unwrap();
        let second = manager.load_module("a").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn aliased_first_segment_resolves_relative_to_its_base() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "io/file.mach", "val x: i32 = 1;\n");

        let mut manager = ModuleManager::new();
        manager.add_alias("std", dir.path());
        let id = manager.load_module("std.io.file").unwrap();
        assert!(manager.get(id).is_parsed);
    }

    #[test]
    fn circular_use_between_two_modules_is_reported_with_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "a.mach", "use b;\n");
        write_module(dir.path(), "b.mach", "use a;\n");

        let mut manager = ModuleManager::new();
        manager.add_search_path(dir.path());
        let err = manager.load_module("a").unwrap_err();
        assert_eq!(
            err,
            ModuleError::CircularDependency(vec!["a".to_string(), "b".to_string(), "a".to_string()])
        );
    }

    #[test]
    fn dependency_resolution_walks_transitively() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "a.mach", "use b;\n");
        write_module(dir.path(), "b.mach", "use c;\n");
        write_module(dir.path(), "c.mach", "val x: i32 = 1;\n");

        let mut manager = ModuleManager::new();
        manager.add_search_path(dir.path());
        manager.load_module("a").unwrap();
        assert!(manager.find_by_path("b").is_some());
        assert!(manager.find_by_path("c").is_some());
    }
}
