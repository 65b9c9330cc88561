//! `BuildOptions`: the record the CLI collaborator hands the driver. Lists
//! become owned `Vec`s and an absent emit path is `None` rather than a
//! present-but-empty string.

use std::path::PathBuf;

/// One `name: base_directory` pair from `aliases`, e.g. `std: ./vendor/std`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub directory: PathBuf,
}

/// The compiler invocation the driver is asked to carry out. Only
/// `input_file` is required; every other field has the default a bare
/// `mach <file>.mach` invocation would use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub input_file: PathBuf,
    pub output_file: Option<PathBuf>,
    /// Clamped to `{0,1,2,3}` by [`BuildOptions::set_opt_level`]; the field
    /// itself stays a plain `u8` since every other component treats it as
    /// an opaque pass-through value for the backend.
    pub opt_level: u8,
    pub link_exe: bool,
    pub no_pie: bool,
    pub debug_info: bool,
    pub emit_ast: bool,
    pub emit_ir: bool,
    pub emit_asm: bool,
    pub emit_ast_path: Option<PathBuf>,
    pub emit_ir_path: Option<PathBuf>,
    pub emit_asm_path: Option<PathBuf>,
    pub include_paths: Vec<PathBuf>,
    pub link_objects: Vec<PathBuf>,
    pub aliases: Vec<Alias>,
}

impl BuildOptions {
    pub fn new(input_file: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            output_file: None,
            opt_level: 0,
            link_exe: false,
            no_pie: false,
            debug_info: false,
            emit_ast: false,
            emit_ir: false,
            emit_asm: false,
            emit_ast_path: None,
            emit_ir_path: None,
            emit_asm_path: None,
            include_paths: Vec::new(),
            link_objects: Vec::new(),
            aliases: Vec::new(),
        }
    }

    /// Out-of-range values saturate to 3 rather than panicking; the driver
    /// has no backend to reject an invalid level against, so this is the
    /// most permissive reading that still keeps the field meaningful.
    pub fn set_opt_level(&mut self, level: u8) {
        self.opt_level = level.min(3);
    }

    /// The artifact path a build without an explicit `output_file` writes
    /// to: the entry file's stem in its own directory.
    pub fn resolved_output_file(&self) -> PathBuf {
        self.output_file.clone().unwrap_or_else(|| self.input_file.with_extension(""))
    }

    pub fn add_include_path(&mut self, path: impl Into<PathBuf>) {
        self.include_paths.push(path.into());
    }

    pub fn add_link_object(&mut self, path: impl Into<PathBuf>) {
        self.link_objects.push(path.into());
    }

    pub fn add_alias(&mut self, name: impl Into<String>, directory: impl Into<PathBuf>) {
        self.aliases.push(Alias {
            name: name.into(),
            directory: directory.into(),
        });
    }

    /// The module name the entry file is reached under: its file stem. A
    /// `use` path is what actually names a module once it has an importer,
    /// but the entry file has no importer, so its own stem stands in.
    pub fn entry_module_name(&self) -> String {
        self.input_file.file_stem().and_then(|s| s.to_str()).unwrap_or("main").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opt_level_saturates_instead_of_accepting_garbage() {
        let mut options = BuildOptions::new("main.mach");
        options.set_opt_level(9);
        assert_eq!(options.opt_level, 3);
    }

    #[test]
    fn output_defaults_to_the_input_stem() {
        let options = BuildOptions::new("src/widgets/button.mach");
        assert_eq!(options.resolved_output_file(), PathBuf::from("src/widgets/button"));
    }

    #[test]
    fn entry_module_name_is_the_file_stem() {
        let options = BuildOptions::new("src/main.mach");
        assert_eq!(options.entry_module_name(), "main");
    }
}
