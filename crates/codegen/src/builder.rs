//! Build-script entry point.
//!
//! ```ignore
//! // build.rs
//! fn main() {
//!     restfit_codegen::Builder::new()
//!         .emit_rerun_if_changed(true)
//!         .generate()
//!         .unwrap();
//! }
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::GeneratorConfig;
use crate::errors::{BuildError, Diagnostics};
use crate::extractor::extract;
use crate::generator::{generate, GeneratedSource, InterfaceIndex};
use crate::model::ClassData;
use crate::scanner::scan;

/// Name of the directory below `OUT_DIR` that receives generated files.
pub const OUT_SUBDIR: &str = "restfit";

/// Scans a source tree and writes one implementation per API trait.
#[derive(Debug, Clone)]
pub struct Builder {
    src_dir: PathBuf,
    out_dir: PathBuf,
    emit_rerun_if_changed: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Reads `src`, writes to `$OUT_DIR/restfit` when run from a build script
    /// and to `target/restfit` otherwise.
    pub fn new() -> Self {
        let out_dir = env::var_os("OUT_DIR")
            .map(|dir| PathBuf::from(dir).join(OUT_SUBDIR))
            .unwrap_or_else(|| PathBuf::from("target").join(OUT_SUBDIR));
        Self {
            src_dir: PathBuf::from("src"),
            out_dir,
            emit_rerun_if_changed: false,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new()
            .src_dir(&config.src_dir)
            .out_dir(&config.out_dir)
    }

    pub fn src_dir(mut self, src_dir: impl Into<PathBuf>) -> Self {
        self.src_dir = src_dir.into();
        self
    }

    pub fn out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    /// Prints `cargo:rerun-if-changed` for the source directory.
    pub fn emit_rerun_if_changed(mut self, emit: bool) -> Self {
        self.emit_rerun_if_changed = emit;
        self
    }

    pub fn src(&self) -> &Path {
        &self.src_dir
    }

    pub fn out(&self) -> &Path {
        &self.out_dir
    }

    /// Validates every declaration and renders it without writing anything.
    ///
    /// # Errors
    ///
    /// Scan failures, or every diagnostic of every declaration.
    pub fn check(&self) -> Result<Vec<ClassData>, BuildError> {
        let (classes, _) = self.render()?;
        Ok(classes)
    }

    /// Generates and writes all implementations, returning the written paths.
    ///
    /// Files whose contents are unchanged are left untouched. Nothing is
    /// written when any declaration has errors.
    pub fn generate(&self) -> Result<Vec<PathBuf>, BuildError> {
        if self.emit_rerun_if_changed {
            println!("cargo:rerun-if-changed={}", self.src_dir.display());
        }
        let (_, sources) = self.render()?;
        let mut written = Vec::with_capacity(sources.len());
        for source in sources {
            let path = self.out_dir.join(&source.relative_path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|error| BuildError::Write {
                    path: parent.to_path_buf(),
                    source: error,
                })?;
            }
            let unchanged = fs::read_to_string(&path).is_ok_and(|existing| existing == source.contents);
            if !unchanged {
                fs::write(&path, &source.contents).map_err(|error| BuildError::Write {
                    path: path.clone(),
                    source: error,
                })?;
            }
            tracing::info!(file = %path.display(), unchanged, "generated implementation");
            written.push(path);
        }
        Ok(written)
    }

    fn render(&self) -> Result<(Vec<ClassData>, Vec<GeneratedSource>), BuildError> {
        let declarations = scan(&self.src_dir)?;
        let mut diagnostics = Diagnostics::new();
        let mut extracted: Vec<(ClassData, PathBuf)> = Vec::new();
        for declaration in declarations {
            match extract(&declaration.item, &declaration.context) {
                Ok(class) => {
                    tracing::debug!(
                        interface = %class.qualified_name(),
                        functions = class.functions.len(),
                        "extracted interface"
                    );
                    extracted.push((class, declaration.file));
                }
                Err(errors) => diagnostics.extend(errors.in_file(&declaration.file)),
            }
        }

        let index: InterfaceIndex = extracted.iter().map(|(class, _)| class.clone()).collect();
        let mut sources = Vec::with_capacity(extracted.len());
        for (class, file) in &extracted {
            match generate(class, &index) {
                Ok(source) => sources.push(source),
                Err(errors) => diagnostics.extend(errors.in_file(file)),
            }
        }
        if !diagnostics.is_empty() {
            return Err(diagnostics.into());
        }
        let classes = extracted.into_iter().map(|(class, _)| class).collect();
        Ok((classes, sources))
    }
}
