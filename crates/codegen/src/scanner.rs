//! Source scanner: finds API declarations in a crate's `src/` tree.

use std::fs;
use std::path::{Path, PathBuf};

use syn::{ImplItem, Item, TraitItem};
use walkdir::WalkDir;

use crate::annotations::{is_api_marker, is_http_method_attribute};
use crate::errors::{BuildError, Location};
use crate::extractor::is_foreign_attribute;
use crate::types::{ModuleIndex, SourceContext};

/// A candidate declaration and the scope it was found in.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub file: PathBuf,
    pub item: Item,
    pub context: SourceContext,
}

/// Scans every `.rs` file below `src_dir` in path order.
///
/// Binary targets under `src/bin` are not part of the library module tree and
/// are skipped. Glob imports are resolved once every module is known.
///
/// # Errors
///
/// Unreadable directories or files, and files that do not parse.
pub fn scan(src_dir: &Path) -> Result<Vec<Declaration>, BuildError> {
    let mut declarations = Vec::new();
    let mut index = ModuleIndex::new();
    let walker = WalkDir::new(src_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(entry.depth() == 1 && entry.file_name() == "bin"));
    for entry in walker {
        let entry = entry.map_err(|source| BuildError::Walk {
            path: src_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "rs") {
            continue;
        }
        let source = fs::read_to_string(path).map_err(|source| BuildError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file = syn::parse_file(&source).map_err(|error| BuildError::Parse {
            path: path.to_path_buf(),
            location: Location::of(error.span()),
            message: error.to_string(),
        })?;
        let package = module_path(src_dir, path);
        tracing::debug!(file = %path.display(), package = %package, "scanning");
        collect(&file.items, package, false, path, &mut index, &mut declarations);
    }
    for declaration in &mut declarations {
        declaration.context.resolve_globs(&index);
    }
    tracing::debug!(modules = index.len(), declarations = declarations.len(), "scan finished");
    Ok(declarations)
}

/// Module path of `file` inside the crate rooted at `src_dir`.
///
/// `lib.rs` and `main.rs` are the root (empty path), `a/mod.rs` is `a`, and
/// `a/b.rs` is `a::b`.
pub fn module_path(src_dir: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(src_dir).unwrap_or(file);
    let mut segments: Vec<String> = relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let is_root = segments.is_empty() && (stem == "lib" || stem == "main");
    if !is_root && stem != "mod" {
        segments.push(stem);
    }
    segments.join("::")
}

fn collect(
    items: &[Item],
    package: String,
    foreign: bool,
    file: &Path,
    index: &mut ModuleIndex,
    declarations: &mut Vec<Declaration>,
) {
    let context = SourceContext::from_items(Some(package.clone()), items).with_foreign(foreign);
    index.insert(&context);
    for item in items {
        if is_candidate(item) {
            declarations.push(Declaration {
                file: file.to_path_buf(),
                item: item.clone(),
                context: context.clone(),
            });
        }
        if let Item::Mod(module) = item {
            if let Some((_, content)) = &module.content {
                let name = module.ident.to_string();
                let child = if package.is_empty() {
                    name
                } else {
                    format!("{package}::{name}")
                };
                let foreign = foreign || module.attrs.iter().any(is_foreign_attribute);
                collect(content, child, foreign, file, index, declarations);
            }
        }
    }
}

/// Items marked `#[api]` or carrying HTTP-annotated functions.
///
/// Non-trait items are included so the extractor can reject them.
fn is_candidate(item: &Item) -> bool {
    match item {
        Item::Trait(item) => {
            item.attrs.iter().any(is_api_marker)
                || item.items.iter().any(|item| match item {
                    TraitItem::Fn(function) => function.attrs.iter().any(is_http_method_attribute),
                    _ => false,
                })
        }
        Item::Impl(item) => {
            item.attrs.iter().any(is_api_marker)
                || item.items.iter().any(|item| match item {
                    ImplItem::Fn(function) => function.attrs.iter().any(is_http_method_attribute),
                    _ => false,
                })
        }
        Item::Struct(item) => item.attrs.iter().any(is_api_marker),
        Item::Enum(item) => item.attrs.iter().any(is_api_marker),
        Item::Union(item) => item.attrs.iter().any(is_api_marker),
        _ => false,
    }
}
