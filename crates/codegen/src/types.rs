//! Type and path resolution for extracted declarations.
//!
//! A trait is analysed in the context of the module that declares it: its
//! package, the `use` items in scope and the names of sibling items. Types are
//! recorded both as written and rewritten to crate-absolute paths so that
//! generated code can name them from any module of the crate.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use quote::ToTokens;
use syn::visit::{self, Visit};
use syn::visit_mut::{self, VisitMut};
use syn::{GenericArgument, Item, PathArguments, Type, UseTree};

/// Single-segment names that resolve through the language prelude.
const PRELUDE: [&str; 37] = [
    "Option", "Result", "String", "Vec", "Box", "Some", "None", "Ok", "Err", "Send", "Sync",
    "Sized", "Unpin", "Fn", "FnMut", "FnOnce", "ToString", "Clone", "Copy", "Default",
    "bool", "char", "str", "u8", "u16", "u32", "u64", "u128", "usize", "i8", "i16", "i32",
    "i64", "i128", "isize", "f32", "f64",
];

/// Crate name of the runtime.
pub const RUNTIME_CRATE: &str = "restfit";

/// Names the runtime exports from its root, as seen by `use restfit::*;`.
///
/// Kept in step with the `pub use` list of the `restfit` crate.
const RUNTIME_EXPORTS: [&str; 43] = [
    "Body", "Call", "CallConverterFactory", "CallResult", "Callback", "Client",
    "ConverterFactory", "ConverterRegistry", "Erased", "Flow", "FlowConverterFactory",
    "FromErased", "HttpMethod", "HttpRequest", "HttpRequestBuilder", "HttpResponse",
    "HttpTransport", "Part", "PreparedRequest", "RequestData", "RequestParameterConverter",
    "ReqwestTransport", "ResponseConverter", "Restfit", "RestfitBuilder", "RestfitError",
    "RestfitService", "Result", "SuspendCall", "SuspendResponseConverter", "TransportError",
    "TypeData", "call", "client", "converter", "errors", "flow", "request", "response",
    "service", "transport", "type_data", "downcast_value",
];

/// Fully qualified names of prelude types.
fn prelude_qualified(name: &str) -> Option<&'static str> {
    match name {
        "String" => Some("std::string::String"),
        "Vec" => Some("std::vec::Vec"),
        "Box" => Some("std::boxed::Box"),
        "Option" => Some("std::option::Option"),
        "Result" => Some("std::result::Result"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

/// One flattened `use` entry, with its path re-rooted at the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub path: String,
    pub alias: Option<String>,
    pub glob: bool,
}

impl Import {
    /// Name the import binds in its module, if any.
    pub fn visible_name(&self) -> Option<&str> {
        if self.glob {
            return None;
        }
        match &self.alias {
            Some(alias) if alias == "_" => None,
            Some(alias) => Some(alias),
            None => self.path.rsplit("::").next(),
        }
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if self.glob {
            f.write_str("::*")?;
        }
        if let Some(alias) = &self.alias {
            write!(f, " as {alias}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SourceContext
// ---------------------------------------------------------------------------

/// How the leading segment of a path resolves in a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Bound by an import; carries the crate-rooted path of the item.
    Imported(String),
    /// Declared in the module itself.
    Local,
    Prelude,
    /// The name of an external crate.
    Extern,
    /// Possibly brought in by a glob import whose contents are unknown.
    Unresolved,
}

/// Scope information for the module declaring an API trait.
#[derive(Debug, Clone, Default)]
pub struct SourceContext {
    /// Module path inside the crate, `None` when unknown (attribute macros).
    pub package: Option<String>,
    pub imports: Vec<Import>,
    /// Names of items declared directly in the module.
    pub local_items: BTreeSet<String>,
    /// Names bound by glob imports with a known target, and their paths.
    pub glob_items: BTreeMap<String, String>,
    /// Set when some glob import could not be listed.
    pub opaque_glob: bool,
    /// Set when an enclosing module is an FFI bridge.
    pub foreign: bool,
}

impl SourceContext {
    /// Builds the context of a module from its items.
    pub fn from_items(package: Option<String>, items: &[Item]) -> Self {
        let mut context = Self {
            package,
            ..Self::default()
        };
        for item in items {
            if let Some(name) = item_name(item) {
                context.local_items.insert(name);
            }
        }
        for item in items {
            if let Item::Use(item_use) = item {
                let mut prefix = Vec::new();
                if item_use.leading_colon.is_some() {
                    prefix.push(String::new());
                }
                context.flatten_use(&item_use.tree, &mut prefix);
            }
        }
        context.resolve_globs(&ModuleIndex::default());
        context
    }

    /// Lists the names bound by glob imports, using `index` for crate modules.
    ///
    /// `use restfit::*;` is always known. Any other glob whose target is not
    /// in `index`, or whose target has glob imports of its own, marks the
    /// context as having an opaque glob.
    pub fn resolve_globs(&mut self, index: &ModuleIndex) {
        let mut glob_items = BTreeMap::new();
        let mut opaque = false;
        for import in self.imports.iter().filter(|import| import.glob) {
            if import.path == RUNTIME_CRATE {
                for name in RUNTIME_EXPORTS {
                    glob_items
                        .entry(name.to_string())
                        .or_insert_with(|| format!("{RUNTIME_CRATE}::{name}"));
                }
                continue;
            }
            match index.module(&import.path) {
                Some(module) => {
                    for (name, path) in &module.names {
                        glob_items.entry(name.clone()).or_insert_with(|| path.clone());
                    }
                    opaque |= module.has_globs;
                }
                None => opaque = true,
            }
        }
        self.glob_items = glob_items;
        self.opaque_glob = opaque;
    }

    /// Resolves the leading segment `name` of a path.
    ///
    /// Named imports and local items shadow glob imports, which in turn
    /// shadow the prelude.
    pub fn resolve(&self, name: &str, single: bool) -> Resolution {
        if let Some(import) = self.lookup(name) {
            return Resolution::Imported(import.path.clone());
        }
        if self.local_items.contains(name) {
            return Resolution::Local;
        }
        if let Some(path) = self.glob_items.get(name) {
            return Resolution::Imported(path.clone());
        }
        if !single {
            Resolution::Extern
        } else if PRELUDE.contains(&name) {
            Resolution::Prelude
        } else if self.opaque_glob {
            Resolution::Unresolved
        } else {
            Resolution::Local
        }
    }

    /// Single-segment names in `ty` that may come from an opaque glob import.
    pub fn unresolved(&self, ty: &Type) -> Vec<String> {
        let mut collector = UnresolvedNames {
            context: self,
            names: Vec::new(),
        };
        collector.visit_type(ty);
        collector.names
    }

    /// Like [`Self::unresolved`], for a trait path.
    pub fn unresolved_path(&self, path: &syn::Path) -> Vec<String> {
        let mut collector = UnresolvedNames {
            context: self,
            names: Vec::new(),
        };
        collector.visit_path(path);
        collector.names
    }

    pub fn with_foreign(mut self, foreign: bool) -> Self {
        self.foreign = foreign;
        self
    }

    /// Path of the declaring module from the crate root, e.g. `crate::api`.
    pub fn module_path(&self) -> String {
        match self.package.as_deref() {
            None | Some("") => "crate".to_string(),
            Some(package) => format!("crate::{package}"),
        }
    }

    fn flatten_use(&mut self, tree: &UseTree, prefix: &mut Vec<String>) {
        match tree {
            UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.flatten_use(&path.tree, prefix);
                prefix.pop();
            }
            UseTree::Name(name) => {
                let ident = name.ident.to_string();
                if ident == "self" {
                    self.push_import(prefix, None, false);
                } else {
                    prefix.push(ident);
                    self.push_import(prefix, None, false);
                    prefix.pop();
                }
            }
            UseTree::Rename(rename) => {
                let alias = Some(rename.rename.to_string());
                let ident = rename.ident.to_string();
                if ident == "self" {
                    self.push_import(prefix, alias, false);
                } else {
                    prefix.push(ident);
                    self.push_import(prefix, alias, false);
                    prefix.pop();
                }
            }
            UseTree::Glob(_) => self.push_import(prefix, None, true),
            UseTree::Group(group) => {
                for tree in &group.items {
                    self.flatten_use(tree, prefix);
                }
            }
        }
    }

    fn push_import(&mut self, segments: &[String], alias: Option<String>, glob: bool) {
        if segments.is_empty() {
            return;
        }
        let path = self.normalize(segments).join("::");
        self.imports.push(Import { path, alias, glob });
    }

    /// Re-roots a `use` path at `crate` where it is crate-relative.
    fn normalize(&self, segments: &[String]) -> Vec<String> {
        let (root, rest) = match segments.first().map(String::as_str) {
            // Leading `::` names an external crate.
            Some("") => return segments[1..].to_vec(),
            Some("crate") => return segments.to_vec(),
            Some("self") => (self.module_path(), &segments[1..]),
            Some("super") => {
                let supers = segments.iter().take_while(|s| *s == "super").count();
                (self.ancestor_path(supers), &segments[supers..])
            }
            Some(first) if self.local_items.contains(first) => (self.module_path(), segments),
            _ => return segments.to_vec(),
        };
        let mut path: Vec<String> = root.split("::").map(String::from).collect();
        path.extend(rest.iter().cloned());
        path
    }

    /// Path of the module `levels` above the declaring one, never above `crate`.
    pub fn ancestor_path(&self, levels: usize) -> String {
        let module = self.module_path();
        let mut segments: Vec<&str> = module.split("::").collect();
        for _ in 0..levels {
            if segments.len() > 1 {
                segments.pop();
            }
        }
        segments.join("::")
    }

    /// Import binding `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&Import> {
        self.imports
            .iter()
            .find(|import| import.visible_name() == Some(name))
    }

    /// Renders `ty` with every path rewritten to be valid from any module.
    pub fn absolute(&self, ty: &Type) -> Type {
        let mut ty = ty.clone();
        Qualifier { context: self }.visit_type_mut(&mut ty);
        ty
    }

    /// Crate-absolute form of a trait or type path.
    pub fn absolute_path(&self, path: &syn::Path) -> syn::Path {
        let mut path = path.clone();
        Qualifier { context: self }.rewrite(&mut path);
        path
    }
}

// ---------------------------------------------------------------------------
// ModuleIndex
// ---------------------------------------------------------------------------

/// What a crate module offers to a glob import of it.
#[derive(Debug, Clone, Default)]
pub struct ModuleExports {
    /// Item and import names, with the crate-rooted path of each. Names from
    /// the runtime glob are included; other globs only set `has_globs`.
    pub names: BTreeMap<String, String>,
    pub has_globs: bool,
}

/// Exports of every module of a crate, keyed by `crate::...` path.
#[derive(Debug, Clone, Default)]
pub struct ModuleIndex {
    modules: BTreeMap<String, ModuleExports>,
}

impl ModuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the module described by `context`.
    pub fn insert(&mut self, context: &SourceContext) {
        let module_path = context.module_path();
        let mut exports = ModuleExports {
            has_globs: context
                .imports
                .iter()
                .any(|import| import.glob && import.path != RUNTIME_CRATE),
            ..ModuleExports::default()
        };
        for name in &context.local_items {
            exports.names.insert(name.clone(), format!("{module_path}::{name}"));
        }
        for import in &context.imports {
            if let Some(name) = import.visible_name() {
                exports
                    .names
                    .entry(name.to_string())
                    .or_insert_with(|| import.path.clone());
            }
        }
        for (name, path) in &context.glob_items {
            exports.names.entry(name.clone()).or_insert_with(|| path.clone());
        }
        self.modules.insert(module_path, exports);
    }

    pub fn module(&self, path: &str) -> Option<&ModuleExports> {
        self.modules.get(path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

fn item_name(item: &Item) -> Option<String> {
    let ident = match item {
        Item::Struct(item) => &item.ident,
        Item::Enum(item) => &item.ident,
        Item::Union(item) => &item.ident,
        Item::Trait(item) => &item.ident,
        Item::TraitAlias(item) => &item.ident,
        Item::Type(item) => &item.ident,
        Item::Mod(item) => &item.ident,
        Item::Const(item) => &item.ident,
        Item::Static(item) => &item.ident,
        Item::Fn(item) => &item.sig.ident,
        _ => return None,
    };
    Some(ident.to_string())
}

// ---------------------------------------------------------------------------
// Qualifier
// ---------------------------------------------------------------------------

struct Qualifier<'a> {
    context: &'a SourceContext,
}

impl Qualifier<'_> {
    fn rewrite(&self, path: &mut syn::Path) {
        if path.leading_colon.is_some() {
            return;
        }
        let Some(first) = path.segments.first().map(|s| s.ident.to_string()) else {
            return;
        };
        let single = path.segments.len() == 1;
        // Root replacing the first `consumed` segments; for imports and local
        // items the root ends with the item itself.
        let (root, consumed, carries_item) = match first.as_str() {
            "crate" | "Self" => return,
            "self" => (self.context.module_path(), 1, false),
            "super" => {
                let supers = path.segments.iter().take_while(|s| s.ident == "super").count();
                (self.context.ancestor_path(supers), supers, false)
            }
            _ => match self.context.resolve(&first, single) {
                Resolution::Imported(path) => (path, 1, true),
                Resolution::Local => (format!("{}::{first}", self.context.module_path()), 1, true),
                Resolution::Prelude | Resolution::Extern | Resolution::Unresolved => return,
            },
        };
        let Ok(root) = syn::parse_str::<syn::Path>(&root) else {
            return;
        };
        let mut segments = root.segments;
        if carries_item {
            if let Some(last) = segments.last_mut() {
                last.arguments = path.segments[0].arguments.clone();
            }
        }
        for segment in path.segments.iter().skip(consumed) {
            segments.push(segment.clone());
        }
        path.segments = segments;
    }
}

impl VisitMut for Qualifier<'_> {
    fn visit_type_path_mut(&mut self, node: &mut syn::TypePath) {
        if node.qself.is_none() {
            self.rewrite(&mut node.path);
        }
        visit_mut::visit_type_path_mut(self, node);
    }

    fn visit_trait_bound_mut(&mut self, node: &mut syn::TraitBound) {
        self.rewrite(&mut node.path);
        visit_mut::visit_trait_bound_mut(self, node);
    }
}

struct UnresolvedNames<'a> {
    context: &'a SourceContext,
    names: Vec<String>,
}

impl<'ast> Visit<'ast> for UnresolvedNames<'_> {
    fn visit_path(&mut self, path: &'ast syn::Path) {
        if path.leading_colon.is_none() {
            if let Some(first) = path.segments.first() {
                let name = first.ident.to_string();
                let single = path.segments.len() == 1;
                let keyword = matches!(name.as_str(), "crate" | "self" | "super" | "Self");
                if !keyword
                    && self.context.resolve(&name, single) == Resolution::Unresolved
                    && !self.names.contains(&name)
                {
                    self.names.push(name);
                }
            }
        }
        visit::visit_path(self, path);
    }
}

// ---------------------------------------------------------------------------
// TypeRef
// ---------------------------------------------------------------------------

/// A type as used in a declaration.
///
/// For `Option<T>` the description is that of `T` with `nullable` set;
/// `written` and `absolute` still render the full `Option<T>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub written: String,
    pub absolute: String,
    /// Written form of the non-optional type.
    pub base: String,
    pub qualified_name: String,
    pub nullable: bool,
    pub args: Vec<TypeRef>,
    pub is_reference: bool,
}

impl TypeRef {
    /// Describes `ty` in `context`.
    pub fn describe(ty: &Type, context: &SourceContext) -> Self {
        let written = tidy(&ty.to_token_stream().to_string());
        let absolute = tidy(&context.absolute(ty).to_token_stream().to_string());
        if let Some(inner) = option_inner(ty) {
            let mut described = Self::describe(inner, context);
            described.written = written;
            described.absolute = absolute;
            described.nullable = true;
            return described;
        }
        let is_reference = matches!(ty, Type::Reference(_));
        let (qualified_name, args) = match ty {
            Type::Path(type_path) if type_path.qself.is_none() => {
                let path = context.absolute_path(&type_path.path);
                let args = generic_types(&type_path.path)
                    .into_iter()
                    .filter(|arg| is_sized(arg))
                    .map(|arg| Self::describe(arg, context))
                    .collect();
                (qualified_path_name(&path), args)
            }
            Type::Tuple(tuple) if tuple.elems.is_empty() => ("()".to_string(), Vec::new()),
            Type::Paren(paren) => {
                let inner = Self::describe(&paren.elem, context);
                (inner.qualified_name, inner.args)
            }
            _ => (absolute.clone(), Vec::new()),
        };
        Self {
            base: written.clone(),
            written,
            absolute,
            qualified_name,
            nullable: false,
            args,
            is_reference,
        }
    }

    /// Last path segment of the qualified name.
    pub fn simple_name(&self) -> &str {
        self.qualified_name
            .rsplit("::")
            .next()
            .unwrap_or(&self.qualified_name)
    }

    /// Returns `true` for `Vec<_>`.
    pub fn is_vec(&self) -> bool {
        self.qualified_name == "std::vec::Vec"
    }

    /// `Vec<u8>`, which is sent as one value rather than per element.
    pub fn is_bytes(&self) -> bool {
        self.is_vec() && self.args.first().is_some_and(|arg| arg.qualified_name == "u8")
    }

    /// Returns `true` for `HashMap`, `BTreeMap` and `IndexMap`.
    pub fn is_map(&self) -> bool {
        matches!(self.simple_name(), "HashMap" | "BTreeMap" | "IndexMap") && self.args.len() == 2
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.written)
    }
}

/// Returns `T` of `Option<T>`.
pub fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let last = type_path.path.segments.last()?;
    if last.ident != "Option" {
        return None;
    }
    match generic_types(&type_path.path).as_slice() {
        [inner] => Some(inner),
        _ => None,
    }
}

/// Type arguments of the last segment of `path`.
pub fn generic_types(path: &syn::Path) -> Vec<&Type> {
    let Some(last) = path.segments.last() else {
        return Vec::new();
    };
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return Vec::new();
    };
    args.args
        .iter()
        .filter_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        })
        .collect()
}

fn is_sized(ty: &Type) -> bool {
    match ty {
        Type::TraitObject(_) | Type::ImplTrait(_) | Type::Slice(_) => false,
        Type::Path(path) => !path.path.is_ident("str"),
        _ => true,
    }
}

fn qualified_path_name(path: &syn::Path) -> String {
    let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
    if let [single] = segments.as_slice() {
        if let Some(qualified) = prelude_qualified(single) {
            return qualified.to_string();
        }
    }
    segments.join("::")
}

/// Normalises the spacing of a token string.
pub fn tidy(text: &str) -> String {
    const REPLACEMENTS: [(&str, &str); 12] = [
        (" :: ", "::"),
        (":: ", "::"),
        (" ::", "::"),
        (" < ", "<"),
        ("< ", "<"),
        (" <", "<"),
        (" >", ">"),
        (" ,", ","),
        ("& ", "&"),
        (" (", "("),
        ("( ", "("),
        (" )", ")"),
    ];
    let mut text = text.to_string();
    for (from, to) in REPLACEMENTS {
        while text.contains(from) {
            text = text.replace(from, to);
        }
    }
    text.replace(" ;", ";")
}
