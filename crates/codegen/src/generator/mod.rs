//! Code generator: renders one [`ClassData`] into the source of its
//! `_<Name>Impl` implementation.
//!
//! Output depends only on the model and the interface index, so equal input
//! always yields byte-identical text.

mod emitter;
mod function;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use heck::ToSnakeCase;

use crate::errors::{messages, Diagnostics, GenerationError, Location};
use crate::model::ClassData;

use self::emitter::Emitter;
use self::function::{emit_forwarding, emit_function};

/// First line of every generated file.
pub const GENERATED_HEADER: &str = "// Generated by restfit. Do not edit.";

/// All extracted interfaces of a crate, keyed by qualified name.
#[derive(Debug, Clone, Default)]
pub struct InterfaceIndex {
    classes: BTreeMap<String, ClassData>,
}

impl InterfaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class: ClassData) {
        self.classes.insert(class.qualified_name(), class);
    }

    pub fn get(&self, qualified_name: &str) -> Option<&ClassData> {
        self.classes.get(qualified_name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassData> {
        self.classes.values()
    }
}

impl FromIterator<ClassData> for InterfaceIndex {
    fn from_iter<I: IntoIterator<Item = ClassData>>(iter: I) -> Self {
        let mut index = Self::new();
        for class in iter {
            index.insert(class);
        }
        index
    }
}

/// A rendered implementation and its path below the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    pub relative_path: PathBuf,
    pub contents: String,
}

/// An interface reached through the parent chain, with the direct parent
/// whose delegate implements it.
struct Ancestor<'a> {
    class: &'a ClassData,
    via: &'a ClassData,
}

/// Renders the implementation of `class`.
///
/// # Errors
///
/// A direct parent that is not in `index`.
pub fn generate(class: &ClassData, index: &InterfaceIndex) -> Result<GeneratedSource, Diagnostics> {
    let ancestors = resolve_ancestors(class, index)?;
    let direct: Vec<&ClassData> = class
        .parent_interfaces
        .iter()
        .filter_map(|parent| index.get(&parent.qualified_name))
        .collect();

    let impl_name = class.impl_name();
    let snake = class.name.to_snake_case();
    let module = format!("_{snake}_impl");
    let create_trait = format!("RestfitCreate{}", class.name);

    let mut out = Emitter::new();
    out.push_line(GENERATED_HEADER);
    out.blank();
    out.push_line("#[allow(warnings)]");
    out.open(&format!("mod {module} {{"));
    out.push_line("use super::*;");
    out.blank();

    // Struct and constructors.
    out.push_line("#[derive(Debug)]");
    out.open(&format!("pub struct {impl_name} {{"));
    out.push_line("restfit_client: ::std::option::Option<::restfit::Client>,");
    for parent in &direct {
        out.push_line(&format!(
            "{}: {},",
            delegate_field(parent),
            parent.qualified_impl_name()
        ));
    }
    out.close("}");
    out.blank();

    out.open(&format!("impl {impl_name} {{"));
    out.open("pub fn new() -> Self {");
    out.open("Self {");
    out.push_line("restfit_client: ::std::option::Option::None,");
    for parent in &direct {
        out.push_line(&format!(
            "{}: {}::new(),",
            delegate_field(parent),
            parent.qualified_impl_name()
        ));
    }
    out.close("}");
    out.close("}");
    out.blank();
    out.open("pub fn restfit_client(&self) -> &::restfit::Client {");
    out.push_line(&format!(
        "::restfit::internal::require_client(&self.restfit_client, {impl_name:?})"
    ));
    out.close("}");
    out.close("}");
    out.blank();

    out.open(&format!("impl ::std::default::Default for {impl_name} {{"));
    out.open("fn default() -> Self {");
    out.push_line("Self::new()");
    out.close("}");
    out.close("}");
    out.blank();

    out.open(&format!("impl ::restfit::RestfitService for {impl_name} {{"));
    out.open("fn set_client(&mut self, client: ::restfit::Client) {");
    for parent in &direct {
        out.push_line(&format!(
            "::restfit::RestfitService::set_client(&mut self.{}, ::std::clone::Clone::clone(&client));",
            delegate_field(parent)
        ));
    }
    out.push_line("self.restfit_client = ::std::option::Option::Some(client);");
    out.close("}");
    out.close("}");
    out.blank();

    // The trait itself.
    out.open(&format!("impl {} for {impl_name} {{", class.name));
    emit_properties(&mut out, class, false);
    for (position, function) in class.functions.iter().enumerate() {
        if position > 0 || !class.properties.is_empty() {
            out.blank();
        }
        emit_function(&mut out, function);
    }
    out.close("}");

    // Inherited traits, forwarded to the delegates.
    for ancestor in &ancestors {
        let trait_path = ancestor.class.qualified_name();
        let delegate_type = ancestor.via.qualified_impl_name();
        let field = delegate_field(ancestor.via);
        out.blank();
        out.open(&format!("impl {trait_path} for {impl_name} {{"));
        emit_properties(&mut out, ancestor.class, true);
        for (position, function) in ancestor.class.functions.iter().enumerate() {
            if position > 0 || !ancestor.class.properties.is_empty() {
                out.blank();
            }
            emit_forwarding(&mut out, function, &delegate_type, &trait_path, &field);
        }
        out.close("}");
    }
    out.blank();

    out.open(&format!("pub trait {create_trait} {{"));
    out.push_line(&format!("fn create_{snake}(&self) -> {impl_name};"));
    out.close("}");
    out.blank();
    out.open(&format!("impl {create_trait} for ::restfit::Restfit {{"));
    out.open(&format!("fn create_{snake}(&self) -> {impl_name} {{"));
    out.push_line(&format!("self.create({impl_name}::new())"));
    out.close("}");
    out.close("}");
    out.close("}");
    out.blank();

    let visibility = if class.visibility.is_empty() {
        String::new()
    } else {
        format!("{} ", class.visibility)
    };
    out.push_line(&format!(
        "{visibility}use {module}::{{{create_trait}, {impl_name}}};"
    ));

    let mut relative_path: PathBuf = class.package_name.split("::").collect();
    relative_path.push(format!("{impl_name}.rs"));
    Ok(GeneratedSource {
        relative_path,
        contents: out.finish(),
    })
}

fn delegate_field(parent: &ClassData) -> String {
    format!("{}_delegate", parent.name.to_snake_case())
}

fn emit_properties(out: &mut Emitter, class: &ClassData, absolute: bool) {
    for property in &class.properties {
        let ty = if absolute {
            &property.ty.absolute
        } else {
            &property.ty.written
        };
        out.push_line(&format!(
            "const {}: {ty} = panic!({:?});",
            property.name,
            messages::PROPERTIES_NOT_SUPPORTED
        ));
    }
}

/// Every interface above `class`, depth first in declaration order; an
/// interface reachable along several paths is kept on its first one.
fn resolve_ancestors<'a>(
    class: &'a ClassData,
    index: &'a InterfaceIndex,
) -> Result<Vec<Ancestor<'a>>, Diagnostics> {
    let mut diagnostics = Diagnostics::new();
    let mut seen = BTreeSet::from([class.qualified_name()]);
    let mut ancestors = Vec::new();
    for parent in &class.parent_interfaces {
        let Some(direct) = index.get(&parent.qualified_name) else {
            diagnostics.push(GenerationError::new(
                format!(
                    "{} {} {}",
                    messages::PARENT_INTERFACE,
                    parent.qualified_name,
                    messages::IS_NOT_A_RESTFIT_SERVICE
                ),
                Location::default(),
            ));
            continue;
        };
        let mut stack = vec![direct];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.qualified_name()) {
                continue;
            }
            ancestors.push(Ancestor {
                class: current,
                via: direct,
            });
            // Reverse so the first declared grandparent is visited first.
            for grandparent in current.parent_interfaces.iter().rev() {
                if let Some(found) = index.get(&grandparent.qualified_name) {
                    stack.push(found);
                }
            }
        }
    }
    if diagnostics.is_empty() {
        Ok(ancestors)
    } else {
        Err(diagnostics)
    }
}
