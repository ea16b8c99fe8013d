//! Extracted declaration model consumed by the generator.

use crate::annotations::{FunctionAnnotation, HttpMethodAnnotation, ParameterAnnotation};
use crate::types::{Import, TypeRef};

/// One annotated API trait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassData {
    pub name: String,
    /// Module path of the trait, e.g. `api::github`.
    pub package_name: String,
    pub functions: Vec<FunctionData>,
    pub imports: Vec<Import>,
    pub parent_interfaces: Vec<ParentInterface>,
    pub properties: Vec<PropertyData>,
    /// Visibility of the trait as written, empty for private.
    pub visibility: String,
}

impl ClassData {
    /// `crate::<package>::<Name>`.
    pub fn qualified_name(&self) -> String {
        format!("crate::{}::{}", self.package_name, self.name)
    }

    /// Name of the generated implementation, `_<Name>Impl`.
    pub fn impl_name(&self) -> String {
        format!("_{}Impl", self.name)
    }

    /// `crate::<package>::_<Name>Impl`.
    pub fn qualified_impl_name(&self) -> String {
        format!("crate::{}::{}", self.package_name, self.impl_name())
    }
}

/// A supertrait of an API trait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentInterface {
    pub name: String,
    /// Crate-absolute path of the trait.
    pub qualified_name: String,
}

/// An associated const; never implemented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyData {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionData {
    pub name: String,
    pub parameters: Vec<ParameterData>,
    pub annotations: Vec<FunctionAnnotation>,
    pub return_type: ReturnType,
    pub is_suspending: bool,
}

impl FunctionData {
    /// The single HTTP method annotation of a validated function.
    pub fn http_method(&self) -> Option<&HttpMethodAnnotation> {
        self.annotations.iter().find_map(|annotation| match annotation {
            FunctionAnnotation::Http(http) => Some(http),
            _ => None,
        })
    }

    /// Static `#[headers]` entries in declaration order.
    pub fn static_headers(&self) -> impl Iterator<Item = &String> {
        self.annotations
            .iter()
            .filter_map(|annotation| match annotation {
                FunctionAnnotation::Headers(headers) => Some(headers),
                _ => None,
            })
            .flatten()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// `Result<T, E>`, absence of a value is an error.
    Result,
    /// `Option<T>`, every failure becomes `None`.
    Option,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnType {
    pub shape: ReturnShape,
    /// The `T` of the return shape.
    pub inner: TypeRef,
    pub written: String,
    pub absolute: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterData {
    pub name: String,
    pub ty: TypeRef,
    pub annotations: Vec<ParameterAnnotation>,
    /// Target of a `#[request_type]` conversion.
    pub request_type: Option<TypeRef>,
}

impl ParameterData {
    /// The role annotation of a validated parameter.
    pub fn role(&self) -> Option<&ParameterAnnotation> {
        self.annotations.iter().find(|annotation| annotation.is_role())
    }

    /// Type the argument has once any `#[request_type]` conversion is applied.
    pub fn effective_type(&self) -> &TypeRef {
        self.request_type.as_ref().unwrap_or(&self.ty)
    }
}
