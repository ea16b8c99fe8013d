//! Runtime type descriptors.
//!
//! A [`TypeData`] describes the declared return type of a generated function
//! or the declared type of a converted parameter. Converter factories match on
//! it structurally: two descriptors are equal when their qualified names,
//! nullability and type arguments are equal.
//!
//! Because converters are looked up at runtime, their outputs travel through
//! the pipeline type-erased as [`Erased`] and are recovered with
//! [`downcast_value`]. Descriptors built through [`crate::type_data!`] also
//! carry two hooks captured at the call site where the concrete type is known:
//!
//! - a body decoder, present when the type implements `DeserializeOwned`;
//! - a shape assembler, present when the type implements [`FromErased`], used
//!   by converters that build wrapper types such as [`crate::Flow`].

use std::any::{type_name, Any, TypeId};
use std::fmt;

use crate::errors::{RestfitError, Result};
use crate::response::HttpResponse;

/// A type-erased converter output.
pub type Erased = Box<dyn Any + Send>;

/// Decodes a response body into an erased value of the described type.
pub type BodyDecoder = fn(&HttpResponse) -> Result<Erased>;

/// Builds an erased wrapper value from its erased parts.
pub type ShapeAssembler = fn(Erased) -> Result<Erased>;

// ---------------------------------------------------------------------------
// TypeData
// ---------------------------------------------------------------------------

/// Structural description of a Rust type as written in an API declaration.
#[derive(Clone)]
pub struct TypeData {
    qualified_name: String,
    nullable: bool,
    type_args: Vec<TypeData>,
    type_id: TypeId,
    rust_name: &'static str,
    decoder: Option<BodyDecoder>,
    assembler: Option<ShapeAssembler>,
}

impl TypeData {
    /// Creates a descriptor for `T` without decode or assemble hooks.
    ///
    /// `qualified_name` is the path of the outermost type without its generic
    /// arguments, e.g. `restfit::Flow` for `Flow<User>`.
    pub fn new<T: ?Sized + 'static>(
        qualified_name: impl Into<String>,
        nullable: bool,
        type_args: Vec<TypeData>,
    ) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            nullable,
            type_args,
            type_id: TypeId::of::<T>(),
            rust_name: type_name::<T>(),
            decoder: None,
            assembler: None,
        }
    }

    /// Attaches a body decoder.
    pub fn with_decoder(mut self, decoder: Option<BodyDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Attaches a shape assembler.
    pub fn with_assembler(mut self, assembler: Option<ShapeAssembler>) -> Self {
        self.assembler = assembler;
        self
    }

    /// Returns a copy with the given nullability.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn type_args(&self) -> &[TypeData] {
        &self.type_args
    }

    /// Returns the type argument at `index`, if present.
    pub fn type_arg(&self, index: usize) -> Option<&TypeData> {
        self.type_args.get(index)
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The compiler's name for the described type, for diagnostics only.
    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }

    /// Returns `true` when the described type is exactly `T`.
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Returns `true` when the qualified name (ignoring type arguments) matches.
    pub fn is_named(&self, qualified_name: &str) -> bool {
        self.qualified_name == qualified_name
    }

    /// Returns `true` when a body decoder was captured for this type.
    pub fn has_decoder(&self) -> bool {
        self.decoder.is_some()
    }

    /// Decodes `response` into the described type.
    pub fn decode(&self, response: &HttpResponse) -> Result<Erased> {
        match self.decoder {
            Some(decoder) => decoder(response),
            None => Err(RestfitError::Decode {
                type_name: self.to_string(),
                message: "type does not implement DeserializeOwned".to_string(),
            }),
        }
    }

    /// Assembles the described wrapper type from `parts`.
    ///
    /// Without an assembler the parts are returned unchanged.
    pub fn assemble(&self, parts: Erased) -> Result<Erased> {
        match self.assembler {
            Some(assembler) => assembler(parts),
            None => Ok(parts),
        }
    }
}

impl PartialEq for TypeData {
    fn eq(&self, other: &Self) -> bool {
        self.qualified_name == other.qualified_name
            && self.nullable == other.nullable
            && self.type_args == other.type_args
    }
}

impl Eq for TypeData {}

impl fmt::Debug for TypeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeData")
            .field("qualified_name", &self.qualified_name)
            .field("rust_name", &self.rust_name)
            .field("nullable", &self.nullable)
            .field("type_args", &self.type_args)
            .finish()
    }
}

/// Renders as `name<args>` with a trailing `?` for nullable descriptors.
impl fmt::Display for TypeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name)?;
        if !self.type_args.is_empty() {
            f.write_str("<")?;
            for (index, arg) in self.type_args.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Erased values
// ---------------------------------------------------------------------------

/// A wrapper type that converters can build from type-erased parts.
///
/// Implemented by [`crate::Flow`] and [`crate::Call`]; implement it for your
/// own wrapper to let a custom converter produce it without knowing its
/// concrete type parameter.
pub trait FromErased: Send + Sized + 'static {
    /// The erased value a converter hands over.
    type Parts: Send + 'static;

    fn from_erased(parts: Self::Parts) -> Self;
}

/// Recovers a concrete value from a converter output.
pub fn downcast_value<T: 'static>(value: Erased) -> Result<T> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| RestfitError::TypeMismatch {
            expected: type_name::<T>().to_string(),
        })
}

/// Shape assembler for `T`, captured by [`crate::type_data!`].
pub(crate) fn assemble_shape<T: FromErased>(parts: Erased) -> Result<Erased> {
    let parts = downcast_value::<T::Parts>(parts)?;
    Ok(Box::new(T::from_erased(parts)))
}
