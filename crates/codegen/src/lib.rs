//! Interface extractor and code generator for Restfit API traits.
//!
//! A crate declares its HTTP APIs as traits annotated with the restfit
//! attributes. This crate finds those traits, validates them, and writes a
//! `_<Name>Impl` implementation for each one that performs the calls through
//! the `restfit` runtime.
//!
//! The pipeline is:
//!
//! 1. [`scanner`] walks `src/` and collects candidate declarations with their
//!    module scope.
//! 2. [`extractor`] checks each declaration and builds a [`ClassData`], or
//!    reports every violated rule as [`Diagnostics`].
//! 3. [`generator`] renders each [`ClassData`] into source text.
//! 4. [`Builder`] ties the steps together for build scripts and the CLI.

pub mod annotations;
pub mod builder;
pub mod config;
pub mod errors;
pub mod extractor;
pub mod generator;
pub mod model;
pub mod scanner;
pub mod types;

pub use builder::Builder;
pub use config::GeneratorConfig;
pub use errors::{messages, BuildError, Diagnostics, GenerationError, Location};
pub use extractor::{extract, validate};
pub use generator::{generate, GeneratedSource, InterfaceIndex};
pub use model::{
    ClassData, FunctionData, ParameterData, ParentInterface, PropertyData, ReturnShape, ReturnType,
};
pub use types::{Import, ModuleIndex, Resolution, SourceContext, TypeRef};
