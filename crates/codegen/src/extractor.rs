//! Interface extractor: validates one declaration and builds its [`ClassData`].
//!
//! Class-level rules run first and stop at the first violation. Function and
//! parameter rules are then all collected so a single run reports every
//! problem in the declaration.

use proc_macro2::Span;
use quote::ToTokens;
use syn::spanned::Spanned;
use syn::{
    Attribute, FnArg, GenericArgument, Item, ItemTrait, Pat, PathArguments, ReturnType as SynReturn,
    TraitItem, TraitItemFn, Type, TypeParamBound,
};

use crate::annotations::{
    parse_function_annotation, parse_parameter_annotation, FunctionAnnotation,
    HttpMethodAnnotation, ParameterAnnotation,
};
use crate::errors::{messages, Diagnostics, GenerationError, Location};
use crate::model::{
    ClassData, FunctionData, ParameterData, ParentInterface, PropertyData, ReturnShape, ReturnType,
};
use crate::types::{generic_types, tidy, SourceContext, TypeRef};

/// Supertraits that are bounds, not API parents.
const MARKER_TRAITS: [&str; 4] = ["Send", "Sync", "Unpin", "Sized"];

/// Extracts the model of `item` declared in `context`.
///
/// # Errors
///
/// Every violated rule, as one [`GenerationError`] each.
pub fn extract(item: &Item, context: &SourceContext) -> Result<ClassData, Diagnostics> {
    let mut extractor = Extractor::new(context);
    let class = extractor.class(item);
    match class {
        Some(class) if extractor.errors.is_empty() => Ok(class),
        _ => {
            let mut diagnostics = Diagnostics::new();
            for (span, message) in extractor.errors {
                diagnostics.push(GenerationError::new(message, Location::of(span)));
            }
            Err(diagnostics)
        }
    }
}

/// Validates `item` without module context, for the `#[api]` attribute.
///
/// The package rule is skipped since the module path is unknown there.
pub fn validate(item: &Item) -> Vec<syn::Error> {
    let context = SourceContext::default();
    let mut extractor = Extractor::new(&context);
    extractor.class(item);
    extractor
        .errors
        .into_iter()
        .map(|(span, message)| syn::Error::new(span, message))
        .collect()
}

/// Returns `true` for attributes that mark an FFI bridge.
pub fn is_foreign_attribute(attr: &Attribute) -> bool {
    let path: Vec<String> = attr
        .path()
        .segments
        .iter()
        .map(|s| s.ident.to_string())
        .collect();
    match path.as_slice() {
        [krate, name] if krate == "cxx" && name == "bridge" => true,
        [krate, name] if krate == "uniffi" && name == "export" => true,
        [.., last] => matches!(last.as_str(), "wasm_bindgen" | "pymodule" | "pyclass" | "napi"),
        [] => false,
    }
}

struct Extractor<'a> {
    context: &'a SourceContext,
    errors: Vec<(Span, String)>,
}

impl<'a> Extractor<'a> {
    fn new(context: &'a SourceContext) -> Self {
        Self {
            context,
            errors: Vec::new(),
        }
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.errors.push((span, message.into()));
    }

    /// Reports names that only an unlisted glob import could provide.
    ///
    /// Skipped without a module path, where no glob can be listed.
    fn require_resolved(&mut self, span: Span, names: Vec<String>) {
        if self.context.package.is_none() {
            return;
        }
        for name in names {
            self.error(span, format!("{} {name}", messages::NAME_NEEDS_A_NAMED_IMPORT));
        }
    }

    // -----------------------------------------------------------------------
    // Class
    // -----------------------------------------------------------------------

    fn class(&mut self, item: &Item) -> Option<ClassData> {
        if self.context.foreign || item_attrs(item).iter().any(is_foreign_attribute) {
            self.error(item_span(item), messages::FOREIGN_INTERFACES_ARE_NOT_SUPPORTED);
            return None;
        }
        let Item::Trait(item_trait) = item else {
            self.error(item_span(item), messages::API_DECLARATIONS_MUST_BE_INTERFACES);
            return None;
        };
        let name = item_trait.ident.to_string();
        if !item_trait.generics.params.is_empty() {
            self.error(
                item_trait.generics.span(),
                format!("{} {name}", messages::TYPE_PARAMETERS_ARE_UNSUPPORTED_ON),
            );
            return None;
        }
        if self.context.package.as_deref() == Some("") {
            self.error(item_trait.ident.span(), messages::INTERFACE_NEEDS_TO_HAVE_A_PACKAGE);
            return None;
        }
        if let Some(associated) = item_trait.items.iter().find_map(|item| match item {
            TraitItem::Type(associated) => Some(associated),
            _ => None,
        }) {
            self.error(
                associated.ident.span(),
                format!("{} {name}", messages::ASSOCIATED_TYPES_ARE_UNSUPPORTED_ON),
            );
            return None;
        }

        for bound in &item_trait.supertraits {
            if let TypeParamBound::Trait(bound) = bound {
                let unresolved = self.context.unresolved_path(&bound.path);
                self.require_resolved(bound.path.span(), unresolved);
            }
        }

        let mut functions = Vec::new();
        let mut properties = Vec::new();
        for trait_item in &item_trait.items {
            match trait_item {
                TraitItem::Fn(function) => {
                    if let Some(function) = self.function(function) {
                        functions.push(function);
                    }
                }
                TraitItem::Const(constant) if constant.default.is_none() => {
                    let unresolved = self.context.unresolved(&constant.ty);
                    self.require_resolved(constant.ty.span(), unresolved);
                    properties.push(PropertyData {
                        name: constant.ident.to_string(),
                        ty: TypeRef::describe(&constant.ty, self.context),
                    });
                }
                _ => {}
            }
        }

        Some(ClassData {
            name,
            package_name: self.context.package.clone().unwrap_or_default(),
            functions,
            imports: self.context.imports.clone(),
            parent_interfaces: self.parents(item_trait),
            properties,
            visibility: tidy(&item_trait.vis.to_token_stream().to_string()),
        })
    }

    fn parents(&self, item_trait: &ItemTrait) -> Vec<ParentInterface> {
        item_trait
            .supertraits
            .iter()
            .filter_map(|bound| match bound {
                TypeParamBound::Trait(bound) => Some(bound),
                _ => None,
            })
            .filter(|bound| matches!(bound.modifier, syn::TraitBoundModifier::None))
            .filter(|bound| {
                !MARKER_TRAITS
                    .iter()
                    .any(|marker| bound.path.is_ident(marker))
            })
            .filter_map(|bound| {
                let last = bound.path.segments.last()?;
                let absolute = self.context.absolute_path(&bound.path);
                let qualified_name = absolute
                    .segments
                    .iter()
                    .map(|s| s.ident.to_string())
                    .collect::<Vec<_>>()
                    .join("::");
                Some(ParentInterface {
                    name: last.ident.to_string(),
                    qualified_name,
                })
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Function
    // -----------------------------------------------------------------------

    fn function(&mut self, function: &TraitItemFn) -> Option<FunctionData> {
        let name = function.sig.ident.to_string();
        let span = function.sig.ident.span();

        let mut annotations = Vec::new();
        for attr in &function.attrs {
            match parse_function_annotation(attr) {
                Ok(Some(annotation)) => annotations.push(annotation),
                Ok(None) => {}
                Err(error) => self.error(error.span(), error.to_string()),
            }
        }
        let methods: Vec<&HttpMethodAnnotation> = annotations
            .iter()
            .filter_map(|annotation| match annotation {
                FunctionAnnotation::Http(http) => Some(http),
                _ => None,
            })
            .collect();

        let Some(&http) = methods.first() else {
            // Ordinary provided methods are left to the trait.
            if function.default.is_none() {
                self.error(span, format!("{} {name}", messages::NO_HTTP_ANNOTATION_AT));
            }
            return None;
        };
        let http = http.clone();
        if methods.len() > 1 {
            let found = methods
                .iter()
                .map(|method| method.label())
                .collect::<Vec<_>>()
                .join(", ");
            self.error(
                span,
                format!("{} {found} at {name}", messages::ONLY_ONE_HTTP_METHOD_IS_ALLOWED),
            );
        }

        let takes_ref_self = matches!(
            function.sig.inputs.first(),
            Some(FnArg::Receiver(receiver))
                if receiver.reference.is_some()
                    && receiver.mutability.is_none()
                    && receiver.colon_token.is_none()
        );
        if !takes_ref_self {
            self.error(span, messages::FUNCTIONS_MUST_TAKE_REF_SELF);
        }
        if !function.sig.generics.params.is_empty() {
            self.error(
                function.sig.generics.span(),
                format!("{} {name}", messages::TYPE_PARAMETERS_ARE_UNSUPPORTED_ON),
            );
        }
        if function.default.is_some() {
            self.error(span, messages::ANNOTATED_FUNCTIONS_MUST_NOT_HAVE_A_DEFAULT_BODY);
        }
        let return_type = self.return_type(function);

        let form = annotations.contains(&FunctionAnnotation::FormUrlEncoded);
        let multipart = annotations.contains(&FunctionAnnotation::Multipart);
        if form && multipart {
            self.error(span, messages::ONLY_ONE_ENCODING_ANNOTATION_IS_ALLOWED);
        }
        if form && !http.has_body {
            self.error(
                span,
                messages::FORM_URL_ENCODED_CAN_ONLY_BE_SPECIFIED_ON_HTTP_METHODS_WITH_REQUEST_BODY,
            );
        }
        if multipart && !http.has_body {
            self.error(
                span,
                messages::MULTIPART_CAN_ONLY_BE_SPECIFIED_ON_HTTP_METHODS_WITH_REQUEST_BODY,
            );
        }
        for annotation in &annotations {
            if let FunctionAnnotation::Headers(headers) = annotation {
                for header in headers {
                    let valid = header
                        .split_once(':')
                        .is_some_and(|(name, _)| !name.trim().is_empty());
                    if !valid {
                        self.error(
                            span,
                            format!("{} {header}", messages::HEADERS_VALUE_MUST_BE_IN_FORM),
                        );
                    }
                }
            }
        }

        let mut parameters = Vec::new();
        let mut spans = Vec::new();
        for input in function.sig.inputs.iter().skip(usize::from(takes_ref_self)) {
            let FnArg::Typed(typed) = input else {
                continue;
            };
            if let Some(parameter) = self.parameter(typed, &http, form, multipart) {
                spans.push(typed.span());
                parameters.push(parameter);
            }
        }
        self.function_parameters(&name, span, &http, form, &parameters, &spans);

        Some(FunctionData {
            name,
            parameters,
            annotations,
            return_type: return_type?,
            is_suspending: function.sig.asyncness.is_some(),
        })
    }

    fn return_type(&mut self, function: &TraitItemFn) -> Option<ReturnType> {
        let span = function.sig.output.span();
        let shape = match &function.sig.output {
            SynReturn::Type(_, ty) => match &**ty {
                Type::Path(type_path) if type_path.qself.is_none() => {
                    let last = type_path.path.segments.last();
                    let args = generic_types(&type_path.path);
                    match (last.map(|s| s.ident.to_string()).as_deref(), args.as_slice()) {
                        (Some("Result"), [inner, ..]) => Some((ReturnShape::Result, *inner, &**ty)),
                        (Some("Option"), [inner]) => Some((ReturnShape::Option, *inner, &**ty)),
                        _ => None,
                    }
                }
                _ => None,
            },
            SynReturn::Default => None,
        };
        let Some((shape, inner, ty)) = shape else {
            self.error(span, messages::RETURN_TYPE_MUST_BE_RESULT_OR_OPTION);
            return None;
        };
        let unresolved = self.context.unresolved(ty);
        self.require_resolved(span, unresolved);
        let mut inner = TypeRef::describe(inner, self.context);
        if shape == ReturnShape::Option {
            inner.nullable = true;
        }
        Some(ReturnType {
            shape,
            inner,
            written: tidy(&ty.to_token_stream().to_string()),
            absolute: tidy(&self.context.absolute(ty).to_token_stream().to_string()),
        })
    }

    /// Rules spanning several parameters of one function.
    fn function_parameters(
        &mut self,
        name: &str,
        span: Span,
        http: &HttpMethodAnnotation,
        form: bool,
        parameters: &[ParameterData],
        spans: &[Span],
    ) {
        let label = http.label();
        let url_count = parameters
            .iter()
            .filter(|p| matches!(p.role(), Some(ParameterAnnotation::Url)))
            .count();
        if url_count > 1 {
            self.error(span, messages::MULTIPLE_URL_METHOD_ANNOTATIONS_FOUND);
        }
        if url_count > 0 && !http.path.is_empty() {
            self.error(
                span,
                format!("{} @{label} URL value", messages::URL_CAN_ONLY_BE_USED_WITH_EMPTY),
            );
        }
        if url_count == 0 && http.path.is_empty() {
            self.error(
                span,
                format!(
                    "{} @{label} URL or @Url parameter",
                    messages::MISSING_EITHER_URL_OR_URL_PARAMETER
                ),
            );
        }
        if url_count > 0 {
            for (parameter, parameter_span) in parameters.iter().zip(spans) {
                if matches!(parameter.role(), Some(ParameterAnnotation::Path { .. })) {
                    self.error(
                        *parameter_span,
                        format!("{} @{label}", messages::PATH_CAN_ONLY_BE_USED_WITH_RELATIVE_URL_ON),
                    );
                }
            }
        }

        let builders: Vec<&str> = parameters
            .iter()
            .filter(|p| matches!(p.role(), Some(ParameterAnnotation::ReqBuilder)))
            .map(|p| p.name.as_str())
            .collect();
        if builders.len() > 1 {
            self.error(
                span,
                format!(
                    "{} {} at {name}",
                    messages::ONLY_ONE_REQUEST_BUILDER_IS_ALLOWED,
                    builders.join(", ")
                ),
            );
        }

        let has_field = parameters.iter().any(|p| {
            matches!(
                p.role(),
                Some(ParameterAnnotation::Field { .. } | ParameterAnnotation::FieldMap { .. })
            )
        });
        if form && !has_field {
            self.error(
                span,
                messages::FORM_ENCODED_METHOD_MUST_CONTAIN_AT_LEAST_ONE_FIELD_OR_FIELD_MAP,
            );
        }
    }

    // -----------------------------------------------------------------------
    // Parameter
    // -----------------------------------------------------------------------

    fn parameter(
        &mut self,
        typed: &syn::PatType,
        http: &HttpMethodAnnotation,
        form: bool,
        multipart: bool,
    ) -> Option<ParameterData> {
        let span = typed.span();
        let Pat::Ident(pat) = &*typed.pat else {
            self.error(span, messages::PARAMETERS_MUST_BE_PLAIN_IDENTIFIERS);
            return None;
        };
        if pat.by_ref.is_some() || pat.subpat.is_some() {
            self.error(span, messages::PARAMETERS_MUST_BE_PLAIN_IDENTIFIERS);
            return None;
        }
        let name = pat.ident.to_string();

        let mut annotations = Vec::new();
        for attr in &typed.attrs {
            match parse_parameter_annotation(attr) {
                Ok(Some(annotation)) => annotations.push(annotation),
                Ok(None) => {}
                Err(error) => self.error(error.span(), error.to_string()),
            }
        }
        let mut unresolved = self.context.unresolved(&typed.ty);
        for annotation in &annotations {
            if let ParameterAnnotation::RequestType(target) = annotation {
                unresolved.extend(self.context.unresolved(target));
            }
        }
        self.require_resolved(typed.ty.span(), unresolved);
        let ty = TypeRef::describe(&typed.ty, self.context);
        let request_type = annotations.iter().find_map(|annotation| match annotation {
            ParameterAnnotation::RequestType(target) => Some(TypeRef::describe(target, self.context)),
            _ => None,
        });
        let parameter = ParameterData {
            name: name.clone(),
            ty,
            annotations,
            request_type,
        };

        let roles = parameter.annotations.iter().filter(|a| a.is_role()).count();
        if roles == 0 {
            self.error(
                span,
                format!("{} {name}", messages::NO_RESTFIT_ANNOTATION_FOUND_AT_PARAMETER),
            );
        }
        if roles > 1 {
            let found = parameter
                .annotations
                .iter()
                .filter(|a| a.is_role())
                .map(ParameterAnnotation::label)
                .collect::<Vec<_>>()
                .join(", ");
            self.error(
                span,
                format!(
                    "{} {name}. Found: {found}",
                    messages::ONLY_ONE_ROLE_ANNOTATION_IS_ALLOWED_ON_PARAMETER
                ),
            );
        }
        if parameter.ty.is_reference {
            self.error(span, messages::REFERENCE_PARAMETERS_ARE_NOT_SUPPORTED);
        }

        let effective = parameter.effective_type();
        let mut problems: Vec<String> = Vec::new();
        for role in parameter.annotations.iter().filter(|a| a.is_role()) {
            match role {
                ParameterAnnotation::Path { name: placeholder, .. } => {
                    if !http.path.contains(&format!("{{{placeholder}}}")) {
                        problems.push(format!(
                            "Missing {{{placeholder}}} {}",
                            messages::IN_RELATIVE_URL_PATH
                        ));
                    }
                    if parameter.ty.nullable {
                        problems.push(messages::PATH_PARAMETER_TYPE_MAY_NOT_BE_NULLABLE.into());
                    }
                }
                ParameterAnnotation::Url => {
                    if parameter.ty.nullable {
                        problems.push(messages::URL_PARAMETER_TYPE_MAY_NOT_BE_NULLABLE.into());
                    }
                }
                ParameterAnnotation::Body => {
                    if !http.has_body {
                        problems.push(messages::NON_BODY_HTTP_METHOD_CANNOT_CONTAIN_BODY.into());
                    }
                    if form || multipart {
                        problems.push(
                            messages::BODY_PARAMETERS_CANNOT_BE_USED_WITH_FORM_OR_MULTI_PART_ENCODING
                                .into(),
                        );
                    }
                }
                ParameterAnnotation::Field { .. } => {
                    if !form {
                        problems.push(
                            messages::FIELD_PARAMETERS_CAN_ONLY_BE_USED_WITH_FORM_ENCODING.into(),
                        );
                    }
                }
                ParameterAnnotation::FieldMap { .. } => {
                    if !form {
                        problems.push(
                            messages::FIELD_PARAMETERS_CAN_ONLY_BE_USED_WITH_FORM_ENCODING.into(),
                        );
                    }
                    if !effective.is_map() {
                        problems.push(messages::FIELD_MAP_PARAMETER_TYPE_MUST_BE_MAP.into());
                    }
                }
                ParameterAnnotation::Part { .. } => {
                    if !multipart {
                        problems.push(
                            messages::PART_PARAMETERS_CAN_ONLY_BE_USED_WITH_MULTIPART_ENCODING.into(),
                        );
                    }
                }
                ParameterAnnotation::QueryMap { .. } => {
                    if !effective.is_map() {
                        problems.push(messages::QUERY_MAP_PARAMETER_TYPE_MUST_BE_MAP.into());
                    }
                }
                ParameterAnnotation::HeaderMap => {
                    if !effective.is_map() {
                        problems.push(messages::HEADER_MAP_PARAMETER_TYPE_MUST_BE_MAP.into());
                    }
                }
                ParameterAnnotation::ReqBuilder => {
                    if !is_request_builder_closure(&typed.ty) {
                        problems.push(messages::REQ_BUILDER_PARAMETER_TYPE_NEEDS_TO_BE.into());
                    }
                }
                ParameterAnnotation::Query { .. }
                | ParameterAnnotation::QueryName { .. }
                | ParameterAnnotation::Header { .. }
                | ParameterAnnotation::RequestType(_) => {}
            }
        }
        for problem in problems {
            self.error(span, problem);
        }
        Some(parameter)
    }
}

/// `Box<dyn FnOnce(&mut HttpRequestBuilder) + ...>`, or `FnMut` / `Fn`.
fn is_request_builder_closure(ty: &Type) -> bool {
    let Type::Path(type_path) = ty else {
        return false;
    };
    let Some(last) = type_path.path.segments.last() else {
        return false;
    };
    if last.ident != "Box" {
        return false;
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return false;
    };
    let Some(GenericArgument::Type(Type::TraitObject(object))) = args.args.first() else {
        return false;
    };
    object.bounds.iter().any(|bound| {
        let TypeParamBound::Trait(bound) = bound else {
            return false;
        };
        let Some(segment) = bound.path.segments.last() else {
            return false;
        };
        if !matches!(segment.ident.to_string().as_str(), "FnOnce" | "FnMut" | "Fn") {
            return false;
        }
        let PathArguments::Parenthesized(signature) = &segment.arguments else {
            return false;
        };
        let takes_builder = match signature.inputs.first() {
            Some(Type::Reference(reference)) if signature.inputs.len() == 1 => {
                reference.mutability.is_some()
                    && matches!(&*reference.elem, Type::Path(inner)
                        if inner.path.segments.last().is_some_and(|s| s.ident == "HttpRequestBuilder"))
            }
            _ => false,
        };
        takes_builder && matches!(signature.output, SynReturn::Default)
    })
}

fn item_attrs(item: &Item) -> &[Attribute] {
    match item {
        Item::Trait(item) => &item.attrs,
        Item::Struct(item) => &item.attrs,
        Item::Enum(item) => &item.attrs,
        Item::Union(item) => &item.attrs,
        Item::Impl(item) => &item.attrs,
        Item::Mod(item) => &item.attrs,
        Item::Fn(item) => &item.attrs,
        _ => &[],
    }
}

fn item_span(item: &Item) -> Span {
    match item {
        Item::Trait(item) => item.ident.span(),
        Item::Struct(item) => item.ident.span(),
        Item::Enum(item) => item.ident.span(),
        Item::Union(item) => item.ident.span(),
        Item::Impl(item) => item.self_ty.span(),
        other => other.span(),
    }
}
