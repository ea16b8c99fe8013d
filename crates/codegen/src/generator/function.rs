//! Emission of one generated trait function.

use crate::annotations::ParameterAnnotation;
use crate::generator::emitter::Emitter;
use crate::model::{FunctionData, ParameterData, ReturnShape};
use crate::types::TypeRef;

const CLIENT: &str = "_client";
const URL: &str = "_relative_url";
const REQUEST: &str = "_request_data";
const BUILDER: &str = "_builder";
const PART_TYPE: &str = "restfit::Part";

/// Writes `fn` items implementing `function` against the service client.
pub(crate) fn emit_function(emitter: &mut Emitter, function: &FunctionData) {
    let Some(http) = function.http_method() else {
        return;
    };
    emitter.open(&format!("{} {{", signature(function, false)));
    emitter.push_line(&format!("let {CLIENT} = self.restfit_client();"));

    for parameter in &function.parameters {
        if let Some(target) = &parameter.request_type {
            emit_conversion(emitter, function, parameter, target);
        }
    }

    emit_relative_url(emitter, function, &http.path);

    emitter.open(&format!("let {REQUEST} = ::restfit::RequestData::new("));
    emitter.push_line(&format!("{URL},"));
    emitter.push_line(&format!("::restfit::HttpMethod::parse({:?}),", http.method));
    emitter.push_line(&format!("{},", type_data(&function.return_type.inner, false)));
    emitter.open(&format!(
        "move |{BUILDER}: &mut ::restfit::HttpRequestBuilder| -> ::restfit::Result<()> {{"
    ));
    emit_builder_body(emitter, function);
    emitter.push_line("::std::result::Result::Ok(())");
    emitter.close("},");
    emitter.close(");");

    emit_dispatch(emitter, function);
    emitter.close("}");
}

/// Writes a function forwarding to the implementation held in `delegate`.
pub(crate) fn emit_forwarding(
    emitter: &mut Emitter,
    function: &FunctionData,
    delegate_type: &str,
    trait_path: &str,
    delegate_field: &str,
) {
    emitter.open(&format!("{} {{", signature(function, true)));
    let arguments: Vec<&str> = function.parameters.iter().map(|p| p.name.as_str()).collect();
    let mut call = format!(
        "<{delegate_type} as {trait_path}>::{}(&self.{delegate_field}",
        function.name
    );
    for argument in arguments {
        call.push_str(", ");
        call.push_str(argument);
    }
    call.push(')');
    if function.is_suspending {
        call.push_str(".await");
    }
    emitter.push_line(&call);
    emitter.close("}");
}

/// `async fn name(&self, a: A) -> R`, with crate-absolute types when `absolute`.
fn signature(function: &FunctionData, absolute: bool) -> String {
    let mut text = String::new();
    if function.is_suspending {
        text.push_str("async ");
    }
    text.push_str("fn ");
    text.push_str(&function.name);
    text.push_str("(&self");
    for parameter in &function.parameters {
        let ty = if absolute {
            &parameter.ty.absolute
        } else {
            &parameter.ty.written
        };
        text.push_str(&format!(", {}: {ty}", parameter.name));
    }
    let output = if absolute {
        &function.return_type.absolute
    } else {
        &function.return_type.written
    };
    text.push_str(&format!(") -> {output}"));
    text
}

/// `::restfit::type_data!(..)` for `ty`.
///
/// Top-level return types are described by their non-optional form since the
/// dispatcher is asked for `T` and reports absence separately; parameters and
/// type arguments keep their full written type.
pub(crate) fn type_data(ty: &TypeRef, full_type: bool) -> String {
    let rust_type = if full_type { &ty.written } else { &ty.base };
    let mut text = format!(
        "::restfit::type_data!({rust_type}, {:?}, {}",
        ty.qualified_name, ty.nullable
    );
    for arg in &ty.args {
        text.push_str(", ");
        text.push_str(&type_data(arg, true));
    }
    text.push(')');
    text
}

fn emit_conversion(
    emitter: &mut Emitter,
    function: &FunctionData,
    parameter: &ParameterData,
    target: &TypeRef,
) {
    let failure = match function.return_type.shape {
        ReturnShape::Result => "?",
        ReturnShape::Option => ".ok()?",
    };
    emitter.open(&format!(
        "let {}: {} = {CLIENT}.convert_parameter_type::<{}>(",
        parameter.name, target.written, target.written
    ));
    emitter.push_line(&format!("::std::boxed::Box::new({}),", parameter.name));
    emitter.push_line(&format!("&{},", type_data(&parameter.ty, true)));
    emitter.push_line(&format!("&{},", type_data(target, true)));
    emitter.close(&format!("){failure};"));
}

fn emit_relative_url(emitter: &mut Emitter, function: &FunctionData, path: &str) {
    let url = function
        .parameters
        .iter()
        .find(|p| matches!(p.role(), Some(ParameterAnnotation::Url)));
    let substitutions: Vec<(&str, &str, bool)> = function
        .parameters
        .iter()
        .filter_map(|p| match p.role() {
            Some(ParameterAnnotation::Path { name, encoded }) => {
                Some((name.as_str(), p.name.as_str(), *encoded))
            }
            _ => None,
        })
        .collect();
    match url {
        Some(url) => emitter.push_line(&format!(
            "let {URL} = ::std::string::ToString::to_string(&{});",
            url.name
        )),
        None if substitutions.is_empty() => {
            emitter.push_line(&format!("let {URL} = ::std::string::String::from({path:?});"));
        }
        None => {
            emitter.open(&format!("let {URL} = ::restfit::internal::substitute_path({path:?}, &["));
            for (placeholder, argument, encoded) in substitutions {
                emitter.push_line(&format!(
                    "({placeholder:?}, &{argument} as &dyn ::std::fmt::Display, {encoded}),"
                ));
            }
            emitter.close("]);");
        }
    }
}

fn emit_builder_body(emitter: &mut Emitter, function: &FunctionData) {
    for header in function.static_headers() {
        if let Some((name, value)) = header.split_once(':') {
            emitter.push_line(&format!(
                "{BUILDER}.header({:?}, {:?});",
                name.trim(),
                value.trim()
            ));
        }
    }
    for parameter in &function.parameters {
        let Some(role) = parameter.role() else {
            continue;
        };
        let name = parameter.name.as_str();
        let ty = parameter.effective_type();
        match role {
            ParameterAnnotation::Header { name: header } => {
                for_each_value(emitter, ty, name, |value| {
                    format!("{BUILDER}.header({header:?}, {value});")
                });
            }
            ParameterAnnotation::Query { name: query, encoded } => {
                let method = if *encoded { "encoded_query" } else { "query" };
                for_each_value(emitter, ty, name, |value| {
                    format!("{BUILDER}.{method}({query:?}, {value});")
                });
            }
            ParameterAnnotation::QueryName { encoded } => {
                for_each_value(emitter, ty, name, |value| {
                    format!("{BUILDER}.query_name({value}, {encoded});")
                });
            }
            ParameterAnnotation::QueryMap { encoded } => {
                let method = if *encoded { "encoded_query" } else { "query" };
                for_each_entry(emitter, ty, name, |key, value| {
                    format!("{BUILDER}.{method}(::std::string::ToString::to_string({key}), {value});")
                });
            }
            ParameterAnnotation::HeaderMap => {
                for_each_entry(emitter, ty, name, |key, value| {
                    format!("{BUILDER}.header(::std::string::ToString::to_string({key}), {value});")
                });
            }
            ParameterAnnotation::FieldMap { encoded } => {
                for_each_entry(emitter, ty, name, |key, value| {
                    format!(
                        "{BUILDER}.field(::std::string::ToString::to_string({key}), {value}, {encoded});"
                    )
                });
            }
            ParameterAnnotation::Field { name: field, encoded } => {
                for_each_value(emitter, ty, name, |value| {
                    format!("{BUILDER}.field({field:?}, {value}, {encoded});")
                });
            }
            ParameterAnnotation::Body => {
                emitter.push_line(&format!("{BUILDER}.set_body(&{name})?;"));
            }
            ParameterAnnotation::Part {
                name: part,
                content_type,
                filename,
            } => {
                if is_part(ty) {
                    emit_owned_parts(emitter, ty, name);
                } else {
                    let mut options = String::new();
                    if let Some(filename) = filename {
                        options.push_str(&format!(".with_filename({filename:?})"));
                    }
                    if let Some(content_type) = content_type {
                        options.push_str(&format!(".with_content_type({content_type:?})"));
                    }
                    for_each_value(emitter, ty, name, |value| {
                        format!(
                            "{BUILDER}.part(::restfit::Part::new({part:?}, ::restfit::Body::from_value({value})?){options});"
                        )
                    });
                }
            }
            ParameterAnnotation::Path { .. }
            | ParameterAnnotation::Url
            | ParameterAnnotation::ReqBuilder
            | ParameterAnnotation::RequestType(_) => {}
        }
    }
    for parameter in &function.parameters {
        if matches!(parameter.role(), Some(ParameterAnnotation::ReqBuilder)) {
            // `FnMut` closures need a mutable binding.
            emitter.push_line(&format!("let mut {0} = {0};", parameter.name));
            emitter.push_line(&format!("{}({BUILDER});", parameter.name));
        }
    }
}

/// Emits `line(value)` for each value of `name`: once for plain values, per
/// element for `Vec` other than `Vec<u8>`, and only when present for `Option`.
/// `value` is always a reference expression.
fn for_each_value(emitter: &mut Emitter, ty: &TypeRef, name: &str, line: impl Fn(&str) -> String) {
    let mut depth = 0;
    let mut value = format!("&{name}");
    if ty.nullable {
        emitter.open(&format!("if let ::std::option::Option::Some(value) = {value} {{"));
        value = "value".to_string();
        depth += 1;
    }
    if ty.is_vec() && !ty.is_bytes() {
        emitter.open(&format!("for item in {value} {{"));
        value = "item".to_string();
        depth += 1;
    }
    emitter.push_line(&line(&value));
    for _ in 0..depth {
        emitter.close("}");
    }
}

/// Emits `line(key, value)` for each entry of the map `name`.
fn for_each_entry(
    emitter: &mut Emitter,
    ty: &TypeRef,
    name: &str,
    line: impl Fn(&str, &str) -> String,
) {
    let mut source = format!("&{name}");
    if ty.nullable {
        emitter.open(&format!("if let ::std::option::Option::Some(map) = {source} {{"));
        source = "map".to_string();
    }
    emitter.open(&format!("for (key, value) in {source} {{"));
    emitter.push_line(&line("key", "value"));
    emitter.close("}");
    if ty.nullable {
        emitter.close("}");
    }
}

/// Returns `true` for `restfit::Part` and `Vec<restfit::Part>`.
fn is_part(ty: &TypeRef) -> bool {
    ty.qualified_name == PART_TYPE
        || (ty.is_vec() && ty.args.first().is_some_and(|arg| arg.qualified_name == PART_TYPE))
}

/// Parts given as `restfit::Part` values are moved into the request.
fn emit_owned_parts(emitter: &mut Emitter, ty: &TypeRef, name: &str) {
    let mut depth = 0;
    let mut source = name.to_string();
    if ty.nullable {
        emitter.open(&format!("if let ::std::option::Option::Some(value) = {source} {{"));
        source = "value".to_string();
        depth += 1;
    }
    if ty.is_vec() {
        emitter.open(&format!("for part in {source} {{"));
        source = "part".to_string();
        depth += 1;
    }
    emitter.push_line(&format!("{BUILDER}.part({source});"));
    for _ in 0..depth {
        emitter.close("}");
    }
}

fn emit_dispatch(emitter: &mut Emitter, function: &FunctionData) {
    let inner = &function.return_type.inner;
    let (method, awaited) = if function.is_suspending {
        ("suspend_request", ".await")
    } else {
        ("request", "")
    };
    let call = format!("{CLIENT}.{method}::<{}>({REQUEST}){awaited}", inner.base);
    match function.return_type.shape {
        ReturnShape::Option => emitter.push_line(&format!("{call}.ok().flatten()")),
        ReturnShape::Result if inner.nullable => {
            emitter.push_line(&format!("::std::result::Result::Ok({call}?)"));
        }
        ReturnShape::Result => {
            emitter.push_line(&format!("{call}?"));
            emitter.push_line(&format!(
                "    .ok_or_else(|| ::restfit::RestfitError::missing_value({:?}).into())",
                inner.qualified_name
            ));
        }
    }
}
