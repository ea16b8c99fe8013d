use restfit_codegen::{extract, generate, messages, ClassData, InterfaceIndex, SourceContext};
use syn::parse_quote;

fn class_in(package: &str, source: syn::File) -> ClassData {
    let context = SourceContext::from_items(Some(package.into()), &source.items);
    let item = source
        .items
        .iter()
        .find(|item| matches!(item, syn::Item::Trait(_)))
        .expect("source declares a trait");
    extract(item, &context).expect("trait is valid")
}

fn users_api() -> ClassData {
    class_in(
        "api::users",
        parse_quote! {
            use crate::model::User;
            use restfit::{Flow, HttpRequestBuilder};

            pub trait UsersApi {
                #[get("users/{id}")]
                #[headers("Accept: application/json")]
                async fn user(
                    &self,
                    #[path("id")] id: u64,
                    #[header("Authorization")] token: Option<String>,
                    #[query("tag")] tags: Vec<String>,
                ) -> restfit::Result<User>;

                #[http("GET2", "user", true)]
                async fn custom(&self, #[body] user: User) -> Option<User>;

                #[get("users")]
                fn stream(&self) -> restfit::Result<Flow<User>>;

                #[post("users/{id}")]
                async fn configured(
                    &self,
                    #[path("id", encoded)] id: String,
                    #[req_builder] configure: Box<dyn FnOnce(&mut HttpRequestBuilder) + Send>,
                ) -> restfit::Result<()>;
            }
        },
    )
}

fn render(class: &ClassData, index: &InterfaceIndex) -> String {
    generate(class, index).expect("generation succeeds").contents
}

#[test]
fn output_is_deterministic() {
    let class = users_api();
    let index: InterfaceIndex = [class.clone()].into_iter().collect();
    assert_eq!(render(&class, &index), render(&users_api(), &index));
}

#[test]
fn file_layout_and_surface() {
    let class = users_api();
    let index: InterfaceIndex = [class.clone()].into_iter().collect();
    let source = generate(&class, &index).unwrap();
    assert_eq!(
        source.relative_path,
        std::path::PathBuf::from("api").join("users").join("_UsersApiImpl.rs")
    );
    let text = source.contents;
    assert!(text.starts_with("// Generated by restfit. Do not edit.\n"));
    assert!(text.contains("mod _users_api_impl {"));
    assert!(text.contains("    use super::*;"));
    assert!(text.contains("pub struct _UsersApiImpl {"));
    assert!(text.contains("impl UsersApi for _UsersApiImpl {"));
    assert!(text.contains("pub trait RestfitCreateUsersApi {"));
    assert!(text.contains("fn create_users_api(&self) -> _UsersApiImpl;"));
    assert!(text.contains("impl RestfitCreateUsersApi for ::restfit::Restfit {"));
    assert!(text.ends_with("pub use _users_api_impl::{RestfitCreateUsersApi, _UsersApiImpl};\n"));
    assert!(text.contains(
        "::restfit::internal::require_client(&self.restfit_client, \"_UsersApiImpl\")"
    ));
}

#[test]
fn function_body_applies_every_annotation() {
    let class = users_api();
    let index: InterfaceIndex = [class.clone()].into_iter().collect();
    let text = render(&class, &index);
    assert!(text.contains("async fn user(&self, id: u64, token: Option<String>, tags: Vec<String>) -> restfit::Result<User> {"));
    assert!(text.contains("let _relative_url = ::restfit::internal::substitute_path(\"users/{id}\", &["));
    assert!(text.contains("(\"id\", &id as &dyn ::std::fmt::Display, false),"));
    assert!(text.contains("::restfit::HttpMethod::parse(\"GET\"),"));
    assert!(text.contains("::restfit::type_data!(User, \"crate::model::User\", false),"));
    assert!(text.contains("_builder.header(\"Accept\", \"application/json\");"));
    assert!(text.contains("if let ::std::option::Option::Some(value) = &token {"));
    assert!(text.contains("_builder.header(\"Authorization\", value);"));
    assert!(text.contains("for item in &tags {"));
    assert!(text.contains("_builder.query(\"tag\", item);"));
    assert!(text.contains("_client.suspend_request::<User>(_request_data).await?"));
    assert!(text.contains(".ok_or_else(|| ::restfit::RestfitError::missing_value(\"crate::model::User\").into())"));
}

#[test]
fn custom_verb_keeps_token_and_body() {
    let class = users_api();
    let index: InterfaceIndex = [class.clone()].into_iter().collect();
    let text = render(&class, &index);
    assert!(text.contains("::restfit::HttpMethod::parse(\"GET2\"),"));
    assert!(text.contains("_builder.set_body(&user)?;"));
    assert!(text.contains("::restfit::type_data!(User, \"crate::model::User\", true),"));
    assert!(text.contains("_client.suspend_request::<User>(_request_data).await.ok().flatten()"));
}

#[test]
fn blocking_wrapper_types_describe_their_arguments() {
    let class = users_api();
    let index: InterfaceIndex = [class.clone()].into_iter().collect();
    let text = render(&class, &index);
    assert!(text.contains("fn stream(&self) -> restfit::Result<Flow<User>> {"));
    assert!(text.contains(
        "::restfit::type_data!(Flow<User>, \"restfit::Flow\", false, ::restfit::type_data!(User, \"crate::model::User\", false)),"
    ));
    assert!(text.contains("_client.request::<Flow<User>>(_request_data)?"));
}

#[test]
fn request_builder_runs_after_other_parameters() {
    let class = users_api();
    let index: InterfaceIndex = [class.clone()].into_iter().collect();
    let text = render(&class, &index);
    assert!(text.contains("(\"id\", &id as &dyn ::std::fmt::Display, true),"));
    let configured = &text[text.find("async fn configured").unwrap()..];
    assert!(configured.contains("configure(_builder);"));
    assert!(configured.contains("::restfit::type_data!((), \"()\", false),"));
}

#[test]
fn request_type_parameters_are_converted_first() {
    let class = class_in(
        "api",
        parse_quote! {
            pub trait SearchApi {
                #[get("search")]
                async fn search(&self, #[query("q")] #[request_type(String)] query: Query) -> Option<String>;
            }
        },
    );
    let index: InterfaceIndex = [class.clone()].into_iter().collect();
    let text = render(&class, &index);
    assert!(text.contains("let query: String = _client.convert_parameter_type::<String>("));
    assert!(text.contains("::std::boxed::Box::new(query),"));
    assert!(text.contains("&::restfit::type_data!(Query, \"crate::api::Query\", false),"));
    assert!(text.contains("&::restfit::type_data!(String, \"std::string::String\", false),"));
    assert!(text.contains(").ok()?;"));
    assert!(text.contains("_builder.query(\"q\", &query);"));
}

#[test]
fn properties_panic_when_used() {
    let class = class_in(
        "api",
        parse_quote! {
            pub trait VersionedApi {
                const VERSION: u32;

                #[get("v")]
                async fn v(&self) -> Option<String>;
            }
        },
    );
    let index: InterfaceIndex = [class.clone()].into_iter().collect();
    let text = render(&class, &index);
    assert!(text.contains(&format!(
        "const VERSION: u32 = panic!({:?});",
        messages::PROPERTIES_NOT_SUPPORTED
    )));
}

// ---------------------------------------------------------------------------
// Inheritance
// ---------------------------------------------------------------------------

fn hierarchy() -> (ClassData, ClassData, ClassData) {
    let root = class_in(
        "root",
        parse_quote! {
            pub trait RootApi {
                #[get("ping")]
                async fn ping(&self) -> Option<String>;
            }
        },
    );
    let base = class_in(
        "base",
        parse_quote! {
            use crate::root::RootApi;

            pub trait BaseApi: RootApi {
                #[get("users/{id}")]
                async fn user(&self, #[path("id")] id: Id) -> restfit::Result<User>;
            }
        },
    );
    let child = class_in(
        "child",
        parse_quote! {
            use crate::base::BaseApi;
            use crate::root::RootApi;

            pub trait ChildApi: BaseApi + RootApi + Send + Sync {
                #[get("orders")]
                fn orders(&self) -> Option<Vec<String>>;
            }
        },
    );
    (root, base, child)
}

#[test]
fn parents_are_held_as_delegates_and_forwarded() {
    let (root, base, child) = hierarchy();
    let index: InterfaceIndex = [root, base, child.clone()].into_iter().collect();
    let text = render(&child, &index);

    assert!(text.contains("base_api_delegate: crate::base::_BaseApiImpl,"));
    assert!(text.contains("root_api_delegate: crate::root::_RootApiImpl,"));
    assert!(text.contains(
        "::restfit::RestfitService::set_client(&mut self.base_api_delegate, ::std::clone::Clone::clone(&client));"
    ));
    assert!(text.contains("impl crate::base::BaseApi for _ChildApiImpl {"));
    assert!(text.contains(
        "async fn user(&self, id: crate::base::Id) -> restfit::Result<crate::base::User> {"
    ));
    assert!(text.contains(
        "<crate::base::_BaseApiImpl as crate::base::BaseApi>::user(&self.base_api_delegate, id).await"
    ));
    // RootApi is first reached through BaseApi.
    assert!(text.contains(
        "<crate::base::_BaseApiImpl as crate::root::RootApi>::ping(&self.base_api_delegate).await"
    ));
    assert_eq!(text.matches("impl crate::root::RootApi for _ChildApiImpl").count(), 1);
}

#[test]
fn unknown_parent_is_reported() {
    let (_, base, _) = hierarchy();
    let index: InterfaceIndex = [base.clone()].into_iter().collect();
    let diagnostics = generate(&base, &index).unwrap_err();
    assert!(diagnostics.contains("Parent interface crate::root::RootApi is not a restfit service"));
}

#[test]
fn byte_parts_are_sent_whole_and_maps_per_entry() {
    let class = class_in(
        "api",
        parse_quote! {
            use std::collections::HashMap;

            pub trait UploadApi {
                #[multipart]
                #[put("files/{name}")]
                async fn upload(
                    &self,
                    #[path("name")] name: String,
                    #[part("file", filename = "a.bin", content_type = "application/zip")] file: Vec<u8>,
                    #[part("notes")] notes: Vec<String>,
                ) -> restfit::Result<()>;

                #[form_url_encoded]
                #[post("files")]
                async fn describe(
                    &self,
                    #[field_map] fields: HashMap<String, String>,
                    #[header_map] headers: Option<HashMap<String, String>>,
                ) -> restfit::Result<()>;
            }
        },
    );
    let index: InterfaceIndex = [class.clone()].into_iter().collect();
    let text = render(&class, &index);
    assert!(text.contains(
        "_builder.part(::restfit::Part::new(\"file\", ::restfit::Body::from_value(&file)?).with_filename(\"a.bin\").with_content_type(\"application/zip\"));"
    ));
    assert!(text.contains("for item in &notes {"));
    assert!(text.contains("_builder.part(::restfit::Part::new(\"notes\", ::restfit::Body::from_value(item)?));"));
    assert!(text.contains("for (key, value) in &fields {"));
    assert!(text.contains("_builder.field(::std::string::ToString::to_string(key), value, false);"));
    assert!(text.contains("if let ::std::option::Option::Some(map) = &headers {"));
    assert!(text.contains("_builder.header(::std::string::ToString::to_string(key), value);"));
}
