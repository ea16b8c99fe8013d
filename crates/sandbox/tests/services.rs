use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use restfit::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, Restfit, RestfitError, TransportError};
use restfit_sandbox::api::admin::{AdminApi, RestfitCreateAdminApi};
use restfit_sandbox::api::users::{RestfitCreateUsersApi, UsersApi, _UsersApiImpl};
use restfit_sandbox::model::{NewUser, SearchQuery, User, UserId};

const BASE_URL: &str = "https://users.example.com/v1/";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Reply = dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync;

/// Records every request and answers with `reply`.
struct RecordingTransport {
    reply: Box<Reply>,
    seen: Arc<Mutex<Vec<HttpRequest>>>,
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = (self.reply)(&request);
        self.seen.lock().unwrap().push(request);
        Ok(response)
    }
}

fn json(status: u16, body: &'static str) -> HttpResponse {
    HttpResponse::new(
        status,
        vec![("Content-Type".to_string(), "application/json".to_string())],
        body,
    )
}

fn octocat() -> HttpResponse {
    json(200, r#"{"id":1,"login":"octocat"}"#)
}

fn restfit_with<F>(reply: F) -> (Restfit, Arc<Mutex<Vec<HttpRequest>>>)
where
    F: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
{
    let seen = Arc::new(Mutex::new(Vec::new()));
    let transport = RecordingTransport {
        reply: Box::new(reply),
        seen: Arc::clone(&seen),
    };
    let restfit = Restfit::builder()
        .base_url(BASE_URL)
        .transport(transport)
        .converter_factory(restfit::FlowConverterFactory)
        .converter_factory(restfit_sandbox::converters::UserIdConverterFactory)
        .build()
        .unwrap();
    (restfit, seen)
}

fn body_text(request: &HttpRequest) -> String {
    String::from_utf8(request.body().unwrap().bytes().to_vec()).unwrap()
}

fn octocat_user() -> User {
    User {
        id: 1,
        login: "octocat".into(),
    }
}

// ---------------------------------------------------------------------------
// UsersApi
// ---------------------------------------------------------------------------

#[tokio::test]
async fn path_and_static_headers_are_applied() {
    let (restfit, seen) = restfit_with(|_| octocat());
    let api = restfit.create_users_api();

    let user = api.user(1).await.unwrap();

    assert_eq!(user, octocat_user());
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].method(), &HttpMethod::get());
    assert_eq!(seen[0].url().as_str(), "https://users.example.com/v1/users/1");
    assert_eq!(seen[0].header_values("Accept"), vec!["application/json"]);
}

#[tokio::test]
async fn nullable_function_returns_none_on_error_status() {
    let (restfit, _) = restfit_with(|_| json(404, r#"{"message":"Not Found"}"#));
    let api = restfit.create_users_api();

    assert_eq!(api.find_user(7).await, None);
    let error = api.user(7).await.unwrap_err();
    assert_eq!(error.status(), Some(404));
}

#[tokio::test]
async fn queries_and_optional_values_follow_declaration_order() {
    let (restfit, seen) = restfit_with(|_| json(200, "[]"));
    let api = restfit.create_users_api();
    let filters = BTreeMap::from([("sort".to_string(), "login".to_string())]);

    let users = api
        .search(
            "oct cat".into(),
            vec!["admin".into(), "staff".into()],
            None,
            filters,
            Some("Bearer t0k3n".into()),
        )
        .await
        .unwrap();

    assert!(users.is_empty());
    let seen = seen.lock().unwrap();
    assert_eq!(
        seen[0].url().query(),
        Some("q=oct%20cat&tag=admin&tag=staff&sort=login")
    );
    assert_eq!(seen[0].header_values("Authorization"), vec!["Bearer t0k3n"]);
}

#[tokio::test]
async fn absent_header_is_not_sent() {
    let (restfit, seen) = restfit_with(|_| json(200, "[]"));
    let api = restfit.create_users_api();

    api.search("x".into(), Vec::new(), Some(2), BTreeMap::new(), None)
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].url().query(), Some("q=x&page=2"));
    assert!(seen[0].header_values("Authorization").is_empty());
}

#[tokio::test]
async fn custom_verb_carries_a_json_body() {
    let (restfit, seen) = restfit_with(|_| json(200, r#"[{"id":1,"login":"octocat"}]"#));
    let api = restfit.create_users_api();

    let users = api
        .search_by_body(SearchQuery {
            login: "octo".into(),
            limit: 5,
        })
        .await;

    assert_eq!(users, Some(vec![octocat_user()]));
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].method().as_str(), "GET2");
    assert_eq!(seen[0].url().path(), "/v1/users/search");
    let body: serde_json::Value = serde_json::from_str(&body_text(&seen[0])).unwrap();
    assert_eq!(body, serde_json::json!({"login": "octo", "limit": 5}));
    assert_eq!(seen[0].header_values("Content-Type"), vec!["application/json"]);
}

#[tokio::test]
async fn request_type_argument_is_converted_before_use() {
    let (restfit, seen) = restfit_with(|_| octocat());
    let api = restfit.create_users_api();

    let user = api.lookup(UserId(42)).await;

    assert_eq!(user, Some(octocat_user()));
    assert_eq!(seen.lock().unwrap()[0].url().query(), Some("handle=user-42"));
}

#[tokio::test]
async fn missing_parameter_converter_yields_none_for_nullable() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let transport = RecordingTransport {
        reply: Box::new(|_| octocat()),
        seen: Arc::clone(&seen),
    };
    let restfit = Restfit::builder()
        .base_url(BASE_URL)
        .transport(transport)
        .build()
        .unwrap();

    assert_eq!(restfit.create_users_api().lookup(UserId(1)).await, None);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn url_argument_replaces_the_relative_url() {
    let (restfit, seen) = restfit_with(|_| HttpResponse::new(200, vec![], "pong"));
    let api = restfit.create_users_api();

    let text = api.fetch("https://status.example.com/ping".into()).await;

    assert_eq!(text.as_deref(), Some("pong"));
    assert_eq!(
        seen.lock().unwrap()[0].url().as_str(),
        "https://status.example.com/ping"
    );
}

#[tokio::test]
async fn request_builder_runs_last_and_may_override() {
    let (restfit, seen) = restfit_with(|_| octocat());
    let api = restfit.create_users_api();

    api.update(
        1,
        NewUser {
            login: "octocat".into(),
        },
        Box::new(|builder| {
            builder.method(HttpMethod::patch()).header("X-Trace", "abc");
        }),
    )
    .await
    .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].method(), &HttpMethod::patch());
    assert_eq!(seen[0].header_values("X-Trace"), vec!["abc"]);
    assert_eq!(body_text(&seen[0]), r#"{"login":"octocat"}"#);
}

#[tokio::test]
async fn blocking_function_returns_a_lazy_flow() {
    let (restfit, seen) = restfit_with(|_| json(200, r#"[{"id":1,"login":"octocat"}]"#));
    let api = restfit.create_users_api();

    let mut flow = api.stream().unwrap();
    assert!(seen.lock().unwrap().is_empty());

    let first = flow.next().await.unwrap().unwrap();
    assert_eq!(first, vec![octocat_user()]);
    assert!(flow.next().await.is_none());
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn blocking_function_without_converter_fails() {
    let restfit = Restfit::builder().base_url(BASE_URL).build().unwrap();
    let error = restfit.create_users_api().stream().unwrap_err();
    assert!(matches!(error, RestfitError::NoResponseConverter { .. }));
}

#[test]
#[should_panic(expected = "_UsersApiImpl")]
fn implementation_without_client_panics_on_use() {
    let api = _UsersApiImpl::new();
    let _ = api.stream();
}

// ---------------------------------------------------------------------------
// AdminApi
// ---------------------------------------------------------------------------

#[tokio::test]
async fn inherited_functions_issue_the_parent_request() {
    let (restfit, seen) = restfit_with(|_| octocat());

    let via_parent = restfit.create_users_api().user(1).await.unwrap();
    let via_child = restfit.create_admin_api().user(1).await.unwrap();

    assert_eq!(via_parent, via_child);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].method(), seen[1].method());
    assert_eq!(seen[0].url(), seen[1].url());
    assert_eq!(seen[0].headers(), seen[1].headers());
}

#[tokio::test]
async fn form_fields_are_url_encoded() {
    let (restfit, seen) = restfit_with(|_| json(200, r#"{"token":"abc"}"#));
    let api = restfit.create_admin_api();

    let token = api.login("octo cat".into(), "p&ss".into()).await.unwrap();

    assert_eq!(token.token, "abc");
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].method(), &HttpMethod::post());
    assert_eq!(body_text(&seen[0]), "username=octo%20cat&password=p%26ss");
    assert_eq!(
        seen[0].header_values("Content-Type"),
        vec!["application/x-www-form-urlencoded"]
    );
}

#[tokio::test]
async fn header_map_entries_are_sent() {
    let (restfit, seen) = restfit_with(|_| HttpResponse::new(204, vec![], ""));
    let api = restfit.create_admin_api();
    let headers = HashMap::from([("X-Reason".to_string(), "spam".to_string())]);

    api.remove(9, headers).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].method(), &HttpMethod::delete());
    assert_eq!(seen[0].url().path(), "/v1/users/9");
    assert_eq!(seen[0].header_values("X-Reason"), vec!["spam"]);
}

#[tokio::test]
async fn multipart_parts_keep_names_and_file_metadata() {
    let (restfit, seen) = restfit_with(|_| HttpResponse::new(200, vec![], ""));
    let api = restfit.create_admin_api();

    api.upload_avatar(3, "profile picture".into(), vec![0x89, b'P', b'N', b'G'])
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    let request = &seen[0];
    assert_eq!(request.method(), &HttpMethod::put());
    let content_type = request.header_values("Content-Type");
    assert!(content_type[0].starts_with("multipart/form-data; boundary="));
    let body = request.body().unwrap().bytes();
    let text = String::from_utf8_lossy(body);
    assert!(text.contains("Content-Disposition: form-data; name=\"description\"\r\n"));
    assert!(text.contains("profile picture"));
    assert!(text.contains(
        "Content-Disposition: form-data; name=\"avatar\"; filename=\"avatar.png\"\r\nContent-Type: image/png\r\n"
    ));
}

#[tokio::test]
async fn inherited_flow_function_uses_the_runtime_converter() {
    let (restfit, seen) = restfit_with(|_| json(200, r#"[{"id":1,"login":"octocat"}]"#));

    let mut flow = restfit.create_admin_api().stream().unwrap();

    assert_eq!(flow.next().await.unwrap().unwrap(), vec![octocat_user()]);
    assert_eq!(seen.lock().unwrap()[0].url().path(), "/v1/users");
}

/// Paths through the crate name keep working under a runtime glob import.
mod runtime_glob {
    use restfit::*;

    pub fn flow_client(base_url: &str) -> restfit::Result<Restfit> {
        Restfit::builder()
            .base_url(base_url)
            .converter_factory(FlowConverterFactory)
            .build()
    }
}

#[tokio::test]
async fn runtime_glob_import_keeps_the_crate_path() {
    let restfit = runtime_glob::flow_client(BASE_URL).unwrap();
    assert_eq!(restfit.converters().len(), 1);
    assert!(restfit.create_users_api().stream().is_ok());
}

#[tokio::test]
async fn sandbox_client_registers_its_converters() {
    let restfit = restfit_sandbox::client(BASE_URL).unwrap();
    assert_eq!(restfit.converters().len(), 2);
    assert!(restfit_sandbox::client("https://users.example.com/v1").is_err());
}
