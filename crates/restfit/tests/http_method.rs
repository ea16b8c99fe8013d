use async_trait::async_trait;
use proptest::prelude::*;
use restfit::{
    HttpMethod, HttpRequest, HttpRequestBuilder, HttpResponse, HttpTransport, RequestData, Restfit,
    TransportError,
};
use std::sync::{Arc, Mutex};

/// Transport that remembers the method of the last request.
#[derive(Clone, Default)]
struct MethodRecorder(Arc<Mutex<Option<String>>>);

#[async_trait]
impl HttpTransport for MethodRecorder {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        *self.0.lock().unwrap() = Some(request.method().as_str().to_string());
        Ok(HttpResponse::new(200, vec![], ""))
    }
}

fn dispatch(verb: &str, with_body: bool) -> Option<String> {
    let recorder = MethodRecorder::default();
    let restfit = Restfit::builder()
        .base_url("https://api.example.com/")
        .transport(recorder.clone())
        .build()
        .unwrap();

    let data = RequestData::new(
        "things",
        HttpMethod::parse(verb),
        restfit::type_data!((), "()", false),
        move |builder: &mut HttpRequestBuilder| {
            if with_body {
                builder.set_body(&"payload".to_string())?;
            }
            Ok(())
        },
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime
        .block_on(restfit.client().suspend_request::<()>(data))
        .unwrap();

    let method = recorder.0.lock().unwrap().clone();
    method
}

#[test]
fn custom_verb_with_body_is_sent_verbatim() {
    assert_eq!(dispatch("GET2", true).as_deref(), Some("GET2"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_token_verb_is_preserved(verb in "[A-Za-z][A-Za-z0-9]{0,11}", with_body in any::<bool>()) {
        prop_assert_eq!(dispatch(&verb, with_body), Some(verb.clone()));
    }
}
