use std::collections::BTreeMap;

use restfit::*;

use crate::model::*;

#[restfit::api]
pub trait UsersApi {
    #[get("users/{id}")]
    #[headers("Accept: application/json")]
    async fn user(&self, #[path("id")] id: u64) -> restfit::Result<User>;

    /// `None` for unknown users.
    #[get("users/{id}")]
    async fn find_user(&self, #[path("id")] id: u64) -> Option<User>;

    #[get("users")]
    async fn search(
        &self,
        #[query("q")] query: String,
        #[query("tag")] tags: Vec<String>,
        #[query("page")] page: Option<u32>,
        #[query_map] filters: BTreeMap<String, String>,
        #[header("Authorization")] token: Option<String>,
    ) -> restfit::Result<Vec<User>>;

    #[http("GET2", "users/search", true)]
    async fn search_by_body(&self, #[body] query: SearchQuery) -> Option<Vec<User>>;

    #[get("users/lookup")]
    async fn lookup(&self, #[query("handle")] #[request_type(String)] id: UserId) -> Option<User>;

    #[get]
    async fn fetch(&self, #[url] url: String) -> Option<String>;

    #[post("users/{id}")]
    async fn update(
        &self,
        #[path("id")] id: u64,
        #[body] user: NewUser,
        #[req_builder] configure: Box<dyn FnOnce(&mut HttpRequestBuilder) + Send>,
    ) -> restfit::Result<User>;

    #[get("users")]
    fn stream(&self) -> restfit::Result<Flow<Vec<User>>>;
}

restfit::include_generated!("api/users/_UsersApiImpl.rs");
