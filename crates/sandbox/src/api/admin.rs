use std::collections::HashMap;

use super::users::*;
use crate::model::Token;

#[restfit::api]
pub trait AdminApi: UsersApi {
    #[form_url_encoded]
    #[post("session")]
    async fn login(
        &self,
        #[field("username")] username: String,
        #[field("password")] password: String,
    ) -> restfit::Result<Token>;

    #[delete("users/{id}")]
    async fn remove(
        &self,
        #[path("id")] id: u64,
        #[header_map] headers: HashMap<String, String>,
    ) -> restfit::Result<()>;

    #[multipart]
    #[put("users/{id}/avatar")]
    async fn upload_avatar(
        &self,
        #[path("id")] id: u64,
        #[part("description")] description: String,
        #[part("avatar", filename = "avatar.png", content_type = "image/png")] avatar: Vec<u8>,
    ) -> restfit::Result<()>;
}

restfit::include_generated!("api/admin/_AdminApiImpl.rs");
