use std::fs;
use std::path::Path;

use restfit_codegen::{BuildError, Builder, GeneratorConfig};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn crate_with(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (relative, contents) in files {
        write(dir.path(), relative, contents);
    }
    dir
}

const LIB: &str = "pub mod api;\npub mod model;\n";

const API: &str = r#"
use crate::model::User;

#[restfit::api]
pub trait UsersApi {
    #[get("users/{id}")]
    async fn user(&self, #[path("id")] id: u64) -> restfit::Result<User>;
}

pub mod admin {
    use super::UsersApi;

    #[restfit::api]
    pub trait AdminApi: UsersApi {
        #[delete("users/{id}")]
        async fn remove(&self, #[path("id")] id: u64) -> restfit::Result<()>;
    }
}
"#;

#[test]
fn generates_one_file_per_interface() {
    let dir = crate_with(&[("src/lib.rs", LIB), ("src/api.rs", API), ("src/model.rs", "pub struct User;")]);
    let out = dir.path().join("out");
    let written = Builder::new()
        .src_dir(dir.path().join("src"))
        .out_dir(&out)
        .generate()
        .unwrap();

    assert_eq!(
        written,
        vec![
            out.join("api").join("_UsersApiImpl.rs"),
            out.join("api").join("admin").join("_AdminApiImpl.rs"),
        ]
    );
    let admin = fs::read_to_string(&written[1]).unwrap();
    assert!(admin.contains("users_api_delegate: crate::api::_UsersApiImpl,"));
}

#[test]
fn rerunning_leaves_identical_output() {
    let dir = crate_with(&[("src/lib.rs", LIB), ("src/api.rs", API)]);
    let builder = Builder::new()
        .src_dir(dir.path().join("src"))
        .out_dir(dir.path().join("out"));
    let first = builder.generate().unwrap();
    let contents: Vec<String> = first.iter().map(|p| fs::read_to_string(p).unwrap()).collect();
    let second = builder.generate().unwrap();
    let again: Vec<String> = second.iter().map(|p| fs::read_to_string(p).unwrap()).collect();
    assert_eq!(first, second);
    assert_eq!(contents, again);
}

#[test]
fn errors_fail_the_whole_run_without_output() {
    let broken = r#"
pub trait BrokenApi {
    #[get("users")]
    #[post("users")]
    async fn users(&self) -> Option<String>;
}
"#;
    let dir = crate_with(&[("src/lib.rs", LIB), ("src/api.rs", API), ("src/broken.rs", broken)]);
    let out = dir.path().join("out");
    let error = Builder::new()
        .src_dir(dir.path().join("src"))
        .out_dir(&out)
        .generate()
        .unwrap_err();

    let BuildError::Diagnostics(diagnostics) = error else {
        panic!("expected diagnostics, got {error}");
    };
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics.contains("Only one HTTP method is allowed. Found: GET, POST at users"));
    let rendered = diagnostics.to_string();
    assert!(rendered.contains("broken.rs:"), "{rendered}");
    assert!(!out.exists());
}

#[test]
fn check_reports_the_model_without_writing() {
    let dir = crate_with(&[("src/lib.rs", LIB), ("src/api.rs", API)]);
    let out = dir.path().join("out");
    let classes = Builder::new()
        .src_dir(dir.path().join("src"))
        .out_dir(&out)
        .check()
        .unwrap();
    let names: Vec<String> = classes.iter().map(|c| c.qualified_name()).collect();
    assert_eq!(names, vec!["crate::api::UsersApi", "crate::api::admin::AdminApi"]);
    assert!(!out.exists());
}

#[test]
fn unparsable_sources_are_reported_with_their_path() {
    let dir = crate_with(&[("src/lib.rs", "pub trait {")]);
    let error = Builder::new()
        .src_dir(dir.path().join("src"))
        .out_dir(dir.path().join("out"))
        .check()
        .unwrap_err();
    assert!(matches!(error, BuildError::Parse { .. }));
    assert!(error.to_string().contains("lib.rs"));
}

#[test]
fn binaries_are_not_scanned() {
    let bin = r#"
pub trait Tool {
    #[get("x")]
    fn x(&self) -> String;
}
"#;
    let dir = crate_with(&[("src/lib.rs", LIB), ("src/api.rs", API), ("src/bin/tool.rs", bin)]);
    let classes = Builder::new()
        .src_dir(dir.path().join("src"))
        .out_dir(dir.path().join("out"))
        .check()
        .unwrap();
    assert_eq!(classes.len(), 2);
}

#[test]
fn builder_follows_config_directories() {
    let config = GeneratorConfig {
        src_dir: "custom/src".into(),
        out_dir: "custom/out".into(),
        ..GeneratorConfig::default()
    };
    let builder = Builder::from_config(&config);
    assert_eq!(builder.src(), Path::new("custom/src"));
    assert_eq!(builder.out(), Path::new("custom/out"));
}

#[test]
fn glob_imported_parents_and_models_resolve() {
    let api = r#"
pub mod users;
pub mod admin;
"#;
    let users = r#"
use restfit::*;
use crate::model::*;

#[restfit::api]
pub trait UsersApi {
    #[get("users/{id}")]
    async fn user(&self, #[path("id")] id: u64) -> Result<User>;

    #[get("users")]
    fn stream(&self) -> Result<Flow<Vec<User>>>;
}
"#;
    let admin = r#"
use super::users::*;

#[restfit::api]
pub trait AdminApi: UsersApi {
    #[delete("users/{id}")]
    async fn remove(&self, #[path("id")] id: u64) -> restfit::Result<()>;
}
"#;
    let dir = crate_with(&[
        ("src/lib.rs", LIB),
        ("src/api/mod.rs", api),
        ("src/api/users.rs", users),
        ("src/api/admin.rs", admin),
        ("src/model.rs", "pub struct User;"),
    ]);
    let out = dir.path().join("out");
    let written = Builder::new()
        .src_dir(dir.path().join("src"))
        .out_dir(&out)
        .generate()
        .unwrap();

    assert_eq!(written.len(), 2);
    let admin = fs::read_to_string(out.join("api").join("admin").join("_AdminApiImpl.rs")).unwrap();
    assert!(admin.contains("users_api_delegate: crate::api::users::_UsersApiImpl,"));
    assert!(admin.contains("-> restfit::Result<crate::model::User>"), "{admin}");
    assert!(admin.contains("-> restfit::Result<restfit::Flow<Vec<crate::model::User>>>"), "{admin}");
    let users = fs::read_to_string(out.join("api").join("users").join("_UsersApiImpl.rs")).unwrap();
    assert!(users.contains("\"restfit::Flow\""), "{users}");
}

#[test]
fn globs_outside_the_crate_need_named_imports() {
    let api = r#"
use restfit::*;
use shared_models::*;

#[restfit::api]
pub trait UsersApi {
    #[get("users/{id}")]
    async fn user(&self, #[path("id")] id: u64) -> Result<User>;
}
"#;
    let dir = crate_with(&[("src/lib.rs", LIB), ("src/api.rs", api)]);
    let error = Builder::new()
        .src_dir(dir.path().join("src"))
        .out_dir(dir.path().join("out"))
        .check()
        .unwrap_err();
    let BuildError::Diagnostics(diagnostics) = error else {
        panic!("expected diagnostics, got {error}");
    };
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics.contains("import it by name. Found: User"));
}
