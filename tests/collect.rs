use site_ship::collect::{collect, normalize_page_path};
use site_ship::contract::{MockProjectStore, ProjectKey, StoredPage};
use site_ship::error::DeployError;

fn page(path: &str, content: &str) -> StoredPage {
    StoredPage {
        path: path.to_string(),
        content: content.to_string(),
    }
}

#[test]
fn extensionless_page_paths_get_html_forced() {
    assert_eq!(normalize_page_path("about"), "/about.html");
    assert_eq!(normalize_page_path("/about"), "/about.html");
    assert_eq!(normalize_page_path("blog/post-1"), "/blog/post-1.html");
}

#[test]
fn paths_with_extensions_are_kept() {
    assert_eq!(normalize_page_path("/style.css"), "/style.css");
    assert_eq!(normalize_page_path("app.js"), "/app.js");
}

#[test]
fn trailing_slash_becomes_directory_index() {
    assert_eq!(normalize_page_path("/blog/"), "/blog/index.html");
}

#[tokio::test]
async fn collects_pages_and_injects_build_manifest() {
    let mut store = MockProjectStore::new();
    store.expect_list_pages().returning(|_| {
        Ok(vec![
            page("index", "<h1>Hi</h1>"),
            page("/style.css", "body{}"),
        ])
    });

    let files = collect(&store, &ProjectKey::Numeric(7))
        .await
        .expect("collect should succeed");

    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["/index.html", "/style.css", "/wrangler.toml"]);
}

#[tokio::test]
async fn existing_build_manifest_is_not_duplicated() {
    let mut store = MockProjectStore::new();
    store.expect_list_pages().returning(|_| {
        Ok(vec![
            page("/index.html", "<h1>Hi</h1>"),
            page("/wrangler.toml", "name = \"custom\"\n"),
        ])
    });

    let files = collect(&store, &ProjectKey::Numeric(7))
        .await
        .expect("collect should succeed");

    let manifests: Vec<_> = files
        .iter()
        .filter(|f| f.path == "/wrangler.toml")
        .collect();
    assert_eq!(manifests.len(), 1);
    assert_eq!(manifests[0].content, b"name = \"custom\"\n");
}

#[tokio::test]
async fn legacy_document_becomes_root_index() {
    let mut store = MockProjectStore::new();
    store.expect_list_pages().returning(|_| Ok(vec![]));
    store
        .expect_legacy_document()
        .returning(|_| Ok(Some("<html>legacy</html>".to_string())));

    let files = collect(&store, &ProjectKey::Text("legacy-1".into()))
        .await
        .expect("collect should succeed");

    assert_eq!(files[0].path, "/index.html");
    assert_eq!(files[0].content, b"<html>legacy</html>");
}

#[tokio::test]
async fn empty_project_is_nothing_to_deploy() {
    let mut store = MockProjectStore::new();
    store.expect_list_pages().returning(|_| Ok(vec![]));
    store.expect_legacy_document().returning(|_| Ok(None));

    let err = collect(&store, &ProjectKey::Numeric(7))
        .await
        .expect_err("empty project must be rejected");
    assert!(matches!(err, DeployError::NothingToDeploy));
}
