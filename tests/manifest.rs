use site_ship::contract::DeployableFile;
use site_ship::hasher::{build_manifest, hash_bytes, leading_slash};

fn file(path: &str, content: &str) -> DeployableFile {
    DeployableFile {
        path: path.to_string(),
        content: content.as_bytes().to_vec(),
    }
}

#[test]
fn digest_is_stable_across_calls() {
    let bytes = b"<h1>Hi</h1>";
    assert_eq!(hash_bytes(bytes), hash_bytes(bytes));
}

#[test]
fn digest_depends_on_bytes_not_path() {
    let files = [file("/a.txt", "same"), file("/b.txt", "same")];
    let manifest = build_manifest(&files).expect("manifest should build");
    assert_eq!(manifest.get("/a.txt"), manifest.get("/b.txt"));
}

#[test]
fn directory_index_maps_folder_forms() {
    let files = [file("/blog/index.html", "<p>posts</p>")];
    let manifest = build_manifest(&files).expect("manifest should build");

    let digest = manifest.get("/blog/index.html").expect("literal path");
    assert_eq!(manifest.get("/blog"), Some(digest));
    assert_eq!(manifest.get("/blog/"), Some(digest));
}

#[test]
fn root_index_injects_root_mapping() {
    // Scenario: /index.html (H1) + /style.css (H2) must yield exactly
    // {"/index.html": H1, "/style.css": H2, "/": H1}.
    let files = [
        file("/index.html", "<h1>Hi</h1>"),
        file("/style.css", "body{color:red}"),
    ];
    let manifest = build_manifest(&files).expect("manifest should build");

    let h1 = hash_bytes(b"<h1>Hi</h1>");
    let h2 = hash_bytes(b"body{color:red}");
    assert_eq!(manifest.len(), 3);
    assert_eq!(manifest.get("/index.html"), Some(&h1));
    assert_eq!(manifest.get("/style.css"), Some(&h2));
    assert_eq!(manifest.get("/"), Some(&h1));
}

#[test]
fn explicit_root_mapping_is_not_overwritten() {
    let files = [
        file("/", "explicit root"),
        file("/index.html", "<h1>Hi</h1>"),
    ];
    let manifest = build_manifest(&files).expect("manifest should build");
    assert_eq!(manifest.get("/"), Some(&hash_bytes(b"explicit root")));
}

#[test]
fn identical_content_is_not_a_collision() {
    // Same bytes at many paths share one digest; only differing bytes with
    // an equal digest would be an integrity violation.
    let files = [
        file("/a.txt", "same"),
        file("/b.txt", "same"),
        file("/c/same.txt", "same"),
    ];
    assert!(build_manifest(&files).is_ok());
}

#[test]
fn manifest_is_identical_for_identical_file_sets() {
    let files = [file("/index.html", "<h1>Hi</h1>"), file("/a.css", "a{}")];
    let first = build_manifest(&files).expect("manifest should build");
    let second = build_manifest(&files).expect("manifest should build");
    assert_eq!(first, second);
}

#[test]
fn paths_are_normalized_to_one_leading_slash() {
    assert_eq!(leading_slash("index.html"), "/index.html");
    assert_eq!(leading_slash("/index.html"), "/index.html");
    assert_eq!(leading_slash("//index.html"), "/index.html");

    let files = [file("index.html", "<h1>Hi</h1>")];
    let manifest = build_manifest(&files).expect("manifest should build");
    assert!(manifest.contains_key("/index.html"));
    assert!(manifest.contains_key("/"));
}
