//! Unit tests for generator dispatch and rendering against the bundled templates

use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};

use super::{GenerationContext, GeneratorError, Language, TemplateSource, bundled, create_generator};

fn templates() -> TemplateSource {
    TemplateSource::Bundled
}

/// The `templates/` directory the bundle is compiled from.
fn templates_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("templates")
}

fn files_under(root: &Path, dir: &Path, out: &mut Vec<String>) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files_under(root, &path, out);
        } else {
            let relative = path.strip_prefix(root).unwrap();
            let lookup: Vec<_> = relative.iter().map(|part| part.to_string_lossy()).collect();
            out.push(lookup.join("/"));
        }
    }
}

fn props(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("props must be an object"),
    }
}

fn full_props(name: &str) -> Map<String, Value> {
    props(json!({
        "name": name,
        "description": "A test plugin description",
        "author": "John Doe",
        "email": "john@example.com",
        "url": "https://github.com/john/test-plugin",
        "locales": ["en_US", "zh_Hans"],
        "language": "typescript",
        "type": "tool",
        "year": "2025",
        "date": "2025-01-19",
        "createdAt": "2025-01-19T00:00:00.000Z",
    }))
}

fn context(props: Map<String, Value>, target: &Path) -> GenerationContext {
    GenerationContext {
        props,
        target: target.to_path_buf(),
    }
}

#[test]
fn creates_typescript_generator() {
    let dir = tempfile::tempdir().unwrap();
    let generator = create_generator(
        "typescript",
        context(props(json!({ "name": "test-plugin" })), dir.path()),
        templates(),
    )
    .unwrap();
    assert_eq!(generator.language(), Language::TypeScript);
}

#[test]
fn rejects_unknown_language() {
    let dir = tempfile::tempdir().unwrap();
    let err = create_generator(
        "unsupported",
        context(Map::new(), dir.path()),
        templates(),
    )
    .err()
    .unwrap();
    assert!(matches!(&err, GeneratorError::Unsupported(id) if id == "unsupported"));
    assert_eq!(
        err.to_string(),
        "Plugin generator type \"unsupported\" is not implemented."
    );
}

#[test]
fn rejects_known_but_unimplemented_languages() {
    let dir = tempfile::tempdir().unwrap();
    for language in ["elixir", "python"] {
        let err = create_generator(language, context(Map::new(), dir.path()), templates())
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            format!("Plugin generator type \"{language}\" is not implemented.")
        );
    }
}

#[test]
fn groups_permissions_on_construction() {
    let dir = tempfile::tempdir().unwrap();
    let generator = create_generator(
        "typescript",
        context(
            props(json!({ "name": "p", "permissions": ["http:read", "http:write", "fs:read"] })),
            dir.path(),
        ),
        templates(),
    )
    .unwrap();

    assert_eq!(
        generator.context().props["permissions"],
        json!([
            { "scope": "fs", "entries": ["read"] },
            { "scope": "http", "entries": ["read", "write"] }
        ])
    );
}

#[test]
fn missing_permissions_become_empty_list() {
    let dir = tempfile::tempdir().unwrap();
    let generator = create_generator(
        "typescript",
        context(props(json!({ "name": "p" })), dir.path()),
        templates(),
    )
    .unwrap();
    assert_eq!(generator.context().props["permissions"], json!([]));
    assert_eq!(generator.context().props["language"], json!("typescript"));
}

#[tokio::test]
async fn generates_common_and_language_files() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("my-plugin");
    let generator = create_generator(
        "typescript",
        context(full_props("my-plugin"), &target),
        templates(),
    )
    .unwrap();

    generator.generate().await.unwrap();

    for file in [
        ".gitignore",
        ".editorconfig",
        "LICENSE",
        "README.md",
        "package.json",
        "tsconfig.json",
        "src/index.ts",
        "src/i18n/locales.ts",
        "src/tools/hello-world.ts",
        "test/index.test.ts",
    ] {
        assert!(target.join(file).is_file(), "{file} should exist");
    }
    assert!(!target.join("package.json.tmpl").exists());
}

#[tokio::test]
async fn renders_template_variables() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("test-plugin");
    create_generator(
        "typescript",
        context(full_props("test-plugin"), &target),
        templates(),
    )
    .unwrap()
    .generate()
    .await
    .unwrap();

    let package_json = std::fs::read_to_string(target.join("package.json")).unwrap();
    assert!(package_json.contains(r#""name": "test-plugin""#));
    assert!(package_json.contains(r#""author": "John Doe <john@example.com>""#));
    let parsed: Value = serde_json::from_str(&package_json).unwrap();
    assert_eq!(parsed["repository"], "https://github.com/john/test-plugin");

    let license = std::fs::read_to_string(target.join("LICENSE")).unwrap();
    assert!(license.contains("Copyright (c) 2025 John Doe"));

    let locales = std::fs::read_to_string(target.join("src/i18n/locales.ts")).unwrap();
    assert!(locales.contains("\"en_US\","));
    assert!(locales.contains("\"zh_Hans\","));
}

#[tokio::test]
async fn copies_static_files_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("copy-test");
    create_generator(
        "typescript",
        context(full_props("copy-test"), &target),
        templates(),
    )
    .unwrap()
    .generate()
    .await
    .unwrap();

    let expected = std::fs::read(templates_dir().join("common/.editorconfig")).unwrap();
    assert_eq!(std::fs::read(target.join(".editorconfig")).unwrap(), expected);
}

#[tokio::test]
async fn renders_permissions_into_entry_point() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("perm-plugin");
    let mut props = full_props("perm-plugin");
    props.insert("permissions".into(), json!(["net:fetch", "fs:read", "net:listen"]));

    create_generator("typescript", context(props, &target), templates())
        .unwrap()
        .generate()
        .await
        .unwrap();

    let index = std::fs::read_to_string(target.join("src/index.ts")).unwrap();
    let fs_at = index.find(r#"scope: "fs""#).unwrap();
    let net_at = index.find(r#"scope: "net""#).unwrap();
    assert!(fs_at < net_at);
    assert!(index.contains(r#"entries: ["fetch", "listen", ]"#));
}

#[tokio::test]
async fn values_are_not_html_escaped() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("escape-test");
    let mut props = full_props("escape-test");
    props.insert("author".into(), json!("Tom & Jerry <cartoons>"));

    create_generator("typescript", context(props, &target), templates())
        .unwrap()
        .generate()
        .await
        .unwrap();

    let license = std::fs::read_to_string(target.join("LICENSE")).unwrap();
    assert!(license.contains("Tom & Jerry <cartoons>"));
    assert!(!license.contains("&amp;"));
}

#[tokio::test]
async fn regenerating_overwrites_existing_files() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("again");
    std::fs::create_dir_all(&target).unwrap();
    std::fs::write(target.join("LICENSE"), "hand edited").unwrap();
    std::fs::write(target.join("NOTES.md"), "keep me").unwrap();

    create_generator("typescript", context(full_props("again"), &target), templates())
        .unwrap()
        .generate()
        .await
        .unwrap();

    let license = std::fs::read_to_string(target.join("LICENSE")).unwrap();
    assert!(license.starts_with("MIT License"));
    // files the templates don't produce are left alone
    assert_eq!(std::fs::read_to_string(target.join("NOTES.md")).unwrap(), "keep me");
}

#[tokio::test]
async fn custom_template_root() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("common/nested")).unwrap();
    std::fs::create_dir_all(root.path().join("typescript")).unwrap();
    std::fs::write(root.path().join("common/nested/a.txt.tmpl"), "<%= props.name %>").unwrap();
    std::fs::write(root.path().join("typescript/b.bin"), [0u8, 159, 146, 150]).unwrap();

    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("x");
    create_generator(
        "typescript",
        context(props(json!({ "name": "custom" })), &target),
        root.path(),
    )
    .unwrap()
    .generate()
    .await
    .unwrap();

    assert_eq!(std::fs::read_to_string(target.join("nested/a.txt")).unwrap(), "custom");
    assert_eq!(std::fs::read(target.join("b.bin")).unwrap(), vec![0u8, 159, 146, 150]);
}

#[tokio::test]
async fn missing_language_tree_is_an_io_error() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("common")).unwrap();

    let out = tempfile::tempdir().unwrap();
    let err = create_generator(
        "typescript",
        context(Map::new(), &out.path().join("x")),
        root.path(),
    )
    .unwrap()
    .generate()
    .await
    .unwrap_err();
    assert!(matches!(err, GeneratorError::Io { .. }));
}

#[test]
fn bundle_matches_templates_dir() {
    let root = templates_dir();
    let mut on_disk = Vec::new();
    files_under(&root, &root, &mut on_disk);
    on_disk.sort_unstable();

    let mut embedded: Vec<_> = bundled::FILES.iter().map(|file| file.path.to_string()).collect();
    embedded.sort_unstable();
    assert_eq!(embedded, on_disk);

    for file in bundled::FILES {
        assert_eq!(file.contents, std::fs::read(root.join(file.path)).unwrap(), "{}", file.path);
    }
}

#[test]
fn bundled_listing_is_per_tree() {
    let common = bundled::under("common");
    assert!(common.contains(&"common/LICENSE.tmpl"));
    assert!(common.iter().all(|path| path.starts_with("common/")));
    assert!(bundled::under("python").is_empty());
    assert!(bundled::get("typescript/tsconfig.json").is_some());
    assert!(bundled::get("typescript").is_none());
}

#[test]
fn template_source_conversions() {
    let dir = PathBuf::from("/opt/templates");
    assert_eq!(TemplateSource::from(dir.clone()), TemplateSource::Dir(dir.clone()));
    assert_eq!(TemplateSource::from(dir.as_path()), TemplateSource::Dir(dir));
    assert_eq!(TemplateSource::default(), TemplateSource::Bundled);
    assert_eq!(
        TemplateSource::Bundled.location("common/LICENSE.tmpl"),
        Path::new("<bundled>/common/LICENSE.tmpl")
    );
}

#[tokio::test]
async fn bundled_and_directory_output_match() {
    let out = tempfile::tempdir().unwrap();
    let from_bundle = out.path().join("bundled");
    let from_dir = out.path().join("dir");

    create_generator("typescript", context(full_props("same"), &from_bundle), templates())
        .unwrap()
        .generate()
        .await
        .unwrap();
    create_generator("typescript", context(full_props("same"), &from_dir), templates_dir())
        .unwrap()
        .generate()
        .await
        .unwrap();

    let mut bundled_files = Vec::new();
    files_under(&from_bundle, &from_bundle, &mut bundled_files);
    bundled_files.sort_unstable();
    let mut dir_files = Vec::new();
    files_under(&from_dir, &from_dir, &mut dir_files);
    dir_files.sort_unstable();
    assert_eq!(bundled_files, dir_files);

    for file in &bundled_files {
        assert_eq!(
            std::fs::read(from_bundle.join(file)).unwrap(),
            std::fs::read(from_dir.join(file)).unwrap(),
            "{file}"
        );
    }
}

#[test]
fn io_error_display_leaves_cause_to_the_chain() {
    let err = GeneratorError::io(Path::new("/tmp/out/LICENSE"))(std::io::Error::new(
        std::io::ErrorKind::Other,
        "disk full",
    ));
    assert_eq!(err.to_string(), "cannot access /tmp/out/LICENSE");

    let chain = format!("{:#}", anyhow::Error::new(err));
    assert_eq!(chain.matches("disk full").count(), 1);
}
