//! Template tree embedded at compile time, used when no template directory is given.

pub struct BundledFile {
    /// Lookup path, `/`-separated, relative to the template root.
    pub path: &'static str,
    pub contents: &'static [u8],
}

macro_rules! bundle {
    ($($path:literal),* $(,)?) => {
        &[$(BundledFile {
            path: $path,
            contents: include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/", $path)),
        }),*]
    };
}

pub static FILES: &[BundledFile] = bundle![
    "common/.editorconfig",
    "common/.gitignore.tmpl",
    "common/LICENSE.tmpl",
    "common/README.md.tmpl",
    "typescript/package.json.tmpl",
    "typescript/tsconfig.json",
    "typescript/src/index.ts.tmpl",
    "typescript/src/i18n/locales.ts.tmpl",
    "typescript/src/tools/hello-world.ts",
    "typescript/test/index.test.ts.tmpl",
];

pub fn get(path: &str) -> Option<&'static BundledFile> {
    FILES.iter().find(|file| file.path == path)
}

/// Files under `tree/`, in lookup-path order.
pub fn under(tree: &str) -> Vec<&'static str> {
    let prefix = format!("{}/", tree.trim_end_matches('/'));
    let mut paths: Vec<_> = FILES
        .iter()
        .map(|file| file.path)
        .filter(|path| path.starts_with(&prefix))
        .collect();
    paths.sort_unstable();
    paths
}
