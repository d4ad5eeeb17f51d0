pub mod commands;
pub mod diagnostics;
pub mod manifest;
pub mod marker;
pub mod requirement;
pub mod runtime;

/// Shared test helpers for mocking manifest files.
#[cfg(test)]
pub mod test_utils {
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    /// A mock runtime serving an in-memory set of manifest files.
    /// - `read_to_string` returns the given content per path
    /// - `exists` is true exactly for the given paths
    /// - `canonicalize` is a no-op passthrough
    pub fn manifest_runtime(files: Vec<(&'static str, &'static str)>) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        let known: Vec<PathBuf> = files.iter().map(|(path, _)| PathBuf::from(path)).collect();
        for (path, content) in files {
            runtime
                .expect_read_to_string()
                .with(eq(PathBuf::from(path)))
                .returning(move |_| Ok(content.to_string()));
        }
        runtime
            .expect_exists()
            .returning(move |path| known.contains(&path.to_path_buf()));
        runtime
            .expect_canonicalize()
            .returning(|path| Ok(path.to_path_buf()));
        runtime
    }
}
