//! Scope fixtures shared by integration tests
//!
//! - defaults.toml: site-wide defaults
//! - webservers.toml: group scope
//! - web01.json: host scope

use std::path::{Path, PathBuf};
use varscope::ScopeFiles;

/// Directory holding the scope fixtures
pub fn scopes_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/scopes")
}

/// Path to a named scope fixture
pub fn scope_path(name: &str) -> PathBuf {
    scopes_dir().join(name)
}

/// Defaults, one group and one host, in precedence order
pub fn web01_files() -> ScopeFiles {
    ScopeFiles {
        defaults: Some(scope_path("defaults.toml")),
        groups: vec![scope_path("webservers.toml")],
        host: Some(scope_path("web01.json")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_fixtures_exist() {
        for name in ["defaults.toml", "webservers.toml", "web01.json"] {
            let path = scope_path(name);
            assert!(path.exists(), "Scope fixture not found at {:?}", path);
        }
    }
}
