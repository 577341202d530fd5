//! Layered settings for pagestyle.
//!
//! Settings are merged from, in increasing priority:
//!
//! 1. compiled defaults,
//! 2. an optional configuration file (TOML, or YAML/JSON by extension),
//! 3. environment variables prefixed with `PAGESTYLE_` (e.g.
//!    `PAGESTYLE_UPLOAD_DIR`, `PAGESTYLE_ENABLED_TYPES=[post,page]`).
//!
//! # Example
//!
//! ```toml
//! upload_dir = "/var/www/html/wp-content/uploads"
//! upload_url = "https://example.com/wp-content/uploads"
//! directory = "custom-page-styles"
//! enabled_types = ["post", "page"]
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use pagestyle_publish::{DEFAULT_DIRECTORY, validate_directory_name};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

const ENV_PREFIX: &str = "PAGESTYLE_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Base upload directory of the host. Must be absolute.
    pub upload_dir: PathBuf,
    /// Public URL corresponding to `upload_dir`.
    pub upload_url: String,
    /// Name of the managed stylesheet directory inside `upload_dir`.
    pub directory: String,
    /// Content types whose items may carry custom styles.
    pub enabled_types: Vec<String>,
}
impl Default for Settings {
    fn default() -> Self {
        let upload_dir = project_dirs()
            .map(|dirs| dirs.data_dir().join("uploads"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/pagestyle/uploads"));
        Self {
            upload_dir,
            upload_url: "/uploads".to_string(),
            directory: DEFAULT_DIRECTORY.to_string(),
            enabled_types: vec!["post".to_string(), "page".to_string()],
        }
    }
}

impl Settings {
    /// Platform-specific location of the default configuration file.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// The merged configuration sources, before extraction.
    ///
    /// A missing file is not an error; its layer is simply empty.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = path {
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load and validate settings.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings: Settings = Self::figment(path).extract().or_raise(|| ErrorKind::Load)?;
        settings.validated()
    }

    /// Check invariants and normalize content type names.
    pub fn validated(mut self) -> Result<Self> {
        if !self.upload_dir.is_absolute() {
            exn::bail!(ErrorKind::RelativeUploadDir(self.upload_dir));
        }
        if self.upload_url.trim().is_empty() {
            exn::bail!(ErrorKind::EmptyUploadUrl);
        }
        validate_directory_name(&self.directory).or_raise(|| ErrorKind::InvalidDirectory(self.directory.clone()))?;

        let mut enabled = Vec::with_capacity(self.enabled_types.len());
        for name in self.enabled_types.iter().map(|name| sanitize_key(name)) {
            if !name.is_empty() && !enabled.contains(&name) {
                enabled.push(name);
            }
        }
        self.enabled_types = enabled;
        Ok(self)
    }

    /// Enabled content types that are actually registered on the host.
    ///
    /// Names that are configured but unknown are dropped with a warning.
    pub fn enabled_types_in(&self, registered: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
        let registered: Vec<String> = registered.into_iter().map(|r| r.as_ref().to_string()).collect();
        self.enabled_types
            .iter()
            .filter(|name| {
                let known = registered.contains(name);
                if !known {
                    tracing::warn!(content_type = %name, "Ignoring unregistered content type");
                }
                known
            })
            .cloned()
            .collect()
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "pagestyle")
}

/// Normalize a key the way the host does: lowercase, keeping only ASCII
/// letters, digits, `_` and `-`.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn settings() -> Settings {
        Settings {
            upload_dir: PathBuf::from("/srv/uploads"),
            upload_url: "https://example.com/uploads".to_string(),
            directory: DEFAULT_DIRECTORY.to_string(),
            enabled_types: vec!["post".to_string(), "page".to_string()],
        }
    }

    #[test]
    fn test_defaults() {
        let defaults = Settings::default();
        assert_eq!(defaults.directory, "custom-page-styles");
        assert_eq!(defaults.enabled_types, vec!["post", "page"]);
        assert!(defaults.upload_dir.is_absolute());
    }

    #[rstest]
    #[case("post", "post")]
    #[case("Page", "page")]
    #[case(" my_type-2 ", "my_type-2")]
    #[case("<script>", "script")]
    #[case("", "")]
    fn test_sanitize_key(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_key(input), expected);
    }

    #[test]
    fn test_validated_normalizes_types() {
        let mut s = settings();
        s.enabled_types = vec!["Post".into(), "post".into(), "!!".into(), "Landing_Page".into()];
        assert_eq!(s.validated().unwrap().enabled_types, vec!["post", "landing_page"]);
    }

    #[test]
    fn test_validated_rejects_bad_values() {
        let mut s = settings();
        s.upload_dir = PathBuf::from("relative/uploads");
        assert!(matches!(&*s.validated().unwrap_err(), ErrorKind::RelativeUploadDir(_)));

        let mut s = settings();
        s.directory = "../escape".to_string();
        assert!(matches!(&*s.validated().unwrap_err(), ErrorKind::InvalidDirectory(_)));

        let mut s = settings();
        s.upload_url = "  ".to_string();
        assert!(matches!(&*s.validated().unwrap_err(), ErrorKind::EmptyUploadUrl));
    }

    #[test]
    fn test_enabled_types_in() {
        let mut s = settings();
        s.enabled_types.push("product".to_string());
        assert_eq!(s.enabled_types_in(["page", "post", "attachment"]), vec!["post", "page"]);
    }

    #[test]
    fn test_load_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                "upload_dir = \"/srv/site/uploads\"\nupload_url = \"https://example.com/up\"\nenabled_types = [\"Page\"]\n",
            )?;
            let loaded = Settings::load(Some(Path::new("config.toml"))).unwrap();
            assert_eq!(loaded.upload_dir, PathBuf::from("/srv/site/uploads"));
            assert_eq!(loaded.upload_url, "https://example.com/up");
            assert_eq!(loaded.directory, DEFAULT_DIRECTORY);
            assert_eq!(loaded.enabled_types, vec!["page"]);
            Ok(())
        });
    }

    #[test]
    fn test_load_yaml_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "upload_dir: /srv/yaml\ndirectory: page-css\n")?;
            let loaded = Settings::load(Some(Path::new("config.yaml"))).unwrap();
            assert_eq!(loaded.upload_dir, PathBuf::from("/srv/yaml"));
            assert_eq!(loaded.directory, "page-css");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "upload_dir = \"/srv/site/uploads\"\ndirectory = \"from-file\"\n")?;
            jail.set_env("PAGESTYLE_DIRECTORY", "page-css");
            jail.set_env("PAGESTYLE_ENABLED_TYPES", "[page]");
            let loaded = Settings::load(Some(Path::new("config.toml"))).unwrap();
            assert_eq!(loaded.upload_dir, PathBuf::from("/srv/site/uploads"));
            assert_eq!(loaded.directory, "page-css");
            assert_eq!(loaded.enabled_types, vec!["page"]);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_relative_upload_dir() {
        Jail::expect_with(|jail| {
            jail.set_env("PAGESTYLE_UPLOAD_DIR", "relative/uploads");
            let err = Settings::load(None).unwrap_err();
            assert!(matches!(&*err, ErrorKind::RelativeUploadDir(_)));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_bad_directory_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("PAGESTYLE_UPLOAD_DIR", "/srv/uploads");
            jail.set_env("PAGESTYLE_DIRECTORY", "../escape");
            let err = Settings::load(None).unwrap_err();
            assert!(matches!(&*err, ErrorKind::InvalidDirectory(_)));
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_jail| {
            let loaded = Settings::load(Some(Path::new("absent.toml"))).unwrap();
            assert_eq!(loaded.directory, DEFAULT_DIRECTORY);
            assert_eq!(loaded.enabled_types, vec!["post", "page"]);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_file_fails_to_load() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "enabled_types = 12")?;
            let err = Settings::load(Some(Path::new("config.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Load));
            Ok(())
        });
    }
}
