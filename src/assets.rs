/// Handle prefix for an item's own stylesheet.
pub const OWN_HANDLE_PREFIX: &str = "custom-page-styles-";
/// Handle prefix for a borrowed stylesheet.
pub const BORROWED_HANDLE_PREFIX: &str = "custom-page-styles-selected-";

/// Where the host collects the stylesheets to link into the page being
/// rendered.
pub trait AssetSink {
    /// Register a stylesheet. `version` is appended to the URL by the host
    /// for cache busting.
    fn register(&mut self, handle: &str, url: &str, dependencies: &[&str], version: i64);
}

/// A registered stylesheet, as collected by the [`Vec`] sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    pub handle: String,
    pub url: String,
    pub dependencies: Vec<String>,
    pub version: i64,
}

impl AssetSink for Vec<Stylesheet> {
    fn register(&mut self, handle: &str, url: &str, dependencies: &[&str], version: i64) {
        self.push(Stylesheet {
            handle: handle.to_string(),
            url: url.to_string(),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            version,
        });
    }
}
