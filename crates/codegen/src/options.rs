use serde::Deserialize;

/// Code generation settings, read from the `[codegen]` table of a
/// `conceptc.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodegenOptions {
    /// Opening delimiter of every tag marker.
    pub tag_open: String,
    /// Closing delimiter of every tag marker.
    pub tag_close: String,
    /// Keep markers nobody inserted into in the finished output.
    pub keep_unused_tags: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            tag_open: "/*<".to_owned(),
            tag_close: ">*/".to_owned(),
            keep_unused_tags: false,
        }
    }
}
