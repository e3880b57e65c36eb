use conceptc_core::DslError;

/// Error type for code generation.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// An insertion targeted a marker that is not in the buffer.
    #[error("tag not found: '{marker}'")]
    TagNotFound { marker: String },

    /// A second insertion targeted a single-use marker.
    #[error("tag already used: '{marker}' accepts only one insertion")]
    TagAlreadyUsed { marker: String },

    /// A tag was evaluated against a concept it does not belong to, or its
    /// template is malformed.
    #[error("invalid tag '{tag}': {message}")]
    InvalidTag { tag: String, message: String },

    /// Marker delimiters do not form a usable pattern.
    #[error("invalid codegen options: {0}")]
    Options(String),

    /// A generator reported a failure of its own.
    #[error("generator for '{concept_type}' failed on '{concept}': {message}")]
    Generator {
        concept_type: String,
        concept: String,
        message: String,
    },

    /// The model could not be ordered for generation.
    #[error(transparent)]
    Model(#[from] DslError),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl CodegenError {
    /// Stable machine-readable code, in the same spirit as
    /// [`conceptc_core::ErrorCode`].
    pub fn code(&self) -> &'static str {
        match self {
            CodegenError::TagNotFound { .. } => "GEN0001",
            CodegenError::TagAlreadyUsed { .. } => "GEN0002",
            CodegenError::InvalidTag { .. } => "GEN0003",
            CodegenError::Options(_) => "GEN0004",
            CodegenError::Generator { .. } => "GEN0005",
            CodegenError::Model(e) => e.code.as_str(),
            CodegenError::Io { .. } => "GEN0006",
        }
    }
}
