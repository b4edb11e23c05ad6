use std::path::PathBuf;

pub type ZoomResult<T> = Result<T, ZoomError>;

#[derive(thiserror::Error, Debug)]
pub enum ZoomError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("geometry error: {0}")]
    Geometry(String),

    #[error("unsupported image format: '{}'", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("rendering interrupted")]
    Interrupted,

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ZoomError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// `true` for failures that are a deterministic function of the job's inputs.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Geometry(_) | Self::UnsupportedFormat(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ZoomError::config("x")
                .to_string()
                .contains("configuration error:")
        );
        assert!(
            ZoomError::geometry("x")
                .to_string()
                .contains("geometry error:")
        );
        assert!(ZoomError::encode("x").to_string().contains("encode error:"));
        assert!(
            ZoomError::UnsupportedFormat(PathBuf::from("a.gif"))
                .to_string()
                .contains("a.gif")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ZoomError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn configuration_classification() {
        assert!(ZoomError::config("x").is_configuration());
        assert!(ZoomError::geometry("x").is_configuration());
        assert!(!ZoomError::Interrupted.is_configuration());
    }
}
