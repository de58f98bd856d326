use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("archive directory does not exist: {}", .0.display())]
    ArchiveNotFound(PathBuf),

    #[error("archive record for {id} does not exist: {}", .path.display())]
    RecordNotFound { id: String, path: PathBuf },

    #[error("no backup for {id}: {}", .path.display())]
    BackupNotFound { id: String, path: PathBuf },

    #[error("malformed input at line {line}: {message}")]
    MalformedInput { line: usize, message: String },

    #[error("aperture not declared in table format: {0}")]
    UnknownAperture(String),

    #[error("instrument tag must not be empty")]
    InvalidTag,

    #[error("invalid name rule for {from}: {message}")]
    InvalidNameRule { from: String, message: String },

    #[error("invalid {tag} measurement: {message}")]
    InvalidMeasurement { tag: String, message: String },

    #[error("failed to merge {tag} into {id}: {source}")]
    TargetFailed {
        id: String,
        tag: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// True when the underlying cause is a missing record (possibly wrapped per target).
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::RecordNotFound { .. } | Error::BackupNotFound { .. } => true,
            Error::TargetFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_failed_names_target_and_tag() {
        let err = Error::TargetFailed {
            id: "hd029647".to_string(),
            tag: "MIPS24".to_string(),
            source: Box::new(Error::RecordNotFound {
                id: "hd029647".to_string(),
                path: PathBuf::from("/archive/hd029647.dat"),
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("MIPS24"));
        assert!(msg.contains("hd029647"));
        assert!(msg.contains("/archive/hd029647.dat"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_io_error_is_not_not_found() {
        let err = Error::Io(std::io::Error::other("disk full"));
        assert!(!err.is_not_found());
    }
}
