/// Sealnote Error Type.
///
/// The first four variants are expected, caller-visible outcomes.
/// Anything landing in `Other` is a bug-class failure and should be
/// surfaced, not swallowed.
#[derive(Debug, thiserror::Error)]
pub enum SealError {
    /// Malformed, truncated, or over-long bytes.
    #[error("FormatError: {0}")]
    Format(String),

    /// A version or algorithm tag this reader does not recognize.
    #[error("OutdatedVersion: {0}")]
    OutdatedVersion(String),

    /// The password guess did not match the stored verification hash.
    #[error("incorrect password")]
    IncorrectPassword,

    /// The password verified, but authenticated decryption failed.
    #[error("stored data has been tampered with or is corrupted")]
    TamperedData,

    /// The storage backend reports it is not usable by this instance.
    #[error("vault store is disabled")]
    StoreDisabled,

    /// Storage io failure.
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),

    /// Unspecified Internal error.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl SealError {
    /// Build a "Format" type SealError.
    pub fn format(msg: impl std::fmt::Display) -> Self {
        SealError::Format(msg.to_string())
    }

    /// Build an "OutdatedVersion" type SealError.
    pub fn outdated(msg: impl std::fmt::Display) -> Self {
        SealError::OutdatedVersion(msg.to_string())
    }

    /// Build an "Other" type SealError.
    pub fn other(
        e: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        SealError::Other(e.into())
    }

    /// True for the error classes produced by rejecting input bytes.
    pub fn is_input_rejection(&self) -> bool {
        matches!(self, Self::Format(_) | Self::OutdatedVersion(_))
    }

    /// An equivalent error for another waiter on the same outcome.
    /// `Io` keeps its kind, `Other` keeps its message.
    pub(crate) fn duplicate(&self) -> Self {
        match self {
            Self::Format(s) => Self::Format(s.clone()),
            Self::OutdatedVersion(s) => Self::OutdatedVersion(s.clone()),
            Self::IncorrectPassword => Self::IncorrectPassword,
            Self::TamperedData => Self::TamperedData,
            Self::StoreDisabled => Self::StoreDisabled,
            Self::Io(e) => {
                Self::Io(std::io::Error::new(e.kind(), e.to_string()))
            }
            Self::Other(e) => e.to_string().into(),
        }
    }
}

impl From<String> for SealError {
    fn from(s: String) -> Self {
        #[derive(Debug)]
        struct OtherError(String);
        impl std::fmt::Display for OtherError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
        impl std::error::Error for OtherError {}

        SealError::other(OtherError(s))
    }
}

impl From<&str> for SealError {
    fn from(s: &str) -> Self {
        s.to_string().into()
    }
}

impl From<tokio::task::JoinError> for SealError {
    fn from(e: tokio::task::JoinError) -> Self {
        SealError::other(e)
    }
}

/// Sealnote Result Type.
pub type SealResult<T> = Result<T, SealError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classes_display() {
        assert_eq!(
            "FormatError: short read",
            SealError::format("short read").to_string(),
        );
        assert_eq!("incorrect password", SealError::IncorrectPassword.to_string());
        assert!(SealError::outdated("tag 9").is_input_rejection());
        assert!(!SealError::TamperedData.is_input_rejection());
        let e: SealError = "boom".into();
        assert_eq!("boom", e.to_string());
    }

    #[test]
    fn duplicate_keeps_class() {
        assert!(matches!(
            SealError::StoreDisabled.duplicate(),
            SealError::StoreDisabled
        ));
        let io = SealError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "nope",
        ));
        match io.duplicate() {
            SealError::Io(e) => {
                assert_eq!(std::io::ErrorKind::PermissionDenied, e.kind())
            }
            oth => panic!("unexpected {oth:?}"),
        }
        assert_eq!("boom", SealError::from("boom").duplicate().to_string());
    }
}
