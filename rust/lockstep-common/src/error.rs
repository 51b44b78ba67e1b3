use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn configuration(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::Configuration {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn worker<E>(index: usize, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Worker {
                index,
                source: Box::new(source),
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    #[error("worker failed on element {index}: {source}")]
    Worker { index: usize, source: StdErrorBoxed },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};

    #[test]
    fn test_error_is_send_sync() {
        fn is_send_sync<T: Send + Sync>() {}
        is_send_sync::<Error>();
    }

    #[test]
    fn test_worker_error_carries_index_and_source() {
        let source = std::io::Error::other("device gone");
        let err = Error::worker(7, source);
        match err.kind() {
            ErrorKind::Worker { index, .. } => assert_eq!(*index, 7),
            kind => panic!("unexpected kind: {kind:?}"),
        }
        let message = err.to_string();
        assert!(message.contains("element 7"));
        assert!(message.contains("device gone"));
    }

    #[test]
    fn test_configuration_error_message() {
        let err = Error::configuration("concurrency must be at least 1");
        assert!(matches!(err.kind(), ErrorKind::Configuration { .. }));
        assert!(err.to_string().contains("concurrency must be at least 1"));
    }
}
