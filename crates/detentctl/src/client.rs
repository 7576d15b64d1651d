use crate::wire::InputLine;
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to detent daemon at {path}: {source}. Is detent running?")]
    Connect {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct Client {
    stream: UnixStream,
}

impl Client {
    pub fn connect(path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(path).map_err(|source| ClientError::Connect {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self { stream })
    }

    pub fn send(&mut self, line: &InputLine) -> Result<(), ClientError> {
        log::debug!("-> {}", line);
        writeln!(self.stream, "{}", line)?;
        Ok(())
    }
}
