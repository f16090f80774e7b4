/// Coarse error category shared by every crate, carried into logs as
/// `kind=...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad settings; the process refuses to start.
    Config,
    /// Filesystem or network failure. A failed partition write loses its
    /// generation; a failed feed connection is retried.
    Io,
    /// Malformed input: an undecodable feed message or request parameter.
    Format,
    /// Everything else (no data, unexpected state).
    Logic,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Format => "format",
            ErrorKind::Logic => "logic",
        };
        f.write_str(name)
    }
}
