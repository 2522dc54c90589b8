//! Structured request URL.

use std::fmt;

/// URL of an inner request, kept in the pieces the host supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Url {
    pub scheme: String,
    pub host_name: String,
    /// `None` means the scheme's default port.
    pub port: Option<u16>,
    pub base_path: String,
    pub path: String,
    /// Raw query string without the leading `?`; empty when absent.
    pub query: String,
}

impl Url {
    /// Host name with the explicit port, if any.
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host_name, port),
            None => self.host_name.clone(),
        }
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}{}{}",
            self.scheme,
            self.authority(),
            self.base_path,
            self.path
        )?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        Ok(())
    }
}
