//! URL reconstruction from host-supplied fragments.

use std::sync::OnceLock;

use crate::engine::Url;

/// Build the inner URL from the host's request fragments.
///
/// `host` is the Host header value: `name` or `name:port`. A port segment
/// that is not a valid port number leaves the whole value as the host name.
pub fn reconstruct(host: &str, scheme: &str, base_path: &str, path: &str, query: &str) -> Url {
    let (host_name, port) = split_host(host);
    Url {
        scheme: scheme.to_string(),
        host_name: host_name.to_string(),
        port,
        base_path: base_path.to_string(),
        path: path.to_string(),
        query: query.to_string(),
    }
}

/// Split a Host header value on its first colon.
pub fn split_host(host: &str) -> (&str, Option<u16>) {
    match host.split_once(':') {
        Some((name, port)) => match port.parse::<u16>() {
            Ok(port) => (name, Some(port)),
            Err(_) => (host, None),
        },
        None => (host, None),
    }
}

/// Name of the local machine, used when a request carries no Host header.
pub fn local_host_name() -> String {
    static LOCAL_HOST_NAME: OnceLock<String> = OnceLock::new();
    LOCAL_HOST_NAME
        .get_or_init(|| {
            let name = gethostname::gethostname();
            let name = name.to_string_lossy().trim().to_string();
            if name.is_empty() {
                "localhost".to_string()
            } else {
                name
            }
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_with_port() {
        let url = reconstruct("example.com:8080", "http", "", "/", "");
        assert_eq!(url.host_name, "example.com");
        assert_eq!(url.port, Some(8080));
    }

    #[test]
    fn test_host_without_port() {
        let url = reconstruct("example.com", "http", "", "/", "");
        assert_eq!(url.host_name, "example.com");
        assert_eq!(url.port, None);
    }

    #[test]
    fn test_non_numeric_port_keeps_whole_value() {
        assert_eq!(split_host("example.com:abc"), ("example.com:abc", None));
        assert_eq!(split_host("example.com:70000"), ("example.com:70000", None));
        assert_eq!(split_host("[::1]:8080"), ("[::1]:8080", None));
    }

    #[test]
    fn test_fragments_copied_verbatim() {
        let url = reconstruct("h:1", "https", "/base", "/a%20b", "x=1&y=%2F");
        assert_eq!(url.scheme, "https");
        assert_eq!(url.base_path, "/base");
        assert_eq!(url.path, "/a%20b");
        assert_eq!(url.query, "x=1&y=%2F");
    }

    #[test]
    fn test_deterministic() {
        let a = reconstruct("example.com:8080", "http", "/api", "/users", "page=1");
        let b = reconstruct("example.com:8080", "http", "/api", "/users", "page=1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_local_host_name_not_empty() {
        assert!(!local_host_name().is_empty());
        assert_eq!(local_host_name(), local_host_name());
    }

    #[test]
    fn test_local_host_name_is_system_name() {
        let system = gethostname::gethostname().to_string_lossy().trim().to_string();
        if !system.is_empty() {
            assert_eq!(local_host_name(), system);
        }
    }
}
