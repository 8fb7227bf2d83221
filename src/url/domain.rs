use url::Url;

/// Extracts the host key from a URL
///
/// The host key is the lowercase host, followed by `:port` when the URL names a
/// non-default port. It is the unit of domain containment: two URLs belong to
/// the same site only if their host keys are equal.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sitesweep::url::host_key;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(host_key(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(host_key(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Turns a host key into a file-name-safe stem (`:` becomes `_`)
pub fn host_file_stem(host: &str) -> String {
    host.chars()
        .map(|c| match c {
            ':' | '/' | '\\' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_host() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(host_key(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_subdomain_is_distinct() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(host_key(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_default_port_omitted() {
        let url = Url::parse("https://example.com:443/").unwrap();
        assert_eq!(host_key(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_explicit_port_kept() {
        let url = Url::parse("https://example.com:8443/").unwrap();
        assert_eq!(host_key(&url), Some("example.com:8443".to_string()));
    }

    #[test]
    fn test_ip_address() {
        let url = Url::parse("http://192.168.1.1/").unwrap();
        assert_eq!(host_key(&url), Some("192.168.1.1".to_string()));
    }

    #[test]
    fn test_host_file_stem() {
        assert_eq!(host_file_stem("example.com"), "example.com");
        assert_eq!(host_file_stem("127.0.0.1:8080"), "127.0.0.1_8080");
    }
}
