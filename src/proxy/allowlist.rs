//! Remote host allow-list.

use url::Url;

/// One allow-list entry: a host suffix, optionally pinned to a port.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AllowedHost {
    suffix: String,
    port: Option<u16>,
}

impl AllowedHost {
    /// Parse `cdninstagram.com` or `127.0.0.1:8443`. Returns `None` for an
    /// empty entry or an unparseable port.
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().trim_start_matches('.').to_ascii_lowercase();
        let (suffix, port) = match raw.rsplit_once(':') {
            Some((host, port)) => (host.to_string(), Some(port.parse::<u16>().ok()?)),
            None => (raw, None),
        };
        if suffix.is_empty() {
            return None;
        }
        Some(Self { suffix, port })
    }

    fn matches(&self, host: &str, port: Option<u16>) -> bool {
        self.port == port
            && (host == self.suffix
                || host
                    .strip_suffix(self.suffix.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.')))
    }
}

/// Host suffixes the proxy is permitted to fetch from.
///
/// A host matches a suffix when it is equal to it or ends with `.` followed
/// by it, compared case-insensitively. Only `http` and `https` URLs on the
/// scheme's default port pass, and never with userinfo. An entry written as
/// `host:port` admits exactly that port instead.
#[derive(Debug, Clone)]
pub struct HostAllowList {
    hosts: Vec<AllowedHost>,
}

impl HostAllowList {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: entries
                .into_iter()
                .filter_map(|e| AllowedHost::parse(e.as_ref()))
                .collect(),
        }
    }

    /// Parse `raw` and check it against the list.
    pub fn permits_str(&self, raw: &str) -> bool {
        Url::parse(raw).map(|url| self.permits(&url)).unwrap_or(false)
    }

    pub fn permits(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        if !url.username().is_empty() || url.password().is_some() {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        // `Url` drops a port equal to the scheme default, so this is only
        // `Some` for an explicit non-default port.
        let port = url.port();
        let host = host.to_ascii_lowercase();
        self.hosts.iter().any(|allowed| allowed.matches(&host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DEFAULT_ALLOWED_HOSTS;

    fn list() -> HostAllowList {
        HostAllowList::new(DEFAULT_ALLOWED_HOSTS)
    }

    #[test]
    fn test_cdn_hosts_pass() {
        let list = list();
        assert!(list.permits_str("https://scontent-iad3-1.cdninstagram.com/v/t51/a.jpg"));
        assert!(list.permits_str("https://scontent.xx.fbcdn.net/a.jpg"));
        assert!(list.permits_str("http://www.instagram.com/p/abc/media"));
        assert!(list.permits_str("https://SCONTENT.CDNINSTAGRAM.COM/a.jpg"));
        assert!(list.permits_str("https://fbcdn.net/a.jpg"));
    }

    #[test]
    fn test_lookalikes_rejected() {
        let list = list();
        assert!(!list.permits_str("http://evil.example.com/x.jpg"));
        assert!(!list.permits_str("https://evilcdninstagram.com/x.jpg"));
        assert!(!list.permits_str("https://fbcdn.net.evil.com/x.jpg"));
        assert!(!list.permits_str("https://evil.com/?u=scontent.cdninstagram.com"));
        assert!(!list.permits_str("https://scontent.cdninstagram.com@evil.com/x.jpg"));
    }

    #[test]
    fn test_ports_and_userinfo_rejected() {
        let list = list();
        assert!(!list.permits_str("https://scontent.cdninstagram.com:6379/x.jpg"));
        assert!(!list.permits_str("http://fbcdn.net:25/x"));
        assert!(!list.permits_str("http://user:pw@fbcdn.net:25/x"));
        assert!(!list.permits_str("https://user@scontent.cdninstagram.com/x.jpg"));
        assert!(!list.permits_str("https://:pw@scontent.cdninstagram.com/x.jpg"));

        // Explicit default ports normalize away.
        assert!(list.permits_str("https://scontent.cdninstagram.com:443/x.jpg"));
        assert!(list.permits_str("http://www.instagram.com:80/x.jpg"));
    }

    #[test]
    fn test_port_pinned_entries() {
        let list = HostAllowList::new(["127.0.0.1:8081", "img.example.org"]);
        assert!(list.permits_str("http://127.0.0.1:8081/a.png"));
        assert!(!list.permits_str("http://127.0.0.1:8082/a.png"));
        assert!(!list.permits_str("http://127.0.0.1/a.png"));
        assert!(!list.permits_str("http://img.example.org:8081/a.png"));

        assert!(HostAllowList::new(["127.0.0.1:notaport"]).hosts.is_empty());
    }

    #[test]
    fn test_scheme_restricted() {
        let list = list();
        assert!(!list.permits_str("ftp://scontent.cdninstagram.com/a.jpg"));
        assert!(!list.permits_str("file:///etc/passwd"));
        assert!(!list.permits_str("javascript:alert(1)"));
        assert!(!list.permits_str("not a url"));
    }

    #[test]
    fn test_custom_suffixes_normalized() {
        let list = HostAllowList::new([" .Example.ORG ", ""]);
        assert!(list.permits_str("https://img.example.org/a.png"));
        assert!(!list.permits_str("https://example.com/a.png"));
    }
}
