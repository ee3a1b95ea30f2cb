//! SSRF protection for user-supplied webhook URLs.
//!
//! A URL is rejected when its host is on the static blocklist or when any
//! address it resolves to is private or reserved. Hosts that cannot be
//! resolved are allowed with a warning: slow or flaky DNS for a legitimate
//! domain must not block endpoint registration.
//!
//! The check runs when an endpoint is created or updated. Deliveries do not
//! re-validate.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use url::Url;

use crate::{AppError, AppResult};

/// Hosts rejected without resolving.
const BLOCKED_HOSTS: [&str; 4] = ["localhost", "127.0.0.1", "0.0.0.0", "::1"];

/// Resolves a host name to its addresses.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolve `host` (a name or literal address) for the given port.
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the system's DNS configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, port)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Resolver with a fixed host table. Unknown names fail to resolve; literal
/// addresses resolve to themselves.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    /// Create an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry for `host`.
    #[must_use]
    pub fn with_host(mut self, host: &str, addrs: &[IpAddr]) -> Self {
        self.hosts
            .insert(host.to_ascii_lowercase(), addrs.to_vec());
        self
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn resolve(&self, host: &str, _port: u16) -> io::Result<Vec<IpAddr>> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }
        self.hosts
            .get(&host.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such host: {host}")))
    }
}

/// Outcome of a URL check that did not reject the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlCheck {
    /// The host resolved and every address is public.
    Allowed,
    /// The host could not be resolved; allowed anyway.
    AllowedUnresolved {
        /// Why resolution failed.
        reason: String,
    },
}

/// Validates outbound URLs against SSRF targets.
#[derive(Clone)]
pub struct UrlGuard {
    resolver: Arc<dyn HostResolver>,
    allow_http: bool,
}

impl UrlGuard {
    /// Create a guard using the given resolver.
    #[must_use]
    pub fn new(resolver: Arc<dyn HostResolver>) -> Self {
        Self {
            resolver,
            allow_http: true,
        }
    }

    /// Create a guard that uses system DNS.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(SystemResolver))
    }

    /// Set whether `http://` URLs are accepted (`https://` always is).
    #[must_use]
    pub const fn allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// Validate a URL.
    pub async fn validate(&self, raw: &str) -> AppResult<UrlCheck> {
        let url = Url::parse(raw)
            .map_err(|e| AppError::Validation(format!("Invalid URL: {e}")))?;

        match url.scheme() {
            "https" => {}
            "http" if self.allow_http => {}
            scheme => {
                return Err(AppError::Validation(format!(
                    "Unsupported URL scheme: {scheme}"
                )));
            }
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AppError::Validation("URL must have a host".to_string()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');

        if BLOCKED_HOSTS.iter().any(|b| host.eq_ignore_ascii_case(b)) {
            return Err(AppError::Validation(format!(
                "Webhook URL host {host} is not allowed"
            )));
        }

        if let Ok(ip) = host.parse::<IpAddr>() {
            return if is_restricted_ip(&ip) {
                Err(AppError::Validation(format!(
                    "Webhook URL points to a private or reserved address: {ip}"
                )))
            } else {
                Ok(UrlCheck::Allowed)
            };
        }

        let port = url.port_or_known_default().unwrap_or(80);
        let addrs = match self.resolver.resolve(host, port).await {
            Ok(addrs) if !addrs.is_empty() => addrs,
            Ok(_) => return Ok(unresolved(host, "no addresses returned")),
            Err(e) => return Ok(unresolved(host, &e.to_string())),
        };

        if let Some(ip) = addrs.iter().find(|ip| is_restricted_ip(ip)) {
            return Err(AppError::Validation(format!(
                "Webhook URL host {host} resolves to a private or reserved address: {ip}"
            )));
        }

        Ok(UrlCheck::Allowed)
    }
}

fn unresolved(host: &str, reason: &str) -> UrlCheck {
    warn!(
        host = %host,
        reason = %reason,
        "Could not resolve webhook host, allowing URL"
    );
    UrlCheck::AllowedUnresolved {
        reason: reason.to_string(),
    }
}

/// Whether an address is private, loopback, link-local or otherwise reserved.
#[must_use]
pub fn is_restricted_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_restricted_v4(v4),
        IpAddr::V6(v6) => is_restricted_v6(v6),
    }
}

fn is_restricted_v4(ip: &Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.is_documentation()
        || a == 0
        || (a == 100 && (b & 0xC0) == 64) // 100.64.0.0/10 shared address space
        || (a == 192 && b == 0 && c == 0) // 192.0.0.0/24 protocol assignments
        || (a == 198 && (b & 0xFE) == 18) // 198.18.0.0/15 benchmarking
        || a >= 240 // 240.0.0.0/4 reserved
}

fn is_restricted_v6(ip: &Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_restricted_v4(&v4);
    }
    let first = ip.segments()[0];
    ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_multicast()
        || (first & 0xFE00) == 0xFC00 // fc00::/7 unique local
        || (first & 0xFFC0) == 0xFE80 // fe80::/10 link-local
        || (first == 0x2001 && ip.segments()[1] == 0x0DB8) // 2001:db8::/32 documentation
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn guard() -> UrlGuard {
        let resolver = StaticResolver::new()
            .with_host("example.com", &["93.184.215.14".parse().unwrap()])
            .with_host("hooks.agency.io", &["104.18.2.7".parse().unwrap()])
            .with_host("intranet.agency.io", &["10.1.2.3".parse().unwrap()])
            .with_host(
                "split.agency.io",
                &["104.18.2.8".parse().unwrap(), "192.168.1.20".parse().unwrap()],
            )
            .with_host("metadata.agency.io", &["169.254.169.254".parse().unwrap()])
            .with_host("v6.agency.io", &["fd12:3456::1".parse().unwrap()]);
        UrlGuard::new(Arc::new(resolver))
    }

    #[tokio::test]
    async fn test_rejects_loopback_literal() {
        let result = guard().validate("http://127.0.0.1/hook").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_rejects_localhost_with_port() {
        let result = guard().validate("http://localhost:3000/hook").await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = guard().validate("http://LocalHost/hook").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_rejects_blocklisted_unspecified_and_v6_loopback() {
        assert!(guard().validate("http://0.0.0.0/hook").await.is_err());
        assert!(guard().validate("http://[::1]:8080/hook").await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_private_literal() {
        let result = guard().validate("http://10.0.0.5/hook").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_accepts_public_host() {
        let result = guard().validate("https://example.com/hook").await.unwrap();
        assert_eq!(result, UrlCheck::Allowed);
    }

    #[tokio::test]
    async fn test_unresolvable_host_fails_open() {
        let result = guard()
            .validate("https://this-domain-does-not-exist-xyz123.invalid/hook")
            .await
            .unwrap();
        assert_eq!(
            result,
            UrlCheck::AllowedUnresolved {
                reason: "no such host: this-domain-does-not-exist-xyz123.invalid".to_string(),
            }
        );

        let resolver = StaticResolver::new().with_host("empty.agency.io", &[]);
        let result = UrlGuard::new(Arc::new(resolver))
            .validate("https://empty.agency.io/hook")
            .await
            .unwrap();
        assert_eq!(
            result,
            UrlCheck::AllowedUnresolved {
                reason: "no addresses returned".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_rejects_names_resolving_to_private_ranges() {
        let guard = guard();
        assert!(guard.validate("https://intranet.agency.io/hook").await.is_err());
        assert!(guard.validate("https://metadata.agency.io/latest").await.is_err());
        assert!(guard.validate("https://v6.agency.io/hook").await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_when_any_address_is_private() {
        assert!(guard().validate("https://split.agency.io/hook").await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_missing_host_and_bad_scheme() {
        let guard = guard();
        assert!(guard.validate("not a url").await.is_err());
        assert!(guard.validate("file:///etc/passwd").await.is_err());
        assert!(guard.validate("ftp://example.com/hook").await.is_err());
    }

    #[tokio::test]
    async fn test_http_can_be_disallowed() {
        let strict = guard().allow_http(false);
        assert!(strict.validate("http://hooks.agency.io/hook").await.is_err());
        assert!(strict.validate("https://hooks.agency.io/hook").await.is_ok());
    }

    #[test]
    fn test_restricted_ranges() {
        for ip in [
            "10.0.0.1",
            "172.16.5.4",
            "192.168.0.1",
            "127.0.0.2",
            "169.254.10.10",
            "100.64.0.1",
            "198.18.0.1",
            "224.0.0.1",
            "255.255.255.255",
            "240.0.0.1",
            "192.0.2.1",
            "::",
            "fe80::1",
            "fc00::1",
            "ff02::1",
            "2001:db8::1",
            "::ffff:10.0.0.1",
        ] {
            assert!(is_restricted_ip(&ip.parse().unwrap()), "{ip} should be restricted");
        }

        for ip in ["8.8.8.8", "93.184.215.14", "2606:4700::1111", "::ffff:8.8.4.4"] {
            assert!(!is_restricted_ip(&ip.parse().unwrap()), "{ip} should be allowed");
        }
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_system_resolver_public_domain() {
        let result = UrlGuard::system()
            .validate("https://example.com/hook")
            .await
            .unwrap();
        assert_eq!(result, UrlCheck::Allowed);
    }
}
