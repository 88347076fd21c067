use std::io;
use std::net::IpAddr;

use async_trait::async_trait;

use super::Resolver;

/// Resolves through the operating system (`getaddrinfo`).
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|socket_addr| socket_addr.ip()).collect())
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[tokio::test]
    async fn literal_addresses_resolve_to_themselves() {
        let v4 = SystemResolver.resolve("127.0.0.1").await.unwrap();
        assert_eq!(v4, vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]);

        let v6 = SystemResolver.resolve("::1").await.unwrap();
        assert_eq!(v6, vec![IpAddr::V6(Ipv6Addr::LOCALHOST)]);
    }

    #[tokio::test]
    #[ignore]
    async fn unknown_hostname_fails_to_resolve() {
        assert!(SystemResolver.resolve("does-not-exist.invalid").await.is_err());
    }
}
