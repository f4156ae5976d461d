//! `hickory-resolver` backed DNS prober.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::rr::{Name, RecordType};

use super::collector::{DnsConfig, DnsProber};
use crate::collector::traits::{ProbeError, timed};

/// Standard DNS port.
const DNS_PORT: u16 = 53;

/// Resolver options for probing: no caching, no retries.
fn probe_opts(mut opts: ResolverOpts, timeout: Duration) -> ResolverOpts {
    opts.cache_size = 0;
    opts.use_hosts_file = false;
    opts.timeout = timeout;
    opts.attempts = 1;
    opts
}

/// Probes DNS servers over TCP and looks up zone authority through the
/// system resolver.
///
/// Every query builds a resolver bound to a single name server so each
/// measurement is a fresh round trip to exactly that address.
pub struct HickoryProber {
    system: TokioAsyncResolver,
    timeout: Duration,
}

impl std::fmt::Debug for HickoryProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryProber")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HickoryProber {
    /// Create a prober using the host's resolver configuration for zone lookups.
    ///
    /// When the host configuration cannot be read (e.g. no `/etc/resolv.conf`
    /// in a minimal container) the zone lookup falls back to hickory's default
    /// upstream servers; per-address queries never depend on it.
    pub fn from_system_conf(config: &DnsConfig) -> Self {
        let (system_config, system_opts) =
            system_or_default(hickory_resolver::system_conf::read_system_conf());
        Self::with_zone_resolver(config, system_config, system_opts)
    }

    /// Create a prober whose zone lookups go through `resolver_config`.
    pub fn with_zone_resolver(
        config: &DnsConfig,
        resolver_config: ResolverConfig,
        resolver_opts: ResolverOpts,
    ) -> Self {
        Self {
            system: TokioAsyncResolver::tokio(
                resolver_config,
                probe_opts(resolver_opts, config.zone_timeout),
            ),
            timeout: config.timeout,
        }
    }

    fn tcp_resolver(&self, server: IpAddr) -> TokioAsyncResolver {
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(
            SocketAddr::new(server, DNS_PORT),
            Protocol::Tcp,
        ));
        TokioAsyncResolver::tokio(config, probe_opts(ResolverOpts::default(), self.timeout))
    }

    fn map_error(&self, error: ResolveError) -> ProbeError {
        match error.kind() {
            ResolveErrorKind::Timeout => ProbeError::Timeout(self.timeout),
            _ => ProbeError::Resolve(error.to_string()),
        }
    }
}

/// Host resolver configuration, or hickory's defaults if it is unreadable.
fn system_or_default<E: std::fmt::Display>(
    system: Result<(ResolverConfig, ResolverOpts), E>,
) -> (ResolverConfig, ResolverOpts) {
    system.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to read system resolver config, using defaults for zone lookups");
        (ResolverConfig::default(), ResolverOpts::default())
    })
}

/// Returns true if the server answered, even if without records.
fn is_answer(error: &ResolveError) -> bool {
    matches!(error.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

fn fully_qualified(name: &str) -> Result<Name, ProbeError> {
    let mut name = Name::from_ascii(name)
        .map_err(|e| ProbeError::Resolve(format!("invalid name '{name}': {e}")))?;
    name.set_fqdn(true);
    Ok(name)
}

#[async_trait::async_trait]
impl DnsProber for HickoryProber {
    async fn query(
        &self,
        server: IpAddr,
        name: &str,
        record_type: RecordType,
    ) -> Result<Duration, ProbeError> {
        let name = fully_qualified(name)?;
        let resolver = self.tcp_resolver(server);

        let (_, elapsed) = timed(async {
            match resolver.lookup(name, record_type).await {
                Ok(_) => Ok(()),
                Err(e) if is_answer(&e) => Ok(()),
                Err(e) => Err(self.map_error(e)),
            }
        })
        .await?;

        Ok(elapsed)
    }

    async fn zone_for_name(&self, name: &str) -> Result<(String, Duration), ProbeError> {
        let mut candidate = fully_qualified(name)?;

        timed(async {
            // Walk toward the root until a name owns an SOA record.
            loop {
                match self.system.soa_lookup(candidate.clone()).await {
                    Ok(lookup) if lookup.iter().next().is_some() => {
                        return Ok(candidate.to_string());
                    }
                    Ok(_) => {}
                    Err(e) if is_answer(&e) => {}
                    Err(e) => return Err(self.map_error(e)),
                }

                if candidate.is_root() {
                    return Err(ProbeError::Resolve(format!("no zone found for '{name}'")));
                }
                candidate = candidate.base_name();
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use hickory_resolver::proto::op::{Query, ResponseCode};

    use super::*;

    #[test]
    fn test_fully_qualified_adds_root() {
        let name = fully_qualified("uui.org").unwrap();
        assert!(name.is_fqdn());
        assert_eq!(name.to_string(), "uui.org.");
    }

    #[test]
    fn test_probe_opts_disable_cache() {
        let opts = probe_opts(ResolverOpts::default(), Duration::from_millis(750));
        assert_eq!(opts.cache_size, 0);
        assert!(!opts.use_hosts_file);
        assert_eq!(opts.attempts, 1);
        assert_eq!(opts.timeout, Duration::from_millis(750));
    }

    fn prober() -> HickoryProber {
        HickoryProber::with_zone_resolver(
            &DnsConfig::default().with_timeout(Duration::from_millis(800)),
            ResolverConfig::default(),
            ResolverOpts::default(),
        )
    }

    fn no_records(response_code: ResponseCode) -> ResolveError {
        ResolveError::from(ResolveErrorKind::NoRecordsFound {
            query: Box::new(Query::query(fully_qualified("uui.org").unwrap(), RecordType::A)),
            soa: None,
            negative_ttl: None,
            response_code,
            trusted: true,
        })
    }

    #[test]
    fn test_system_or_default_keeps_system_conf() {
        let system = ResolverConfig::cloudflare();
        let (config, _) = system_or_default::<std::io::Error>(Ok((system.clone(), ResolverOpts::default())));
        assert_eq!(config.name_servers().len(), system.name_servers().len());
        assert_eq!(
            config.name_servers()[0].socket_addr,
            system.name_servers()[0].socket_addr
        );
    }

    #[test]
    fn test_system_or_default_falls_back() {
        let unreadable = std::io::Error::new(std::io::ErrorKind::NotFound, "/etc/resolv.conf");

        let (config, _) = system_or_default(Err(unreadable));

        let defaults = ResolverConfig::default();
        assert_eq!(config.name_servers().len(), defaults.name_servers().len());
        assert!(!config.name_servers().is_empty());
    }

    #[tokio::test]
    async fn test_with_zone_resolver_uses_dns_timeout() {
        let prober = prober();
        assert_eq!(prober.timeout, Duration::from_millis(800));
    }

    #[test]
    fn test_nxdomain_counts_as_answer() {
        assert!(is_answer(&no_records(ResponseCode::NXDomain)));
        assert!(is_answer(&no_records(ResponseCode::NoError)));
    }

    #[test]
    fn test_transport_errors_are_not_answers() {
        assert!(!is_answer(&ResolveError::from(ResolveErrorKind::Timeout)));
        assert!(!is_answer(&ResolveError::from("connection refused")));
    }

    #[tokio::test]
    async fn test_map_error_timeout() {
        let err = prober().map_error(ResolveError::from(ResolveErrorKind::Timeout));
        assert_eq!(err, ProbeError::Timeout(Duration::from_millis(800)));
    }

    #[tokio::test]
    async fn test_map_error_other_is_resolve() {
        let err = prober().map_error(ResolveError::from("connection refused"));
        assert!(matches!(err, ProbeError::Resolve(msg) if msg.contains("connection refused")));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_query_public_resolver() {
        let config = DnsConfig::default();
        let prober = HickoryProber::from_system_conf(&config);
        let elapsed = prober
            .query("1.1.1.1".parse().unwrap(), "uui.org", RecordType::A)
            .await
            .unwrap();
        assert!(elapsed > Duration::ZERO);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_zone_for_name() {
        let config = DnsConfig::default();
        let prober = HickoryProber::from_system_conf(&config);
        let (zone, _) = prober.zone_for_name("www.uui.org").await.unwrap();
        assert_eq!(zone, "uui.org.");
    }
}
