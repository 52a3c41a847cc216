use crate::config::RateLimitConfig;
use axum::{
    extract::ConnectInfo,
    http::{HeaderMap, Request},
};
use governor::{clock::QuantaInstant, middleware::NoOpMiddleware};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use tower_governor::{
    errors::GovernorError,
    governor::{GovernorConfig, GovernorConfigBuilder},
    key_extractor::KeyExtractor,
};

/// Keys the limiter on the caller's IP.
///
/// The peer address comes from `ConnectInfo`, so the server has to be started with
/// `into_make_service_with_connect_info::<SocketAddr>()`. Forwarding headers are
/// only read when `trust_proxy` is set: anyone can send them, so without a proxy
/// that overwrites them they'd let a client pick its own bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IpKeyExtractor {
    trust_proxy: bool,
}

impl IpKeyExtractor {
    pub fn new(trust_proxy: bool) -> Self {
        Self { trust_proxy }
    }
}

impl KeyExtractor for IpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        client_ip(req, self.trust_proxy).ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Best guess at the caller's address.
///
/// 1. behind a trusted proxy: `cf-connecting-ip`, then the first `x-forwarded-for` entry
/// 2. the TCP peer address
///
/// None only when there's no peer address, i.e. the app wasn't served with connect info.
fn client_ip<T>(req: &Request<T>, trust_proxy: bool) -> Option<IpAddr> {
    if trust_proxy {
        if let Some(ip) = forwarded_ip(req.headers()) {
            return Some(ip);
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header_ip = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };

    header_ip("cf-connecting-ip").or_else(|| header_ip("x-forwarded-for"))
}

pub type AuthLimitConfig = GovernorConfig<IpKeyExtractor, NoOpMiddleware<QuantaInstant>>;

/// Sign-in limiter. Defaults to a burst of 5 per IP, one more every 180s
/// (180s * 5 = 15 mins). Tight enough to annoy a brute-forcer, loose enough for typos.
pub fn create_login_config(config: &RateLimitConfig) -> Arc<AuthLimitConfig> {
    build(config.login_burst, config.login_period, config.trust_proxy)
}

/// Sign-up limiter. Defaults to a burst of 10 per IP, one more every 360s (an hour for all 10).
pub fn create_signup_config(config: &RateLimitConfig) -> Arc<AuthLimitConfig> {
    build(config.signup_burst, config.signup_period, config.trust_proxy)
}

/// `period` is how long it takes to earn back one request, not the whole window.
fn build(burst: u32, period: std::time::Duration, trust_proxy: bool) -> Arc<AuthLimitConfig> {
    // finish() only returns None for a zero period or burst, which Config refuses to load.
    Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(IpKeyExtractor::new(trust_proxy))
            .period(period)
            .burst_size(burst)
            .finish()
            .expect("rate limit burst and period are non-zero"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(peer: Option<&str>, headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::get("/auth/sign-in");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let mut req = builder.body(()).unwrap();
        if let Some(peer) = peer {
            let addr: SocketAddr = peer.parse().unwrap();
            req.extensions_mut().insert(ConnectInfo(addr));
        }
        req
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn peer_address_is_the_key_by_default() {
        let req = request(Some("192.0.2.10:51000"), &[]);
        assert_eq!(client_ip(&req, false), Some(ip("192.0.2.10")));
    }

    #[test]
    fn forwarding_headers_are_ignored_unless_trusted() {
        let req = request(
            Some("192.0.2.10:51000"),
            &[("x-forwarded-for", "198.51.100.1"), ("cf-connecting-ip", "203.0.113.7")],
        );
        assert_eq!(client_ip(&req, false), Some(ip("192.0.2.10")));
    }

    #[test]
    fn cloudflare_header_wins_behind_a_trusted_proxy() {
        let req = request(
            Some("192.0.2.10:51000"),
            &[("cf-connecting-ip", "203.0.113.7"), ("x-forwarded-for", "198.51.100.1")],
        );
        assert_eq!(client_ip(&req, true), Some(ip("203.0.113.7")));
    }

    #[test]
    fn first_forwarded_address_is_the_client_behind_a_trusted_proxy() {
        let req = request(
            Some("192.0.2.10:51000"),
            &[("x-forwarded-for", "198.51.100.1, 10.0.0.1")],
        );
        assert_eq!(client_ip(&req, true), Some(ip("198.51.100.1")));
    }

    #[test]
    fn trusted_proxy_without_headers_falls_back_to_peer() {
        let req = request(Some("192.0.2.10:51000"), &[("x-forwarded-for", "garbage")]);
        assert_eq!(client_ip(&req, true), Some(ip("192.0.2.10")));
    }

    #[test]
    fn no_peer_address_means_no_key() {
        let req = request(None, &[]);
        assert_eq!(client_ip(&req, false), None);
        assert!(IpKeyExtractor::new(false).extract(&req).is_err());
    }
}
