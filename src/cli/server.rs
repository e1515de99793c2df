//! Server mode CLI logic
//!
//! Contains the core logic for running the HTTP service.

use crate::{
    cli::init_logging,
    client::XhsApi,
    config::{ConfigLoader, Settings},
    server::app,
    utils::version,
};
use anyhow::{Context, Result};
use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};
use tokio::net::TcpListener;

/// Arguments for server mode
#[derive(Debug, Default)]
pub struct ServerArgs {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub verbose: bool,
}

impl ServerArgs {
    /// Settings from file and environment, with the command line applied last
    pub fn settings(&self) -> Result<Settings> {
        let config = self
            .config
            .clone()
            .or_else(|| ConfigLoader::default_config_path().filter(|path| path.exists()));
        let mut settings = ConfigLoader::new().load(config.as_deref())?;

        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        Ok(settings)
    }
}

/// Run server mode with the given arguments
pub async fn run_server_mode(args: ServerArgs) -> Result<()> {
    let settings = args.settings()?;
    init_logging(&settings.logging, args.verbose);

    tracing::info!("Starting xhs server v{}", version::get_version());

    let api = XhsApi::from_settings(&settings).context("Failed to build API client")?;
    let app = app::create_app(Arc::new(api));

    let listener = bind_listener(&settings.server.host, settings.server.port).await?;
    tracing::info!(
        "xhs server v{} listening on {}",
        version::get_version(),
        listener.local_addr()?
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Bind the service socket
///
/// `host` is an IP literal or `localhost`. The IPv6 wildcard falls back to
/// `0.0.0.0` on hosts without IPv6.
pub async fn bind_listener(host: &str, port: u16) -> Result<TcpListener> {
    let ip = match host {
        "localhost" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other
            .parse::<IpAddr>()
            .with_context(|| format!("Invalid host address: {}", other))?,
    };
    let addr = SocketAddr::new(ip, port);

    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(e) if ip == IpAddr::V6(Ipv6Addr::UNSPECIFIED) => {
            tracing::warn!(
                "Could not listen on [::]:{} ({}), falling back to 0.0.0.0",
                port,
                e
            );
            let fallback = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
            Ok(TcpListener::bind(fallback).await?)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to bind {}", addr)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("127.0.0.1", IpAddr::V4(Ipv4Addr::LOCALHOST))]
    #[case("localhost", IpAddr::V4(Ipv4Addr::LOCALHOST))]
    #[case("0.0.0.0", IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    #[tokio::test]
    async fn test_bind_listener(#[case] host: &str, #[case] expected: IpAddr) {
        let listener = bind_listener(host, 0).await.unwrap();
        assert_eq!(listener.local_addr().unwrap().ip(), expected);
    }

    #[tokio::test]
    async fn test_bind_ipv6_any_or_fallback() {
        let listener = bind_listener("::", 0).await.unwrap();
        let ip = listener.local_addr().unwrap().ip();
        assert!(
            ip == IpAddr::V6(Ipv6Addr::UNSPECIFIED) || ip == IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        );
    }

    #[rstest]
    #[case("invalid-host")]
    #[case("")]
    #[tokio::test]
    async fn test_bind_rejects_bad_host(#[case] host: &str) {
        let err = bind_listener(host, 0).await.unwrap_err();
        assert!(err.to_string().contains("Invalid host address"));
    }

    #[test]
    fn test_command_line_overrides_settings() {
        let args = ServerArgs {
            host: Some("127.0.0.1".to_string()),
            port: Some(7000),
            ..Default::default()
        };
        let settings = args.settings().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 7000);
    }
}
