//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

/// Test helper functions
pub mod helpers {
    use async_trait::async_trait;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::MockServer;
    use xhs_signed_client::{
        Result, Session, Settings, XhsApi,
        session::{CookieStore, RefreshOptions, SessionRefresher},
        signer::{SignRequest, SignatureHeaders, Signer},
    };

    /// Signer whose output depends only on its inputs
    #[derive(Debug, Default)]
    pub struct StubSigner {
        pub calls: AtomicUsize,
    }

    impl StubSigner {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Signer for StubSigner {
        async fn sign(&self, request: &SignRequest<'_>) -> Result<SignatureHeaders> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let mut hasher = DefaultHasher::new();
            request.method.as_str().hash(&mut hasher);
            request.uri.hash(&mut hasher);
            request.device_id.hash(&mut hasher);
            request.body.hash(&mut hasher);

            Ok(SignatureHeaders::from([
                ("x-s".to_string(), format!("{:016x}", hasher.finish())),
                ("x-t".to_string(), "1767926762050".to_string()),
            ]))
        }
    }

    /// Refresher handing out `a1=refreshed-<n>` sessions
    #[derive(Debug, Default)]
    pub struct CountingRefresher {
        pub calls: AtomicUsize,
    }

    impl CountingRefresher {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionRefresher for CountingRefresher {
        async fn refresh(&self, _options: &RefreshOptions) -> Result<Session> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Session::from_pairs([
                ("a1", format!("refreshed-{}", n)),
                ("webId", "w".to_string()),
            ])
            .unwrap())
        }
    }

    /// API client pointed at `server`, plus handles on its stubs
    pub struct TestApi {
        pub api: XhsApi,
        pub signer: Arc<StubSigner>,
        pub refresher: Arc<CountingRefresher>,
    }

    pub fn create_test_settings(server: &MockServer) -> Settings {
        let mut settings = Settings::default();
        settings.api.base_url = server.uri();
        settings.api.timeout_secs = 5;
        settings
    }

    pub fn create_test_api(server: &MockServer, store: Arc<dyn CookieStore>) -> TestApi {
        let signer = Arc::new(StubSigner::default());
        let refresher = Arc::new(CountingRefresher::default());
        let api = XhsApi::with_components(
            &create_test_settings(server),
            signer.clone(),
            store,
            refresher.clone(),
        )
        .unwrap();
        TestApi {
            api,
            signer,
            refresher,
        }
    }

    pub fn stored_session(device_id: &str) -> Session {
        Session::from_pairs([("a1", device_id), ("webId", "w")]).unwrap()
    }
}
