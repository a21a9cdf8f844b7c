//! Integration tests for net crate

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::tempdir;
    use vpkg_net::*;

    fn quick_client() -> NetClient {
        NetClient::new(NetConfig {
            retry_count: 0,
            retry_delay: Duration::from_millis(1),
            ..NetConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_reports_progress() {
        let server = MockServer::start();
        let content = vec![7u8; 64 * 1024];
        let mock = server.mock(|when, then| {
            when.method(GET).path("/zoom.deb");
            then.status(200)
                .header("content-length", content.len().to_string())
                .body(&content);
        });

        let temp = tempdir().unwrap();
        // Nested directory that does not exist yet
        let dest = temp.path().join("3").join("zoom.deb");
        let fetcher = Fetcher::new(quick_client());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let written = fetcher
            .fetch(&server.url("/zoom.deb"), &dest, move |p| {
                sink.lock().unwrap().push(p);
            })
            .await
            .unwrap();

        mock.assert();
        assert_eq!(written, content.len() as u64);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), content);

        let seen = seen.lock().unwrap();
        let last = seen.last().unwrap();
        assert_eq!(last.downloaded, content.len() as u64);
        assert_eq!(last.total, Some(content.len() as u64));
        assert!(seen.windows(2).all(|w| w[0].downloaded <= w[1].downloaded));
    }

    #[tokio::test]
    async fn test_existing_directory_is_fine() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/a.deb");
            then.status(200).body("a");
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("a.deb");
        let fetcher = Fetcher::new(quick_client());

        fetcher.fetch(&server.url("/a.deb"), &dest, |_| {}).await.unwrap();
        fetcher.fetch(&server.url("/a.deb"), &dest, |_| {}).await.unwrap();
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"a");
    }

    #[tokio::test]
    async fn test_http_error_handling() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/404");
            then.status(404).body("Not Found");
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("missing.deb");
        let error = Fetcher::new(quick_client())
            .fetch(&server.url("/404"), &dest, |_| {})
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            vpkg_errors::Error::Network(vpkg_errors::NetworkError::HttpError { status: 404, .. })
        ));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/busy.deb");
            then.status(503).body("Service Unavailable");
        });

        let client = NetClient::new(NetConfig {
            retry_count: 2,
            retry_delay: Duration::from_millis(1),
            ..NetConfig::default()
        })
        .unwrap();
        let temp = tempdir().unwrap();
        let error = Fetcher::new(client)
            .fetch(&server.url("/busy.deb"), &temp.path().join("busy.deb"), |_| {})
            .await
            .unwrap_err();

        mock.assert_hits(3);
        assert!(matches!(
            error,
            vpkg_errors::Error::Network(vpkg_errors::NetworkError::HttpError { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/gone.deb");
            then.status(404);
        });

        let client = NetClient::new(NetConfig {
            retry_count: 2,
            retry_delay: Duration::from_millis(1),
            ..NetConfig::default()
        })
        .unwrap();
        let temp = tempdir().unwrap();
        let result = Fetcher::new(client)
            .fetch(&server.url("/gone.deb"), &temp.path().join("gone.deb"), |_| {})
            .await;

        assert!(result.is_err());
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let temp = tempdir().unwrap();
        let error = Fetcher::new(quick_client())
            .fetch("ftp://example.com/a.deb", &temp.path().join("a.deb"), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            vpkg_errors::Error::Network(vpkg_errors::NetworkError::InvalidUrl(_))
        ));
    }
}
