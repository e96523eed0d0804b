//! TLS fallback tests for the page fetcher
//!
//! A local HTTPS server presents a self-signed certificate, which the
//! verifying client rejects and the fallback client accepts.

use linkcal::config::FetchConfig;
use linkcal::fetch::PageFetcher;
use linkcal::FetchError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::rustls::{Certificate, PrivateKey, ServerConfig};
use tokio_rustls::TlsAcceptor;

const CERT_DER: &[u8] = include_bytes!("../fixtures/self_signed_cert.der");
const KEY_DER: &[u8] = include_bytes!("../fixtures/self_signed_key.der");

const PAGE: &str = "<html><body><h1>Launch Party</h1></body></html>";

/// What the server does once a TLS handshake completes
#[derive(Clone, Copy)]
enum Behavior {
    ServePage,
    HangUp,
}

struct TlsServer {
    url: String,
    connections: Arc<AtomicUsize>,
}

async fn tls_server(behavior: Behavior) -> TlsServer {
    let config = ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(vec![Certificate(CERT_DER.to_vec())], PrivateKey(KEY_DER.to_vec()))
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));

    let counter = connections.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                // The verifying client aborts the handshake
                let Ok(mut tls) = acceptor.accept(stream).await else {
                    return;
                };
                if let Behavior::HangUp = behavior {
                    return;
                }

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match tls.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    PAGE.len(),
                    PAGE
                );
                let _ = tls.write_all(response.as_bytes()).await;
                let _ = tls.shutdown().await;
            });
        }
    });

    TlsServer {
        url: format!("https://127.0.0.1:{}/event", addr.port()),
        connections,
    }
}

#[tokio::test]
async fn test_self_signed_page_fetched_on_retry() {
    let server = tls_server(Behavior::ServePage).await;
    let fetcher = PageFetcher::new(&FetchConfig::default()).unwrap();

    let body = fetcher.fetch(&server.url).await.unwrap();

    assert_eq!(body, PAGE);
    assert_eq!(server.connections.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_retry_is_transport_error() {
    let server = tls_server(Behavior::HangUp).await;
    let fetcher = PageFetcher::new(&FetchConfig::default()).unwrap();

    let err = fetcher.fetch(&server.url).await.unwrap_err();

    match err {
        FetchError::Transport { url, .. } => assert_eq!(url, server.url),
        other => panic!("unexpected error: {:?}", other),
    }
    // One verified attempt and exactly one retry
    assert_eq!(server.connections.load(Ordering::SeqCst), 2);
}
