#![allow(unused)]
use std::convert::Infallible;
use std::future::Future;
use std::net;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper_util::rt::TokioIo;
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::runtime;
use tokio::sync::oneshot;
use tokio_rustls::TlsAcceptor;

pub struct Server {
    addr: net::SocketAddr,
    scheme: &'static str,
    cert_pem: Option<String>,
    panic_rx: std_mpsc::Receiver<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Server {
    pub fn addr(&self) -> net::SocketAddr {
        self.addr
    }

    /// `https` servers are addressed as `localhost`, the name on their
    /// certificate.
    pub fn url(&self, path: &str) -> String {
        match self.scheme {
            "https" => format!("https://localhost:{}{}", self.addr.port(), path),
            scheme => format!("{}://{}{}", scheme, self.addr, path),
        }
    }

    /// The self-signed certificate of an `https` server.
    pub fn cert_pem(&self) -> &str {
        self.cert_pem.as_deref().expect("not a TLS server")
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if !::std::thread::panicking() {
            self.panic_rx
                .recv_timeout(Duration::from_secs(3))
                .expect("test server should not panic");
        }
    }
}

pub fn http<F, Fut>(func: F) -> Server
where
    F: Fn(http::Request<Incoming>) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = http::Response<String>> + Send + 'static,
{
    serve(func, None)
}

/// Like [`http`], behind TLS with a fresh self-signed `localhost`
/// certificate.
pub fn https<F, Fut>(func: F) -> Server
where
    F: Fn(http::Request<Incoming>) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = http::Response<String>> + Send + 'static,
{
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).expect("self-signed cert");
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .expect("protocol versions")
    .with_no_client_auth()
    .with_single_cert(vec![cert.der().clone()], key)
    .expect("server cert");

    serve(func, Some((TlsAcceptor::from(Arc::new(config)), cert.pem())))
}

fn serve<F, Fut>(func: F, tls: Option<(TlsAcceptor, String)>) -> Server
where
    F: Fn(http::Request<Incoming>) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = http::Response<String>> + Send + 'static,
{
    let _ = env_logger::try_init();

    let (acceptor, cert_pem) = match tls {
        Some((acceptor, pem)) => (Some(acceptor), Some(pem)),
        None => (None, None),
    };
    let scheme = if acceptor.is_some() { "https" } else { "http" };

    // Spawn new runtime in thread to prevent reactor execution context conflict
    let test_name = thread::current().name().unwrap_or("<unknown>").to_string();
    thread::spawn(move || {
        let rt = runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("new rt");
        let listener = rt.block_on(async move {
            tokio::net::TcpListener::bind(&std::net::SocketAddr::from(([127, 0, 0, 1], 0)))
                .await
                .unwrap()
        });
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let (panic_tx, panic_rx) = std_mpsc::channel();
        let tname = format!("test({})-support-server", test_name);
        let srv = thread::Builder::new()
            .name(tname)
            .spawn(move || {
                rt.block_on(async move {
                    loop {
                        tokio::select! {
                            _ = &mut shutdown_rx => {
                                break;
                            }
                            accepted = listener.accept() => {
                                let (io, _) = accepted.expect("accepted");
                                let func = func.clone();
                                let acceptor = acceptor.clone();
                                let svc = hyper::service::service_fn(move |req| {
                                    let fut = func(req);
                                    async move { Ok::<_, Infallible>(fut.await) }
                                });
                                tokio::spawn(async move {
                                    let builder = hyper::server::conn::http1::Builder::new();
                                    match acceptor {
                                        Some(acceptor) => {
                                            // clients that reject the certificate abort the handshake
                                            let Ok(tls) = acceptor.accept(io).await else {
                                                return;
                                            };
                                            let _ = builder.serve_connection(TokioIo::new(tls), svc).await;
                                        }
                                        None => {
                                            let _ = builder.serve_connection(TokioIo::new(io), svc).await;
                                        }
                                    }
                                });
                            }
                        }
                    }
                    let _ = panic_tx.send(());
                });
            })
            .expect("thread spawn");
        Server {
            addr,
            scheme,
            cert_pem,
            panic_rx,
            shutdown_tx: Some(shutdown_tx),
        }
    })
    .join()
    .unwrap()
}

/// Read the whole request body as UTF-8.
pub async fn body_string(req: http::Request<Incoming>) -> String {
    let bytes: Bytes = req
        .into_body()
        .collect()
        .await
        .expect("request body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn response(status: http::StatusCode, body: impl Into<String>) -> http::Response<String> {
    http::Response::builder()
        .status(status)
        .body(body.into())
        .unwrap()
}

pub fn challenge(header: &str) -> http::Response<String> {
    http::Response::builder()
        .status(http::StatusCode::UNAUTHORIZED)
        .header(http::header::WWW_AUTHENTICATE, header)
        .body("unauthorized".into())
        .unwrap()
}

pub fn authorization(req: &http::Request<Incoming>) -> Option<String> {
    req.headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// A port nothing is listening on.
pub fn unused_port() -> u16 {
    let listener = net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
