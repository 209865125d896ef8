//! End-to-end tests over a real socket, speaking raw HTTP/1.1.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use waypost_core::{
    AppConfig, ControllerRegistry, Error, ErrorBody, FutureExt, ListenConfig, MiddlewareRegistry,
    Next, RouteSpec, Server, ServerOptions,
};

struct Running {
    addr: String,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<waypost_core::Result<()>>,
}

impl Running {
    async fn shutdown(self) {
        let _ = self.stop.send(());
        self.handle.await.unwrap().unwrap();
    }
}

fn options() -> ServerOptions {
    ServerOptions {
        shutdown_timeout: Duration::from_secs(2),
        ..ServerOptions::default()
    }
}

async fn spawn(server: Server) -> Running {
    let (ready_tx, ready_rx) = oneshot::channel::<String>();
    let (stop, stop_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(server.start_with_shutdown(
        ListenConfig::new("127.0.0.1", 0),
        move |msg| {
            let _ = ready_tx.send(msg);
        },
        async move {
            let _ = stop_rx.await;
        },
    ));

    let msg = ready_rx.await.unwrap();
    let addr = msg
        .strip_prefix("server publish on http://")
        .unwrap()
        .to_string();
    Running { addr, stop, handle }
}

async fn send(addr: &str, request: &str) -> (u16, String, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
    (status, head.to_ascii_lowercase(), body.to_string())
}

async fn get(addr: &str, path: &str) -> (u16, String, String) {
    send(
        addr,
        &format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n"),
    )
    .await
}

fn demo_server(log: &Arc<Mutex<Vec<&'static str>>>) -> Server {
    let mut middlewares = MiddlewareRegistry::new();
    for name in ["auth", "auth1"] {
        let log = Arc::clone(log);
        middlewares.insert_fn(name, move |_shared, _req, _res| {
            log.lock().unwrap().push(name);
            async { Ok(Next::Continue) }.boxed()
        });
    }

    let config = AppConfig::new()
        .with_routes(vec![
            RouteSpec::get("/", "Home").middleware("auth").middleware("auth1"),
            RouteSpec::get("/broken", "Missing"),
            RouteSpec::post("/upload", "Home"),
        ])
        .with_controllers(
            ControllerRegistry::new()
                .with("Home", |ctx| async move { ctx.response.send("ok") }.boxed()),
        )
        .with_middlewares(middlewares);

    Server::new(config).with_options(options())
}

#[tokio::test]
async fn test_get_root_returns_ok_through_middlewares() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let running = spawn(demo_server(&log)).await;

    let (status, head, body) = get(&running.addr, "/").await;
    assert_eq!(status, 200);
    assert_eq!(body, "ok");
    assert!(head.contains("access-control-allow-origin: *"));
    assert_eq!(*log.lock().unwrap(), vec!["auth", "auth1"]);

    running.shutdown().await;
}

#[tokio::test]
async fn test_missing_controller_is_500_json() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let running = spawn(demo_server(&log)).await;

    let (status, head, body) = get(&running.addr, "/broken").await;
    assert_eq!(status, 500);
    assert!(head.contains("content-type: application/json"));

    let body: ErrorBody = waypost_core::parse_json(&body).unwrap();
    assert_eq!(body.code, 500);
    assert_eq!(body.message, "Invalid / Not Found Controller: Missing");

    running.shutdown().await;
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let running = spawn(demo_server(&log)).await;

    let (status, _, body) = get(&running.addr, "/nowhere").await;
    assert_eq!(status, 404);
    assert!(body.contains("Cannot GET /nowhere"));

    running.shutdown().await;
}

#[tokio::test]
async fn test_oversized_body_is_413() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let server = demo_server(&log).with_options(ServerOptions {
        max_body_size: 8,
        ..options()
    });
    let running = spawn(server).await;

    let addr = running.addr.clone();
    let request = format!(
        "POST /upload HTTP/1.1\r\nHost: {addr}\r\nContent-Length: 32\r\nConnection: close\r\n\r\n{}",
        "x".repeat(32)
    );
    let (status, _, _) = send(&addr, &request).await;
    assert_eq!(status, 413);

    running.shutdown().await;
}

#[tokio::test]
async fn test_bind_failure_is_reported_and_on_ready_not_called() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let running = spawn(demo_server(&log)).await;
    let port = running.addr.rsplit(':').next().unwrap().parse().unwrap();

    let mut ready = false;
    let result = demo_server(&log)
        .start_with_shutdown(
            ListenConfig::new("127.0.0.1", port),
            |_| ready = true,
            std::future::ready(()),
        )
        .await;

    assert!(matches!(result, Err(Error::BindError { .. })));
    assert!(!ready);

    running.shutdown().await;
}

#[tokio::test]
async fn test_missing_middleware_fails_before_binding() {
    let config = AppConfig::new()
        .with_routes(vec![RouteSpec::get("/", "Home").middleware("ghost")])
        .with_controllers(
            ControllerRegistry::new()
                .with("Home", |ctx| async move { ctx.response.send("ok") }.boxed()),
        );

    let mut ready = false;
    let err = Server::new(config)
        .start_with_shutdown(ListenConfig::new("127.0.0.1", 0), |_| ready = true, std::future::ready(()))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Middleware 'ghost' is not registered (route GET /)");
    assert!(!ready);
}
