//! Demo server: `GET /` runs the `auth` and `auth1` middlewares, then the
//! `Home` controller answers `ok`.

use tracing::info;
use waypost_core::{
    handler, init_tracing, AppConfig, ControllerRegistry, ListenConfig, LogFormat,
    MiddlewareRegistry, Next, Request, RequestContext, Response, RouteSpec, Server,
    SharedContext,
};

const ROUTES: &str = r#"[
    {
        "path": "/",
        "method": "GET",
        "middlewares": ["auth", "auth1"],
        "controller": "Home"
    }
]"#;

#[handler]
async fn auth(_shared: &SharedContext, req: &mut Request, _res: &mut Response) -> waypost_core::Result<Next> {
    info!(path = %req.path, "auth");
    Ok(Next::Continue)
}

#[handler]
async fn auth1(_shared: &SharedContext, req: &mut Request, _res: &mut Response) -> waypost_core::Result<Next> {
    info!(path = %req.path, "auth1");
    Ok(Next::Continue)
}

#[handler]
async fn home(ctx: &mut RequestContext) -> waypost_core::Result<()> {
    info!("controller");
    ctx.response.send("ok")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(LogFormat::Pretty);

    let config = AppConfig::new()
        .with_routes(RouteSpec::list_from_json(ROUTES)?)
        .with_controllers(ControllerRegistry::new().with("Home", home))
        .with_middlewares(
            MiddlewareRegistry::new()
                .with_fn("auth", auth)
                .with_fn("auth1", auth1),
        );

    Server::new(config)
        .start(ListenConfig::new("localhost", 3009), |msg| println!("{msg}"))
        .await?;
    Ok(())
}
