//! # Dispatcher
//!
//! Runs a compiled route for one request: the route's middleware chain, then
//! its controller. Every call happens inside a failure boundary that covers
//! the whole asynchronous extent of the call and also catches panics. The
//! dispatcher never writes a response on failure; it returns the error so the
//! error translator can render it.

use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::middleware::Next;
use crate::route::CompiledRoute;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Await `fut`, turning a panic into `Error::Panic`
pub(crate) async fn guard<T, F>(fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Error::Panic {
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Run `route` for the request held in `ctx`
///
/// Middlewares run strictly in route order; a `Halt` ends the request with
/// whatever response has been written, a failure skips the rest.
///
/// # Errors
///
/// Returns the first failure raised by a middleware or the controller, or
/// `Error::ControllerNotFound` if the route's controller key never resolved.
pub async fn dispatch(route: &CompiledRoute, ctx: &mut RequestContext) -> Result<()> {
    let (shared, req, res) = ctx.split();
    if route.middlewares.run(shared, req, res).await? == Next::Halt {
        return Ok(());
    }
    invoke_controller(route, ctx).await
}

/// Call the route's controller inside the failure boundary
///
/// # Errors
///
/// `Error::ControllerNotFound` for an unresolved controller, otherwise
/// whatever the controller returned (or `Error::Panic`).
pub async fn invoke_controller(route: &CompiledRoute, ctx: &mut RequestContext) -> Result<()> {
    let controller = route
        .controller()
        .ok_or_else(|| Error::ControllerNotFound {
            key: route.controller_key.clone(),
        })?;
    guard(controller(ctx)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SharedContext;
    use crate::middleware::{from_fn, MiddlewareChain};
    use crate::registry::{controller, ControllerFn};
    use crate::request::Request;
    use crate::router::RouteMethod;
    use hyper::Method;
    use std::sync::Arc;
    use std::time::Duration;

    fn ctx() -> RequestContext {
        RequestContext::new(
            Request::empty(Method::GET, "/"),
            Arc::new(SharedContext::default()),
        )
    }

    fn route(controller: Option<ControllerFn>, middlewares: MiddlewareChain) -> CompiledRoute {
        CompiledRoute::new(RouteMethod::Get, "/", "Home", controller, middlewares).unwrap()
    }

    #[tokio::test]
    async fn test_guard_passes_results_through() {
        assert_eq!(guard(async { Ok(7) }).await.unwrap(), 7);
        let err = guard(async { Err::<(), _>(Error::handler("nope")) }).await;
        assert_eq!(err.unwrap_err().to_string(), "nope");
    }

    #[tokio::test]
    async fn test_guard_catches_string_panic() {
        let name = String::from("dynamic");
        let result: Result<()> = guard(async move {
            if !name.is_empty() {
                panic!("{name} panic");
            }
            Ok(())
        })
        .await;
        assert_eq!(result.unwrap_err().to_string(), "dynamic panic");
    }

    #[tokio::test]
    async fn test_missing_controller_fails_at_request_time() {
        let route = route(None, MiddlewareChain::new());
        let err = dispatch(&route, &mut ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid / Not Found Controller: Home");
    }

    #[tokio::test]
    async fn test_failure_after_suspension_is_captured() {
        let controller = controller(|ctx| {
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                if ctx.request.path == "/" {
                    return Err(Error::handler("late failure"));
                }
                Ok(())
            }
            .boxed()
        });
        let route = route(Some(controller), MiddlewareChain::new());

        let mut ctx = ctx();
        let err = dispatch(&route, &mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "late failure");
        assert!(!ctx.response.is_sent());
    }

    #[tokio::test]
    async fn test_halting_middleware_skips_controller() {
        let controller = controller(|ctx| async move { ctx.response.send("controller") }.boxed());
        let mut chain = MiddlewareChain::new();
        chain.add(from_fn(|_shared, _req, res| {
            async move {
                res.status(401).send("denied")?;
                Ok(Next::Halt)
            }
            .boxed()
        }));

        let mut ctx = ctx();
        dispatch(&route(Some(controller), chain), &mut ctx).await.unwrap();
        assert_eq!(ctx.response.status, 401);
        assert_eq!(ctx.response.body_str(), Some("denied"));
    }
}
