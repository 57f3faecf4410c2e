use crate::Request;
use crate::body::ResponseBody;
use crate::responder::Responder;
use async_trait::async_trait;
use http::Response;

use std::error::Error;
use std::fmt;
use std::future::Future;

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: Request) -> Result<Response<ResponseBody>, Box<dyn Error + Send + Sync>>;
}

/// An async function turned into a [`RequestHandler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future + Send,
    Fut::Output: Responder,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future + Send,
    Fut::Output: Responder,
{
    async fn invoke(&self, req: Request) -> Result<Response<ResponseBody>, Box<dyn Error + Send + Sync>> {
        let responder = (self.f)(req.clone()).await;
        Ok(responder.response_to(&req))
    }
}
