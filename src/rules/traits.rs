use super::types::{FetchContext, OutgoingRequest};

/// Decides what a fetched page means and whether its request is finished.
///
/// Returning `true` removes the request from the queue; `false` keeps it for
/// the next pass. Implementations run on a blocking thread, so sleeping before
/// returning `false` is a valid way to back off a single item.
pub trait ParseHandler: Send + Sync {
    fn parse(&self, ctx: &FetchContext<'_>) -> bool;
}

impl<F> ParseHandler for F
where
    F: Fn(&FetchContext<'_>) -> bool + Send + Sync,
{
    fn parse(&self, ctx: &FetchContext<'_>) -> bool {
        self(ctx)
    }
}

/// Runs right before the fetch and may rewrite method, URL, headers or body
pub trait RequestHook: Send + Sync {
    fn before_request(&self, request: &mut OutgoingRequest);
}

impl<F> RequestHook for F
where
    F: Fn(&mut OutgoingRequest) + Send + Sync,
{
    fn before_request(&self, request: &mut OutgoingRequest) {
        self(request)
    }
}
