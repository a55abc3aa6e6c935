use std::{fmt, time::Duration};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn name(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
    pub timeout: Duration,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Request {
            method,
            url: url.into(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(Method::Post, url).with_body(body)
    }

    pub fn put(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(Method::Put, url).with_body(body)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Transport status; 0 when no response arrived in time.
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Response {
            status,
            body: body.into(),
        }
    }

    /// Stand-in response for a request that never answered.
    pub fn timed_out(timeout: Duration) -> Self {
        Response {
            status: 0,
            body: format!("Request timed out after {}ms", timeout.as_millis()),
        }
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A request waiting for the host to put it on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub id: RequestId,
    pub request: Request,
}

/// What one request of a batch produced, keyed by its position in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub index: usize,
    pub request: RequestId,
    pub success: bool,
    pub response: Option<Response>,
}

/// Per-request hook of a batch item: the request's own exchange plus every slot
/// of the batch as it stands, with `None` for requests still in flight.
pub type ItemHook = Box<dyn FnOnce(&Exchange, &[Option<Exchange>]) + Send>;

/// One request of a batch, with optional hooks that fire when that request
/// settles and before it counts toward the batch.
///
/// `on_then` or `on_error` fires first depending on the request's own outcome,
/// then `on_always`.
pub struct BatchItem {
    pub request: Request,
    pub(crate) hooks: ItemHooks,
}

#[derive(Default)]
pub(crate) struct ItemHooks {
    then: Option<ItemHook>,
    error: Option<ItemHook>,
    always: Option<ItemHook>,
}

impl ItemHooks {
    /// Takes the hook matching `success` and the always hook, in firing order.
    pub(crate) fn take(&mut self, success: bool) -> [Option<ItemHook>; 2] {
        let outcome = if success {
            self.then.take()
        } else {
            self.error.take()
        };
        [outcome, self.always.take()]
    }
}

impl BatchItem {
    pub fn new(request: Request) -> Self {
        BatchItem {
            request,
            hooks: ItemHooks::default(),
        }
    }

    pub fn on_then(
        mut self,
        hook: impl FnOnce(&Exchange, &[Option<Exchange>]) + Send + 'static,
    ) -> Self {
        self.hooks.then = Some(Box::new(hook));
        self
    }

    pub fn on_error(
        mut self,
        hook: impl FnOnce(&Exchange, &[Option<Exchange>]) + Send + 'static,
    ) -> Self {
        self.hooks.error = Some(Box::new(hook));
        self
    }

    pub fn on_always(
        mut self,
        hook: impl FnOnce(&Exchange, &[Option<Exchange>]) + Send + 'static,
    ) -> Self {
        self.hooks.always = Some(Box::new(hook));
        self
    }
}

impl From<Request> for BatchItem {
    fn from(request: Request) -> Self {
        BatchItem::new(request)
    }
}

impl fmt::Debug for BatchItem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BatchItem")
            .field("request", &self.request)
            .field("then", &self.hooks.then.is_some())
            .field("error", &self.hooks.error.is_some())
            .field("always", &self.hooks.always.is_some())
            .finish()
    }
}

/// Values carried through request futures.
///
/// A single request settles with `[Response, Request]`; a batch settles with one
/// `[Exchange]` tuple per request; a submission rejected before sending settles
/// with `[Invalid]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Response(Response),
    Request(RequestId),
    Exchange(Exchange),
    Invalid(Vec<String>),
}

impl Message {
    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Message::Response(response) => Some(response),
            _ => None,
        }
    }

    pub fn as_exchange(&self) -> Option<&Exchange> {
        match self {
            Message::Exchange(exchange) => Some(exchange),
            _ => None,
        }
    }
}
