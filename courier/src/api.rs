use crate::{CourierError, Method, Request};

/// Builds requests relative to a base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Api {
    base: String,
}

impl Api {
    /// `base` is normalized to end with `/`.
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        Api { base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn request(&self, method: Method, path: &str) -> Request {
        Request::new(method, self.url(path))
    }

    pub fn get(&self, path: &str) -> Request {
        Request::get(self.url(path))
    }

    pub fn post(&self, path: &str, body: impl Into<String>) -> Request {
        Request::post(self.url(path), body)
    }

    pub fn put(&self, path: &str, body: impl Into<String>) -> Request {
        Request::put(self.url(path), body)
    }

    pub fn delete(&self, path: &str) -> Request {
        Request::delete(self.url(path))
    }

    /// Resolves every `(method, path)` pair against the base, for
    /// [`Client::batch`](crate::Client::batch).
    pub fn batch<'a>(
        &self,
        items: impl IntoIterator<Item = (Method, &'a str)>,
    ) -> Result<Vec<Request>, CourierError> {
        items
            .into_iter()
            .enumerate()
            .map(|(index, (method, path))| {
                if path.is_empty() {
                    return Err(CourierError::MissingPath { index });
                }
                Ok(self.request(method, path))
            })
            .collect()
    }
}
