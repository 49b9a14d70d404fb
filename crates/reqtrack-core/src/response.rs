//! Immutable response value for backends that buffer the whole payload

use crate::codes;
use crate::headers::{url_parameter, HeaderMap};
use crate::request::{HttpBase, HttpResponse};

/// Response built once a backend has finished reading
#[derive(Debug, Clone, Default)]
pub struct BasicResponse {
    code: i32,
    url: String,
    headers: HeaderMap,
    content: Vec<u8>,
}

impl BasicResponse {
    pub fn new(code: i32, url: impl Into<String>) -> Self {
        Self {
            code,
            url: url.into(),
            headers: HeaderMap::new(),
            content: Vec::new(),
        }
    }

    /// Add a header (builder style)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Set the payload (builder style)
    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = content.into();
        self
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        codes::is_ok(self.code)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl HttpBase for BasicResponse {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn url_parameter(&self, name: &str) -> Option<String> {
        url_parameter(&self.url, name)
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name).map(str::to_string)
    }

    fn all_headers(&self) -> Vec<String> {
        self.headers.lines()
    }

    fn content_length(&self) -> usize {
        self.content.len()
    }

    fn content(&self) -> Vec<u8> {
        self.content.clone()
    }
}

impl HttpResponse for BasicResponse {
    fn response_code(&self) -> i32 {
        self.code
    }
}
