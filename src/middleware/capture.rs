//! Response writer wrapper that remembers the status sent downstream.

use http::{HeaderMap, StatusCode};

/// Sink a pipeline stage writes its response into.
///
/// Mirrors the classic writer contract: headers may be edited until the
/// status is written, and the first body write implies `200 OK` if no
/// status was written before it.
pub trait ResponseWriter: Send {
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sends the status line. Only the first call has an effect downstream.
    fn write_status(&mut self, status: StatusCode);

    /// Writes a chunk of the body.
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize>;
}

impl<W: ResponseWriter + ?Sized> ResponseWriter for &mut W {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        (**self).headers_mut()
    }

    fn write_status(&mut self, status: StatusCode) {
        (**self).write_status(status)
    }

    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        (**self).write(buf)
    }
}

/// Forwards every call to the wrapped writer and records the first status.
pub struct StatusCapture<W> {
    inner: W,
    status: Option<StatusCode>,
}

impl<W: ResponseWriter> StatusCapture<W> {
    pub fn new(inner: W) -> Self {
        StatusCapture {
            inner,
            status: None,
        }
    }

    /// Status the downstream sink reports: the first one written, else 200.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: ResponseWriter> ResponseWriter for StatusCapture<W> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
        self.inner.write_status(status);
    }

    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.inner.write(buf)
    }
}
