use crate::http::reason_phrase;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;

/// A single-use response. Any of the terminal write methods (`send`,
/// `json`) may run at most once; after that `finished` is `true` and
/// further terminal calls are no-ops (logged as a diagnostic rather than a
/// panic, matching the rest of this crate's posture of never trusting a
/// handler author to get the chain contract right).
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    finished: bool,
    finish_hook: Option<Box<dyn FnOnce() + Send>>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Vec::new(),
            finished: false,
            finish_hook: None,
        }
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status code. Mutating status after a terminal write is a
    /// programmer error; it is logged and ignored rather than panicking.
    pub fn status(&mut self, code: u16) -> &mut Self {
        if self.finished {
            log::error!("Response::status called after the response was already sent");
            return self;
        }
        self.status = code;
        self
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        if self.finished {
            log::error!("Response::set_header called after the response was already sent");
            return self;
        }
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn on_finish(&mut self, hook: impl FnOnce() + Send + 'static) -> &mut Self {
        self.finish_hook = Some(Box::new(hook));
        self
    }

    pub fn get_status(&self) -> u16 {
        self.status
    }

    pub fn get_body_length(&self) -> usize {
        self.body.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Terminal write: emits `body` as `text/plain` (unless the caller
    /// already set a `Content-Type` header) and marks the response sent.
    pub fn send(&mut self, body: impl Into<Vec<u8>>) {
        if self.finished {
            log::error!("Response::send called twice; ignoring the second write");
            return;
        }
        self.body = body.into();
        self.headers
            .entry("Content-Type".to_string())
            .or_insert_with(|| "text/plain".to_string());
        self.finish();
    }

    /// Terminal write: serializes `value` as JSON and emits it as
    /// `application/json`.
    pub fn json<T: Serialize>(&mut self, value: &T) -> anyhow::Result<()> {
        if self.finished {
            log::error!("Response::json called twice; ignoring the second write");
            return Ok(());
        }
        self.body = serde_json::to_vec(value)?;
        self.headers
            .entry("Content-Type".to_string())
            .or_insert_with(|| "application/json".to_string());
        self.finish();
        Ok(())
    }

    fn finish(&mut self) {
        self.headers
            .insert("Content-Length".to_string(), self.body.len().to_string());
        self.finished = true;
        if let Some(hook) = self.finish_hook.take() {
            hook();
        }
    }

    /// Serializes this response onto the wire: status line, headers, a
    /// blank line, then the body. Called by the acceptor once the chain
    /// for a request has run (or failed without producing a response).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = String::new();
        let _ = writeln!(
            head,
            "HTTP/1.1 {} {}\r",
            self.status,
            reason_phrase(self.status)
        );
        for (key, value) in &self.headers {
            let _ = writeln!(head, "{}: {}\r", key, value);
        }
        head.push_str("\r\n");

        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_sets_content_type_length_and_finished() {
        let mut res = Response::new();
        res.send("ok");
        assert!(res.is_finished());
        assert_eq!(res.get_body_length(), 2);
        assert_eq!(res.get_status(), 200);
    }

    #[test]
    fn second_terminal_write_is_a_no_op() {
        let mut res = Response::new();
        res.send("first");
        res.send("second");
        assert_eq!(res.get_body_length(), "first".len());
    }

    #[test]
    fn json_sets_application_json_content_type() {
        #[derive(Serialize)]
        struct Body {
            status: u16,
            message: String,
        }
        let mut res = Response::new();
        res.status(500);
        res.json(&Body {
            status: 500,
            message: "boom".into(),
        })
        .unwrap();
        let bytes = res.to_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("HTTP/1.1 500 Internal Server Error"));
        assert!(text.contains("application/json"));
        assert!(text.contains("\"message\":\"boom\""));
    }

    #[test]
    fn finish_hook_runs_exactly_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let mut res = Response::new();
        res.on_finish(move || {
            calls2.fetch_add(1, Ordering::SeqCst);
        });
        res.send("a");
        res.send("b");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
