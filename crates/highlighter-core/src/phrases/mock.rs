//! Mock phrase source for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{PhraseError, PhraseRequest, PhraseSource};

/// A hand-rolled [`PhraseSource`] with a fixed reply.
///
/// Counts calls and remembers the last request so tests can check what the
/// pipeline sent.
pub struct MockPhraseSource {
    reply: Result<Vec<String>, String>,
    call_count: AtomicUsize,
    last_request: Mutex<Option<PhraseRequest>>,
}

impl MockPhraseSource {
    /// Always answer with `phrases`.
    pub fn returning(phrases: &[&str]) -> Self {
        Self::with_reply(Ok(phrases.iter().map(|p| p.to_string()).collect()))
    }

    /// Always fail with a malformed-response error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self::with_reply(Err(message.to_string()))
    }

    fn with_reply(reply: Result<Vec<String>, String>) -> Self {
        Self {
            reply,
            call_count: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// How many times `extract_phrases()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<PhraseRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }
}

impl PhraseSource for MockPhraseSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn extract_phrases<'a>(
        &'a self,
        request: &'a PhraseRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, PhraseError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }
        let reply = self
            .reply
            .clone()
            .map_err(PhraseError::MalformedResponse);
        Box::pin(async move { reply })
    }
}
