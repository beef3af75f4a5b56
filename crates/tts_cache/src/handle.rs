//! Cancellable conversion handles
//!
//! [`spawn_conversion`] runs a conversion on the tokio runtime and returns a
//! [`ConversionHandle`]. Awaiting the handle yields the result. Callers that
//! poll once per frame use [`ConversionHandle::try_result`] instead.
//!
//! Cancelling (or dropping) the handle aborts the task at its next
//! suspension point. Blocking work already handed to the blocking pool, such
//! as a native engine run or a cache write, still runs to completion.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use tokio::task::{JoinError, JoinHandle};
use tracing::{Instrument, debug, info_span};

use crate::error::SpeechError;
use crate::ports::SpeechBackend;
use crate::types::{AudioAsset, ConversionRequest};

/// Result delivered by a [`ConversionHandle`]
pub type ConversionResult = Result<AudioAsset, SpeechError>;

/// Start converting `request` with `backend` in the background
///
/// # Panics
///
/// Panics if called outside of a tokio runtime.
pub fn spawn_conversion(
    backend: Arc<dyn SpeechBackend>,
    request: ConversionRequest,
) -> ConversionHandle {
    let span = info_span!(
        "conversion",
        provider = %request.provider_id,
        text_len = request.text.len()
    );
    let task = tokio::spawn(async move { backend.convert(&request).await }.instrument(span));

    ConversionHandle { task: Some(task) }
}

/// Handle to a background conversion
///
/// The result is delivered exactly once, either by awaiting the handle or
/// by [`try_result`](Self::try_result).
#[derive(Debug)]
#[must_use = "dropping a ConversionHandle cancels the conversion"]
pub struct ConversionHandle {
    task: Option<JoinHandle<ConversionResult>>,
}

impl ConversionHandle {
    /// Abandon the conversion
    ///
    /// The handle then resolves to `SpeechError::Cancelled` unless the
    /// conversion had already finished.
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            debug!("Cancelling conversion");
            task.abort();
        }
    }

    /// Whether the result is ready (or was already taken)
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Take the result if the conversion has finished
    ///
    /// Returns `None` while the conversion is running and after the result
    /// was taken.
    pub fn try_result(&mut self) -> Option<ConversionResult> {
        let task = self.task.as_mut()?;
        if !task.is_finished() {
            return None;
        }

        let mut cx = Context::from_waker(Waker::noop());
        match Pin::new(task).poll(&mut cx) {
            Poll::Ready(joined) => {
                self.task = None;
                Some(flatten(joined))
            },
            Poll::Pending => None,
        }
    }
}

impl Future for ConversionHandle {
    type Output = ConversionResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(task) = self.task.as_mut() else {
            // Result was already taken through `try_result`
            return Poll::Ready(Err(SpeechError::Cancelled));
        };

        match Pin::new(task).poll(cx) {
            Poll::Ready(joined) => {
                self.task = None;
                Poll::Ready(flatten(joined))
            },
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ConversionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn flatten(joined: Result<ConversionResult, JoinError>) -> ConversionResult {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Err(SpeechError::Cancelled),
        Err(e) => Err(SpeechError::EngineFailed(format!(
            "Conversion task panicked: {e}"
        ))),
    }
}
