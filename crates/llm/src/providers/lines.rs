//! Newline framing for streamed HTTP bodies.
//!
//! Providers stream either newline-delimited JSON (Ollama) or server-sent
//! events (OpenAI). Network chunks do not respect line boundaries, and a
//! multi-byte character can straddle two chunks, so bytes are buffered until
//! a full line is available.

use futures::{Stream, StreamExt};
use groundwork_core::{AppError, AppResult};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

struct LineState<B, E> {
    inner: Pin<Box<dyn Stream<Item = Result<B, E>> + Send>>,
    buffer: Vec<u8>,
    ready: VecDeque<String>,
    finished: bool,
}

/// Split a byte stream into text lines without their `\n` / `\r\n` endings.
///
/// A trailing line without a newline is emitted when the body ends. A
/// transport error is yielded once and ends the stream.
pub(crate) fn into_lines<S, B, E>(stream: S) -> impl Stream<Item = AppResult<String>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = LineState {
        inner: Box::pin(stream),
        buffer: Vec::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(line) = st.ready.pop_front() {
                return Some((Ok(line), st));
            }
            if st.finished {
                return None;
            }

            match st.inner.next().await {
                Some(Ok(bytes)) => {
                    st.buffer.extend_from_slice(bytes.as_ref());
                    while let Some(pos) = st.buffer.iter().position(|b| *b == b'\n') {
                        let line: Vec<u8> = st.buffer.drain(..=pos).collect();
                        st.ready.push_back(decode_line(&line));
                    }
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(AppError::Llm(format!("Stream error: {}", e))), st));
                }
                None => {
                    st.finished = true;
                    if !st.buffer.is_empty() {
                        let rest = std::mem::take(&mut st.buffer);
                        st.ready.push_back(decode_line(&rest));
                    }
                }
            }
        }
    })
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(|c: char| c == '\n' || c == '\r')
        .to_string()
}
