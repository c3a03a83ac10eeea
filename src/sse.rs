//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! This module turns a raw byte stream into discrete frames and then into typed payloads.
//! [`SseDecoder`] does the framing and is purely synchronous: push bytes in, pull
//! [`StreamEvent`]s out.  [`EventReader`] drives a decoder from an asynchronous byte source,
//! deserializes each frame's data as JSON, and owns the byte source so that dropping or
//! closing the reader releases the underlying connection.

use std::collections::VecDeque;
use std::marker::PhantomData;

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};
use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS};

/// Payload that marks graceful end of stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One decoded frame of the event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamEvent {
    /// The `event:` label, if the frame carried one.
    pub event: Option<String>,
    /// All `data:` lines of the frame, joined with `\n`.
    pub data: String,
    /// The `id:` field, if the frame carried one.
    pub id: Option<String>,
}

impl StreamEvent {
    /// Returns true if this frame is the end-of-stream sentinel.
    pub fn is_done(&self) -> bool {
        self.data == DONE_SENTINEL
    }
}

/// Incremental frame assembler.
///
/// Bytes are buffered until a full line is available, so frames, lines and multi-byte
/// characters may be split across pushes at any position.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    id: Option<String>,
    data: Vec<String>,
    ready: VecDeque<StreamEvent>,
}

impl SseDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes into the decoder.  Completed frames become available from
    /// [`SseDecoder::next_event`].
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(bytes);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.process_line(&line[..line.len() - 1])?;
        }
        Ok(())
    }

    /// Signals end of input.  An unterminated trailing line is interpreted, and a frame that
    /// was still being assembled is dispatched.
    pub fn finish(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.process_line(&line)?;
        }
        self.dispatch();
        Ok(())
    }

    /// Pops the next completed frame.
    pub fn next_event(&mut self) -> Option<StreamEvent> {
        self.ready.pop_front()
    }

    fn process_line(&mut self, line: &[u8]) -> Result<()> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let line = std::str::from_utf8(line)?;
        if line.is_empty() {
            self.dispatch();
            return Ok(());
        }
        if line.starts_with(':') {
            return Ok(());
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        Ok(())
    }

    fn dispatch(&mut self) {
        let event = self.event.take();
        let id = self.id.take();
        if self.data.is_empty() {
            return;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        self.ready.push_back(StreamEvent { event, data, id });
    }
}

/// Pulls typed payloads out of an event stream.
///
/// The reader is forward-only and finite.  It ends cleanly on the `[DONE]` sentinel or when
/// the byte source is exhausted.  The first error, whether a payload that does not
/// deserialize as `T` or a failure of the byte source, is returned once and every later call
/// yields `Ok(None)`.  Whenever the reader stops, it drops the byte source.
///
/// ```
/// use bytes::Bytes;
/// use futures::stream;
/// use modelchat::{CompletionChunk, EventReader};
///
/// # tokio_test::block_on(async {
/// let body = b"data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n\ndata: [DONE]\n\n";
/// let source = stream::iter(vec![Ok::<_, modelchat::Error>(Bytes::from_static(body))]);
/// let mut reader = EventReader::<_, CompletionChunk>::new(source);
/// let chunk = reader.next().await.unwrap().unwrap();
/// assert_eq!(chunk.text(), "hi");
/// assert!(reader.next().await.unwrap().is_none());
/// # });
/// ```
pub struct EventReader<S, T> {
    source: Option<S>,
    decoder: SseDecoder,
    finished: bool,
    _payload: PhantomData<fn() -> T>,
}

impl<S, T> EventReader<S, T> {
    /// Wraps a byte source.
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            decoder: SseDecoder::new(),
            finished: false,
            _payload: PhantomData,
        }
    }

    /// Stops the reader and releases the byte source.  Safe to call repeatedly.
    pub fn close(&mut self) {
        self.finished = true;
        self.source = None;
    }

    /// Returns true once the reader has stopped producing payloads.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<S, T> EventReader<S, T>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
    T: DeserializeOwned,
{
    /// Returns the next raw frame, or `None` at end of stream.
    pub async fn next_event(&mut self) -> Result<Option<StreamEvent>> {
        loop {
            if self.finished {
                return Ok(None);
            }
            if let Some(event) = self.decoder.next_event() {
                if event.is_done() {
                    debug!("event stream reached the end-of-stream sentinel");
                    self.close();
                    return Ok(None);
                }
                STREAM_EVENTS.click();
                return Ok(Some(event));
            }
            let Some(source) = self.source.as_mut() else {
                self.finished = true;
                return Ok(None);
            };
            let next = source.next().await;
            match next {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    if let Err(err) = self.decoder.push(&bytes) {
                        return Err(self.fail(err));
                    }
                }
                Some(Err(err)) => {
                    return Err(self.fail(err));
                }
                None => {
                    debug!("event stream source exhausted");
                    self.source = None;
                    if let Err(err) = self.decoder.finish() {
                        return Err(self.fail(err));
                    }
                }
            }
        }
    }

    /// Returns the next payload, or `None` at end of stream.
    pub async fn next(&mut self) -> Result<Option<T>> {
        let Some(event) = self.next_event().await? else {
            return Ok(None);
        };
        match serde_json::from_str::<T>(&event.data) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) => Err(self.fail(Error::parse(
                format!("Failed to parse event JSON: {e}"),
                Some(Box::new(e)),
            ))),
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        STREAM_ERRORS.click();
        self.close();
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::{Value, json};
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Poll};

    type Chunks = stream::Iter<std::vec::IntoIter<Result<Bytes>>>;

    fn chunks<B: AsRef<[u8]>>(parts: &[B]) -> Chunks {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::copy_from_slice(p.as_ref())))
                .collect::<Vec<_>>(),
        )
    }

    async fn drain(reader: &mut EventReader<Chunks, Value>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Some(value) = reader.next().await.unwrap() {
            out.push(value);
        }
        out
    }

    const TWO_CHUNKS: &[u8] = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n\
data: [DONE]\n\n";

    #[tokio::test]
    async fn frames_then_done() {
        let mut reader = EventReader::<_, Value>::new(chunks(&[TWO_CHUNKS]));
        let values = drain(&mut reader).await;
        assert_eq!(
            values,
            vec![
                json!({"choices": [{"delta": {"content": "Hel"}}]}),
                json!({"choices": [{"delta": {"content": "lo"}}]}),
            ]
        );
        assert!(reader.is_finished());
        assert!(reader.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn byte_at_a_time_matches_single_chunk() {
        let parts: Vec<&[u8]> = TWO_CHUNKS.chunks(1).collect();
        let mut split = EventReader::<_, Value>::new(chunks(&parts));
        let mut whole = EventReader::<_, Value>::new(chunks(&[TWO_CHUNKS]));
        assert_eq!(drain(&mut split).await, drain(&mut whole).await);
    }

    #[tokio::test]
    async fn split_inside_multibyte_character() {
        let frame = "data: {\"text\":\"héllo ✓\"}\n\n".as_bytes();
        let cut = frame.iter().position(|b| *b == 0xc3).unwrap() + 1;
        let mut reader =
            EventReader::<_, Value>::new(chunks(&[&frame[..cut], &frame[cut..]]));
        assert_eq!(drain(&mut reader).await, vec![json!({"text": "héllo ✓"})]);
    }

    #[tokio::test]
    async fn multiple_data_lines_are_joined() {
        let mut reader = EventReader::<_, Value>::new(chunks(&[b"data: [1,\ndata: 2]\n\n"]));
        assert_eq!(drain(&mut reader).await, vec![json!([1, 2])]);

        let mut decoder = SseDecoder::new();
        decoder.push(b"data: a\ndata: b\n\n").unwrap();
        assert_eq!(decoder.next_event().unwrap().data, "a\nb");
    }

    #[tokio::test]
    async fn comments_and_labels() {
        let mut decoder = SseDecoder::new();
        decoder
            .push(b": keep-alive\nevent: completion\n: another\nid: 7\ndata: {}\n\n")
            .unwrap();
        assert_eq!(
            decoder.next_event(),
            Some(StreamEvent {
                event: Some("completion".to_string()),
                data: "{}".to_string(),
                id: Some("7".to_string()),
            })
        );
        assert_eq!(decoder.next_event(), None);
    }

    #[test]
    fn frames_without_data_are_skipped() {
        let mut decoder = SseDecoder::new();
        decoder.push(b": ping\n\nevent: noop\n\ndata:x\n\n").unwrap();
        let event = decoder.next_event().unwrap();
        assert_eq!(event.data, "x");
        assert_eq!(event.event, None);
        assert_eq!(decoder.next_event(), None);
    }

    #[test]
    fn crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: one\r\n\r\ndata: two\r\n\r\n").unwrap();
        assert_eq!(decoder.next_event().unwrap().data, "one");
        assert_eq!(decoder.next_event().unwrap().data, "two");
    }

    #[test]
    fn partial_line_waits_for_terminator() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: {\"a\"").unwrap();
        assert_eq!(decoder.next_event(), None);
        decoder.push(b":1}\n").unwrap();
        assert_eq!(decoder.next_event(), None);
        decoder.push(b"\n").unwrap();
        assert_eq!(decoder.next_event().unwrap().data, "{\"a\":1}");
    }

    #[tokio::test]
    async fn trailing_frame_at_end_of_input() {
        let mut reader = EventReader::<_, Value>::new(chunks(&[b"data: 1\n\ndata: 2"]));
        assert_eq!(drain(&mut reader).await, vec![json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn nothing_after_done() {
        let mut reader =
            EventReader::<_, Value>::new(chunks(&[b"data: 1\n\ndata: [DONE]\n\ndata: 2\n\n"]));
        assert_eq!(drain(&mut reader).await, vec![json!(1)]);
    }

    #[tokio::test]
    async fn malformed_frame_fails_once() {
        let mut reader = EventReader::<_, Value>::new(chunks(&[
            b"data: 1\n\ndata: {not json\n\ndata: 2\n\ndata: [DONE]\n\n",
        ]));
        assert_eq!(reader.next().await.unwrap(), Some(json!(1)));
        let err = reader.next().await.unwrap_err();
        assert!(err.is_parse(), "unexpected error: {err}");
        assert!(reader.is_finished());
        assert!(reader.next().await.unwrap().is_none());
        assert!(reader.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_parse_error() {
        let mut reader =
            EventReader::<_, Value>::new(chunks(&[&b"data: 1\n\ndata: \xff\xfe\n\n"[..]]));
        assert_eq!(reader.next().await.unwrap(), Some(json!(1)));
        let err = reader.next().await.unwrap_err();
        assert!(err.is_parse(), "unexpected error: {err}");
        assert!(!err.is_transport());
        assert!(reader.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn source_error_terminates() {
        let source = stream::iter(vec![
            Ok(Bytes::from_static(b"data: 1\n\n")),
            Err(Error::transport("connection reset", None)),
            Ok(Bytes::from_static(b"data: 2\n\n")),
        ]);
        let mut reader = EventReader::<_, Value>::new(source);
        assert_eq!(reader.next().await.unwrap(), Some(json!(1)));
        assert!(reader.next().await.unwrap_err().is_transport());
        assert!(reader.next().await.unwrap().is_none());
    }

    struct TrackedSource {
        inner: Chunks,
        dropped: Arc<AtomicBool>,
    }

    impl Stream for TrackedSource {
        type Item = Result<Bytes>;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Pin::new(&mut self.inner).poll_next(cx)
        }
    }

    impl Drop for TrackedSource {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    fn tracked<B: AsRef<[u8]>>(parts: &[B]) -> (TrackedSource, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        let source = TrackedSource {
            inner: chunks(parts),
            dropped: Arc::clone(&dropped),
        };
        (source, dropped)
    }

    #[tokio::test]
    async fn close_releases_source() {
        let (source, dropped) = tracked(&[b"data: 1\n\ndata: 2\n\n"]);
        let mut reader = EventReader::<_, Value>::new(source);
        assert_eq!(reader.next().await.unwrap(), Some(json!(1)));
        assert!(!dropped.load(Ordering::SeqCst));
        reader.close();
        assert!(dropped.load(Ordering::SeqCst));
        reader.close();
        assert!(reader.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn done_and_parse_failure_release_source() {
        let (source, dropped) = tracked(&[b"data: [DONE]\n\n"]);
        let mut reader = EventReader::<_, Value>::new(source);
        assert!(reader.next().await.unwrap().is_none());
        assert!(dropped.load(Ordering::SeqCst));

        let (source, dropped) = tracked(&[b"data: nope\n\n"]);
        let mut reader = EventReader::<_, Value>::new(source);
        assert!(reader.next().await.is_err());
        assert!(dropped.load(Ordering::SeqCst));
    }
}
