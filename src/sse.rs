//! Streamed completion frame decoding.
//!
//! This module turns the raw byte stream of a `/v1/chat/completions` response
//! into an ordered stream of assistant text deltas. Frames arrive one per
//! line as `data: <json>` with a `data: [DONE]` terminator. Lines may span
//! chunk boundaries, so decoder state persists across reads.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::error::{Error, Result};
use crate::observability;
use crate::types::CompletionChunk;

/// Classification of one complete wire line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A frame carrying non-empty assistant text.
    Delta(String),

    /// A line to ignore: no `data:` prefix, unparseable JSON, unexpected
    /// shape, or an empty delta. Never fatal.
    Skip,

    /// The `[DONE]` terminator; the stream ends successfully.
    Done,
}

/// Classify one complete line from the wire.
pub fn classify_line(line: &str) -> Frame {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return Frame::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Frame::Done;
    }
    match serde_json::from_str::<CompletionChunk>(data) {
        Ok(chunk) => match chunk.delta_text() {
            Some(text) => Frame::Delta(text),
            None => Frame::Skip,
        },
        Err(_) => Frame::Skip,
    }
}

/// Splits off the first complete line of the buffer, if one is present.
///
/// The buffer holds raw bytes so that a UTF-8 code point split across chunk
/// reads cannot corrupt a frame; a line is only decoded once its newline has
/// arrived.
fn take_line(buffer: &mut Vec<u8>) -> Option<String> {
    let pos = buffer.iter().position(|&b| b == b'\n')?;
    let line: Vec<u8> = buffer.drain(..=pos).collect();
    Some(String::from_utf8_lossy(&line[..line.len() - 1]).into_owned())
}

/// Decode a response byte stream into a stream of text deltas.
///
/// The returned stream yields each delta exactly once, in wire order, and
/// ends when either the `[DONE]` terminator is seen or the transport reports
/// end-of-stream, whichever comes first. A transport failure mid-stream
/// surfaces as a single `Err` item, after which the stream ends.
pub fn decode_deltas<S>(byte_stream: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
{
    let buffer: Vec<u8> = Vec::new();
    let eof = false;

    stream::unfold(
        (byte_stream, buffer, eof),
        move |(mut stream, mut buffer, mut eof)| async move {
            loop {
                // Drain complete lines already buffered.
                while let Some(line) = take_line(&mut buffer) {
                    match classify_line(&line) {
                        Frame::Delta(text) => {
                            observability::STREAM_FRAMES.click();
                            return Some((Ok(text), (stream, buffer, eof)));
                        }
                        Frame::Skip => {
                            observability::STREAM_FRAMES_SKIPPED.click();
                        }
                        Frame::Done => return None,
                    }
                }

                if eof {
                    // Flush a trailing unterminated line, then finish.
                    if buffer.is_empty() {
                        return None;
                    }
                    let line = String::from_utf8_lossy(&buffer).into_owned();
                    buffer.clear();
                    match classify_line(&line) {
                        Frame::Delta(text) => {
                            observability::STREAM_FRAMES.click();
                            return Some((Ok(text), (stream, buffer, eof)));
                        }
                        Frame::Skip | Frame::Done => return None,
                    }
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        observability::STREAM_CHUNKS.click();
                        buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        observability::STREAM_ERRORS.click();
                        buffer.clear();
                        eof = true;
                        return Some((
                            Err(Error::streaming(
                                format!("Error in HTTP stream: {e}"),
                                Some(Box::new(e)),
                            )),
                            (stream, buffer, eof),
                        ));
                    }
                    None => {
                        eof = true;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: Vec<&'static [u8]>) -> impl Stream<Item = reqwest::Result<Bytes>> + Unpin {
        Box::pin(stream::iter(
            parts.into_iter().map(|p| Ok(Bytes::from_static(p))),
        ))
    }

    async fn collect(parts: Vec<&'static [u8]>) -> Vec<Result<String>> {
        decode_deltas(chunks(parts)).collect().await
    }

    #[test]
    fn classify_delta_frame() {
        let frame = classify_line(r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#);
        assert_eq!(frame, Frame::Delta("Hello".to_string()));
    }

    #[test]
    fn classify_done_frame() {
        assert_eq!(classify_line("data: [DONE]"), Frame::Done);
        assert_eq!(classify_line("  data:[DONE]  "), Frame::Done);
    }

    #[test]
    fn classify_skippable_frames() {
        assert_eq!(classify_line(""), Frame::Skip);
        assert_eq!(classify_line(": keep-alive"), Frame::Skip);
        assert_eq!(classify_line("data: not json"), Frame::Skip);
        assert_eq!(classify_line(r#"data: {"choices":[]}"#), Frame::Skip);
        assert_eq!(
            classify_line(r#"data: {"choices":[{"delta":{}}]}"#),
            Frame::Skip
        );
        assert_eq!(
            classify_line(r#"data: {"choices":[{"delta":{"content":""}}]}"#),
            Frame::Skip
        );
    }

    #[tokio::test]
    async fn decodes_frames_in_order() {
        let items = collect(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n",
            b"data: [DONE]\n\n",
        ])
        .await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["Hello".to_string(), " world".to_string()]);
    }

    #[tokio::test]
    async fn handles_line_split_across_chunks() {
        let items = collect(vec![
            b"data: {\"choices\":[{\"del",
            b"ta\":{\"content\":\"Hi\"}}]}\ndata: [DONE]\n",
        ])
        .await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["Hi".to_string()]);
    }

    #[tokio::test]
    async fn handles_utf8_split_across_chunks() {
        // "é" is 0xC3 0xA9; split between the two bytes.
        let items = collect(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"caf\xc3",
            b"\xa9\"}}]}\ndata: [DONE]\n",
        ])
        .await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["café".to_string()]);
    }

    #[tokio::test]
    async fn malformed_frames_are_skipped_not_fatal() {
        let items = collect(vec![
            b"data: {broken\ndata: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\ndata: [DONE]\n",
        ])
        .await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["ok".to_string()]);
    }

    #[tokio::test]
    async fn done_only_stream_is_empty_success() {
        let items = collect(vec![b"data: [DONE]\n\n"]).await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn frames_after_done_are_not_read() {
        let items = collect(vec![
            b"data: [DONE]\ndata: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n",
        ])
        .await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn trailing_unterminated_line_is_flushed() {
        let items = collect(vec![b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}"]).await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["tail".to_string()]);
    }

    #[tokio::test]
    async fn end_of_stream_without_done_ends_cleanly() {
        let items = collect(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
        ])
        .await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["a".to_string()]);
    }
}
