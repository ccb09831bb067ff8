//! Server-sent-event parsing for streamed Chat Completions.
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"text"}}]}
//!
//! data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"weather","arguments":""}}]}}]}
//!
//! data: [DONE]
//! ```
//!
//! Text deltas are yielded as they arrive. Tool-call fragments are
//! assembled by `index` and yielded once the step ends, in index order.

use std::collections::BTreeMap;

use futures::{Stream, StreamExt};
use parley_types::{ModelError, StepChunk, StepStream};

use crate::mapping::tool_call;
use crate::types::ChatChunk;

/// Turn a streaming HTTP response into a [`StepStream`].
pub(crate) fn stream_step(response: reqwest::Response) -> StepStream {
    Box::pin(parse_sse_stream(response.bytes_stream()))
}

/// Parse a raw SSE byte stream into step chunks.
///
/// The stream ends after the first error.
pub(crate) fn parse_sse_stream<E>(
    byte_stream: impl Stream<Item = Result<bytes::Bytes, E>> + Send + 'static,
) -> impl Stream<Item = Result<StepChunk, ModelError>> + Send + 'static
where
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        let mut parser = SseParser::default();
        let mut byte_stream = std::pin::pin!(byte_stream);
        let mut buf: Vec<u8> = Vec::new();

        'read: while let Some(chunk) = byte_stream.next().await {
            let chunk = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    yield Err(ModelError::Stream(format!("stream read error: {e}")));
                    return;
                }
            };
            buf.extend_from_slice(&chunk);

            // Lines are decoded whole so multi-byte characters split across
            // network chunks survive.
            while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buf.drain(..=pos).collect();
                let line = match std::str::from_utf8(&raw) {
                    Ok(line) => line.trim_end_matches(['\n', '\r']).to_string(),
                    Err(e) => {
                        yield Err(ModelError::Stream(format!("invalid UTF-8 in stream: {e}")));
                        return;
                    }
                };
                for item in parser.process_line(&line) {
                    let failed = item.is_err();
                    yield item;
                    if failed {
                        return;
                    }
                }
                if parser.done {
                    break 'read;
                }
            }
        }

        if !parser.done && !buf.is_empty() {
            let tail = String::from_utf8_lossy(&buf).trim().to_string();
            for item in parser.process_line(&tail) {
                let failed = item.is_err();
                yield item;
                if failed {
                    return;
                }
            }
        }
        for item in parser.finish() {
            yield item;
        }
    }
}

#[derive(Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Accumulates `data:` lines and in-progress tool calls.
#[derive(Default)]
struct SseParser {
    data: String,
    calls: BTreeMap<usize, PartialCall>,
    done: bool,
}

impl SseParser {
    /// Process one line. A blank line dispatches the buffered data.
    fn process_line(&mut self, line: &str) -> Vec<Result<StepChunk, ModelError>> {
        if line.is_empty() {
            return self.dispatch();
        }
        if let Some(data) = line.strip_prefix("data:") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(data.trim_start());
        }
        // `event:`, `id:`, and `:` comment lines carry nothing we use.
        Vec::new()
    }

    fn dispatch(&mut self) -> Vec<Result<StepChunk, ModelError>> {
        let data = std::mem::take(&mut self.data);
        if data.is_empty() {
            return Vec::new();
        }
        if data == "[DONE]" {
            self.done = true;
            return Vec::new();
        }

        let chunk: ChatChunk = match serde_json::from_str(&data) {
            Ok(chunk) => chunk,
            Err(e) => {
                return vec![Err(ModelError::MalformedResponse(format!(
                    "invalid stream chunk: {e}"
                )))];
            }
        };
        if let Some(error) = chunk.error {
            return vec![Err(ModelError::Stream(error.message))];
        }

        let mut out = Vec::new();
        let Some(choice) = chunk.choices.into_iter().next() else {
            return out;
        };
        if let Some(text) = choice.delta.content
            && !text.is_empty()
        {
            out.push(Ok(StepChunk::Text(text)));
        }
        for delta in choice.delta.tool_calls.unwrap_or_default() {
            let call = self.calls.entry(delta.index).or_default();
            if let Some(id) = delta.id {
                call.id = id;
            }
            if let Some(function) = delta.function {
                if let Some(name) = function.name {
                    call.name.push_str(&name);
                }
                if let Some(args) = function.arguments {
                    call.arguments.push_str(&args);
                }
            }
        }
        out
    }

    /// Flush pending data and yield the assembled tool calls.
    fn finish(&mut self) -> Vec<Result<StepChunk, ModelError>> {
        let mut out = self.dispatch();
        if out.iter().any(Result::is_err) {
            return out;
        }
        out.extend(std::mem::take(&mut self.calls).into_values().map(|c| {
            Ok(StepChunk::ToolCall(tool_call(c.id, c.name, &c.arguments)))
        }));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::ToolCallRequest;

    fn byte_stream(
        parts: Vec<&'static str>,
    ) -> impl Stream<Item = Result<bytes::Bytes, std::io::Error>> + Send + 'static {
        futures::stream::iter(
            parts
                .into_iter()
                .map(|p| Ok(bytes::Bytes::from_static(p.as_bytes()))),
        )
    }

    async fn collect(parts: Vec<&'static str>) -> Vec<Result<StepChunk, ModelError>> {
        parse_sse_stream(byte_stream(parts)).collect().await
    }

    #[tokio::test]
    async fn text_deltas_stream_in_order() {
        let items = collect(vec![
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"world\"},\"finish_reason\":null}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n\n",
        ])
        .await;
        let texts: Vec<String> = items
            .into_iter()
            .map(|i| match i.unwrap() {
                StepChunk::Text(t) => t,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(texts, vec!["Hello ", "world"]);
    }

    #[tokio::test]
    async fn tool_calls_are_assembled_by_index() {
        let items = collect(vec![
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":1,\"id\":\"call_b\",\"function\":{\"name\":\"system_info\",\"arguments\":\"\"}},{\"index\":0,\"id\":\"call_a\",\"function\":{\"name\":\"weather\",\"arguments\":\"\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"location\\\"\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\":\\\"Paris\\\"}\"}},{\"index\":1,\"function\":{\"arguments\":\"{}\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\ndata: [DONE]\n\n",
        ])
        .await;
        let calls: Vec<ToolCallRequest> = items
            .into_iter()
            .map(|i| match i.unwrap() {
                StepChunk::ToolCall(c) => c,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].name, "weather");
        assert_eq!(calls[0].args, serde_json::json!({"location": "Paris"}));
        assert_eq!(calls[1].name, "system_info");
    }

    #[tokio::test]
    async fn lines_split_across_chunks() {
        let items = collect(vec![
            "data: {\"choices\":[{\"delta\":{\"con",
            "tent\":\"22\u{b0}C\"}}]}\r\n\r\ndata: [DONE]\r\n\r\n",
        ])
        .await;
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Ok(StepChunk::Text(t)) if t == "22°C"));
    }

    #[tokio::test]
    async fn error_payload_ends_the_stream() {
        let items = collect(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n\n",
            "data: {\"error\":{\"message\":\"overloaded\",\"type\":\"server_error\"}}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"tial\"}}]}\n\n",
        ])
        .await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[1], Err(ModelError::Stream(m)) if m == "overloaded"));
    }

    #[tokio::test]
    async fn garbage_chunk_is_malformed() {
        let items = collect(vec!["data: {oops\n\n"]).await;
        assert!(matches!(items.as_slice(), [Err(ModelError::MalformedResponse(_))]));
    }

    #[tokio::test]
    async fn missing_done_still_flushes_tool_calls() {
        let items = collect(vec![
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"c\",\"function\":{\"name\":\"weather\",\"arguments\":\"{}\"}}]}}]}",
        ])
        .await;
        assert!(matches!(items.as_slice(), [Ok(StepChunk::ToolCall(c))] if c.name == "weather"));
    }

    #[tokio::test]
    async fn read_errors_surface_as_stream_errors() {
        let stream = futures::stream::iter(vec![
            Ok(bytes::Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n")),
            Err(std::io::Error::other("connection reset")),
        ]);
        let items: Vec<_> = parse_sse_stream(stream).collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[1], Err(ModelError::Stream(m)) if m.contains("connection reset")));
    }
}
