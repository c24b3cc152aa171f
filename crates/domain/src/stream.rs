use serde::Serialize;
use std::pin::Pin;

/// A boxed async stream, used for relayed model output.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// One unit of outbound streamed content.
///
/// Frames serialize to the same SSE framing the upstream model endpoint
/// uses, so downstream consumers can reuse one parser for both:
/// `data: {"choices":[{"delta":{"content":"<text>"}}]}\n\n` per fragment,
/// `data: [DONE]\n\n` as the terminal sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// An incremental text fragment.
    Content { text: String },
    /// Terminal sentinel. Emitted exactly once per response lifecycle.
    Done,
}

#[derive(Serialize)]
struct Envelope<'a> {
    choices: [Choice<'a>; 1],
}

#[derive(Serialize)]
struct Choice<'a> {
    delta: Delta<'a>,
}

#[derive(Serialize)]
struct Delta<'a> {
    content: &'a str,
}

impl StreamFrame {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content { text: text.into() }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Render the frame as an SSE event block.
    pub fn to_sse(&self) -> String {
        match self {
            Self::Content { text } => {
                let envelope = Envelope {
                    choices: [Choice {
                        delta: Delta { content: text },
                    }],
                };
                // Serializing a &str cannot fail.
                let json = serde_json::to_string(&envelope).unwrap_or_default();
                format!("data: {json}\n\n")
            }
            Self::Done => "data: [DONE]\n\n".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_frame_sse_format() {
        let frame = StreamFrame::content("hello");
        assert_eq!(
            frame.to_sse(),
            "data: {\"choices\":[{\"delta\":{\"content\":\"hello\"}}]}\n\n"
        );
    }

    #[test]
    fn done_frame_sse_format() {
        assert_eq!(StreamFrame::Done.to_sse(), "data: [DONE]\n\n");
    }

    #[test]
    fn non_ascii_content_not_escaped() {
        // Localized refusal text goes through frames verbatim.
        let frame = StreamFrame::content("Кечиресиз");
        assert!(frame.to_sse().contains("Кечиресиз"));
    }

    #[test]
    fn quotes_in_content_escaped() {
        let frame = StreamFrame::content("say \"hi\"");
        assert!(frame.to_sse().contains("say \\\"hi\\\""));
    }
}
