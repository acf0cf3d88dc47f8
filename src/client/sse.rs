//! Decoder for the server-push text protocol.
//!
//! Events are blocks of `field: value` lines terminated by a blank line.
//! Only `data` lines matter here; comment lines (keep-alives) start with `:`.

use futures::stream::{self, BoxStream, Stream, StreamExt};

use super::ClientError;
use crate::models::StreamFrame;

pub type FrameStream = BoxStream<'static, Result<StreamFrame, ClientError>>;

/// Incremental event-stream decoder. Chunks may split events, lines or
/// UTF-8 sequences anywhere.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning the data payload of every completed event.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut payloads = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let block = String::from_utf8_lossy(&block[..end]);

            let data: Vec<&str> = block
                .split('\n')
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|value| value.strip_prefix(' ').unwrap_or(value))
                .collect();

            if !data.is_empty() {
                payloads.push(data.join("\n"));
            }
        }
        payloads
    }
}

/// Turn a byte stream into parsed frames. Frames that are not valid JSON
/// are logged and skipped; transport errors are passed through.
pub fn frames<S, B, E>(bytes: S) -> FrameStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: Into<ClientError>,
{
    let mut decoder = FrameDecoder::new();

    bytes
        .map(move |chunk| -> Vec<Result<StreamFrame, ClientError>> {
            match chunk {
                Ok(chunk) => decoder
                    .push(chunk.as_ref())
                    .into_iter()
                    .filter_map(|data| match serde_json::from_str(&data) {
                        Ok(frame) => Some(Ok(frame)),
                        Err(e) => {
                            tracing::warn!("Failed to parse event {:?}: {}", data, e);
                            None
                        }
                    })
                    .collect(),
                Err(e) => vec![Err(e.into())],
            }
        })
        .flat_map(stream::iter)
        .boxed()
}
