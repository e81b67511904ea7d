//! frame-streams transport.
//!
//! Length-prefixed binary framing over any byte stream: each data frame is
//! a big-endian u32 length followed by the payload, and a length of zero
//! escapes into a control frame (READY/ACCEPT/START/STOP/FINISH) used for
//! the content-type handshake and for stream teardown. Bidirectional mode
//! (sockets) negotiates READY → ACCEPT → START up front and answers STOP
//! with FINISH; unidirectional mode (file replay) begins directly at START.

use std::time::Duration;

use passivedns_domain::CaptureError;
use passivedns_proto::CONTENT_TYPE;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};
use tracing::trace;

/// A data frame length of zero introduces a control frame.
const CONTROL_ESCAPE: u32 = 0;

const CONTROL_ACCEPT: u32 = 0x01;
const CONTROL_START: u32 = 0x02;
const CONTROL_STOP: u32 = 0x03;
const CONTROL_READY: u32 = 0x04;
const CONTROL_FINISH: u32 = 0x05;

const CONTROL_FIELD_CONTENT_TYPE: u32 = 0x01;

/// Control frames carry at most a few short content-type strings.
const MAX_CONTROL_FRAME_SIZE: u32 = 512;

fn control_name(frame_type: u32) -> &'static str {
    match frame_type {
        CONTROL_ACCEPT => "ACCEPT",
        CONTROL_START => "START",
        CONTROL_STOP => "STOP",
        CONTROL_READY => "READY",
        CONTROL_FINISH => "FINISH",
        _ => "UNKNOWN",
    }
}

struct ControlFrame {
    frame_type: u32,
    content_types: Vec<Vec<u8>>,
}

impl ControlFrame {
    fn parse(payload: &[u8]) -> Result<Self, CaptureError> {
        if payload.len() < 4 {
            return Err(CaptureError::Protocol(format!(
                "Control frame of {} bytes is too short",
                payload.len()
            )));
        }
        let frame_type = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);

        let mut content_types = Vec::new();
        let mut rest = &payload[4..];
        while !rest.is_empty() {
            if rest.len() < 8 {
                return Err(CaptureError::Protocol(
                    "Truncated control frame field header".to_string(),
                ));
            }
            let field_type = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]);
            let field_len = u32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;
            rest = &rest[8..];
            if rest.len() < field_len {
                return Err(CaptureError::Protocol(
                    "Truncated control frame field".to_string(),
                ));
            }
            if field_type != CONTROL_FIELD_CONTENT_TYPE {
                return Err(CaptureError::Protocol(format!(
                    "Unknown control frame field type {field_type}"
                )));
            }
            content_types.push(rest[..field_len].to_vec());
            rest = &rest[field_len..];
        }

        Ok(Self {
            frame_type,
            content_types,
        })
    }

    fn encode(frame_type: u32, content_type: Option<&[u8]>) -> Vec<u8> {
        let mut payload = Vec::with_capacity(16);
        payload.extend_from_slice(&frame_type.to_be_bytes());
        if let Some(content_type) = content_type {
            payload.extend_from_slice(&CONTROL_FIELD_CONTENT_TYPE.to_be_bytes());
            payload.extend_from_slice(&(content_type.len() as u32).to_be_bytes());
            payload.extend_from_slice(content_type);
        }
        payload
    }

    fn offers(&self, expected: &[u8]) -> bool {
        self.content_types.iter().any(|ct| ct == expected)
    }

    fn offered_strings(&self) -> Vec<String> {
        self.content_types
            .iter()
            .map(|ct| String::from_utf8_lossy(ct).into_owned())
            .collect()
    }
}

async fn read_control_body<S>(stream: &mut S) -> Result<ControlFrame, CaptureError>
where
    S: AsyncRead + Unpin,
{
    let len = stream.read_u32().await?;
    if len < 4 || len > MAX_CONTROL_FRAME_SIZE {
        return Err(CaptureError::Protocol(format!(
            "Control frame length {len} out of range"
        )));
    }
    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).await?;
    ControlFrame::parse(&payload)
}

async fn write_control<S>(
    stream: &mut S,
    frame_type: u32,
    content_type: Option<&[u8]>,
) -> Result<(), CaptureError>
where
    S: AsyncWrite + Unpin,
{
    let payload = ControlFrame::encode(frame_type, content_type);
    stream.write_u32(CONTROL_ESCAPE).await?;
    stream.write_u32(payload.len() as u32).await?;
    stream.write_all(&payload).await?;
    stream.flush().await?;
    trace!(control = control_name(frame_type), "Sent control frame");
    Ok(())
}

/// Reads one frame at a time off a frame-streams byte stream.
///
/// Owns the server side of the handshake; performs no payload decoding.
pub struct FrameStreamReader<S> {
    stream: BufStream<S>,
    bidirectional: bool,
    max_frame_size: usize,
    idle_timeout: Option<Duration>,
    started: bool,
}

impl<S> FrameStreamReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        bidirectional: bool,
        max_frame_size: usize,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            stream: BufStream::new(stream),
            bidirectional,
            max_frame_size,
            idle_timeout,
            started: false,
        }
    }

    /// The next data frame, or `None` once the stream has ended cleanly
    /// (STOP control frame, or EOF at a frame boundary).
    pub async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        if !self.started {
            self.handshake().await?;
            self.started = true;
        }

        let len = match self.read_len().await? {
            Some(len) => len,
            None => return Ok(None),
        };

        if len == CONTROL_ESCAPE {
            let control = read_control_body(&mut self.stream).await?;
            return match control.frame_type {
                CONTROL_STOP => {
                    if self.bidirectional {
                        write_control(&mut self.stream, CONTROL_FINISH, None).await?;
                    }
                    Ok(None)
                }
                other => Err(CaptureError::Protocol(format!(
                    "Unexpected {} control frame mid-stream",
                    control_name(other)
                ))),
            };
        }

        if len as usize > self.max_frame_size {
            return Err(CaptureError::OversizedFrame {
                size: len as usize,
                limit: self.max_frame_size,
            });
        }

        let mut frame = vec![0u8; len as usize];
        self.stream.read_exact(&mut frame).await?;
        Ok(Some(frame))
    }

    /// Reads the next frame length, applying the idle timeout. EOF at the
    /// frame boundary is a clean end of stream, not an error.
    async fn read_len(&mut self) -> Result<Option<u32>, CaptureError> {
        let result = match self.idle_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.stream.read_u32())
                .await
                .map_err(|_| CaptureError::Io("Idle read timeout".to_string()))?,
            None => self.stream.read_u32().await,
        };
        match result {
            Ok(len) => Ok(Some(len)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn handshake(&mut self) -> Result<(), CaptureError> {
        if self.bidirectional {
            let ready = self.expect_control(CONTROL_READY).await?;
            if !ready.offers(CONTENT_TYPE) {
                return Err(CaptureError::ContentTypeMismatch {
                    expected: String::from_utf8_lossy(CONTENT_TYPE).into_owned(),
                    offered: ready.offered_strings(),
                });
            }
            write_control(&mut self.stream, CONTROL_ACCEPT, Some(CONTENT_TYPE)).await?;
        }

        let start = self.expect_control(CONTROL_START).await?;
        if !start.content_types.is_empty() && !start.offers(CONTENT_TYPE) {
            return Err(CaptureError::ContentTypeMismatch {
                expected: String::from_utf8_lossy(CONTENT_TYPE).into_owned(),
                offered: start.offered_strings(),
            });
        }
        trace!(bidirectional = self.bidirectional, "Frame stream started");
        Ok(())
    }

    async fn expect_control(&mut self, expected: u32) -> Result<ControlFrame, CaptureError> {
        let escape = match self.read_len().await? {
            Some(escape) => escape,
            None => {
                return Err(CaptureError::Protocol(format!(
                    "Stream ended waiting for {}",
                    control_name(expected)
                )))
            }
        };
        if escape != CONTROL_ESCAPE {
            return Err(CaptureError::Protocol(format!(
                "Expected {} control frame, got a data frame",
                control_name(expected)
            )));
        }
        let control = read_control_body(&mut self.stream).await?;
        if control.frame_type != expected {
            return Err(CaptureError::Protocol(format!(
                "Expected {} control frame, got {}",
                control_name(expected),
                control_name(control.frame_type)
            )));
        }
        Ok(control)
    }
}

/// Writes a frame-streams byte stream; the client side of the handshake.
///
/// Used for producing replay files and by tests standing in for a
/// dnstap-emitting resolver.
pub struct FrameStreamWriter<S> {
    stream: BufStream<S>,
    bidirectional: bool,
    started: bool,
}

impl<S> FrameStreamWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, bidirectional: bool) -> Self {
        Self {
            stream: BufStream::new(stream),
            bidirectional,
            started: false,
        }
    }

    pub async fn write_frame(&mut self, frame: &[u8]) -> Result<(), CaptureError> {
        if !self.started {
            self.start().await?;
            self.started = true;
        }
        self.stream.write_u32(frame.len() as u32).await?;
        self.stream.write_all(frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn start(&mut self) -> Result<(), CaptureError> {
        if self.bidirectional {
            write_control(&mut self.stream, CONTROL_READY, Some(CONTENT_TYPE)).await?;
            let accept = self.expect_control(CONTROL_ACCEPT).await?;
            if !accept.offers(CONTENT_TYPE) {
                return Err(CaptureError::ContentTypeMismatch {
                    expected: String::from_utf8_lossy(CONTENT_TYPE).into_owned(),
                    offered: accept.offered_strings(),
                });
            }
        }
        write_control(&mut self.stream, CONTROL_START, Some(CONTENT_TYPE)).await
    }

    /// Ends the stream with STOP; in bidirectional mode waits for the
    /// peer's FINISH so the far end has observed the teardown.
    pub async fn finish(&mut self) -> Result<(), CaptureError> {
        if !self.started {
            self.start().await?;
            self.started = true;
        }
        write_control(&mut self.stream, CONTROL_STOP, None).await?;
        if self.bidirectional {
            self.expect_control(CONTROL_FINISH).await?;
        }
        Ok(())
    }

    /// Consumes the writer, returning the underlying stream. Callers must
    /// `finish()` first or the buffered tail is lost.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    async fn expect_control(&mut self, expected: u32) -> Result<ControlFrame, CaptureError> {
        let escape = self.stream.read_u32().await?;
        if escape != CONTROL_ESCAPE {
            return Err(CaptureError::Protocol(format!(
                "Expected {} control frame, got a data frame",
                control_name(expected)
            )));
        }
        let control = read_control_body(&mut self.stream).await?;
        if control.frame_type != expected {
            return Err(CaptureError::Protocol(format!(
                "Expected {} control frame, got {}",
                control_name(expected),
                control_name(control.frame_type)
            )));
        }
        Ok(control)
    }
}
