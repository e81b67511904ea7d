use async_trait::async_trait;
use passivedns_application::ports::MessageSink;
use passivedns_domain::CaptureError;
use passivedns_proto::Message;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};

/// Dumps every decoded message to a writer, one debug-formatted line per
/// message. Meant for eyeballing a live dnstap feed, not for machines.
pub struct TextSink<W> {
    output: W,
}

impl TextSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> TextSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(output: W) -> Self {
        Self { output }
    }
}

#[async_trait]
impl<W> MessageSink for TextSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn handle(&mut self, message: &Message) -> Result<(), CaptureError> {
        let line = format!("{message:?}\n");
        self.output.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), CaptureError> {
        self.output.flush().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "text"
    }
}
