use async_trait::async_trait;
use chrono::{DateTime, Utc};
use passivedns_application::ports::MessageSink;
use passivedns_domain::{Answer, CaptureError};
use passivedns_proto::Message;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};

use crate::extract::extract_answers;

/// One JSON object per extracted answer, newline-delimited. All record
/// types are extracted; messages that are not resolver responses yield
/// nothing and are ignored.
pub struct JsonSink<W> {
    output: W,
}

/// Wire shape of one answer line. Class and type serialize as
/// `[code, mnemonic]` pairs.
#[derive(Serialize)]
struct AnswerLine<'a> {
    id: u16,
    time: DateTime<Utc>,
    name: &'a str,
    ttl: u32,
    class: (u16, &'a str),
    #[serde(rename = "type")]
    rtype: (u16, &'a str),
    data: &'a str,
}

impl<'a> From<&'a Answer> for AnswerLine<'a> {
    fn from(answer: &'a Answer) -> Self {
        Self {
            id: answer.id,
            time: answer.time,
            name: &answer.name,
            ttl: answer.ttl,
            class: (answer.class, &answer.class_name),
            rtype: (answer.rtype, &answer.type_name),
            data: &answer.data,
        }
    }
}

impl JsonSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> JsonSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(output: W) -> Self {
        Self { output }
    }
}

#[async_trait]
impl<W> MessageSink for JsonSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn handle(&mut self, message: &Message) -> Result<(), CaptureError> {
        for answer in extract_answers(message, &[]) {
            let mut line = serde_json::to_string(&AnswerLine::from(&answer))
                .map_err(|e| CaptureError::Io(e.to_string()))?;
            line.push('\n');
            self.output.write_all(line.as_bytes()).await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), CaptureError> {
        self.output.flush().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
