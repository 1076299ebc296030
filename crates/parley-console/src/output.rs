//! Output sink that writes bot messages as lines.

use async_trait::async_trait;
use parley_core::error::EngineError;
use parley_core::output::{Output, OutputSink};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Writes each output as `bot> <text>` on its own line.
#[derive(Debug)]
pub struct LineOutput<W> {
    writer: Mutex<W>,
}

impl<W> LineOutput<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl LineOutput<tokio::io::Stdout> {
    /// Writes to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W> OutputSink for LineOutput<W>
where
    W: AsyncWrite + Unpin + Send + Sync,
{
    async fn send(&self, output: Output) -> Result<(), EngineError> {
        let mut writer = self.writer.lock().await;
        let line = format!("bot> {}\n", output.text);
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| EngineError::Infrastructure(format!("console write failed: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| EngineError::Infrastructure(format!("console flush failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use parley_core::output::InputHint;

    use super::*;

    #[tokio::test]
    async fn test_outputs_are_written_as_prefixed_lines() {
        // Arrange
        let sink = LineOutput::new(Vec::new());

        // Act
        sink.send(Output::new("Name?", InputHint::ExpectingInput))
            .await
            .unwrap();
        sink.send(Output::new("Thanks!", InputHint::AcceptingInput))
            .await
            .unwrap();

        // Assert
        let written = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(written, "bot> Name?\nbot> Thanks!\n");
    }
}
