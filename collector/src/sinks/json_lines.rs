use super::{
    Sink,
    SinkFuture,
};
use crate::metrics::MergedEvent;
use eyre::{
    Result,
    WrapErr,
};
use std::path::Path;
use tokio::{
    fs::{
        File,
        OpenOptions,
    },
    io::{
        AsyncWrite,
        AsyncWriteExt,
        Stdout,
    },
    sync::Mutex,
};

/// Writes each event document as one JSON line.
pub struct JsonLinesSink<W> {
    name: &'static str,
    writer: Mutex<W>,
}

impl<W> JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(name: &'static str, writer: W) -> Self {
        Self {
            name,
            writer: Mutex::new(writer),
        }
    }

    async fn write_line(&self, event: &MergedEvent) -> Result<()> {
        let mut line = serde_json::to_vec(&event.to_document())?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}

impl JsonLinesSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new("console", tokio::io::stdout())
    }
}

impl JsonLinesSink<File> {
    /// Opens `path` for appending, creating it when missing.
    pub async fn append_to(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .wrap_err_with(|| format!("Failed to open event file {}", path.display()))?;
        Ok(Self::new("file", file))
    }
}

impl<W> Sink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn publish<'a>(&'a self, event: &'a MergedEvent) -> SinkFuture<'a> {
        Box::pin(self.write_line(event))
    }
}
