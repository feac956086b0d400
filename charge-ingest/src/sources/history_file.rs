use std::path::PathBuf;

use charge_client::domain::EventGroup;

use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// Replays a saved history response (same JSON shape as the HTTP endpoint).
pub struct HistoryFileSource {
    path: PathBuf,
}

impl HistoryFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Source<EventGroup> for HistoryFileSource {
    async fn stream(&self) -> EnvelopeStream<EventGroup> {
        // Blocking read; history exports are small.
        let path = self.path.clone();
        let s = async_stream::try_stream! {
            let contents = std::fs::read_to_string(&path).map_err(|e| {
                PipelineError::Source(format!("failed to read {}: {e}", path.display()))
            })?;
            let groups: Vec<EventGroup> = serde_json::from_str(&contents).map_err(|e| {
                PipelineError::Source(format!("invalid history file {}: {e}", path.display()))
            })?;

            for group in groups {
                yield Envelope::new(group);
            }
        };

        Box::pin(s)
    }
}
