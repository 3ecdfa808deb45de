use super::protocol::{Frame, Reply};
use super::Link;

/// Stand-in link for rehearsals: acknowledges everything, sends nothing.
#[derive(Debug, Default)]
pub struct DryRunLink {
    suppressed: Vec<Frame>,
}

impl DryRunLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames a live run would have written, in order.
    pub fn suppressed(&self) -> &[Frame] {
        &self.suppressed
    }
}

impl Link for DryRunLink {
    async fn exchange(&mut self, frame: Frame) -> Reply {
        tracing::debug!(
            opcode = ?frame.opcode(),
            payload = frame.payload(),
            "Dry run: frame not sent"
        );
        self.suppressed.push(frame);
        Reply::Ack
    }
}
