//! Simulated firing controller on the far end of an in-memory serial line.

use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

/// How the simulated controller answers fire commands.
#[derive(Debug, Clone, Copy, Default)]
pub enum Behavior {
    #[default]
    AckAll,
    /// Answer `b'N'` to this pin.
    Reject(u8),
    /// Never answer this pin.
    Silent(u8),
}

/// Spawns a controller and returns the host end of the line plus a handle
/// yielding every raw frame the controller received.
pub fn spawn(behavior: Behavior) -> (DuplexStream, JoinHandle<Vec<[u8; 2]>>) {
    let (host, mut device) = duplex(64);
    let handle = tokio::spawn(async move {
        let mut seen = Vec::new();
        let mut frame = [0u8; 2];
        while device.read_exact(&mut frame).await.is_ok() {
            seen.push(frame);
            let reply = match (frame[0], behavior) {
                (b'H', Behavior::Reject(pin)) if frame[1] == pin => b'N',
                (b'H', Behavior::Silent(pin)) if frame[1] == pin => continue,
                _ => b'A',
            };
            if device.write_all(&[reply]).await.is_err() {
                break;
            }
        }
        seen
    });
    (host, handle)
}
