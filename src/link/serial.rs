use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use super::protocol::{Frame, Reply};
use super::Link;

/// Upper bound on stale bytes discarded before a request.
const MAX_STALE_BYTES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

/// [`Link`] over any async byte stream, normally a serial port.
pub struct SerialLink<T> {
    io: T,
    read_timeout: Duration,
    state: LinkState,
}

/// Opens the controller's serial port.
pub fn open_port(
    port: &str,
    baud_rate: u32,
    read_timeout: Duration,
) -> Result<SerialLink<SerialStream>, tokio_serial::Error> {
    let stream = tokio_serial::new(port, baud_rate)
        .timeout(read_timeout)
        .open_native_async()?;

    tracing::info!(port, baud_rate, "Serial port opened");
    Ok(SerialLink::new(stream, read_timeout))
}

impl<T> SerialLink<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: T, read_timeout: Duration) -> Self {
        Self {
            io,
            read_timeout,
            state: LinkState::Connected,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Drops bytes that arrived after an earlier exchange timed out, so a late
    /// reply is never mistaken for the answer to the next request.
    async fn discard_stale(&mut self) -> std::io::Result<()> {
        let mut buf = [0u8; 1];
        for _ in 0..MAX_STALE_BYTES {
            match timeout(Duration::ZERO, self.io.read(&mut buf)).await {
                Ok(Ok(0)) => return Err(std::io::ErrorKind::UnexpectedEof.into()),
                Ok(Ok(_)) => tracing::warn!(byte = buf[0], "Discarding stale controller byte"),
                Ok(Err(e)) => return Err(e),
                Err(_) => return Ok(()),
            }
        }
        Ok(())
    }

    async fn write_frame(&mut self, frame: &Frame) -> std::io::Result<()> {
        let bytes = frame.encode();
        let write = async {
            self.io.write_all(&bytes).await?;
            self.io.flush().await
        };
        match timeout(self.read_timeout, write).await {
            Ok(result) => result,
            Err(_) => Err(std::io::ErrorKind::TimedOut.into()),
        }
    }

    async fn read_reply(&mut self) -> Option<u8> {
        let mut buf = [0u8; 1];
        match timeout(self.read_timeout, self.io.read(&mut buf)).await {
            Ok(Ok(0)) => {
                tracing::warn!("Serial link closed by controller");
                self.state = LinkState::Disconnected;
                None
            }
            Ok(Ok(_)) => Some(buf[0]),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Serial read failed");
                self.state = LinkState::Disconnected;
                None
            }
            Err(_) => {
                tracing::debug!(
                    timeout_ms = self.read_timeout.as_millis() as u64,
                    "No reply before timeout"
                );
                None
            }
        }
    }

    async fn try_exchange(&mut self, frame: Frame) -> Reply {
        if self.state == LinkState::Disconnected {
            tracing::warn!(
                opcode = ?frame.opcode(),
                "Serial link is disconnected; request not sent"
            );
            return Reply::Nack;
        }

        if let Err(e) = self.discard_stale().await {
            tracing::warn!(error = %e, "Serial link unusable");
            self.state = LinkState::Disconnected;
            return Reply::Nack;
        }

        tracing::debug!(opcode = ?frame.opcode(), payload = frame.payload(), "Serial tx");
        if let Err(e) = self.write_frame(&frame).await {
            tracing::warn!(error = %e, "Serial write failed");
            self.state = LinkState::Disconnected;
            return Reply::Nack;
        }

        let byte = self.read_reply().await;
        tracing::debug!(?byte, "Serial rx");
        Reply::decode(byte)
    }
}

impl<T> Link for SerialLink<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    async fn exchange(&mut self, frame: Frame) -> Reply {
        self.try_exchange(frame).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::show::Pin;
    use tokio::io::duplex;

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn ack_reply_is_read_after_frame_is_written() {
        let (host, mut controller) = duplex(16);
        let mut link = SerialLink::new(host, TIMEOUT);

        let responder = tokio::spawn(async move {
            let mut frame = [0u8; 2];
            controller.read_exact(&mut frame).await.unwrap();
            controller.write_all(b"A").await.unwrap();
            (frame, controller)
        });

        let reply = link.exchange(Frame::fire(Pin::new(9).unwrap())).await;
        let (frame, _controller) = responder.await.unwrap();

        assert_eq!(reply, Reply::Ack);
        assert_eq!(frame, [b'H', 9]);
        assert_eq!(link.state(), LinkState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn silence_times_out_as_nack() {
        let (host, _controller) = duplex(16);
        let mut link = SerialLink::new(host, TIMEOUT);

        let started = tokio::time::Instant::now();
        let reply = link.exchange(Frame::keepalive()).await;

        assert_eq!(reply, Reply::Nack);
        assert!(started.elapsed() >= TIMEOUT);
        assert_eq!(link.state(), LinkState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_controller_disconnects_link() {
        let (host, controller) = duplex(16);
        drop(controller);
        let mut link = SerialLink::new(host, TIMEOUT);

        assert_eq!(link.exchange(Frame::keepalive()).await, Reply::Nack);
        assert_eq!(link.state(), LinkState::Disconnected);
        assert_eq!(link.exchange(Frame::keepalive()).await, Reply::Nack);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_bytes_are_not_taken_as_the_reply() {
        let (host, mut controller) = duplex(16);
        let mut link = SerialLink::new(host, TIMEOUT);

        // A late ack from a previous, timed-out request.
        controller.write_all(b"A").await.unwrap();

        let responder = tokio::spawn(async move {
            let mut frame = [0u8; 2];
            controller.read_exact(&mut frame).await.unwrap();
            controller.write_all(b"N").await.unwrap();
            controller
        });

        let reply = link.exchange(Frame::fire(Pin::new(3).unwrap())).await;
        let _controller = responder.await.unwrap();
        assert_eq!(reply, Reply::Nack);
    }
}
