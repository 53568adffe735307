use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::common::buffer::ReadBuffer;
use crate::common::phys::PhysDisplay;
use crate::decode::DecodeLevel;
use crate::error::RequestError;
use crate::frame::{AduDisplay, Direction, Frame, Framer};

/// Receives the events raised by an [`Endpoint`]
pub trait EndpointHandler: Send + Sync + 'static {
    /// the receive task started, raised before any frame
    fn on_connect(&self, peer: SocketAddr);
    /// the connection is gone, raised at most once per connection
    fn on_disconnect(&self, peer: SocketAddr);
    /// a complete frame passed unwrap
    fn on_frame(&self, frame: Frame);
}

struct Notifier {
    peer: SocketAddr,
    handler: Arc<dyn EndpointHandler>,
    closed: AtomicBool,
}

impl Notifier {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn disconnect(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.handler.on_disconnect(self.peer);
        }
    }
}

/// One TCP connection and the task that frames what it receives
pub struct Endpoint {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    receiver: JoinHandle<()>,
    notifier: Arc<Notifier>,
    decode: DecodeLevel,
}

impl Endpoint {
    /// Open a connection to `addr` and start its receive task
    pub async fn connect<F: Framer>(
        addr: SocketAddr,
        framer: Arc<F>,
        handler: Arc<dyn EndpointHandler>,
        decode: DecodeLevel,
        connect_timeout: Duration,
    ) -> Result<Self, RequestError> {
        let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => return Err(RequestError::Io(std::io::ErrorKind::TimedOut)),
        };
        let peer = stream.peer_addr()?;
        let (reader, writer) = stream.into_split();

        let notifier = Arc::new(Notifier {
            peer,
            handler,
            closed: AtomicBool::new(false),
        });

        let receiver = tokio::spawn(receive_loop(reader, framer, notifier.clone(), decode));

        Ok(Self {
            writer: tokio::sync::Mutex::new(writer),
            receiver,
            notifier,
            decode,
        })
    }

    /// Address of the remote end
    pub fn peer(&self) -> SocketAddr {
        self.notifier.peer
    }

    /// True once the connection has been lost or closed
    pub fn is_closed(&self) -> bool {
        self.notifier.is_closed()
    }

    /// Write a complete frame
    ///
    /// A write failure tears the connection down.
    pub async fn send(&self, bytes: &[u8]) -> Result<(), RequestError> {
        if self.notifier.is_closed() {
            return Err(RequestError::NoConnection);
        }

        if self.decode.physical.enabled() {
            tracing::info!("PHYS TX - {}", PhysDisplay::new(self.decode.physical, bytes));
        }

        let mut writer = self.writer.lock().await;
        if let Err(err) = writer.write_all(bytes).await {
            tracing::warn!("write to {} failed: {}", self.notifier.peer, err);
            self.receiver.abort();
            self.notifier.disconnect();
            return Err(err.into());
        }
        Ok(())
    }

    /// Stop the receive task and shut the socket down
    pub async fn close(&self) {
        self.receiver.abort();
        self.writer.lock().await.shutdown().await.ok();
        self.notifier.disconnect();
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}

async fn receive_loop<F: Framer>(
    mut reader: OwnedReadHalf,
    framer: Arc<F>,
    notifier: Arc<Notifier>,
    decode: DecodeLevel,
) {
    notifier.handler.on_connect(notifier.peer);

    let mut buffer = ReadBuffer::new(2 * framer.max_frame_length());
    loop {
        if let Err(err) = buffer.read_some(&mut reader, decode.physical).await {
            tracing::info!("{} connection to {} closed: {}", framer.name(), notifier.peer, err);
            break;
        }
        drain_frames(framer.as_ref(), &mut buffer, notifier.handler.as_ref(), decode);
    }

    notifier.disconnect();
}

/// hand every complete frame in the buffer to the handler
fn drain_frames<F: Framer>(
    framer: &F,
    buffer: &mut ReadBuffer,
    handler: &dyn EndpointHandler,
    decode: DecodeLevel,
) {
    loop {
        let noise = framer.noise_length(buffer.peek());
        if noise > 0 {
            tracing::warn!("skipping {} bytes ahead of the next {} frame", noise, framer.name());
            if buffer.read(noise).is_err() {
                return;
            }
        }

        let length = match framer.frame_length(buffer.peek(), Direction::Response) {
            Ok(Some(length)) => length,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!("discarding {} buffered bytes: {}", buffer.len(), err);
                buffer.clear();
                return;
            }
        };

        let frame = match buffer.read(length) {
            Ok(bytes) => framer.unwrap(bytes),
            Err(_) => return,
        };

        match frame {
            Ok(frame) => {
                if decode.adu.enabled() {
                    tracing::info!("ADU RX - {}", AduDisplay::new(decode.adu, &frame));
                }
                handler.on_frame(frame);
            }
            Err(err) => tracing::warn!("discarding {} frame: {}", framer.name(), err),
        }
    }
}
