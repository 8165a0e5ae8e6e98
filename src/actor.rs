/// Actor module - single-consumer task around a `UdpSender`
///
/// Any number of `SenderHandle` clones can submit commands; one tokio task
/// owns the sender and applies them in arrival order, which keeps the
/// sender's one-invocation-at-a-time contract without locks.

use std::net::SocketAddrV4;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, warn};

use crate::counters::TelemetrySnapshot;
use crate::errors::{Result, SenderError};
use crate::sender::{DispatchStatus, UdpSender};

enum Command {
    Open {
        address: String,
        port: String,
        reply: oneshot::Sender<Result<SocketAddrV4>>,
    },
    Call {
        source_id: u8,
        payload: Vec<u8>,
        reply: Option<oneshot::Sender<Result<DispatchStatus>>>,
    },
    Tick {
        reply: Option<oneshot::Sender<TelemetrySnapshot>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable front end of a running sender task
#[derive(Clone)]
pub struct SenderHandle {
    tx: mpsc::Sender<Command>,
}

/// Start a task that owns `sender`
///
/// The task ends when every handle is dropped, returning `Ok(())`, or on
/// a partial write, returning the `LengthMismatch` after closing the
/// socket. Must be called inside a tokio runtime.
pub fn spawn(sender: UdpSender, queue_depth: usize) -> (SenderHandle, JoinHandle<Result<()>>) {
    let (tx, rx) = mpsc::channel(queue_depth.max(1));
    let task = tokio::spawn(run(sender, rx));
    (SenderHandle { tx }, task)
}

async fn run(mut sender: UdpSender, mut rx: mpsc::Receiver<Command>) -> Result<()> {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Open { address, port, reply } => {
                let _ = reply.send(sender.open(&address, &port));
            }
            Command::Call { source_id, payload, reply } => {
                let result = sender.handle_call(source_id, &payload);
                let fault = match &result {
                    Err(err) if err.is_fatal() => Some(err.clone()),
                    _ => None,
                };

                match (reply, result) {
                    (Some(reply), result) => {
                        let _ = reply.send(result);
                    }
                    (None, Err(err)) if fault.is_none() => {
                        warn!(%err, source_id, "call rejected");
                    }
                    (None, _) => {}
                }

                if let Some(err) = fault {
                    error!(%err, "integrity fault on send path, stopping sender");
                    sender.close();
                    return Err(err);
                }
            }
            Command::Tick { reply } => {
                let snapshot = sender.tick();
                if let Some(reply) = reply {
                    let _ = reply.send(snapshot);
                }
            }
            Command::Close { reply } => {
                sender.close();
                let _ = reply.send(());
            }
        }
    }

    debug!("all sender handles dropped");
    sender.close();
    Ok(())
}

impl SenderHandle {
    async fn submit(&self, command: Command) -> Result<()> {
        self.tx.send(command).await.map_err(|_| SenderError::ActorStopped)
    }

    /// Open the socket towards `address:port`
    pub async fn open(&self, address: impl Into<String>, port: impl Into<String>) -> Result<SocketAddrV4> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Open { address: address.into(), port: port.into(), reply })
            .await?;
        rx.await.map_err(|_| SenderError::ActorStopped)?
    }

    /// Send one call and wait for its outcome
    pub async fn call(&self, source_id: u8, payload: Vec<u8>) -> Result<DispatchStatus> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Call { source_id, payload, reply: Some(reply) })
            .await?;
        rx.await.map_err(|_| SenderError::ActorStopped)?
    }

    /// Queue one call without waiting for its outcome
    pub async fn dispatch(&self, source_id: u8, payload: Vec<u8>) -> Result<()> {
        self.submit(Command::Call { source_id, payload, reply: None }).await
    }

    /// Push telemetry and return the snapshot
    pub async fn tick(&self) -> Result<TelemetrySnapshot> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Tick { reply: Some(reply) }).await?;
        rx.await.map_err(|_| SenderError::ActorStopped)
    }

    pub async fn close(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Close { reply }).await?;
        rx.await.map_err(|_| SenderError::ActorStopped)
    }

    /// True once the sender task has stopped
    pub fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }

    /// Drive `tick` every `period` until the sender task stops
    ///
    /// The ticker holds only a weak reference, so it does not keep the
    /// task alive after the last handle is dropped.
    pub fn spawn_ticker(&self, period: Duration) -> JoinHandle<()> {
        let weak = self.tx.downgrade();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(tx) = weak.upgrade() else { break };
                if tx.send(Command::Tick { reply: None }).await.is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::net::UdpSocket;

    use super::*;
    use crate::events::MemorySink;
    use crate::socket::{AddressPolicy, DatagramSocket, SocketFactory};
    use crate::MAX_PAYLOAD_SIZE;

    struct TruncatingFactory;

    struct TruncatingSocket;

    impl DatagramSocket for TruncatingSocket {
        fn send_to(&self, buf: &[u8], _destination: SocketAddrV4) -> io::Result<usize> {
            Ok(buf.len() / 2)
        }
    }

    impl SocketFactory for TruncatingFactory {
        fn create(&self) -> io::Result<Box<dyn DatagramSocket>> {
            Ok(Box::new(TruncatingSocket))
        }
    }

    #[tokio::test]
    async fn test_handle_round_trip() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let port = listener.local_addr().unwrap().port();

        let (handle, task) = spawn(UdpSender::new(MemorySink::new()), 8);
        handle.open("127.0.0.1", port.to_string()).await.unwrap();

        let status = handle.call(1, vec![0xAA]).await.unwrap();
        assert_eq!(status, DispatchStatus::Sent { sequence: 0, bytes: 6 });

        let mut buf = [0u8; 16];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0, 0, 0, 0, 1, 0xAA]);

        let snapshot = handle.tick().await.unwrap();
        assert_eq!(snapshot, TelemetrySnapshot { packets_sent: 1, bytes_sent: 6 });

        drop(handle);
        assert_eq!(task.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_length_mismatch_stops_task() {
        let sender = UdpSender::with_factory(TruncatingFactory, AddressPolicy::Strict, MemorySink::new());
        let (handle, task) = spawn(sender, 4);
        handle.open("127.0.0.1", "9000").await.unwrap();

        let result = handle.call(3, vec![1, 2, 3]).await;
        assert_eq!(result, Err(SenderError::LengthMismatch { expected: 8, sent: 4 }));

        assert_eq!(
            task.await.unwrap(),
            Err(SenderError::LengthMismatch { expected: 8, sent: 4 })
        );
        assert!(handle.is_stopped());
        assert_eq!(handle.tick().await, Err(SenderError::ActorStopped));
    }

    #[tokio::test]
    async fn test_overflow_rejects_call_but_keeps_running() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let port = listener.local_addr().unwrap().port();

        let (handle, task) = spawn(UdpSender::new(MemorySink::new()), 4);
        handle.open("127.0.0.1", port.to_string()).await.unwrap();

        let err = handle.call(1, vec![0; MAX_PAYLOAD_SIZE + 1]).await.unwrap_err();
        assert!(err.is_integrity_fault());
        assert!(!err.is_fatal());
        handle.dispatch(1, vec![0; MAX_PAYLOAD_SIZE + 1]).await.unwrap();

        let status = handle.call(1, vec![0xAA]).await.unwrap();
        assert_eq!(status, DispatchStatus::Sent { sequence: 0, bytes: 6 });
        assert!(!handle.is_stopped());

        drop(handle);
        assert_eq!(task.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_dispatch_on_closed_sender_is_noop() {
        let sink = MemorySink::new();
        let (handle, _task) = spawn(UdpSender::new(sink.clone()), 4);

        handle.dispatch(1, vec![1]).await.unwrap();
        handle.dispatch(1, vec![2]).await.unwrap();
        let snapshot = handle.tick().await.unwrap();

        assert_eq!(snapshot, TelemetrySnapshot::default());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_ticker_pushes_snapshots() {
        let sink = MemorySink::new();
        let (handle, task) = spawn(UdpSender::new(sink.clone()), 4);

        let ticker = handle.spawn_ticker(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(sink.snapshots().len() >= 2);

        drop(handle);
        assert_eq!(task.await.unwrap(), Ok(()));
        ticker.await.unwrap();
    }
}
