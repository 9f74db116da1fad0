// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::atomic::{AtomicU64, Ordering},
    thread::{self, JoinHandle},
};

use bytes::Bytes;
use snafu::{ResultExt, ensure};
use spoolmq_common_transport::{
    Transport,
    error::{PollSnafu, ReceiveSnafu},
    zmq,
};
use tracing::{debug, error, info, warn};

use crate::error::{
    BoxError, ControlChannelSnafu, Fault, Result, SignalShutdownSnafu, SpawnThreadSnafu,
    ThreadPanickedSnafu,
};

static NEXT_BRIDGE_ID: AtomicU64 = AtomicU64::new(0);

const SHUTDOWN_FRAME: &[u8] = b"shutdown";

/// Receives every payload the bridge takes off the subscription.
///
/// Returning an error stops the bridge; the error is handed to the
/// [`FaultHandler`].
pub trait MessageSink: Send + 'static {
    fn deliver(&mut self, payload: Bytes) -> std::result::Result<(), BoxError>;
}

impl<F> MessageSink for F
where
    F: FnMut(Bytes) -> std::result::Result<(), BoxError> + Send + 'static,
{
    fn deliver(&mut self, payload: Bytes) -> std::result::Result<(), BoxError> { self(payload) }
}

/// Observes the fault that stopped a bridge.
pub trait FaultHandler: Send + 'static {
    fn on_fault(&mut self, fault: Fault);
}

impl<F> FaultHandler for F
where
    F: FnMut(Fault) + Send + 'static,
{
    fn on_fault(&mut self, fault: Fault) { self(fault) }
}

/// Handle to a running ingestion thread.
///
/// Dropping the handle shuts the bridge down.
pub struct PubSubBridge {
    id:          u64,
    control:     Option<zmq::Socket>,
    handle:      Option<JoinHandle<()>>,
    operational: bool,
}

impl fmt::Debug for PubSubBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSubBridge")
            .field("id", &self.id)
            .field("operational", &self.operational)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl PubSubBridge {
    /// Starts delivering messages from `subscriber` to `sink`.
    ///
    /// `subscriber` must already be connected and subscribed. On failure
    /// every socket created here, and the subscriber, is closed before the
    /// error is returned.
    pub fn spawn<S, H>(
        transport: &Transport,
        subscriber: zmq::Socket,
        sink: S,
        faults: H,
    ) -> Result<Self>
    where
        S: MessageSink,
        H: FaultHandler,
    {
        let id = NEXT_BRIDGE_ID.fetch_add(1, Ordering::Relaxed);
        let endpoint = format!("inproc://spoolmq-bridge-ctl-{id}");

        let control = transport
            .pair_bind(&endpoint)
            .context(ControlChannelSnafu)?;
        let control_rx = transport
            .pair_connect(&endpoint)
            .context(ControlChannelSnafu)?;

        let receiver = Receiver {
            id,
            control: control_rx,
            subscriber,
            sink,
            faults,
        };
        let handle = thread::Builder::new()
            .name(format!("spoolmq-bridge-{id}"))
            .spawn(move || receiver.run())
            .context(SpawnThreadSnafu)?;

        info!(bridge = id, "Ingestion bridge spawned");
        Ok(Self {
            id,
            control: Some(control),
            handle: Some(handle),
            operational: true,
        })
    }

    /// Stops the receive thread and waits for it to exit.
    ///
    /// Calling it again, or after the thread stopped on a fault, is a no-op
    /// that returns `Ok`.
    pub fn shutdown(&mut self) -> Result<()> {
        if !self.operational {
            return Ok(());
        }
        self.operational = false;
        info!(bridge = self.id, "Shutting down ingestion bridge");

        if let Some(control) = self.control.take() {
            // The receiving end is gone once the thread has exited, in which
            // case the non-blocking send reports EAGAIN and there is nobody
            // left to signal.
            match control.send(SHUTDOWN_FRAME, zmq::DONTWAIT) {
                Ok(()) | Err(zmq::Error::EAGAIN) => {}
                Err(e) => {
                    self.release_unsignalled();
                    return Err(e).context(SignalShutdownSnafu);
                }
            }
        }

        ensure!(self.join(), ThreadPanickedSnafu);
        info!(bridge = self.id, "Ingestion bridge shut down");
        Ok(())
    }

    /// `true` until [`shutdown`](Self::shutdown) has been requested.
    #[must_use]
    pub const fn is_operational(&self) -> bool { self.operational }

    /// `true` while the receive thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool { self.handle.as_ref().is_some_and(|h| !h.is_finished()) }

    /// Lets go of a thread that never received the stop signal.
    ///
    /// A live thread is still blocked in its poll and would never be joined,
    /// so it is detached; a finished one is joined.
    fn release_unsignalled(&mut self) {
        if self.handle.as_ref().is_some_and(JoinHandle::is_finished) {
            self.join();
        } else if self.handle.take().is_some() {
            warn!(bridge = self.id, "Bridge thread was not signalled, detaching it");
        }
    }

    /// Joins the thread, returning `false` if it panicked.
    fn join(&mut self) -> bool {
        self.handle
            .take()
            .is_none_or(|handle| handle.join().is_ok())
    }
}

impl Drop for PubSubBridge {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!(bridge = self.id, error = %e, "Failed to shut down ingestion bridge");
        }
    }
}

enum Event {
    Message(Bytes),
    Shutdown,
    Interrupted,
}

struct Receiver<S, H> {
    id:         u64,
    control:    zmq::Socket,
    subscriber: zmq::Socket,
    sink:       S,
    faults:     H,
}

impl<S: MessageSink, H: FaultHandler> Receiver<S, H> {
    fn run(mut self) {
        debug!(bridge = self.id, "Ingestion loop started");
        loop {
            let fault = match self.wait() {
                Ok(Event::Shutdown) => break,
                Ok(Event::Interrupted) => continue,
                Ok(Event::Message(payload)) => match self.deliver(payload) {
                    Ok(()) => continue,
                    Err(fault) => fault,
                },
                Err(source) => Fault::Transport { source },
            };
            error!(bridge = self.id, error = %fault, "Ingestion stopped by fault");
            self.faults.on_fault(fault);
            break;
        }
        debug!(bridge = self.id, "Ingestion loop exited");
    }

    /// Blocks until either socket is readable. Control wins a tie.
    fn wait(&self) -> spoolmq_common_transport::Result<Event> {
        let (control_ready, data_ready) = {
            let mut items = [
                self.control.as_poll_item(zmq::POLLIN),
                self.subscriber.as_poll_item(zmq::POLLIN),
            ];
            match zmq::poll(&mut items, -1) {
                Ok(_) => {}
                Err(zmq::Error::EINTR) => return Ok(Event::Interrupted),
                Err(e) => return Err(e).context(PollSnafu),
            }
            (items[0].is_readable(), items[1].is_readable())
        };

        if control_ready {
            self.control.recv_bytes(0).context(ReceiveSnafu)?;
            return Ok(Event::Shutdown);
        }
        if data_ready {
            let payload = self.subscriber.recv_bytes(0).context(ReceiveSnafu)?;
            return Ok(Event::Message(Bytes::from(payload)));
        }
        Ok(Event::Interrupted)
    }

    fn deliver(&mut self, payload: Bytes) -> std::result::Result<(), Fault> {
        let size = payload.len();
        let sink = &mut self.sink;
        match panic::catch_unwind(AssertUnwindSafe(|| sink.deliver(payload))) {
            Ok(Ok(())) => {
                debug!(bridge = self.id, size, "Delivered message");
                Ok(())
            }
            Ok(Err(source)) => Err(Fault::Callback { source }),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(bridge = self.id, message, "Ingestion callback panicked");
                Err(Fault::Panicked { message })
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
