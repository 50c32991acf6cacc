// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host side of a plugin channel.
//!
//! [`RpcClient`] multiplexes concurrent calls over one framed stream: a
//! writer task serializes outgoing frames and a reader task routes each
//! response to its caller by frame id. [`RemoteExecutor`] speaks the
//! executor protocol on top of it.

use crate::error::PluginError;
use crate::writer::write_frames;
use async_trait::async_trait;
use kiln_core::{
    Executor, ExecutorError, LogSink, Session, SessionError, SessionId, Task, TaskResult,
};
use kiln_wire::{
    read_frame, Frame, LogOptions, ProtocolError, Request, Response, Status, MAGIC_COOKIE_VALUE,
    PROTOCOL_VERSION,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Calls awaiting responses, keyed by frame id.
#[derive(Default)]
struct Pending {
    calls: HashMap<u64, mpsc::UnboundedSender<Response>>,
    closed: bool,
}

impl Pending {
    /// Refuse new calls and end every outstanding response stream.
    fn close(&mut self) {
        self.closed = true;
        self.calls.clear();
    }
}

pub struct RpcClient {
    next_id: AtomicU64,
    outgoing: mpsc::UnboundedSender<Frame<Request>>,
    pending: Arc<Mutex<Pending>>,
    reader: JoinHandle<()>,
}

impl RpcClient {
    /// Start the reader and writer tasks over a connected stream pair.
    pub fn connect<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outgoing, frames) = mpsc::unbounded_channel();
        let pending = Arc::new(Mutex::new(Pending::default()));

        let on_write = Arc::clone(&pending);
        tokio::spawn(async move {
            if let Err(e) = write_frames(writer, frames).await {
                tracing::warn!(error = %e, "failed to write to plugin");
                on_write.lock().close();
            }
        });
        let reader = tokio::spawn(read_responses(reader, Arc::clone(&pending)));

        Self { next_id: AtomicU64::new(1), outgoing, pending, reader }
    }

    /// Send `request` and return the stream of responses to it.
    ///
    /// The stream ends after a final response or when the channel closes.
    pub fn call(
        &self,
        request: Request,
    ) -> Result<mpsc::UnboundedReceiver<Response>, ProtocolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut pending = self.pending.lock();
            if pending.closed {
                return Err(ProtocolError::ConnectionClosed);
            }
            pending.calls.insert(id, tx);
        }
        if self.outgoing.send(Frame::new(id, request)).is_err() {
            self.pending.lock().calls.remove(&id);
            return Err(ProtocolError::ConnectionClosed);
        }
        Ok(rx)
    }

    /// Send `request` and wait for its first response.
    pub async fn request(&self, request: Request) -> Result<Response, ProtocolError> {
        let mut responses = self.call(request)?;
        responses.recv().await.ok_or(ProtocolError::ConnectionClosed)
    }

    /// Exchange `Hello` with the plugin. Returns the plugin's protocol version.
    pub async fn handshake(&self, timeout: Duration) -> Result<u32, PluginError> {
        let hello =
            Request::Hello { cookie: MAGIC_COOKIE_VALUE.to_string(), version: PROTOCOL_VERSION };
        let response = tokio::time::timeout(timeout, self.request(hello))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        match response {
            Response::Hello { version } => Ok(version),
            Response::Error { message, .. } => Err(PluginError::Handshake(message)),
            other => Err(PluginError::Handshake(format!("unexpected response: {other:?}"))),
        }
    }

    /// Whether the channel to the plugin is gone.
    pub fn is_closed(&self) -> bool {
        self.pending.lock().closed
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_responses<R: AsyncRead + Unpin>(mut reader: R, pending: Arc<Mutex<Pending>>) {
    loop {
        match read_frame::<_, Response>(&mut reader, None).await {
            Ok(frame) => dispatch(&pending, frame),
            Err(ProtocolError::ConnectionClosed) => {
                tracing::debug!("plugin closed the channel");
                break;
            }
            Err(ProtocolError::Json(e)) => {
                tracing::warn!(error = %e, "dropping undecodable response");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read from plugin");
                break;
            }
        }
    }
    pending.lock().close();
}

fn dispatch(pending: &Mutex<Pending>, frame: Frame<Response>) {
    let caller = {
        let mut pending = pending.lock();
        if frame.body.is_final() {
            pending.calls.remove(&frame.id)
        } else {
            pending.calls.get(&frame.id).cloned()
        }
    };
    match caller {
        Some(caller) => {
            let _ = caller.send(frame.body);
        }
        None => tracing::debug!(id = frame.id, "response for an unknown call"),
    }
}

/// Log forwarding for one open session.
struct LogStream {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Executor running in another process.
///
/// Session logs streamed back by the plugin are forwarded into the host
/// session's log sink until the session closes. Cancelling a session's token
/// closes it on the plugin.
pub struct RemoteExecutor {
    client: Arc<RpcClient>,
    log: Option<LogOptions>,
    streams: Mutex<HashMap<SessionId, LogStream>>,
}

impl RemoteExecutor {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client, log: Some(LogOptions::default()), streams: Mutex::new(HashMap::new()) }
    }

    /// Which records the plugin streams back; `None` keeps them in the
    /// plugin's own tracing output.
    pub fn with_log_options(mut self, log: Option<LogOptions>) -> Self {
        self.log = log;
        self
    }

    pub fn client(&self) -> &Arc<RpcClient> {
        &self.client
    }
}

#[async_trait]
impl Executor for RemoteExecutor {
    async fn execute(
        &self,
        session: &Arc<Session>,
        task: &mut Task,
    ) -> Result<TaskResult, ExecutorError> {
        tracing::debug!(
            session_id = %session.id(),
            task_id = %task.id,
            executor = %task.executor,
            "sending task to plugin"
        );
        let request = Request::ExecuteTask { session_id: session.id().clone(), task: task.clone() };
        match self.client.request(request).await.map_err(ExecutorError::transport)? {
            Response::Executed { outputs, followups } => Ok(TaskResult { outputs, followups }),
            other => Err(into_error(other, session.id())),
        }
    }

    async fn open_session(&self, session: &Arc<Session>) -> Result<(), ExecutorError> {
        let session_id = session.id().clone();
        let cancel = session.cancellation().clone();
        let request = Request::OpenSession {
            session_id: session_id.clone(),
            workspace: session.workspace().clone(),
            log: self.log,
        };
        let mut responses = self.client.call(request).map_err(ExecutorError::transport)?;

        let first = tokio::select! {
            first = responses.recv() => Some(first),
            _ = cancel.cancelled() => None,
        };
        let Some(first) = first else {
            // The plugin may still finish opening; close it once it does.
            let client = Arc::clone(&self.client);
            let id = session_id.clone();
            tokio::spawn(async move {
                if let Some(Response::Ack) = responses.recv().await {
                    if let Err(e) = close_remote(&client, &id).await {
                        tracing::debug!(session_id = %id, error = %e, "late close failed");
                    }
                }
            });
            return Err(SessionError::Cancelled(session_id).into());
        };
        match first {
            Some(Response::Ack) => {}
            Some(other) => return Err(into_error(other, &session_id)),
            None => return Err(ExecutorError::transport(ProtocolError::ConnectionClosed)),
        }

        tracing::debug!(session_id = %session_id, "plugin session opened");
        let forward = forward_logs(
            Arc::clone(&self.client),
            session_id.clone(),
            responses,
            Arc::clone(session.log_sink()),
            cancel.clone(),
        );
        let stream = LogStream { handle: tokio::spawn(forward), cancel };
        if let Some(previous) = self.streams.lock().insert(session_id, stream) {
            previous.handle.abort();
        }
        Ok(())
    }

    /// Close the session and wait until its log stream has drained, so every
    /// record the plugin produced has reached the host sink.
    async fn close_session(&self, session_id: &SessionId) -> Result<(), ExecutorError> {
        let stream = self.streams.lock().remove(session_id);
        match stream {
            // The forwarder closes cancelled sessions itself.
            Some(stream) if stream.cancel.is_cancelled() => {
                let _ = stream.handle.await;
                Ok(())
            }
            stream => {
                let result = close_remote(&self.client, session_id).await;
                if let Some(stream) = stream {
                    match result {
                        Ok(()) => {
                            let _ = stream.handle.await;
                        }
                        Err(_) => stream.handle.abort(),
                    }
                }
                result
            }
        }
    }
}

async fn close_remote(client: &RpcClient, session_id: &SessionId) -> Result<(), ExecutorError> {
    let request = Request::CloseSession { session_id: session_id.clone() };
    match client.request(request).await.map_err(ExecutorError::transport)? {
        Response::Closed => Ok(()),
        other => Err(into_error(other, session_id)),
    }
}

/// Deliver streamed records until the plugin ends the stream. Cancellation
/// asks the plugin to close the session; records it still flushes are
/// delivered before the stream ends.
async fn forward_logs(
    client: Arc<RpcClient>,
    session_id: SessionId,
    mut responses: mpsc::UnboundedReceiver<Response>,
    sink: Arc<dyn LogSink>,
    cancel: CancellationToken,
) {
    let mut closing = false;
    loop {
        tokio::select! {
            response = responses.recv() => match response {
                Some(Response::Log { record }) => sink.emit(record),
                Some(Response::SessionEnded) | None => break,
                Some(other) => {
                    tracing::warn!(
                        session_id = %session_id,
                        response = ?other,
                        "unexpected log frame"
                    )
                }
            },
            _ = cancel.cancelled(), if !closing => {
                closing = true;
                tracing::info!(session_id = %session_id, "session cancelled, closing on plugin");
                if let Err(e) = close_remote(&client, &session_id).await {
                    tracing::warn!(session_id = %session_id, error = %e, "failed to close session");
                }
            }
        }
    }
    tracing::debug!(session_id = %session_id, "plugin log stream ended");
}

/// Map a non-success response back onto the executor error taxonomy.
///
/// Only execution failures keep their message as-is; everything else is a
/// transport problem from the host's point of view.
fn into_error(response: Response, session_id: &SessionId) -> ExecutorError {
    match response {
        Response::Error { status: Status::ExecutionFailed, message } => {
            ExecutorError::Failed(message)
        }
        Response::Error { status: Status::UnknownSession, .. } => {
            SessionError::Unknown(session_id.clone()).into()
        }
        Response::Error { status, message } => {
            ExecutorError::transport(format!("{status}: {message}"))
        }
        other => ExecutorError::transport(format!("unexpected response: {other:?}")),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
