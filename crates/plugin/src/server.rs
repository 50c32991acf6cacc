// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin side of the channel.
//!
//! After the handshake every request runs in its own task; responses are
//! funnelled through a single writer task. An `OpenSession` call stays open
//! for the life of the session and carries its log stream.

use crate::env;
use crate::error::PluginError;
use crate::writer::write_frames;
use kiln_core::{
    AttachId, ChannelSink, Executor, ExecutorError, LogRecord, LogSink, Session, SessionError,
    SessionId, StartupBuffer, Task, TracingSink, Workspace,
};
use kiln_wire::{
    check_hello, read_frame, Frame, LogOptions, ProtocolError, Request, Response, Status,
    PROTOCOL_VERSION,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};

type Responses = mpsc::UnboundedSender<Frame<Response>>;

/// Bookkeeping for one open session.
struct SessionEntry {
    session: Arc<Session>,
    buffer: Arc<StartupBuffer>,
    stream: Option<AttachId>,
    /// Ends the `OpenSession` call once the session closes.
    closed: oneshot::Sender<()>,
}

/// Holds a session id while its `OpenSession` is in progress.
struct Reservation<'a> {
    opening: &'a Mutex<HashSet<SessionId>>,
    session_id: SessionId,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.opening.lock().remove(&self.session_id);
    }
}

pub struct PluginServer {
    executor: Arc<dyn Executor>,
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    /// Ids whose `OpenSession` has not finished yet. Locked after `sessions`.
    opening: Mutex<HashSet<SessionId>>,
}

impl PluginServer {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            sessions: RwLock::new(HashMap::new()),
            opening: Mutex::new(HashSet::new()),
        }
    }

    /// Claim `session_id` unless it is open or being opened.
    fn reserve(&self, session_id: &SessionId) -> Option<Reservation<'_>> {
        let sessions = self.sessions.read();
        let mut opening = self.opening.lock();
        if sessions.contains_key(session_id) || !opening.insert(session_id.clone()) {
            return None;
        }
        Some(Reservation { opening: &self.opening, session_id: session_id.clone() })
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.read().len()
    }

    /// Serve one host connection until it closes.
    ///
    /// Sessions the host leaves open are closed on the executor before this
    /// returns.
    pub async fn serve<R, W>(self: Arc<Self>, mut reader: R, writer: W) -> Result<(), PluginError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (responses, frames) = mpsc::unbounded_channel();
        let writer = tokio::spawn(async move {
            if let Err(e) = write_frames(writer, frames).await {
                tracing::warn!(error = %e, "failed to write to host");
            }
        });

        let result = match self.handshake(&mut reader, &responses).await {
            Ok(()) => self.dispatch(&mut reader, &responses).await,
            Err(e) => Err(e),
        };

        self.shutdown().await;
        drop(responses);
        let _ = writer.await;
        result
    }

    async fn handshake<R>(&self, reader: &mut R, responses: &Responses) -> Result<(), PluginError>
    where
        R: AsyncRead + Unpin,
    {
        let frame = read_frame::<_, Request>(reader, Some(env::rpc_timeout())).await?;
        let verdict = match frame.body {
            Request::Hello { cookie, version } => check_hello(&cookie, version),
            other => Err(format!("expected Hello, got {}", request_name(&other))),
        };
        match verdict {
            Ok(()) => {
                tracing::info!(version = PROTOCOL_VERSION, "host connected");
                send(responses, frame.id, Response::Hello { version: PROTOCOL_VERSION });
                Ok(())
            }
            Err(message) => {
                tracing::error!(error = %message, "rejecting host");
                send(responses, frame.id, Response::error(Status::Handshake, message.clone()));
                Err(PluginError::Handshake(message))
            }
        }
    }

    async fn dispatch<R>(
        self: &Arc<Self>,
        reader: &mut R,
        responses: &Responses,
    ) -> Result<(), PluginError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            let frame = match read_frame::<_, Request>(reader, None).await {
                Ok(frame) => frame,
                Err(ProtocolError::ConnectionClosed) => {
                    tracing::debug!("host closed the channel");
                    return Ok(());
                }
                Err(ProtocolError::Json(e)) => {
                    tracing::warn!(error = %e, "dropping undecodable request");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            tracing::debug!(id = frame.id, request = request_name(&frame.body), "request");

            let server = Arc::clone(self);
            let responses = responses.clone();
            tokio::spawn(async move { server.handle(frame, responses).await });
        }
    }

    async fn handle(&self, frame: Frame<Request>, responses: Responses) {
        let id = frame.id;
        let response = match frame.body {
            Request::Hello { .. } => {
                Response::error(Status::InvalidRequest, "handshake already completed")
            }
            Request::OpenSession { session_id, workspace, log } => {
                return self.open_session(id, session_id, workspace, log, &responses).await;
            }
            Request::ExecuteTask { session_id, task } => self.execute(&session_id, task).await,
            Request::CloseSession { session_id } => self.close_session(&session_id).await,
        };
        send(&responses, id, response);
    }

    async fn open_session(
        &self,
        id: u64,
        session_id: SessionId,
        workspace: Workspace,
        log: Option<LogOptions>,
        responses: &Responses,
    ) {
        let Some(reservation) = self.reserve(&session_id) else {
            let message = format!("session {session_id} is already open");
            return send(responses, id, Response::error(Status::InvalidRequest, message));
        };

        // Records logged before the host's stream attaches wait here.
        let buffer =
            Arc::new(StartupBuffer::new(StartupBuffer::DEFAULT_CAPACITY, Arc::new(TracingSink)));
        let sink: Arc<dyn LogSink> = Arc::clone(&buffer) as _;
        let session = match Session::open(session_id.clone(), workspace) {
            Ok(session) => Arc::new(session.with_log_sink(sink)),
            Err(e) => {
                let message = format!("failed to open workspace: {e}");
                return send(responses, id, Response::error(Status::Internal, message));
            }
        };

        if let Err(e) = self.executor.open_session(&session).await {
            tracing::warn!(session_id = %session_id, error = %e, "failed to open session");
            buffer.flush_to_fallback();
            return send(responses, id, error_response(&e));
        }

        let (stream, records) = match log {
            Some(options) => {
                let (sink, records) = ChannelSink::new(options.min_level, options.include_source);
                (Some(buffer.attach(Arc::new(sink))), Some(records))
            }
            None => {
                buffer.attach(Arc::new(TracingSink));
                (None, None)
            }
        };
        let (closed_tx, closed) = oneshot::channel();
        let entry =
            SessionEntry { session: Arc::clone(&session), buffer, stream, closed: closed_tx };
        self.sessions.write().insert(session_id.clone(), entry);
        drop(reservation);

        tracing::info!(
            session_id = %session_id,
            workspace = %session.workspace(),
            streaming = records.is_some(),
            "session opened"
        );
        send(responses, id, Response::Ack);
        stream_logs(id, records, closed, responses).await;
        send(responses, id, Response::SessionEnded);
    }

    async fn execute(&self, session_id: &SessionId, mut task: Task) -> Response {
        let Some(session) = self.session(session_id) else {
            return unknown_session(session_id);
        };
        if let Err(e) = session.ensure_output_dir(&task.id) {
            let message = format!("failed to create output directory of {}: {e}", task.id);
            return Response::error(Status::Internal, message);
        }

        match self.executor.execute(&session, &mut task).await {
            Ok(result) => Response::executed(result),
            Err(e) => {
                tracing::debug!(task_id = %task.id, error = %e, "task failed");
                error_response(&e)
            }
        }
    }

    async fn close_session(&self, session_id: &SessionId) -> Response {
        let Some(entry) = self.sessions.write().remove(session_id) else {
            return unknown_session(session_id);
        };
        match self.release(session_id, entry).await {
            Ok(()) => {
                tracing::info!(session_id = %session_id, "session closed");
                Response::Closed
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "failed to close session");
                error_response(&e)
            }
        }
    }

    /// Detach the log stream, end the `OpenSession` call, and close the
    /// session on the executor. Later records go to the tracing sink.
    async fn release(
        &self,
        session_id: &SessionId,
        entry: SessionEntry,
    ) -> Result<(), ExecutorError> {
        if let Some(stream) = entry.stream {
            entry.buffer.detach(stream);
        }
        let _ = entry.closed.send(());
        entry.session.cancellation().cancel();
        self.executor.close_session(session_id).await
    }

    async fn shutdown(&self) {
        let entries: Vec<_> = self.sessions.write().drain().collect();
        for (session_id, entry) in entries {
            tracing::warn!(session_id = %session_id, "closing session left open by host");
            if let Err(e) = self.release(&session_id, entry).await {
                tracing::warn!(session_id = %session_id, error = %e, "failed to close session");
            }
        }
    }

    fn session(&self, session_id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().get(session_id).map(|entry| Arc::clone(&entry.session))
    }
}

/// Forward streamed records until the session closes, then drain what the
/// sink queued before it was detached.
async fn stream_logs(
    id: u64,
    records: Option<mpsc::UnboundedReceiver<LogRecord>>,
    mut closed: oneshot::Receiver<()>,
    responses: &Responses,
) {
    let Some(mut records) = records else {
        let _ = closed.await;
        return;
    };
    loop {
        tokio::select! {
            record = records.recv() => match record {
                Some(record) => send(responses, id, Response::Log { record }),
                None => break,
            },
            _ = &mut closed => break,
        }
    }
    while let Ok(record) = records.try_recv() {
        send(responses, id, Response::Log { record });
    }
}

fn send(responses: &Responses, id: u64, response: Response) {
    // The writer only goes away with the connection.
    let _ = responses.send(Frame::new(id, response));
}

fn unknown_session(session_id: &SessionId) -> Response {
    Response::error(Status::UnknownSession, SessionError::Unknown(session_id.clone()).to_string())
}

fn error_response(e: &ExecutorError) -> Response {
    match e {
        ExecutorError::Session(SessionError::Unknown(session_id)) => unknown_session(session_id),
        e => Response::error(Status::ExecutionFailed, e.to_string()),
    }
}

fn request_name(request: &Request) -> &'static str {
    match request {
        Request::Hello { .. } => "Hello",
        Request::OpenSession { .. } => "OpenSession",
        Request::ExecuteTask { .. } => "ExecuteTask",
        Request::CloseSession { .. } => "CloseSession",
    }
}

/// Serve `executor` over an arbitrary stream pair.
pub async fn serve<R, W>(
    reader: R,
    writer: W,
    executor: Arc<dyn Executor>,
) -> Result<(), PluginError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    Arc::new(PluginServer::new(executor)).serve(reader, writer).await
}

/// Entry point for plugin binaries: serve `executor` over stdin/stdout.
///
/// Refuses to run unless launched by a kiln host.
pub async fn serve_stdio(executor: Arc<dyn Executor>) -> Result<(), PluginError> {
    if !env::launched_by_host() {
        return Err(PluginError::MissingCookie);
    }
    serve(tokio::io::stdin(), tokio::io::stdout(), executor).await
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
