// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kiln_wire::{write_frame, Frame, ProtocolError};
use serde::Serialize;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;

/// Drain `frames` into `writer` until every sender is gone or a write fails.
///
/// Both ends of a channel funnel their frames through one of these so
/// concurrent calls never interleave bytes.
pub(crate) async fn write_frames<W, T>(
    mut writer: W,
    mut frames: mpsc::UnboundedReceiver<Frame<T>>,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    while let Some(frame) = frames.recv().await {
        write_frame(&mut writer, &frame, None).await?;
    }
    Ok(())
}
