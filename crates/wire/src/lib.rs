// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC protocol between a kiln host and executor plugins.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload. Every
//! payload is a [`Frame`] whose id pairs a response with its request, so one
//! channel multiplexes concurrent calls.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod handshake;
mod request;
mod response;
mod status;
mod wire;

pub use handshake::{check_hello, MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE, PROTOCOL_VERSION};
pub use request::{LogOptions, Request};
pub use response::Response;
pub use status::Status;
pub use wire::{
    decode, encode, read_frame, read_message, write_frame, write_message, Frame, ProtocolError,
    MAX_FRAME_SIZE,
};
