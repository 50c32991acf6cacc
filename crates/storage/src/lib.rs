// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-storage: fingerprints of executed tasks, used to skip work whose
//! arguments, inputs and outputs are unchanged.

pub mod checksum;
mod state;

pub use state::{
    check_state, detect_mismatches, load_state, save_state, state_path, Mismatch, StateError,
    TaskState, STATE_FILE,
};
