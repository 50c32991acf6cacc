// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Bumped on any incompatible change to [`Request`](crate::Request) or
/// [`Response`](crate::Response).
pub const PROTOCOL_VERSION: u32 = 1;

/// Environment variable the host sets when launching a plugin. A plugin
/// refuses to serve when it is missing, which catches users running the
/// plugin binary by hand.
pub const MAGIC_COOKIE_KEY: &str = "KILN_PLUGIN_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str = "f3c1b7a2d94e4e0b8a5d6c2e1b0f9a87";

/// Validate a `Hello` request against this build's cookie and version.
pub fn check_hello(cookie: &str, version: u32) -> Result<(), String> {
    if cookie != MAGIC_COOKIE_VALUE {
        return Err("invalid plugin cookie".to_string());
    }
    if version != PROTOCOL_VERSION {
        return Err(format!(
            "protocol version mismatch: host speaks {version}, plugin speaks {PROTOCOL_VERSION}"
        ));
    }
    Ok(())
}
