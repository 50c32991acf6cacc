// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Boilerplate macros shared across kiln crates.

/// `Display` for a fieldless enum, one fixed string per variant.
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident => $text:literal ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let text = match self {
                    $( Self::$variant => $text, )+
                };
                f.write_str(text)
            }
        }
    };
}

/// Builder-style setters taking the field type directly, for use inside an
/// `impl` block: `setters! { set { max_concurrency: usize } }`.
#[macro_export]
macro_rules! setters {
    (set { $( $field:ident : $ty:ty ),* $(,)? }) => {
        $(
            pub fn $field(mut self, $field: $ty) -> Self {
                self.$field = $field;
                self
            }
        )*
    };
}
