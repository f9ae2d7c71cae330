// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Display name sanitization.
//!
//! Maps a human-supplied site name to an identifier that is safe both as a
//! filesystem path segment and as an orchestrator project name.

/// Character prepended when the sanitized name does not start with an alphanumeric.
pub const FILLER: char = 'x';

/// Sanitize a display name.
///
/// Lower-cases the input, replaces every character outside `[a-z0-9._-]`
/// with `_`, and prepends [`FILLER`] if the result does not start with an
/// ASCII alphanumeric. The function is pure and idempotent.
///
/// Callers must reject empty names first; an empty input yields `"x"`.
pub fn sanitize_name(name: &str) -> String {
    let mut sanitized: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if !sanitized
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric())
    {
        sanitized.insert(0, FILLER);
    }

    sanitized
}
