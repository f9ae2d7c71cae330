// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Credential generation for site databases.

use rand::Rng;

/// Length of generated database passwords.
pub const PASSWORD_LENGTH: usize = 16;

/// ASCII letters and digits without look-alikes (`0 O o 1 l I`).
///
/// No punctuation: the value is embedded verbatim in YAML and container
/// environment variables.
const ALPHABET: &[u8] = b"abcdefghijkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate a random password of `len` characters.
pub fn generate_password(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}
