// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies

use proptest::prelude::*;

/// Any 2xx status.
pub fn success_status_strategy() -> impl Strategy<Value = u16> {
    200u16..=299
}

/// Any status outside 2xx that a server could send.
pub fn failure_status_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![100u16..=199, 300u16..=599]
}

/// Native transport codes, never the cancellation code.
pub fn transport_code_strategy() -> impl Strategy<Value = i64> {
    (-5000i64..0).prop_filter("not cancellation", |code| *code != -999)
}

/// Arbitrary raw public keys.
pub fn raw_key_strategy() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..300)
}

/// Reachable HTTPS URLs.
pub fn url_strategy() -> impl Strategy<Value = String> {
    ("[a-z]{3,10}", "[a-z]{2,4}", "[a-z0-9]{1,12}")
        .prop_map(|(domain, tld, path)| format!("https://{}.{}/{}", domain, tld, path))
}
