// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common Test Utilities
//!
//! Descriptor fixtures, a mock-backed session builder and proptest
//! strategies shared across the integration tests.

#![allow(dead_code)]

pub mod fixtures;
pub mod strategies;
