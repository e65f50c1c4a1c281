// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Connectivity signal, fed by an external reachability watcher.

use std::sync::atomic::{AtomicBool, Ordering};

/// Synchronous "is the network reachable" query.
pub trait Connectivity: Send + Sync {
    fn is_reachable(&self) -> bool;
}

/// Settable reachability flag.
#[derive(Debug)]
pub struct ConnectivityFlag {
    reachable: AtomicBool,
}

impl ConnectivityFlag {
    pub fn new(reachable: bool) -> Self {
        ConnectivityFlag {
            reachable: AtomicBool::new(reachable),
        }
    }

    pub fn set(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for ConnectivityFlag {
    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}
