// Copyright 2023 - 2026 The Gauntlet Authors

//! Session-wide cancellation.
//!
//! Ctrl-c (and the scheduler, on fatal worker errors) sets a global flag;
//! long-running loops poll it via [`check_interrupted`] and unwind. Workers
//! stop picking up new runs, and hosts that ignore the session-end signal
//! are terminated by their adapter after a grace period.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;

use crate::Result;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

pub fn install_handler() {
    ctrlc::set_handler(|| trip()).expect("install ctrl-c handler");
}

/// Request cancellation from inside the engine.
pub fn trip() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Test hook: forget a previous cancellation.
pub fn reset() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Return an error if the session was cancelled and should unwind.
pub fn check_interrupted() -> Result<()> {
    if is_interrupted() {
        Err(anyhow!("interrupted"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trip_and_reset() {
        reset();
        assert!(check_interrupted().is_ok());
        trip();
        assert!(is_interrupted());
        assert!(check_interrupted().is_err());
        reset();
        assert!(check_interrupted().is_ok());
    }
}
