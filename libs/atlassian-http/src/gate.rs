// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Concurrency gate for outbound API requests
//!
//! Atlassian Cloud rate-limits aggressively and returns 429s with no
//! useful Retry-After once a site is saturated, so every client in this
//! workspace caps its own concurrency instead of firing and hoping.
//! A [`RequestGate`] is a clonable handle to a fixed pool of permits;
//! each outbound request holds one [`RequestPermit`] for its duration.
//!
//! Burst shaping is handled by *staggered* acquisition: the Nth request
//! of a fan-out sleeps `N * spacing` before it even contends for a
//! permit, which spreads request starts evenly instead of slamming the
//! pool the moment it drains.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default spacing between staggered request starts.
pub const DEFAULT_SPACING: Duration = Duration::from_millis(100);

/// A bounded pool of request permits.
///
/// Cloning is cheap and shares the pool. Each API client owns its own
/// gate so that, say, Jira traffic never starves Confluence traffic.
#[derive(Debug, Clone)]
pub struct RequestGate {
    permits: Arc<Semaphore>,
}

impl RequestGate {
    /// Create a gate allowing at most `limit` requests in flight.
    pub fn new(limit: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(limit)),
        }
    }

    /// Wait for a free permit.
    pub async fn acquire(&self) -> RequestPermit {
        match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => RequestPermit { _permit: permit },
            // The semaphore is owned by this gate and never closed.
            Err(_) => unreachable!("request gate semaphore closed"),
        }
    }

    /// Sleep `order * spacing`, then wait for a free permit.
    ///
    /// `order` is the caller's position within its fan-out (0-based);
    /// order 0 does not sleep at all.
    pub async fn acquire_staggered(&self, order: u32, spacing: Duration) -> RequestPermit {
        if order > 0 {
            tokio::time::sleep(spacing * order).await;
        }
        self.acquire().await
    }

    /// Permits not currently held.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

/// A held slot in the pool; dropping it releases the slot.
#[derive(Debug)]
pub struct RequestPermit {
    _permit: OwnedSemaphorePermit,
}
