/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Reply queues between async host callbacks and the per-frame UI update.
//! Async tasks push into the queue, `update()` drains it every frame.
//!
//! Each reply carries the generation of the request that produced it so the
//! receiver can drop answers that arrive after the dialog was closed.

use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug)]
pub struct Tagged<T> {
    pub generation: u64,
    pub value: T,
}

pub struct Inbox<T> {
    queue: Arc<Mutex<Vec<Tagged<T>>>>,
}

/// Sending half handed to a capability for one request
pub struct Reply<T> {
    generation: u64,
    queue: Arc<Mutex<Vec<Tagged<T>>>>,
}

impl<T> Inbox<T> {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn reply(&self, generation: u64) -> Reply<T> {
        Reply {
            generation,
            queue: Arc::clone(&self.queue),
        }
    }

    /// Take every reply received since the last call, oldest first
    pub fn drain(&self) -> Vec<Tagged<T>> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.drain(..).collect()
    }
}

impl<T> Default for Inbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Reply<T> {
    pub fn send(&self, value: T) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Tagged {
                generation: self.generation,
                value,
            });
    }
}

// Manual impl: cloning a reply must not require `T: Clone`
impl<T> Clone for Reply<T> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            queue: Arc::clone(&self.queue),
        }
    }
}
