// Bounded display buffers backed by a ring buffer

use std::collections::VecDeque;

/// Newest item at index 0; the oldest item falls off the back past `capacity`.
#[derive(Debug, Clone)]
pub struct NewestFirst<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> NewestFirst<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        self.buf.push_front(item);
        self.buf.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }
}

impl<T: Clone> NewestFirst<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.buf.iter().cloned().collect()
    }
}

/// Oldest item at index 0; new items go to the back and the front is dropped past `capacity`.
#[derive(Debug, Clone)]
pub struct Chronological<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> Chronological<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        self.buf.push_back(item);
        while self.buf.len() > self.capacity {
            self.buf.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }
}

impl<T: Clone> Chronological<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.buf.iter().cloned().collect()
    }
}
