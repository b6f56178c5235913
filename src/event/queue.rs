//! Bounded FIFO between interrupt-time detection and main-loop processing.

use std::fmt;

use crate::error::{Error, Result};
use crate::protocol::urc::RawEvent;

/// Default number of entries held by an [`EventQueue`].
pub const DEFAULT_CAPACITY: usize = 20;

/// Fixed-capacity FIFO ring.
///
/// Tracks its occupancy explicitly, so all `N` slots are usable. A rejected
/// `put` or a failed `pop` leaves the queue unchanged.
#[derive(Debug)]
pub struct EventQueue<T, const N: usize = DEFAULT_CAPACITY> {
    slots: [Option<T>; N],
    head: usize,
    len: usize,
}

impl<T, const N: usize> Default for EventQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> EventQueue<T, N> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            head: 0,
            len: 0,
        }
    }

    /// Appends an item at the back.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] if every slot is occupied.
    pub fn put(&mut self, item: T) -> Result<()> {
        if self.is_full() {
            return Err(Error::QueueFull { capacity: N });
        }
        let tail = (self.head + self.len) % N;
        self.slots[tail] = Some(item);
        self.len += 1;
        Ok(())
    }

    /// Removes the item at the front.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueEmpty`] if the queue holds nothing.
    pub fn pop(&mut self) -> Result<T> {
        if self.is_empty() {
            return Err(Error::QueueEmpty);
        }
        let item = self.slots[self.head].take().ok_or(Error::QueueEmpty)?;
        self.head = (self.head + 1) % N;
        self.len -= 1;
        Ok(item)
    }

    /// Returns the item at the front without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueEmpty`] if the queue holds nothing.
    pub fn peek(&self) -> Result<&T> {
        if self.is_empty() {
            return Err(Error::QueueEmpty);
        }
        self.slots[self.head].as_ref().ok_or(Error::QueueEmpty)
    }

    /// Returns true if no item is queued.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if no slot is free.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len == N
    }

    /// Number of queued items.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Maximum number of queued items.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Drops every queued item.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

/// Tagged entry stored in the driver's queue.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueItem {
    /// Signed integer.
    Int(i32),
    /// Single character.
    Char(char),
    /// Floating-point value.
    Float(f32),
    /// Unsigned byte.
    U8(u8),
    /// Unsigned 16-bit value.
    U16(u16),
    /// Unsigned 32-bit value.
    U32(u32),
    /// Short text.
    Str(String),
    /// Detected notification.
    Urc(RawEvent),
}

impl QueueItem {
    /// Returns the notification if this entry holds one.
    #[must_use]
    pub fn into_urc(self) -> Option<RawEvent> {
        match self {
            Self::Urc(event) => Some(event),
            _ => None,
        }
    }
}

impl From<RawEvent> for QueueItem {
    fn from(event: RawEvent) -> Self {
        Self::Urc(event)
    }
}

impl fmt::Display for QueueItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "int {v}"),
            Self::Char(v) => write!(f, "char {v:?}"),
            Self::Float(v) => write!(f, "float {v}"),
            Self::U8(v) => write!(f, "u8 {v}"),
            Self::U16(v) => write!(f, "u16 {v}"),
            Self::U32(v) => write!(f, "u32 {v}"),
            Self::Str(v) => write!(f, "str {v:?}"),
            Self::Urc(event) => write!(f, "urc {event}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::protocol::urc::UrcKind;

    fn fill_and_overflow<const N: usize>() {
        let mut queue: EventQueue<usize, N> = EventQueue::new();
        for i in 0..N {
            queue.put(i).unwrap();
        }
        assert!(queue.is_full());
        assert!(matches!(queue.put(N), Err(Error::QueueFull { capacity }) if capacity == N));
        assert_eq!(queue.len(), N);

        assert_eq!(queue.pop().unwrap(), 0);
        assert!(!queue.is_full());
        queue.put(N).unwrap();
        assert!(queue.is_full());
    }

    #[test]
    fn test_full_rejects_until_pop() {
        fill_and_overflow::<1>();
        fill_and_overflow::<3>();
        fill_and_overflow::<DEFAULT_CAPACITY>();
    }

    #[test]
    fn test_pop_empty_leaves_queue_usable() {
        let mut queue: EventQueue<u8> = EventQueue::new();
        assert!(matches!(queue.pop(), Err(Error::QueueEmpty)));
        assert!(matches!(queue.pop(), Err(Error::QueueEmpty)));
        assert!(queue.is_empty());
        assert!(matches!(queue.peek(), Err(Error::QueueEmpty)));

        queue.put(7).unwrap();
        assert!(!queue.is_empty());
        assert_eq!(queue.pop().unwrap(), 7);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fifo_order_across_wraparound() {
        let mut queue: EventQueue<u32, 4> = EventQueue::new();
        for round in 0..5 {
            let base = round * 10;
            for i in 0..4 {
                queue.put(base + i).unwrap();
            }
            let popped: Vec<_> = (0..4).map(|_| queue.pop().unwrap()).collect();
            assert_eq!(popped, vec![base, base + 1, base + 2, base + 3]);
        }
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut queue: EventQueue<&str> = EventQueue::new();
        queue.put("a").unwrap();
        queue.put("b").unwrap();
        assert_eq!(*queue.peek().unwrap(), "a");
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().unwrap(), "a");
        assert_eq!(*queue.peek().unwrap(), "b");
    }

    #[test]
    fn test_clear() {
        let mut queue: EventQueue<u8, 2> = EventQueue::new();
        queue.put(1).unwrap();
        queue.put(2).unwrap();
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 2);
        queue.put(3).unwrap();
        assert_eq!(queue.pop().unwrap(), 3);
    }

    #[test]
    fn test_queue_item_urc() {
        let event = RawEvent::new(UrcKind::Closed, Bytes::from_static(b"closed\",3\r\n"));
        let item = QueueItem::from(event.clone());
        assert!(item.to_string().starts_with("urc closed"));
        assert_eq!(item.into_urc(), Some(event));
        assert_eq!(QueueItem::U8(3).into_urc(), None);
    }
}
