use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

/// Statically allocated channel buffer that can be handed to a transport exactly once.
///
/// ```
/// use ucprof::ChannelBuffer;
///
/// static BUFFER: ChannelBuffer<64> = ChannelBuffer::new();
///
/// let bytes = BUFFER.take().unwrap();
/// assert_eq!(bytes.len(), 64);
/// assert!(BUFFER.take().is_none());
/// ```
pub struct ChannelBuffer<const N: usize> {
    taken: AtomicBool,
    bytes: UnsafeCell<[u8; N]>,
}

// The bytes are only reachable through the single `&mut` handed out by `take`.
unsafe impl<const N: usize> Sync for ChannelBuffer<N> {}

impl<const N: usize> ChannelBuffer<N> {
    pub const fn new() -> Self {
        ChannelBuffer {
            taken: AtomicBool::new(false),
            bytes: UnsafeCell::new([0; N]),
        }
    }

    /// Returns the buffer the first time it is called and `None` afterwards.
    pub fn take(&'static self) -> Option<&'static mut [u8]> {
        if self.taken.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(unsafe { &mut *self.bytes.get() })
    }

    pub fn is_taken(&self) -> bool {
        self.taken.load(Ordering::Acquire)
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for ChannelBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
