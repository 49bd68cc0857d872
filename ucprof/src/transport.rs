//! The byte-stream transport the records travel over.
//!
//! Modelled on RTT up buffers: numbered channels, each with a caller-owned buffer, a name and
//! an overflow mode, plus a lock that serialises writers.

use crate::config::ChannelConfig;
use crate::error::Error;

pub type ChannelIndex = u32;

/// What a write does when the channel buffer cannot hold all of it.
///
/// Discriminants match the SEGGER RTT up-buffer mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum OverflowPolicy {
    /// Drop the whole write.
    Skip = 0,
    /// Write as much as fits and drop the rest.
    Trim = 1,
    /// Wait for the reader to make room.
    Block = 2,
}

impl OverflowPolicy {
    pub const fn flags(self) -> u32 {
        self as u32
    }
}

/// Channel operations a tracer needs.
///
/// Only the holder of a channel lock may release it, so `unlock` is as `unsafe` as the write:
///
/// ```compile_fail,E0133
/// use ucprof::rtt::UpChannels;
/// use ucprof::Transport;
///
/// let channels = UpChannels::<1>::new();
/// channels.lock(0);
/// channels.unlock(0);
/// ```
pub trait Transport {
    /// Binds `buffer` to the channel described by `config`.
    ///
    /// The buffer stays registered for the rest of the session. Implementations must refuse to
    /// rebind a channel that is already bound rather than replace its buffer.
    fn configure(&self, config: &ChannelConfig, buffer: &'static mut [u8]) -> Result<(), Error>;

    /// Takes the channel lock. Not reentrant: never call twice without an `unlock` in between.
    fn lock(&self, channel: ChannelIndex);

    /// Releases the channel lock.
    ///
    /// # Safety
    ///
    /// The caller must hold the lock, taken by its own matching `lock` call. Releasing a lock
    /// held by another context lets two writers into the channel at once.
    unsafe fn unlock(&self, channel: ChannelIndex);

    /// Copies `data` into the channel and returns how many bytes were accepted.
    ///
    /// Short counts are how the overflow policy shows up. They are not errors.
    ///
    /// # Safety
    ///
    /// The caller must hold the lock of `channel`.
    unsafe fn write_unlocked(&self, channel: ChannelIndex, data: &[u8]) -> usize;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn configure(&self, config: &ChannelConfig, buffer: &'static mut [u8]) -> Result<(), Error> {
        (**self).configure(config, buffer)
    }

    fn lock(&self, channel: ChannelIndex) {
        (**self).lock(channel)
    }

    unsafe fn unlock(&self, channel: ChannelIndex) {
        (**self).unlock(channel)
    }

    unsafe fn write_unlocked(&self, channel: ChannelIndex, data: &[u8]) -> usize {
        (**self).write_unlocked(channel, data)
    }
}

/// Holds the channel lock until dropped. Writes are only reachable through it.
#[cfg(feature = "enabled")]
pub(crate) struct ChannelLock<'a, T: Transport> {
    transport: &'a T,
    channel: ChannelIndex,
}

#[cfg(feature = "enabled")]
impl<'a, T: Transport> ChannelLock<'a, T> {
    pub(crate) fn acquire(transport: &'a T, channel: ChannelIndex) -> Self {
        transport.lock(channel);
        ChannelLock { transport, channel }
    }

    pub(crate) fn write(&self, data: &[u8]) -> usize {
        // The lock is held for as long as `self` lives.
        unsafe { self.transport.write_unlocked(self.channel, data) }
    }
}

#[cfg(feature = "enabled")]
impl<T: Transport> Drop for ChannelLock<'_, T> {
    fn drop(&mut self) {
        // Taken in `acquire`, released exactly once here.
        unsafe { self.transport.unlock(self.channel) }
    }
}
