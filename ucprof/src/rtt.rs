//! Software RTT up channels.
//!
//! A [`Transport`] that keeps each channel as a ring buffer in target memory, the way SEGGER RTT
//! up buffers work: the target advances the write offset, the host (normally a debug probe,
//! here [`UpChannels::read`]) advances the read offset. One byte of every ring stays free so a
//! full buffer can be told apart from an empty one.
//!
//! The channel locks spin. That suits hosted use and tests, where the holder keeps running on
//! another thread. It does not suit a single-core preemptive RTOS: a task preempted while it
//! holds the lock leaves the next hook spinning forever. Targets bind to the RTT library's own
//! lock instead, through `ucprof-ffi`.

use core::cmp::min;
use core::ffi::CStr;
use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};

use spin::{Mutex, Once};

use crate::config::ChannelConfig;
use crate::error::Error;
use crate::transport::{ChannelIndex, OverflowPolicy, Transport};

struct Binding {
    name: &'static CStr,
    ptr: *mut u8,
    size: usize,
    policy: OverflowPolicy,
}

// `ptr` comes from a `&'static mut [u8]` owned by the binding from then on.
unsafe impl Send for Binding {}
unsafe impl Sync for Binding {}

struct UpBuffer {
    lock: Mutex<()>,
    binding: Once<Binding>,
    wr_off: AtomicUsize,
    rd_off: AtomicUsize,
}

impl UpBuffer {
    #[allow(clippy::declare_interior_mutable_const)]
    const UNBOUND: UpBuffer = UpBuffer {
        lock: Mutex::new(()),
        binding: Once::new(),
        wr_off: AtomicUsize::new(0),
        rd_off: AtomicUsize::new(0),
    };

    fn free(&self, binding: &Binding) -> usize {
        if binding.size == 0 {
            return 0;
        }
        let rd = self.rd_off.load(Ordering::Acquire);
        let wr = self.wr_off.load(Ordering::Relaxed);
        if rd <= wr {
            binding.size - 1 - wr + rd
        } else {
            rd - wr - 1
        }
    }

    /// Appends `data`, which must fit in the free space.
    unsafe fn push(&self, binding: &Binding, data: &[u8]) -> usize {
        let wr = self.wr_off.load(Ordering::Relaxed);
        let first = min(data.len(), binding.size - wr);
        ptr::copy_nonoverlapping(data.as_ptr(), binding.ptr.add(wr), first);
        ptr::copy_nonoverlapping(data.as_ptr().add(first), binding.ptr, data.len() - first);

        let mut next = wr + data.len();
        if next >= binding.size {
            next -= binding.size;
        }
        self.wr_off.store(next, Ordering::Release);
        data.len()
    }
}

/// `N` up channels, indexed from zero.
pub struct UpChannels<const N: usize> {
    channels: [UpBuffer; N],
}

impl<const N: usize> UpChannels<N> {
    pub const fn new() -> Self {
        UpChannels {
            channels: [UpBuffer::UNBOUND; N],
        }
    }

    fn channel(&self, index: ChannelIndex) -> Option<&UpBuffer> {
        self.channels.get(index as usize)
    }

    fn binding(&self, index: ChannelIndex) -> Option<(&UpBuffer, &Binding)> {
        let channel = self.channel(index)?;
        Some((channel, channel.binding.get()?))
    }

    /// Name the channel was bound with, if it is bound.
    pub fn name(&self, index: ChannelIndex) -> Option<&'static CStr> {
        self.binding(index).map(|(_, binding)| binding.name)
    }

    pub fn is_locked(&self, index: ChannelIndex) -> bool {
        self.channel(index)
            .is_some_and(|channel| channel.lock.is_locked())
    }

    /// Bytes written but not yet read.
    pub fn pending(&self, index: ChannelIndex) -> usize {
        match self.binding(index) {
            Some((channel, binding)) if binding.size > 0 => {
                binding.size - 1 - channel.free(binding)
            }
            _ => 0,
        }
    }

    /// Host side: moves pending bytes into `out`, oldest first, and returns how many were moved.
    ///
    /// Needs no lock, but there must only be one reader per channel.
    pub fn read(&self, index: ChannelIndex, out: &mut [u8]) -> usize {
        let (channel, binding) = match self.binding(index) {
            Some(bound) => bound,
            None => return 0,
        };

        let wr = channel.wr_off.load(Ordering::Acquire);
        let mut rd = channel.rd_off.load(Ordering::Relaxed);
        let mut copied = 0;
        while copied < out.len() && rd != wr {
            let end = if rd < wr { wr } else { binding.size };
            let n = min(end - rd, out.len() - copied);
            // [rd, wr) is never touched by the writer.
            unsafe {
                ptr::copy_nonoverlapping(binding.ptr.add(rd), out[copied..].as_mut_ptr(), n);
            }
            copied += n;
            rd += n;
            if rd == binding.size {
                rd = 0;
            }
        }
        channel.rd_off.store(rd, Ordering::Release);
        copied
    }
}

impl<const N: usize> Default for UpChannels<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Transport for UpChannels<N> {
    fn configure(&self, config: &ChannelConfig, buffer: &'static mut [u8]) -> Result<(), Error> {
        let channel = self
            .channel(config.index)
            .ok_or(Error::NoSuchChannel {
                index: config.index,
            })?;

        let mut fresh = false;
        channel.binding.call_once(|| {
            fresh = true;
            Binding {
                name: config.name,
                ptr: buffer.as_mut_ptr(),
                size: buffer.len(),
                policy: config.policy,
            }
        });
        if !fresh {
            return Err(Error::AlreadyBound {
                index: config.index,
            });
        }
        Ok(())
    }

    fn lock(&self, channel: ChannelIndex) {
        if let Some(channel) = self.channel(channel) {
            core::mem::forget(channel.lock.lock());
        }
    }

    unsafe fn unlock(&self, channel: ChannelIndex) {
        if let Some(channel) = self.channel(channel) {
            // Pairs with the guard forgotten in `lock`.
            channel.lock.force_unlock();
        }
    }

    unsafe fn write_unlocked(&self, index: ChannelIndex, data: &[u8]) -> usize {
        let (channel, binding) = match self.binding(index) {
            Some(bound) => bound,
            None => return 0,
        };

        match binding.policy {
            OverflowPolicy::Skip => {
                if channel.free(binding) < data.len() {
                    0
                } else {
                    channel.push(binding, data)
                }
            }
            OverflowPolicy::Trim => {
                let n = min(channel.free(binding), data.len());
                channel.push(binding, &data[..n])
            }
            // A ring of one byte or less can never make room.
            OverflowPolicy::Block if binding.size <= 1 => 0,
            OverflowPolicy::Block => {
                let mut written = 0;
                while written < data.len() {
                    let free = channel.free(binding);
                    if free == 0 {
                        core::hint::spin_loop();
                        continue;
                    }
                    let n = min(free, data.len() - written);
                    written += channel.push(binding, &data[written..written + n]);
                }
                written
            }
        }
    }
}
