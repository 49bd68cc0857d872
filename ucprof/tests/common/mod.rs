#![allow(dead_code)]

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use ucprof::rtt::UpChannels;
use ucprof::{ChannelIndex, ContextSource, InterruptProbe, TimeSource};

thread_local! {
    static CONTEXT: Cell<u32> = Cell::new(0);
}

/// Sets the context id reported for the calling thread.
pub fn set_context(id: u32) {
    CONTEXT.with(|context| context.set(id));
}

/// Clock, scheduler and ISR probe for host tests.
///
/// Each thread is its own context. The clock advances by `step` on every read.
pub struct TestPlatform {
    tick: AtomicU32,
    step: u32,
    in_isr: AtomicBool,
}

impl TestPlatform {
    pub fn fixed(tick: u32) -> Self {
        Self::stepping(tick, 0)
    }

    pub fn stepping(start: u32, step: u32) -> Self {
        TestPlatform {
            tick: AtomicU32::new(start),
            step,
            in_isr: AtomicBool::new(false),
        }
    }

    pub fn set_tick(&self, tick: u32) {
        self.tick.store(tick, Ordering::SeqCst);
    }

    pub fn set_in_interrupt(&self, in_isr: bool) {
        self.in_isr.store(in_isr, Ordering::SeqCst);
    }
}

impl TimeSource for TestPlatform {
    fn now(&self) -> u32 {
        self.tick.fetch_add(self.step, Ordering::SeqCst)
    }
}

impl ContextSource for TestPlatform {
    fn current_context_id(&self) -> u32 {
        CONTEXT.with(|context| context.get())
    }
}

impl InterruptProbe for TestPlatform {
    fn in_interrupt(&self) -> bool {
        self.in_isr.load(Ordering::SeqCst)
    }
}

pub fn leak(size: usize) -> &'static mut [u8] {
    vec![0u8; size].leak()
}

/// Reads everything pending on `index`, the way a debug probe would.
pub fn drain<const N: usize>(channels: &UpChannels<N>, index: ChannelIndex) -> Vec<u8> {
    let mut out = Vec::new();
    let mut chunk = [0u8; 64];
    loop {
        let n = channels.read(index, &mut chunk);
        if n == 0 {
            return out;
        }
        out.extend_from_slice(&chunk[..n]);
    }
}
