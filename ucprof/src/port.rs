//! Platform queries the hooks need: a clock, the running task and whether we are in an ISR.

pub trait TimeSource {
    /// Current tick. Must be readable from task and interrupt context. Wraps at `u32::MAX`.
    fn now(&self) -> u32;
}

pub trait ContextSource {
    /// Handle of the running task, stable for the task's lifetime.
    ///
    /// Only called from task context.
    fn current_context_id(&self) -> u32;
}

pub trait InterruptProbe {
    /// Whether an interrupt handler is executing. Called on every hook invocation, so keep it cheap.
    fn in_interrupt(&self) -> bool;
}

/// Everything a [`Tracer`](crate::Tracer) asks of the platform.
pub trait Platform: TimeSource + ContextSource + InterruptProbe {}

impl<P: TimeSource + ContextSource + InterruptProbe + ?Sized> Platform for P {}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> u32 {
        (**self).now()
    }
}

impl<T: ContextSource + ?Sized> ContextSource for &T {
    fn current_context_id(&self) -> u32 {
        (**self).current_context_id()
    }
}

impl<T: InterruptProbe + ?Sized> InterruptProbe for &T {
    fn in_interrupt(&self) -> bool {
        (**self).in_interrupt()
    }
}
