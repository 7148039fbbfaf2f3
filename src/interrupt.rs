//! Interrupt plumbing between the ISRs and the supervisor loop
//!
//! The LR1110 DIO1 line and the touchscreen both interrupt the main loop. The
//! ISRs only touch atomics: the actual chip access (reading and clearing the
//! IRQ status) happens later, in thread context, on the next demo `runtime()`.
//!
//! ```text
//! 1. Demo start         → slot registered in `DemoInterrupt::running`
//! 2. DIO1 fires         → `Interrupts::on_demo_irq()`
//!    ├─ wake flag set
//!    └─ running slot copied to `pending`
//! 3. Supervisor runtime → demo polls `take_for(slot)` exactly once
//!    └─ demo reads and clears the chip IRQ status
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! use lr1110_demo::interrupt::Interrupts;
//!
//! static IRQS: Interrupts = Interrupts::new();
//!
//! #[interrupt]
//! fn EXTI0() {
//!     IRQS.on_demo_irq();
//! }
//!
//! #[interrupt]
//! fn EXTI1() {
//!     IRQS.on_gui_irq(touch_pin_is_low());
//! }
//! ```

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Slot value meaning "no demo"
pub const NO_DEMO: u8 = u8::MAX;

/// Edge-triggered flag set from interrupt context and consumed by the loop
pub struct InterruptSignal {
    raised: AtomicBool,
}

impl InterruptSignal {
    pub const fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
        }
    }

    /// Set the flag (ISR side)
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Read and clear the flag
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    pub fn clear(&self) {
        self.raised.store(false, Ordering::Release);
    }
}

impl Default for InterruptSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of the demo currently receiving chip interrupts
///
/// At most one slot is registered at any time. The ISR copies the registered
/// slot into `pending`; the demo owning that slot consumes it once.
pub struct DemoInterrupt {
    /// Slot of the started demo, [`NO_DEMO`] when none
    running: AtomicU8,
    /// Slot that was registered when the IRQ line fired
    pending: AtomicU8,
}

impl DemoInterrupt {
    pub const fn new() -> Self {
        Self {
            running: AtomicU8::new(NO_DEMO),
            pending: AtomicU8::new(NO_DEMO),
        }
    }

    /// Make `slot` the demo receiving interrupts
    pub fn register(&self, slot: u8) {
        self.running.store(slot, Ordering::Release);
    }

    /// Clear the running slot if it is still owned by `slot`
    pub fn unregister(&self, slot: u8) {
        let _ = self
            .running
            .compare_exchange(slot, NO_DEMO, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Clear the running slot whoever owns it, and any pending interrupt
    pub fn invalidate(&self) {
        self.running.store(NO_DEMO, Ordering::Release);
        self.pending.store(NO_DEMO, Ordering::Release);
    }

    /// Slot currently registered
    pub fn running(&self) -> Option<u8> {
        match self.running.load(Ordering::Acquire) {
            NO_DEMO => None,
            slot => Some(slot),
        }
    }

    /// ISR entry point: latch the interrupt for the registered demo.
    ///
    /// An interrupt with no demo registered is dropped.
    pub fn handle_irq(&self) {
        let slot = self.running.load(Ordering::Acquire);
        if slot != NO_DEMO {
            self.pending.store(slot, Ordering::Release);
        }
    }

    /// Consume the pending interrupt if it belongs to `slot`
    pub fn take_for(&self, slot: u8) -> bool {
        self.pending
            .compare_exchange(slot, NO_DEMO, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Drop a pending interrupt belonging to `slot`
    pub fn discard(&self, slot: u8) {
        let _ = self.take_for(slot);
    }

    /// Drop any pending interrupt, whichever slot it belongs to
    pub fn clear_pending(&self) {
        self.pending.store(NO_DEMO, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire) != NO_DEMO
    }
}

impl Default for DemoInterrupt {
    fn default() -> Self {
        Self::new()
    }
}

/// Every interrupt source the supervisor cares about
pub struct Interrupts {
    /// Set by any interrupt, cleared by the GUI step of the supervisor
    pub wake: InterruptSignal,
    pub demo: DemoInterrupt,
    touch_down: AtomicBool,
}

impl Interrupts {
    pub const fn new() -> Self {
        Self {
            wake: InterruptSignal::new(),
            demo: DemoInterrupt::new(),
            touch_down: AtomicBool::new(false),
        }
    }

    /// DIO1 interrupt of the radio
    pub fn on_demo_irq(&self) {
        self.wake.raise();
        self.demo.handle_irq();
    }

    /// Touchscreen interrupt; `is_down` is the touch state at the edge
    pub fn on_gui_irq(&self, is_down: bool) {
        self.touch_down.store(is_down, Ordering::Release);
        self.wake.raise();
    }

    /// Touch state latched by the last touchscreen interrupt
    pub fn is_touch_down(&self) -> bool {
        self.touch_down.load(Ordering::Acquire)
    }
}

impl Default for Interrupts {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_taken_once() {
        let signal = InterruptSignal::new();
        assert!(!signal.take());
        signal.raise();
        assert!(signal.is_raised());
        assert!(signal.take());
        assert!(!signal.take());
    }

    #[test]
    fn test_irq_observed_exactly_once() {
        let irq = DemoInterrupt::new();
        irq.register(2);
        irq.handle_irq();

        assert!(irq.take_for(2));
        assert!(!irq.take_for(2));

        irq.handle_irq();
        assert!(irq.take_for(2));
    }

    #[test]
    fn test_irq_scoped_to_registered_slot() {
        let irq = DemoInterrupt::new();
        irq.register(1);
        irq.handle_irq();

        assert!(!irq.take_for(3));
        assert!(irq.take_for(1));
    }

    #[test]
    fn test_irq_without_demo_is_dropped() {
        let irq = DemoInterrupt::new();
        irq.handle_irq();
        assert!(!irq.is_pending());
        assert_eq!(irq.running(), None);
    }

    #[test]
    fn test_unregister_only_owner() {
        let irq = DemoInterrupt::new();
        irq.register(4);
        irq.unregister(5);
        assert_eq!(irq.running(), Some(4));
        irq.unregister(4);
        assert_eq!(irq.running(), None);
    }

    #[test]
    fn test_invalidate_clears_pending() {
        let irq = DemoInterrupt::new();
        irq.register(0);
        irq.handle_irq();
        irq.invalidate();
        assert_eq!(irq.running(), None);
        assert!(!irq.take_for(0));
    }

    #[test]
    fn test_interrupts_wake_on_both_sources() {
        let irqs = Interrupts::new();
        irqs.on_gui_irq(true);
        assert!(irqs.is_touch_down());
        assert!(irqs.wake.take());

        irqs.demo.register(1);
        irqs.on_demo_irq();
        assert!(irqs.wake.take());
        assert!(irqs.demo.take_for(1));
    }
}
