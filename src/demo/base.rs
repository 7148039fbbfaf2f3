//! Lifecycle shared by every demo
//!
//! [`DemoBase`] holds the bookkeeping (started, waiting, status, enabled) and
//! [`Demo`] wraps it around a [`DemoVariant`]. The lifecycle owns the
//! interaction with [`DemoInterrupt`]: it registers the demo slot on start,
//! consumes the latched interrupt exactly once, and clears everything on
//! stop, termination and reset.

use embassy_time::{Duration, Instant};
use lora_phy::mod_params::RadioError;

use super::{DemoContext, DemoResults, DemoStatus, DemoType, DemoVariant, Progress};
use crate::environment::Environment;
use crate::interrupt::DemoInterrupt;
use crate::settings::DemoAllSettings;
use crate::system::{SystemExt, IRQ_ALL, IRQ_NONE};
use crate::DemoRadio;

/// Lifecycle bookkeeping of one demo
#[derive(Clone, Copy, Debug)]
pub struct DemoBase {
    slot: u8,
    started: bool,
    waiting_for_interrupt: bool,
    wait_deadline: Option<Instant>,
    status: DemoStatus,
    enabled: bool,
}

impl DemoBase {
    pub const fn new(slot: u8) -> Self {
        Self {
            slot,
            started: false,
            waiting_for_interrupt: false,
            wait_deadline: None,
            status: DemoStatus::Pending,
            enabled: true,
        }
    }

    pub fn slot(&self) -> u8 {
        self.slot
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_pending(&self) -> bool {
        self.status == DemoStatus::Pending
    }

    pub fn status(&self) -> DemoStatus {
        self.status
    }

    pub fn is_waiting_for_interrupt(&self) -> bool {
        self.waiting_for_interrupt
    }

    fn set_waiting(&mut self, now: Instant, timeout: Option<Duration>) {
        self.waiting_for_interrupt = true;
        self.wait_deadline = timeout.and_then(|timeout| now.checked_add(timeout));
    }

    /// Hold again under the deadline of the interrupted wait
    fn resume_waiting(&mut self) {
        self.waiting_for_interrupt = true;
    }

    fn clear_waiting(&mut self) {
        self.waiting_for_interrupt = false;
        self.wait_deadline = None;
    }

    fn wait_expired(&self, now: Instant) -> bool {
        self.wait_deadline.is_some_and(|deadline| now >= deadline)
    }

    fn terminate(&mut self, irq: &DemoInterrupt) {
        self.status = DemoStatus::Terminated;
        self.started = false;
        self.clear_waiting();
        irq.unregister(self.slot);
    }

    /// Mark a demo bypassed by "start next enabled"
    pub(crate) fn skip(&mut self) {
        if !self.started {
            self.status = DemoStatus::Skipped;
        }
    }
}

/// One demo: lifecycle plus variant
pub struct Demo {
    demo_type: DemoType,
    base: DemoBase,
    variant: DemoVariant,
}

impl Demo {
    /// Demo for `demo_type`, `None` for [`DemoType::None`]
    pub fn new(demo_type: DemoType) -> Option<Self> {
        let slot = demo_type.slot()?;
        let variant = DemoVariant::for_type(demo_type)?;
        Some(Self {
            demo_type,
            base: DemoBase::new(slot),
            variant,
        })
    }

    pub fn demo_type(&self) -> DemoType {
        self.demo_type
    }

    pub fn base(&self) -> &DemoBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut DemoBase {
        &mut self.base
    }

    pub fn is_started(&self) -> bool {
        self.base.is_started()
    }

    pub fn status(&self) -> DemoStatus {
        self.base.status()
    }

    pub fn is_waiting_for_interrupt(&self) -> bool {
        self.base.is_waiting_for_interrupt()
    }

    pub fn apply_settings(&mut self, settings: &DemoAllSettings) {
        self.variant.apply_settings(settings);
    }

    pub fn results(&self) -> DemoResults<'_> {
        self.variant.results()
    }

    pub fn has_intermediate_results(&self) -> bool {
        self.variant.has_intermediate_results()
    }

    pub fn take_intermediate_results(&mut self) -> bool {
        self.variant.take_intermediate_results()
    }

    /// Start the demo; no-op when already started
    pub async fn start<R: DemoRadio, E: Environment>(&mut self, ctx: &mut DemoContext<'_, R, E>) {
        if self.base.started {
            return;
        }

        info!("demo {:?}: start", self.demo_type);
        self.base.started = true;
        self.base.status = DemoStatus::Running;
        self.base.clear_waiting();
        ctx.irq.clear_pending();
        ctx.irq.register(self.base.slot);
        self.variant.reset();
    }

    /// Advance the demo by one step
    pub async fn runtime<R: DemoRadio, E: Environment>(&mut self, ctx: &mut DemoContext<'_, R, E>) -> DemoStatus {
        if !self.base.started {
            return self.base.status;
        }

        if self.base.waiting_for_interrupt {
            if ctx.irq.take_for(self.base.slot) {
                // The deadline stays armed in case the variant keeps waiting
                self.base.waiting_for_interrupt = false;
                if let Err(error) = self.variant.on_interrupt(ctx).await {
                    self.fail(ctx, error).await;
                    return self.base.status;
                }
            } else if self.base.wait_expired(ctx.environment.now()) {
                warn!("demo {:?}: no interrupt before deadline", self.demo_type);
                self.base.clear_waiting();
                if !self.variant.on_wait_timeout() {
                    self.finish(ctx).await;
                    return self.base.status;
                }
            } else {
                return DemoStatus::Running;
            }
        }

        match self.variant.step(ctx).await {
            Ok(Progress::Continue) => {}
            Ok(Progress::WaitForInterrupt(timeout)) => {
                self.base.set_waiting(ctx.environment.now(), timeout);
            }
            Ok(Progress::KeepWaiting) => self.base.resume_waiting(),
            Ok(Progress::Done) => self.finish(ctx).await,
            Err(error) => self.fail(ctx, error).await,
        }

        self.base.status
    }

    /// Stop the demo; no-op when not started
    pub async fn stop<R: DemoRadio, E: Environment>(&mut self, ctx: &mut DemoContext<'_, R, E>) {
        if !self.base.started {
            return;
        }

        info!("demo {:?}: stop", self.demo_type);
        if let Err(error) = self.variant.stop(ctx).await {
            warn!("demo {:?}: standby failed: {:?}", self.demo_type, error);
        }
        Self::clear_registered_irqs(ctx).await;

        self.base.started = false;
        self.base.clear_waiting();
        self.base.status = DemoStatus::Stopped;
        ctx.irq.unregister(self.base.slot);
        ctx.irq.discard(self.base.slot);
    }

    /// Back to `Pending` with the variant in its initial state
    pub fn reset(&mut self, irq: &DemoInterrupt) {
        self.base.started = false;
        self.base.clear_waiting();
        self.base.status = DemoStatus::Pending;
        irq.unregister(self.base.slot);
        irq.discard(self.base.slot);
        self.variant.reset();
    }

    async fn fail<R: DemoRadio, E: Environment>(&mut self, ctx: &mut DemoContext<'_, R, E>, error: RadioError) {
        error!("demo {:?}: radio error {:?}", self.demo_type, error);
        self.variant.on_error(error);
        self.finish(ctx).await;
    }

    async fn finish<R: DemoRadio, E: Environment>(&mut self, ctx: &mut DemoContext<'_, R, E>) {
        Self::clear_registered_irqs(ctx).await;
        self.base.terminate(ctx.irq);
        debug!("demo {:?}: terminated", self.demo_type);
    }

    async fn clear_registered_irqs<R: DemoRadio, E>(ctx: &mut DemoContext<'_, R, E>) {
        let result = match ctx.radio.set_dio_irq_params(IRQ_NONE).await {
            Ok(()) => ctx.radio.clear_irq_status(IRQ_ALL).await,
            Err(error) => Err(error),
        };
        if let Err(error) = result {
            warn!("clearing chip irqs failed: {:?}", error);
        }
    }
}
