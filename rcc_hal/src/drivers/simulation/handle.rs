//! Shared handle for driving the simulated panel and injecting faults.

use parking_lot::Mutex;
use rcc_common::ride::input::InputFlags;
use rcc_common::ride::motor::ControllerStatus;
use std::sync::Arc;

/// Externally controlled simulation inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimInjection {
    /// Physical panel levels.
    pub panel: InputFlags,
    /// Added to the modelled motor current [A].
    pub extra_current: f64,
    /// Replaces the modelled supply voltage [V].
    pub voltage_override: Option<f64>,
    /// OR-ed into the controller status word.
    pub controller_bits: ControllerStatus,
    /// Encoder reports loss of signal.
    pub encoder_lost: bool,
    /// `sample()` returns `HalError::Timeout`.
    pub sample_timeout: bool,
    /// `write()` returns `HalError::CommunicationError`.
    pub write_failure: bool,
    /// `sample()` panics once, then the flag resets.
    pub panic_on_sample: bool,
    /// Drive is mechanically blocked.
    pub stalled: bool,
}

/// Cloneable handle to a [`SimulationDriver`](super::SimulationDriver)'s injections.
#[derive(Debug, Clone, Default)]
pub struct SimHandle {
    inner: Arc<Mutex<SimInjection>>,
}

impl SimHandle {
    /// Fresh handle with nothing injected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert panel inputs.
    pub fn press(&self, inputs: InputFlags) {
        self.inner.lock().panel.insert(inputs);
    }

    /// Deassert panel inputs.
    pub fn release(&self, inputs: InputFlags) {
        self.inner.lock().panel.remove(inputs);
    }

    /// Mutate injections under the lock.
    pub fn update<F: FnOnce(&mut SimInjection)>(&self, f: F) {
        f(&mut self.inner.lock());
    }

    /// Remove every fault injection, keep panel levels.
    pub fn clear_faults(&self) {
        let mut inj = self.inner.lock();
        let panel = inj.panel;
        *inj = SimInjection {
            panel,
            ..SimInjection::default()
        };
    }

    /// Copy of the current injections.
    pub fn get(&self) -> SimInjection {
        self.inner.lock().clone()
    }

    /// Take and reset the one-shot panic flag.
    pub(crate) fn take_panic(&self) -> bool {
        std::mem::take(&mut self.inner.lock().panic_on_sample)
    }
}
