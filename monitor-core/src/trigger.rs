//! Periodic sampling trigger.
//!
//! The compare-match event only requests a conversion. Reading and processing
//! the sample is the acquisition handler's job, so the trigger never sees a
//! result. A converter that is still busy is not detected; the next compare
//! match simply requests another conversion.

/// Starts one analog-to-digital conversion.
pub trait ConversionStarter {
    fn start_conversion(&mut self);
}

impl<F> ConversionStarter for F
where
    F: FnMut(),
{
    fn start_conversion(&mut self) {
        self();
    }
}

/// Compare-match handler that turns timer ticks into conversion requests.
#[derive(Debug)]
pub struct SamplingTrigger<C> {
    starter: C,
    fired: u32,
}

impl<C> SamplingTrigger<C>
where
    C: ConversionStarter,
{
    pub const fn new(starter: C) -> Self {
        Self { starter, fired: 0 }
    }

    /// Handles one compare-match event by requesting exactly one conversion.
    pub fn on_compare_match(&mut self) {
        self.starter.start_conversion();
        self.fired = self.fired.wrapping_add(1);
    }

    /// Number of conversions requested so far (wrapping).
    #[must_use]
    pub fn fired(&self) -> u32 {
        self.fired
    }

    #[must_use]
    pub fn starter(&self) -> &C {
        &self.starter
    }
}
