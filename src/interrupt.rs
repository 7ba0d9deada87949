use log::debug;

/// Edge events this controller raises toward the interrupt controller.
pub enum Interrupt {
    VBlank,
    Stat,
}

/// Interrupt-flag sink shared with the embedding machine. The controller only
/// ever sets bits; acknowledging them is the interrupt controller's business.
#[derive(Clone)]
pub struct InterruptRegs {
    pub interrupt_flag: u8,
}

impl InterruptRegs {
    pub fn new() -> Self {
        Self { interrupt_flag: 0 }
    }

    pub fn interrupt(&mut self, interrupt: Interrupt) {
        let bit = match interrupt {
            Interrupt::VBlank => 0,
            Interrupt::Stat => 1,
        };
        debug!("interrupt requested (bit {})", bit);
        self.interrupt_flag |= 1 << bit;
    }
}

impl Default for InterruptRegs {
    fn default() -> Self {
        Self::new()
    }
}
