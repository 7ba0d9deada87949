use log::trace;

use crate::component::{Address, DmaByteSource};
use crate::error::Result;

use super::OAM_SIZE;

/// OAM DMA transfer registers. Writing the source register copies 160 bytes
/// from `source * 0x100` into OAM through the bus collaborator, overwriting
/// all 40 sprite descriptors.
///
/// The copy is instantaneous; real hardware streams it over ~160 machine
/// cycles while stalling most bus access. The cursors are kept as state so a
/// staged transfer could replace the loop without changing the register
/// surface.
pub struct DmaUnit {
    /// Last value written to the source register; reads back at 0xff46.
    pub source: u8,
    src_cursor: u16,
    dest_cursor: u16,
}

impl DmaUnit {
    pub fn new() -> Self {
        Self {
            source: 0,
            src_cursor: 0,
            dest_cursor: 0,
        }
    }

    pub fn transfer(
        &mut self,
        source: u8,
        bus: &mut dyn DmaByteSource,
        oam: &mut [u8],
    ) -> Result<()> {
        trace!("oam dma from {:#06x}", u16::from(source) << 8);
        self.source = source;
        self.src_cursor = u16::from(source) << 8;
        self.dest_cursor = 0;

        while usize::from(self.dest_cursor) < OAM_SIZE {
            let byte = bus.read_u8(Address::from(self.src_cursor))?;
            oam[usize::from(self.dest_cursor)] = byte;
            self.src_cursor += 1;
            self.dest_cursor += 1;
        }

        Ok(())
    }
}

impl Default for DmaUnit {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bus stub whose byte at any address is the low byte of the address.
    struct PatternBus;

    impl DmaByteSource for PatternBus {
        fn read_u8(&mut self, address: Address) -> Result<u8> {
            Ok((address & 0xff) as u8)
        }
    }

    #[test]
    fn transfer_copies_full_oam_table() {
        let mut dma = DmaUnit::new();
        let mut oam = [0u8; OAM_SIZE];
        dma.transfer(0x80, &mut PatternBus, &mut oam).unwrap();

        for (offset, byte) in oam.iter().enumerate() {
            assert_eq!(usize::from(*byte), offset);
        }
        // the 40th descriptor's attribute byte is the last source byte
        assert_eq!(oam[159], 0x9f);
        assert_eq!(dma.source, 0x80);
    }
}
