use crate::error::Result;

pub type Address = usize;

/// Elapsed hardware clock cycles. The instruction processor runs at 4 T-cycles
/// per machine cycle; all timing in this crate is expressed in T-cycles.
pub type TCycles = u32;

pub trait Addressable {
    fn read_u8(&mut self, address: Address) -> Result<u8>;

    fn write_u8(&mut self, address: Address, data: u8) -> Result<()>;
}

/// Byte-read access used by the OAM DMA unit to fetch its source block.
///
/// The embedding machine implements this on whatever it uses for general
/// memory reads, so cartridge and work-RAM banking are respected without this
/// crate knowing anything about them.
pub trait DmaByteSource {
    fn read_u8(&mut self, address: Address) -> Result<u8>;
}
