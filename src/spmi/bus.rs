/// ordered, lossless 32-bit access to the controller's register window
///
/// offsets are relative to the controller's base address, see
/// [`super::registers::offset`]. reads of the reply register pop one entry
/// from the RX FIFO.
pub trait RegisterBus {
    type Error: core::fmt::Debug;

    fn read32(&mut self, offset: u32) -> Result<u32, Self::Error>;

    fn write32(&mut self, offset: u32, value: u32) -> Result<(), Self::Error>;
}

impl<T: RegisterBus + ?Sized> RegisterBus for &mut T {
    type Error = T::Error;

    fn read32(&mut self, offset: u32) -> Result<u32, Self::Error> {
        (**self).read32(offset)
    }

    fn write32(&mut self, offset: u32, value: u32) -> Result<(), Self::Error> {
        (**self).write32(offset, value)
    }
}
