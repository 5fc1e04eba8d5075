pub mod bus;
pub mod registers;

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use log::{trace, warn};

use crate::{config::SpmiConfig, error::Error, poll::poll_until};
use bus::RegisterBus;
use registers::{offset, opcode, CommandWord, Irqs, ReplyWord, Status};

/// FRAME_PARITY has one bit per reply frame -> at most 16 frames of 4 bytes
pub const MAX_REPLY_LEN: usize = 64;
pub const MAX_SLAVE: u8 = 16;

pub type ReplyData = Vec<u8, MAX_REPLY_LEN>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub ack: bool,
    pub data: ReplyData,
}

/// command/reply engine on top of the controller's FIFO registers
///
/// owns the register bus exclusively, calls must not interleave
pub struct SpmiController<B: RegisterBus, D: DelayNs> {
    bus: B,
    delay: D,
    config: SpmiConfig,
}

impl<B: RegisterBus, D: DelayNs> SpmiController<B, D> {
    pub fn new(bus: B, delay: D) -> Self {
        Self::with_config(bus, delay, SpmiConfig::default())
    }

    pub fn with_config(bus: B, delay: D, config: SpmiConfig) -> Self {
        Self { bus, delay, config }
    }

    pub fn config(&self) -> &SpmiConfig {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// pauses on the controller's delay, for device level retry loops
    pub fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    fn reg_read(&mut self, offset: u32) -> Result<u32, Error<B::Error>> {
        self.bus.read32(offset).map_err(Error::Bus)
    }

    fn reg_write(&mut self, offset: u32, value: u32) -> Result<(), Error<B::Error>> {
        self.bus.write32(offset, value).map_err(Error::Bus)
    }

    pub fn status(&mut self) -> Result<Status, Error<B::Error>> {
        Ok(Status::decode(self.reg_read(offset::STATUS)?))
    }

    /// pops one word from the RX FIFO, waiting for it to arrive
    fn raw_read(&mut self) -> Result<u32, Error<B::Error>> {
        let attempts = self.config.rx_poll_attempts;
        let interval = self.config.rx_poll_interval_us;
        poll_until(attempts, || {
            if !self.status()?.rx_empty {
                return self.reg_read(offset::REPLY).map(Some);
            }
            if interval > 0 {
                self.delay.delay_us(interval);
            }
            Ok(None)
        })?
        .ok_or(Error::Timeout)
    }

    /// throws away whatever a previous, desynchronized exchange left behind
    fn drain_rx(&mut self) -> Result<(), Error<B::Error>> {
        let attempts = self.config.rx_poll_attempts;
        poll_until(attempts, || {
            if self.status()?.rx_empty {
                return Ok(Some(()));
            }
            let stray = self.reg_read(offset::REPLY)?;
            warn!("spmi: leftover RX data: {stray:#010x}");
            Ok(None)
        })?
        .ok_or(Error::Timeout)
    }

    /// sends one command and collects its reply
    ///
    /// `payload` is sent as little-endian words after the command word, the
    /// last one zero-padded. `expected_size` is the number of reply bytes the
    /// command produces, they arrive as `ceil(expected_size / 4)` words.
    pub fn send_command(
        &mut self,
        slave: u8,
        cmd: u8,
        extra: u16,
        payload: &[u8],
        expected_size: usize,
        active: bool,
    ) -> Result<Reply, Error<B::Error>> {
        if slave >= MAX_SLAVE {
            return Err(Error::InvalidArgument("slave id out of range"));
        }
        if expected_size > MAX_REPLY_LEN {
            return Err(Error::InvalidArgument("reply size out of range"));
        }

        // ensure FIFOs are in the correct state
        if !self.status()?.tx_empty {
            return Err(Error::TxBusy);
        }
        self.drain_rx()?;

        let word = CommandWord {
            extra,
            active,
            slave,
            cmd,
        };
        trace!("spmi: > {:#010x} {word:?}", word.encode());
        self.reg_write(offset::CMD, word.encode())?;

        for chunk in payload.chunks(4) {
            let mut buf = [0u8; 4];
            buf[..chunk.len()].copy_from_slice(chunk);
            self.reg_write(offset::CMD, u32::from_le_bytes(buf))?;
        }

        let raw = self.raw_read()?;
        let reply = ReplyWord::decode(raw);
        trace!("spmi: < {raw:#010x} {reply:?}");

        if reply.slave != slave || reply.cmd != cmd {
            return Err(Error::ProtocolMismatch {
                expected: (slave as u32) << 8 | cmd as u32,
                received: reply.identity() as u32,
            });
        }

        let frames = expected_size.div_ceil(4);
        let expected_parity = ((1u32 << frames) - 1) as u16;
        if reply.frame_parity != expected_parity {
            return Err(Error::FrameParity {
                expected: expected_parity,
                received: reply.frame_parity,
            });
        }

        let mut data = ReplyData::new();
        for _ in 0..frames {
            let word = self.raw_read()?;
            data.extend_from_slice(&word.to_le_bytes())
                .map_err(|_| Error::InvalidArgument("reply size out of range"))?;
        }

        if data[expected_size..].iter().any(|&b| b != 0) {
            return Err(Error::Padding);
        }
        data.truncate(expected_size);

        Ok(Reply {
            ack: reply.ack,
            data,
        })
    }

    fn simple_command(&mut self, slave: u8, cmd: u8) -> Result<bool, Error<B::Error>> {
        Ok(self.send_command(slave, cmd, 0, &[], 0, true)?.ack)
    }

    // for these commands, extra is empty

    pub fn reset(&mut self, slave: u8) -> Result<bool, Error<B::Error>> {
        self.simple_command(slave, opcode::RESET)
    }

    pub fn sleep(&mut self, slave: u8) -> Result<bool, Error<B::Error>> {
        self.simple_command(slave, opcode::SLEEP)
    }

    pub fn shutdown(&mut self, slave: u8) -> Result<bool, Error<B::Error>> {
        self.simple_command(slave, opcode::SHUTDOWN)
    }

    pub fn wakeup(&mut self, slave: u8) -> Result<bool, Error<B::Error>> {
        self.simple_command(slave, opcode::WAKEUP)
    }

    pub fn get_descriptor(&mut self, slave: u8) -> Result<[u8; 10], Error<B::Error>> {
        let reply = self.send_command(slave, opcode::SLAVE_DESC, 0, &[], 10, true)?;
        let mut desc = [0u8; 10];
        desc.copy_from_slice(&reply.data);
        Ok(desc)
    }

    // for these commands: extra[7..0] = register address, extra[15..8] = value

    /// register read command
    pub fn read_reg(&mut self, slave: u8, reg: u8) -> Result<u8, Error<B::Error>> {
        if reg >= 32 {
            return Err(Error::InvalidArgument("register out of range"));
        }
        let reply = self.send_command(slave, opcode::READ | reg, reg as u16, &[], 1, true)?;
        Ok(reply.data[0])
    }

    /// register write command
    pub fn write_reg(&mut self, slave: u8, reg: u8, value: u8) -> Result<bool, Error<B::Error>> {
        if reg >= 32 {
            return Err(Error::InvalidArgument("register out of range"));
        }
        let extra = reg as u16 | (value as u16) << 8;
        Ok(self
            .send_command(slave, opcode::WRITE | reg, extra, &[], 0, true)?
            .ack)
    }

    /// register 0 write command
    pub fn write_zero(&mut self, slave: u8, value: u8) -> Result<bool, Error<B::Error>> {
        if value >= 0x80 {
            return Err(Error::InvalidArgument("register 0 value out of range"));
        }
        let extra = (value as u16) << 8;
        Ok(self
            .send_command(slave, opcode::ZERO_WRITE | value, extra, &[], 0, true)?
            .ack)
    }

    // for these commands, extra = register address

    /// extended read command, 1 to 16 bytes
    pub fn read_ext(&mut self, slave: u8, reg: u8, size: usize) -> Result<ReplyData, Error<B::Error>> {
        if !(1..=16).contains(&size) {
            return Err(Error::InvalidArgument("invalid size for extended read"));
        }
        let cmd = opcode::EXT_READ | (size - 1) as u8;
        Ok(self.send_command(slave, cmd, reg as u16, &[], size, true)?.data)
    }

    /// extended write command, 1 to 16 bytes
    pub fn write_ext(&mut self, slave: u8, reg: u8, data: &[u8]) -> Result<bool, Error<B::Error>> {
        if !(1..=16).contains(&data.len()) {
            return Err(Error::InvalidArgument("invalid size for extended write"));
        }
        let cmd = opcode::EXT_WRITE | (data.len() - 1) as u8;
        Ok(self.send_command(slave, cmd, reg as u16, data, 0, true)?.ack)
    }

    /// extended read long command, 1 to 8 bytes
    pub fn read_extl(&mut self, slave: u8, reg: u16, size: usize) -> Result<ReplyData, Error<B::Error>> {
        if !(1..=8).contains(&size) {
            return Err(Error::InvalidArgument("invalid size for extended read long"));
        }
        let cmd = opcode::EXT_READL | (size - 1) as u8;
        Ok(self.send_command(slave, cmd, reg, &[], size, true)?.data)
    }

    /// extended write long command, 1 to 8 bytes
    pub fn write_extl(&mut self, slave: u8, reg: u16, data: &[u8]) -> Result<bool, Error<B::Error>> {
        if !(1..=8).contains(&data.len()) {
            return Err(Error::InvalidArgument("invalid size for extended write long"));
        }
        let cmd = opcode::EXT_WRITEL | (data.len() - 1) as u8;
        Ok(self.send_command(slave, cmd, reg, data, 0, true)?.ack)
    }

    fn read_extl_array<const N: usize>(&mut self, slave: u8, reg: u16) -> Result<[u8; N], Error<B::Error>> {
        let data = self.read_extl(slave, reg, N)?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(&data);
        Ok(buf)
    }

    pub fn read8(&mut self, slave: u8, reg: u16) -> Result<u8, Error<B::Error>> {
        Ok(u8::from_le_bytes(self.read_extl_array(slave, reg)?))
    }

    pub fn read16(&mut self, slave: u8, reg: u16) -> Result<u16, Error<B::Error>> {
        Ok(u16::from_le_bytes(self.read_extl_array(slave, reg)?))
    }

    pub fn read32(&mut self, slave: u8, reg: u16) -> Result<u32, Error<B::Error>> {
        Ok(u32::from_le_bytes(self.read_extl_array(slave, reg)?))
    }

    pub fn read64(&mut self, slave: u8, reg: u16) -> Result<u64, Error<B::Error>> {
        Ok(u64::from_le_bytes(self.read_extl_array(slave, reg)?))
    }

    pub fn write8(&mut self, slave: u8, reg: u16, value: u8) -> Result<bool, Error<B::Error>> {
        self.write_extl(slave, reg, &value.to_le_bytes())
    }

    pub fn write16(&mut self, slave: u8, reg: u16, value: u16) -> Result<bool, Error<B::Error>> {
        self.write_extl(slave, reg, &value.to_le_bytes())
    }

    pub fn write32(&mut self, slave: u8, reg: u16, value: u32) -> Result<bool, Error<B::Error>> {
        self.write_extl(slave, reg, &value.to_le_bytes())
    }

    pub fn write64(&mut self, slave: u8, reg: u16, value: u64) -> Result<bool, Error<B::Error>> {
        self.write_extl(slave, reg, &value.to_le_bytes())
    }

    // peripheral interrupt block

    pub fn irq_flags(&mut self) -> Result<Irqs, Error<B::Error>> {
        Ok(Irqs::decode(self.reg_read(offset::IRQ_FLAG)?))
    }

    /// write 1 to clear
    pub fn clear_irqs(&mut self, irqs: Irqs) -> Result<(), Error<B::Error>> {
        self.reg_write(offset::IRQ_FLAG, irqs.encode())
    }

    pub fn set_irq_mask(&mut self, irqs: Irqs) -> Result<(), Error<B::Error>> {
        self.reg_write(offset::IRQ_MASK, irqs.encode())
    }

    fn bus_event_offset(base: u32, bank: u8) -> Result<u32, Error<B::Error>> {
        if bank >= offset::BUS_EVENT_BANKS {
            return Err(Error::InvalidArgument("bus event bank out of range"));
        }
        Ok(base + 4 * bank as u32)
    }

    /// events raised by other devices on the bus
    pub fn bus_event_flags(&mut self, bank: u8) -> Result<u32, Error<B::Error>> {
        let offset = Self::bus_event_offset(offset::BUS_EVENTS_FLAG, bank)?;
        self.reg_read(offset)
    }

    pub fn clear_bus_event_flags(&mut self, bank: u8, mask: u32) -> Result<(), Error<B::Error>> {
        let offset = Self::bus_event_offset(offset::BUS_EVENTS_FLAG, bank)?;
        self.reg_write(offset, mask)
    }

    pub fn set_bus_event_mask(&mut self, bank: u8, mask: u32) -> Result<(), Error<B::Error>> {
        let offset = Self::bus_event_offset(offset::BUS_EVENTS_MASK, bank)?;
        self.reg_write(offset, mask)
    }
}
