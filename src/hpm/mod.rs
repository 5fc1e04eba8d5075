pub mod events;
pub mod registers;

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use log::{debug, warn};

use crate::{
    config::HpmConfig,
    error::Error,
    poll::poll_until,
    spmi::{bus::RegisterBus, registers::opcode, SpmiController},
};
pub use events::EventSet;
use events::EVENT_BYTES;
use registers::*;

pub type RegData = Vec<u8, MAX_REG_LEN>;

/// saved interrupt mask, see [`HpmDevice::disable_irqs`]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IrqState {
    pub int_mask1: [u8; EVENT_LEN],
}

/// USB-C port controller behind an SPMI slave address
///
/// registers are selected through register 0, their contents are then
/// accessed in 16 byte chunks through a read window and a write staging
/// buffer. holds no state of its own besides the slave address.
pub struct HpmDevice<'a, B: RegisterBus, D: DelayNs> {
    pub controller: &'a mut SpmiController<B, D>,
    slave: u8,
    config: HpmConfig,
}

impl<'a, B: RegisterBus, D: DelayNs> HpmDevice<'a, B, D> {
    /// does not touch the bus, see [`HpmDevice::init`]
    pub fn new(controller: &'a mut SpmiController<B, D>, slave: u8) -> Self {
        Self::with_config(controller, slave, HpmConfig::default())
    }

    pub fn with_config(controller: &'a mut SpmiController<B, D>, slave: u8, config: HpmConfig) -> Self {
        Self {
            controller,
            slave,
            config,
        }
    }

    pub fn slave(&self) -> u8 {
        self.slave
    }

    /// wakes the device up, unmasks the default events and clears stale ones
    pub fn init(&mut self) -> Result<(), Error<B::Error>> {
        self.wakeup()?;

        self.write(REG_INT_MASK1, &DEFAULT_EVENT_MASK)?;
        self.write(REG_INT_MASK2, &DEFAULT_EVENT_MASK)?;

        let events = self.read_events()?;
        if !events.is_empty() {
            warn!("hpm {}: events pending at init: {events:?}", self.slave);
        }
        if !self.read_events()?.is_empty() {
            return Err(Error::EventsPending);
        }
        Ok(())
    }

    pub fn wakeup(&mut self) -> Result<(), Error<B::Error>> {
        if !self.controller.wakeup(self.slave)? {
            return Err(Error::WakeupRejected);
        }

        // the device is awake once it latches a selection, we use 3
        let slave = self.slave;
        let interval = self.config.wakeup_interval_us;
        let controller = &mut *self.controller;
        let woke = poll_until(self.config.wakeup_attempts, || {
            if controller.write_zero(slave, REG_MODE)? {
                match controller.read_reg(slave, REG_SELECT) {
                    Ok(REG_MODE) => return Ok(Some(())),
                    Ok(got) => debug!("hpm {slave}: wakeup read {got:#x}"),
                    // a settling chip may drop the reply frame
                    Err(Error::FrameParity { .. }) => debug!("hpm {slave}: wakeup read lost its reply frame"),
                    Err(e) => return Err(e),
                }
            } else {
                debug!("hpm {slave}: wakeup select not acknowledged");
            }
            if interval > 0 {
                controller.delay_us(interval);
            }
            Ok(None)
        })?;

        woke.ok_or(Error::WakeupTimeout)
    }

    /// makes `reg` the target of the read window and commits staged writes
    pub fn select(&mut self, reg: u8) -> Result<(), Error<B::Error>> {
        debug!("hpm {}: select {reg:#x}", self.slave);
        if !self.controller.write_zero(self.slave, reg)? {
            return Err(Error::Nack {
                opcode: opcode::ZERO_WRITE | reg,
            });
        }
        let got = self.controller.read_reg(self.slave, REG_SELECT)?;
        if got != reg {
            return Err(Error::Selection {
                expected: reg,
                received: got,
            });
        }
        Ok(())
    }

    /// selects `reg` and returns its size in bytes
    pub fn get_size(&mut self, reg: u8) -> Result<usize, Error<B::Error>> {
        self.select(reg)?;
        let size = self.controller.read_reg(self.slave, REG_SIZE)?;
        if size as usize > MAX_REG_LEN {
            return Err(Error::SizeOverflow(size));
        }
        if self.config.check_size_table && size != HPM_REG_SIZES[reg as usize] {
            warn!(
                "hpm {}: register {reg:#x} reports {size} bytes, expected {}",
                self.slave, HPM_REG_SIZES[reg as usize]
            );
        }
        Ok(size as usize)
    }

    /// reads `size` bytes of `reg`, or the whole register if `None`
    pub fn read(&mut self, reg: u8, size: Option<usize>) -> Result<RegData, Error<B::Error>> {
        let capacity = self.get_size(reg)?;
        let size = match size {
            Some(requested) if requested > capacity => {
                return Err(Error::SizeMismatch {
                    requested,
                    capacity,
                })
            }
            Some(requested) => requested,
            None => capacity,
        };

        let mut data = RegData::new();
        while data.len() < size {
            let chunk = (size - data.len()).min(CHUNK_LEN);
            let part = self
                .controller
                .read_ext(self.slave, READ_WINDOW + data.len() as u8, chunk)?;
            data.extend_from_slice(&part).map_err(|_| Error::SizeMismatch {
                requested: size,
                capacity: MAX_REG_LEN,
            })?;
        }
        Ok(data)
    }

    /// stages `data` and commits it by reselecting `reg`
    pub fn write(&mut self, reg: u8, data: &[u8]) -> Result<(), Error<B::Error>> {
        let capacity = self.get_size(reg)?;
        if data.len() > capacity {
            return Err(Error::SizeMismatch {
                requested: data.len(),
                capacity,
            });
        }

        let mut written = 0;
        for chunk in data.chunks(CHUNK_LEN) {
            if !self
                .controller
                .write_ext(self.slave, WRITE_WINDOW + written as u8, chunk)?
            {
                return Err(Error::Nack {
                    opcode: opcode::EXT_WRITE | (chunk.len() - 1) as u8,
                });
            }
            written += chunk.len();
        }

        // issue write
        self.select(reg)
    }

    /// runs a 4CC command with `data` as its input and returns `out_size`
    /// bytes of its output
    ///
    /// the command register reads back the command while it is running and
    /// zero once it completed.
    pub fn command(&mut self, cmd: &[u8; 4], data: &[u8], out_size: usize) -> Result<RegData, Error<B::Error>> {
        debug!("hpm {}: command {:?}", self.slave, core::str::from_utf8(cmd));
        self.write(REG_DATA1, data)?;
        self.write(REG_CMD1, cmd)?;
        self.select(REG_CMD1)?;

        let slave = self.slave;
        let controller = &mut *self.controller;
        let done = poll_until(self.config.command_poll_attempts, || {
            let status = controller.read_ext(slave, READ_WINDOW, 4)?;
            if status.iter().all(|&b| b == 0) {
                return Ok(Some(()));
            }
            if status[..] == CMD_INVALID {
                return Err(Error::InvalidCommand);
            }
            if status[..] != cmd[..] {
                let mut received = [0u8; 4];
                received.copy_from_slice(&status);
                return Err(Error::ProtocolMismatch {
                    expected: u32::from_le_bytes(*cmd),
                    received: u32::from_le_bytes(received),
                });
            }
            Ok(None)
        })?;
        if done.is_none() {
            return Err(Error::Timeout);
        }

        debug!("hpm {}: command done", self.slave);
        self.read(REG_DATA1, Some(out_size))
    }

    /// reads and clears both event shadow registers
    pub fn read_events(&mut self) -> Result<EventSet, Error<B::Error>> {
        let mut bits = [0u8; EVENT_BYTES];
        for (i, base) in EVENT_BASES.into_iter().enumerate() {
            let events = self.read(base, Some(EVENT_LEN))?;
            self.write(base + EVENT_CLEAR_OFFSET, &events)?;
            bits[i * EVENT_LEN..(i + 1) * EVENT_LEN].copy_from_slice(&events);
        }
        Ok(EventSet::from_bytes(bits))
    }

    pub fn mode(&mut self) -> Result<RegData, Error<B::Error>> {
        self.read(REG_MODE, None)
    }

    /// version string with trailing zeros removed
    pub fn version(&mut self) -> Result<RegData, Error<B::Error>> {
        let mut version = self.read(REG_VERSION, None)?;
        while version.last() == Some(&0) {
            version.pop();
        }
        Ok(version)
    }

    pub fn power_state(&mut self) -> Result<u8, Error<B::Error>> {
        Ok(self.read(REG_POWER_STATE, Some(1))?[0])
    }

    /// switches the device to power state 0 if it is not there already
    pub fn powerup(&mut self) -> Result<(), Error<B::Error>> {
        if self.power_state()? == 0 {
            return Ok(());
        }

        self.command(b"SSPS", &[0], 0)?;

        let state = self.power_state()?;
        if state != 0 {
            return Err(Error::PowerState {
                expected: 0,
                received: state,
            });
        }
        Ok(())
    }

    /// masks all interrupts and acks pending ones, returning the previous mask
    pub fn disable_irqs(&mut self) -> Result<IrqState, Error<B::Error>> {
        let mut state = IrqState::default();
        state
            .int_mask1
            .copy_from_slice(&self.read(REG_INT_MASK1, Some(EVENT_LEN))?);

        self.write(REG_INT_CLEAR1, &[0xff; EVENT_LEN])?;
        self.write(REG_INT_MASK1, &[0x00; EVENT_LEN])?;
        Ok(state)
    }

    pub fn restore_irqs(&mut self, state: &IrqState) -> Result<(), Error<B::Error>> {
        self.write(REG_INT_MASK1, &state.int_mask1)
    }
}
