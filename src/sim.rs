//! controller FIFO with a simulated port controller behind it

use std::collections::{BTreeMap, VecDeque};

use embedded_hal::delay::DelayNs;

use crate::hpm::registers::*;
use crate::spmi::{
    bus::RegisterBus,
    registers::{offset, opcode, CommandWord, ReplyWord, Status},
    SpmiController,
};

pub const SLAVE: u8 = 0x0e;
pub const DESCRIPTOR: [u8; 10] = [0x01, 0x00, 0x5a, 0x2b, 0x00, 0x00, 0x10, 0x20, 0x30, 0x40];

#[derive(Debug, PartialEq, Eq)]
pub struct SimError;

#[derive(Default)]
pub struct CountingDelay {
    pub calls: usize,
    pub total_ns: u64,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.calls += 1;
        self.total_ns += ns as u64;
    }
}

pub struct HpmSim {
    pub regs: Vec<[u8; MAX_REG_LEN]>,
    pub sizes: [u8; NUM_REGS],
    pub selected: u8,
    staged: [u8; MAX_REG_LEN],
    staged_len: usize,
    // zero writes that are acked but not latched after power-up
    pub settle_rounds: u32,
    pub ack_wakeup: bool,
    pub ack_writes: bool,
    // read back from register 0 instead of the selection
    pub stuck_selection: Option<u8>,
    // command register reads that still show the running command
    pub command_busy_reads: u32,
    // shown in the command register instead of the running command
    pub clobber_command: Option<[u8; 4]>,
    // writes to the clear registers leave the events set
    pub sticky_events: bool,
    busy_reads_left: u32,
    running: Option<[u8; 4]>,
    // output written to the data register when a command completes
    pub responses: BTreeMap<[u8; 4], Vec<u8>>,
    pub long: BTreeMap<u16, u8>,
    pub ext_reads: Vec<(u8, usize)>,
    pub ext_writes: Vec<(u8, Vec<u8>)>,
    pub commits: Vec<(u8, Vec<u8>)>,
    pub commands: Vec<[u8; 4]>,
    pub wakeups: usize,
    pub zero_writes: usize,
}

impl HpmSim {
    pub fn new() -> Self {
        Self {
            regs: vec![[0u8; MAX_REG_LEN]; NUM_REGS],
            sizes: HPM_REG_SIZES,
            selected: 0,
            staged: [0; MAX_REG_LEN],
            staged_len: 0,
            settle_rounds: 0,
            ack_wakeup: true,
            ack_writes: true,
            stuck_selection: None,
            command_busy_reads: 0,
            clobber_command: None,
            sticky_events: false,
            busy_reads_left: 0,
            running: None,
            responses: BTreeMap::new(),
            long: BTreeMap::new(),
            ext_reads: Vec::new(),
            ext_writes: Vec::new(),
            commits: Vec::new(),
            commands: Vec::new(),
            wakeups: 0,
            zero_writes: 0,
        }
    }

    pub fn set_reg(&mut self, reg: u8, data: &[u8]) {
        self.regs[reg as usize][..data.len()].copy_from_slice(data);
    }

    pub fn reg(&self, reg: u8) -> &[u8] {
        &self.regs[reg as usize][..self.sizes[reg as usize] as usize]
    }

    fn bus_command(&mut self, cmd: u8) -> bool {
        if cmd == opcode::WAKEUP {
            self.wakeups += 1;
            return self.ack_wakeup;
        }
        true
    }

    fn read_reg(&mut self, reg: u8) -> u8 {
        match reg {
            REG_SELECT => self.stuck_selection.unwrap_or(self.selected),
            REG_SIZE => self.sizes[self.selected as usize],
            _ => 0,
        }
    }

    fn zero_write(&mut self, value: u8) -> bool {
        self.zero_writes += 1;
        if self.settle_rounds > 0 {
            self.settle_rounds -= 1;
            return true;
        }
        if self.staged_len > 0 {
            self.commit(value);
        }
        self.selected = value;
        true
    }

    fn commit(&mut self, reg: u8) {
        let data = self.staged[..self.staged_len].to_vec();
        self.staged_len = 0;
        self.commits.push((reg, data.clone()));

        let clears = EVENT_BASES.map(|base| base + EVENT_CLEAR_OFFSET);
        if let Some(i) = clears.iter().position(|&r| r == reg) {
            if self.sticky_events {
                return;
            }
            let shadow = &mut self.regs[EVENT_BASES[i] as usize];
            for (bit, clear) in shadow.iter_mut().zip(&data) {
                *bit &= !clear;
            }
            return;
        }

        self.set_reg(reg, &data);
        if reg == REG_CMD1 && data.len() >= 4 {
            let mut cmd = [0u8; 4];
            cmd.copy_from_slice(&data[..4]);
            self.start_command(cmd);
        }
    }

    fn start_command(&mut self, cmd: [u8; 4]) {
        self.commands.push(cmd);
        if &cmd != b"SSPS" && !self.responses.contains_key(&cmd) {
            self.set_reg(REG_CMD1, &CMD_INVALID);
            return;
        }
        self.running = Some(cmd);
        if let Some(other) = self.clobber_command {
            self.set_reg(REG_CMD1, &other);
        }
        self.busy_reads_left = self.command_busy_reads;
        if self.busy_reads_left == 0 {
            self.finish_command();
        }
    }

    fn finish_command(&mut self) {
        let Some(cmd) = self.running.take() else {
            return;
        };
        if &cmd == b"SSPS" {
            self.regs[REG_POWER_STATE as usize][0] = self.regs[REG_DATA1 as usize][0];
        }
        if let Some(out) = self.responses.get(&cmd).cloned() {
            self.set_reg(REG_DATA1, &out);
        }
        self.set_reg(REG_CMD1, &[0; 4]);
    }

    fn ext_read(&mut self, reg: u8, size: usize) -> Vec<u8> {
        self.ext_reads.push((reg, size));
        let mut out = vec![0u8; size];
        match reg {
            REG_SELECT => out[0] = self.selected,
            REG_SIZE => out[0] = self.sizes[self.selected as usize],
            r if r >= READ_WINDOW => {
                let start = (r - READ_WINDOW) as usize;
                let contents = &self.regs[self.selected as usize];
                for (i, b) in out.iter_mut().enumerate() {
                    if start + i < MAX_REG_LEN {
                        *b = contents[start + i];
                    }
                }
                if self.selected == REG_CMD1 && start == 0 && self.running.is_some() {
                    self.busy_reads_left = self.busy_reads_left.saturating_sub(1);
                    if self.busy_reads_left == 0 {
                        self.finish_command();
                    }
                }
            }
            _ => {}
        }
        out
    }

    fn ext_write(&mut self, reg: u8, data: &[u8]) -> bool {
        self.ext_writes.push((reg, data.to_vec()));
        if !self.ack_writes || reg < WRITE_WINDOW {
            return false;
        }
        let start = (reg - WRITE_WINDOW) as usize;
        if start + data.len() > MAX_REG_LEN {
            return false;
        }
        self.staged[start..start + data.len()].copy_from_slice(data);
        self.staged_len = self.staged_len.max(start + data.len());
        true
    }

    fn long_read(&mut self, reg: u16, size: usize) -> Vec<u8> {
        (0..size as u16)
            .map(|i| *self.long.get(&reg.wrapping_add(i)).unwrap_or(&0))
            .collect()
    }

    fn long_write(&mut self, reg: u16, data: &[u8]) -> bool {
        for (i, &b) in data.iter().enumerate() {
            self.long.insert(reg.wrapping_add(i as u16), b);
        }
        true
    }
}

fn payload_len(cmd: u8) -> usize {
    match cmd {
        0x00..=0x0f => (cmd & 0x0f) as usize + 1,
        0x30..=0x37 => (cmd & 0x07) as usize + 1,
        _ => 0,
    }
}

pub struct SimBus {
    pub device: HpmSim,
    pub slave: u8,
    pub rx: VecDeque<u32>,
    pending: Option<(CommandWord, Vec<u32>)>,
    pub sent: Vec<CommandWord>,
    pub payload_words: Vec<u32>,
    pub tx_stuck: bool,
    // swallow commands without a reply
    pub mute: bool,
    pub corrupt_identity: bool,
    pub drop_frame: bool,
    // like drop_frame, for the next n replies that carry data
    pub drop_frames: u32,
    pub dirty_padding: bool,
    pub fail_bus: bool,
    pub status_reads: usize,
    pub irq_flag: u32,
    pub irq_mask: u32,
    pub bus_event_flags: [u32; 8],
    pub bus_event_mask: [u32; 8],
}

impl SimBus {
    pub fn new(slave: u8) -> Self {
        Self {
            device: HpmSim::new(),
            slave,
            rx: VecDeque::new(),
            pending: None,
            sent: Vec::new(),
            payload_words: Vec::new(),
            tx_stuck: false,
            mute: false,
            corrupt_identity: false,
            drop_frame: false,
            drop_frames: 0,
            dirty_padding: false,
            fail_bus: false,
            status_reads: 0,
            irq_flag: 0,
            irq_mask: 0,
            bus_event_flags: [0; 8],
            bus_event_mask: [0; 8],
        }
    }

    fn push_cmd_word(&mut self, value: u32) {
        if let Some((cmd, mut words)) = self.pending.take() {
            self.payload_words.push(value);
            words.push(value);
            if words.len() == payload_len(cmd.cmd).div_ceil(4) {
                self.execute(cmd, &words);
            } else {
                self.pending = Some((cmd, words));
            }
            return;
        }

        let cmd = CommandWord::decode(value);
        self.sent.push(cmd);
        if payload_len(cmd.cmd) == 0 {
            self.execute(cmd, &[]);
        } else {
            self.pending = Some((cmd, Vec::new()));
        }
    }

    fn execute(&mut self, cmd: CommandWord, words: &[u32]) {
        if cmd.slave != self.slave || self.mute {
            return;
        }

        let payload: Vec<u8> = words
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .take(payload_len(cmd.cmd))
            .collect();
        let dev = &mut self.device;
        let (ack, data) = match cmd.cmd {
            0x00..=0x0f => (dev.ext_write(cmd.extra as u8, &payload), vec![]),
            opcode::RESET..=opcode::WAKEUP => (dev.bus_command(cmd.cmd), vec![]),
            opcode::SLAVE_DESC => (true, DESCRIPTOR.to_vec()),
            0x20..=0x2f => (true, dev.ext_read(cmd.extra as u8, (cmd.cmd & 0x0f) as usize + 1)),
            0x30..=0x37 => (dev.long_write(cmd.extra, &payload), vec![]),
            0x38..=0x3f => (true, dev.long_read(cmd.extra, (cmd.cmd & 0x07) as usize + 1)),
            0x40..=0x5f => (true, vec![]),
            0x60..=0x7f => (true, vec![dev.read_reg(cmd.cmd & 0x1f)]),
            0x80..=0xff => (dev.zero_write(cmd.cmd & 0x7f), vec![]),
            _ => (false, vec![]),
        };

        let frames = data.len().div_ceil(4);
        let mut frame_parity = ((1u32 << frames) - 1) as u16;
        if self.drop_frame {
            frame_parity >>= 1;
        } else if frames > 0 && self.drop_frames > 0 {
            self.drop_frames -= 1;
            frame_parity >>= 1;
        }
        let mut reply = ReplyWord {
            frame_parity,
            ack,
            slave: cmd.slave,
            cmd: cmd.cmd,
        };
        if self.corrupt_identity {
            reply.cmd ^= 0x01;
        }
        self.rx.push_back(reply.encode());

        for chunk in data.chunks(4) {
            let mut buf = if self.dirty_padding { [0xaa; 4] } else { [0; 4] };
            buf[..chunk.len()].copy_from_slice(chunk);
            self.rx.push_back(u32::from_le_bytes(buf));
        }
    }

    fn bus_event_bank(base: u32, offset: u32) -> Option<usize> {
        (base..base + 0x20)
            .contains(&offset)
            .then(|| ((offset - base) / 4) as usize)
    }
}

impl RegisterBus for SimBus {
    type Error = SimError;

    fn read32(&mut self, addr: u32) -> Result<u32, SimError> {
        if self.fail_bus {
            return Err(SimError);
        }
        match addr {
            offset::STATUS => {
                self.status_reads += 1;
                Ok(Status {
                    rx_empty: self.rx.is_empty(),
                    rx_count: self.rx.len() as u8,
                    tx_empty: !self.tx_stuck,
                    tx_count: self.tx_stuck as u8,
                }
                .encode())
            }
            offset::REPLY => self.rx.pop_front().ok_or(SimError),
            offset::IRQ_FLAG => Ok(self.irq_flag),
            offset::IRQ_MASK => Ok(self.irq_mask),
            a => {
                if let Some(bank) = Self::bus_event_bank(offset::BUS_EVENTS_FLAG, a) {
                    Ok(self.bus_event_flags[bank])
                } else if let Some(bank) = Self::bus_event_bank(offset::BUS_EVENTS_MASK, a) {
                    Ok(self.bus_event_mask[bank])
                } else {
                    Err(SimError)
                }
            }
        }
    }

    fn write32(&mut self, addr: u32, value: u32) -> Result<(), SimError> {
        if self.fail_bus {
            return Err(SimError);
        }
        match addr {
            offset::CMD => self.push_cmd_word(value),
            offset::IRQ_FLAG => self.irq_flag &= !value,
            offset::IRQ_MASK => self.irq_mask = value,
            a => {
                if let Some(bank) = Self::bus_event_bank(offset::BUS_EVENTS_FLAG, a) {
                    self.bus_event_flags[bank] &= !value;
                } else if let Some(bank) = Self::bus_event_bank(offset::BUS_EVENTS_MASK, a) {
                    self.bus_event_mask[bank] = value;
                } else {
                    return Err(SimError);
                }
            }
        }
        Ok(())
    }
}

pub fn controller() -> SpmiController<SimBus, CountingDelay> {
    SpmiController::new(SimBus::new(SLAVE), CountingDelay::default())
}
