/// offsets of the controller registers, relative to its base address
pub mod offset {
    /// [RO] status about the RX and TX FIFOs
    pub const STATUS: u32 = 0x00;
    /// [WO] write 32 bits to the TX FIFO
    pub const CMD: u32 = 0x04;
    /// [RO] consume 32 bits from the RX FIFO
    pub const REPLY: u32 = 0x08;

    // setting a bit here asserts the IRQ line whenever the same bit in the
    // matching flag register (+0x40) is set
    pub const BUS_EVENTS_MASK: u32 = 0x20;
    pub const IRQ_MASK: u32 = 0x40;

    // write 1 to clear
    pub const BUS_EVENTS_FLAG: u32 = 0x60;
    pub const IRQ_FLAG: u32 = 0x80;

    pub const BUS_EVENT_BANKS: u8 = 8;
}

/// command opcodes, the ranged ones carry a size or register in their low bits
pub mod opcode {
    pub const EXT_WRITE: u8 = 0x00;
    pub const RESET: u8 = 0x10;
    pub const SLEEP: u8 = 0x11;
    pub const SHUTDOWN: u8 = 0x12;
    pub const WAKEUP: u8 = 0x13;
    pub const SLAVE_DESC: u8 = 0x1c;
    pub const EXT_READ: u8 = 0x20;
    pub const EXT_WRITEL: u8 = 0x30;
    pub const EXT_READL: u8 = 0x38;
    pub const WRITE: u8 = 0x40;
    pub const READ: u8 = 0x60;
    pub const ZERO_WRITE: u8 = 0x80;
}

/// word written to the TX FIFO to start a command
///
/// layout: EXTRA[31:16], ACTIVE[15], SLAVE_ID[14:8], CMD[7:0]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CommandWord {
    pub extra: u16,
    pub active: bool,
    pub slave: u8,
    pub cmd: u8,
}

impl CommandWord {
    pub fn encode(&self) -> u32 {
        (self.extra as u32) << 16
            | (self.active as u32) << 15
            | (self.slave as u32 & 0x7f) << 8
            | self.cmd as u32
    }

    pub fn decode(word: u32) -> Self {
        Self {
            extra: (word >> 16) as u16,
            active: word & (1 << 15) != 0,
            slave: ((word >> 8) & 0x7f) as u8,
            cmd: (word & 0xff) as u8,
        }
    }
}

/// first word the controller pushes to the RX FIFO after a command
///
/// layout: FRAME_PARITY[31:16], ACK[15], SLAVE_ID[14:8], CMD[7:0]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReplyWord {
    /// one bit per reply frame that was received intact
    pub frame_parity: u16,
    pub ack: bool,
    pub slave: u8,
    pub cmd: u8,
}

impl ReplyWord {
    pub fn encode(&self) -> u32 {
        (self.frame_parity as u32) << 16
            | (self.ack as u32) << 15
            | (self.slave as u32 & 0x7f) << 8
            | self.cmd as u32
    }

    pub fn decode(word: u32) -> Self {
        Self {
            frame_parity: (word >> 16) as u16,
            ack: word & (1 << 15) != 0,
            slave: ((word >> 8) & 0x7f) as u8,
            cmd: (word & 0xff) as u8,
        }
    }

    /// identity bits shared with the command word that produced this reply
    pub fn identity(&self) -> u16 {
        (self.slave as u16) << 8 | self.cmd as u16
    }
}

/// STATUS register
///
/// layout: RX_EMPTY[24], RX_COUNT[23:16], TX_EMPTY[8], TX_COUNT[7:0]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Status {
    pub rx_empty: bool,
    pub rx_count: u8,
    pub tx_empty: bool,
    pub tx_count: u8,
}

impl Status {
    pub fn encode(&self) -> u32 {
        (self.rx_empty as u32) << 24
            | (self.rx_count as u32) << 16
            | (self.tx_empty as u32) << 8
            | self.tx_count as u32
    }

    pub fn decode(word: u32) -> Self {
        Self {
            rx_empty: word & (1 << 24) != 0,
            rx_count: (word >> 16) as u8,
            tx_empty: word & (1 << 8) != 0,
            tx_count: word as u8,
        }
    }
}

/// IRQ_MASK / IRQ_FLAG bits of the peripheral itself
///
/// only a few bits are understood, the rest are reported through the
/// hardware description as generic error interrupts and are kept in `raw`
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Irqs {
    pub raw: u32,
}

impl Irqs {
    /// there's data in the RX FIFO
    pub const RX_DATA: u32 = 1 << 0;
    /// read command failed
    pub const READ_FAIL_1: u32 = 1 << 6;
    /// command was not ACKed
    pub const ACK_FAIL: u32 = 1 << 7;
    /// read command failed
    pub const READ_FAIL_2: u32 = 1 << 11;

    pub const ERRORS: u32 = (1 << 4)
        | (1 << 5)
        | (1 << 8)
        | (1 << 9)
        | (1 << 10)
        | (1 << 12)
        | (1 << 13)
        | (1 << 16)
        | (1 << 17)
        | (1 << 27);

    pub fn encode(&self) -> u32 {
        self.raw
    }

    pub fn decode(word: u32) -> Self {
        Self { raw: word }
    }

    pub fn rx_data(&self) -> bool {
        self.raw & Self::RX_DATA != 0
    }

    pub fn read_failed(&self) -> bool {
        self.raw & (Self::READ_FAIL_1 | Self::READ_FAIL_2) != 0
    }

    pub fn ack_failed(&self) -> bool {
        self.raw & Self::ACK_FAIL != 0
    }

    pub fn errors(&self) -> u32 {
        self.raw & Self::ERRORS
    }
}
