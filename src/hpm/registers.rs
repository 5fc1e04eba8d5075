/// reading register 0 returns the currently selected register
pub const REG_SELECT: u8 = 0x00;
/// size in bytes of the currently selected register
pub const REG_SIZE: u8 = 0x1f;

pub const REG_MODE: u8 = 0x03;
pub const REG_CMD1: u8 = 0x08;
pub const REG_DATA1: u8 = 0x09;
pub const REG_INT_EVENT1: u8 = 0x14;
pub const REG_INT_EVENT2: u8 = 0x15;
pub const REG_INT_MASK1: u8 = 0x16;
pub const REG_INT_MASK2: u8 = 0x17;
pub const REG_INT_CLEAR1: u8 = 0x18;
pub const REG_POWER_STATE: u8 = 0x20;
pub const REG_VERSION: u8 = 0x2f;

/// event shadows, cleared by writing the same bits to `base + EVENT_CLEAR_OFFSET`
pub const EVENT_BASES: [u8; 2] = [REG_INT_EVENT1, REG_INT_EVENT2];
pub const EVENT_CLEAR_OFFSET: u8 = 4;
pub const EVENT_LEN: usize = 9;

/// extended-read offset of the selected register's contents
pub const READ_WINDOW: u8 = 0x20;
/// extended-write offset of the staging buffer, committed by reselecting
pub const WRITE_WINDOW: u8 = 0xa0;
/// largest transfer of a single extended command
pub const CHUNK_LEN: usize = 16;

pub const MAX_REG_LEN: usize = 64;
pub const NUM_REGS: usize = 128;

/// written to the command register by the device when it does not know a command
pub const CMD_INVALID: [u8; 4] = *b"!CMD";

/// value programmed into both event masks during init
pub const DEFAULT_EVENT_MASK: [u8; 11] = [0xff, 0x07, 0, 0, 0, 0, 0, 0, 0, 0, 0];

/// register sizes as reported by a known-good device, 0 = not available
#[rustfmt::skip]
pub const HPM_REG_SIZES: [u8; NUM_REGS] = [
//  0   1   2   3   4   5   6   7   8   9   a   b   c   d   e   f
    4,  4,  4,  4,  4, 16,  0,  0,  8, 64,  0,  0,  0,  0,  0,  8,
    8, 64,  4,  4, 13, 13, 11, 11, 11, 11,  4, 13, 11, 11,  8, 64,
    1,  6,  6,  4,  9,  0,  4,  8, 64, 64,  8, 36, 48, 52,  0, 64,
   61, 53, 51, 45,  0, 18, 12, 12, 10,  4,  4, 16, 36, 36, 64,  6,

   14, 49, 34, 26, 17, 21, 25, 49, 61, 61, 54, 64, 64, 29, 29, 29,
    6,  7,  7,  0,  0,  0,  7, 64, 37, 11,  1,  0,  0,  5, 22,  4,
   64, 64, 64,  4, 64, 64, 64,  4, 56, 16, 56, 64, 64, 64, 20,  0,
    0, 52, 64, 50, 55,  0,  0,  0, 40, 64, 56, 46, 12, 64, 33, 64,
];
