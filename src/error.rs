use core::fmt;

/// errors of both the controller and the device layer
///
/// `E` is the error type of the underlying [`crate::RegisterBus`]
#[derive(Debug, PartialEq, Eq)]
pub enum Error<E> {
    Bus(E),
    InvalidArgument(&'static str),
    /// TX FIFO still holds unsent commands
    TxBusy,
    /// no data within the polling bound
    Timeout,
    /// reply identity does not match the request, the bus is out of sync
    ProtocolMismatch { expected: u32, received: u32 },
    /// some reply frames were not received correctly
    FrameParity { expected: u16, received: u16 },
    /// nonzero bytes past the requested reply size
    Padding,
    Nack { opcode: u8 },
    WakeupRejected,
    WakeupTimeout,
    Selection { expected: u8, received: u8 },
    SizeOverflow(u8),
    SizeMismatch { requested: usize, capacity: usize },
    /// the device answered a command with `!CMD`
    InvalidCommand,
    /// events are still reported after clearing them
    EventsPending,
    /// power state did not change to the requested one
    PowerState { expected: u8, received: u8 },
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "register bus error: {e:?}"),
            Error::InvalidArgument(what) => write!(f, "invalid argument: {what}"),
            Error::TxBusy => write!(f, "TX FIFO has unsent commands"),
            Error::Timeout => write!(f, "timeout waiting for data"),
            Error::ProtocolMismatch { expected, received } => write!(
                f,
                "unexpected response {received:#x} (expected {expected:#x}), leftover RX data?"
            ),
            Error::FrameParity { expected, received } => write!(
                f,
                "some response frames were not received correctly: {received:b} (expected {expected:b})"
            ),
            Error::Padding => write!(f, "nonzero padding in response"),
            Error::Nack { opcode } => write!(f, "command {opcode:#04x} was not acknowledged"),
            Error::WakeupRejected => write!(f, "wakeup command was not acknowledged"),
            Error::WakeupTimeout => write!(f, "device did not wake up"),
            Error::Selection { expected, received } => write!(
                f,
                "failed to confirm selection: expected {expected:#x}, got {received:#x}"
            ),
            Error::SizeOverflow(size) => write!(f, "register size {size} exceeds 64 bytes"),
            Error::SizeMismatch {
                requested,
                capacity,
            } => write!(f, "invalid size: passed {requested}, register is {capacity}"),
            Error::InvalidCommand => write!(f, "invalid command"),
            Error::EventsPending => write!(f, "events still pending after clearing"),
            Error::PowerState { expected, received } => {
                write!(f, "power state is {received}, expected {expected}")
            }
        }
    }
}
