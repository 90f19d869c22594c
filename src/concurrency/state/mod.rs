//! Monitor-backed state machines: a flag set ([`BitState`]) and a single enum value
//! ([`EnumState`]), both with blocking `wait_for`.

/// Flag-set state machine.
pub mod bit_state;
/// Enum-valued state machine.
pub mod enum_state;
/// Typed flag declarations.
pub mod flags;

pub use bit_state::{BitState, BitStateGuard};
pub use enum_state::{EnumState, EnumStateGuard};
pub use flags::{flag_bit, try_flag_bit, FlagIndexError, Flags, StateFlag, MAX_FLAGS};
