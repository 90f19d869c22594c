//! Typed flag sets for [`BitState`](super::BitState).
//!
//! A state machine declares its flags once with [`state_flags!`](crate::state_flags),
//! which numbers them in declaration order and refuses to compile past 32 flags. Flags
//! combine with `|` into a [`Flags`] mask.

use core::marker::PhantomData;
use core::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Most flags one state machine can declare.
pub const MAX_FLAGS: u32 = u32::BITS;

/// Returns the mask with only bit `index` set.
///
/// # Panics
///
/// Panics if `index >= 32`. In a `const` item this is a compile error.
pub const fn flag_bit(index: u32) -> u32 {
    assert!(index < MAX_FLAGS, "a state machine has at most 32 flags");
    1 << index
}

/// Fallible twin of [`flag_bit`].
pub fn try_flag_bit(index: u32) -> Result<u32, FlagIndexError> {
    if index < MAX_FLAGS {
        Ok(1 << index)
    } else {
        Err(FlagIndexError { index })
    }
}

/// The error returned by [`try_flag_bit`] for an index past the last bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagIndexError {
    index: u32,
}

impl FlagIndexError {
    /// The rejected index.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl core::fmt::Display for FlagIndexError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "flag index {} out of range (max {})", self.index, MAX_FLAGS - 1)
    }
}

impl std::error::Error for FlagIndexError {}

/// One flag of a state machine. Implement with [`state_flags!`](crate::state_flags).
pub trait StateFlag: Copy + Eq + core::fmt::Debug + 'static {
    /// Every flag, in index order.
    const ALL: &'static [Self];

    /// Bit position, below [`MAX_FLAGS`].
    fn index(self) -> u32;

    /// The single-bit mask of this flag.
    fn bit(self) -> u32 {
        flag_bit(self.index())
    }
}

/// A set of flags of one state machine, stored as a `u32` mask.
pub struct Flags<F> {
    bits: u32,
    _flags: PhantomData<fn() -> F>,
}

impl<F: StateFlag> Flags<F> {
    /// The empty set.
    pub const fn empty() -> Self {
        Self::from_bits(0)
    }

    /// Every declared flag.
    pub fn all() -> Self {
        F::ALL.iter().copied().collect()
    }

    /// Wraps a raw mask. Bits without a declared flag are kept but never yielded by
    /// [`iter`](Self::iter).
    pub const fn from_bits(bits: u32) -> Self {
        Self {
            bits,
            _flags: PhantomData,
        }
    }

    /// The raw mask.
    pub const fn bits(self) -> u32 {
        self.bits
    }

    /// Returns `true` if no bit is set.
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Returns `true` if `flag` is in the set.
    pub fn contains(self, flag: F) -> bool {
        self.bits & flag.bit() != 0
    }

    /// Returns `true` if the two sets share any flag.
    pub const fn intersects(self, other: Self) -> bool {
        self.bits & other.bits != 0
    }

    /// Number of set bits.
    pub const fn len(self) -> u32 {
        self.bits.count_ones()
    }

    /// The declared flags in the set, in index order.
    pub fn iter(self) -> impl Iterator<Item = F> {
        F::ALL.iter().copied().filter(move |flag| self.contains(*flag))
    }
}

impl<F> Clone for Flags<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for Flags<F> {}

impl<F> PartialEq for Flags<F> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<F> Eq for Flags<F> {}

impl<F: StateFlag> Default for Flags<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F: StateFlag> core::fmt::Debug for Flags<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<F: StateFlag> From<F> for Flags<F> {
    fn from(flag: F) -> Self {
        Self::from_bits(flag.bit())
    }
}

impl<F: StateFlag> FromIterator<F> for Flags<F> {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), |flags, flag| flags | flag)
    }
}

impl<F: StateFlag, R: Into<Flags<F>>> BitOr<R> for Flags<F> {
    type Output = Self;

    fn bitor(self, rhs: R) -> Self {
        Self::from_bits(self.bits | rhs.into().bits)
    }
}

impl<F: StateFlag, R: Into<Flags<F>>> BitOrAssign<R> for Flags<F> {
    fn bitor_assign(&mut self, rhs: R) {
        self.bits |= rhs.into().bits;
    }
}

impl<F: StateFlag, R: Into<Flags<F>>> BitAnd<R> for Flags<F> {
    type Output = Self;

    fn bitand(self, rhs: R) -> Self {
        Self::from_bits(self.bits & rhs.into().bits)
    }
}

impl<F: StateFlag> Not for Flags<F> {
    type Output = Self;

    fn not(self) -> Self {
        Self::from_bits(!self.bits)
    }
}

/// Declares the flags of a state machine.
///
/// Generates a fieldless enum implementing [`StateFlag`] with indices assigned in
/// declaration order, plus `|` between flags. Declaring more than 32 flags fails to
/// compile.
///
/// # Example
///
/// ```rust
/// use tether::{state_flags, BitState};
///
/// state_flags! {
///     pub enum Conn { Idle, Busy, Closed }
/// }
///
/// let state = BitState::new(Conn::Idle);
/// state.add(Conn::Busy);
/// assert!(state.has(Conn::Busy | Conn::Closed));
/// assert_eq!(state.states(), 2);
/// ```
#[macro_export]
macro_rules! state_flags {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$flag_meta:meta])* $flag:ident),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        $vis enum $name {
            $($(#[$flag_meta])* $flag),+
        }

        const _: () = assert!(
            [$($name::$flag),+].len() <= $crate::concurrency::state::MAX_FLAGS as usize,
            "a state machine has at most 32 flags"
        );

        impl $crate::concurrency::state::StateFlag for $name {
            const ALL: &'static [Self] = &[$($name::$flag),+];

            fn index(self) -> u32 {
                self as u32
            }
        }

        impl ::core::ops::BitOr for $name {
            type Output = $crate::concurrency::state::Flags<$name>;

            fn bitor(self, rhs: Self) -> Self::Output {
                $crate::concurrency::state::Flags::from(self) | rhs
            }
        }
    };
}
