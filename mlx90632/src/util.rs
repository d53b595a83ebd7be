// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

/// Check if the bit at `index` is set in `value`.
pub(crate) fn is_bit_set<B>(value: B, index: usize) -> bool
where
    B: num_traits::PrimInt + num_traits::Unsigned,
{
    (value & (B::one() << index)) > B::zero()
}

/// Extract the field covered by `mask` from `value`, shifted down so the field starts at bit 0.
pub(crate) fn get_field(value: u16, mask: u16, shift: u16) -> u16 {
    (value & mask) >> shift
}

/// Replace the field covered by `mask` in `value` with `field`.
///
/// Bits of `field` that don't fit within `mask` once shifted are dropped, and every bit outside of
/// `mask` is preserved.
pub(crate) fn set_field(value: u16, mask: u16, shift: u16, field: u16) -> u16 {
    (value & !mask) | ((field << shift) & mask)
}

/// Combine two words read from the EEPROM into a 32-bit signed value.
///
/// The sensor stores 32-bit constants with the least significant word at the lower address.
pub(crate) fn i32_from_words(lsw: u16, msw: u16) -> i32 {
    ((u32::from(msw) << 16) | u32::from(lsw)) as i32
}
