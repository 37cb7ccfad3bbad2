//! Physical address decoding.
//!
//! This module maps a physical byte address onto DRAM coordinates. It
//! provides:
//! 1. **Field extraction:** column, bank, and row from the low to high bits.
//! 2. **Permutation interleaving:** optional XOR folding of higher address bits into the bank index.
//!
//! Shift amounts and masks are precomputed from the configuration, so every
//! geometry parameter that feeds them must be a power of two.

use crate::config::{Config, DramConfig};

/// L3 set count folded into the XOR permutation shift.
///
/// Kept as a literal rather than derived from the cache configuration so the
/// permutation stays stable across cache resizing experiments.
const XOR_SET_COUNT: u64 = 512;

/// DRAM coordinates of a physical address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedAddr {
    /// Byte offset within the row buffer.
    pub column: u64,
    /// Bank index across the whole controller (after permutation, if enabled).
    pub bank: usize,
    /// Row index within the bank.
    pub row: u64,
    /// Bank-mask-wide bits taken above the L3 tile span, XORed into the bank.
    pub xor_bits: usize,
}

/// Address decoder with precomputed shifts and masks.
pub struct AddressDecoder {
    col_mask: u64,
    bank_shift: u32,
    bank_mask: u64,
    row_shift: u32,
    xor_shift: u32,
    xor_enabled: bool,
}

impl AddressDecoder {
    /// Builds a decoder from the controller configuration.
    ///
    /// # Panics
    ///
    /// Panics when `rowbuffer_size`, `num_banks`, or `l3_line_size` is not a
    /// power of two; the decode arithmetic is mask-based.
    pub fn new(cfg: &Config) -> Self {
        let dram: &DramConfig = &cfg.dram;
        assert!(
            dram.rowbuffer_size.is_power_of_two(),
            "rowbuffer_size must be a power of two, got {}",
            dram.rowbuffer_size
        );
        assert!(
            dram.num_banks.is_power_of_two(),
            "num_banks must be a power of two, got {}",
            dram.num_banks
        );
        assert!(
            cfg.hierarchy.l3_line_size.is_power_of_two(),
            "l3_line_size must be a power of two, got {}",
            cfg.hierarchy.l3_line_size
        );

        let bank_shift = dram.rowbuffer_size.trailing_zeros();
        let bank_bits = (dram.num_banks as u64).trailing_zeros();
        Self {
            col_mask: dram.rowbuffer_size - 1,
            bank_shift,
            bank_mask: dram.num_banks as u64 - 1,
            row_shift: bank_shift + bank_bits,
            xor_shift: cfg.hierarchy.l3_line_size.trailing_zeros()
                + XOR_SET_COUNT.trailing_zeros(),
            xor_enabled: dram.bank_xor_index,
        }
    }

    /// Decodes a physical address into DRAM coordinates.
    pub fn decode(&self, addr: u64) -> DecodedAddr {
        let column = addr & self.col_mask;
        let bank = (addr >> self.bank_shift) & self.bank_mask;
        let row = addr >> self.row_shift;
        let xor_bits = (addr >> self.xor_shift) & self.bank_mask;

        let bank = if self.xor_enabled { bank ^ xor_bits } else { bank };

        DecodedAddr {
            column,
            bank: bank as usize,
            row,
            xor_bits: xor_bits as usize,
        }
    }
}
