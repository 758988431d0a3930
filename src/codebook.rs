//! Codebook 17: the variable-length coding table used for every highpass
//! subband. Entries cover a zero run length, a coefficient magnitude, or
//! the band-end marker; codewords are canonical (sorted by length, then
//! assigned consecutively), which is what lets the decoder try one
//! length at a time against the raw bits instead of walking a tree.
//!
//! A `Codebook` is built once per encoder/decoder instance from the
//! static length table in `consts`, not shared as a global — see the
//! allocator injection note in `alloc.rs` for why this crate avoids
//! process-wide statics for anything that isn't pure data.

use std::collections::HashMap;

use crate::bitstream::{BitReader, BitWriter};
use crate::consts::{self, RawCodebookLength, BAND_END_VALUE, ESCAPE_VALUE, MAGNITUDE_COMPANDING_DOMAIN, MAX_CODEBOOK_MAGNITUDE};
use crate::error::{GprError, Result};

/// Number of raw bits used to escape a magnitude past the companding
/// curve's domain. 16 bits comfortably covers the full `i16` coefficient
/// range the wavelet/quantize stage can produce.
const ESCAPE_BITS: u32 = 16;

/// Cubic companding curve over coefficient magnitudes, distinct from
/// `bayer::CompandingCurve` (which compands Bayer sample values, not
/// wavelet coefficients): maps the 10-bit magnitude domain down onto the
/// codebook's `1..=MAX_CODEBOOK_MAGNITUDE` codeword range so that large,
/// rare magnitudes don't each need their own codeword.
struct MagnitudeCompanding {
  forward: [u8; MAGNITUDE_COMPANDING_DOMAIN as usize],
  reverse: [u32; MAX_CODEBOOK_MAGNITUDE as usize + 1],
}

impl MagnitudeCompanding {
  fn new() -> Self {
    let domain = MAGNITUDE_COMPANDING_DOMAIN as usize;
    let mut forward = [0u8; MAGNITUDE_COMPANDING_DOMAIN as usize];
    for (x, slot) in forward.iter_mut().enumerate() {
      let frac = x as f64 / (domain - 1) as f64;
      let y = frac.cbrt() * (MAX_CODEBOOK_MAGNITUDE - 1) as f64;
      *slot = (y.round() as i32 + 1).clamp(1, MAX_CODEBOOK_MAGNITUDE) as u8;
    }

    // Each companded index covers a contiguous bucket of raw magnitudes
    // (the curve is monotonic non-decreasing); decompand to the midpoint
    // of that bucket rather than either endpoint.
    let mut lo = [u32::MAX; MAX_CODEBOOK_MAGNITUDE as usize + 1];
    let mut hi = [0u32; MAX_CODEBOOK_MAGNITUDE as usize + 1];
    for (x, &idx) in forward.iter().enumerate() {
      let idx = idx as usize;
      lo[idx] = lo[idx].min(x as u32);
      hi[idx] = hi[idx].max(x as u32);
    }
    let mut reverse = [0u32; MAX_CODEBOOK_MAGNITUDE as usize + 1];
    let mut last_known = 0u32;
    for idx in 1..=MAX_CODEBOOK_MAGNITUDE as usize {
      if lo[idx] <= hi[idx] {
        last_known = (lo[idx] + hi[idx]) / 2;
      }
      reverse[idx] = last_known;
    }

    Self { forward, reverse }
  }

  /// Compand a raw magnitude already known to be inside the curve's
  /// domain into a codebook index `1..=MAX_CODEBOOK_MAGNITUDE`.
  fn compand(&self, magnitude: u32) -> u32 {
    self.forward[magnitude as usize] as u32
  }

  /// Recover the representative raw magnitude for a companded index.
  fn decompand(&self, index: u32) -> u32 {
    let idx = (index as usize).clamp(1, MAX_CODEBOOK_MAGNITUDE as usize);
    self.reverse[idx]
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
  Run(u32),
  Magnitude(u32),
  BandEnd,
}

#[derive(Debug, Clone, Copy)]
struct CodeEntry {
  size: u8,
  code: u32,
}

pub struct Codebook {
  magnitude_codes: Vec<CodeEntry>,     // index m-1 -> code for magnitude m (1..=MAX_CODEBOOK_MAGNITUDE)
  run_codes: Vec<(u32, CodeEntry)>,    // (run length, code), descending by run length
  band_end_code: CodeEntry,
  escape_code: CodeEntry,
  magnitude_companding: MagnitudeCompanding,
  decode_table: HashMap<(u8, u32), Symbol>,
  max_code_size: u8,
}

impl Codebook {
  pub fn new() -> Self {
    let mut lengths = consts::codebook17_lengths();
    // Stable sort: ties keep the declaration order (magnitudes, then
    // runs, then the marker), which is what makes code assignment
    // reproducible between encoder and decoder builds.
    lengths.sort_by_key(|e| e.size);

    let mut code: u32 = 0;
    let mut prev_size: u8 = 0;
    let mut assigned: Vec<(RawCodebookLength, CodeEntry)> = Vec::with_capacity(lengths.len());

    for entry in &lengths {
      if entry.size != prev_size {
        code <<= (entry.size - prev_size) as u32;
        prev_size = entry.size;
      }
      assigned.push((*entry, CodeEntry { size: entry.size, code }));
      code += 1;
    }

    let mut magnitude_codes = vec![CodeEntry { size: 0, code: 0 }; MAX_CODEBOOK_MAGNITUDE as usize];
    let mut run_codes = Vec::new();
    let mut band_end_code = CodeEntry { size: 0, code: 0 };
    let mut escape_code = CodeEntry { size: 0, code: 0 };
    let mut decode_table = HashMap::with_capacity(assigned.len());
    let mut max_code_size = 0u8;

    for (raw, code_entry) in &assigned {
      max_code_size = max_code_size.max(code_entry.size);
      if raw.value == BAND_END_VALUE {
        band_end_code = *code_entry;
        decode_table.insert((code_entry.size, code_entry.code), Symbol::BandEnd);
      } else if raw.value == ESCAPE_VALUE {
        // Not inserted into decode_table: decode_symbol checks for this
        // exact (size, code) pair before falling back to table lookup,
        // since it isn't itself a magnitude, run, or band-end symbol.
        escape_code = *code_entry;
      } else if raw.value > 0 {
        magnitude_codes[(raw.value - 1) as usize] = *code_entry;
        decode_table.insert((code_entry.size, code_entry.code), Symbol::Magnitude(raw.value as u32));
      } else {
        run_codes.push((raw.count as u32, *code_entry));
        decode_table.insert((code_entry.size, code_entry.code), Symbol::Run(raw.count as u32));
      }
    }

    run_codes.sort_by(|a, b| b.0.cmp(&a.0));

    Self {
      magnitude_codes,
      run_codes,
      band_end_code,
      escape_code,
      magnitude_companding: MagnitudeCompanding::new(),
      decode_table,
      max_code_size,
    }
  }

  fn magnitude_entry(&self, magnitude: u32) -> CodeEntry {
    debug_assert!(magnitude >= 1 && magnitude <= MAX_CODEBOOK_MAGNITUDE as u32);
    self.magnitude_codes[(magnitude - 1) as usize]
  }

  /// Encode a nonzero coefficient magnitude (sign is written separately
  /// by the caller). Magnitudes inside the companding curve's domain are
  /// run through it and written as one of the codebook's direct
  /// codewords; magnitudes past the domain are escaped uncompanded as
  /// `ESCAPE_BITS` raw bits after the escape codeword.
  pub fn encode_magnitude(&self, writer: &mut BitWriter, magnitude: u32) {
    if magnitude < MAGNITUDE_COMPANDING_DOMAIN {
      let companded = self.magnitude_companding.compand(magnitude);
      let entry = self.magnitude_entry(companded);
      writer.put_bits(entry.code, entry.size as u32);
    } else {
      writer.put_bits(self.escape_code.code, self.escape_code.size as u32);
      writer.put_bits(magnitude, ESCAPE_BITS);
    }
  }

  /// Encode a zero run of the given length by greedily covering it with
  /// the largest available run codewords, largest first.
  pub fn encode_run(&self, writer: &mut BitWriter, run_length: u32) {
    let mut remaining = run_length as usize;
    while remaining > 0 {
      let (len, entry) = self
        .run_codes
        .iter()
        .find(|(len, _)| (*len as usize) <= remaining)
        .expect("run_codes always has a length-1 entry");
      writer.put_bits(entry.code, entry.size as u32);
      remaining -= *len as usize;
    }
  }

  pub fn encode_band_end(&self, writer: &mut BitWriter) {
    writer.put_bits(self.band_end_code.code, self.band_end_code.size as u32);
  }

  /// Decode the next symbol, trying one codeword length at a time
  /// against the raw bits. Valid because the canonical assignment keeps
  /// the whole table prefix-free: at most one length can match.
  pub fn decode_symbol(&self, reader: &mut BitReader) -> Result<Symbol> {
    for len in 1..=self.max_code_size {
      let bits = reader.peek_bits(len as u32);
      if len == self.escape_code.size && bits == self.escape_code.code {
        reader.skip_bits(len as u32);
        let exact = reader.get_bits(ESCAPE_BITS);
        return Ok(Symbol::Magnitude(exact));
      }
      if let Some(&symbol) = self.decode_table.get(&(len, bits)) {
        reader.skip_bits(len as u32);
        if let Symbol::Magnitude(companded) = symbol {
          return Ok(Symbol::Magnitude(self.magnitude_companding.decompand(companded)));
        }
        return Ok(symbol);
      }
    }
    Err(GprError::NotFoundInCodebook)
  }
}

impl Default for Codebook {
  fn default() -> Self {
    Self::new()
  }
}
