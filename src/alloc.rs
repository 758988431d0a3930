//! Allocator injection contract.
//!
//! The reference VC-5 SDK takes an `(alloc, free)` function pair so that
//! host applications can route codec memory through their own allocator.
//! We model the same contract as a trait: every object that owns buffers
//! is handed a `&dyn Allocator` at construction time rather than reaching
//! for a global allocator.

use crate::error::GprError;

/// A host-supplied allocator. `alloc` must return a zero-filled buffer of
/// exactly `len` bytes or a `GprError::Memory` failure; there is no
/// separate `free` method because buffers are returned as `Box<[u8]>` /
/// `Vec<u8>` and freed by `Drop` in the usual Rust way — the allocator's
/// job is purely to gate and report allocation failure the way the
/// reference SDK's `free` counterpart is gated by `alloc` succeeding.
pub trait Allocator {
  fn alloc_bytes(&self, len: usize) -> Result<Vec<u8>, GprError>;
}

/// Default allocator backed by the global Rust allocator. Never fails
/// except via the same abort-on-OOM behavior as any other Rust program.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
  fn alloc_bytes(&self, len: usize) -> Result<Vec<u8>, GprError> {
    Ok(vec![0u8; len])
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct FailingAllocator;
  impl Allocator for FailingAllocator {
    fn alloc_bytes(&self, len: usize) -> Result<Vec<u8>, GprError> {
      Err(GprError::Memory(len))
    }
  }

  #[test]
  fn system_allocator_zeroes_memory() {
    let a = SystemAllocator;
    let buf = a.alloc_bytes(16).unwrap();
    assert_eq!(buf.len(), 16);
    assert!(buf.iter().all(|&b| b == 0));
  }

  #[test]
  fn failing_allocator_reports_memory_error() {
    let a = FailingAllocator;
    assert_eq!(a.alloc_bytes(32), Err(GprError::Memory(32)));
  }
}
