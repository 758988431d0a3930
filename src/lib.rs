//! Codec core for the GoPro Professional RAW (GPR) still-image format: a
//! VC-5 wavelet codec specialized to single-plane Bayer sensor data.
//!
//! The public surface is deliberately small: [`encode`] takes a raw
//! Bayer buffer and a quality preset and returns a finished bitstream;
//! [`decode`] takes a bitstream and a requested output (native RAW or a
//! half-resolution RGB preview) at one of five resolution tiers. Host
//! applications that want finer control — their own allocator, access
//! to individual component planes, streaming encode — can reach past
//! this facade into the modules directly, the same way a library built
//! around a reference SDK exposes both a one-call API and the pieces
//! underneath it.

pub mod alloc;
pub mod array2d;
pub mod bayer;
pub mod bitstream;
pub mod codebook;
pub mod colorconvert;
pub mod consts;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod forward;
pub mod inverse;
pub mod state;
pub mod tagvalue;
pub mod util;
pub mod wavelet;

pub use alloc::{Allocator, SystemAllocator};
pub use bayer::{BayerPattern, PixelFormat};
pub use consts::QualityPreset;
pub use decoder::{decode, decode_to_native_raw, DecodeOutput, Output};
pub use encoder::{encode, BayerImage, CameraGainsRaw, EncodeOutput};
pub use error::{GprError, Result};
pub use wavelet::Resolution;
