//! Smoke-test binary: encode a synthetic Bayer buffer, decode it back
//! both as raw samples and as an RGB preview, and report the basic
//! shape of the round trip. Useful for poking at the codec from the
//! command line without writing a test; `cargo test` is still the real
//! verification path.

use clap::{Parser, ValueEnum};
use log::info;

use gpr_codec::alloc::SystemAllocator;
use gpr_codec::encoder::{encode, BayerImage, CameraGainsRaw};
use gpr_codec::decoder::{decode, DecodeOutput, Output};
use gpr_codec::{PixelFormat, QualityPreset, Resolution};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Quality {
  Low,
  Medium,
  High,
}

impl From<Quality> for QualityPreset {
  fn from(q: Quality) -> Self {
    match q {
      Quality::Low => QualityPreset::Low,
      Quality::Medium => QualityPreset::Medium,
      Quality::High => QualityPreset::High,
    }
  }
}

#[derive(Parser, Debug)]
#[command(about = "Round-trip a synthetic Bayer buffer through the GPR codec core")]
struct Args {
  #[arg(long, default_value_t = 64)]
  width: usize,

  #[arg(long, default_value_t = 64)]
  height: usize,

  #[arg(long, value_enum, default_value_t = Quality::Medium)]
  quality: Quality,
}

fn synthetic_bayer(width: usize, height: usize) -> Vec<u8> {
  let mut data = vec![0u8; width * height * 2];
  for i in 0..width * height {
    let v = ((i * 97) % 4096) as u16;
    data[i * 2] = (v >> 8) as u8;
    data[i * 2 + 1] = (v & 0xFF) as u8;
  }
  data
}

fn main() {
  env_logger::init();

  let args = Args::parse();
  let data = synthetic_bayer(args.width, args.height);
  let image = BayerImage {
    width: args.width,
    height: args.height,
    format: PixelFormat::Rggb12,
    data: &data,
    camera_gains: CameraGainsRaw::default(),
  };

  let alloc = SystemAllocator;
  let encoded = encode(&image, args.quality.into(), &alloc).expect("encode failed");
  info!("encoded {}x{} Bayer image into {} bytes", args.width, args.height, encoded.bytes.len());

  let decoded = decode(&encoded.bytes, Resolution::Full, Output::Raw(PixelFormat::Rggb12)).expect("decode failed");
  if let DecodeOutput::Raw { width, height, bytes, .. } = decoded {
    info!("decoded back to {}x{} raw Bayer ({} bytes)", width, height, bytes.len());
  }

  let preview = decode(&encoded.bytes, Resolution::Quarter, Output::HalfResRgb).expect("preview decode failed");
  if let DecodeOutput::Rgb { width, height, .. } = preview {
    info!("decoded a {}x{} RGB preview at quarter resolution", width, height);
  }
}
