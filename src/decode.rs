//! Decode primitive: an RGBA frame in, a QR payload (or nothing) out.
//!
//! Most frames handed to the decoder are blurry, partial, or contain no code
//! at all, so `None` is the common answer and must stay cheap.

use image::{imageops, GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};

/// Which luminance polarities to try, mirroring the usual QR scanner knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum InversionMode {
    #[default]
    DontInvert,
    OnlyInvert,
    AttemptBoth,
    InvertFirst,
}

impl InversionMode {
    /// Passes in order; `true` means the frame is inverted for that pass.
    fn passes(self) -> &'static [bool] {
        match self {
            InversionMode::DontInvert => &[false],
            InversionMode::OnlyInvert => &[true],
            InversionMode::AttemptBoth => &[false, true],
            InversionMode::InvertFirst => &[true, false],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCode {
    pub text: String,
    pub version: usize,
    pub ecc_level: u16,
}

pub trait FrameDecoder: Send + Sync + 'static {
    fn decode(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        inversion: InversionMode,
    ) -> Option<DecodedCode>;
}

/// QR decoder backed by `rqrr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoder;

impl QrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for QrDecoder {
    fn decode(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        inversion: InversionMode,
    ) -> Option<DecodedCode> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() < expected {
            return None;
        }

        let rgba = RgbaImage::from_raw(width, height, pixels[..expected].to_vec())?;
        let luma = imageops::grayscale(&rgba);

        for &inverted in inversion.passes() {
            let found = if inverted {
                let mut flipped = luma.clone();
                imageops::invert(&mut flipped);
                decode_luma(&flipped)
            } else {
                decode_luma(&luma)
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

fn decode_luma(img: &GrayImage) -> Option<DecodedCode> {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        img.width() as usize,
        img.height() as usize,
        |x, y| img.get_pixel(x as u32, y as u32)[0],
    );

    prepared
        .detect_grids()
        .into_iter()
        .find_map(|grid| match grid.decode() {
            Ok((meta, content)) if !content.is_empty() => Some(DecodedCode {
                text: content,
                version: meta.version.0,
                ecc_level: meta.ecc_level,
            }),
            Ok(_) => None,
            Err(err) => {
                log::trace!("qr grid rejected: {err:?}");
                None
            }
        })
}
