//! A second, much simpler [`AssetLoader`] alongside the shader builder: reads encoded image
//! bytes through the owning pak and hands them to an external decoder.
//!
//! Grounded on wmoge's `AssetLoaderTexture2d`: import options carry the source path and
//! resize/format knobs, decode is a single pure-function call, and the loader itself does
//! nothing but wire bytes to options to asset.

use crate::asset::{Asset, AssetData, TextureAsset};
use crate::asset_id::AssetId;
use crate::error::Status;
use crate::loader::AssetLoader;
use crate::pak::AssetMeta;
use serde::Deserialize;
use std::sync::Arc;

/// Target dimensions and format knobs for a decode. Everything the external decoder needs
/// beyond the raw bytes.
#[derive(Deserialize, Clone)]
pub struct TextureImportOptions {
    pub source_file: String,
    #[serde(default)]
    pub target_width: Option<u32>,
    #[serde(default)]
    pub target_height: Option<u32>,
}

/// Decoded, resized pixel data, already in the format the texture asset stores.
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// External collaborator: image decoding and resizing is a pure function out of scope here.
pub trait ImageDecoder: Send + Sync {
    fn decode_and_resize(
        &self,
        bytes: &[u8],
        options: &TextureImportOptions,
    ) -> Result<DecodedImage, Status>;
}

/// Canonical texture loader: resolves `params.source_file` through the owning pak's byte
/// stream, then decodes and resizes it.
pub struct TextureLoader {
    decoder: Arc<dyn ImageDecoder>,
}

impl TextureLoader {
    pub fn new(decoder: Arc<dyn ImageDecoder>) -> Self {
        Self { decoder }
    }
}

impl AssetLoader for TextureLoader {
    fn name(&self) -> &str {
        "texture"
    }

    fn load(&self, id: &AssetId, meta: &AssetMeta) -> Result<Asset, Status> {
        let options: TextureImportOptions =
            serde_yaml::from_value(meta.import_options.clone()).map_err(|_| Status::InvalidData)?;

        let bytes = meta.pak.read_bytes(&options.source_file)?;
        let image = self.decoder.decode_and_resize(&bytes, &options)?;

        Ok(Asset::new(
            id.clone(),
            meta.cls.clone(),
            AssetData::Texture(TextureAsset {
                width: image.width,
                height: image.height,
                pixels: Arc::from(image.pixels.into_boxed_slice()),
            }),
        ))
    }
}
