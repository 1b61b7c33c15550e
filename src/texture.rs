//! Image loading and GPU textures.
//!
//! [`TextureImage`] is a decoded RGB8 image in CPU memory. Uploading it through
//! [`Backend::upload_texture`](crate::backend::Backend::upload_texture) with a
//! set of [`TextureOptions`] yields a [`TextureId`](crate::backend::TextureId)
//! an entity can reference.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Sampler filter for minification or magnification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Filtering {
    #[default]
    Linear,
    Nearest,
}

/// Addressing mode outside the `[0, 1]` texture coordinate range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Wrapping {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    /// Falls back to [`Wrapping::ClampToEdge`] on adapters without border support.
    ClampToBorder,
}

/// Sampling options chosen when a texture is uploaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureOptions {
    pub min_filter: Filtering,
    pub mag_filter: Filtering,
    pub wrap_s: Wrapping,
    pub wrap_t: Wrapping,
}

impl TextureOptions {
    pub fn filtering(mut self, min: Filtering, mag: Filtering) -> Self {
        self.min_filter = min;
        self.mag_filter = mag;
        self
    }

    pub fn wrapping(mut self, s: Wrapping, t: Wrapping) -> Self {
        self.wrap_s = s;
        self.wrap_t = t;
        self
    }
}

impl Filtering {
    pub(crate) fn to_wgpu(self) -> wgpu::FilterMode {
        match self {
            Filtering::Linear => wgpu::FilterMode::Linear,
            Filtering::Nearest => wgpu::FilterMode::Nearest,
        }
    }
}

impl Wrapping {
    pub(crate) fn to_wgpu(self, border_supported: bool) -> wgpu::AddressMode {
        match self {
            Wrapping::Repeat => wgpu::AddressMode::Repeat,
            Wrapping::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
            Wrapping::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            Wrapping::ClampToBorder if border_supported => wgpu::AddressMode::ClampToBorder,
            Wrapping::ClampToBorder => {
                log::warn!("adapter lacks clamp-to-border sampling, clamping to edge");
                wgpu::AddressMode::ClampToEdge
            }
        }
    }
}

/// A decoded RGB8 image.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureImage {
    label: String,
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

impl TextureImage {
    /// Decodes an image file into RGB8.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|source| Error::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        let (width, height) = image.dimensions();
        log::debug!("decoded {} ({width}x{height})", path.display());
        Ok(Self {
            label: path.display().to_string(),
            width,
            height,
            rgb: image.into_raw(),
        })
    }

    /// Wraps raw RGB8 pixels, rows top to bottom.
    pub fn from_rgb(label: &str, width: u32, height: u32, rgb: Vec<u8>) -> Result<Self> {
        if rgb.len() != width as usize * height as usize * 3 || width == 0 || height == 0 {
            return Err(Error::Image {
                path: PathBuf::from(label),
                source: image::ImageError::Parameter(image::error::ParameterError::from_kind(
                    image::error::ParameterErrorKind::DimensionMismatch,
                )),
            });
        }
        Ok(Self {
            label: label.to_owned(),
            width,
            height,
            rgb,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }

    /// Expands to opaque RGBA8, the layout wgpu textures are created with.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.rgb
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], u8::MAX])
            .collect()
    }
}

/// A texture resident on the GPU with its sampler.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
        width: u32,
        height: u32,
        label: &str,
        options: TextureOptions,
        border_supported: bool,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let clamps_to_border = [options.wrap_s, options.wrap_t].contains(&Wrapping::ClampToBorder);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: options.wrap_s.to_wgpu(border_supported),
            address_mode_v: options.wrap_t.to_wgpu(border_supported),
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: options.mag_filter.to_wgpu(),
            min_filter: options.min_filter.to_wgpu(),
            border_color: (clamps_to_border && border_supported)
                .then_some(wgpu::SamplerBorderColor::TransparentBlack),
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    pub(crate) fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &TextureImage,
        options: TextureOptions,
        border_supported: bool,
    ) -> Self {
        Self::from_rgba(
            device,
            queue,
            &image.to_rgba(),
            image.width(),
            image.height(),
            image.label(),
            options,
            border_supported,
        )
    }

    /// A 1x1 white texture bound when an entity has none.
    pub(crate) fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::from_rgba(
            device,
            queue,
            &[u8::MAX; 4],
            1,
            1,
            "Default White Texture",
            TextureOptions::default(),
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_expands_to_opaque_rgba() {
        let image = TextureImage::from_rgb("checker", 2, 1, vec![255, 0, 0, 0, 0, 255]).unwrap();
        assert_eq!(image.to_rgba(), vec![255, 0, 0, 255, 0, 0, 255, 255]);
    }

    #[test]
    fn from_rgb_checks_dimensions() {
        let err = TextureImage::from_rgb("short", 2, 2, vec![0; 6]).unwrap_err();
        assert!(matches!(err, Error::Image { .. }));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = TextureImage::open("does/not/exist.png").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.png"));
    }

    #[test]
    fn default_options_repeat_with_linear_filtering() {
        let options = TextureOptions::default();
        assert_eq!(options.min_filter, Filtering::Linear);
        assert_eq!(options.wrap_t, Wrapping::Repeat);

        let nearest = options.filtering(Filtering::Nearest, Filtering::Nearest);
        assert_eq!(nearest.mag_filter, Filtering::Nearest);
    }

    #[test]
    fn clamp_to_border_falls_back_without_support() {
        assert_eq!(Wrapping::ClampToBorder.to_wgpu(false), wgpu::AddressMode::ClampToEdge);
        assert_eq!(Wrapping::ClampToBorder.to_wgpu(true), wgpu::AddressMode::ClampToBorder);
    }
}
