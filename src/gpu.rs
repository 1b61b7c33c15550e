//! GPU context management.
//!
//! [`GpuContext`] owns the wgpu surface, device and queue for the window and
//! keeps the surface configuration in step with the window size.

use std::sync::Arc;

use winit::window::Window;

use crate::error::{Error, Result};

/// Surface, device and queue for one window.
pub struct GpuContext {
    /// The window surface frames are presented to.
    pub surface: wgpu::Surface<'static>,
    /// Creates buffers, textures and pipelines.
    pub device: wgpu::Device,
    /// Submits command buffers and writes buffer data.
    pub queue: wgpu::Queue,
    /// Current surface format, size and present mode.
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Opens the device and configures the window surface.
    ///
    /// Line polygon mode and clamp-to-border sampling are requested when the
    /// adapter offers them; the renderer degrades gracefully without them.
    pub fn new(window: Arc<Window>, vsync: bool) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| Error::Gpu(format!("failed to create surface: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| Error::Gpu(format!("no suitable GPU adapter: {e}")))?;

        let optional = wgpu::Features::POLYGON_MODE_LINE | wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER;
        let required_features = adapter.features() & optional;
        log::info!(
            "using {} ({:?}), optional features {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            required_features
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Orrery Device"),
            required_features,
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))
        .map_err(|e| Error::Gpu(format!("failed to create device: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| Error::Gpu("surface reports no formats".into()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
        })
    }

    /// Reconfigures the surface for a new window size.
    ///
    /// Zero-sized dimensions (a minimized window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Re-applies the current configuration after the surface was lost.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Next swapchain image, or `None` when this frame should be skipped.
    ///
    /// A lost or outdated surface is reconfigured and the frame dropped.
    pub fn acquire_frame(&self) -> Result<Option<wgpu::SurfaceTexture>> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated, reconfiguring");
                self.reconfigure();
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out waiting for the next frame");
                Ok(None)
            }
            Err(e) => Err(Error::Gpu(format!("failed to acquire frame: {e}"))),
        }
    }

    /// Surface width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Surface height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Width over height, for the camera's projection.
    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }

    /// Whether the device was opened with all of `features`.
    pub fn supports(&self, features: wgpu::Features) -> bool {
        self.device.features().contains(features)
    }
}
