//! Graphics Settings
//!
//! Configuration consumed once when the graphics context is created. It
//! covers GPU adapter selection, the offscreen target the headless backend
//! renders into, and the initial render state defaults.

use glam::Vec4;

/// Global configuration for graphics context initialization.
///
/// # Fields
///
/// | Field              | Description                              | Default            |
/// |--------------------|------------------------------------------|--------------------|
/// | `width` / `height` | Render target size in pixels             | 1280 × 720         |
/// | `backends`         | Forced wgpu backend (or auto)            | `None`             |
/// | `power_preference` | GPU adapter selection strategy           | `HighPerformance`  |
/// | `clear_color`      | Initial frame clear color                | Black (0,0,0,1)    |
/// | `required_features`| Required wgpu features                   | Empty              |
/// | `required_limits`  | Required wgpu limits                     | Default            |
/// | `color_format`     | Color target texture format              | `Rgba8UnormSrgb`   |
/// | `depth_format`     | Depth buffer texture format              | `Depth32Float`     |
#[derive(Debug, Clone)]
pub struct GraphicsSettings {
    /// Render target width in pixels.
    pub width: u32,
    /// Render target height in pixels.
    pub height: u32,

    /// Force a specific wgpu backend (Vulkan, Metal, DX12, …).
    ///
    /// `None` lets wgpu choose the best available backend for the platform.
    pub backends: Option<wgpu::Backends>,

    /// GPU adapter selection preference.
    ///
    /// - `HighPerformance`: Prefer discrete / dedicated GPU
    /// - `LowPower`: Prefer integrated GPU
    pub power_preference: wgpu::PowerPreference,

    /// Initial clear color, one normalized value per channel.
    ///
    /// Channels are stored and forwarded to the backend as given — the core
    /// never clamps them.
    pub clear_color: Vec4,

    /// Required wgpu features that must be supported by the adapter.
    pub required_features: wgpu::Features,

    /// Required wgpu limits (max buffer sizes, binding counts, etc.).
    pub required_limits: wgpu::Limits,

    /// Color target texture format.
    pub color_format: wgpu::TextureFormat,

    /// Depth buffer texture format.
    pub depth_format: wgpu::TextureFormat,
}

impl Default for GraphicsSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            backends: None,
            power_preference: wgpu::PowerPreference::HighPerformance,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            color_format: wgpu::TextureFormat::Rgba8UnormSrgb,
            depth_format: wgpu::TextureFormat::Depth32Float,
        }
    }
}
