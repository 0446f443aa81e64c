use serde::Serialize;

/// Decoded environment (`.env`) file.
///
/// Counted sequences keep their declared length; slots the file never
/// filled are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvFile {
    /// Metres.
    pub water_wave_height: f32,
    /// Metres per second.
    pub water_wave_speed: f32,
    pub water_layers: Vec<Option<WaterLayer>>,
    pub sky_layers: Vec<Option<SkyLayer>>,
    pub sky_satellites: Vec<Option<SkySatellite>>,
}

/// The texture selection of a `world_anim_shader` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnimShader {
    /// Leading string of `world_shader`, e.g. `TexDiff`.
    pub texture_mode: String,
    /// Name from the last `terrain_texslot` seen.
    pub texture_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WaterLayer {
    /// Metres.
    pub height: f32,
    pub shader: AnimShader,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkyLayer {
    pub shader: AnimShader,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkySatellite {
    pub shader: AnimShader,
}

impl WaterLayer {
    pub fn texture_name(&self) -> &str {
        &self.shader.texture_name
    }
}

impl SkyLayer {
    pub fn texture_name(&self) -> &str {
        &self.shader.texture_name
    }
}

impl SkySatellite {
    pub fn texture_name(&self) -> &str {
        &self.shader.texture_name
    }
}
