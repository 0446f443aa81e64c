//! Decoder for environment (`.env`) files.
//!
//! The water and sky sections are read in two separate passes over the
//! document, each with its own reader, so neither pass depends on what the
//! other one consumed.

use std::path::Path;

use msts_types::{AnimShader, EnvFile, SkyLayer, SkySatellite, UnitClass, WaterLayer};

use crate::counted_list::CountedList;
use crate::dispatch::DispatchTable;
use crate::stf_reader::{StfError, StfReader};

/// Decode the environment file at `path`.
pub fn read_env_file(path: impl AsRef<Path>) -> Result<EnvFile, StfError> {
    let path = path.as_ref();
    decode(|| StfReader::open(path))
}

/// Decode an environment document held in memory.
pub fn parse_env(name: &str, input: &str) -> Result<EnvFile, StfError> {
    decode(|| StfReader::from_source(name, input))
}

fn decode(
    mut open: impl FnMut() -> Result<StfReader, StfError>,
) -> Result<EnvFile, StfError> {
    let mut env = EnvFile::default();
    read_water(&mut open()?, &mut env)?;
    read_sky(&mut open()?, &mut env)?;
    Ok(env)
}

fn read_water(r: &mut StfReader, env: &mut EnvFile) -> Result<(), StfError> {
    r.parse_file(&mut DispatchTable::new().on("world", |r| {
        r.parse_block(
            false,
            &mut DispatchTable::new().on("world_water", |r| {
                r.parse_block(
                    false,
                    &mut DispatchTable::new()
                        .on("world_water_wave_height", |r| {
                            env.water_wave_height = r.read_number_block(UnitClass::Distance, None)?;
                            Ok(())
                        })
                        .on("world_water_wave_speed", |r| {
                            env.water_wave_speed = r.read_number_block(UnitClass::Speed, None)?;
                            Ok(())
                        })
                        .on("world_water_layers", |r| {
                            env.water_layers = r.read_counted_list(|n| {
                                CountedList::new(n)
                                    .item("world_water_layer", |r, _| read_water_layer(r))
                            })?;
                            Ok(())
                        }),
                )
            }),
        )
    }))
}

fn read_sky(r: &mut StfReader, env: &mut EnvFile) -> Result<(), StfError> {
    r.parse_file(&mut DispatchTable::new().on("world", |r| {
        r.parse_block(
            false,
            &mut DispatchTable::new().on("world_sky", |r| {
                r.parse_block(
                    false,
                    &mut DispatchTable::new()
                        .on("world_sky_layers", |r| {
                            env.sky_layers = r.read_counted_list(|n| {
                                CountedList::new(n).item("world_sky_layer", |r, _| {
                                    Ok(SkyLayer {
                                        shader: read_shader_holder(r)?,
                                    })
                                })
                            })?;
                            Ok(())
                        })
                        .on("world_sky_satellites", |r| {
                            env.sky_satellites = r.read_counted_list(|n| {
                                CountedList::new(n).item("world_sky_satellite", |r, _| {
                                    Ok(SkySatellite {
                                        shader: read_shader_holder(r)?,
                                    })
                                })
                            })?;
                            Ok(())
                        }),
                )
            }),
        )
    }))
}

fn read_water_layer(r: &mut StfReader) -> Result<WaterLayer, StfError> {
    let mut layer = WaterLayer::default();
    r.parse_block(
        false,
        &mut DispatchTable::new()
            .on("world_water_layer_height", |r| {
                layer.height = r.read_number_block(UnitClass::Distance, None)?;
                Ok(())
            })
            .on("world_anim_shader", |r| {
                layer.shader = read_anim_shader(r)?;
                Ok(())
            }),
    )?;
    Ok(layer)
}

/// A sky layer or satellite block: nothing but its animated shader.
fn read_shader_holder(r: &mut StfReader) -> Result<AnimShader, StfError> {
    let mut shader = AnimShader::default();
    r.parse_block(
        false,
        &mut DispatchTable::new().on("world_anim_shader", |r| {
            shader = read_anim_shader(r)?;
            Ok(())
        }),
    )?;
    Ok(shader)
}

/// `world_anim_shader ( world_shader ( <mode> terrain_texslots ( <n> terrain_texslot ( "<name>" ... ) ... ) ) )`
fn read_anim_shader(r: &mut StfReader) -> Result<AnimShader, StfError> {
    let mut shader = AnimShader::default();
    r.parse_block(
        false,
        &mut DispatchTable::new().on("world_shader", |r| {
            r.expect_open()?;
            shader.texture_mode = r.read_string()?;
            r.parse_block(
                true,
                &mut DispatchTable::new().on("terrain_texslots", |r| {
                    r.expect_open()?;
                    // the slot count is informational; the last slot wins
                    r.read_uint(None)?;
                    r.parse_block(
                        true,
                        &mut DispatchTable::new().on("terrain_texslot", |r| {
                            r.expect_open()?;
                            shader.texture_name = r.read_string()?;
                            r.skip_rest_of_block()
                        }),
                    )
                }),
            )
        }),
    )?;
    Ok(shader)
}
