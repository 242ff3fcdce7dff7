//! Packed light words: sunlight in bits 12-15, red 8-11, green 4-7, blue 0-3.

use core::str::FromStr;

use crate::codec::CodecError;

pub const MAX_LIGHT_LEVEL: u32 = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightColor {
    Sunlight,
    Red,
    Green,
    Blue,
}

impl LightColor {
    pub const ALL: [LightColor; 4] = [
        LightColor::Sunlight,
        LightColor::Red,
        LightColor::Green,
        LightColor::Blue,
    ];
    pub const TORCH: [LightColor; 3] = [LightColor::Red, LightColor::Green, LightColor::Blue];

    #[inline]
    fn shift(self) -> u32 {
        match self {
            LightColor::Sunlight => 12,
            LightColor::Red => 8,
            LightColor::Green => 4,
            LightColor::Blue => 0,
        }
    }

    pub fn from_index(index: usize) -> Result<Self, CodecError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(CodecError::UnknownLightColor(index))
    }
}

impl FromStr for LightColor {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sunlight" => Ok(LightColor::Sunlight),
            "red" => Ok(LightColor::Red),
            "green" => Ok(LightColor::Green),
            "blue" => Ok(LightColor::Blue),
            _ => Err(CodecError::UnknownLightColorName(s.to_string())),
        }
    }
}

#[inline]
pub fn extract_light(light: u32, color: LightColor) -> u32 {
    (light >> color.shift()) & 0xF
}

/// Levels are masked to four bits.
#[inline]
pub fn insert_light(light: u32, color: LightColor, level: u32) -> u32 {
    let shift = color.shift();
    (light & !(0xF << shift)) | ((level & 0xF) << shift)
}

#[inline]
pub fn extract_sunlight(light: u32) -> u32 {
    extract_light(light, LightColor::Sunlight)
}

#[inline]
pub fn insert_sunlight(light: u32, level: u32) -> u32 {
    insert_light(light, LightColor::Sunlight, level)
}

#[inline]
pub fn extract_red_light(light: u32) -> u32 {
    extract_light(light, LightColor::Red)
}

#[inline]
pub fn insert_red_light(light: u32, level: u32) -> u32 {
    insert_light(light, LightColor::Red, level)
}

#[inline]
pub fn extract_green_light(light: u32) -> u32 {
    extract_light(light, LightColor::Green)
}

#[inline]
pub fn insert_green_light(light: u32, level: u32) -> u32 {
    insert_light(light, LightColor::Green, level)
}

#[inline]
pub fn extract_blue_light(light: u32) -> u32 {
    extract_light(light, LightColor::Blue)
}

#[inline]
pub fn insert_blue_light(light: u32, level: u32) -> u32 {
    insert_light(light, LightColor::Blue, level)
}

/// Unpacked view of a light word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Light {
    pub sunlight: u32,
    pub red: u32,
    pub green: u32,
    pub blue: u32,
}

impl Light {
    pub fn unpack(light: u32) -> Self {
        Self {
            sunlight: extract_sunlight(light),
            red: extract_red_light(light),
            green: extract_green_light(light),
            blue: extract_blue_light(light),
        }
    }

    pub fn pack(&self) -> u32 {
        let mut light = insert_sunlight(0, self.sunlight);
        light = insert_red_light(light, self.red);
        light = insert_green_light(light, self.green);
        insert_blue_light(light, self.blue)
    }
}
