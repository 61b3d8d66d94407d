//! Byte layout of the inverter status frame.
//!
//! ```text
//! [reserved:6] [inverter_id:4] [reserved:10] [module 1:32] [module 2:32] [check:1] [end:1]
//! ```
//!
//! Each module block:
//! ```text
//! [id:4] [fw_major:1] [fw_minor:1] [dc_voltage:2] [ac_power:2] [energy:4]
//! [temperature:2] [ac_voltage:2] [ac_frequency:2] [padding:12]
//! ```
//!
//! Offsets in [`ModuleField`] are relative to the start of the module block.

use bytes::Buf;

/// Total size of a status frame.
pub const STATUS_FRAME_LEN: usize = 86;

/// Size of one module block.
pub const MODULE_BLOCK_LEN: usize = 32;

/// Offset of the inverter identifier.
pub const INVERTER_ID: Field = Field::new("inverter_id", 6, Width::U32);

/// Offsets of the two module blocks.
pub const MODULE_OFFSETS: [usize; 2] = [20, 52];

/// Offset of the end marker.
pub const FRAME_END_OFFSET: usize = STATUS_FRAME_LEN - 1;

/// Module identifier.
pub const MODULE_ID: Field = Field::new("module_id", 0, Width::U32);

/// Firmware major version.
pub const FIRMWARE_MAJOR: Field = Field::new("firmware_major", 4, Width::U8);

/// Firmware minor version.
pub const FIRMWARE_MINOR: Field = Field::new("firmware_minor", 5, Width::U8);

/// DC input voltage in volts.
pub const INPUT_VOLTAGE_DC: ModuleField = ModuleField::new(
    Field::new("input_voltage_dc", 6, Width::U16),
    Scale::new(64.0 / 32768.0, 0.0),
);

/// AC output power in watts.
pub const OUTPUT_POWER_AC: ModuleField = ModuleField::new(
    Field::new("output_power_ac", 8, Width::U16),
    Scale::new(512.0 / 32768.0, 0.0),
);

/// Cumulative energy in kilowatt-hours.
pub const TOTAL_ENERGY: ModuleField = ModuleField::new(
    Field::new("total_energy", 10, Width::U32),
    Scale::new(4.0 / 32768.0, 0.0),
);

/// Module temperature in degrees Celsius.
pub const TEMPERATURE: ModuleField = ModuleField::new(
    Field::new("temperature", 14, Width::U16),
    Scale::new(256.0 / 32768.0, -40.0),
);

/// AC output voltage in volts.
pub const OUTPUT_VOLTAGE_AC: ModuleField = ModuleField::new(
    Field::new("output_voltage_ac", 16, Width::U16),
    Scale::new(512.0 / 32768.0, 0.0),
);

/// AC output frequency in hertz.
pub const OUTPUT_FREQUENCY_AC: ModuleField = ModuleField::new(
    Field::new("output_frequency_ac", 18, Width::U16),
    Scale::new(128.0 / 32768.0, 0.0),
);

/// Integer width of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    U8,
    U16,
    U32,
}

impl Width {
    /// Size in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Byte order of a field.
///
/// Every field of the current status layout is big-endian. `Little` is the
/// switch for a layout that stores a field the other way round; no entry in
/// this table uses it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// A fixed-position unsigned integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Field name, used in diagnostics.
    pub name: &'static str,
    /// Byte offset.
    pub offset: usize,
    /// Integer width.
    pub width: Width,
    /// Byte order.
    pub endian: Endian,
}

impl Field {
    /// Creates a big-endian field.
    #[must_use]
    pub const fn new(name: &'static str, offset: usize, width: Width) -> Self {
        Self {
            name,
            offset,
            width,
            endian: Endian::Big,
        }
    }

    /// Byte range covered by the field.
    #[must_use]
    pub const fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.width.size()
    }

    /// Reads the raw value from `data`, which must cover the field.
    #[must_use]
    pub fn read(&self, data: &[u8]) -> u32 {
        let mut bytes = &data[self.range()];
        match (self.width, self.endian) {
            (Width::U8, _) => u32::from(bytes.get_u8()),
            (Width::U16, Endian::Big) => u32::from(bytes.get_u16()),
            (Width::U16, Endian::Little) => u32::from(bytes.get_u16_le()),
            (Width::U32, Endian::Big) => bytes.get_u32(),
            (Width::U32, Endian::Little) => bytes.get_u32_le(),
        }
    }
}

/// Linear conversion `raw * factor + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub factor: f64,
    pub offset: f64,
}

impl Scale {
    #[must_use]
    pub const fn new(factor: f64, offset: f64) -> Self {
        Self { factor, offset }
    }

    #[must_use]
    pub fn apply(self, raw: u32) -> f64 {
        f64::from(raw) * self.factor + self.offset
    }
}

/// A scaled physical quantity inside a module block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleField {
    pub field: Field,
    pub scale: Scale,
}

impl ModuleField {
    #[must_use]
    pub const fn new(field: Field, scale: Scale) -> Self {
        Self { field, scale }
    }

    /// Reads and scales the value from a module block.
    #[must_use]
    pub fn read(&self, block: &[u8]) -> f64 {
        self.scale.apply(self.field.read(block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALED: [ModuleField; 6] = [
        INPUT_VOLTAGE_DC,
        OUTPUT_POWER_AC,
        TOTAL_ENERGY,
        TEMPERATURE,
        OUTPUT_VOLTAGE_AC,
        OUTPUT_FREQUENCY_AC,
    ];

    #[test]
    fn test_module_fields_fit_block_without_overlap() {
        let mut covered = [false; MODULE_BLOCK_LEN];
        let fields = [MODULE_ID, FIRMWARE_MAJOR, FIRMWARE_MINOR]
            .into_iter()
            .chain(SCALED.iter().map(|f| f.field));

        for field in fields {
            assert!(field.range().end <= MODULE_BLOCK_LEN, "{} overflows", field.name);
            for i in field.range() {
                assert!(!covered[i], "{} overlaps at byte {i}", field.name);
                covered[i] = true;
            }
        }
        // 12 trailing padding bytes are never read
        assert!(covered[..20].iter().all(|&c| c));
        assert!(covered[20..].iter().all(|&c| !c));
    }

    #[test]
    fn test_frame_regions() {
        assert_eq!(INVERTER_ID.range(), 6..10);
        assert_eq!(MODULE_OFFSETS[0] + MODULE_BLOCK_LEN, MODULE_OFFSETS[1]);
        assert_eq!(MODULE_OFFSETS[1] + MODULE_BLOCK_LEN, FRAME_END_OFFSET - 1);
    }

    #[test]
    fn test_status_layout_is_big_endian() {
        let fields = [INVERTER_ID, MODULE_ID, FIRMWARE_MAJOR, FIRMWARE_MINOR]
            .into_iter()
            .chain(SCALED.iter().map(|f| f.field));
        for field in fields {
            assert_eq!(field.endian, Endian::Big, "{} is not big-endian", field.name);
        }
    }

    #[test]
    fn test_field_read_endianness() {
        let data = [0x12, 0x34, 0x56, 0x78];
        let big = Field::new("x", 0, Width::U32);
        let little = Field {
            endian: Endian::Little,
            ..big
        };
        assert_eq!(big.read(&data), 0x1234_5678);
        assert_eq!(little.read(&data), 0x7856_3412);
        assert_eq!(Field::new("y", 1, Width::U16).read(&data), 0x3456);
    }

    #[test]
    fn test_scale_apply() {
        assert!((OUTPUT_POWER_AC.scale.apply(16384) - 256.0).abs() < 1e-9);
        assert!((TEMPERATURE.scale.apply(0) + 40.0).abs() < 1e-9);
        assert!((TEMPERATURE.scale.apply(8192) - 24.0).abs() < 1e-9);
    }
}
