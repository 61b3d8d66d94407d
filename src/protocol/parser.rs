//! Status frame decoding.
//!
//! Decoding is a pure transform over the table in [`super::layout`]: it does
//! no I/O and keeps no state between calls.

use crate::error::FrameError;
use crate::protocol::frame::FRAME_END;
use crate::protocol::layout::{
    FIRMWARE_MAJOR, FIRMWARE_MINOR, FRAME_END_OFFSET, INPUT_VOLTAGE_DC, INVERTER_ID,
    MODULE_BLOCK_LEN, MODULE_ID, MODULE_OFFSETS, OUTPUT_FREQUENCY_AC, OUTPUT_POWER_AC,
    OUTPUT_VOLTAGE_AC, STATUS_FRAME_LEN, TEMPERATURE, TOTAL_ENERGY,
};
use crate::types::{ModuleReading, TelemetryFrame};

/// Decodes an inverter status frame into engineering units.
///
/// Input longer than a status frame is accepted; bytes past the end marker
/// are ignored. Nothing is returned unless the whole frame validates.
pub fn decode_status_frame(data: &[u8]) -> Result<TelemetryFrame, FrameError> {
    if data.len() < STATUS_FRAME_LEN {
        return Err(FrameError::TooShort {
            expected: STATUS_FRAME_LEN,
            got: data.len(),
        });
    }

    let end = data[FRAME_END_OFFSET];
    if end != FRAME_END {
        return Err(FrameError::BadTerminator(end));
    }

    let [first, second] =
        MODULE_OFFSETS.map(|offset| parse_module(&data[offset..offset + MODULE_BLOCK_LEN]));

    Ok(TelemetryFrame {
        inverter_id: format!("{:x}", INVERTER_ID.read(data)),
        module1: first,
        module2: second,
    })
}

/// Parses one 32-byte module block.
fn parse_module(block: &[u8]) -> ModuleReading {
    ModuleReading {
        module_id: format!("{:x}", MODULE_ID.read(block)),
        firmware_version: format!(
            "{}/{}",
            FIRMWARE_MAJOR.read(block),
            FIRMWARE_MINOR.read(block)
        ),
        input_voltage_dc: INPUT_VOLTAGE_DC.read(block),
        output_power_ac: OUTPUT_POWER_AC.read(block),
        total_energy: TOTAL_ENERGY.read(block),
        temperature: TEMPERATURE.read(block),
        output_voltage_ac: OUTPUT_VOLTAGE_AC.read(block),
        output_frequency_ac: OUTPUT_FREQUENCY_AC.read(block),
    }
}

/// Builders for synthetic status frames.
#[cfg(test)]
pub(crate) mod testing {
    use bytes::BufMut;

    use super::*;

    /// Raw, unscaled module values.
    #[derive(Debug, Clone, Copy, Default)]
    pub(crate) struct RawModule {
        pub id: u32,
        pub firmware: (u8, u8),
        pub input_voltage_dc: u16,
        pub output_power_ac: u16,
        pub total_energy: u32,
        pub temperature: u16,
        pub output_voltage_ac: u16,
        pub output_frequency_ac: u16,
    }

    impl RawModule {
        fn put(&self, buf: &mut Vec<u8>) {
            buf.put_u32(self.id);
            buf.put_u8(self.firmware.0);
            buf.put_u8(self.firmware.1);
            buf.put_u16(self.input_voltage_dc);
            buf.put_u16(self.output_power_ac);
            buf.put_u32(self.total_energy);
            buf.put_u16(self.temperature);
            buf.put_u16(self.output_voltage_ac);
            buf.put_u16(self.output_frequency_ac);
            buf.put_bytes(0, 12);
        }
    }

    /// Encodes a well-formed status frame.
    pub(crate) fn status_frame(inverter_id: u32, modules: [RawModule; 2]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(STATUS_FRAME_LEN);
        buf.put_slice(&[0x68, 0x00, 0x56, 0x68, 0x10, 0x51]);
        buf.put_u32(inverter_id);
        buf.put_bytes(0, 10);
        modules[0].put(&mut buf);
        modules[1].put(&mut buf);
        buf.put_u8(0x00);
        buf.put_u8(FRAME_END);
        buf
    }

    /// A representative frame with both modules producing.
    pub(crate) fn sample_status_frame() -> Vec<u8> {
        let module = RawModule {
            id: 0x1234_abcd,
            firmware: (3, 7),
            input_voltage_dc: 16384,
            output_power_ac: 8192,
            total_energy: 819_200,
            temperature: 8192,
            output_voltage_ac: 14720,
            output_frequency_ac: 12800,
        };
        status_frame(0x3158_3078, [module, RawModule { id: 0x1234_abce, ..module }])
    }
}
