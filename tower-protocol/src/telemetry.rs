//! Downlink telemetry frame.
//!
//! Frame format (16 bytes):
//! - HEADER (1 byte): 0xCC
//! - SWITCH (1 byte): echo of the vehicle's main switch
//! - ROLL, PITCH, YAW (4 bytes each): attitude angles, f32 little-endian
//! - TAIL (1 byte): 0xDD
//! - CRC (1 byte): CRC-8 over HEADER through TAIL

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::crc8;
use crate::frame::FrameError;
use crate::wire::{Reader, Writer};

/// Downlink frame start byte
pub const DOWNLINK_HEADER: u8 = 0xCC;

/// Downlink frame end byte (precedes the CRC)
pub const DOWNLINK_TAIL: u8 = 0xDD;

/// Switch echo plus three attitude angles
const TELEMETRY_FIELDS_LEN: usize = 1 + 3 * 4;

/// Fixed downlink frame length
pub const TELEMETRY_FRAME_LEN: usize = 16;

// header + fields + tail + crc
const _: () = assert!(TELEMETRY_FRAME_LEN == 1 + TELEMETRY_FIELDS_LEN + 1 + 1);

/// One telemetry report from the vehicle
///
/// The attitude values are opaque to the ground station; they are mirrored
/// for display only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Telemetry {
    /// Main switch echo
    pub switch: u8,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl Telemetry {
    /// Decode exactly one telemetry frame
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < TELEMETRY_FRAME_LEN {
            return Err(FrameError::Incomplete);
        }
        if bytes.len() > TELEMETRY_FRAME_LEN {
            return Err(FrameError::InvalidLength);
        }
        if bytes[0] != DOWNLINK_HEADER {
            return Err(FrameError::InvalidHeader);
        }
        if bytes[TELEMETRY_FRAME_LEN - 2] != DOWNLINK_TAIL {
            return Err(FrameError::InvalidTail);
        }
        if crc8(&bytes[..TELEMETRY_FRAME_LEN - 1]) != bytes[TELEMETRY_FRAME_LEN - 1] {
            return Err(FrameError::InvalidChecksum);
        }

        let mut r = Reader::new(&bytes[1..1 + TELEMETRY_FIELDS_LEN]);
        Ok(Self {
            switch: r.u8(),
            roll: r.f32(),
            pitch: r.f32(),
            yaw: r.f32(),
        })
    }

    /// Encode this report as the vehicle would send it
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        if buffer.len() < TELEMETRY_FRAME_LEN {
            return Err(FrameError::BufferTooSmall);
        }

        Ok(self.write(buffer))
    }

    /// Encode into a fixed-size array
    pub fn to_bytes(&self) -> [u8; TELEMETRY_FRAME_LEN] {
        let mut buffer = [0u8; TELEMETRY_FRAME_LEN];
        self.write(&mut buffer);
        buffer
    }

    /// Write the frame into a buffer of at least `TELEMETRY_FRAME_LEN` bytes
    fn write(&self, buffer: &mut [u8]) -> usize {
        let mut w = Writer::new(buffer);
        w.put_u8(DOWNLINK_HEADER);
        w.put_u8(self.switch);
        w.put_f32s(&[self.roll, self.pitch, self.yaw]);
        w.put_u8(DOWNLINK_TAIL);
        let len = w.finish();
        debug_assert_eq!(len, TELEMETRY_FRAME_LEN);
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_frame_bytes() {
        let telemetry = Telemetry {
            switch: 1,
            roll: 1.0,
            pitch: 2.0,
            yaw: 3.0,
        };
        let bytes = telemetry.to_bytes();

        assert_eq!(bytes[0], DOWNLINK_HEADER);
        assert_eq!(bytes[1], 0x01);
        assert_eq!(&bytes[2..6], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[6..10], &2.0f32.to_le_bytes());
        assert_eq!(&bytes[10..14], &3.0f32.to_le_bytes());
        assert_eq!(bytes[14], DOWNLINK_TAIL);
        assert_eq!(bytes[15], crc8(&bytes[..15]));
    }

    #[test]
    fn test_telemetry_roundtrip() {
        let telemetry = Telemetry {
            switch: 2,
            roll: -12.5,
            pitch: 0.125,
            yaw: 359.0,
        };
        assert_eq!(Telemetry::decode(&telemetry.to_bytes()), Ok(telemetry));
    }

    #[test]
    fn test_decode_rejections() {
        let good = Telemetry::default().to_bytes();

        let mut bad_header = good;
        bad_header[0] = 0xCD;
        assert_eq!(Telemetry::decode(&bad_header), Err(FrameError::InvalidHeader));

        let mut bad_tail = good;
        bad_tail[14] = 0x00;
        assert_eq!(Telemetry::decode(&bad_tail), Err(FrameError::InvalidTail));

        let mut bad_crc = good;
        bad_crc[15] ^= 0x10;
        assert_eq!(Telemetry::decode(&bad_crc), Err(FrameError::InvalidChecksum));

        let mut bad_field = good;
        bad_field[5] ^= 0x80;
        assert_eq!(Telemetry::decode(&bad_field), Err(FrameError::InvalidChecksum));

        assert_eq!(Telemetry::decode(&good[..15]), Err(FrameError::Incomplete));
    }

    #[test]
    fn test_frame_length_matches_layout() {
        use core::mem::{size_of, size_of_val};

        let t = Telemetry::default();
        let fields = size_of::<u8>()
            + size_of_val(&t.roll)
            + size_of_val(&t.pitch)
            + size_of_val(&t.yaw);
        // header + fields + tail + crc
        assert_eq!(1 + fields + 1 + 1, TELEMETRY_FRAME_LEN);

        let mut buffer = [0u8; 32];
        assert_eq!(t.encode(&mut buffer), Ok(TELEMETRY_FRAME_LEN));
    }

    #[test]
    fn test_decode_never_panics_on_framed_noise() {
        // Valid header, tail and CRC around arbitrary field bytes
        let mut bytes = [0x5Au8; TELEMETRY_FRAME_LEN];
        bytes[0] = DOWNLINK_HEADER;
        bytes[TELEMETRY_FRAME_LEN - 2] = DOWNLINK_TAIL;
        bytes[TELEMETRY_FRAME_LEN - 1] = crc8(&bytes[..TELEMETRY_FRAME_LEN - 1]);

        let decoded = Telemetry::decode(&bytes).unwrap();
        assert_eq!(decoded.switch, 0x5A);
        assert_eq!(decoded.yaw, f32::from_le_bytes([0x5A; 4]));
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let mut buffer = [0u8; TELEMETRY_FRAME_LEN - 1];
        assert_eq!(
            Telemetry::default().encode(&mut buffer),
            Err(FrameError::BufferTooSmall)
        );
    }
}
