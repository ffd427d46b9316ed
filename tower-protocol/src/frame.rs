//! Uplink frame encoding and decoding.
//!
//! Every uplink frame is `HEADER TAG FIELDS TAIL CRC`, with a fixed length per
//! tag:
//!
//! | Shape            | Tag  | Fields                          | Length |
//! |------------------|------|---------------------------------|--------|
//! | STOP             | 0x00 | none                            | 4      |
//! | AUTO             | 0x01 | switch u8, speed i16, 4 × f32   | 23     |
//! | TOWER            | 0x02 | switch u8, speed i16, 4 × f32   | 23     |
//! | TUNING/SERVO     | 0xA1 | 4 × f32                         | 20     |
//! | TUNING/PID       | 0xA2 | marker u8, 6 × f32              | 29     |
//! | TUNING/JACOBIAN  | 0xA3 | 12 × f32 (row-major 3 × 4)      | 52     |
//!
//! Field values are carried as-is; range policy belongs to whoever fills them.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::crc8;
use crate::wire::{Reader, Writer};

/// Uplink frame start byte
pub const UPLINK_HEADER: u8 = 0xAA;

/// Uplink frame end byte (precedes the CRC)
pub const UPLINK_TAIL: u8 = 0xBB;

/// PID marker meaning "browsing, do not apply"
pub const PID_MARKER_NONE: u8 = 0x00;

/// Largest uplink frame (TUNING/JACOBIAN)
pub const MAX_UPLINK_FRAME_SIZE: usize = 52;

// Tag values
const TAG_STOP: u8 = 0x00;
const TAG_AUTO: u8 = 0x01;
const TAG_TOWER: u8 = 0x02;
const TAG_SERVO: u8 = 0xA1;
const TAG_PID: u8 = 0xA2;
const TAG_JACOBIAN: u8 = 0xA3;

/// Errors that can occur during frame encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Fewer bytes than the frame shape requires
    Incomplete,
    /// More bytes than the frame shape allows
    InvalidLength,
    /// First byte is not the expected header
    InvalidHeader,
    /// Tail byte mismatch
    InvalidTail,
    /// Checksum mismatch
    InvalidChecksum,
    /// Tag byte names no known frame shape
    UnknownTag,
}

/// Drive command carried by AUTO and TOWER frames
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DriveCommand {
    /// Main switch (0, 1 or 2)
    pub switch: u8,
    /// Fan/throttle command
    pub speed: i16,
    /// Servo channel values
    pub servos: [f32; 4],
}

/// Gains for one control loop
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Integrator anti-windup limit
    pub integral_clamp: f32,
    /// Upper output limit
    pub output_max: f32,
    /// Lower output limit
    pub output_min: f32,
}

impl PidGains {
    /// Number of gain fields, in wire order
    pub const FIELD_COUNT: usize = 6;

    /// Gains in wire order
    pub fn to_array(&self) -> [f32; 6] {
        [
            self.kp,
            self.ki,
            self.kd,
            self.integral_clamp,
            self.output_max,
            self.output_min,
        ]
    }

    /// Build gains from wire order
    pub fn from_array(values: [f32; 6]) -> Self {
        let [kp, ki, kd, integral_clamp, output_max, output_min] = values;
        Self {
            kp,
            ki,
            kd,
            integral_clamp,
            output_max,
            output_min,
        }
    }

    /// Get a gain by wire index
    pub fn field(&self, index: usize) -> Option<f32> {
        self.to_array().get(index).copied()
    }

    /// Set a gain by wire index
    ///
    /// Returns false if the index is out of range.
    pub fn set_field(&mut self, index: usize, value: f32) -> bool {
        let mut values = self.to_array();
        match values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                *self = Self::from_array(values);
                true
            }
            None => false,
        }
    }
}

/// Uplink frame shape, without field values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UplinkKind {
    Stop,
    Auto,
    Tower,
    Servo,
    Pid,
    Jacobian,
}

impl UplinkKind {
    /// Parse a shape from its tag byte
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            TAG_STOP => Some(UplinkKind::Stop),
            TAG_AUTO => Some(UplinkKind::Auto),
            TAG_TOWER => Some(UplinkKind::Tower),
            TAG_SERVO => Some(UplinkKind::Servo),
            TAG_PID => Some(UplinkKind::Pid),
            TAG_JACOBIAN => Some(UplinkKind::Jacobian),
            _ => None,
        }
    }

    /// Tag byte following the header
    pub fn tag(self) -> u8 {
        match self {
            UplinkKind::Stop => TAG_STOP,
            UplinkKind::Auto => TAG_AUTO,
            UplinkKind::Tower => TAG_TOWER,
            UplinkKind::Servo => TAG_SERVO,
            UplinkKind::Pid => TAG_PID,
            UplinkKind::Jacobian => TAG_JACOBIAN,
        }
    }

    /// Total encoded length including header, tail and CRC
    pub fn frame_len(self) -> usize {
        // header + tag + fields + tail + crc
        4 + match self {
            UplinkKind::Stop => 0,
            UplinkKind::Auto | UplinkKind::Tower => 1 + 2 + 4 * 4,
            UplinkKind::Servo => 4 * 4,
            UplinkKind::Pid => 1 + PidGains::FIELD_COUNT * 4,
            UplinkKind::Jacobian => 12 * 4,
        }
    }
}

/// A ground-to-vehicle frame
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Uplink {
    /// Safe stop, no fields
    Stop,
    /// Autonomous drive command
    Auto(DriveCommand),
    /// Tower (manual) drive command
    Tower(DriveCommand),
    /// Servo trim values
    Servo([f32; 4]),
    /// Gains of the selected loop, with the commit marker
    Pid { marker: u8, gains: PidGains },
    /// Control allocation matrix
    Jacobian([[f32; 4]; 3]),
}

impl Uplink {
    /// Shape of this frame
    pub fn kind(&self) -> UplinkKind {
        match self {
            Uplink::Stop => UplinkKind::Stop,
            Uplink::Auto(_) => UplinkKind::Auto,
            Uplink::Tower(_) => UplinkKind::Tower,
            Uplink::Servo(_) => UplinkKind::Servo,
            Uplink::Pid { .. } => UplinkKind::Pid,
            Uplink::Jacobian(_) => UplinkKind::Jacobian,
        }
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let kind = self.kind();
        if buffer.len() < kind.frame_len() {
            return Err(FrameError::BufferTooSmall);
        }

        let mut w = Writer::new(buffer);
        w.put_u8(UPLINK_HEADER);
        w.put_u8(kind.tag());

        match self {
            Uplink::Stop => {}
            Uplink::Auto(cmd) | Uplink::Tower(cmd) => {
                w.put_u8(cmd.switch);
                w.put_i16(cmd.speed);
                w.put_f32s(&cmd.servos);
            }
            Uplink::Servo(angles) => w.put_f32s(angles),
            Uplink::Pid { marker, gains } => {
                w.put_u8(*marker);
                w.put_f32s(&gains.to_array());
            }
            Uplink::Jacobian(matrix) => {
                for row in matrix {
                    w.put_f32s(row);
                }
            }
        }

        w.put_u8(UPLINK_TAIL);
        let len = w.finish();
        debug_assert_eq!(len, kind.frame_len());
        Ok(len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_UPLINK_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_UPLINK_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }

    /// Decode one complete uplink frame
    ///
    /// `bytes` must hold exactly one frame. No field of a rejected frame is
    /// returned.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let (&header, rest) = bytes.split_first().ok_or(FrameError::Incomplete)?;
        if header != UPLINK_HEADER {
            return Err(FrameError::InvalidHeader);
        }
        let &tag = rest.first().ok_or(FrameError::Incomplete)?;
        let kind = UplinkKind::from_tag(tag).ok_or(FrameError::UnknownTag)?;

        let len = kind.frame_len();
        if bytes.len() < len {
            return Err(FrameError::Incomplete);
        }
        if bytes.len() > len {
            return Err(FrameError::InvalidLength);
        }
        if bytes[len - 2] != UPLINK_TAIL {
            return Err(FrameError::InvalidTail);
        }
        if crc8(&bytes[..len - 1]) != bytes[len - 1] {
            return Err(FrameError::InvalidChecksum);
        }

        let mut r = Reader::new(&bytes[2..len - 2]);
        let frame = match kind {
            UplinkKind::Stop => Uplink::Stop,
            UplinkKind::Auto | UplinkKind::Tower => {
                let cmd = DriveCommand {
                    switch: r.u8(),
                    speed: r.i16(),
                    servos: r.f32_array(),
                };
                if kind == UplinkKind::Auto {
                    Uplink::Auto(cmd)
                } else {
                    Uplink::Tower(cmd)
                }
            }
            UplinkKind::Servo => Uplink::Servo(r.f32_array()),
            UplinkKind::Pid => Uplink::Pid {
                marker: r.u8(),
                gains: PidGains::from_array(r.f32_array()),
            },
            UplinkKind::Jacobian => {
                Uplink::Jacobian([r.f32_array(), r.f32_array(), r.f32_array()])
            }
        };

        Ok(frame)
    }
}
