//! Outbound robot command frame.
//!
//! Eleven bytes, multi-byte fields little-endian:
//!
//! | Offset | Field | Type |
//! |---|---|---|
//! | 0 | message type | `u8` |
//! | 1 | robot id | `u8` |
//! | 2 | direction | `i16` |
//! | 4 | speed | `i16` |
//! | 6 | rotation | `i16` |
//! | 8 | kick (negative = chip) | `i8` |
//! | 9 | dribble | `u8`, `0` or `1` |
//! | 10 | checksum | XOR of bytes `0..10` |
//!
//! Any single corrupted byte changes the XOR, so [`CommandCodec::decode`]
//! rejects it.

use striker_types::{RobotCommand, StrikerError};

pub const FRAME_LEN: usize = 11;

pub type Frame = [u8; FRAME_LEN];

/// Stateless encoder/decoder for [`RobotCommand`] frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandCodec;

impl CommandCodec {
    pub fn encode(command: &RobotCommand) -> Frame {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = command.message_type;
        frame[1] = command.robot_id;
        frame[2..4].copy_from_slice(&command.direction.to_le_bytes());
        frame[4..6].copy_from_slice(&command.speed.to_le_bytes());
        frame[6..8].copy_from_slice(&command.rotation.to_le_bytes());
        frame[8] = command.kick.to_le_bytes()[0];
        frame[9] = u8::from(command.dribble);
        frame[10] = checksum(&frame[..10]);
        frame
    }

    pub fn decode(bytes: &[u8]) -> Result<RobotCommand, StrikerError> {
        let frame: &Frame = bytes.try_into().map_err(|_| {
            StrikerError::Codec(format!("expected {FRAME_LEN} bytes, got {}", bytes.len()))
        })?;
        let expected = checksum(&frame[..10]);
        if frame[10] != expected {
            return Err(StrikerError::Codec(format!(
                "checksum mismatch: frame has {:#04x}, computed {expected:#04x}",
                frame[10]
            )));
        }
        let dribble = match frame[9] {
            0 => false,
            1 => true,
            other => return Err(StrikerError::Codec(format!("invalid dribble byte {other}"))),
        };
        Ok(RobotCommand {
            message_type: frame[0],
            robot_id: frame[1],
            direction: i16::from_le_bytes([frame[2], frame[3]]),
            speed: i16::from_le_bytes([frame[4], frame[5]]),
            rotation: i16::from_le_bytes([frame[6], frame[7]]),
            kick: i8::from_le_bytes([frame[8]]),
            dribble,
        })
    }
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use striker_types::command::MESSAGE_TYPE_DRIVE;

    fn sample() -> RobotCommand {
        RobotCommand {
            message_type: MESSAGE_TYPE_DRIVE,
            robot_id: 4,
            direction: -135,
            speed: 1200,
            rotation: -9,
            kick: -40,
            dribble: true,
        }
    }

    #[test]
    fn frame_layout_is_little_endian() {
        let frame = CommandCodec::encode(&sample());
        assert_eq!(frame[0], MESSAGE_TYPE_DRIVE);
        assert_eq!(frame[1], 4);
        assert_eq!(&frame[2..4], &(-135i16).to_le_bytes());
        assert_eq!(&frame[4..6], &[0xb0u8, 0x04]);
        assert_eq!(frame[8], 0xd8);
        assert_eq!(frame[9], 1);
        assert_eq!(frame[10], checksum(&frame[..10]));
    }

    #[test]
    fn decode_inverts_encode() -> Result<(), Box<dyn std::error::Error>> {
        let command = sample();
        assert_eq!(CommandCodec::decode(&CommandCodec::encode(&command))?, command);
        let stop = RobotCommand::stop(11);
        assert_eq!(CommandCodec::decode(&CommandCodec::encode(&stop))?, stop);
        Ok(())
    }

    #[test]
    fn every_single_byte_corruption_is_rejected() {
        let frame = CommandCodec::encode(&sample());
        for index in 0..FRAME_LEN {
            for flip in [0x01u8, 0x80, 0xff] {
                let mut corrupted = frame;
                corrupted[index] ^= flip;
                assert!(
                    CommandCodec::decode(&corrupted).is_err(),
                    "byte {index} xor {flip:#04x} was accepted"
                );
            }
        }
    }

    #[test]
    fn wrong_length_is_rejected() {
        let frame = CommandCodec::encode(&sample());
        assert!(CommandCodec::decode(&frame[..10]).is_err());
        let mut long = frame.to_vec();
        long.push(0);
        assert!(matches!(CommandCodec::decode(&long), Err(StrikerError::Codec(_))));
    }

    #[test]
    fn invalid_dribble_byte_is_rejected() {
        let mut frame = CommandCodec::encode(&sample());
        frame[9] = 2;
        frame[10] = checksum(&frame[..10]);
        let err = CommandCodec::decode(&frame);
        assert!(matches!(err, Err(StrikerError::Codec(ref m)) if m.contains("dribble")));
    }
}
