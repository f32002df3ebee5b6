//! Sensor frame decoding.
//!
//! Maps raw characteristic payloads to typed sensor values using a fixed
//! registry of the five SensorData characteristics.

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use crate::ble::uuids::{ACCEL_X_UUID, ACCEL_Y_UUID, ACCEL_Z_UUID, GUNDATA_UUID, HALL_SIGNAL_UUID};
use crate::error::DecodeError;

/// Wire size of every sensor payload: one little-endian 32-bit value.
pub const FRAME_LEN: usize = 4;

/// How a characteristic's payload bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DecodeKind {
    /// IEEE-754 single-precision float, little-endian.
    Float32Le,
    /// Unsigned 32-bit integer, little-endian.
    UInt32Le,
}

/// Static description of one sensor characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicSpec {
    /// Logical sensor name.
    pub name: &'static str,
    /// Wire identifier the peripheral exposes the value under.
    pub uuid: Uuid,
    /// Payload interpretation.
    pub kind: DecodeKind,
}

/// The five SensorData characteristics, in read order.
pub const SENSOR_CHARACTERISTICS: [CharacteristicSpec; 5] = [
    CharacteristicSpec {
        name: "x",
        uuid: ACCEL_X_UUID,
        kind: DecodeKind::Float32Le,
    },
    CharacteristicSpec {
        name: "y",
        uuid: ACCEL_Y_UUID,
        kind: DecodeKind::Float32Le,
    },
    CharacteristicSpec {
        name: "z",
        uuid: ACCEL_Z_UUID,
        kind: DecodeKind::Float32Le,
    },
    CharacteristicSpec {
        name: "hall_signal",
        uuid: HALL_SIGNAL_UUID,
        kind: DecodeKind::UInt32Le,
    },
    CharacteristicSpec {
        name: "gundata",
        uuid: GUNDATA_UUID,
        kind: DecodeKind::UInt32Le,
    },
];

/// A raw notification or read payload, tagged with its source characteristic.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// UUID of the characteristic the payload arrived under.
    pub characteristic: Uuid,
    /// The payload bytes as delivered by the peripheral.
    pub payload: Vec<u8>,
}

/// A typed sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SensorValue {
    /// A [`DecodeKind::Float32Le`] reading.
    Float(f32),
    /// A [`DecodeKind::UInt32Le`] reading.
    Unsigned(u32),
}

impl SensorValue {
    /// Get the float reading, if this is one.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Unsigned(_) => None,
        }
    }

    /// Get the unsigned reading, if this is one.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Float(_) => None,
            Self::Unsigned(value) => Some(*value),
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(value) => write!(f, "{value:.2}"),
            Self::Unsigned(value) => write!(f, "{value}"),
        }
    }
}

/// A decoded frame: the logical sensor name plus its typed reading.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DecodedValue {
    /// Logical sensor name from the registry.
    pub name: &'static str,
    /// The characteristic the value was read from.
    pub characteristic: Uuid,
    /// The typed reading.
    pub value: SensorValue,
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

/// Stateless decoder mapping characteristic UUIDs to typed values.
///
/// The lookup table is built once from [`SENSOR_CHARACTERISTICS`]; decoding
/// holds no further state, so one decoder serves any number of frames and
/// every frame is decoded independently of the next.
pub struct FrameDecoder {
    /// Registry entries keyed by full characteristic UUID.
    by_uuid: HashMap<Uuid, CharacteristicSpec>,
}

impl FrameDecoder {
    /// Create a decoder over the fixed sensor registry.
    pub fn new() -> Self {
        let by_uuid = SENSOR_CHARACTERISTICS
            .iter()
            .map(|spec| (spec.uuid, *spec))
            .collect();

        Self { by_uuid }
    }

    /// Look up the registry entry for a characteristic.
    pub fn spec(&self, characteristic: &Uuid) -> Option<&CharacteristicSpec> {
        self.by_uuid.get(characteristic)
    }

    /// Check whether a characteristic is part of the sensor registry.
    pub fn is_registered(&self, characteristic: &Uuid) -> bool {
        self.by_uuid.contains_key(characteristic)
    }

    /// Decode a payload delivered under the given characteristic.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnknownIdentifier`] for characteristics outside
    /// the registry and [`DecodeError::MalformedPayload`] when the payload is
    /// not exactly [`FRAME_LEN`] bytes.
    pub fn decode(
        &self,
        characteristic: &Uuid,
        payload: &[u8],
    ) -> std::result::Result<DecodedValue, DecodeError> {
        let spec = self
            .by_uuid
            .get(characteristic)
            .ok_or(DecodeError::UnknownIdentifier {
                uuid: *characteristic,
            })?;

        let bytes: [u8; FRAME_LEN] =
            payload
                .try_into()
                .map_err(|_| DecodeError::MalformedPayload {
                    name: spec.name,
                    expected: FRAME_LEN,
                    actual: payload.len(),
                })?;

        let value = match spec.kind {
            DecodeKind::Float32Le => SensorValue::Float(f32::from_le_bytes(bytes)),
            DecodeKind::UInt32Le => SensorValue::Unsigned(u32::from_le_bytes(bytes)),
        };

        Ok(DecodedValue {
            name: spec.name,
            characteristic: spec.uuid,
            value,
        })
    }

    /// Decode a tagged frame.
    pub fn decode_frame(&self, frame: &RawFrame) -> std::result::Result<DecodedValue, DecodeError> {
        self.decode(&frame.characteristic, &frame.payload)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn registry_kinds_match_sensors() {
        let decoder = FrameDecoder::new();

        for spec in &SENSOR_CHARACTERISTICS {
            let expected = match spec.name {
                "x" | "y" | "z" => DecodeKind::Float32Le,
                "hall_signal" | "gundata" => DecodeKind::UInt32Le,
                other => panic!("unexpected sensor {other}"),
            };
            assert_eq!(decoder.spec(&spec.uuid).expect("registered").kind, expected);
        }
    }

    #[test]
    fn registry_identifiers_are_unique() {
        let mut uuids: Vec<_> = SENSOR_CHARACTERISTICS.iter().map(|s| s.uuid).collect();
        uuids.sort();
        uuids.dedup();
        assert_eq!(uuids.len(), SENSOR_CHARACTERISTICS.len());

        let mut names: Vec<_> = SENSOR_CHARACTERISTICS.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SENSOR_CHARACTERISTICS.len());
    }

    #[test]
    fn decodes_accelerometer_float() {
        let decoder = FrameDecoder::new();

        let value = decoder
            .decode(&ACCEL_X_UUID, &1.23f32.to_le_bytes())
            .unwrap();

        assert_eq!(value.name, "x");
        assert_eq!(value.characteristic, ACCEL_X_UUID);
        assert_eq!(value.value, SensorValue::Float(1.23));
    }

    #[test]
    fn decodes_hall_signal_unsigned() {
        let decoder = FrameDecoder::new();

        let value = decoder
            .decode(&HALL_SIGNAL_UUID, &123u32.to_le_bytes())
            .unwrap();

        assert_eq!(value.name, "hall_signal");
        assert_eq!(value.value, SensorValue::Unsigned(123));
    }

    #[test]
    fn every_registered_characteristic_decodes() {
        let decoder = FrameDecoder::new();

        for spec in &SENSOR_CHARACTERISTICS {
            let value = decoder.decode(&spec.uuid, &[0u8; FRAME_LEN]).unwrap();
            match spec.kind {
                DecodeKind::Float32Le => assert!(value.value.as_f32().is_some()),
                DecodeKind::UInt32Le => assert!(value.value.as_u32().is_some()),
            }
        }
    }

    #[test]
    fn unknown_characteristic_is_rejected() {
        let decoder = FrameDecoder::new();
        let stray = Uuid::from_u128(0xdead_beef);

        assert!(!decoder.is_registered(&stray));

        let err = decoder.decode(&stray, &[0u8; FRAME_LEN]).unwrap_err();
        assert_eq!(err, DecodeError::UnknownIdentifier { uuid: stray });
    }

    #[test]
    fn short_and_long_payloads_are_rejected() {
        let decoder = FrameDecoder::new();

        for payload in [&[1u8, 2, 3][..], &[1, 2, 3, 4, 5][..], &[][..]] {
            let err = decoder.decode(&HALL_SIGNAL_UUID, payload).unwrap_err();
            assert_eq!(
                err,
                DecodeError::MalformedPayload {
                    name: "hall_signal",
                    expected: FRAME_LEN,
                    actual: payload.len(),
                }
            );
        }
    }

    #[test]
    fn decode_frame_matches_decode() {
        let decoder = FrameDecoder::new();
        let frame = RawFrame {
            characteristic: GUNDATA_UUID,
            payload: 456u32.to_le_bytes().to_vec(),
        };

        assert_eq!(
            decoder.decode_frame(&frame).unwrap(),
            decoder.decode(&GUNDATA_UUID, &frame.payload).unwrap()
        );
    }

    #[test]
    fn display_renders_name_and_value() {
        let decoder = FrameDecoder::new();

        let gundata = decoder.decode(&GUNDATA_UUID, &456u32.to_le_bytes()).unwrap();
        assert_eq!(gundata.to_string(), "gundata = 456");

        let x = decoder.decode(&ACCEL_X_UUID, &1.23f32.to_le_bytes()).unwrap();
        assert_eq!(x.to_string(), "x = 1.23");
    }

    proptest! {
        #[test]
        fn unsigned_round_trip(raw in any::<u32>()) {
            let decoder = FrameDecoder::new();
            let value = decoder.decode(&GUNDATA_UUID, &raw.to_le_bytes()).unwrap();
            prop_assert_eq!(value.value, SensorValue::Unsigned(raw));
        }

        #[test]
        fn float_round_trip_is_bit_exact(bits in any::<u32>()) {
            let decoder = FrameDecoder::new();
            let payload = f32::from_bits(bits).to_le_bytes();
            let value = decoder.decode(&ACCEL_Y_UUID, &payload).unwrap();
            match value.value {
                SensorValue::Float(v) => prop_assert_eq!(v.to_bits(), bits),
                SensorValue::Unsigned(_) => prop_assert!(false, "expected a float reading"),
            }
        }
    }
}
