//! Protocol module for decoding sensor payloads.
//!
//! This module contains the characteristic registry and the frame decoder
//! that turns raw notification and read payloads into typed values.

pub mod frames;

pub use frames::{
    CharacteristicSpec, DecodeKind, DecodedValue, FrameDecoder, RawFrame, SensorValue, FRAME_LEN,
    SENSOR_CHARACTERISTICS,
};
