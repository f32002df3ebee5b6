//! BLE Service and Characteristic UUIDs.
//!
//! Contains all UUID constants used for SensorData peripheral communication.

use uuid::Uuid;

/// SensorData service UUID.
pub const SENSOR_SERVICE_UUID: Uuid = Uuid::from_u128(0x19b1_0000_e8f2_537e_4f6c_d104_768a_1214);

/// Accelerometer X axis characteristic UUID (Read, Notify).
pub const ACCEL_X_UUID: Uuid = Uuid::from_u128(0x19b1_0001_e8f2_537e_4f6c_d104_768a_1214);
/// Accelerometer Y axis characteristic UUID (Read, Notify).
pub const ACCEL_Y_UUID: Uuid = Uuid::from_u128(0x19b1_0002_e8f2_537e_4f6c_d104_768a_1214);
/// Accelerometer Z axis characteristic UUID (Read, Notify).
pub const ACCEL_Z_UUID: Uuid = Uuid::from_u128(0x19b1_0003_e8f2_537e_4f6c_d104_768a_1214);
/// Hall effect sensor characteristic UUID (Read, Notify).
pub const HALL_SIGNAL_UUID: Uuid = Uuid::from_u128(0x19b1_0004_e8f2_537e_4f6c_d104_768a_1214);
/// Gun telemetry characteristic UUID (Read, Notify).
pub const GUNDATA_UUID: Uuid = Uuid::from_u128(0x19b1_0005_e8f2_537e_4f6c_d104_768a_1214);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        // Verify UUIDs are properly formatted
        let service = SENSOR_SERVICE_UUID.to_string();
        assert!(service.contains("19b10000"));

        let accel_x = ACCEL_X_UUID.to_string();
        assert!(accel_x.contains("19b10001"));

        let gundata = GUNDATA_UUID.to_string();
        assert!(gundata.contains("19b10005"));
    }

    #[test]
    fn test_characteristics_share_service_suffix() {
        let suffix = &SENSOR_SERVICE_UUID.to_string()[8..];
        for uuid in [
            ACCEL_X_UUID,
            ACCEL_Y_UUID,
            ACCEL_Z_UUID,
            HALL_SIGNAL_UUID,
            GUNDATA_UUID,
        ] {
            assert!(uuid.to_string().ends_with(suffix));
        }
    }
}
