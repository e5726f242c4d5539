use jd_icd::{
    CodecError, ControlFlags, ControlPacket, ControlPacketType, DeviceFlags, DeviceRecord,
    DriverRole, RawPacket, CONTROL_DATA_SIZE, CONTROL_PACKET_SIZE, DEVICE_RECORD_SIZE,
    LOGIC_ADDRESS, PACKET_DATA_SIZE,
};

fn sample_record() -> DeviceRecord {
    DeviceRecord {
        address: 0x2A,
        serial_number: 0x0102_0304,
        driver_class: 0x0A0B_0C0D,
        flags: DeviceFlags::LOCAL | DeviceFlags::PAIRABLE | DeviceFlags::INITIALISED,
        rolling_counter: 0x1122_3344,
    }
}

// ---------------------------------------------------------------------------
// DeviceRecord
// ---------------------------------------------------------------------------

#[test]
fn device_record_layout_is_fixed() {
    let bytes = sample_record().encode();

    assert_eq!(bytes.len(), DEVICE_RECORD_SIZE);
    assert_eq!(bytes[0], 0x2A);
    assert_eq!(bytes[1..5], [0x04, 0x03, 0x02, 0x01]);
    assert_eq!(bytes[5..9], [0x0D, 0x0C, 0x0B, 0x0A]);
    assert_eq!(bytes[9..11], [0x80, 0x48]);
    assert_eq!(bytes[11..15], [0x44, 0x33, 0x22, 0x11]);
}

#[test]
fn device_record_survives_control_payload() {
    let record = sample_record();
    let mut cp = ControlPacket::directed_at(&record, ControlPacketType::PairingRequest);

    cp.set_device(&record);

    assert_eq!(cp.device(), record);
    assert_eq!(DeviceRecord::decode(&cp.data).unwrap(), record);
}

#[test]
fn device_record_keeps_unknown_flag_bits() {
    let mut bytes = sample_record().encode();
    bytes[9] |= 0x01;

    let decoded = DeviceRecord::decode(&bytes).unwrap();

    assert_eq!(decoded.flags.bits() & 0x0001, 0x0001);
    assert_eq!(decoded.encode(), bytes);
}

#[test]
fn device_record_rejects_short_input() {
    let bytes = sample_record().encode();

    assert_eq!(
        DeviceRecord::decode(&bytes[..10]),
        Err(CodecError::Truncated { expected: DEVICE_RECORD_SIZE, actual: 10 })
    );
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[test]
fn role_presets_replace_role_bits_only() {
    let mut record = sample_record();
    record.flags |= DeviceFlags::CP_SEEN | DeviceFlags::PAIRED;

    record.set_role(DriverRole::Paired);

    assert_eq!(
        record.flags,
        DeviceFlags::BROADCAST | DeviceFlags::PAIR | DeviceFlags::INITIALISED | DeviceFlags::CP_SEEN
    );
    assert!(record.is_connected());
    assert!(!record.is_paired());
}

#[test]
fn new_record_starts_unaddressed_in_role() {
    let record = DeviceRecord::new(9, 77, DriverRole::PairableHost);

    assert_eq!(record.address, 0);
    assert_eq!(record.rolling_counter, 0);
    assert!(record.is_pairable());
    assert!(!record.is_connected());
    assert_eq!(record.flags, DeviceFlags::LOCAL | DeviceFlags::PAIRABLE);
}

#[test]
fn set_mode_ignores_connection_bits() {
    let mut record = DeviceRecord::new(9, 77, DriverRole::Host);

    record.set_mode(DeviceFlags::REMOTE | DeviceFlags::INITIALISED);

    assert_eq!(record.flags, DeviceFlags::REMOTE);
}

// ---------------------------------------------------------------------------
// ControlPacket
// ---------------------------------------------------------------------------

#[test]
fn control_packet_layout_is_fixed() {
    let mut cp = ControlPacket::directed_at(&sample_record(), ControlPacketType::PairingRequest);
    cp.flags = ControlFlags::NACK;
    cp.data[0] = 0xEE;
    cp.data[CONTROL_DATA_SIZE - 1] = 0xFF;

    let bytes = cp.encode();

    assert_eq!(bytes.len(), CONTROL_PACKET_SIZE);
    assert_eq!(bytes[0], 0x2A);
    assert_eq!(bytes[1..5], [0x0D, 0x0C, 0x0B, 0x0A]);
    assert_eq!(bytes[5..9], [0x04, 0x03, 0x02, 0x01]);
    assert_eq!(bytes[9], 2);
    assert_eq!(bytes[10], 0x01);
    assert_eq!(bytes[11], 0xEE);
    assert_eq!(bytes[CONTROL_PACKET_SIZE - 1], 0xFF);
    assert_eq!(ControlPacket::decode(&bytes).unwrap(), cp);
}

#[test]
fn unknown_packet_types_pass_through() {
    let mut bytes = ControlPacket::directed_at(&sample_record(), ControlPacketType::Hello).encode();
    bytes[9] = 0x7F;

    let cp = ControlPacket::decode(&bytes).unwrap();

    assert_eq!(cp.packet_type, ControlPacketType::Other(0x7F));
    assert_eq!(cp.encode(), bytes);
}

#[test]
fn nack_flag_is_bit_zero() {
    let mut bytes = [0u8; CONTROL_PACKET_SIZE];
    bytes[10] = 0b1000_0001;

    let cp = ControlPacket::decode(&bytes).unwrap();

    assert!(cp.is_nack());
    assert_eq!(cp.flags.bits(), 0b1000_0001);
}

#[test]
fn control_packet_rejects_short_input() {
    assert_eq!(
        ControlPacket::decode(&[0u8; 11]),
        Err(CodecError::Truncated { expected: CONTROL_PACKET_SIZE, actual: 11 })
    );
}

// ---------------------------------------------------------------------------
// RawPacket
// ---------------------------------------------------------------------------

#[test]
fn control_frame_goes_to_logic_channel() {
    let cp = ControlPacket::directed_at(&sample_record(), ControlPacketType::Hello);

    let frame = RawPacket::control(&cp);

    assert_eq!(frame.address, LOGIC_ADDRESS);
    assert_eq!(frame.payload().len(), CONTROL_PACKET_SIZE);
    assert_eq!(frame.as_control(), cp);
    assert_eq!(frame.try_control(), Ok(cp));
}

#[test]
fn short_frame_is_not_a_control_packet() {
    let frame = RawPacket::new(5, &[1, 2, 3]).unwrap();

    assert_eq!(frame.payload(), &[1, 2, 3]);
    assert!(matches!(frame.try_control(), Err(CodecError::Truncated { .. })));
}

#[test]
fn oversized_payload_is_rejected() {
    let payload = [0u8; PACKET_DATA_SIZE + 1];

    assert_eq!(
        RawPacket::new(5, &payload),
        Err(CodecError::Oversized { max: PACKET_DATA_SIZE, actual: PACKET_DATA_SIZE + 1 })
    );
}

#[test]
fn fixed_size_views_match_slice_decoding() {
    let mut cp = ControlPacket::directed_at(&sample_record(), ControlPacketType::PairingRequest);
    cp.set_device(&sample_record());
    let bytes = cp.encode();

    assert_eq!(ControlPacket::from_bytes(&bytes), cp);
    assert_eq!(DeviceRecord::from_bytes(&sample_record().encode()), sample_record());

    // Bytes past the control packet do not leak into it.
    let mut frame = RawPacket::control(&cp);
    frame.data[CONTROL_PACKET_SIZE..].fill(0xFF);
    assert_eq!(frame.as_control(), cp);
    assert_eq!(frame.as_control().device(), sample_record());
}
