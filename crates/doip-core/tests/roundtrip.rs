//! Header encode-then-decode is the identity for every payload type this
//! gateway recognises.

use doip_core::header::{DoipHeader, PayloadType};
use doip_core::{decode_frame, encode_frame};

const ALL_PAYLOAD_TYPES: &[PayloadType] = &[
    PayloadType::GenericHeaderNack,
    PayloadType::VehicleIdentificationRequest,
    PayloadType::VehicleIdentificationRequestByEid,
    PayloadType::VehicleAnnouncement,
    PayloadType::RoutingActivationRequest,
    PayloadType::RoutingActivationResponse,
    PayloadType::AliveCheckRequest,
    PayloadType::AliveCheckResponse,
    PayloadType::EntityStatusRequest,
    PayloadType::EntityStatusResponse,
    PayloadType::DiagnosticPowerModeRequest,
    PayloadType::DiagnosticPowerModeResponse,
    PayloadType::DiagnosticMessage,
    PayloadType::DiagnosticMessagePositiveAck,
    PayloadType::DiagnosticMessageNegativeAck,
];

#[test]
fn every_known_payload_type_round_trips() {
    for &payload_type in ALL_PAYLOAD_TYPES {
        let body = vec![0xAB; 4];
        let frame = encode_frame(0x02, payload_type, &body);
        let decoded = decode_frame(&frame).expect("decode should succeed");
        assert_eq!(decoded.header.payload_type_code, payload_type.code());
        assert_eq!(decoded.body, body.as_slice());
        assert_eq!(decoded.consumed, frame.len());
    }
}

#[test]
fn empty_body_is_valid_for_vehicle_identification_request() {
    let frame = encode_frame(0x02, PayloadType::VehicleIdentificationRequest, &[]);
    let decoded = decode_frame(&frame).unwrap();
    assert_eq!(decoded.header.payload_length, 0);
    assert!(decoded.body.is_empty());
}

#[test]
fn header_round_trip_preserves_inverse_relationship() {
    let header = DoipHeader::new(0x02, PayloadType::AliveCheckRequest, 0);
    assert_eq!(header.inverse_protocol_version, header.protocol_version ^ 0xFF);
}
