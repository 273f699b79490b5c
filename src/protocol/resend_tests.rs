use super::*;

#[test]
fn encode_layout() {
    let request = ResendRequest {
        control_seq: 0x0102,
        first_seq: 0x0304,
        count: 0x0506,
    };
    let bytes = request.encode();

    assert_eq!(
        bytes,
        [0x80, 0xD5, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06]
    );
}

#[test]
fn roundtrip() {
    let request = ResendRequest {
        control_seq: 9,
        first_seq: 102,
        count: 1,
    };
    let decoded = ResendRequest::decode(&request.encode()).unwrap();
    assert_eq!(decoded, request);
}

#[test]
fn decode_rejects_short() {
    assert!(ResendRequest::decode(&[0x80, 0xD5, 0, 0]).is_err());
}
