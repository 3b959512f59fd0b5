//! Cross-encoder invariants exercised through the public API: sequence
//! continuity, marker cadence, shared header fields, payload bounds, and
//! payload-format round trips.

use std::time::Duration;

use rtp_payload::{
    AacEncoderConfig, H264EncoderConfig, RtpPacket, Vp9EncoderConfig, DEFAULT_PAYLOAD_MAX_SIZE,
};

const PT: u8 = 96;
const SSRC: u32 = 0x9dbb_7812;
const FIRST_SEQ: u16 = 0x44ed;

fn h264_encoder() -> rtp_payload::H264Encoder {
    let mut config = H264EncoderConfig::new(PT);
    config.ssrc = Some(SSRC);
    config.initial_sequence_number = Some(FIRST_SEQ);
    config.init()
}

/// Assert the per-call guarantees every encoder shares: at least one
/// packet, constant header fields, consecutive sequence numbers, a single
/// trailing marker, and payloads within the ceiling.
fn assert_call_invariants(packets: &[RtpPacket], first_seq: u16, max_payload: usize) {
    assert!(!packets.is_empty(), "non-empty input must yield packets");
    for (i, packet) in packets.iter().enumerate() {
        assert_eq!(packet.header.version, 2);
        assert_eq!(packet.header.payload_type, PT);
        assert_eq!(packet.header.ssrc, SSRC);
        assert_eq!(
            packet.header.timestamp, packets[0].header.timestamp,
            "all packets of one call share the timestamp"
        );
        assert_eq!(
            packet.header.sequence_number,
            first_seq.wrapping_add(i as u16),
            "sequence numbers must be consecutive"
        );
        assert_eq!(
            packet.header.marker,
            i == packets.len() - 1,
            "marker must be set on the last packet only"
        );
        assert!(
            packet.payload.len() <= max_payload,
            "payload of {} bytes exceeds the {} ceiling",
            packet.payload.len(),
            max_payload
        );
    }
}

#[test]
fn h264_call_invariants() {
    let mut encoder = h264_encoder();
    let big = [0xAB; 5000];
    let nalus: &[&[u8]] = &[&[0x67, 0x42], &[0x68, 0xCE], &big, &[0x65, 0x11]];

    let packets = encoder.encode(nalus, Duration::ZERO).expect("encode");
    assert_call_invariants(&packets, FIRST_SEQ, DEFAULT_PAYLOAD_MAX_SIZE);

    let next = encoder
        .encode(&[&[0x41, 0x9a]], Duration::from_millis(40))
        .expect("encode");
    assert_call_invariants(
        &next,
        FIRST_SEQ.wrapping_add(packets.len() as u16),
        DEFAULT_PAYLOAD_MAX_SIZE,
    );
}

#[test]
fn aac_call_invariants() {
    let mut config = AacEncoderConfig::new(PT, 48_000);
    config.ssrc = Some(SSRC);
    config.initial_sequence_number = Some(FIRST_SEQ);
    let mut encoder = config.init();

    // One aggregation batch.
    let packets = encoder
        .encode(&[&[0x01; 300], &[0x02; 300]], Duration::ZERO)
        .expect("encode");
    assert_call_invariants(&packets, FIRST_SEQ, DEFAULT_PAYLOAD_MAX_SIZE);

    // One fragment sequence; fragments share the batch timestamp.
    let big = [0xCD; 4000];
    let next = encoder.encode(&[&big], Duration::ZERO).expect("encode");
    assert!(next.len() > 1);
    assert_call_invariants(
        &next,
        FIRST_SEQ.wrapping_add(packets.len() as u16),
        DEFAULT_PAYLOAD_MAX_SIZE,
    );
}

#[test]
fn aac_later_batches_advance_on_the_media_clock() {
    let mut config = AacEncoderConfig::new(PT, 48_000);
    config.ssrc = Some(SSRC);
    config.initial_sequence_number = Some(FIRST_SEQ);
    let mut encoder = config.init();

    // Three AUs that cannot share one packet: every batch boundary moves
    // the timestamp forward by the batch length in clock ticks.
    let au = [0x42; 800];
    let packets = encoder.encode(&[&au, &au, &au], Duration::ZERO).expect("encode");
    assert!(packets.len() > 1);
    for pair in packets.windows(2) {
        assert!(
            pair[1].header.timestamp >= pair[0].header.timestamp,
            "timestamps must be non-decreasing across batches"
        );
        assert_eq!(
            pair[1].header.sequence_number,
            pair[0].header.sequence_number.wrapping_add(1)
        );
    }
    assert!(packets.last().unwrap().header.marker);
}

#[test]
fn vp9_call_invariants() {
    let mut config = Vp9EncoderConfig::new(PT);
    config.ssrc = Some(SSRC);
    config.initial_sequence_number = Some(FIRST_SEQ);
    let mut encoder = config.init();

    let frame = [0xEF; 10_000];
    let packets = encoder.encode(&frame, Duration::ZERO).expect("encode");
    assert_call_invariants(&packets, FIRST_SEQ, DEFAULT_PAYLOAD_MAX_SIZE);

    // Descriptor flags: B on the first packet, E on the last.
    assert_eq!(packets[0].payload[0] & 0x08, 0x08);
    assert_eq!(packets.last().unwrap().payload[0] & 0x04, 0x04);
    for packet in &packets[1..packets.len() - 1] {
        assert_eq!(packet.payload[0] & 0x0c, 0);
    }
}

#[test]
fn sequence_wraps_across_calls() {
    let mut config = H264EncoderConfig::new(PT);
    config.ssrc = Some(SSRC);
    config.initial_sequence_number = Some(u16::MAX);
    let mut encoder = config.init();

    let big = [0x05; 3000];
    let packets = encoder.encode(&[&big], Duration::ZERO).expect("encode");
    assert_eq!(packets.len(), 3);
    assert_eq!(packets[0].header.sequence_number, u16::MAX);
    assert_eq!(packets[1].header.sequence_number, 0);
    assert_eq!(packets[2].header.sequence_number, 1);

    let next = encoder.encode(&[&[0x09, 0xF0]], Duration::ZERO).expect("encode");
    assert_eq!(next[0].header.sequence_number, 2);
}

#[test]
fn fu_a_fragments_reassemble_to_the_nalu() {
    let mut nalu = vec![0x65];
    nalu.extend((0..4000u32).map(|i| i as u8));

    let packets = h264_encoder().encode(&[&nalu], Duration::ZERO).expect("encode");
    assert!(packets.len() > 1);

    // S bit on the first fragment, E bit on the last, none in between.
    assert_eq!(packets[0].payload[1] & 0x80, 0x80);
    assert_eq!(packets.last().unwrap().payload[1] & 0x40, 0x40);

    let mut body = Vec::new();
    for packet in &packets {
        assert_eq!(packet.payload[0] & 0x1f, 28, "FU-A type");
        body.extend_from_slice(&packet.payload[2..]);
    }

    let mut reassembled = vec![(packets[0].payload[0] & 0xe0) | (packets[0].payload[1] & 0x1f)];
    reassembled.extend_from_slice(&body);
    assert_eq!(reassembled, nalu);
}

#[test]
fn stap_a_disaggregates_to_the_nalu_list() {
    let nalus: [&[u8]; 3] = [&[0x09, 0xF0], &[0x67, 0x42, 0x00], &[0x68, 0xCE]];

    let packets = h264_encoder().encode(&nalus, Duration::ZERO).expect("encode");
    assert_eq!(packets.len(), 1);
    let payload = &packets[0].payload;
    assert_eq!(payload[0] & 0x1f, 24, "STAP-A type");

    let mut recovered: Vec<&[u8]> = Vec::new();
    let mut pos = 1;
    while pos < payload.len() {
        let size = u16::from_be_bytes([payload[pos], payload[pos + 1]]) as usize;
        pos += 2;
        recovered.push(&payload[pos..pos + size]);
        pos += size;
    }
    assert_eq!(recovered, nalus);
}

#[test]
fn random_defaults_differ_between_instances() {
    let mut h264_a = H264EncoderConfig::new(PT).init();
    let mut h264_b = H264EncoderConfig::new(PT).init();
    let pkt_a = h264_a.encode(&[&[0x09, 0xF0]], Duration::ZERO).expect("encode");
    let pkt_b = h264_b.encode(&[&[0x09, 0xF0]], Duration::ZERO).expect("encode");
    assert_ne!(
        (pkt_a[0].header.ssrc, pkt_a[0].header.sequence_number, pkt_a[0].header.timestamp),
        (pkt_b[0].header.ssrc, pkt_b[0].header.sequence_number, pkt_b[0].header.timestamp),
        "random defaults must differ across instances"
    );

    let mut vp9_a = Vp9EncoderConfig::new(PT).init();
    let mut vp9_b = Vp9EncoderConfig::new(PT).init();
    let frame = [0x01, 0x02, 0x03];
    let vp9_pkt_a = vp9_a.encode(&frame, Duration::ZERO).expect("encode");
    let vp9_pkt_b = vp9_b.encode(&frame, Duration::ZERO).expect("encode");
    assert_ne!(vp9_pkt_a[0].header.ssrc, vp9_pkt_b[0].header.ssrc);
}

#[test]
fn preset_fields_are_preserved_exactly() {
    let mut config = AacEncoderConfig::new(PT, 44_100);
    config.ssrc = Some(1);
    config.initial_sequence_number = Some(2);
    config.initial_timestamp = Some(3);
    let mut encoder = config.init();

    let packets = encoder.encode(&[&[0xAA]], Duration::ZERO).expect("encode");
    assert_eq!(packets[0].header.ssrc, 1);
    assert_eq!(packets[0].header.sequence_number, 2);
    assert_eq!(packets[0].header.timestamp, 3);
}

#[test]
fn packets_own_their_payloads() {
    let mut input = vec![0x09, 0xF0];
    let packets = h264_encoder().encode(&[&input], Duration::ZERO).expect("encode");

    input[0] = 0xFF;
    assert_eq!(packets[0].payload, vec![0x09, 0xF0]);
}
