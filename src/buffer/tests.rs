use super::*;
use proptest::prelude::*;

fn header(seq: u16) -> SlotHeader {
    SlotHeader {
        sequence: seq,
        rtp_timestamp: u32::from(seq) * 352,
        ssrc: 0x1234_5678,
        payload_type: 0x60,
        flags: 0x80,
    }
}

fn pcm_for(seq: u16) -> Vec<u8> {
    vec![seq as u8; 64]
}

fn admit(buffer: &mut CircularBuffer, seq: u16) -> AdmitOutcome {
    buffer.admit(header(seq), &pcm_for(seq))
}

fn drain(buffer: &mut CircularBuffer, no_resend: bool) -> Vec<DequeuedFrame> {
    let mut out = Vec::new();
    while let Some(frame) = buffer.dequeue(no_resend) {
        out.push(frame);
    }
    out
}

#[test]
fn admit_then_dequeue_single() {
    let mut buffer = CircularBuffer::new(64);
    assert!(buffer.is_empty());
    assert_eq!(admit(&mut buffer, 100), AdmitOutcome::Admitted);
    assert!(!buffer.is_empty());

    let frame = buffer.dequeue(false).unwrap();
    assert_eq!(frame.sequence, 100);
    assert_eq!(frame.rtp_timestamp, 100 * 352);
    assert_eq!(frame.pcm, pcm_for(100));
    assert!(buffer.is_empty());
    assert!(buffer.dequeue(false).is_none());
}

#[test]
fn duplicate_admit_is_reported() {
    let mut buffer = CircularBuffer::new(64);
    assert_eq!(admit(&mut buffer, 10), AdmitOutcome::Admitted);
    assert_eq!(admit(&mut buffer, 10), AdmitOutcome::Duplicate);

    // Unrelated admits in between do not change the outcome
    assert_eq!(admit(&mut buffer, 11), AdmitOutcome::Admitted);
    assert_eq!(admit(&mut buffer, 10), AdmitOutcome::Duplicate);
}

#[test]
fn late_packet_is_old() {
    let mut buffer = CircularBuffer::new(64);
    admit(&mut buffer, 100);
    admit(&mut buffer, 101);
    drain(&mut buffer, false);

    // Ring is drained but anchored: stragglers stay old
    assert_eq!(admit(&mut buffer, 99), AdmitOutcome::Old);
    assert_eq!(admit(&mut buffer, 101), AdmitOutcome::Old);
}

#[test]
fn oversize_pcm_is_rejected() {
    let mut buffer = CircularBuffer::new(16);
    assert_eq!(
        buffer.admit(header(5), &[0u8; 17]),
        AdmitOutcome::Rejected
    );
    assert!(buffer.is_empty());
}

#[test]
fn resend_mode_waits_for_gap() {
    let mut buffer = CircularBuffer::new(64);
    admit(&mut buffer, 100);
    admit(&mut buffer, 101);
    let delivered = drain(&mut buffer, false);
    assert_eq!(delivered.len(), 2);

    // 102 lost; 103 arrives. The anchored cursor keeps the gap visible.
    admit(&mut buffer, 103);
    assert_eq!(buffer.first_seq(), 102);
    assert!(buffer.dequeue(false).is_none());
    assert_eq!(buffer.leading_gap(), Some((102, 1)));

    // Resend lands, stream resumes in order
    admit(&mut buffer, 102);
    let delivered: Vec<u16> = drain(&mut buffer, false).iter().map(|f| f.sequence).collect();
    assert_eq!(delivered, vec![102, 103]);
    assert_eq!(buffer.leading_gap(), None);
}

#[test]
fn no_resend_mode_drains_in_arrival_order() {
    let mut buffer = CircularBuffer::new(64);
    let mut seen = Vec::new();

    // Mirroring arrival order 100, 102, 101, 103 with a drain per admit
    for seq in [100u16, 102, 101, 103] {
        assert_eq!(admit(&mut buffer, seq), AdmitOutcome::Admitted);
        for frame in drain(&mut buffer, true) {
            seen.push(frame.sequence);
        }
    }

    assert_eq!(seen, vec![100, 102, 101, 103]);
}

#[test]
fn no_resend_mode_hands_out_missing_slot_as_silence() {
    let mut buffer = CircularBuffer::new(64);
    admit(&mut buffer, 100);
    admit(&mut buffer, 102);

    let frames = drain(&mut buffer, true);
    let sequences: Vec<u16> = frames.iter().map(|f| f.sequence).collect();
    assert_eq!(sequences, vec![100, 101, 102]);
    assert!(frames[1].pcm.is_empty());
    assert_eq!(frames[0].pcm, pcm_for(100));
    assert_eq!(frames[2].pcm, pcm_for(102));
}

#[test]
fn overrun_forces_flush_to_new_sequence() {
    let mut buffer = CircularBuffer::new(64);
    admit(&mut buffer, 100);

    let jump = 100u16.wrapping_add(1024);
    assert_eq!(admit(&mut buffer, jump), AdmitOutcome::Admitted);
    assert_eq!(buffer.first_seq(), jump);

    let delivered: Vec<u16> = drain(&mut buffer, false).iter().map(|f| f.sequence).collect();
    assert_eq!(delivered, vec![jump]);
    assert_eq!(buffer.leading_gap(), None);
}

#[test]
fn flush_anchors_at_next_sequence() {
    let mut buffer = CircularBuffer::new(64);
    for seq in 100u16..=110 {
        admit(&mut buffer, seq);
    }

    buffer.flush(200);
    assert!(buffer.is_empty());
    assert!(buffer.dequeue(false).is_none());

    // Pre-flush stragglers are gone for good
    assert_eq!(admit(&mut buffer, 150), AdmitOutcome::Old);

    for seq in 200u16..=205 {
        assert_eq!(admit(&mut buffer, seq), AdmitOutcome::Admitted);
    }
    let delivered: Vec<u16> = drain(&mut buffer, false).iter().map(|f| f.sequence).collect();
    assert_eq!(delivered, (200..=205).collect::<Vec<u16>>());
}

#[test]
fn flush_out_of_range_leaves_ring_vacant() {
    let mut buffer = CircularBuffer::new(64);
    admit(&mut buffer, 500);
    buffer.flush(-1);

    assert!(buffer.dequeue(false).is_none());
    // No anchor: anything is accepted, even "earlier" sequences
    assert_eq!(admit(&mut buffer, 3), AdmitOutcome::Admitted);
    assert_eq!(buffer.first_seq(), 3);

    admit(&mut buffer, 4);
    buffer.flush(0x10000);
    assert!(buffer.dequeue(false).is_none());
    assert_eq!(admit(&mut buffer, 1), AdmitOutcome::Admitted);
}

#[test]
fn wraparound_delivery_order() {
    let mut buffer = CircularBuffer::new(64);
    let mut seen = Vec::new();
    for seq in [65534u16, 65535, 0, 1] {
        assert_eq!(admit(&mut buffer, seq), AdmitOutcome::Admitted);
        for frame in drain(&mut buffer, false) {
            seen.push(frame.sequence);
        }
    }
    assert_eq!(seen, vec![65534, 65535, 0, 1]);
}

#[test]
fn gap_scan_reports_leading_run_only() {
    let mut buffer = CircularBuffer::new(64);
    admit(&mut buffer, 10);
    drain(&mut buffer, false);

    // Missing 11, 12, 13; 14 and 16 present
    admit(&mut buffer, 14);
    admit(&mut buffer, 16);
    assert_eq!(buffer.leading_gap(), Some((11, 3)));
}

#[test]
fn full_window_abandons_unrecovered_head() {
    let mut buffer = CircularBuffer::new(64);
    admit(&mut buffer, 0);
    drain(&mut buffer, false);

    // Fill the entire window behind a missing head
    for seq in 2u16..1025 {
        assert_eq!(admit(&mut buffer, seq), AdmitOutcome::Admitted);
    }
    assert_eq!(buffer.first_seq(), 1);

    // Head (seq 1) never arrives; the first dequeue abandons it
    assert!(buffer.dequeue(false).is_none());
    assert_eq!(buffer.first_seq(), 2);
    let frame = buffer.dequeue(false).unwrap();
    assert_eq!(frame.sequence, 2);
}

proptest! {
    // Post-admit invariants of the cursor pair.
    #[test]
    fn admit_preserves_window_invariants(
        start: u16,
        offsets in proptest::collection::vec(0u16..1024, 1..64),
    ) {
        let mut buffer = CircularBuffer::new(64);
        for offset in offsets {
            let seq = start.wrapping_add(offset);
            if admit(&mut buffer, seq) == AdmitOutcome::Admitted {
                prop_assert!(!buffer.is_empty());
                prop_assert!(!crate::seq::before(seq, buffer.first_seq()));
                prop_assert!(!crate::seq::before(buffer.last_seq(), seq));
                prop_assert!(
                    usize::from(crate::seq::distance(buffer.first_seq(), buffer.last_seq()))
                        < BUFFER_LENGTH
                );
            }
        }
    }

    // A contiguous lossless stream is delivered exactly once, in order, for
    // any interleaving of admits and dequeues, in both modes.
    #[test]
    fn contiguous_stream_exactly_once(
        start: u16,
        count in 1usize..200,
        dequeue_every in 1usize..8,
        no_resend: bool,
    ) {
        let mut buffer = CircularBuffer::new(64);
        let mut delivered = Vec::new();

        for i in 0..count {
            let seq = start.wrapping_add(i as u16);
            prop_assert_eq!(admit(&mut buffer, seq), AdmitOutcome::Admitted);
            if i % dequeue_every == 0 {
                delivered.extend(drain(&mut buffer, no_resend).iter().map(|f| f.sequence));
            }
        }
        delivered.extend(drain(&mut buffer, no_resend).iter().map(|f| f.sequence));

        let expected: Vec<u16> = (0..count).map(|i| start.wrapping_add(i as u16)).collect();
        prop_assert_eq!(delivered, expected);
    }

    // Sparse drops that are re-admitted before the window would overrun
    // still come out in order with no duplicates.
    #[test]
    fn dropped_then_resent_stream_stays_ordered(
        start: u16,
        count in 50usize..400,
        drop_seed: u64,
    ) {
        let mut buffer = CircularBuffer::new(64);
        let mut delivered = Vec::new();
        let mut dropped = Vec::new();

        // Deterministic sparse drop pattern (~1%), never the first packet
        for i in 0..count {
            let seq = start.wrapping_add(i as u16);
            if i > 0 && (drop_seed.wrapping_mul(i as u64 + 1) % 97) == 0 {
                dropped.push(seq);
                continue;
            }
            admit(&mut buffer, seq);
            delivered.extend(drain(&mut buffer, false).iter().map(|f| f.sequence));
        }
        for seq in dropped {
            prop_assert_eq!(admit(&mut buffer, seq), AdmitOutcome::Admitted);
            delivered.extend(drain(&mut buffer, false).iter().map(|f| f.sequence));
        }

        let expected: Vec<u16> = (0..count).map(|i| start.wrapping_add(i as u16)).collect();
        prop_assert_eq!(delivered, expected);
    }

    // In no-resend mode every admit is followed by a full drain.
    #[test]
    fn no_resend_always_drains(
        start: u16,
        offsets in proptest::collection::vec(0u16..512, 1..64),
    ) {
        let mut buffer = CircularBuffer::new(64);
        for offset in offsets {
            admit(&mut buffer, start.wrapping_add(offset));
            drain(&mut buffer, true);
            prop_assert!(buffer.is_empty());
        }
    }
}
