// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for the request dispatcher: pairing, upgrade and download phases.

use jeeboot_common::crc16;
use jeeboot_common::dispatch::{whiten, Dispatcher, LookupMiss, Outcome};
use jeeboot_common::protocol::{
    DownloadEnd, DownloadRequest, HardwareId, PairingReply, PairingRequest, Reply, Request,
    UpgradeRequest, WireFormat,
};
use jeeboot_common::{Binding, Error, FirmwareImage, FirmwareStore, Registry};

const GROUP: u8 = 212;
const FIXTURE_HWID: &str = "06300301c48461aeedb09351061900f5";
const FRESH_ID: HardwareId = HardwareId([0xA5; 16]);

fn image(software_id: u16, len: usize) -> FirmwareImage {
    let data: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();
    FirmwareImage::from_binary(software_id, format!("sw{}.hex", software_id), data).unwrap()
}

fn fixture() -> (FirmwareStore, Registry) {
    let store = FirmwareStore::from_images([image(1001, 64), image(1002, 640), image(1003, 100)])
        .unwrap();
    let registry = Registry::from_bindings([
        Binding {
            hardware_id: FIXTURE_HWID.parse().unwrap(),
            board: 2,
            group: GROUP,
            node: 17,
            software_id: 1001,
        },
        Binding {
            hardware_id: HardwareId([0x11; 16]),
            board: 5,
            group: GROUP,
            node: 3,
            software_id: 1002,
        },
        Binding {
            hardware_id: HardwareId([0x22; 16]),
            board: 5,
            group: 0,
            node: 0,
            software_id: 1002,
        },
        Binding {
            hardware_id: HardwareId([0x33; 16]),
            board: 5,
            group: GROUP,
            node: 4,
            software_id: 4242,
        },
    ])
    .unwrap();
    (store, registry)
}

fn pairing_frame(board: u8, hardware_id: HardwareId) -> Vec<u8> {
    Request::Pairing(PairingRequest {
        variant: 1,
        board,
        group: 0,
        node: 0,
        check: 0,
        hardware_id,
    })
    .to_frame(0xE0)
    .unwrap()
    .to_vec()
}

fn upgrade_frame(node: u8) -> Vec<u8> {
    Request::Upgrade(UpgradeRequest {
        variant: 1,
        board: 5,
        software_id: 0,
        size_units: 0,
        checksum: 0,
    })
    .to_frame(0xA0 | node)
    .unwrap()
    .to_vec()
}

fn download_frame(node: u8, software_id: u16, index: u16) -> Vec<u8> {
    Request::Download(DownloadRequest { software_id, index })
        .to_frame(0xA0 | node)
        .unwrap()
        .to_vec()
}

// =============================================================================
// Source fixture, end to end
// =============================================================================

#[test]
fn test_fixture_pairing() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);

    let frame = [
        224, 0, 2, 212, 17, 190, 240, 6, 48, 3, 1, 196, 132, 97, 174, 237, 176, 147, 81, 6, 25, 0,
        245,
    ];
    let (node, reply) = dispatcher.handle(&frame).unwrap();
    assert_eq!(node, 1);
    assert_eq!(
        reply,
        Reply::PairingReply(PairingReply {
            variant: 0,
            board: 2,
            group: 212,
            node: 17,
            shared_key: [0; 16],
        })
    );

    let (_, encoded) = dispatcher.handle_frame(&frame).unwrap();
    let mut expected = vec![0xE1, 0x00, 0x02, 0xd4, 0x11];
    expected.extend_from_slice(&[0; 16]);
    assert_eq!(&encoded[..], &expected[..]);
}

#[test]
fn test_fixture_upgrade() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);

    let (node, reply) = dispatcher.handle(&[177, 0, 2, 1, 0, 17, 0, 99, 36]).unwrap();
    assert_eq!(node, 17);
    let expected_crc = crc16::checksum(store.get(1001).unwrap().data());
    assert_eq!(
        reply,
        Reply::Upgrade(UpgradeRequest {
            variant: 0,
            board: 2,
            software_id: 1001,
            size_units: 4,
            checksum: expected_crc,
        })
    );
}

#[test]
fn test_fixture_download_of_unknown_software_is_dropped() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);

    // the node still asks for software ID 1, which is not configured
    assert_eq!(
        dispatcher.respond(&[177, 1, 0, 0, 0]).unwrap(),
        Outcome::NoReply(LookupMiss::NoImage(1))
    );
    assert!(dispatcher.handle(&[177, 1, 0, 0, 0]).is_none());
}

// =============================================================================
// Pairing
// =============================================================================

#[test]
fn test_pairing_without_hardware_id_assigns_fresh_one() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP).with_id_generator(|| FRESH_ID);

    let (node, reply) = dispatcher
        .handle(&pairing_frame(9, HardwareId::UNSET))
        .unwrap();
    assert_eq!(node, 1);
    match reply {
        Reply::PairingAssign(assign) => {
            assert_eq!(assign.variant, 1);
            assert_eq!(assign.board, 9);
            assert_eq!(assign.hardware_id, FRESH_ID);
        }
        other => panic!("unexpected reply {:?}", other),
    }
}

#[test]
fn test_pairing_random_id_is_not_zero() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);

    let (_, reply) = dispatcher
        .handle(&pairing_frame(2, HardwareId::UNSET))
        .unwrap();
    assert!(matches!(reply, Reply::PairingAssign(a) if !a.hardware_id.is_unset()));
}

#[test]
fn test_pairing_assign_frame_length() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP).with_id_generator(|| FRESH_ID);

    let (_, frame) = dispatcher
        .handle_frame(&pairing_frame(2, HardwareId::UNSET))
        .unwrap();
    assert_eq!(frame.len(), 19);
    assert_eq!(frame[0], 0xE1);
    assert_eq!(&frame[3..], FRESH_ID.as_bytes());
}

#[test]
fn test_pairing_unknown_hardware_id() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);

    let id = HardwareId([0x99; 16]);
    assert_eq!(
        dispatcher.respond(&pairing_frame(2, id)).unwrap(),
        Outcome::NoReply(LookupMiss::UnknownHardwareId(id))
    );
    assert!(dispatcher.handle(&pairing_frame(2, id)).is_none());
}

#[test]
fn test_pairing_board_mismatch() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);

    let id: HardwareId = FIXTURE_HWID.parse().unwrap();
    assert_eq!(
        dispatcher.respond(&pairing_frame(3, id)).unwrap(),
        Outcome::NoReply(LookupMiss::BoardMismatch {
            bound: 2,
            requested: 3
        })
    );
}

#[test]
fn test_pairing_unassigned_binding() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);

    let id = HardwareId([0x22; 16]);
    assert_eq!(
        dispatcher.respond(&pairing_frame(5, id)).unwrap(),
        Outcome::NoReply(LookupMiss::Unassigned(id))
    );
}

// =============================================================================
// Upgrade
// =============================================================================

#[test]
fn test_upgrade_reports_size_in_16_byte_units() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);

    let (node, reply) = dispatcher.handle(&upgrade_frame(3)).unwrap();
    assert_eq!(node, 3);
    let image = store.get(1002).unwrap();
    assert_eq!(image.len(), 640);
    match reply {
        Reply::Upgrade(up) => {
            assert_eq!(up.software_id, 1002);
            assert_eq!(up.size_units, 40);
            assert_eq!(up.checksum, image.checksum());
            assert_eq!(up.board, 5);
        }
        other => panic!("unexpected reply {:?}", other),
    }
}

#[test]
fn test_upgrade_unknown_node() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);

    assert_eq!(
        dispatcher.respond(&upgrade_frame(30)).unwrap(),
        Outcome::NoReply(LookupMiss::NoSoftware {
            group: GROUP,
            node: 30
        })
    );
}

#[test]
fn test_upgrade_uses_configured_group() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, 100);

    assert_eq!(dispatcher.group(), 100);
    assert!(dispatcher.handle(&upgrade_frame(17)).is_none());
}

#[test]
fn test_upgrade_missing_image() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);

    assert_eq!(
        dispatcher.respond(&upgrade_frame(4)).unwrap(),
        Outcome::NoReply(LookupMiss::NoImage(4242))
    );
}

// =============================================================================
// Download
// =============================================================================

#[test]
fn test_download_chunk_is_whitened() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);
    let image = store.get(1002).unwrap();

    let (node, reply) = dispatcher.handle(&download_frame(3, 1002, 5)).unwrap();
    assert_eq!(node, 3);
    let Reply::Download(chunk) = reply else {
        panic!("unexpected reply {:?}", reply);
    };
    assert_eq!(chunk.software_id_xor, 1002 ^ 5);
    for i in 0..64 {
        let expected = image.data()[5 * 64 + i] ^ ((211 * i) % 256) as u8;
        assert_eq!(chunk.data[i], expected, "byte {}", i);
    }
}

#[test]
fn test_download_last_chunk_includes_padding() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);
    let image = store.get(1003).unwrap();
    assert_eq!(image.len(), 128);

    let (_, reply) = dispatcher.handle(&download_frame(3, 1003, 1)).unwrap();
    let Reply::Download(chunk) = reply else {
        panic!("unexpected reply {:?}", reply);
    };
    let mut plain = [0u8; 64];
    plain.copy_from_slice(&image.data()[64..]);
    assert_eq!(chunk.data, whiten(&plain));
    // bytes 100.. of the image are padding
    assert!(image.data()[100..].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_download_past_end_gets_short_reply() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);

    let (node, reply) = dispatcher.handle(&download_frame(3, 1002, 10)).unwrap();
    assert_eq!(node, 3);
    assert_eq!(
        reply,
        Reply::DownloadEnd(DownloadEnd {
            software_id_xor: 1002 ^ 10
        })
    );

    let (_, frame) = dispatcher.handle_frame(&download_frame(3, 1002, 10)).unwrap();
    assert_eq!(frame.len(), 3);
}

#[test]
fn test_download_huge_index_does_not_overflow() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);

    let (_, reply) = dispatcher
        .handle(&download_frame(3, 1001, u16::MAX))
        .unwrap();
    assert!(matches!(reply, Reply::DownloadEnd(_)));
}

#[test]
fn test_full_download_reassembles_image() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);
    let image = store.get(1002).unwrap();

    let mut received = Vec::new();
    for index in 0.. {
        match dispatcher.handle(&download_frame(3, 1002, index)).unwrap() {
            (_, Reply::Download(chunk)) => {
                assert_eq!(chunk.software_id_xor, 1002 ^ index);
                received.extend_from_slice(&whiten(&chunk.data));
            }
            (_, Reply::DownloadEnd(_)) => break,
            (_, other) => panic!("unexpected reply {:?}", other),
        }
    }
    assert_eq!(received, image.data());
    assert_eq!(crc16::checksum(&received), image.checksum());
}

#[test]
fn test_whitening_pattern() {
    let plain = [0u8; 64];
    let white = whiten(&plain);
    assert_eq!(white[0], 0);
    assert_eq!(white[1], 211);
    assert_eq!(white[2], (422 % 256) as u8);
    assert_eq!(white[63], ((211 * 63) % 256) as u8);
}

// =============================================================================
// Malformed frames
// =============================================================================

#[test]
fn test_unknown_length_is_dropped() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);

    assert!(matches!(
        dispatcher.respond(&[0xE1, 1, 2, 3]),
        Err(Error::UnknownLength(3))
    ));
    assert!(dispatcher.handle(&[0xE1, 1, 2, 3]).is_none());
}

#[test]
fn test_empty_frame_is_dropped() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);

    assert!(dispatcher.handle(&[]).is_none());
}

#[test]
fn test_dispatcher_keeps_serving_after_bad_frame() {
    let (store, registry) = fixture();
    let dispatcher = Dispatcher::new(&store, &registry, GROUP);

    assert!(dispatcher.handle(&[0xE1; 30]).is_none());
    assert!(dispatcher.handle(&upgrade_frame(3)).is_some());
}

#[test]
fn test_request_body_size_is_classification_key() {
    assert_eq!(PairingRequest::SIZE + 1, pairing_frame(0, HardwareId::UNSET).len());
    assert_eq!(UpgradeRequest::SIZE + 1, upgrade_frame(0).len());
    assert_eq!(DownloadRequest::SIZE + 1, download_frame(0, 0, 0).len());
}
