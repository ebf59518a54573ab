/**
 * Handler exchange tests
 *
 * Two nodes exchange HELLO LQ pairs through the handlers' own codecs:
 * - Wire sizes agree with the sizes announced at registration
 * - Lite positions travel in the global section and drive the multiplier
 * - Pud pairs carry the sender's main address into the position lookup
 */
use geolq_metric::{
    GeoPosition, GpsRecord, LinkEntry, LiteHandler, LiteLq, LqAlgorithm, LqConfig, LqHandler,
    NoMid, PudHandler, LINK_COST_BROKEN, LQ_QUICKSTART_STEPS,
};
use std::net::IpAddr;

fn addr(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// Encode a HELLO and a TC pair with their global sections, then check the
/// decoders consume exactly the announced number of bytes
fn check_wire_contract<H: LqHandler>(handler: &mut H, record: &H::Record) {
    let sizes = handler.sizes();

    let mut out = Vec::new();
    assert_eq!(handler.serialize_hello_lq(record, &mut out), sizes.hello_wire);
    let hello_global = handler.serialize_hello_global(&mut out);
    let mut tc = Vec::new();
    assert_eq!(handler.serialize_tc_lq(record, &mut tc), sizes.tc_wire);
    assert_eq!(handler.serialize_tc_global(&mut tc), 0);
    assert_eq!(out.len(), sizes.hello_wire + hello_global);
    assert_eq!(out.len() % 4, 0);
    assert_eq!(tc.len() % 4, 0);

    let mut cursor = out.as_slice();
    let mut decoded = handler.new_record();
    handler.deserialize_hello_lq(&mut cursor, &mut decoded).unwrap();
    assert_eq!(cursor.len(), hello_global);
    handler.deserialize_hello_global(&mut cursor).unwrap();
    assert!(cursor.is_empty());

    let mut cursor = tc.as_slice();
    handler.deserialize_tc_lq(&mut cursor, &mut decoded).unwrap();
    handler.deserialize_tc_global(&mut cursor).unwrap();
    assert!(cursor.is_empty());

    // Truncated input fails without consuming anything
    let short = &out[..sizes.hello_wire - 1];
    let mut cursor = short;
    assert!(handler.deserialize_hello_lq(&mut cursor, &mut decoded).is_err());
    assert_eq!(cursor.len(), short.len());
}

#[test]
fn test_lite_wire_contract() {
    let mut handler = LiteHandler::new(LqConfig::default()).unwrap();
    handler.initialize(0);
    check_wire_contract(&mut handler, &LiteLq::new(0.5, 0.25, 1.1));
}

#[test]
fn test_pud_wire_contract() {
    for main in ["10.0.0.1", "fd00::1"] {
        let config = LqConfig::for_node(LqAlgorithm::EtxGpsPud, addr(main));
        let mut handler = PudHandler::new(config).unwrap();
        handler.initialize(0);
        let record = handler.new_record();
        check_wire_contract(&mut handler, &record);
    }
}

#[test]
fn test_lite_two_node_exchange() {
    let mut sender = LiteHandler::new(LqConfig::default()).unwrap();
    let mut receiver = LiteHandler::new(LqConfig::default()).unwrap();
    sender.initialize(0);
    receiver.initialize(0);

    receiver.update_local_position(100, 46.0, 6.0, 400);
    sender.update_local_position(100, 46.001, 6.0, 400);

    // The sender lists the receiver with lq 0.9
    let mut sender_view = sender.new_record();
    sender_view.lq = 0.9;

    let mut link = LinkEntry::new(addr("10.0.0.2"), receiver.new_link_state());
    link.quality.lq.lq = 0.9;

    for now in [1000u32, 2000, 3000] {
        let mut packet = Vec::new();
        sender.serialize_hello_lq(&sender_view, &mut packet);
        sender.serialize_hello_global(&mut packet);

        let mut cursor = packet.as_slice();
        let mut foreign = receiver.new_record();
        receiver.deserialize_hello_lq(&mut cursor, &mut foreign).unwrap();
        receiver.deserialize_hello_global(&mut cursor).unwrap();
        receiver.absorb_foreign_report(now, &mut link.quality, Some(&foreign));
    }

    assert_eq!(
        link.quality.neighbor_position,
        Some(GeoPosition::new(46.001, 6.0, 400))
    );
    assert_eq!(link.quality.lq.mlq, 1.0);
    assert!((link.quality.distance - 111.2).abs() < 1.0);

    // nlq went through the 8-bit quantization
    assert!((link.quality.lq.nlq - 0.9).abs() < 1.0 / 255.0);
    let cost = receiver.link_cost(&link.quality);
    assert!((1255..=1270).contains(&cost), "cost: {}", cost);
}

#[test]
fn test_lite_quickstart_then_steady() {
    let mut handler = LiteHandler::new(LqConfig::default()).unwrap();
    handler.initialize(0);
    let mut link = LinkEntry::new(addr("10.0.0.2"), handler.new_link_state());
    link.quality.lq.nlq = 1.0;

    let mut changes = 0;
    for _ in 0..LQ_QUICKSTART_STEPS {
        handler.on_packet_outcome(&mut link, false, &mut || changes += 1);
    }
    let before = link.quality.lq.lq;

    // Steady aging with 0.05 moves the value much less than quickstart would
    handler.on_packet_outcome(&mut link, true, &mut || changes += 1);
    let expected = before * 0.95;
    assert!((link.quality.lq.lq - expected).abs() < 1e-6);
    assert_eq!(changes, LQ_QUICKSTART_STEPS as usize + 1);
}

#[test]
fn test_lite_link_breaks_after_losses() {
    let mut handler = LiteHandler::new(LqConfig::default()).unwrap();
    handler.initialize(0);
    let mut link = LinkEntry::new(addr("10.0.0.2"), handler.new_link_state());
    link.quality.lq.nlq = 1.0;

    for _ in 0..LQ_QUICKSTART_STEPS {
        handler.on_packet_outcome(&mut link, false, &mut || {});
    }
    assert!(link.link_cost < LINK_COST_BROKEN);

    for _ in 0..100 {
        handler.on_packet_outcome(&mut link, true, &mut || {});
    }
    assert_eq!(link.link_cost, LINK_COST_BROKEN);
}

#[test]
fn test_pud_two_node_exchange() {
    let a = addr("10.0.0.1");
    let b = addr("10.0.0.2");

    let sender = PudHandler::new(LqConfig::for_node(LqAlgorithm::EtxGpsPud, b)).unwrap();
    let mut receiver = PudHandler::new(LqConfig::for_node(LqAlgorithm::EtxGpsPud, a)).unwrap();

    receiver.update_local_record(GpsRecord::new(10, 46.0, 6.0, 400));
    receiver.update_remote_record(b, GpsRecord::new(10, 46.001, 6.0, 400), &NoMid);

    let mut sender_view = sender.new_record();
    sender_view.lq = 1.0;
    let mut packet = Vec::new();
    sender.serialize_hello_lq(&sender_view, &mut packet);

    let mut foreign = receiver.new_record();
    receiver
        .deserialize_hello_lq(&mut packet.as_slice(), &mut foreign)
        .unwrap();
    assert_eq!(foreign.neighbor_main_address, b);

    let mut link = LinkEntry::new(b, receiver.new_link_state());
    link.quality.lq = 1.0;
    receiver.absorb_foreign_report(0, &mut link.quality, Some(&foreign));

    // B's first fix counts as 111 m covered since the entry started at zero
    assert!(receiver.link_cost(&link.quality) > 1024);

    // B stays put: plain ETX
    receiver.update_remote_record(b, GpsRecord::new(20, 46.001, 6.0, 400), &NoMid);
    assert_eq!(receiver.link_cost(&link.quality), 1024);

    // B moves 0.001 degree away over 10 time units
    receiver.update_remote_record(b, GpsRecord::new(30, 46.002, 6.0, 400), &NoMid);
    let departing = receiver.link_cost(&link.quality);
    assert!(departing > 1024, "cost: {}", departing);

    // And comes back
    receiver.update_remote_record(b, GpsRecord::new(40, 46.001, 6.0, 400), &NoMid);
    let approaching = receiver.link_cost(&link.quality);
    assert!(approaching < 1024, "cost: {}", approaching);
}
