/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod support;

use busd_link::{
    codes, DriverStage, FilterLogic, FilterStage, LinkConnect, LinkRecv, RouterApi, Severity,
    Telegram,
};
use integration_test_utils::{
    FailingSetupLogic, InstantTransport, PassLogic, RecordingLogic, RefuseDriversBelow,
    RefuseFiltersBelow, RouterEvent, TrafficLog,
};
use std::sync::Arc;
use support::{rig, store};

#[tokio::test]
async fn filters_are_inserted_in_configuration_order() {
    let rig = rig(store(&[
        ("link", &[("filters", "a,b,c")]),
        ("a", &[]),
        ("b", &[]),
        ("c", &[]),
    ]));
    rig.router.register_passthrough("a");
    rig.router.register_passthrough("b");
    rig.router.register_passthrough("c");

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport);

    assert!(connect.set_driver(driver).await);
    assert!(connect.setup().await);
    assert_eq!(connect.chain_names().await, vec!["a", "b", "c", "dev"]);
}

#[tokio::test]
async fn empty_segments_in_the_filter_list_are_skipped() {
    let rig = rig(store(&[("link", &[("filters", ",a,,b,")]), ("a", &[]), ("b", &[])]));
    rig.router.register_passthrough("a");
    rig.router.register_passthrough("b");

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport);

    assert!(connect.set_driver(driver).await);
    assert!(connect.setup().await);
    assert_eq!(connect.chain_names().await, vec!["a", "b", "dev"]);
}

#[tokio::test]
async fn filter_alias_resolves_through_the_section() {
    let rig = rig(store(&[
        ("link", &[("filters", "a")]),
        ("a", &[("filter", "queue")]),
    ]));
    rig.router.register_passthrough("queue");

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport);

    assert!(connect.set_driver(driver).await);
    assert!(connect.setup().await);
    assert_eq!(connect.chain_names().await, vec!["queue", "dev"]);
}

#[tokio::test]
async fn find_filter_resolves_by_effective_name() {
    let rig = rig(store(&[("link", &[("filters", "x,y")]), ("x", &[]), ("y", &[])]));
    rig.router.register_passthrough("x");
    rig.router.register_passthrough("y");

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport);
    assert!(connect.set_driver(driver).await);
    assert!(connect.setup().await);

    let driver = connect.driver().await.expect("driver is registered");
    let hit = driver.find_filter("y").await.expect("y is in the chain");
    assert_eq!(hit.effective_name(), "y");
    assert!(driver.find_filter("z").await.is_none());
    // Drivers are not addressable by filter name.
    assert!(driver.find_filter("dev").await.is_none());
}

#[tokio::test]
async fn unknown_filter_name_fails_setup_with_an_error_diagnostic() {
    let rig = rig(store(&[("link", &[("filters", "a,missing")]), ("a", &[])]));
    rig.router.register_passthrough("a");

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport);

    assert!(connect.set_driver(driver).await);
    assert!(!connect.setup().await);
    assert!(rig.sink.has_code(Severity::Error, codes::FILTER_SETUP));
}

#[tokio::test]
async fn missing_driver_fails_setup_with_an_error_diagnostic() {
    let rig = rig(store(&[("link", &[])]));

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);

    assert!(!connect.setup().await);
    assert!(rig.sink.has_code(Severity::Error, codes::NO_DRIVER));
}

#[tokio::test]
async fn push_filter_fails_without_an_upstream_neighbor() {
    let rig = rig(store(&[("link", &[])]));

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());
    // Driver was never linked below the connect: its back-reference is empty.
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport);
    let filter = FilterStage::new(
        rig.router.section("extra"),
        &rig.diag,
        &connect,
        Box::new(PassLogic),
    );

    assert!(!driver.push_filter(filter).await);
}

#[tokio::test]
async fn push_filter_is_atomic_when_the_upstream_stage_refuses() {
    let rig = rig(store(&[("link", &[("filters", "guard")]), ("guard", &[])]));
    rig.router.register_logic(
        "guard",
        Arc::new(|_cfg, _diag| -> Box<dyn FilterLogic> { Box::new(RefuseFiltersBelow) }),
    );

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport.clone());
    assert!(connect.set_driver(driver).await);
    assert!(connect.setup().await);
    assert_eq!(connect.chain_names().await, vec!["guard", "dev"]);

    // The guard accepts only a driver below it, so inserting another
    // filter between it and the driver must fail without mutation.
    let extra = FilterStage::new(
        rig.router.section("extra"),
        &rig.diag,
        &connect,
        Box::new(PassLogic),
    );
    let driver = connect.driver().await.expect("driver is registered");
    assert!(!driver.push_filter(extra).await);
    assert_eq!(connect.chain_names().await, vec!["guard", "dev"]);

    // Forwarding still works over the untouched chain.
    connect.start().await;
    transport.inject_telegram(Telegram::new(vec![1])).await;
    assert!(matches!(
        rig.router.events().last(),
        Some(RouterEvent::Telegram(_, _))
    ));
}

#[tokio::test]
async fn push_filter_rolls_back_when_the_filter_refuses_the_driver() {
    let rig = rig(store(&[("link", &[])]));

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport.clone());
    assert!(connect.set_driver(driver).await);
    assert!(connect.setup().await);

    let picky = FilterStage::new(
        rig.router.section("picky"),
        &rig.diag,
        &connect,
        Box::new(RefuseDriversBelow),
    );
    let driver = connect.driver().await.expect("driver is registered");
    assert!(!driver.push_filter(picky).await);
    assert_eq!(connect.chain_names().await, vec!["dev"]);

    // The rollback restored the direct connect↔driver edge.
    connect.start().await;
    transport.inject_telegram(Telegram::new(vec![2])).await;
    assert!(matches!(
        rig.router.events().last(),
        Some(RouterEvent::Telegram(_, _))
    ));
}

#[tokio::test]
async fn push_filter_unlinks_the_filter_when_its_setup_fails() {
    let rig = rig(store(&[("link", &[])]));

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport.clone());
    assert!(connect.set_driver(driver).await);
    assert!(connect.setup().await);

    let broken = FilterStage::new(
        rig.router.section("broken"),
        &rig.diag,
        &connect,
        Box::new(FailingSetupLogic),
    );
    let driver = connect.driver().await.expect("driver is registered");
    assert!(!driver.push_filter(broken.clone()).await);
    assert_eq!(connect.chain_names().await, vec!["dev"]);

    // The unlinked filter is retired and refuses another insertion.
    assert!(!driver.push_filter(broken).await);
    assert_eq!(connect.chain_names().await, vec!["dev"]);

    connect.start().await;
    transport.inject_telegram(Telegram::new(vec![3])).await;
    assert!(matches!(
        rig.router.events().last(),
        Some(RouterEvent::Telegram(_, _))
    ));
}

#[tokio::test]
async fn builtin_log_filter_resolves_and_passes_traffic() {
    let rig = rig(store(&[("link", &[("filters", "log")]), ("log", &[])]));

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport.clone());
    assert!(connect.set_driver(driver).await);
    assert!(connect.setup().await);
    assert_eq!(connect.chain_names().await, vec!["log", "dev"]);

    connect.start().await;
    transport.inject_telegram(Telegram::new(vec![0xbc])).await;
    assert_eq!(
        rig.router.events(),
        vec![
            RouterEvent::Started("link".to_string()),
            RouterEvent::Telegram(Telegram::new(vec![0xbc]), "link".to_string()),
        ]
    );
}

#[tokio::test]
async fn telegrams_traverse_filters_in_both_directions() {
    let log = TrafficLog::default();
    let rig = rig(store(&[("link", &[("filters", "rec")]), ("rec", &[])]));
    let for_registry = log.clone();
    rig.router.register_logic(
        "rec",
        Arc::new(move |_cfg, _diag| -> Box<dyn FilterLogic> {
            Box::new(RecordingLogic::new(for_registry.clone()))
        }),
    );

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport.clone());
    assert!(connect.set_driver(driver).await);
    assert!(connect.setup().await);

    connect.start().await;
    transport.inject_telegram(Telegram::new(vec![1, 2])).await;
    connect.send_telegram(Telegram::new(vec![3, 4])).await;

    assert_eq!(log.recv_seen(), vec![Telegram::new(vec![1, 2])]);
    assert_eq!(log.send_seen(), vec![Telegram::new(vec![3, 4])]);
    assert_eq!(transport.transmitted(), vec![Telegram::new(vec![3, 4])]);
    assert_eq!(
        rig.router.events(),
        vec![
            RouterEvent::Started("link".to_string()),
            RouterEvent::Telegram(Telegram::new(vec![1, 2]), "link".to_string()),
        ]
    );
}
