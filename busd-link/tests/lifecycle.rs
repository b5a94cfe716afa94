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
    codes, BusAddr, BusmonitorFrame, ChainError, DriverStage, LinkConnect, LinkRecv, RouterApi,
    RunState, Server, Severity, Telegram,
};
use integration_test_utils::{
    FailingTransport, InstantTransport, ManualTransport, RouterEvent, StaticServer,
};
use std::sync::Arc;
use support::{rig, store};

#[tokio::test]
async fn start_and_stop_handshakes_traverse_all_three_states() {
    let rig = rig(store(&[("link", &[])]));

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(ManualTransport::default());
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport.clone());
    assert!(connect.set_driver(driver).await);
    assert!(connect.setup().await);
    assert_eq!(connect.state(), RunState::Stopped);
    assert!(connect.info(0).starts_with("cfg:link"));

    connect.start().await;
    assert_eq!(connect.state(), RunState::Switching);

    transport.confirm_started().await;
    assert_eq!(connect.state(), RunState::Running);
    assert_eq!(
        rig.router.events(),
        vec![RouterEvent::Started("link".to_string())]
    );

    connect.stop().await;
    assert_eq!(connect.state(), RunState::Switching);

    transport.confirm_stopped().await;
    assert_eq!(connect.state(), RunState::Stopped);
    assert_eq!(
        rig.router.events(),
        vec![
            RouterEvent::Started("link".to_string()),
            RouterEvent::Stopped("link".to_string()),
        ]
    );
}

#[tokio::test]
async fn start_is_idempotent_while_a_handshake_is_in_flight() {
    let rig = rig(store(&[("link", &[])]));

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(ManualTransport::default());
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport.clone());
    assert!(connect.set_driver(driver).await);
    assert!(connect.setup().await);

    connect.start().await;
    connect.start().await;
    assert_eq!(transport.open_count(), 1);

    transport.confirm_started().await;
    connect.start().await;
    assert_eq!(transport.open_count(), 1);
    assert_eq!(connect.state(), RunState::Running);
}

#[tokio::test]
async fn stop_is_idempotent_while_a_stop_is_in_flight() {
    let rig = rig(store(&[("link", &[])]));

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(ManualTransport::default());
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport.clone());
    assert!(connect.set_driver(driver).await);
    assert!(connect.setup().await);

    // Fully stopped: stop is a no-op.
    connect.stop().await;
    assert_eq!(transport.close_count(), 0);

    connect.start().await;
    transport.confirm_started().await;

    connect.stop().await;
    connect.stop().await;
    assert_eq!(transport.close_count(), 1);
    assert_eq!(connect.state(), RunState::Switching);

    transport.confirm_stopped().await;
    assert_eq!(connect.state(), RunState::Stopped);
}

#[tokio::test]
async fn single_connect_acquires_a_pool_address_and_releases_it_once() {
    let rig = rig(store(&[("client", &[])]));
    rig.router.add_pool_addr(BusAddr::new(12));

    let server = Arc::new(StaticServer::new(rig.router_api()));
    assert!(server.setup().await);
    let connect = LinkConnect::new_single(server, rig.router.section("client"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::line(&connect, transport).expect("client connect carries a server");
    assert!(connect.set_driver(driver).await);

    assert!(connect.setup().await);
    assert_eq!(connect.addr(), BusAddr::new(12));
    assert!(connect.addr_is_local());

    drop(connect);
    assert_eq!(rig.router.released(), vec![BusAddr::new(12)]);
}

#[tokio::test]
async fn configuration_supplied_address_is_never_released() {
    let rig = rig(store(&[("client", &[])]));

    let server = Arc::new(StaticServer::new(rig.router_api()));
    let connect = LinkConnect::new_single(server, rig.router.section("client"), &rig.diag);
    connect.set_address(BusAddr::new(9));
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::line(&connect, transport).expect("client connect carries a server");
    assert!(connect.set_driver(driver).await);

    assert!(connect.setup().await);
    assert_eq!(connect.addr(), BusAddr::new(9));
    assert!(!connect.addr_is_local());

    drop(connect);
    assert!(rig.router.released().is_empty());
}

#[tokio::test]
async fn single_connect_fails_setup_when_the_pool_is_exhausted() {
    let rig = rig(store(&[("client", &[])]));

    let server = Arc::new(StaticServer::new(rig.router_api()));
    let connect = LinkConnect::new_single(server, rig.router.section("client"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::line(&connect, transport).expect("client connect carries a server");
    assert!(connect.set_driver(driver).await);

    assert!(!connect.setup().await);
    assert!(rig.sink.has_code(Severity::Error, codes::ADDR_POOL));
}

#[tokio::test]
async fn line_driver_copies_its_address_from_the_owning_connect() {
    let rig = rig(store(&[("client", &[])]));

    let server = Arc::new(StaticServer::new(rig.router_api()));
    let connect = LinkConnect::new_single(server, rig.router.section("client"), &rig.diag);
    connect.set_address(BusAddr::new(7));
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::line(&connect, transport).expect("client connect carries a server");
    assert!(connect.set_driver(driver.clone()).await);

    assert!(connect.setup().await);
    assert_eq!(driver.addr(), BusAddr::new(7));
}

#[tokio::test]
async fn client_driver_variants_require_a_server_spawned_connect() {
    let rig = rig(store(&[("link", &[])]));

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());

    assert!(matches!(
        DriverStage::sub(&connect, transport.clone()),
        Err(ChainError::NotClientScoped)
    ));
    assert!(matches!(
        DriverStage::line(&connect, transport),
        Err(ChainError::NotClientScoped)
    ));
}

#[tokio::test]
async fn transport_open_failure_settles_the_link_back_to_stopped() {
    let rig = rig(store(&[("link", &[])]));

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, Arc::new(FailingTransport));
    assert!(connect.set_driver(driver).await);
    assert!(connect.setup().await);

    connect.start().await;
    assert_eq!(connect.state(), RunState::Stopped);
    assert!(rig.sink.has_code(Severity::Error, codes::TRANSPORT_OPEN));
    assert_eq!(
        rig.router.events(),
        vec![RouterEvent::Stopped("link".to_string())]
    );
}

#[tokio::test]
async fn events_after_connect_teardown_are_dropped_not_forwarded() {
    let rig = rig(store(&[("link", &[])]));

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport.clone());
    assert!(connect.set_driver(driver.clone()).await);
    assert!(connect.setup().await);
    connect.start().await;

    drop(connect);

    // The driver's upstream back-reference is expired: forwarded events
    // vanish instead of touching freed state.
    transport.inject_telegram(Telegram::new(vec![5])).await;
    driver.started().await;
    driver.stopped().await;

    let events = rig.router.events();
    assert!(!events
        .iter()
        .any(|event| matches!(event, RouterEvent::Telegram(_, _))));
}

#[tokio::test]
async fn busmonitor_frames_are_forwarded_to_the_router() {
    let rig = rig(store(&[("link", &[])]));

    let connect = LinkConnect::new(rig.router_api(), rig.router.section("link"), &rig.diag);
    let transport = Arc::new(InstantTransport::default());
    let driver = DriverStage::bus(rig.router.section("dev"), &rig.diag, transport.clone());
    assert!(connect.set_driver(driver).await);
    assert!(connect.setup().await);

    connect.start().await;
    transport
        .inject_busmonitor(BusmonitorFrame::new(vec![0xcc]))
        .await;
    assert_eq!(
        rig.router.events(),
        vec![
            RouterEvent::Started("link".to_string()),
            RouterEvent::Busmonitor(BusmonitorFrame::new(vec![0xcc])),
        ]
    );
}
