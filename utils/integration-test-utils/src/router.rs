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

//! Recording router and a static server wrapper around it.

use crate::logic::PassLogic;
use async_trait::async_trait;
use busd_link::{
    BusAddr, BusmonitorFrame, ConfigSection, ConfigStore, Diag, FilterLogic, FilterRegistry,
    FilterStage, LinkConnect, LogicConstructor, RouterApi, Server, Telegram,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One observed router notification.
#[derive(Clone, Debug, PartialEq)]
pub enum RouterEvent {
    Started(String),
    Stopped(String),
    Telegram(Telegram, String),
    Busmonitor(BusmonitorFrame),
}

/// Router double: serves configuration sections, builds filters from a
/// registry, hands out pool addresses, and records every notification.
pub struct RecordingRouter {
    config: ConfigStore,
    registry: Mutex<FilterRegistry>,
    pool: Mutex<VecDeque<BusAddr>>,
    released: Mutex<Vec<BusAddr>>,
    events: Mutex<Vec<RouterEvent>>,
}

impl RecordingRouter {
    pub fn new(config: ConfigStore) -> Self {
        Self {
            config,
            registry: Mutex::new(FilterRegistry::with_builtins()),
            pool: Mutex::new(VecDeque::new()),
            released: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn add_pool_addr(&self, addr: BusAddr) {
        self.pool.lock().expect("lock pool").push_back(addr);
    }

    /// Registers a pass-through logic under the given name, so generic
    /// section names resolve during chain construction.
    pub fn register_passthrough(&self, name: &str) {
        self.register_logic(
            name,
            Arc::new(|_cfg, _diag| -> Box<dyn FilterLogic> { Box::new(PassLogic) }),
        );
    }

    pub fn register_logic(&self, name: &str, constructor: LogicConstructor) {
        self.registry
            .lock()
            .expect("lock registry")
            .register(name, constructor);
    }

    pub fn events(&self) -> Vec<RouterEvent> {
        self.events.lock().expect("lock events").clone()
    }

    pub fn released(&self) -> Vec<BusAddr> {
        self.released.lock().expect("lock released").clone()
    }

    fn record(&self, event: RouterEvent) {
        self.events.lock().expect("lock events").push(event);
    }
}

#[async_trait]
impl RouterApi for RecordingRouter {
    fn get_client_addr(&self, _diag: &Diag) -> BusAddr {
        self.pool
            .lock()
            .expect("lock pool")
            .pop_front()
            .unwrap_or(BusAddr::UNASSIGNED)
    }

    fn release_client_addr(&self, addr: BusAddr) {
        self.released.lock().expect("lock released").push(addr);
    }

    fn section(&self, name: &str) -> ConfigSection {
        self.config.section(name)
    }

    async fn get_filter(
        &self,
        owner: Arc<LinkConnect>,
        section: ConfigSection,
        name: &str,
    ) -> Option<Arc<FilterStage>> {
        let registry = self.registry.lock().expect("lock registry").clone();
        registry.create(&owner, section, owner.base().diag(), name)
    }

    async fn link_started(&self, link: Arc<LinkConnect>) {
        self.record(RouterEvent::Started(link.base().cfg().name().to_string()));
    }

    async fn link_stopped(&self, link: Arc<LinkConnect>) {
        self.record(RouterEvent::Stopped(link.base().cfg().name().to_string()));
    }

    async fn recv_telegram(&self, telegram: Telegram, from: Arc<LinkConnect>) {
        self.record(RouterEvent::Telegram(
            telegram,
            from.base().cfg().name().to_string(),
        ));
    }

    async fn recv_busmonitor_frame(&self, frame: BusmonitorFrame) {
        self.record(RouterEvent::Busmonitor(frame));
    }
}

/// Server double exposing a fixed router.
pub struct StaticServer {
    router: Arc<dyn RouterApi>,
}

impl StaticServer {
    pub fn new(router: Arc<dyn RouterApi>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl Server for StaticServer {
    fn router(&self) -> Arc<dyn RouterApi> {
        self.router.clone()
    }
}
