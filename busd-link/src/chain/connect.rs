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

//! Chain anchor: owns the stage pipeline, runs the start/stop handshake,
//! and mediates all router notifications.
//!
//! A connect is constructed for one link, wired to a driver, set up once,
//! and destroyed only after its owned chain is gone (automatic through the
//! `send` ownership edge). The start/stop handshake is asynchronous: the
//! connect requests a transition and the chain confirms through the upward
//! `started`/`stopped` callbacks.

use crate::chain::base::LinkBase;
use crate::chain::driver::DriverStage;
use crate::chain::filter::FilterStage;
use crate::chain::server::Server;
use crate::chain::stage::{LinkRecv, Stage};
use crate::config::ConfigSection;
use crate::diag::{codes, Diag};
use crate::observability::events;
use crate::router_api::RouterApi;
use crate::telegram::{BusAddr, BusmonitorFrame, Telegram};
use async_trait::async_trait;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, Weak};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

const COMPONENT: &str = "connect";

/// How a connect came to exist.
#[derive(Clone)]
pub enum ConnectScope {
    /// A configured, long-lived bus link.
    Bus,
    /// Spawned by a server for one connecting client.
    Client { server: Arc<dyn Server> },
    /// Client connect that additionally owns a single bus address,
    /// acquired from the router's pool when configuration supplies none.
    Single { server: Arc<dyn Server> },
}

/// Observable run state of a connect.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunState {
    Stopped,
    /// A start or stop handshake is in flight; the `running` flag holds
    /// the previous value until the chain confirms.
    Switching,
    Running,
}

#[derive(Clone, Copy, Default)]
struct RunFlags {
    running: bool,
    switching: bool,
}

#[derive(Clone, Copy)]
struct AddrState {
    addr: BusAddr,
    local: bool,
}

/// The anchor of a link chain.
pub struct LinkConnect {
    base: LinkBase,
    id: Uuid,
    router: Arc<dyn RouterApi>,
    scope: ConnectScope,
    send: Mutex<Option<Stage>>,
    driver: Mutex<Option<Arc<DriverStage>>>,
    flags: StdMutex<RunFlags>,
    addr: StdMutex<AddrState>,
    weak_self: Weak<LinkConnect>,
}

impl LinkConnect {
    /// Creates a connect for a configured bus link.
    pub fn new(router: Arc<dyn RouterApi>, cfg: ConfigSection, parent: &Diag) -> Arc<Self> {
        Self::with_scope(router, cfg, parent, ConnectScope::Bus)
    }

    /// Creates a connect for a server-spawned client.
    pub fn new_client(server: Arc<dyn Server>, cfg: ConfigSection, parent: &Diag) -> Arc<Self> {
        let router = server.router();
        Self::with_scope(router, cfg, parent, ConnectScope::Client { server })
    }

    /// Creates a client connect that owns a single bus address.
    pub fn new_single(server: Arc<dyn Server>, cfg: ConfigSection, parent: &Diag) -> Arc<Self> {
        let router = server.router();
        Self::with_scope(router, cfg, parent, ConnectScope::Single { server })
    }

    fn with_scope(
        router: Arc<dyn RouterApi>,
        cfg: ConfigSection,
        parent: &Diag,
        scope: ConnectScope,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            base: LinkBase::new(cfg, parent),
            id: Uuid::new_v4(),
            router,
            scope,
            send: Mutex::new(None),
            driver: Mutex::new(None),
            flags: StdMutex::new(RunFlags::default()),
            addr: StdMutex::new(AddrState {
                addr: BusAddr::UNASSIGNED,
                local: false,
            }),
            weak_self: weak_self.clone(),
        })
    }

    pub fn base(&self) -> &LinkBase {
        &self.base
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The server behind a client-scoped connect.
    pub fn server(&self) -> Option<Arc<dyn Server>> {
        match &self.scope {
            ConnectScope::Bus => None,
            ConnectScope::Client { server } | ConnectScope::Single { server } => {
                Some(server.clone())
            }
        }
    }

    pub fn addr(&self) -> BusAddr {
        self.lock_addr().addr
    }

    /// Whether the current address was acquired from the router's pool.
    pub fn addr_is_local(&self) -> bool {
        self.lock_addr().local
    }

    /// Installs a configuration-supplied address. Such an address is never
    /// released back to the pool.
    pub fn set_address(&self, addr: BusAddr) {
        let mut state = self.lock_addr();
        state.addr = addr;
        state.local = false;
    }

    pub fn state(&self) -> RunState {
        let flags = self.lock_flags();
        if flags.switching {
            RunState::Switching
        } else if flags.running {
            RunState::Running
        } else {
            RunState::Stopped
        }
    }

    /// Registers the tail driver and links it as the chain's only stage.
    pub async fn set_driver(&self, driver: Arc<DriverStage>) -> bool {
        {
            let mut slot = self.driver.lock().await;
            *slot = Some(driver.clone());
        }
        self.link(Stage::Driver(driver)).await
    }

    pub async fn driver(&self) -> Option<Arc<DriverStage>> {
        self.driver.lock().await.clone()
    }

    /// Display names of the owned chain, top to tail. Diagnostic helper.
    pub async fn chain_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = { self.send.lock().await.clone() };
        while let Some(stage) = current {
            names.push(stage.display_name());
            current = match stage {
                Stage::Driver(_) => None,
                Stage::Filter(filter) => filter.next().await,
            };
        }
        names
    }

    pub fn info(&self, level: u8) -> String {
        format!("{} state:{:?}", self.base.info(level), self.state())
    }

    /// Sends a telegram down the chain toward the bus.
    pub async fn send_telegram(&self, telegram: Telegram) {
        let top = { self.send.lock().await.clone() };
        if let Some(stage) = top {
            stage.send_telegram(telegram).await;
        }
    }

    fn lock_flags(&self) -> MutexGuard<'_, RunFlags> {
        self.flags
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_addr(&self) -> MutexGuard<'_, AddrState> {
        self.addr
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Builds the configured filter chain above the driver: `filters` is
    /// an ordered comma-separated list of section names, empty segments
    /// skipped, each inserted directly above the driver in turn.
    async fn build_filter_chain(&self, driver: &Arc<DriverStage>) -> bool {
        let configured = self.base.cfg().value("filters", "");
        for name in configured.split(',').filter(|segment| !segment.is_empty()) {
            let section = self.router.section(name);
            let effective = section.value("filter", name);
            let Some(owner) = self.weak_self.upgrade() else {
                return false;
            };
            let Some(filter) = self
                .router
                .get_filter(owner, section.clone(), &effective)
                .await
            else {
                self.base
                    .diag()
                    .error(codes::FILTER_SETUP, format!("filter '{effective}' not found"));
                return false;
            };
            if !driver.push_filter(filter).await {
                self.base.diag().error(
                    codes::FILTER_SETUP,
                    format!("linking filter '{effective}' failed"),
                );
                return false;
            }
        }
        true
    }

    /// Walks the chain top-down, setting up every stage until the
    /// registered driver. A dangling edge or a foreign driver at the tail
    /// is a structural fault, surfaced as FATAL.
    async fn walk_setup(&self, driver: &Arc<DriverStage>) -> bool {
        let section = self.base.cfg().name().to_string();
        let mut current = { self.send.lock().await.clone() };
        loop {
            match current {
                None => {
                    self.base
                        .diag()
                        .fatal(codes::CHAIN_EXHAUSTED, format!("{section}: setup: no driver"));
                    return false;
                }
                Some(Stage::Driver(tail)) => {
                    if !tail.setup().await {
                        self.base.diag().error(
                            codes::FILTER_SETUP,
                            format!("{section}: setup {}: failed", tail.base().cfg().name()),
                        );
                        return false;
                    }
                    if !Arc::ptr_eq(&tail, driver) {
                        self.base.diag().fatal(
                            codes::FILTER_SETUP,
                            format!(
                                "{section}: setup {}: foreign driver at tail",
                                tail.base().cfg().name()
                            ),
                        );
                        return false;
                    }
                    return true;
                }
                Some(Stage::Filter(filter)) => {
                    if !filter.setup().await {
                        self.base.diag().error(
                            codes::FILTER_SETUP,
                            format!("{section}: setup {}: failed", filter.effective_name()),
                        );
                        return false;
                    }
                    current = filter.next().await;
                }
            }
        }
    }

    /// Ensures a single-scoped connect has an address, pulling one from
    /// the router's pool when configuration supplied none.
    async fn acquire_address(&self) -> bool {
        if !self.addr().is_unassigned() {
            return true;
        }
        let acquired = self.router.get_client_addr(self.base.diag());
        if acquired.is_unassigned() {
            self.base
                .diag()
                .error(codes::ADDR_POOL, "no client address available");
            return false;
        }
        {
            let mut state = self.lock_addr();
            state.addr = acquired;
            state.local = true;
        }
        debug!(
            event = events::ADDR_ACQUIRE_OK,
            component = COMPONENT,
            section = self.base.cfg().name(),
            link_id = %self.id,
            addr = %acquired,
            "client address acquired from pool"
        );
        true
    }
}

#[async_trait]
impl LinkRecv for LinkConnect {
    fn base(&self) -> &LinkBase {
        &self.base
    }

    /// Validates the chain, builds the configured filters, and sets up
    /// every stage top-down. Single-scoped connects acquire their address
    /// last. On failure the connect stays unusable until reconfigured.
    async fn setup(&self) -> bool {
        debug!(
            event = events::LINK_SETUP_START,
            component = COMPONENT,
            section = self.base.cfg().name(),
            link_id = %self.id,
            "link setup"
        );

        let driver = { self.driver.lock().await.clone() };
        let Some(driver) = driver else {
            self.base.diag().error(
                codes::NO_DRIVER,
                format!("no driver in {}; refusing", self.base.cfg().name()),
            );
            return false;
        };

        if !self.build_filter_chain(&driver).await {
            return false;
        }
        if !self.walk_setup(&driver).await {
            return false;
        }
        if matches!(self.scope, ConnectScope::Single { .. }) && !self.acquire_address().await {
            return false;
        }

        debug!(
            event = events::LINK_SETUP_OK,
            component = COMPONENT,
            section = self.base.cfg().name(),
            link_id = %self.id,
            "link setup complete"
        );
        true
    }

    /// Requests activation of the owned chain. A no-op while running or
    /// while any handshake is in flight.
    async fn start(&self) {
        let proceed = {
            let mut flags = self.lock_flags();
            if flags.running || flags.switching {
                false
            } else {
                flags.running = false;
                flags.switching = true;
                true
            }
        };
        if !proceed {
            return;
        }

        debug!(
            event = events::LINK_START,
            component = COMPONENT,
            section = self.base.cfg().name(),
            link_id = %self.id,
            "starting link"
        );
        let top = { self.send.lock().await.clone() };
        match top {
            Some(stage) => stage.start().await,
            None => {
                self.base.diag().error(
                    codes::NO_DRIVER,
                    format!("no driver in {}; refusing", self.base.cfg().name()),
                );
                self.stopped().await;
            }
        }
    }

    /// Requests deactivation. A no-op when fully stopped or while a stop
    /// handshake is already in flight.
    async fn stop(&self) {
        let proceed = {
            let mut flags = self.lock_flags();
            if flags.running && flags.switching {
                false
            } else if !flags.running && !flags.switching {
                false
            } else {
                flags.switching = true;
                true
            }
        };
        if !proceed {
            return;
        }

        debug!(
            event = events::LINK_STOP,
            component = COMPONENT,
            section = self.base.cfg().name(),
            link_id = %self.id,
            "stopping link"
        );
        let top = { self.send.lock().await.clone() };
        if let Some(stage) = top {
            stage.stop().await;
        }
    }

    /// Upward confirmation that the chain finished activating.
    async fn started(&self) {
        {
            let mut flags = self.lock_flags();
            flags.running = true;
            flags.switching = false;
        }
        debug!(
            event = events::LINK_STARTED,
            component = COMPONENT,
            section = self.base.cfg().name(),
            link_id = %self.id,
            "link started"
        );
        if let Some(me) = self.weak_self.upgrade() {
            self.router.link_started(me).await;
        }
    }

    /// Upward confirmation that the chain finished deactivating.
    async fn stopped(&self) {
        {
            let mut flags = self.lock_flags();
            flags.running = false;
            flags.switching = false;
        }
        debug!(
            event = events::LINK_STOPPED,
            component = COMPONENT,
            section = self.base.cfg().name(),
            link_id = %self.id,
            "link stopped"
        );
        if let Some(me) = self.weak_self.upgrade() {
            self.router.link_stopped(me).await;
        }
    }

    async fn recv_telegram(&self, telegram: Telegram) {
        if let Some(me) = self.weak_self.upgrade() {
            self.router.recv_telegram(telegram, me).await;
        }
    }

    async fn recv_busmonitor_frame(&self, frame: BusmonitorFrame) {
        self.router.recv_busmonitor_frame(frame).await;
    }

    async fn link(&self, next: Stage) -> bool {
        if next.is_retired() {
            return false;
        }
        {
            let mut send = self.send.lock().await;
            *send = Some(next.clone());
        }
        let upstream: Weak<dyn LinkRecv> = self.weak_self.clone();
        next.set_recv(upstream).await;
        true
    }

    /// A connect is the top of its chain; the upward search ends here.
    async fn find_filter(&self, _name: &str) -> Option<Arc<FilterStage>> {
        None
    }

    async fn relink_send(&self, next: Option<Stage>) {
        *self.send.lock().await = next;
    }
}

impl Drop for LinkConnect {
    fn drop(&mut self) {
        let state = match self.addr.get_mut() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        };
        if state.local && !state.addr.is_unassigned() {
            debug!(
                event = events::ADDR_RELEASE,
                component = COMPONENT,
                section = self.base.cfg().name(),
                link_id = %self.id,
                addr = %state.addr,
                "returning client address to pool"
            );
            self.router.release_client_addr(state.addr);
        }
    }
}
