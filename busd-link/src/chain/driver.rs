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

//! Bottom-of-chain stage talking to a bus transport.
//!
//! The driver owns no stage; it is owned by the filter (or connect)
//! directly above it and forwards everything arriving from the transport
//! upward through its weak back-reference. Transport I/O itself is behind
//! the [`BusTransport`] capability, and the transport reports inbound
//! traffic and activation results through a registered [`DriverEvents`]
//! observer handle.

use crate::chain::base::LinkBase;
use crate::chain::connect::LinkConnect;
use crate::chain::filter::FilterStage;
use crate::chain::server::Server;
use crate::chain::stage::{ChainError, LinkRecv, Stage};
use crate::config::ConfigSection;
use crate::diag::{codes, Diag};
use crate::observability::{events, fields};
use crate::telegram::{BusAddr, BusmonitorFrame, Telegram};
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const COMPONENT: &str = "driver";

/// Transport-level failures surfaced to the driver.
#[derive(Debug)]
pub enum TransportError {
    NotConnected,
    Rejected(String),
    Io(String),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NotConnected => write!(f, "transport is not connected"),
            TransportError::Rejected(reason) => write!(f, "transport rejected request: {reason}"),
            TransportError::Io(reason) => write!(f, "transport I/O failure: {reason}"),
        }
    }
}

impl Error for TransportError {}

/// Result of an open/close request against a transport.
#[derive(Debug, Eq, PartialEq)]
pub enum Activation {
    /// The transition finished synchronously.
    Complete,
    /// The transport confirms later through its [`DriverEvents`] handle.
    Pending,
}

/// Bus transport capability below a driver.
#[async_trait]
pub trait BusTransport: Send + Sync {
    /// Attaches to the bus. `events` is the observer the transport uses
    /// for inbound traffic and for deferred activation confirmation.
    async fn open(&self, events: DriverEvents) -> Result<Activation, TransportError>;

    /// Detaches from the bus.
    async fn close(&self) -> Result<Activation, TransportError>;

    /// Transmits a telegram onto the bus.
    async fn transmit(&self, telegram: Telegram) -> Result<(), TransportError>;
}

/// Observer handle a transport uses to report into its driver. Holding it
/// never keeps the driver alive; events after teardown are dropped.
#[derive(Clone)]
pub struct DriverEvents {
    driver: Weak<DriverStage>,
}

impl DriverEvents {
    /// The transport finished activating.
    pub async fn started(&self) {
        if let Some(driver) = self.driver.upgrade() {
            driver.started().await;
        }
    }

    /// The transport finished deactivating.
    pub async fn stopped(&self) {
        if let Some(driver) = self.driver.upgrade() {
            driver.stopped().await;
        }
    }

    /// A telegram arrived from the bus.
    pub async fn telegram(&self, telegram: Telegram) {
        if let Some(driver) = self.driver.upgrade() {
            driver.recv_telegram(telegram).await;
        }
    }

    /// A busmonitor frame arrived from the bus.
    pub async fn busmonitor_frame(&self, frame: BusmonitorFrame) {
        if let Some(driver) = self.driver.upgrade() {
            driver.recv_busmonitor_frame(frame).await;
        }
    }
}

/// The role a driver plays in its chain.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DriverKind {
    /// Serves a whole bus segment.
    Bus,
    /// Bus-segment driver spawned by a server for one connecting client.
    Sub,
    /// Single-client driver carrying its own bus address.
    Line,
}

/// The tail stage of a chain.
pub struct DriverStage {
    base: LinkBase,
    kind: DriverKind,
    transport: Arc<dyn BusTransport>,
    recv: Mutex<Weak<dyn LinkRecv>>,
    conn: Weak<LinkConnect>,
    addr: StdMutex<BusAddr>,
    server: Option<Arc<dyn Server>>,
    weak_self: Weak<DriverStage>,
}

impl DriverStage {
    /// Creates a bus-segment driver.
    pub fn bus(cfg: ConfigSection, parent: &Diag, transport: Arc<dyn BusTransport>) -> Arc<Self> {
        Self::build(DriverKind::Bus, cfg, parent, transport, None, Weak::new())
    }

    /// Creates a per-client bus driver below a server-spawned connect.
    pub fn sub(
        conn: &Arc<LinkConnect>,
        transport: Arc<dyn BusTransport>,
    ) -> Result<Arc<Self>, ChainError> {
        let server = conn.server().ok_or(ChainError::NotClientScoped)?;
        Ok(Self::build(
            DriverKind::Sub,
            conn.base().cfg().clone(),
            conn.base().diag(),
            transport,
            Some(server),
            Arc::downgrade(conn),
        ))
    }

    /// Creates a single-client driver below a server-spawned connect; its
    /// address is copied from the connect during setup.
    pub fn line(
        conn: &Arc<LinkConnect>,
        transport: Arc<dyn BusTransport>,
    ) -> Result<Arc<Self>, ChainError> {
        let server = conn.server().ok_or(ChainError::NotClientScoped)?;
        Ok(Self::build(
            DriverKind::Line,
            conn.base().cfg().clone(),
            conn.base().diag(),
            transport,
            Some(server),
            Arc::downgrade(conn),
        ))
    }

    fn build(
        kind: DriverKind,
        cfg: ConfigSection,
        parent: &Diag,
        transport: Arc<dyn BusTransport>,
        server: Option<Arc<dyn Server>>,
        conn: Weak<LinkConnect>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| {
            let unlinked: Weak<dyn LinkRecv> = Weak::<FilterStage>::new();
            Self {
                base: LinkBase::new(cfg, parent),
                kind,
                transport,
                recv: Mutex::new(unlinked),
                conn,
                addr: StdMutex::new(BusAddr::UNASSIGNED),
                server,
                weak_self: weak_self.clone(),
            }
        })
    }

    pub fn base(&self) -> &LinkBase {
        &self.base
    }

    pub fn kind(&self) -> DriverKind {
        self.kind
    }

    pub fn server(&self) -> Option<Arc<dyn Server>> {
        self.server.clone()
    }

    /// The driver's own bus address; meaningful for line drivers only.
    pub fn addr(&self) -> BusAddr {
        *self
            .addr
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn info(&self, level: u8) -> String {
        self.base.info(level)
    }

    /// The observer handle handed to the transport.
    pub fn events(&self) -> DriverEvents {
        DriverEvents {
            driver: self.weak_self.clone(),
        }
    }

    pub(crate) async fn set_recv(&self, upstream: Weak<dyn LinkRecv>) {
        *self.recv.lock().await = upstream;
    }

    async fn upstream(&self) -> Option<Arc<dyn LinkRecv>> {
        self.recv.lock().await.upgrade()
    }

    /// Prepares the driver. Line drivers copy their address from the
    /// owning connect, which must therefore still be alive.
    pub async fn setup(&self) -> bool {
        match self.kind {
            DriverKind::Line => {
                let Some(conn) = self.conn.upgrade() else {
                    return false;
                };
                let mut addr = self
                    .addr
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                *addr = conn.addr();
                true
            }
            DriverKind::Bus | DriverKind::Sub => true,
        }
    }

    /// Requests transport activation. Completion is reported upward via
    /// `started`, either synchronously (`Complete`) or later by the
    /// transport (`Pending`). An open failure settles the chain through
    /// the `stopped` path so no link is left switching forever.
    pub async fn start(&self) {
        match self.transport.open(self.events()).await {
            Ok(Activation::Complete) => self.started().await,
            Ok(Activation::Pending) => {}
            Err(err) => {
                self.base
                    .diag()
                    .error(codes::TRANSPORT_OPEN, format!("opening transport: {err}"));
                self.stopped().await;
            }
        }
    }

    /// Requests transport deactivation; mirror of [`start`](Self::start).
    pub async fn stop(&self) {
        match self.transport.close().await {
            Ok(Activation::Complete) => self.stopped().await,
            Ok(Activation::Pending) => {}
            Err(err) => {
                self.base
                    .diag()
                    .error(codes::TRANSPORT_OPEN, format!("closing transport: {err}"));
                self.stopped().await;
            }
        }
    }

    pub async fn started(&self) {
        if let Some(up) = self.upstream().await {
            up.started().await;
        }
    }

    pub async fn stopped(&self) {
        if let Some(up) = self.upstream().await {
            up.stopped().await;
        }
    }

    /// A telegram from the transport, forwarded upward; dropped silently
    /// when the upstream stage no longer exists.
    pub async fn recv_telegram(&self, telegram: Telegram) {
        match self.upstream().await {
            Some(up) => up.recv_telegram(telegram).await,
            None => {
                debug!(
                    event = events::FORWARD_DROPPED_EXPIRED,
                    component = COMPONENT,
                    section = self.base.cfg().name(),
                    reason = fields::REASON_UPSTREAM_EXPIRED,
                    "telegram dropped"
                );
            }
        }
    }

    /// A busmonitor frame from the transport, forwarded upward.
    pub async fn recv_busmonitor_frame(&self, frame: BusmonitorFrame) {
        match self.upstream().await {
            Some(up) => up.recv_busmonitor_frame(frame).await,
            None => {
                debug!(
                    event = events::FORWARD_DROPPED_EXPIRED,
                    component = COMPONENT,
                    section = self.base.cfg().name(),
                    reason = fields::REASON_UPSTREAM_EXPIRED,
                    "busmonitor frame dropped"
                );
            }
        }
    }

    /// Transmits a telegram onto the bus.
    pub async fn send_telegram(&self, telegram: Telegram) {
        if let Err(err) = self.transport.transmit(telegram).await {
            warn!(
                event = events::TRANSPORT_SEND_FAILED,
                component = COMPONENT,
                section = self.base.cfg().name(),
                err = %err,
                "transmit failed"
            );
        }
    }

    /// Upward name lookup. Drivers are not addressable by filter name and
    /// delegate without comparing themselves.
    pub async fn find_filter(&self, name: &str) -> Option<Arc<FilterStage>> {
        let up = self.upstream().await?;
        up.find_filter(name).await
    }

    /// Inserts `filter` between this driver and its current upstream
    /// neighbor. Atomic with respect to the visible chain: on any failure
    /// the chain is exactly what it was before the call.
    pub async fn push_filter(&self, filter: Arc<FilterStage>) -> bool {
        let Some(up) = self.upstream().await else {
            return false;
        };
        let Some(me) = self.weak_self.upgrade() else {
            return false;
        };

        let filter_name = filter.effective_name();
        if !up.link(Stage::Filter(filter.clone())).await {
            warn!(
                event = events::CHAIN_FILTER_INSERT_FAILED,
                component = COMPONENT,
                section = self.base.cfg().name(),
                filter_name = %filter_name,
                reason = "upstream_refused",
                "filter insert failed"
            );
            return false;
        }
        if !filter.link(Stage::Driver(me.clone())).await {
            up.link(Stage::Driver(me)).await;
            warn!(
                event = events::CHAIN_FILTER_ROLLBACK,
                component = COMPONENT,
                section = self.base.cfg().name(),
                filter_name = %filter_name,
                reason = "filter_refused_driver",
                "filter insert rolled back"
            );
            return false;
        }

        if !filter.setup().await {
            filter.unlink().await;
            warn!(
                event = events::CHAIN_FILTER_ROLLBACK,
                component = COMPONENT,
                section = self.base.cfg().name(),
                filter_name = %filter_name,
                reason = "filter_setup_failed",
                "filter insert rolled back"
            );
            return false;
        }

        debug!(
            event = events::CHAIN_FILTER_INSERT_OK,
            component = COMPONENT,
            section = self.base.cfg().name(),
            filter_name = %filter_name,
            "filter inserted above driver"
        );
        true
    }
}
