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

//! # busd-link
//!
//! `busd-link` implements the link-chain subsystem of the busd field-bus
//! access daemon: the machinery that assembles, starts, stops, and tears
//! down a pipeline of processing stages carrying bus telegrams between a
//! bus endpoint and the central router.
//!
//! A chain is anchored by a [`LinkConnect`], which strongly owns an ordered
//! sequence of [`FilterStage`]s terminated by exactly one [`DriverStage`].
//! Telegrams received from the bus flow bottom-up (driver → filters →
//! connect → router); control flows top-down. Each stage holds a weak
//! back-reference to its upstream neighbor, so the doubly-linked chain has
//! a single ownership direction and no reference cycles.
//!
//! The router, the transport below the driver, and the diagnostic sink are
//! consumed through narrow capability traits ([`RouterApi`],
//! [`BusTransport`], [`DiagnosticSink`]) injected at construction.
//!
//! ```
//! use std::sync::Arc;
//! use busd_link::{
//!     Activation, BusTransport, ConfigSection, Diag, DriverEvents, DriverStage, LinkConnect,
//!     LinkRecv, RouterApi, Telegram, TracingSink, TransportError,
//! };
//!
//! # use async_trait::async_trait;
//! # use busd_link::{BusAddr, BusmonitorFrame, ConfigStore, FilterStage};
//! # struct NullRouter(ConfigStore);
//! # #[async_trait]
//! # impl RouterApi for NullRouter {
//! #     fn get_client_addr(&self, _diag: &Diag) -> BusAddr { BusAddr::UNASSIGNED }
//! #     fn release_client_addr(&self, _addr: BusAddr) {}
//! #     fn section(&self, name: &str) -> ConfigSection { self.0.section(name) }
//! #     async fn get_filter(
//! #         &self,
//! #         _owner: Arc<LinkConnect>,
//! #         _section: ConfigSection,
//! #         _name: &str,
//! #     ) -> Option<Arc<FilterStage>> { None }
//! #     async fn link_started(&self, _link: Arc<LinkConnect>) {}
//! #     async fn link_stopped(&self, _link: Arc<LinkConnect>) {}
//! #     async fn recv_telegram(&self, _telegram: Telegram, _from: Arc<LinkConnect>) {}
//! #     async fn recv_busmonitor_frame(&self, _frame: BusmonitorFrame) {}
//! # }
//! # struct NullTransport;
//! # #[async_trait]
//! # impl BusTransport for NullTransport {
//! #     async fn open(&self, _events: DriverEvents) -> Result<Activation, TransportError> {
//! #         Ok(Activation::Complete)
//! #     }
//! #     async fn close(&self) -> Result<Activation, TransportError> {
//! #         Ok(Activation::Complete)
//! #     }
//! #     async fn transmit(&self, _telegram: Telegram) -> Result<(), TransportError> { Ok(()) }
//! # }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let router: Arc<dyn RouterApi> = Arc::new(NullRouter(ConfigStore::default()));
//! let diag = Diag::new(Arc::new(TracingSink));
//!
//! let connect = LinkConnect::new(router.clone(), router.section("tpuart"), &diag);
//! let driver = DriverStage::bus(
//!     router.section("tpuart"),
//!     &diag,
//!     Arc::new(NullTransport),
//! );
//!
//! assert!(connect.set_driver(driver).await);
//! assert!(connect.setup().await);
//! connect.start().await;
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Chain core: stage roles, linking protocol, connect state machine
//! - Filters: behavior seam and the named-constructor registry
//! - Contracts: router, transport, server, configuration, diagnostics
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events. Library code emits
//! events/spans and does not unconditionally initialize a global
//! subscriber. Binaries and tests are responsible for one-time
//! `tracing_subscriber` initialization at process boundaries.

mod chain;
mod config;
mod diag;
mod filters;
mod router_api;
mod telegram;

#[doc(hidden)]
pub mod observability;

pub use chain::base::LinkBase;
pub use chain::connect::{ConnectScope, LinkConnect, RunState};
pub use chain::driver::{
    Activation, BusTransport, DriverEvents, DriverKind, DriverStage, TransportError,
};
pub use chain::filter::{FilterLogic, FilterStage};
pub use chain::server::Server;
pub use chain::stage::{ChainError, LinkRecv, Stage};
pub use config::{ConfigError, ConfigSection, ConfigStore};
pub use diag::codes;
pub use diag::{Diag, DiagnosticEvent, DiagnosticSink, Severity, TracingSink};
pub use filters::{FilterRegistry, LogFilter, LogicConstructor};
pub use router_api::RouterApi;
pub use telegram::{BusAddr, BusmonitorFrame, Telegram};
