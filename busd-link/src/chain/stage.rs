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

//! Stage roles and the receiver contract.
//!
//! A chain is a sequence of [`Stage`]s: filters above, exactly one driver
//! at the tail. The variant set is closed, so traversal matches
//! exhaustively instead of probing runtime types; the only structural
//! errors left are a dangling `send` edge and a foreign driver at the
//! tail.

use crate::chain::base::LinkBase;
use crate::chain::driver::DriverStage;
use crate::chain::filter::FilterStage;
use crate::telegram::{BusmonitorFrame, Telegram};
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Weak};

/// Construction failures for chain stages.
#[derive(Debug)]
pub enum ChainError {
    /// A sub/line driver was requested from a connect that carries no
    /// server handle.
    NotClientScoped,
}

impl Display for ChainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::NotClientScoped => {
                write!(f, "driver variant requires a server-spawned connect")
            }
        }
    }
}

impl Error for ChainError {}

/// The contract of every stage that owns a downstream edge and can be the
/// target of upward event forwarding: filters and connects. Drivers sit at
/// the tail and are not receivers.
#[async_trait]
pub trait LinkRecv: Send + Sync {
    fn base(&self) -> &LinkBase;

    /// Prepares the stage.
    async fn setup(&self) -> bool;

    /// Requests activation; completion is reported through
    /// [`started`](Self::started).
    async fn start(&self);

    /// Requests deactivation; completion is reported through
    /// [`stopped`](Self::stopped).
    async fn stop(&self);

    /// Upward confirmation that the stage below finished activating.
    async fn started(&self);

    /// Upward confirmation that the stage below finished deactivating.
    async fn stopped(&self);

    /// A telegram arriving from below.
    async fn recv_telegram(&self, telegram: Telegram);

    /// A busmonitor frame arriving from below.
    async fn recv_busmonitor_frame(&self, frame: BusmonitorFrame);

    /// Re-points the downstream ownership edge at `next`, wiring `next`'s
    /// back-reference to this receiver. Returns `false` — with no edge
    /// mutated — when this receiver or `next` refuses the linkage.
    async fn link(&self, next: Stage) -> bool;

    /// Upward search for a filter by effective name.
    async fn find_filter(&self, name: &str) -> Option<Arc<FilterStage>>;

    /// Raw downstream-edge write used by the splice-out path. Performs no
    /// acceptance checks and touches no back-references.
    #[doc(hidden)]
    async fn relink_send(&self, next: Option<Stage>);
}

/// A chain participant below a receiver: a filter or the tail driver.
#[derive(Clone)]
pub enum Stage {
    Driver(Arc<DriverStage>),
    Filter(Arc<FilterStage>),
}

impl Stage {
    /// The configuration-section name of the stage.
    pub fn section_name(&self) -> String {
        match self {
            Stage::Driver(driver) => driver.base().cfg().name().to_string(),
            Stage::Filter(filter) => filter.base().cfg().name().to_string(),
        }
    }

    /// The name the stage answers to in diagnostics: the effective filter
    /// name for filters, the section name for drivers.
    pub fn display_name(&self) -> String {
        match self {
            Stage::Driver(driver) => driver.base().cfg().name().to_string(),
            Stage::Filter(filter) => filter.effective_name(),
        }
    }

    pub fn ptr_eq(&self, other: &Stage) -> bool {
        match (self, other) {
            (Stage::Driver(a), Stage::Driver(b)) => Arc::ptr_eq(a, b),
            (Stage::Filter(a), Stage::Filter(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) async fn setup(&self) -> bool {
        match self {
            Stage::Driver(driver) => driver.setup().await,
            Stage::Filter(filter) => filter.setup().await,
        }
    }

    pub(crate) async fn start(&self) {
        match self {
            Stage::Driver(driver) => driver.start().await,
            Stage::Filter(filter) => filter.start().await,
        }
    }

    pub(crate) async fn stop(&self) {
        match self {
            Stage::Driver(driver) => driver.stop().await,
            Stage::Filter(filter) => filter.stop().await,
        }
    }

    pub(crate) async fn send_telegram(&self, telegram: Telegram) {
        match self {
            Stage::Driver(driver) => driver.send_telegram(telegram).await,
            Stage::Filter(filter) => filter.send_telegram(telegram).await,
        }
    }

    pub(crate) async fn set_recv(&self, upstream: Weak<dyn LinkRecv>) {
        match self {
            Stage::Driver(driver) => driver.set_recv(upstream).await,
            Stage::Filter(filter) => filter.set_recv(upstream).await,
        }
    }

    pub(crate) fn is_retired(&self) -> bool {
        match self {
            Stage::Driver(_) => false,
            Stage::Filter(filter) => filter.is_retired(),
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Driver(driver) => write!(f, "Stage::Driver({})", driver.base().cfg().name()),
            Stage::Filter(filter) => write!(f, "Stage::Filter({})", filter.effective_name()),
        }
    }
}
