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

//! Narrow router capability consumed by the chain.
//!
//! The router owns the link registry, the bus address space, and global
//! telegram dispatch; the chain only depends on this contract and receives
//! it by injection at construction. Address-pool calls are synchronous so
//! a connect can release its address from `Drop`.

use crate::chain::connect::LinkConnect;
use crate::chain::filter::FilterStage;
use crate::config::ConfigSection;
use crate::diag::Diag;
use crate::telegram::{BusAddr, BusmonitorFrame, Telegram};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait RouterApi: Send + Sync {
    /// Hands out an address from the client pool; `UNASSIGNED` when the
    /// pool is exhausted.
    fn get_client_addr(&self, diag: &Diag) -> BusAddr;

    /// Returns a pool address. Only addresses obtained from
    /// [`get_client_addr`](Self::get_client_addr) are ever passed back.
    fn release_client_addr(&self, addr: BusAddr);

    /// Configuration-section lookup by name.
    fn section(&self, name: &str) -> ConfigSection;

    /// Produces a filter stage of the given logical name, bound to the
    /// owning connect. `None` when the name resolves to no known filter.
    async fn get_filter(
        &self,
        owner: Arc<LinkConnect>,
        section: ConfigSection,
        name: &str,
    ) -> Option<Arc<FilterStage>>;

    /// A link finished its start handshake.
    async fn link_started(&self, link: Arc<LinkConnect>);

    /// A link finished its stop handshake.
    async fn link_stopped(&self, link: Arc<LinkConnect>);

    /// A telegram reached the top of a chain.
    async fn recv_telegram(&self, telegram: Telegram, from: Arc<LinkConnect>);

    /// A busmonitor frame reached the top of a chain.
    async fn recv_busmonitor_frame(&self, frame: BusmonitorFrame);
}
