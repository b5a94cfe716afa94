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

//! Intermediate chain stage with pluggable behavior.
//!
//! A filter owns the stage below it (`send`) and is weakly referenced by
//! it in return. Behavior is injected as a [`FilterLogic`]; the defaults
//! pass everything through unchanged, so a logic only overrides the hooks
//! it cares about.

use crate::chain::base::LinkBase;
use crate::chain::connect::LinkConnect;
use crate::chain::stage::{LinkRecv, Stage};
use crate::config::ConfigSection;
use crate::diag::Diag;
use crate::observability::events;
use crate::telegram::{BusmonitorFrame, Telegram};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::debug;

const COMPONENT: &str = "filter";

/// Behavior seam of a filter stage.
///
/// Every hook receives the owning stage so it can forward, inspect
/// configuration, or walk the chain. The defaults forward unchanged;
/// dropping a telegram is simply not forwarding it.
#[async_trait]
pub trait FilterLogic: Send + Sync {
    /// Prepares the logic. Runs at insertion and again during the
    /// connect's top-down setup walk; implementations must tolerate both.
    async fn setup(&self, stage: &FilterStage) -> bool {
        let _ = stage;
        true
    }

    /// Whether this filter accepts `next` as its downstream stage.
    /// Position-sensitive filters veto here (for example a logic that only
    /// works directly above the driver).
    fn accept_link(&self, next: &Stage) -> bool {
        let _ = next;
        true
    }

    /// A telegram moving bottom-up through this filter.
    async fn recv_telegram(&self, stage: &FilterStage, telegram: Telegram) {
        stage.forward_telegram(telegram).await;
    }

    /// A telegram moving top-down through this filter.
    async fn send_telegram(&self, stage: &FilterStage, telegram: Telegram) {
        stage.forward_send(telegram).await;
    }

    /// A busmonitor frame moving bottom-up through this filter.
    async fn recv_busmonitor_frame(&self, stage: &FilterStage, frame: BusmonitorFrame) {
        stage.forward_busmonitor(frame).await;
    }
}

/// An intermediate stage of a chain.
pub struct FilterStage {
    base: LinkBase,
    logic: Box<dyn FilterLogic>,
    conn: Weak<LinkConnect>,
    send: Mutex<Option<Stage>>,
    recv: Mutex<Weak<dyn LinkRecv>>,
    retired: AtomicBool,
    weak_self: Weak<FilterStage>,
}

impl FilterStage {
    /// Creates an unlinked filter bound to its owning connect.
    pub fn new(
        cfg: ConfigSection,
        parent: &Diag,
        owner: &Arc<LinkConnect>,
        logic: Box<dyn FilterLogic>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| {
            let unlinked: Weak<dyn LinkRecv> = Weak::<FilterStage>::new();
            Self {
                base: LinkBase::new(cfg, parent),
                logic,
                conn: Arc::downgrade(owner),
                send: Mutex::new(None),
                recv: Mutex::new(unlinked),
                retired: AtomicBool::new(false),
                weak_self: weak_self.clone(),
            }
        })
    }

    /// The name this filter answers to: the `filter` key, falling back to
    /// the section name.
    pub fn effective_name(&self) -> String {
        let cfg = self.base.cfg();
        cfg.value("filter", cfg.name())
    }

    /// The connect owning the chain this filter belongs to.
    pub fn connect(&self) -> Option<Arc<LinkConnect>> {
        self.conn.upgrade()
    }

    /// The stage directly below, if linked.
    pub async fn next(&self) -> Option<Stage> {
        self.send.lock().await.clone()
    }

    pub fn base(&self) -> &LinkBase {
        &self.base
    }

    pub fn info(&self, level: u8) -> String {
        self.base.info(level)
    }

    pub(crate) fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    pub(crate) async fn set_recv(&self, upstream: Weak<dyn LinkRecv>) {
        *self.recv.lock().await = upstream;
    }

    async fn upstream(&self) -> Option<Arc<dyn LinkRecv>> {
        self.recv.lock().await.upgrade()
    }

    /// Splices this filter out of its chain, restoring the direct edge
    /// between its neighbors, and retires it. A retired filter refuses any
    /// further linkage.
    pub async fn unlink(&self) {
        let downstream = { self.send.lock().await.take() };
        let upstream = { self.recv.lock().await.upgrade() };

        if let Some(up) = upstream {
            up.relink_send(downstream.clone()).await;
            if let Some(stage) = &downstream {
                stage.set_recv(Arc::downgrade(&up)).await;
            }
        }

        let unlinked: Weak<dyn LinkRecv> = Weak::<FilterStage>::new();
        *self.recv.lock().await = unlinked;
        self.retired.store(true, Ordering::Release);

        debug!(
            event = events::CHAIN_FILTER_UNLINK,
            component = COMPONENT,
            filter_name = %self.effective_name(),
            "filter spliced out of chain"
        );
    }

    /// A telegram moving top-down; runs the egress hook.
    pub async fn send_telegram(&self, telegram: Telegram) {
        self.logic.send_telegram(self, telegram).await;
    }

    /// Forwards a telegram to the upstream neighbor; dropped silently when
    /// the neighbor is gone.
    pub async fn forward_telegram(&self, telegram: Telegram) {
        if let Some(up) = self.upstream().await {
            up.recv_telegram(telegram).await;
        }
    }

    /// Forwards a telegram to the downstream stage; dropped when unlinked.
    pub async fn forward_send(&self, telegram: Telegram) {
        let next = { self.send.lock().await.clone() };
        if let Some(stage) = next {
            stage.send_telegram(telegram).await;
        }
    }

    /// Forwards a busmonitor frame to the upstream neighbor.
    pub async fn forward_busmonitor(&self, frame: BusmonitorFrame) {
        if let Some(up) = self.upstream().await {
            up.recv_busmonitor_frame(frame).await;
        }
    }
}

#[async_trait]
impl LinkRecv for FilterStage {
    fn base(&self) -> &LinkBase {
        &self.base
    }

    async fn setup(&self) -> bool {
        self.logic.setup(self).await
    }

    async fn start(&self) {
        let next = { self.send.lock().await.clone() };
        if let Some(stage) = next {
            stage.start().await;
        }
    }

    async fn stop(&self) {
        let next = { self.send.lock().await.clone() };
        if let Some(stage) = next {
            stage.stop().await;
        }
    }

    async fn started(&self) {
        if let Some(up) = self.upstream().await {
            up.started().await;
        }
    }

    async fn stopped(&self) {
        if let Some(up) = self.upstream().await {
            up.stopped().await;
        }
    }

    async fn recv_telegram(&self, telegram: Telegram) {
        self.logic.recv_telegram(self, telegram).await;
    }

    async fn recv_busmonitor_frame(&self, frame: BusmonitorFrame) {
        self.logic.recv_busmonitor_frame(self, frame).await;
    }

    async fn link(&self, next: Stage) -> bool {
        if self.is_retired() || next.is_retired() {
            return false;
        }
        if !self.logic.accept_link(&next) {
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

    async fn find_filter(&self, name: &str) -> Option<Arc<FilterStage>> {
        let up = self.upstream().await?;
        if self.effective_name() == name {
            return self.weak_self.upgrade();
        }
        up.find_filter(name).await
    }

    async fn relink_send(&self, next: Option<Stage>) {
        *self.send.lock().await = next;
    }
}
