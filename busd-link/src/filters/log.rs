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

//! Built-in `log` filter: traces traffic passing its chain position.

use crate::chain::filter::{FilterLogic, FilterStage};
use crate::observability::{events, fields};
use crate::telegram::{BusmonitorFrame, Telegram};
use async_trait::async_trait;
use tracing::debug;

const COMPONENT: &str = "filter_log";

/// Passes everything through unchanged, logging each telegram and
/// busmonitor frame with its direction and a payload preview.
pub struct LogFilter;

#[async_trait]
impl FilterLogic for LogFilter {
    async fn recv_telegram(&self, stage: &FilterStage, telegram: Telegram) {
        debug!(
            event = events::FILTER_LOG_TELEGRAM,
            component = COMPONENT,
            filter_name = %stage.effective_name(),
            direction = "recv",
            payload = %fields::format_payload_preview(telegram.payload()),
            "telegram"
        );
        stage.forward_telegram(telegram).await;
    }

    async fn send_telegram(&self, stage: &FilterStage, telegram: Telegram) {
        debug!(
            event = events::FILTER_LOG_TELEGRAM,
            component = COMPONENT,
            filter_name = %stage.effective_name(),
            direction = "send",
            payload = %fields::format_payload_preview(telegram.payload()),
            "telegram"
        );
        stage.forward_send(telegram).await;
    }

    async fn recv_busmonitor_frame(&self, stage: &FilterStage, frame: BusmonitorFrame) {
        debug!(
            event = events::FILTER_LOG_BUSMONITOR,
            component = COMPONENT,
            filter_name = %stage.effective_name(),
            direction = "recv",
            payload = %fields::format_payload_preview(frame.payload()),
            "busmonitor frame"
        );
        stage.forward_busmonitor(frame).await;
    }
}
