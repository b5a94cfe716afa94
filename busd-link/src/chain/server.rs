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

//! Listening-endpoint contract.
//!
//! A server accepts connecting clients and spawns a connect per client.
//! Socket handling and client bookkeeping live with the implementor; the
//! chain only needs the router capability behind the server and the setup
//! contract.

use crate::router_api::RouterApi;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Server: Send + Sync {
    /// The router this server registers its client links with.
    fn router(&self) -> Arc<dyn RouterApi>;

    /// Server-level preparation before accepting clients.
    async fn setup(&self) -> bool {
        true
    }
}
