// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Landing page.

use axum::{Router, response::Html, routing::get};

use crate::state::AppState;

const LANDING_PAGE: &str = concat!(
    "<!doctype html>\n",
    "<html><head><meta charset=\"utf-8\"><title>HITL bridge</title></head>\n",
    "<body>\n",
    "<h1>HITL bridge</h1>\n",
    "<p>Human-in-the-loop signalling for workflow executions. Version ",
    env!("CARGO_PKG_VERSION"),
    ".</p>\n",
    "<ul>\n",
    "<li><a href=\"/docs\">API documentation</a></li>\n",
    "<li><a href=\"/health\">Engine health</a></li>\n",
    "</ul>\n",
    "</body></html>\n",
);

pub async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

pub fn landing_routes() -> Router<AppState> {
    Router::new().route("/", get(landing))
}
