// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property and cross-module test harness for `chatgpt-bridge`. Carries no
//! runtime code of its own; see `tests/` for the property suites.
