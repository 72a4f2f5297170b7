// Conformance test helpers: failed assertions are the whole point.
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Standard conformance tests shared across Hydra's backend client and
//! tool implementations.
//!
//! `backend_client_tests` exercises [`hydra_client::BackendClient`]
//! against any Ollama-style node (real or `hydra-testing`-mocked).
//! `tool_tests` defines [`tool_tests::ToolConformance`], a trait with
//! default test methods any [`hydra_tools::Tool`] implementation can
//! inherit to verify it obeys the Tool Registry's expectations.

pub mod tool_tests;
