// Test helper crate: unwrap/expect are fine in fixtures and assertions.
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Testing utilities for Hydra: a mock tool for exercising the Agent Loop
//! and Tool Registry, a plain `Node` fixture builder, a `wiremock`-backed
//! fake node for exercising the Router, Pool Facade, and Health Monitor
//! against a real HTTP listener, and a `test_harness` module assembling a
//! `NodeRegistry` out of several of them at once.

mod mock_backend_client;
mod mock_node;
mod mock_tool;
mod test_harness;

pub use mock_backend_client::MockBackendClient;
pub use mock_node::MockNode;
pub use mock_tool::{MockTool, MockToolHandler};
pub use test_harness::TestCluster;

pub mod prelude {
    pub use crate::{MockBackendClient, MockNode, MockTool, TestCluster};
}
