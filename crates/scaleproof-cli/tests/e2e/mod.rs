//! End-to-end tests for scaleproof scenarios
//!
//! These run the built-in scenarios against a live cluster with KEDA
//! installed. They are compiled only with the `cluster-e2e` feature.
//!
//! # Running Tests
//!
//! ```bash
//! # Cluster from the default kubeconfig
//! cargo test -p scaleproof-cli --features cluster-e2e --test e2e -- --nocapture
//!
//! # Explicit cluster, including the ignored standalone variants
//! SCALEPROOF_E2E_KUBECONFIG=/path/to/kubeconfig \
//! cargo test -p scaleproof-cli --features cluster-e2e --test e2e -- --ignored --nocapture
//! ```

#[cfg(feature = "cluster-e2e")]
mod context;
mod kubernetes_workload_e2e;
