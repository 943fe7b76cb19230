//! Crate includes reusable utils for the rollup services, such as
//! initializing the tracing framework.

pub mod logging;
