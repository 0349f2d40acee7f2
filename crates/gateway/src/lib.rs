//! Gateway: the HTTP server that receives bridge notifications.
//!
//! Lifecycle:
//! 1. Build the handler registry and install the configured handlers
//! 2. Bind the listener and serve the notification endpoint
//! 3. Each accepted notification is decoded and handed to the dispatch engine
//! 4. On Ctrl-C / SIGTERM, stop accepting requests and clear the registry

#[cfg(feature = "prometheus")]
pub mod metrics_routes;
pub mod routes;
pub mod server;
pub mod state;
