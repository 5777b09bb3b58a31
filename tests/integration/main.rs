//! End-to-end tests for the wrapper API and the vendor clients.

mod api;
mod mock_provider;
mod providers;
