//! End-to-end tests over the public API: provider → storage → model →
//! selector → dashboard, with a scripted provider and a temp database.

mod mock_provider;
mod pipeline;
