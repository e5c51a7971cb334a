//! API route handlers.
//!
//! Each submodule handles a specific group of endpoints:
//! - `tasks`: Task lifecycle
//! - `submissions`: Submissions and their approve/reject shortcuts
//! - `reviews`: Review records
//! - `users`: Membership and staking
//! - `faucet`: Test token faucet
//! - `datasets`: Dataset registry and access
//! - `governance`: Proposals and votes
//! - `system`: Health, stats, balances and content lookup

pub mod datasets;
pub mod faucet;
pub mod governance;
pub mod reviews;
pub mod submissions;
pub mod system;
pub mod tasks;
pub mod users;
