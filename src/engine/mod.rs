//! Declarative transaction propagation.
//!
//! [`TxManager::do_in_transaction`] inspects the carrier, merges the call's
//! options and decides whether to join the ambient transaction, begin a new
//! one, open a savepoint, suspend, or refuse:
//!
//! | propagation     | transaction active              | no transaction        |
//! |-----------------|---------------------------------|-----------------------|
//! | `REQUIRED`      | join                            | begin                 |
//! | `SUPPORTS`      | join                            | run without           |
//! | `MANDATORY`     | join                            | `NoTransaction`       |
//! | `REQUIRES_NEW`  | begin on an independent session | same                  |
//! | `NOT_SUPPORTED` | run on a transaction-free session | run without         |
//! | `NEVER`         | `TransactionPresent`            | run without           |
//! | `NESTED`        | savepoint                       | begin                 |

mod config;
mod error;
mod manager;
mod savepoint;
mod strategy;


pub use config::{ConfigError, TxManagerConfig};
pub use error::{TxError, TxResult};
pub use manager::{do_in_transaction, TxManager};
pub use savepoint::SavepointNames;
pub use strategy::{PoolCheckout, RequiresNewStrategy};
