// src/lib.rs
//! # Academic Certificate Registry
//!
//! Certificate chaincode for a permissioned ledger plus the HTTP gateway that
//! drives it.
//!
//! ## Layout
//! 1. **Blockchain Layer**: ledger stub, iterator and network abstractions
//! 2. **Contracts Layer**: certificate lifecycle, validation, access control
//! 3. **Services Layer**: gateway service and HTTP API
//! 4. **Storage Layer**: in-process ledger with MVCC and history

pub mod blockchain; // Ledger abstractions
pub mod config; // Layered runtime settings
pub mod contracts; // Certificate chaincode
pub mod models; // Data structures
pub mod services; // Gateway and API
pub mod storage; // In-memory ledger
pub mod utils; // Helper functions
