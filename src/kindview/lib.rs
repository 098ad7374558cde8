//! # kindview Architecture
//!
//! kindview is a **UI-agnostic table browser** for schemaless, Datastore-style
//! stores: pick a kind, page through its entities, sort by any property. The
//! library knows nothing about terminals; the bundled CLI is one client of it.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, renders tables, runs the browse loop   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade owning a store and one browsing session      │
//! │  - Returns PageView values, never strings                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Browsing Core                                              │
//! │  - controller.rs: paging/sort state machine over a buffer   │
//! │  - load.rs: raw property tuples → normalized Records        │
//! │  - headers.rs / display.rs: columns and cell strings        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - DataStore trait: list kinds, run one page of a query     │
//! │  - EmulatorStore, FileStore (dump), InMemoryStore (tests)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `api.rs` inward, code takes regular Rust values and returns regular Rust
//! types. It never writes to stdout/stderr and never exits the process. Store
//! adapters do their own I/O (HTTP, file reads) but report every failure as a
//! [`error::BrowseError`].
//!
//! ## Testing Strategy
//!
//! 1. **Core** (`load`, `display`, `headers`, `controller`): unit tests next to
//!    the code, driven by the in-memory store and its fixtures.
//! 2. **Stores**: the scan semantics and the emulator's request/response mapping
//!    are pure functions with their own tests; the file store is tested against
//!    temporary dump files.
//! 3. **CLI**: argument parsing and rendering unit tests, plus end-to-end tests in
//!    `tests/` that run the binary against dump files.
//!
//! ## Module Overview
//!
//! - [`api`]: the API facade
//! - [`controller`]: pagination and sort state
//! - [`load`]: record normalization
//! - [`display`]: value stringification
//! - [`headers`]: column inference
//! - [`model`]: `Value`, `Record`, `Header`, `SortDirection`
//! - [`store`]: storage abstraction and implementations
//! - [`config`]: configuration management
//! - [`error`]: error types
//! - `cli`: argument parsing and templated rendering for the binary (not part of the lib API)

pub mod api;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod headers;
pub mod load;
pub mod model;
pub mod store;
