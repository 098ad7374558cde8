//! # kindview CLI
//!
//! The binary is intentionally thin: the CLI lives in `cli/`, and this file only
//! invokes `cli::run()` and handles process termination.
//!
//! ```text
//! cli/      clap parsing, dispatch, the browse loop, rendering
//!   │
//!   ▼
//! api.rs    BrowserApi: one PageController session over a DataStore
//!   │
//!   ▼
//! controller.rs → load.rs / headers.rs / display.rs
//!   │
//!   ▼
//! store/    DataStore: emulator REST, dump file, in-memory
//! ```

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
