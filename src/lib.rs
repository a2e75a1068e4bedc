//! # script-glue
//!
//! Small building blocks for scripting around external programs.
//!
//! The centerpiece is [`CmdObserver`], which runs a command and turns its
//! stdout and stderr into timestamped [`LineRecord`]s, either after the
//! run completes or as the lines arrive. Alongside it live a few helpers
//! that scripts tend to need:
//!
//! - **Clipboard**: copy, paste and clear through the platform's helpers
//! - **ReString**: a string newtype with regex and text-munging methods
//! - **PwshRequests**: HTTP calls delegated to a PowerShell script, with
//!   an on-disk response cache
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use script_glue::{CmdObserver, Command, Output};
//!
//! #[tokio::main]
//! async fn main() -> script_glue::Result<()> {
//!     script_glue::logging::try_init().ok();
//!
//!     let observer = CmdObserver::realtime(Command::new("ping").args(["-c", "3", "localhost"]));
//!     observer.start().await?;
//!
//!     loop {
//!         match observer.get(Duration::from_millis(500)).await {
//!             Output::Line(record) => println!("{}", record),
//!             Output::Unavailable if !observer.is_running() => break,
//!             _ => {}
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod logging;
pub mod observer;
pub mod output;
pub mod requests;
pub mod restring;

// Re-export commonly used types
pub use error::{GlueError, Result};
pub use observer::{CmdObserver, Command, LineRecord, Mode, ObserverState, Output, StreamKind};
pub use output::ByteDecoder;
pub use requests::{Method, PwshRequests, Request, RequestSettings};
pub use restring::ReString;
