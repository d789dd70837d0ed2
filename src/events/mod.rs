//! # Events Module
//!
//! Progress reporting decoupled from presentation.
//!
//! The engine emits events through a channel; the CLI (or any other front
//! end) subscribes and renders progress. A dropped receiver never stalls the
//! engine.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Execute(ExecuteEvent::Progress(p)) = event {
//!             println!("{}/{}", p.completed, p.total);
//!         }
//!     }
//! });
//!
//! executor.execute_with_events(&moves, &sender);
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
