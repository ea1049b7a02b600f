// [[RARO]]/apps/insight-kernel/src/lib.rs
// Purpose: Run insight engine. Pure derivations over agent-execution event
// streams, plus the in-memory ledger and HTTP shell that serve them.
// Architecture: Crate Root

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod detect;
pub mod error;
pub mod events;
pub mod filter;
pub mod ledger;
pub mod models;
pub mod observability;
pub mod progress;
pub mod server;
pub mod timestamps;

pub use aggregator::derive_agent_states;
pub use classifier::{classify_event, classify_events, MappedEvent};
pub use detect::{detect_chartable_data, detect_structured_data, format_large_number};
pub use events::{EventKind, RunEvent, Severity};
pub use filter::{filter_events_for_display, FilterOptions};
pub use ledger::{RunLedger, RunManifest, RunSnapshot};
pub use progress::{calculate_progress, get_current_stage};
