//! Replicated delayed-delivery scheduler core.
//!
//! Producers submit messages tagged with an `available_at` unix timestamp;
//! the cluster holds them in per-channel priority queues — kept identical on
//! every replica by a consensus-committed command log — until they fall due,
//! then a polling delivery loop forwards them to the channel's destination
//! driver.
//!
//! # Modules
//!
//! - [`store`]: channel registry and priority queues behind one lock
//! - [`fsm`]: the deterministic reducer plus its command/snapshot codecs
//! - [`cluster`]: the replication-substrate seam and the in-process log
//! - [`applier`]: caller intent → serialized command → bounded submission
//! - [`processor`]: the due-message polling loop
//! - [`ingest`]: listener → applier pump
//! - [`drivers`]: source/sink capability registry and the memory driver

pub mod applier;
pub mod channel;
pub mod cluster;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod ingest;
pub mod message;
pub mod processor;
pub mod store;
pub mod telemetry;

pub use applier::CommandApplier;
pub use channel::{Channel, DestinationSpec, SourceSpec};
pub use cluster::{CommandLog, LocalLog};
pub use config::EsperaConfig;
pub use error::{ApplyError, PersistError, StoreError, SubmitError};
pub use fsm::{
    ApplyOutcome, ApplyResult, Command, PrioritizedStateMachine, StateMachine, StoreSnapshot,
};
pub use ingest::{IngestPump, IngestTarget};
pub use message::Message;
pub use processor::DeliveryProcessor;
pub use store::ChannelPriorityStore;
