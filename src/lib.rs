//! A pipeline of threads that copies bytes from a source to a sink, with an artificial delay on
//! each read and write.
//!
//! Two ways of connecting the threads are provided (see [`pipeline::Variant`]):
//!
//!  * Channel: the source hands chunks to a buffer stage over a bounded (by default rendezvous)
//!    channel. The buffer stage collects everything and re-emits it in smaller chunks to the sink.
//!  * Queue: the source pushes chunks onto an unbounded shared queue, which the sink drains by
//!    polling, with a choice of [`shared_queue::WaitStrategy`] for how it waits.
//!
//! Either way, the caller gets back a [`pipeline::PipelineReport`] describing what each stage did.

pub mod cancel;
pub mod chunk;
pub mod completion;
pub mod frontend;
pub mod handoff;
pub mod logger_and_progress;
pub mod pipeline;
pub mod shared_queue;
pub mod stages;


pub use pipeline::{PipelineConfig, PipelineReport, Variant};
