//! Documentation of the GabConcours exam registration backend.
//!
//! Candidates browse competitive exams, register, upload documents, pay fees and follow
//! their application. This workspace covers the part that hands out application numbers
//! and tracks how far each candidate got. The back office and the document/payment
//! services are separate.
//!
//!
//!
//! # General Infrastructure
//! - Frontend talks to the `backend` binary (crate `server`) over JSON
//! - Postgres holds the daily NUPCAN counters, one row per `MM-DD`
//! - Redis holds progression records, one key per NUPCAN, expiring after a year
//! - Mail relay sends confirmation emails, optional
//! - Several `backend` replicas can run side by side, the counter row lock is the only
//!   serialization point
//!
//!
//!
//! # NUPCAN
//!
//! `GABCONCOURS-<MM-DD>-<N>` where `N` restarts at 1 every day.
//!
//! - Minted inside one transaction holding the day's counter row lock
//! - Two registrations racing on the same day never get the same `N`
//! - A failed registration never burns a number
//! - Counter table is created on first use if missing
//!
//!
//!
//! # Progress
//!
//! See [`candidate`] for the client side of the flow.
//!
//! Monotone: inscription, documents, payment, done. Used only to decide what the
//! candidate may open next, the back office stays the authority on real status.
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run the API with in-memory progress.
//! ```sh
//! PROGRESS_BACKEND=memory RUST_LOG=info cargo run -p backend
//! ```
//!
//! Create the counter table ahead of time.
//! ```sh
//! cargo run -p process -- bootstrap
//! ```
//!
//! Hammer a running server and check numbering.
//! ```sh
//! cargo run -p tester -- --url http://localhost:1111 --count 200
//! ```
//!
//!
//!
//! # Secrets
//!
//! Read from `/run/secrets/<NAME>` (Docker swarm secrets).
//! - `POSTGRES_PASSWORD`
pub mod candidate;

pub use registry::{
    DateKey, Nupcan, ProgressStore, ProgressTracker, Progression, RegistryError,
    SequenceAllocator, Stage,
};
pub use server::start_server;
