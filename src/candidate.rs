//! # Candidate Flow
//!
//! Client logic/relevant structures.
//!
//! ## Overall Payloads
//!
//! Responses/requests between the frontend and backend, all JSON, camelCase.
//!
//! ### Register
//! To backend
//! - `POST /registrations`, `{ name, email, examName }`
//!
//! From backend
//! - 201, `{ nupcan, progress, notified }`
//! - 422 when a field is missing or the email is not one
//! - 503 + `Retry-After: 1` when the counter row could not be locked in time, just retry
//!
//! ### Progress
//! - `GET /progress/{nupcan}`: `{ progress, completionPercentage }`, 404 if nothing recorded
//! - `POST /progress/{nupcan}/stages/{stage}`: after documents upload or payment
//! - `GET /progress/{nupcan}/access/{stage}`: `{ stage, allowed }`
//!
//! ### Progression record
//! - `currentStage`: `inscription | documents | payment | done`
//! - `completedStages`: array, only ever grows
//! - `documentsUploaded`, `paymentDone`: mirror `completedStages`
//! - `registeredAt`, `lastAccessedAt`: RFC 3339
//!
//!
//!
//! ## Flow
//!
//! - Candidate picks an exam and submits the registration form
//! - Backend answers with the NUPCAN, confirmation page shows it
//! - Confirmation email goes out with the same NUPCAN, a bounce does not matter
//! - Documents page is reachable once inscription is recorded
//! - Payment page is reachable once documents are recorded, even if payment was already made
//! - Status page reads the record to show the percentage and where to resume
//!
//!
//!
//! ## Interrupted Sessions
//!
//! - Candidate comes back with the NUPCAN, status page fetches the record
//! - Nothing recorded (unknown, expired, or corrupt): treat as "not started" and let them
//!   re-initialize, never block navigation on a bad record
//! - Two tabs on one NUPCAN: last write wins
