//! Core library for acervo
//!
//! This crate implements the **Functional Core** of the acervo ingestion
//! pipeline, following the Functional Core - Imperative Shell pattern.
//!
//! # Architecture Overview
//!
//! The acervo project uses a multi-crate workspace to enforce separation of
//! concerns:
//!
//! - **`acervo_core`** (this crate): Pure transformation and decision logic
//!   with zero I/O
//! - **`pdf`**: The text-extraction collaborator (lopdf-backed)
//! - **`acervo`**: CLI, HTTP clients and orchestration (the Imperative Shell)
//!
//! Every stage of the pipeline between raw report text (or open-data
//! records) and the final commit payload lives here as pure functions and
//! a pure state machine:
//!
//! - [`report`]: line-oriented extraction of staging assets from the
//!   institutional PDF report text (field extraction, running location
//!   context, category mapping)
//! - [`opendata`]: mapping of structured open-data records onto the same
//!   staging shape
//! - [`validate`]: whole-batch validation against required fields, tag
//!   format and duplicates (batch-internal plus a pre-fetched registry
//!   snapshot)
//! - [`normalize`]: batch-wide resolution of free-text location/category
//!   references to canonical taxonomy entries
//! - [`session`]: the import session state machine driving the staged,
//!   resumable, partially-reversible workflow up to the single commit
//!
//! The shell performs every network call and file read, then hands the
//! results to this crate. Functions here are deterministic and are tested
//! with fixture data, no mocking required.

pub mod money;
pub mod normalize;
pub mod opendata;
pub mod report;
pub mod session;
pub mod staging;
pub mod validate;
