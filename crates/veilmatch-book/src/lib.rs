//! # veilmatch-book
//!
//! The procurement orderbook: providers' public asks and agents' sealed
//! bids, plus the pure clearing function that matches the lowest ask to
//! the highest revealed bid per category.
//!
//! The book holds ciphertext only. Revealing amounts is the clearing
//! orchestrator's job; `clear` just consumes what was revealed.

pub mod book;
pub mod matching;

pub use book::ProcurementBook;
pub use matching::clear;
