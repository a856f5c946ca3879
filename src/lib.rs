//! A from-scratch reimplementation of Git's core plumbing: object store, KVLM
//! commit/tag codec, tree codec, reference store, name resolution, index reader,
//! ignore engine, and checkout.

pub mod checkout;
pub mod error;
pub mod ignore;
pub mod index;
pub mod kvlm;
pub mod objects;
pub mod refs;
pub mod repository;
pub mod revision;
