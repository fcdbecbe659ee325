//! Shared plumbing for the `postman` binaries: credential configuration.
//! The engine itself lives in `postman-journal` and `postman-pop3`.

pub mod config;
