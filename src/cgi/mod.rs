//! CGI execution
//!
//! Runs an executable from the document root as a child process. Request
//! metadata goes into the child's environment, the request body into its
//! stdin, and its stdout is relayed to the client.

pub mod env;
pub mod executor;

pub use env::CgiEnvironment;
pub use executor::{CgiExecutor, CgiOutcome};
