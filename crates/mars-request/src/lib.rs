//! MARS-style request language.
//!
//! Field stores are addressed by keyword/value pairs. A [`Request`] names, for
//! every keyword, the set of values it is interested in; a [`Key`] is the
//! complete identification of a single stored record. Both canonicalise their
//! values on entry so that equivalent spellings (`2020-01-01` and `20200101`,
//! `6` and `0600`) compare equal.
//!
//! # Example
//!
//! ```
//! use mars_request::{Key, Request};
//!
//! let request = Request::parse("retrieve,class=od,date=2020-01-01/to/2020-01-03,time=0/12,param=t")?;
//! assert_eq!(request.count("date"), 3);
//! assert_eq!(request.values("time"), Some(&["0000".to_string(), "1200".to_string()][..]));
//!
//! let key = Key::parse("class=od,date=20200102,time=1200,param=t")?;
//! assert!(request.matches(&key));
//! # Ok::<(), mars_request::RequestError>(())
//! ```

pub mod error;
pub mod key;
mod parser;
pub mod request;
pub mod types;

pub use error::{RequestError, Result};
pub use key::Key;
pub use request::{Parameter, Request};
pub use types::KeywordType;
