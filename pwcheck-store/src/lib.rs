//! File-backed storage for labeled passwords.
//!
//! Entries live in a single pretty-printed JSON document:
//!
//! ```json
//! {
//!   "entries": [
//!     {
//!       "label": "mail",
//!       "password": "...",
//!       "created_at": "2024-05-01T10:00:00Z",
//!       "updated_at": "2024-05-01T10:00:00Z"
//!     }
//!   ]
//! }
//! ```
//!
//! Passwords are stored in plaintext; the file is only protected by owner-only
//! permissions.
//!
//! Every operation is serialized twice: by a mutex inside the process, and by a
//! sentinel lock file (`<path>.lock`) shared with other processes that use the same
//! store. Writes go to a temporary file in the same directory which is then renamed
//! over the store, so readers never see a partially written document.

pub mod error;
pub mod lock;
pub mod process;
pub mod store;

pub use error::StoreError;
pub use lock::FileLock;
pub use process::is_process_alive;
pub use store::{CredentialStore, StoredPassword};
