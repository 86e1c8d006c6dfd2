//! Event sources and cleaning for closeness analysis.
//!
//! Sources produce [`RawMessage`]s exactly as stored; [`clean`] turns them
//! into the sanitized [`ChatEvent`]s the compute crate consumes.
//!
//! [`ChatEvent`]: rapport_core::ChatEvent

pub mod clean;
pub mod json_import;
pub mod record;
pub mod sqlite_import;
pub mod usermap;
pub mod window;

pub use clean::{clean_messages, clean_text, strip_id_from_name, CleanStats};
pub use json_import::JsonImporter;
pub use record::RawMessage;
pub use sqlite_import::SqliteImporter;
pub use usermap::load_user_map;
pub use window::TimeWindow;
